use std::borrow::Cow;
use std::fmt;

use crate::error::{RenderError, Result};

/// Shader location of the position attribute in every pipeline.
pub const POSITION_LOCATION: u32 = 0;
/// Shader location of the texture coordinate attribute.
pub const UV_LOCATION: u32 = 1;
/// Shader location of the color attribute.
pub const COLOR_LOCATION: u32 = 2;

/// Scalar type of one attribute component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float32,
    Uint8,
    Uint16,
    Uint32,
    Sint16,
    Sint32,
}

impl AttributeType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            AttributeType::Uint8 => 1,
            AttributeType::Uint16 | AttributeType::Sint16 => 2,
            AttributeType::Float32 | AttributeType::Uint32 | AttributeType::Sint32 => 4,
        }
    }
}

/// One attribute inside an interleaved vertex.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader location.
    pub index: u32,
    /// Number of components (1..=4).
    pub components: u32,
    pub ty: AttributeType,
    /// Integer types are mapped to `[0, 1]` / `[-1, 1]` when set.
    pub normalized: bool,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// `components` x `f32` at `offset`.
    #[inline]
    pub const fn float(index: u32, components: u32, offset: u32) -> Self {
        Self {
            index,
            components,
            ty: AttributeType::Float32,
            normalized: false,
            offset,
        }
    }

    /// Bytes occupied by this attribute.
    #[inline]
    pub const fn footprint(&self) -> u32 {
        self.components * self.ty.size()
    }
}

/// Reason a layout was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayoutViolation {
    ZeroStride,
    BadComponentCount { index: u32 },
    DuplicateIndex { index: u32 },
    AttributeOutsideStride { index: u32 },
    FootprintExceedsStride { total: u32, stride: u32 },
}

impl fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutViolation::ZeroStride => write!(f, "stride must be non-zero"),
            LayoutViolation::BadComponentCount { index } => {
                write!(f, "attribute {index} must have 1 to 4 components")
            }
            LayoutViolation::DuplicateIndex { index } => {
                write!(f, "attribute index {index} appears more than once")
            }
            LayoutViolation::AttributeOutsideStride { index } => {
                write!(f, "attribute {index} extends past the vertex stride")
            }
            LayoutViolation::FootprintExceedsStride { total, stride } => {
                write!(f, "attributes occupy {total} bytes but stride is {stride}")
            }
        }
    }
}

const fn check(attributes: &[VertexAttribute], stride: u32) -> Option<LayoutViolation> {
    if stride == 0 {
        return Some(LayoutViolation::ZeroStride);
    }
    let mut total = 0u32;
    let mut i = 0;
    while i < attributes.len() {
        let a = &attributes[i];
        if a.components == 0 || a.components > 4 {
            return Some(LayoutViolation::BadComponentCount { index: a.index });
        }
        if a.offset > stride || a.footprint() > stride - a.offset {
            return Some(LayoutViolation::AttributeOutsideStride { index: a.index });
        }
        let mut j = i + 1;
        while j < attributes.len() {
            if attributes[j].index == a.index {
                return Some(LayoutViolation::DuplicateIndex { index: a.index });
            }
            j += 1;
        }
        total += a.footprint();
        i += 1;
    }
    if total > stride {
        return Some(LayoutViolation::FootprintExceedsStride { total, stride });
    }
    None
}

/// Attribute offsets and stride of one vertex shape.
///
/// Invariants: attribute indices are unique, every attribute fits inside the
/// stride and the summed footprints do not exceed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Cow<'static, [VertexAttribute]>,
    stride: u32,
}

impl VertexLayout {
    /// Builds a layout from static data, checked at compile time when used in a
    /// `const` item.
    pub const fn from_static(attributes: &'static [VertexAttribute], stride: u32) -> Self {
        if check(attributes, stride).is_some() {
            panic!("invalid static vertex layout");
        }
        Self {
            attributes: Cow::Borrowed(attributes),
            stride,
        }
    }

    /// Builds a layout at runtime.
    pub fn new(attributes: Vec<VertexAttribute>, stride: u32) -> Result<Self> {
        if let Some(violation) = check(&attributes, stride) {
            return Err(RenderError::InvalidLayout(violation.to_string()));
        }
        Ok(Self {
            attributes: Cow::Owned(attributes),
            stride,
        })
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Looks up an attribute by shader location.
    pub fn attribute(&self, index: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.index == index)
    }

    /// True when every attribute is `f32` and the stride is a whole number of floats.
    pub fn is_float_only(&self) -> bool {
        self.stride % 4 == 0
            && self
                .attributes
                .iter()
                .all(|a| a.ty == AttributeType::Float32 && a.offset % 4 == 0)
    }
}
