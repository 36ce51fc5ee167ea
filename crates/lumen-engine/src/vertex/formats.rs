//! The three vertex shapes accepted by the processor and their promotion to the
//! canonical [`Vertex`].

use bytemuck::{Pod, Zeroable};

use super::layout::{
    VertexAttribute, VertexLayout, COLOR_LOCATION, POSITION_LOCATION, UV_LOCATION,
};
use crate::error::{RenderError, Result};

/// Default texture coordinate for shapes that carry none.
pub const DEFAULT_UV: [f32; 2] = [0.0, 0.0];
/// Default color for shapes that carry none: opaque white.
pub const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Which of the three shapes a vertex type is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Position,
    PositionUv,
    Full,
}

/// A vertex shape the processor can upload.
///
/// Dispatch is static: each shape knows its layout and how to widen itself to
/// the canonical vertex. Promotion never infers uv or color from other fields.
pub trait VertexFormat: Pod {
    const KIND: VertexKind;

    fn layout() -> &'static VertexLayout;

    fn to_canonical(&self) -> Vertex;
}

// ── position-only ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 2],
}

impl PositionVertex {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

const POSITION_ATTRS: [VertexAttribute; 1] = [VertexAttribute::float(POSITION_LOCATION, 2, 0)];
static POSITION_LAYOUT: VertexLayout = VertexLayout::from_static(&POSITION_ATTRS, 8);

impl VertexFormat for PositionVertex {
    const KIND: VertexKind = VertexKind::Position;

    fn layout() -> &'static VertexLayout {
        &POSITION_LAYOUT
    }

    #[inline]
    fn to_canonical(&self) -> Vertex {
        Vertex {
            position: self.position,
            uv: DEFAULT_UV,
            color: DEFAULT_COLOR,
        }
    }
}

// ── position + uv ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    #[inline]
    pub const fn new(position: [f32; 2], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

const TEXTURED_ATTRS: [VertexAttribute; 2] = [
    VertexAttribute::float(POSITION_LOCATION, 2, 0),
    VertexAttribute::float(UV_LOCATION, 2, 8),
];
static TEXTURED_LAYOUT: VertexLayout = VertexLayout::from_static(&TEXTURED_ATTRS, 16);

impl VertexFormat for TexturedVertex {
    const KIND: VertexKind = VertexKind::PositionUv;

    fn layout() -> &'static VertexLayout {
        &TEXTURED_LAYOUT
    }

    #[inline]
    fn to_canonical(&self) -> Vertex {
        Vertex {
            position: self.position,
            uv: self.uv,
            color: DEFAULT_COLOR,
        }
    }
}

// ── canonical ─────────────────────────────────────────────────────────────

/// The full vertex every upload is normalized to.
///
/// ```text
/// Vertex (32 bytes)
/// position [f32; 2]  offset 0   location(0)
/// uv       [f32; 2]  offset 8   location(1)
/// color    [f32; 4]  offset 16  location(2)
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    #[inline]
    pub const fn new(position: [f32; 2], uv: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, uv, color }
    }

    /// Size in bytes of one canonical vertex.
    pub const SIZE: u64 = std::mem::size_of::<Vertex>() as u64;
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            uv: DEFAULT_UV,
            color: DEFAULT_COLOR,
        }
    }
}

const CANONICAL_ATTRS: [VertexAttribute; 3] = [
    VertexAttribute::float(POSITION_LOCATION, 2, 0),
    VertexAttribute::float(UV_LOCATION, 2, 8),
    VertexAttribute::float(COLOR_LOCATION, 4, 16),
];
static CANONICAL_LAYOUT: VertexLayout = VertexLayout::from_static(&CANONICAL_ATTRS, 32);

impl VertexFormat for Vertex {
    const KIND: VertexKind = VertexKind::Full;

    fn layout() -> &'static VertexLayout {
        &CANONICAL_LAYOUT
    }

    #[inline]
    fn to_canonical(&self) -> Vertex {
        *self
    }
}

/// Layout of the canonical vertex as uploaded to the GPU.
#[inline]
pub fn canonical_layout() -> &'static VertexLayout {
    &CANONICAL_LAYOUT
}

// ── promotion ─────────────────────────────────────────────────────────────

/// Promotes a typed slice of any shape.
pub fn canonicalize<V: VertexFormat>(vertices: &[V]) -> Vec<Vertex> {
    vertices.iter().map(VertexFormat::to_canonical).collect()
}

/// Interprets a flat float slice as `x, y` pairs.
pub fn canonicalize_positions(floats: &[f32]) -> Result<Vec<Vertex>> {
    if floats.len() % 2 != 0 {
        return Err(RenderError::InvalidVertexData(format!(
            "position-only data needs an even number of floats, got {}",
            floats.len()
        )));
    }
    let positions: &[PositionVertex] = bytemuck::cast_slice(floats);
    Ok(canonicalize(positions))
}

/// Decodes interleaved floats described by `layout`.
///
/// Attributes are matched by shader location: position (required, at least two
/// components), uv and color (optional). Missing color channels default to `1.0`.
pub fn canonicalize_raw(floats: &[f32], layout: &VertexLayout) -> Result<Vec<Vertex>> {
    if !layout.is_float_only() {
        return Err(RenderError::InvalidLayout(
            "raw float input requires 4-byte aligned f32 attributes".to_string(),
        ));
    }

    let position = layout
        .attribute(POSITION_LOCATION)
        .filter(|a| a.components >= 2)
        .ok_or_else(|| {
            RenderError::InvalidLayout("layout has no two-component position attribute".into())
        })?;
    let uv = layout.attribute(UV_LOCATION);
    let color = layout.attribute(COLOR_LOCATION);

    let stride = (layout.stride() / 4) as usize;
    if floats.len() % stride != 0 {
        return Err(RenderError::InvalidVertexData(format!(
            "{} floats is not a whole number of {}-float vertices",
            floats.len(),
            stride
        )));
    }

    let read = |vertex: &[f32], attr: &VertexAttribute, component: u32| -> Option<f32> {
        (component < attr.components).then(|| vertex[(attr.offset / 4 + component) as usize])
    };

    let out = floats
        .chunks_exact(stride)
        .map(|v| {
            let p = [v[(position.offset / 4) as usize], v[(position.offset / 4 + 1) as usize]];
            let t = match uv {
                Some(a) => [read(v, a, 0).unwrap_or(0.0), read(v, a, 1).unwrap_or(0.0)],
                None => DEFAULT_UV,
            };
            let c = match color {
                Some(a) => [
                    read(v, a, 0).unwrap_or(1.0),
                    read(v, a, 1).unwrap_or(1.0),
                    read(v, a, 2).unwrap_or(1.0),
                    read(v, a, 3).unwrap_or(1.0),
                ],
                None => DEFAULT_COLOR,
            };
            Vertex::new(p, t, c)
        })
        .collect();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── promotion ─────────────────────────────────────────────────────────

    #[test]
    fn position_only_promotes_to_white_and_zero_uv() {
        let v = PositionVertex::new(3.0, -2.0).to_canonical();
        assert_eq!(v.position, [3.0, -2.0]);
        assert_eq!(v.uv, [0.0, 0.0]);
        assert_eq!(v.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn textured_promotion_preserves_uv_exactly() {
        let uv = [0.123_456_7, 0.987_654_3];
        let v = TexturedVertex::new([1.0, 2.0], uv).to_canonical();
        assert_eq!(v.uv, uv);
        assert_eq!(v.color, DEFAULT_COLOR);
    }

    #[test]
    fn full_vertex_is_unchanged() {
        let v = Vertex::new([1.0, 2.0], [0.25, 0.75], [2.5, 0.1, 0.2, 0.3]);
        assert_eq!(v.to_canonical(), v);
        assert_eq!(canonicalize(&[v]), vec![v]);
    }

    #[test]
    fn layouts_match_struct_sizes() {
        assert_eq!(PositionVertex::layout().stride() as usize, size_of::<PositionVertex>());
        assert_eq!(TexturedVertex::layout().stride() as usize, size_of::<TexturedVertex>());
        assert_eq!(Vertex::layout().stride() as u64, Vertex::SIZE);
    }

    // ── flat input ────────────────────────────────────────────────────────

    #[test]
    fn flat_positions_need_pairs() {
        assert!(canonicalize_positions(&[0.0, 1.0, 2.0]).is_err());
        let verts = canonicalize_positions(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(verts.len(), 2);
        assert_eq!(verts[1].position, [2.0, 3.0]);
    }

    #[test]
    fn raw_with_rgb_color_defaults_alpha() {
        let layout = VertexLayout::new(
            vec![VertexAttribute::float(0, 2, 0), VertexAttribute::float(2, 3, 8)],
            20,
        )
        .unwrap();
        let verts = canonicalize_raw(&[1.0, 2.0, 0.5, 0.25, 0.0], &layout).unwrap();
        assert_eq!(verts[0].color, [0.5, 0.25, 0.0, 1.0]);
        assert_eq!(verts[0].uv, DEFAULT_UV);
    }

    #[test]
    fn raw_rejects_partial_vertices() {
        let layout = Vertex::layout();
        assert!(canonicalize_raw(&[0.0; 9], layout).is_err());
    }

    #[test]
    fn raw_requires_position() {
        let layout = VertexLayout::new(vec![VertexAttribute::float(1, 2, 0)], 8).unwrap();
        assert!(matches!(
            canonicalize_raw(&[0.0, 0.0], &layout),
            Err(RenderError::InvalidLayout(_))
        ));
    }

    #[test]
    fn raw_canonical_layout_round_trips() {
        let v = Vertex::new([1.0, 2.0], [0.5, 0.5], [0.1, 0.2, 0.3, 0.4]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(canonicalize_raw(floats, Vertex::layout()).unwrap(), vec![v]);
    }
}
