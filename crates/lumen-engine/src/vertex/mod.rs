//! Vertex layouts, the three accepted vertex shapes, and their promotion to the
//! canonical uploaded vertex.
//!
//! Every upload path ends in [`Vertex`]; narrower shapes get uv `(0, 0)` and
//! opaque white.

mod formats;
mod layout;
mod uv;

pub use formats::{
    canonical_layout, canonicalize, canonicalize_positions, canonicalize_raw, PositionVertex,
    TexturedVertex, Vertex, VertexFormat, VertexKind, DEFAULT_COLOR, DEFAULT_UV,
};
pub use layout::{
    AttributeType, LayoutViolation, VertexAttribute, VertexLayout, COLOR_LOCATION,
    POSITION_LOCATION, UV_LOCATION,
};
pub use uv::{planar_uvs, unit_square, Mesh2d};
