//! Texture-coordinate generation for 2D shapes.
//!
//! UVs are always derived from a shape's local (pre-transform) positions. A
//! [`Mesh2d`] keeps those UVs when its positions are later moved, so texture
//! placement does not swim when a shape rotates or translates.

use glam::{Affine2, Vec2};

use super::formats::TexturedVertex;

/// Planar mapping of `local` positions onto their bounding box.
///
/// The box minimum maps to `(0, 0)` and the maximum to `(1, 1)`. A degenerate
/// axis (zero extent) maps to `0` on that axis.
pub fn planar_uvs(local: &[Vec2]) -> Vec<[f32; 2]> {
    let Some(first) = local.first() else {
        return Vec::new();
    };
    let (min, max) = local
        .iter()
        .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = max - min;

    local
        .iter()
        .map(|p| {
            let d = *p - min;
            [
                if extent.x > 0.0 { d.x / extent.x } else { 0.0 },
                if extent.y > 0.0 { d.y / extent.y } else { 0.0 },
            ]
        })
        .collect()
}

/// Axis-aligned square with its corner at the origin.
///
/// Corners are emitted counter-clockwise starting at the origin and always map
/// to UVs `(0,0) (1,0) (1,1) (0,1)`. The sign of `side` is ignored.
pub fn unit_square(side: f32) -> [TexturedVertex; 4] {
    let side = side.abs();
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(side, 0.0),
        Vec2::new(side, side),
        Vec2::new(0.0, side),
    ];
    let uvs = planar_uvs(&corners);
    std::array::from_fn(|i| TexturedVertex::new(corners[i].to_array(), uvs[i]))
}

/// Indexed 2D geometry with UVs fixed in local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh2d {
    pub vertices: Vec<TexturedVertex>,
    pub indices: Vec<u32>,
}

impl Mesh2d {
    /// Builds a mesh from local positions, computing planar UVs once.
    pub fn from_local(positions: &[Vec2], indices: Vec<u32>) -> Self {
        let uvs = planar_uvs(positions);
        let vertices = positions
            .iter()
            .zip(uvs)
            .map(|(p, uv)| TexturedVertex::new(p.to_array(), uv))
            .collect();
        Self { vertices, indices }
    }

    /// Rectangle of `size` centered on the origin.
    pub fn quad(size: Vec2) -> Self {
        let h = size * 0.5;
        Self::from_local(
            &[
                Vec2::new(-h.x, -h.y),
                Vec2::new(h.x, -h.y),
                Vec2::new(h.x, h.y),
                Vec2::new(-h.x, h.y),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Regular polygon triangulated as a fan around its center.
    ///
    /// `sides` below three is raised to three.
    pub fn regular_polygon(sides: u32, radius: f32) -> Self {
        let sides = sides.max(3);
        let mut positions = Vec::with_capacity(sides as usize + 1);
        positions.push(Vec2::ZERO);
        for i in 0..sides {
            let angle = std::f32::consts::TAU * i as f32 / sides as f32;
            positions.push(Vec2::from_angle(angle) * radius);
        }
        let mut indices = Vec::with_capacity(sides as usize * 3);
        for i in 0..sides {
            indices.extend_from_slice(&[0, 1 + i, 1 + (i + 1) % sides]);
        }
        Self::from_local(&positions, indices)
    }

    /// Returns a copy with positions moved by `transform`; UVs are untouched.
    pub fn transformed(&self, transform: &Affine2) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let p = transform.transform_point2(Vec2::from_array(v.position));
                TexturedVertex::new(p.to_array(), v.uv)
            })
            .collect();
        Self {
            vertices,
            indices: self.indices.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── unit square ───────────────────────────────────────────────────────

    #[test]
    fn unit_square_uvs_are_exact_for_any_side() {
        let expected = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        for side in [1.0, 0.001, 3.0, 17.25, 1000.0, 123_456.7, -2.5] {
            let uvs: Vec<[f32; 2]> = unit_square(side).iter().map(|v| v.uv).collect();
            assert_eq!(uvs, expected, "side {side}");
        }
    }

    // ── planar mapping ────────────────────────────────────────────────────

    #[test]
    fn degenerate_axis_maps_to_zero() {
        let uvs = planar_uvs(&[Vec2::new(0.0, 5.0), Vec2::new(4.0, 5.0)]);
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn empty_input() {
        assert!(planar_uvs(&[]).is_empty());
    }

    // ── transform invariance ──────────────────────────────────────────────

    #[test]
    fn uvs_survive_rigid_transforms() {
        let local = [
            Vec2::new(-1.0, -0.5),
            Vec2::new(2.0, -0.5),
            Vec2::new(0.5, 3.0),
        ];
        let mesh = Mesh2d::from_local(&local, vec![0, 1, 2]);
        let local_uvs = planar_uvs(&local);

        for (angle, offset) in [(0.3, Vec2::new(10.0, -4.0)), (2.1, Vec2::ZERO), (-1.0, Vec2::ONE)] {
            let t = Affine2::from_angle_translation(angle, offset);
            let moved = mesh.transformed(&t);

            // Mapping the moved positions back into local space gives the
            // same UVs the mesh carried through the transform.
            let inverse = t.inverse();
            let recovered: Vec<Vec2> = moved
                .vertices
                .iter()
                .map(|v| inverse.transform_point2(Vec2::from_array(v.position)))
                .collect();
            let remapped = planar_uvs(&recovered);

            for (i, v) in moved.vertices.iter().enumerate() {
                assert_eq!(v.uv, local_uvs[i]);
                assert!(Vec2::from_array(v.uv).abs_diff_eq(Vec2::from_array(remapped[i]), 1e-5));
                let expected = t.transform_point2(local[i]);
                assert!(Vec2::from_array(v.position).abs_diff_eq(expected, 1e-5));
            }
        }
    }

    #[test]
    fn mapping_world_positions_depends_on_rotation() {
        let local = [
            Vec2::new(-1.0, -0.5),
            Vec2::new(2.0, -0.5),
            Vec2::new(0.5, 3.0),
        ];
        let local_uvs = planar_uvs(&local);

        let shifted: Vec<Vec2> = local.iter().map(|p| *p + Vec2::new(7.0, -3.0)).collect();
        for (a, b) in planar_uvs(&shifted).iter().zip(&local_uvs) {
            assert!(Vec2::from_array(*a).abs_diff_eq(Vec2::from_array(*b), 1e-5));
        }

        let rotation = Affine2::from_angle(std::f32::consts::FRAC_PI_2);
        let rotated: Vec<Vec2> = local.iter().map(|p| rotation.transform_point2(*p)).collect();
        let world_uvs = planar_uvs(&rotated);
        assert!(world_uvs
            .iter()
            .zip(&local_uvs)
            .any(|(a, b)| !Vec2::from_array(*a).abs_diff_eq(Vec2::from_array(*b), 1e-3)));
    }

    #[test]
    fn polygon_fan_indices_stay_in_range() {
        let mesh = Mesh2d::regular_polygon(6, 2.0);
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.indices.len(), 18);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        // Center of a symmetric polygon sits in the middle of its UV box.
        let center = mesh.vertices[0].uv;
        assert!((center[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn quad_has_full_uv_range() {
        let mesh = Mesh2d::quad(Vec2::new(4.0, 2.0));
        assert_eq!(mesh.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(mesh.vertices[2].uv, [1.0, 1.0]);
    }
}
