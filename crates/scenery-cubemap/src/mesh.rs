//! The subdivided unit cube used to reproject cube faces onto the screen.

use glam::{Mat3, Vec2, Vec3};

/// Grid cells per face edge.
pub const CUBE_SUBDIVISIONS: usize = 20;

const MAX_SUBDIVISIONS: usize = 100;

/// Six faces of a subdivided cube. Face vertices are not shared, so every
/// face carries its own texture coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeMesh {
    /// Cube-space positions, also the cube-map lookup directions.
    pub positions: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub indices: Vec<u16>,
    vertices_per_face: usize,
    indices_per_face: usize,
}

impl Default for CubeMesh {
    fn default() -> Self {
        Self::subdivided(CUBE_SUBDIVISIONS)
    }
}

impl CubeMesh {
    /// Build a cube with `subdivisions` cells per face edge. Faces are the
    /// east face `y = 1` and its rotations, in the order east, south, north,
    /// west, down, up.
    pub fn subdivided(subdivisions: usize) -> Self {
        let sub = subdivisions.clamp(1, MAX_SUBDIVISIONS);
        let row = sub + 1;
        let step = 2.0 / sub as f32;
        let tex_step = 1.0 / sub as f32;

        let mut front = Vec::with_capacity(row * row);
        let mut front_tex = Vec::with_capacity(row * row);
        for y in 0..=sub {
            for x in 0..=sub {
                front.push(Vec3::new(-1.0 + x as f32 * step, 1.0, -1.0 + y as f32 * step));
                front_tex.push(Vec2::new(x as f32 * tex_step, y as f32 * tex_step));
            }
        }

        let idx = |x: usize, y: usize| (y * row + x) as u16;
        let mut front_indices = Vec::with_capacity(sub * sub * 6);
        for y in 0..sub {
            for x in 0..sub {
                front_indices.extend_from_slice(&[
                    idx(x, y + 1),
                    idx(x, y),
                    idx(x + 1, y + 1),
                    idx(x + 1, y + 1),
                    idx(x, y),
                    idx(x + 1, y),
                ]);
            }
        }

        let face_transforms = [
            Mat3::IDENTITY,
            Mat3::from_rotation_z(-std::f32::consts::FRAC_PI_2),
            Mat3::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Mat3::from_rotation_z(std::f32::consts::PI),
            Mat3::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            Mat3::from_rotation_x(std::f32::consts::FRAC_PI_2),
        ];

        let vertices_per_face = front.len();
        let mut positions = Vec::with_capacity(vertices_per_face * 6);
        let mut texcoords = Vec::with_capacity(vertices_per_face * 6);
        let mut indices = Vec::with_capacity(front_indices.len() * 6);
        for (face, transform) in face_transforms.iter().enumerate() {
            positions.extend(front.iter().map(|p| *transform * *p));
            texcoords.extend_from_slice(&front_tex);
            let offset = (face * vertices_per_face) as u16;
            indices.extend(front_indices.iter().map(|i| i + offset));
        }

        Self {
            positions,
            texcoords,
            indices_per_face: front_indices.len(),
            indices,
            vertices_per_face,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn vertices_per_face(&self) -> usize {
        self.vertices_per_face
    }

    pub fn face_index_count(&self) -> usize {
        self.indices_per_face
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mesh_sizes() {
        let mesh = CubeMesh::default();
        assert_eq!(mesh.vertices_per_face(), 441);
        assert_eq!(mesh.vertex_count(), 441 * 6);
        assert_eq!(mesh.texcoords.len(), mesh.vertex_count());
        assert_eq!(mesh.face_index_count(), 20 * 20 * 6);
        assert_eq!(mesh.indices.len(), mesh.face_index_count() * 6);
    }

    #[test]
    fn test_faces_lie_on_expected_planes() {
        let mesh = CubeMesh::default();
        let normals = [Vec3::Y, Vec3::X, Vec3::NEG_X, Vec3::NEG_Y, Vec3::NEG_Z, Vec3::Z];
        for (face, normal) in normals.iter().enumerate() {
            let start = face * mesh.vertices_per_face();
            for p in &mesh.positions[start..start + mesh.vertices_per_face()] {
                assert!((p.dot(*normal) - 1.0).abs() < 1e-5, "face {face} vertex {p}");
                assert!(p.abs().max_element() <= 1.0 + 1e-5);
            }
        }
    }

    #[test]
    fn test_indices_stay_within_their_face() {
        let mesh = CubeMesh::default();
        let per_face = mesh.face_index_count();
        for face in 0..6 {
            let lo = (face * mesh.vertices_per_face()) as u16;
            let hi = ((face + 1) * mesh.vertices_per_face()) as u16;
            for i in &mesh.indices[face * per_face..(face + 1) * per_face] {
                assert!((lo..hi).contains(i));
            }
        }
    }

    #[test]
    fn test_front_face_first_cell() {
        let mesh = CubeMesh::subdivided(2);
        assert_eq!(&mesh.indices[..6], &[3, 0, 4, 4, 0, 1]);
        assert_eq!(mesh.positions[0], Vec3::new(-1.0, 1.0, -1.0));
        assert_eq!(mesh.texcoords[8], Vec2::new(1.0, 1.0));
    }
}
