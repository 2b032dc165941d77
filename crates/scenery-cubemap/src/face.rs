//! View rotations for the six cube faces.

use glam::{Mat4, Vec3};
use scenery_config::CubemapMode;

fn rot(degrees: f32, axis: Vec3) -> Mat4 {
    Mat4::from_axis_angle(axis.normalize(), degrees.to_radians())
}

/// Rotation of each face's camera, in target order. Cube targets follow the
/// +X, -X, +Y, -Y, +Z, -Z layer convention; separate face textures follow
/// the cube mesh's face order (east, south, north, west, down, up).
pub fn face_rotations(mode: CubemapMode) -> [Mat4; 6] {
    let base = rot(90.0, Vec3::NEG_X);
    match mode {
        CubemapMode::Cubemap | CubemapMode::CubemapGeometryAccelerated => [
            base * rot(-90.0, Vec3::Y) * rot(90.0, Vec3::Z),
            base * rot(90.0, Vec3::Y) * rot(-90.0, Vec3::Z),
            base,
            base * rot(180.0, Vec3::NEG_X),
            base * rot(-90.0, Vec3::X),
            base * rot(90.0, Vec3::X) * rot(180.0, Vec3::Z),
        ],
        CubemapMode::Textures => [
            base,
            base * rot(90.0, Vec3::Z),
            base * rot(90.0, Vec3::NEG_Z),
            base * rot(180.0, Vec3::Z),
            base * rot(90.0, Vec3::X),
            base * rot(90.0, Vec3::NEG_X),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// World-space view direction and up vector of a face camera.
    fn basis(rotation: &Mat4) -> (Vec3, Vec3) {
        let inverse = rotation.transpose();
        (
            inverse.transform_vector3(Vec3::NEG_Z),
            inverse.transform_vector3(Vec3::Y),
        )
    }

    fn assert_faces(mode: CubemapMode, expected: [(Vec3, Vec3); 6]) {
        for (i, (rotation, (forward, up))) in face_rotations(mode).iter().zip(expected).enumerate() {
            let (f, u) = basis(rotation);
            assert!(f.abs_diff_eq(forward, 1e-5), "{mode:?} face {i}: forward {f}, want {forward}");
            assert!(u.abs_diff_eq(up, 1e-5), "{mode:?} face {i}: up {u}, want {up}");
        }
    }

    #[test]
    fn test_cube_layer_orientation() {
        assert_faces(
            CubemapMode::Cubemap,
            [
                (Vec3::X, Vec3::NEG_Y),
                (Vec3::NEG_X, Vec3::NEG_Y),
                (Vec3::Y, Vec3::Z),
                (Vec3::NEG_Y, Vec3::NEG_Z),
                (Vec3::Z, Vec3::NEG_Y),
                (Vec3::NEG_Z, Vec3::NEG_Y),
            ],
        );
        assert_eq!(
            face_rotations(CubemapMode::Cubemap),
            face_rotations(CubemapMode::CubemapGeometryAccelerated)
        );
    }

    #[test]
    fn test_texture_face_orientation() {
        assert_faces(
            CubemapMode::Textures,
            [
                (Vec3::Y, Vec3::Z),
                (Vec3::X, Vec3::Z),
                (Vec3::NEG_X, Vec3::Z),
                (Vec3::NEG_Y, Vec3::Z),
                (Vec3::NEG_Z, Vec3::Y),
                (Vec3::Z, Vec3::NEG_Y),
            ],
        );
    }
}
