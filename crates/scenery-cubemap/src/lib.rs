//! Cubemap indirection for non-perspective displays: the scene is rendered
//! into six 90° faces around the observer, then a subdivided cube is
//! projected through the sky projection and textured from those faces.

pub mod face;
pub mod mesh;
mod renderer;
mod resources;

pub use face::face_rotations;
pub use mesh::{CUBE_SUBDIVISIONS, CubeMesh};
pub use renderer::{
    CUBEMAP_UNAVAILABLE_NOTICE, CubeGeneration, CubemapRenderer, CubemapSettings, FaceView,
    JD_SECOND, MODE_FALLBACK_NOTICE,
};
pub use resources::CubemapTargets;
