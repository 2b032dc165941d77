//! Scene description, loading, and the interfaces of the host application
//! the renderer consumes: static meshes, ground heights, ephemeris, sky
//! projections, texture readiness and user notifications.

mod body;
mod error;
mod ground;
mod info;
mod loader;
mod mesh;
mod notify;
mod projection;

pub use body::{BodyState, CelestialBody, Ephemeris, FixedEphemeris, SkySnapshot};
pub use error::SceneLoadError;
pub use ground::{FlatGround, GroundHeight};
pub use info::{GroundModel, SceneInfo};
pub use loader::{LoadStage, LoadedScene, SceneLoader, SceneSource};
pub use mesh::{
    AllTexturesReady, Illumination, InMemoryMesh, Material, MaterialBatch, StaticMesh, TextureId,
    TextureSource,
};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use projection::{
    DisplayKind, PerspectiveProjection, SkyProjection, StereographicProjection, Viewport,
};
