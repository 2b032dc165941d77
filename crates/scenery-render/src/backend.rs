use crate::{Pass, RenderError};

/// What a backend can do, queried once when render resources are created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Whether one draw can write all six layers of a cube target.
    pub layered_rendering: bool,
    /// Largest edge of a 2-D or cube texture.
    pub max_texture_size: u32,
    /// Texture units available to one fragment program.
    pub max_texture_units: u32,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            layered_rendering: true,
            max_texture_size: 8192,
            max_texture_units: 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Sampleable depth texture with comparison, used for shadow maps.
    Depth2d,
    Color2d,
    /// Six color layers sampled as a cube.
    ColorCube,
    /// Six depth layers, for layered cube rendering.
    DepthCube,
}

impl TargetKind {
    pub fn layers(self) -> u32 {
        match self {
            TargetKind::Depth2d | TargetKind::Color2d => 1,
            TargetKind::ColorCube | TargetKind::DepthCube => 6,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, TargetKind::Depth2d | TargetKind::DepthCube)
    }
}

/// Square render target request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    pub label: String,
    pub kind: TargetKind,
    pub size: u32,
}

impl TargetDesc {
    pub fn new(label: impl Into<String>, kind: TargetKind, size: u32) -> Self {
        Self {
            label: label.into(),
            kind,
            size,
        }
    }
}

/// Executes passes and owns GPU storage.
///
/// Targets release their storage when dropped, so dropping the struct that
/// holds them is how render resources are freed.
pub trait RenderBackend {
    type Target;

    fn capabilities(&self) -> BackendCapabilities;

    fn create_target(&mut self, desc: &TargetDesc) -> Result<Self::Target, RenderError>;

    fn execute(&mut self, pass: &Pass<'_, Self::Target>) -> Result<(), RenderError>;
}
