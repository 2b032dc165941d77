//! Owned target sets for each cubemap mode.

use scenery_config::CubemapMode;
use scenery_render::{
    Attachment, CubeSource, RenderBackend, RenderError, RenderTarget, TargetDesc, TargetKind,
};

/// The cubemap's render targets. A set is either complete or not built at
/// all; dropping it releases every target.
#[derive(Debug)]
pub enum CubemapTargets<T> {
    /// Six 2-D color targets sharing one depth target.
    Textures { faces: [T; 6], depth: T },
    /// One cube color target rendered layer by layer, with a shared depth
    /// target.
    Cubemap { cube: T, depth: T },
    /// Cube color and cube depth targets written in a single layered pass.
    Layered { cube: T, depth: T },
}

impl<T> CubemapTargets<T> {
    pub fn allocate<B>(backend: &mut B, mode: CubemapMode, size: u32) -> Result<Self, RenderError>
    where
        B: RenderBackend<Target = T>,
    {
        let targets = match mode {
            CubemapMode::Textures => {
                let mut faces = Vec::with_capacity(6);
                for i in 0..6 {
                    let desc = TargetDesc::new(format!("cubemap-face-{i}"), TargetKind::Color2d, size);
                    faces.push(backend.create_target(&desc)?);
                }
                let depth = backend.create_target(&TargetDesc::new(
                    "cubemap-depth",
                    TargetKind::Depth2d,
                    size,
                ))?;
                let faces: [T; 6] = faces.try_into().map_err(|_| RenderError::ResourceAllocation {
                    label: "cubemap-faces".to_string(),
                    reason: "face count mismatch".to_string(),
                })?;
                Self::Textures { faces, depth }
            }
            CubemapMode::Cubemap => Self::Cubemap {
                cube: backend.create_target(&TargetDesc::new(
                    "cubemap-color",
                    TargetKind::ColorCube,
                    size,
                ))?,
                depth: backend.create_target(&TargetDesc::new(
                    "cubemap-depth",
                    TargetKind::Depth2d,
                    size,
                ))?,
            },
            CubemapMode::CubemapGeometryAccelerated => Self::Layered {
                cube: backend.create_target(&TargetDesc::new(
                    "cubemap-color",
                    TargetKind::ColorCube,
                    size,
                ))?,
                depth: backend.create_target(&TargetDesc::new(
                    "cubemap-depth-cube",
                    TargetKind::DepthCube,
                    size,
                ))?,
            },
        };
        Ok(targets)
    }

    pub fn mode(&self) -> CubemapMode {
        match self {
            Self::Textures { .. } => CubemapMode::Textures,
            Self::Cubemap { .. } => CubemapMode::Cubemap,
            Self::Layered { .. } => CubemapMode::CubemapGeometryAccelerated,
        }
    }

    /// Attachments for rendering a single face. `None` in layered mode.
    pub fn face_target(&self, face: u32) -> Option<RenderTarget<'_, T>> {
        match self {
            Self::Textures { faces, depth } => {
                faces.get(face as usize).map(|color| RenderTarget::Offscreen {
                    color: Some(Attachment::Target(color)),
                    depth: Some(Attachment::Target(depth)),
                })
            }
            Self::Cubemap { cube, depth } => Some(RenderTarget::Offscreen {
                color: Some(Attachment::Layer(cube, face)),
                depth: Some(Attachment::Target(depth)),
            }),
            Self::Layered { .. } => None,
        }
    }

    /// Attachments covering every face at once. Only in layered mode.
    pub fn layered_target(&self) -> Option<RenderTarget<'_, T>> {
        match self {
            Self::Layered { cube, depth } => Some(RenderTarget::Offscreen {
                color: Some(Attachment::Target(cube)),
                depth: Some(Attachment::Target(depth)),
            }),
            Self::Textures { .. } | Self::Cubemap { .. } => None,
        }
    }

    /// What the reprojection pass samples from.
    pub fn source(&self) -> CubeSource<'_, T> {
        match self {
            Self::Textures { faces, .. } => {
                let [a, b, c, d, e, f] = faces;
                CubeSource::Faces([a, b, c, d, e, f])
            }
            Self::Cubemap { cube, .. } | Self::Layered { cube, .. } => CubeSource::Cube(cube),
        }
    }
}
