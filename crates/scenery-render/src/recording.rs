//! A backend that records passes instead of drawing them.
//!
//! Used by tests and headless runs to observe exactly which passes a frame
//! produces, and to simulate allocation failures and missing features.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::Vec3;
use scenery_scene::Viewport;

use crate::{
    Attachment, BackendCapabilities, BatchDraw, BlendMode, ClearFlags, CubeSource, DrawCommand,
    Pass, PassUniforms, RasterState, RenderBackend, RenderError, RenderTarget, TargetDesc,
    TargetKind,
};

#[derive(Debug, Default)]
struct Ledger {
    live: BTreeSet<u32>,
    released: Vec<u32>,
}

/// Handle to a recorded allocation; dropping it releases the allocation.
#[derive(Debug)]
pub struct RecordedTarget {
    id: u32,
    desc: TargetDesc,
    ledger: Rc<RefCell<Ledger>>,
}

impl RecordedTarget {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }
}

impl Drop for RecordedTarget {
    fn drop(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        ledger.live.remove(&self.id);
        ledger.released.push(self.id);
    }
}

/// Where a recorded pass drew: a target id and optional layer per
/// attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedTargetRef {
    Screen,
    Offscreen {
        color: Option<(u32, Option<u32>)>,
        depth: Option<(u32, Option<u32>)>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCommand {
    Batch(BatchDraw),
    CubeMesh {
        positions: Vec<Vec3>,
        index_count: usize,
        draw_calls: u32,
        sources: Vec<u32>,
        blend: BlendMode,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedPass {
    pub label: &'static str,
    pub target: RecordedTargetRef,
    pub clear: ClearFlags,
    pub viewport: Viewport,
    pub raster: RasterState,
    pub uniforms: PassUniforms,
    pub shadow_maps: Vec<u32>,
    pub commands: Vec<RecordedCommand>,
}

impl RecordedPass {
    pub fn batches(&self) -> impl Iterator<Item = &BatchDraw> {
        self.commands.iter().filter_map(|c| match c {
            RecordedCommand::Batch(batch) => Some(batch),
            RecordedCommand::CubeMesh { .. } => None,
        })
    }

    pub fn draw_calls(&self) -> u32 {
        self.commands
            .iter()
            .map(|c| match c {
                RecordedCommand::Batch(_) => 1,
                RecordedCommand::CubeMesh { draw_calls, .. } => *draw_calls,
            })
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    capabilities: BackendCapabilities,
    ledger: Rc<RefCell<Ledger>>,
    next_id: u32,
    created: Vec<TargetDesc>,
    passes: Vec<RecordedPass>,
    failing_kind: Option<TargetKind>,
    allocations_left: Option<usize>,
}

fn attachment_ref(attachment: &Option<Attachment<'_, RecordedTarget>>) -> Option<(u32, Option<u32>)> {
    attachment.as_ref().map(|a| (a.target().id, a.layer()))
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    pub fn set_capabilities(&mut self, capabilities: BackendCapabilities) {
        self.capabilities = capabilities;
    }

    /// Fail every allocation of `kind` until cleared.
    pub fn fail_kind(&mut self, kind: Option<TargetKind>) {
        self.failing_kind = kind;
    }

    /// Let `count` more allocations succeed, then fail the rest.
    pub fn fail_allocations_after(&mut self, count: Option<usize>) {
        self.allocations_left = count;
    }

    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    pub fn take_passes(&mut self) -> Vec<RecordedPass> {
        std::mem::take(&mut self.passes)
    }

    /// Every successful allocation, in order.
    pub fn created(&self) -> &[TargetDesc] {
        &self.created
    }

    pub fn live_targets(&self) -> usize {
        self.ledger.borrow().live.len()
    }

    pub fn released_count(&self) -> usize {
        self.ledger.borrow().released.len()
    }
}

impl RenderBackend for RecordingBackend {
    type Target = RecordedTarget;

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<RecordedTarget, RenderError> {
        if desc.size == 0 || desc.size > self.capabilities.max_texture_size {
            return Err(RenderError::ResourceAllocation {
                label: desc.label.clone(),
                reason: format!(
                    "size {} outside 1..={}",
                    desc.size, self.capabilities.max_texture_size
                ),
            });
        }
        if self.failing_kind == Some(desc.kind) {
            return Err(RenderError::ResourceAllocation {
                label: desc.label.clone(),
                reason: format!("{:?} targets unavailable", desc.kind),
            });
        }
        if let Some(left) = self.allocations_left.as_mut() {
            if *left == 0 {
                return Err(RenderError::ResourceAllocation {
                    label: desc.label.clone(),
                    reason: "out of memory".to_string(),
                });
            }
            *left -= 1;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.ledger.borrow_mut().live.insert(id);
        self.created.push(desc.clone());
        Ok(RecordedTarget {
            id,
            desc: desc.clone(),
            ledger: Rc::clone(&self.ledger),
        })
    }

    fn execute(&mut self, pass: &Pass<'_, RecordedTarget>) -> Result<(), RenderError> {
        let target = match &pass.target {
            RenderTarget::Screen => RecordedTargetRef::Screen,
            RenderTarget::Offscreen { color, depth } => {
                let layered = [color, depth]
                    .into_iter()
                    .flatten()
                    .any(|a| a.layer().is_none() && a.target().desc.kind.layers() > 1);
                if layered && !self.capabilities.layered_rendering {
                    return Err(RenderError::UnsupportedHardware(
                        "layered cube rendering".to_string(),
                    ));
                }
                RecordedTargetRef::Offscreen {
                    color: attachment_ref(color),
                    depth: attachment_ref(depth),
                }
            }
        };

        let commands = pass
            .commands
            .iter()
            .map(|command| match command {
                DrawCommand::Batch(batch) => RecordedCommand::Batch(batch.clone()),
                DrawCommand::CubeMesh(mesh) => {
                    let (draw_calls, sources) = match &mesh.source {
                        CubeSource::Cube(t) => (1, vec![t.id]),
                        CubeSource::Faces(faces) => (6, faces.iter().map(|t| t.id).collect()),
                    };
                    RecordedCommand::CubeMesh {
                        positions: mesh.positions.to_vec(),
                        index_count: mesh.indices.len(),
                        draw_calls,
                        sources,
                        blend: mesh.blend,
                    }
                }
            })
            .collect();

        log::trace!("recorded pass '{}'", pass.label);
        self.passes.push(RecordedPass {
            label: pass.label,
            target,
            clear: pass.clear,
            viewport: pass.viewport,
            raster: pass.raster,
            uniforms: pass.uniforms.clone(),
            shadow_maps: pass.shadow_maps.iter().map(|t| t.id).collect(),
            commands,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(size: u32) -> TargetDesc {
        TargetDesc::new("depth", TargetKind::Depth2d, size)
    }

    #[test]
    fn test_targets_release_on_drop() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_target(&depth(64)).unwrap();
        let b = backend.create_target(&depth(64)).unwrap();
        assert_eq!(backend.live_targets(), 2);
        drop(a);
        assert_eq!(backend.live_targets(), 1);
        assert_eq!(backend.released_count(), 1);
        drop(b);
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn test_oversized_target_fails() {
        let mut backend = RecordingBackend::with_capabilities(BackendCapabilities {
            max_texture_size: 512,
            ..Default::default()
        });
        let err = backend.create_target(&depth(1024)).unwrap_err();
        assert!(matches!(err, RenderError::ResourceAllocation { .. }));
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn test_fail_after_count() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(Some(1));
        let first = backend.create_target(&depth(8));
        assert!(first.is_ok());
        assert!(backend.create_target(&depth(8)).is_err());
        backend.fail_allocations_after(None);
        assert!(backend.create_target(&depth(8)).is_ok());
    }

    #[test]
    fn test_failing_kind() {
        let mut backend = RecordingBackend::new();
        backend.fail_kind(Some(TargetKind::ColorCube));
        assert!(backend
            .create_target(&TargetDesc::new("cube", TargetKind::ColorCube, 8))
            .is_err());
        assert!(backend.create_target(&depth(8)).is_ok());
    }

    #[test]
    fn test_layered_pass_needs_capability() {
        let mut backend = RecordingBackend::with_capabilities(BackendCapabilities {
            layered_rendering: false,
            ..Default::default()
        });
        let cube = backend
            .create_target(&TargetDesc::new("cube", TargetKind::ColorCube, 8))
            .unwrap();
        let layered = Pass::new(
            "layered",
            RenderTarget::Offscreen {
                color: Some(Attachment::Target(&cube)),
                depth: None,
            },
            Viewport::square(8),
        );
        assert!(matches!(
            backend.execute(&layered),
            Err(RenderError::UnsupportedHardware(_))
        ));

        let face = Pass::new(
            "face",
            RenderTarget::Offscreen {
                color: Some(Attachment::Layer(&cube, 2)),
                depth: None,
            },
            Viewport::square(8),
        );
        backend.execute(&face).unwrap();
        assert_eq!(
            backend.passes()[0].target,
            RecordedTargetRef::Offscreen {
                color: Some((cube.id(), Some(2))),
                depth: None
            }
        );
    }
}
