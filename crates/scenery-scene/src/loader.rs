//! Staged scene loading with cancellation between stages.
//!
//! Loading builds a complete [`LoadedScene`] off to the side; the renderer
//! only swaps it in once every stage succeeded, so a failed or cancelled load
//! leaves the active scene untouched.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{GroundHeight, GroundModel, SceneInfo, SceneLoadError, StaticMesh};

/// Coarse load steps, reported to the progress callback before each runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStage {
    Model,
    Transform,
    Ground,
    GroundHeight,
    Finalize,
}

impl LoadStage {
    pub const COUNT: u32 = 5;

    /// One-based position of the stage.
    pub fn index(self) -> u32 {
        match self {
            LoadStage::Model => 1,
            LoadStage::Transform => 2,
            LoadStage::Ground => 3,
            LoadStage::GroundHeight => 4,
            LoadStage::Finalize => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LoadStage::Model => "Loading model...",
            LoadStage::Transform => "Transforming model...",
            LoadStage::Ground => "Loading ground...",
            LoadStage::GroundHeight => "Calculating collision map...",
            LoadStage::Finalize => "Finalizing load...",
        }
    }
}

/// Host-side model decoding.
pub trait SceneSource {
    fn load_model(&self, path: &Path) -> Result<Box<dyn StaticMesh>, SceneLoadError>;

    /// Build a height lookup from a ground mesh; heights outside the mesh
    /// are `null_height`.
    fn ground_height(&self, ground: &dyn StaticMesh, null_height: f32) -> Option<Box<dyn GroundHeight>>;
}

/// A fully loaded scene waiting to become active.
pub struct LoadedScene {
    /// Description with values resolved during loading (such as the ground
    /// null height).
    pub info: SceneInfo,
    pub model: Box<dyn StaticMesh>,
    pub ground_height: Option<Box<dyn GroundHeight>>,
}

impl std::fmt::Debug for LoadedScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedScene")
            .field("info", &self.info)
            .field("bounding_box", &self.model.bounding_box())
            .field("has_ground_height", &self.ground_height.is_some())
            .finish()
    }
}

#[derive(Debug, Default, Clone)]
pub struct SceneLoader {
    cancel: Arc<AtomicBool>,
}

impl SceneLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared flag; storing `true` cancels the load at the next stage
    /// boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn check_cancel(&self) -> Result<(), SceneLoadError> {
        if self.is_cancelled() {
            tracing::info!("scene load cancelled");
            Err(SceneLoadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run every stage. Clears a previous cancellation first.
    pub fn load(
        &self,
        info: &SceneInfo,
        source: &dyn SceneSource,
        progress: &mut dyn FnMut(LoadStage),
    ) -> Result<LoadedScene, SceneLoadError> {
        self.cancel.store(false, Ordering::Release);
        let mut info = info.clone();
        let transform = info.model_transform();

        progress(LoadStage::Model);
        let model_path = info.model_path();
        tracing::info!(path = %model_path.display(), "loading scene model");
        let mut model = source.load_model(&model_path)?;
        self.check_cancel()?;

        progress(LoadStage::Transform);
        model.transform(&transform);
        self.check_cancel()?;

        let ground = match &info.model_ground {
            GroundModel::File(_) => {
                progress(LoadStage::Ground);
                let path = info
                    .ground_path()
                    .ok_or_else(|| SceneLoadError::MissingModel(info.base_dir.clone()))?;
                tracing::info!(path = %path.display(), "loading ground model");
                let mut ground = source.load_model(&path)?;
                self.check_cancel()?;
                ground.transform(&transform);
                Some(ground)
            }
            GroundModel::SameAsScenery | GroundModel::Disabled => None,
        };
        self.check_cancel()?;

        let ground_mesh: Option<&dyn StaticMesh> = match (&info.model_ground, &ground) {
            (GroundModel::Disabled, _) => None,
            (_, Some(ground)) => Some(ground.as_ref()),
            (_, None) => Some(model.as_ref()),
        };

        if info.ground_null_height_from_model {
            let bbox = ground_mesh.unwrap_or(model.as_ref()).bounding_box();
            if !bbox.is_empty() {
                info.ground_null_height = bbox.min.z;
            }
            tracing::debug!(height = info.ground_null_height, "ground null height taken from model");
        }
        self.check_cancel()?;

        progress(LoadStage::GroundHeight);
        let ground_height = ground_mesh.and_then(|mesh| source.ground_height(mesh, info.ground_null_height));

        progress(LoadStage::Finalize);
        Ok(LoadedScene {
            info,
            model,
            ground_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use glam::Vec3;

    use super::*;
    use crate::{FlatGround, InMemoryMesh, Material};

    struct FakeSource {
        loaded: RefCell<Vec<PathBuf>>,
        cancel_on_load: Option<Arc<AtomicBool>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                loaded: RefCell::new(Vec::new()),
                cancel_on_load: None,
            }
        }
    }

    impl SceneSource for FakeSource {
        fn load_model(&self, path: &Path) -> Result<Box<dyn StaticMesh>, SceneLoadError> {
            self.loaded.borrow_mut().push(path.to_path_buf());
            if let Some(flag) = &self.cancel_on_load {
                flag.store(true, Ordering::Release);
            }
            if path.ends_with("missing.obj") {
                return Err(SceneLoadError::MissingModel(path.to_path_buf()));
            }
            Ok(Box::new(InMemoryMesh::cuboid(
                Vec3::new(-10.0, -10.0, -2.0),
                Vec3::new(10.0, 10.0, 8.0),
                Material::default(),
            )))
        }

        fn ground_height(&self, ground: &dyn StaticMesh, _null_height: f32) -> Option<Box<dyn GroundHeight>> {
            Some(Box::new(FlatGround(ground.bounding_box().min.z)))
        }
    }

    #[test]
    fn test_stages_reported_in_order() {
        let mut info = SceneInfo::default();
        info.model_ground = GroundModel::File("ground.obj".into());
        let mut stages = Vec::new();
        let loaded = SceneLoader::new()
            .load(&info, &FakeSource::new(), &mut |s| stages.push(s))
            .unwrap();
        assert_eq!(
            stages,
            vec![
                LoadStage::Model,
                LoadStage::Transform,
                LoadStage::Ground,
                LoadStage::GroundHeight,
                LoadStage::Finalize
            ]
        );
        assert!(loaded.ground_height.is_some());
    }

    #[test]
    fn test_ground_same_as_scenery_loads_one_model() {
        let source = FakeSource::new();
        let loaded = SceneLoader::new()
            .load(&SceneInfo::default(), &source, &mut |_| {})
            .unwrap();
        assert_eq!(source.loaded.borrow().len(), 1);
        assert_eq!(loaded.ground_height.unwrap().height_at(0.0, 0.0), -2.0);
    }

    #[test]
    fn test_disabled_ground_has_no_heights() {
        let mut info = SceneInfo::default();
        info.model_ground = GroundModel::Disabled;
        let loaded = SceneLoader::new().load(&info, &FakeSource::new(), &mut |_| {}).unwrap();
        assert!(loaded.ground_height.is_none());
    }

    #[test]
    fn test_null_height_from_model() {
        let mut info = SceneInfo::default();
        info.ground_null_height_from_model = true;
        let loaded = SceneLoader::new().load(&info, &FakeSource::new(), &mut |_| {}).unwrap();
        assert_eq!(loaded.info.ground_null_height, -2.0);
    }

    #[test]
    fn test_missing_model_aborts() {
        let mut info = SceneInfo::default();
        info.model_scenery = "missing.obj".into();
        let result = SceneLoader::new().load(&info, &FakeSource::new(), &mut |_| {});
        assert!(matches!(result, Err(SceneLoadError::MissingModel(_))));
    }

    #[test]
    fn test_cancel_between_stages() {
        let loader = SceneLoader::new();
        let mut source = FakeSource::new();
        source.cancel_on_load = Some(loader.cancel_handle());
        let mut stages = Vec::new();
        let result = loader.load(&SceneInfo::default(), &source, &mut |s| stages.push(s));
        assert!(matches!(result, Err(SceneLoadError::Cancelled)));
        assert_eq!(stages, vec![LoadStage::Model]);
        assert!(loader.is_cancelled());
    }

    #[test]
    fn test_model_is_rotated_into_grid() {
        let mut info = SceneInfo::default();
        info.grid_rotation_deg = 90.0;
        let source = FakeSource::new();
        let loaded = SceneLoader::new().load(&info, &source, &mut |_| {}).unwrap();
        let bbox = loaded.model.bounding_box();
        assert!((bbox.max.x - 10.0).abs() < 1e-4);
        assert!((bbox.min.z + 2.0).abs() < 1e-4);
    }
}
