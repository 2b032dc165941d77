//! Scene loading through the orchestrator.

use std::cell::Cell;
use std::path::Path;

use glam::{DVec3, Vec3};
use scenery_config::Config;
use scenery_core::Scenery3d;
use scenery_render::RecordingBackend;
use scenery_scene::{
    FlatGround, GroundHeight, GroundModel, InMemoryMesh, LoadStage, Material, RecordingNotifier,
    SceneInfo, SceneLoadError, SceneSource, StaticMesh,
};

/// Serves cuboid models; the model's extent is taken from the file name.
struct CuboidSource {
    ground_level: f32,
    cancel_after_model: Option<scenery_scene::SceneLoader>,
    loads: Cell<u32>,
}

impl CuboidSource {
    fn new() -> Self {
        Self {
            ground_level: 2.0,
            cancel_after_model: None,
            loads: Cell::new(0),
        }
    }
}

impl SceneSource for CuboidSource {
    fn load_model(&self, path: &Path) -> Result<Box<dyn StaticMesh>, SceneLoadError> {
        self.loads.set(self.loads.get() + 1);
        if let Some(loader) = &self.cancel_after_model {
            loader.cancel();
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SceneLoadError::MissingModel(path.to_path_buf()))?;
        let half: f32 = stem.parse().map_err(|_| SceneLoadError::CorruptModel {
            path: path.to_path_buf(),
            reason: format!("'{stem}' is not a size"),
        })?;
        Ok(Box::new(InMemoryMesh::cuboid(
            Vec3::new(-half, -half, 0.0),
            Vec3::new(half, half, half / 4.0),
            Material::default(),
        )))
    }

    fn ground_height(
        &self,
        _ground: &dyn StaticMesh,
        _null_height: f32,
    ) -> Option<Box<dyn GroundHeight>> {
        Some(Box::new(FlatGround(self.ground_level)))
    }
}

fn info(model: &str) -> SceneInfo {
    SceneInfo {
        id: model.to_string(),
        name: format!("Cuboid {model}"),
        model_scenery: format!("{model}.obj"),
        ..SceneInfo::default()
    }
}

#[test]
fn test_load_reports_stages_and_activates_scene() {
    let mut scenery = Scenery3d::<RecordingBackend>::new(&Config::default());
    let mut stages = Vec::new();
    scenery
        .load_scene(
            &info("40"),
            &CuboidSource::new(),
            &mut |stage| stages.push(stage),
            &RecordingNotifier::new(),
        )
        .unwrap();
    assert_eq!(
        stages,
        vec![
            LoadStage::Model,
            LoadStage::Transform,
            LoadStage::GroundHeight,
            LoadStage::Finalize
        ]
    );
    assert_eq!(scenery.scene_info().unwrap().id, "40");
    let eye = scenery.observer().eye_position();
    assert!((eye.z - (2.0 + SceneInfo::default().eye_level)).abs() < 1e-5);
}

#[test]
fn test_failed_load_keeps_previous_scene_and_notifies() {
    let mut scenery = Scenery3d::<RecordingBackend>::new(&Config::default());
    let notifier = RecordingNotifier::new();
    let source = CuboidSource::new();
    scenery
        .load_scene(&info("40"), &source, &mut |_| {}, &notifier)
        .unwrap();

    let err = scenery
        .load_scene(&info("broken"), &source, &mut |_| {}, &notifier)
        .unwrap_err();
    assert!(matches!(err, SceneLoadError::CorruptModel { .. }));
    assert_eq!(scenery.scene_info().unwrap().id, "40");
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Cuboid broken"));
}

#[test]
fn test_cancelled_load_is_silent() {
    let mut scenery = Scenery3d::<RecordingBackend>::new(&Config::default());
    let notifier = RecordingNotifier::new();
    let source = CuboidSource {
        cancel_after_model: Some(scenery.loader().clone()),
        ..CuboidSource::new()
    };
    let err = scenery
        .load_scene(&info("40"), &source, &mut |_| {}, &notifier)
        .unwrap_err();
    assert!(matches!(err, SceneLoadError::Cancelled));
    assert!(!scenery.has_scene());
    assert!(notifier.messages().is_empty());
    assert_eq!(source.loads.get(), 1);
}

#[test]
fn test_scene_description_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(SceneInfo::FILE_NAME),
        r#"(
            id: "quarry",
            name: "Quarry",
            model_scenery: "150.obj",
            model_ground: Disabled,
            eye_level: 1.8,
            ground_null_height: 4.0,
            start_position_from_model: false,
            relative_start_position: (10.0, -5.0),
            model_world_offset: (400000.0, 5300000.0, 250.0),
            grid_rotation_deg: 90.0,
        )"#,
    )
    .unwrap();
    let info = SceneInfo::load(dir.path()).unwrap();

    let mut scenery = Scenery3d::<RecordingBackend>::new(&Config::default());
    scenery
        .load_scene(&info, &CuboidSource::new(), &mut |_| {}, &RecordingNotifier::new())
        .unwrap();

    // Ground disabled: the null height carries the observer.
    let eye = scenery.observer().eye_position();
    assert_eq!((eye.x, eye.y), (-10.0, 5.0));
    assert!((eye.z - 5.8).abs() < 1e-5);

    let grid = scenery.grid_position().unwrap();
    assert!((grid.z - 254.0).abs() < 1e-6);

    let target = DVec3::new(400_020.0, 5_300_010.0, 254.0);
    scenery.set_grid_position(target);
    assert!((scenery.grid_position().unwrap() - target).length() < 1e-6);
    assert_eq!(scenery.cubemap().last_update(), 0.0);

    // Auto split weight from a 150 unit extent.
    assert_eq!(scenery.shadow_renderer().settings().split_weight, None);
    assert_eq!(
        scenery_shadow::resolve_split_weight(None, &scenery.scene_bounds().unwrap()),
        0.6
    );
    assert_eq!(info.model_ground, GroundModel::Disabled);
}
