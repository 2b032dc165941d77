//! Per-scene settings, stored next to the model files as `scene.ron`.

use std::path::{Path, PathBuf};

use glam::{DMat3, DVec3, Mat4};
use serde::{Deserialize, Serialize};

use crate::SceneLoadError;

/// Which mesh the ground height lookup is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum GroundModel {
    /// Use the scenery model itself.
    #[default]
    SameAsScenery,
    /// No ground model; the ground is flat at the null height.
    Disabled,
    /// A separate model file, relative to the scene directory.
    File(String),
}

/// Description of one scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneInfo {
    pub id: String,
    pub name: String,
    /// Directory the relative model paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Scenery model file, relative to the scene directory.
    pub model_scenery: String,
    pub model_ground: GroundModel,
    /// Near clip distance of the camera.
    pub cam_near_z: f32,
    /// Far clip distance of the camera.
    pub cam_far_z: f32,
    /// Distance up to which shadows are rendered.
    pub shadow_far_z: f32,
    /// Height of the eye above the ground.
    pub eye_level: f32,
    /// Fixed cascade split weight, or `None` to derive it from the scene size.
    pub shadow_split_weight: Option<f32>,
    /// Alpha below which textured fragments are discarded.
    pub transparency_threshold: f32,
    /// Ground height outside the ground model.
    pub ground_null_height: f32,
    /// Take the null height from the lowest point of the ground model.
    pub ground_null_height_from_model: bool,
    /// Start at the horizontal center of the model's bounding box.
    pub start_position_from_model: bool,
    /// Start position in model coordinates when not taken from the model.
    pub relative_start_position: [f64; 2],
    /// Offset of the model origin in grid coordinates (e.g. UTM).
    pub model_world_offset: [f64; 3],
    /// Rotation from model grid to true north, in degrees about +z.
    pub grid_rotation_deg: f64,
}

impl Default for SceneInfo {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            base_dir: PathBuf::new(),
            model_scenery: "scene.obj".to_string(),
            model_ground: GroundModel::SameAsScenery,
            cam_near_z: 0.3,
            cam_far_z: 10_000.0,
            shadow_far_z: 2_000.0,
            eye_level: 1.65,
            shadow_split_weight: None,
            transparency_threshold: 0.5,
            ground_null_height: 0.0,
            ground_null_height_from_model: false,
            start_position_from_model: true,
            relative_start_position: [0.0, 0.0],
            model_world_offset: [0.0, 0.0, 0.0],
            grid_rotation_deg: 0.0,
        }
    }
}

impl SceneInfo {
    /// Name of the description file inside a scene directory.
    pub const FILE_NAME: &'static str = "scene.ron";

    /// Parse a description from RON text.
    pub fn from_ron(text: &str) -> Result<Self, SceneLoadError> {
        ron::from_str(text).map_err(SceneLoadError::Parse)
    }

    /// Read `scene.ron` from a scene directory.
    pub fn load(scene_dir: &Path) -> Result<Self, SceneLoadError> {
        let path = scene_dir.join(Self::FILE_NAME);
        let text = std::fs::read_to_string(&path).map_err(|source| SceneLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let mut info = Self::from_ron(&text)?;
        info.base_dir = scene_dir.to_path_buf();
        tracing::debug!(scene = %info.id, "parsed scene description");
        Ok(info)
    }

    pub fn model_path(&self) -> PathBuf {
        self.base_dir.join(&self.model_scenery)
    }

    /// Path of a separate ground model, if one is configured.
    pub fn ground_path(&self) -> Option<PathBuf> {
        match &self.model_ground {
            GroundModel::File(file) => Some(self.base_dir.join(file)),
            GroundModel::SameAsScenery | GroundModel::Disabled => None,
        }
    }

    /// Rotation from model grid coordinates to the observer's horizontal
    /// frame.
    pub fn z_rotation(&self) -> DMat3 {
        DMat3::from_rotation_z(self.grid_rotation_deg.to_radians())
    }

    /// Transform applied to model vertices when the scene is loaded.
    pub fn model_transform(&self) -> Mat4 {
        Mat4::from_rotation_z(self.grid_rotation_deg.to_radians() as f32)
    }

    pub fn world_offset(&self) -> DVec3 {
        DVec3::from_array(self.model_world_offset)
    }
}
