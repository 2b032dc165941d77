//! Observer position in the scene and its movement.
//!
//! Positions are kept as the translation that brings the observer to the
//! origin, in double precision since grid coordinates can be large.

use glam::{DVec3, Vec3};
use scenery_math::Aabb;
use scenery_scene::{GroundHeight, SceneInfo};

/// Walking speed factor, per second and degree of field of view.
const MOVE_SPEED: f64 = 0.01;

/// Narrowest field of view that still scales movement.
const MIN_MOVE_FOV: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    absolute_position: DVec3,
    eye_height: f64,
}

impl Default for Observer {
    fn default() -> Self {
        Self {
            absolute_position: DVec3::ZERO,
            eye_height: SceneInfo::default().eye_level as f64,
        }
    }
}

impl Observer {
    /// Put the observer at the scene's start position, on the ground.
    pub fn place(&mut self, info: &SceneInfo, bounds: &Aabb, ground: Option<&dyn GroundHeight>) {
        if info.start_position_from_model && !bounds.is_empty() {
            let center = bounds.center();
            self.absolute_position.x = -(center.x as f64);
            self.absolute_position.y = -(center.y as f64);
        } else {
            self.absolute_position.x = info.relative_start_position[0];
            self.absolute_position.y = info.relative_start_position[1];
        }
        self.eye_height = info.eye_level as f64;
        self.follow_ground(info, ground);
        tracing::debug!(position = ?self.eye_position(), "observer placed");
    }

    /// Move by `movement` (forward, sideways, down) relative to the view
    /// azimuth, scaled by frame time and field of view. Returns whether the
    /// observer moved.
    pub fn walk(
        &mut self,
        info: &SceneInfo,
        ground: Option<&dyn GroundHeight>,
        dt: f64,
        movement: Vec3,
        view_direction: Vec3,
        fov_deg: f32,
    ) -> bool {
        let movement = movement.as_dvec3();
        let azimuth = (view_direction.y as f64).atan2(view_direction.x as f64);
        let (sin_az, cos_az) = azimuth.sin_cos();
        let step = DVec3::new(
            movement.x * cos_az + movement.y * sin_az,
            movement.x * sin_az - movement.y * cos_az,
            movement.z,
        );
        let moved = step.length_squared() > 0.0;

        let step = info.z_rotation() * (step * dt * MOVE_SPEED * (fov_deg as f64).max(MIN_MOVE_FOV));
        self.absolute_position.x += step.x;
        self.absolute_position.y += step.y;
        self.eye_height -= step.z;
        self.follow_ground(info, ground);
        moved
    }

    fn ground_height(&self, info: &SceneInfo, ground: Option<&dyn GroundHeight>) -> f64 {
        match ground {
            Some(ground) => ground.height_at(
                -self.absolute_position.x as f32,
                -self.absolute_position.y as f32,
            ) as f64,
            None => info.ground_null_height as f64,
        }
    }

    fn follow_ground(&mut self, info: &SceneInfo, ground: Option<&dyn GroundHeight>) {
        self.absolute_position.z = -self.ground_height(info, ground) - self.eye_height;
    }

    /// Translation taking world space to observer-centred space.
    pub fn translation(&self) -> DVec3 {
        self.absolute_position
    }

    /// Camera eye in world space.
    pub fn eye_position(&self) -> Vec3 {
        (-self.absolute_position).as_vec3()
    }

    pub fn eye_height(&self) -> f64 {
        self.eye_height
    }

    /// Foot position in grid coordinates.
    pub fn grid_position(&self, info: &SceneInfo) -> DVec3 {
        let mut pos = info.z_rotation() * -self.absolute_position + info.world_offset();
        pos.z -= self.eye_height;
        pos
    }

    /// Move the observer's feet to `pos`, given in grid coordinates.
    pub fn set_grid_position(&mut self, info: &SceneInfo, mut pos: DVec3) {
        pos.z += self.eye_height;
        pos -= info.world_offset();
        self.absolute_position = -(info.z_rotation().inverse() * pos);
    }
}
