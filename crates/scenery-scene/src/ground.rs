/// Terrain height lookup used to keep the observer on the ground.
pub trait GroundHeight {
    /// Height in model coordinates at the horizontal position `(x, y)`.
    fn height_at(&self, x: f32, y: f32) -> f32;
}

/// Constant height everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatGround(pub f32);

impl GroundHeight for FlatGround {
    fn height_at(&self, _x: f32, _y: f32) -> f32 {
        self.0
    }
}
