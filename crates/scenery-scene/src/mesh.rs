//! Static scene geometry as seen by the renderer.
//!
//! Loading, decoding and GPU upload of meshes and textures happen in the
//! host; the renderer only needs material batches, their index ranges and the
//! bounding box.

use glam::{Mat4, Vec3};
use scenery_math::Aabb;

/// Opaque handle of a texture owned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Illumination model of a material, ordered from simplest to richest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Illumination {
    /// Diffuse color doubles as ambient color.
    #[default]
    Diffuse,
    /// Separate ambient and diffuse colors.
    DiffuseAndAmbient,
    /// Ambient, diffuse and specular.
    Specular,
    /// Specular with alpha blending.
    Translucent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emission: Vec3,
    pub shininess: f32,
    /// Opacity, only honored for translucent materials.
    pub alpha: f32,
    pub illumination: Illumination,
    pub diffuse_texture: Option<TextureId>,
    pub emissive_texture: Option<TextureId>,
    pub bump_texture: Option<TextureId>,
    pub height_texture: Option<TextureId>,
    /// Cull back faces when drawing batches of this material.
    pub backface_cull: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ZERO,
            emission: Vec3::ZERO,
            shininess: 8.0,
            alpha: 1.0,
            illumination: Illumination::Diffuse,
            diffuse_texture: None,
            emissive_texture: None,
            bump_texture: None,
            height_texture: None,
            backface_cull: true,
        }
    }
}

impl Material {
    pub fn is_translucent(&self) -> bool {
        self.illumination == Illumination::Translucent
    }
}

/// A run of triangles sharing one material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialBatch {
    /// Index into [`StaticMesh::materials`].
    pub material: usize,
    /// First index in the mesh's index buffer.
    pub first_index: u32,
    pub index_count: u32,
}

/// Loaded scene geometry.
pub trait StaticMesh {
    fn materials(&self) -> &[Material];

    /// Batches in draw order.
    fn batches(&self) -> &[MaterialBatch];

    fn bounding_box(&self) -> Aabb;

    /// Bake a transform into the vertex data.
    fn transform(&mut self, matrix: &Mat4);

    fn triangle_count(&self) -> u32 {
        self.batches().iter().map(|b| b.index_count / 3).sum()
    }
}

/// Mesh kept entirely on the CPU, for tests and headless rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InMemoryMesh {
    pub positions: Vec<Vec3>,
    pub materials: Vec<Material>,
    pub batches: Vec<MaterialBatch>,
}

impl InMemoryMesh {
    /// An axis-aligned box with one material, twelve triangles.
    pub fn cuboid(min: Vec3, max: Vec3, material: Material) -> Self {
        let aabb = Aabb::new(min, max);
        Self {
            positions: aabb.corners().to_vec(),
            materials: vec![material],
            batches: vec![MaterialBatch {
                material: 0,
                first_index: 0,
                index_count: 36,
            }],
        }
    }

    /// Append another mesh's batches and materials.
    pub fn merge(&mut self, other: InMemoryMesh) {
        let material_offset = self.materials.len();
        let index_offset = self
            .batches
            .iter()
            .map(|b| b.first_index + b.index_count)
            .max()
            .unwrap_or(0);
        self.positions.extend(other.positions);
        self.materials.extend(other.materials);
        self.batches.extend(other.batches.into_iter().map(|b| MaterialBatch {
            material: b.material + material_offset,
            first_index: b.first_index + index_offset,
            index_count: b.index_count,
        }));
    }
}

impl StaticMesh for InMemoryMesh {
    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn batches(&self) -> &[MaterialBatch] {
        &self.batches
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    fn transform(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
    }
}

/// Non-blocking texture readiness query.
pub trait TextureSource {
    fn is_ready(&self, id: TextureId) -> bool;
}

/// Every texture is always ready.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllTexturesReady;

impl TextureSource for AllTexturesReady {
    fn is_ready(&self, _id: TextureId) -> bool {
        true
    }
}
