//! Draw batches for the scene mesh: program selection and material colors
//! premixed with the frame's light.

use scenery_config::{Config, ShadowFilterQuality};
use scenery_lighting::LightingState;
use scenery_render::{
    BatchDraw, BlendMode, MaterialUniforms, ProgramKey, ProgramPass, TextureBindings,
};
use scenery_scene::{Illumination, Material, StaticMesh, TextureId, TextureSource};

/// Renderer-wide shading switches that select program variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderParameters {
    pub pixel_lighting: bool,
    pub shadows: bool,
    pub shadow_filter: ShadowFilterQuality,
    pub bump: bool,
    pub torch: bool,
}

impl ShaderParameters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pixel_lighting: config.render.pixel_lighting,
            shadows: config.shadow.enabled,
            shadow_filter: config.shadow.filter_quality,
            bump: config.render.bump_mapping,
            torch: config.lighting.torch_enabled,
        }
    }
}

fn ready(id: Option<TextureId>, textures: &dyn TextureSource) -> Option<TextureId> {
    id.filter(|id| textures.is_ready(*id))
}

/// Textures of `material` that can be bound this frame.
pub fn bound_textures(
    material: &Material,
    params: &ShaderParameters,
    textures: &dyn TextureSource,
) -> TextureBindings {
    TextureBindings {
        diffuse: ready(material.diffuse_texture, textures),
        emissive: ready(material.emissive_texture, textures),
        bump: ready(material.bump_texture, textures).filter(|_| params.bump),
        height: ready(material.height_texture, textures).filter(|_| params.bump),
    }
}

pub fn shading_program(params: &ShaderParameters, bindings: &TextureBindings) -> ProgramKey {
    ProgramKey {
        pass: ProgramPass::Shaded,
        pixel_lighting: params.pixel_lighting,
        shadows: params.shadows,
        shadow_filter: params.shadow_filter,
        bump: bindings.bump.is_some(),
        height: bindings.height.is_some(),
        torch: params.torch,
        layered: false,
        diffuse_texture: bindings.diffuse.is_some(),
        emissive_texture: bindings.emissive.is_some(),
        alpha_test: bindings.diffuse.is_some(),
    }
}

pub fn depth_program(bindings: &TextureBindings) -> ProgramKey {
    ProgramKey {
        pass: ProgramPass::Depth,
        diffuse_texture: bindings.diffuse.is_some(),
        alpha_test: bindings.diffuse.is_some(),
        ..ProgramKey::default()
    }
}

/// Material colors multiplied by the light colors.
pub fn material_uniforms(material: &Material, light: &LightingState) -> MaterialUniforms {
    let ambient_base = if material.illumination > Illumination::Diffuse {
        material.ambient
    } else {
        material.diffuse
    };
    MaterialUniforms {
        ambient: ambient_base * light.ambient,
        diffuse: material.diffuse * light.directional,
        torch_diffuse: material.diffuse * light.torch_diffuse,
        emissive: material.emission * light.emissive,
        specular: material.specular * light.specular,
        shininess: material.shininess,
        alpha: if material.is_translucent() {
            material.alpha
        } else {
            1.0
        },
    }
}

/// Shaded batches for every material range of `mesh`. Translucent
/// materials blend with `translucent_blend`.
pub fn shading_batches(
    mesh: &dyn StaticMesh,
    textures: &dyn TextureSource,
    params: &ShaderParameters,
    light: &LightingState,
    translucent_blend: BlendMode,
) -> Vec<BatchDraw> {
    let materials = mesh.materials();
    mesh.batches()
        .iter()
        .filter_map(|batch| {
            let Some(material) = materials.get(batch.material) else {
                tracing::warn!(material = batch.material, "batch references a missing material");
                return None;
            };
            let bindings = bound_textures(material, params, textures);
            Some(BatchDraw {
                program: shading_program(params, &bindings),
                material: Some(material_uniforms(material, light)),
                textures: bindings,
                blend: if material.is_translucent() {
                    translucent_blend
                } else {
                    BlendMode::Opaque
                },
                cull_back_faces: material.backface_cull,
                first_index: batch.first_index,
                index_count: batch.index_count,
            })
        })
        .collect()
}

/// Depth-only batches for the shadow passes; only the diffuse texture is
/// bound, for alpha testing.
pub fn depth_batches(mesh: &dyn StaticMesh, textures: &dyn TextureSource) -> Vec<BatchDraw> {
    let materials = mesh.materials();
    mesh.batches()
        .iter()
        .filter_map(|batch| {
            let material = materials.get(batch.material)?;
            let bindings = TextureBindings {
                diffuse: ready(material.diffuse_texture, textures),
                ..TextureBindings::default()
            };
            Some(BatchDraw {
                program: depth_program(&bindings),
                material: None,
                textures: bindings,
                blend: BlendMode::Opaque,
                cull_back_faces: material.backface_cull,
                first_index: batch.first_index,
                index_count: batch.index_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use scenery_scene::{AllTexturesReady, InMemoryMesh};

    use super::*;

    struct OnlyReady(Vec<TextureId>);

    impl TextureSource for OnlyReady {
        fn is_ready(&self, id: TextureId) -> bool {
            self.0.contains(&id)
        }
    }

    fn light() -> LightingState {
        LightingState {
            ambient: Vec3::splat(0.2),
            directional: Vec3::splat(0.5),
            emissive: Vec3::splat(0.25),
            specular: Vec3::splat(0.1),
            torch_diffuse: Vec3::splat(0.4),
            ..LightingState::default()
        }
    }

    fn textured() -> Material {
        Material {
            diffuse_texture: Some(TextureId(1)),
            emissive_texture: Some(TextureId(2)),
            bump_texture: Some(TextureId(3)),
            height_texture: Some(TextureId(4)),
            ..Material::default()
        }
    }

    #[test]
    fn test_diffuse_model_uses_diffuse_as_ambient() {
        let material = Material {
            ambient: Vec3::new(1.0, 0.0, 0.0),
            diffuse: Vec3::new(0.0, 1.0, 0.0),
            ..Material::default()
        };
        let uniforms = material_uniforms(&material, &light());
        assert_eq!(uniforms.ambient, Vec3::new(0.0, 0.2, 0.0));
        assert_eq!(uniforms.diffuse, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(uniforms.torch_diffuse, Vec3::new(0.0, 0.4, 0.0));

        let ambient_model = Material {
            illumination: Illumination::DiffuseAndAmbient,
            ..material
        };
        assert_eq!(
            material_uniforms(&ambient_model, &light()).ambient,
            Vec3::new(0.2, 0.0, 0.0)
        );
    }

    #[test]
    fn test_alpha_forced_opaque_unless_translucent() {
        let mut material = Material {
            alpha: 0.4,
            ..Material::default()
        };
        assert_eq!(material_uniforms(&material, &light()).alpha, 1.0);
        material.illumination = Illumination::Translucent;
        assert_eq!(material_uniforms(&material, &light()).alpha, 0.4);
    }

    #[test]
    fn test_unready_textures_are_not_bound() {
        let params = ShaderParameters {
            bump: true,
            ..ShaderParameters::default()
        };
        let bindings = bound_textures(&textured(), &params, &OnlyReady(vec![TextureId(1), TextureId(3)]));
        assert_eq!(bindings.diffuse, Some(TextureId(1)));
        assert_eq!(bindings.emissive, None);
        assert_eq!(bindings.bump, Some(TextureId(3)));
        assert_eq!(bindings.height, None);

        let key = shading_program(&params, &bindings);
        assert!(key.diffuse_texture && key.alpha_test && key.bump);
        assert!(!key.emissive_texture && !key.height);
    }

    #[test]
    fn test_bump_maps_need_global_switch() {
        let bindings =
            bound_textures(&textured(), &ShaderParameters::default(), &AllTexturesReady);
        assert!(bindings.bump.is_none() && bindings.height.is_none());
        assert!(bindings.diffuse.is_some());
    }

    #[test]
    fn test_translucent_batches_blend() {
        let mut mesh = InMemoryMesh::cuboid(Vec3::ZERO, Vec3::ONE, Material::default());
        mesh.merge(InMemoryMesh::cuboid(
            Vec3::splat(2.0),
            Vec3::splat(3.0),
            Material {
                illumination: Illumination::Translucent,
                backface_cull: false,
                ..Material::default()
            },
        ));
        let batches = shading_batches(
            &mesh,
            &AllTexturesReady,
            &ShaderParameters::default(),
            &light(),
            BlendMode::AlphaAdditive,
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].blend, BlendMode::Opaque);
        assert!(batches[0].cull_back_faces);
        assert_eq!(batches[1].blend, BlendMode::AlphaAdditive);
        assert!(!batches[1].cull_back_faces);
        assert_eq!(batches[1].first_index, 36);
    }

    #[test]
    fn test_depth_batches_bind_only_diffuse() {
        let mesh = InMemoryMesh::cuboid(Vec3::ZERO, Vec3::ONE, textured());
        let batches = depth_batches(&mesh, &AllTexturesReady);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.program.pass, ProgramPass::Depth);
        assert!(batch.program.alpha_test);
        assert!(batch.material.is_none());
        assert_eq!(batch.textures.diffuse, Some(TextureId(1)));
        assert_eq!(batch.textures.emissive, None);
    }

    #[test]
    fn test_global_parameters_select_program() {
        let params = ShaderParameters {
            pixel_lighting: true,
            shadows: true,
            shadow_filter: ShadowFilterQuality::High,
            bump: false,
            torch: true,
        };
        let key = shading_program(&params, &TextureBindings::default());
        assert!(key.pixel_lighting && key.shadows && key.torch);
        assert_eq!(key.shadow_filter, ShadowFilterQuality::High);
        assert!(!key.alpha_test);
    }
}
