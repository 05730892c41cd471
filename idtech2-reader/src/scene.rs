use log::info;
use nalgebra_glm::Vec3;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entities::Entity;
use crate::level::DecodedLevel;
use crate::lightmap::{build_lightmap_atlas, LightmapAtlas, LightmapOptions};
use crate::material::MaterialTable;
use crate::uv::{project_polygon_uvs, TextureResolver};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneOptions {
    /// Multiplies every vertex position and entity origin.
    pub scale: f32,
    /// `None` skips the lightmap stage.
    pub lightmaps: Option<LightmapOptions>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            lightmaps: Some(LightmapOptions::default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenePolygon {
    pub face_index: usize,
    pub tex_info_index: usize,
    /// Indices into [`Scene::positions`].
    pub vertices: Vec<u32>,
    pub texture_uvs: Option<Vec<[f32; 2]>>,
    pub material: Option<usize>,
    pub lightmap_uvs: Option<Vec<[f32; 2]>>,
}

/// Renderable data for a whole level.
pub struct Scene {
    pub positions: Vec<Vec3>,
    pub polygons: Vec<ScenePolygon>,
    pub materials: MaterialTable,
    /// Texture name of every texinfo, by index.
    pub texture_names: Vec<String>,
    pub lightmap_atlas: Option<LightmapAtlas>,
    pub entities: Vec<Entity>,
    pub diagnostics: Vec<Diagnostic>,
    scale: f32,
}

impl Scene {
    pub fn build<R: TextureResolver + ?Sized>(
        level: &DecodedLevel,
        resolver: &R,
        options: &SceneOptions,
    ) -> Self {
        let mut diagnostics = Diagnostics::new();
        let materials = MaterialTable::build(level.tex_infos());

        let mut polygons: Vec<ScenePolygon> = level
            .polygons()
            .iter()
            .map(|polygon| {
                let texture_uvs = match project_polygon_uvs(level, polygon, resolver) {
                    Ok(uvs) => Some(uvs),
                    Err(missing) => {
                        diagnostics.push(Diagnostic::MissingTextureResolution {
                            face_index: polygon.face_index,
                            texture_name: missing.texture_name,
                        });
                        None
                    }
                };
                ScenePolygon {
                    face_index: polygon.face_index,
                    tex_info_index: polygon.tex_info_index,
                    vertices: polygon.vertices.clone(),
                    texture_uvs,
                    material: materials.material_for(polygon.tex_info_index),
                    lightmap_uvs: None,
                }
            })
            .collect();

        let lightmap_atlas = options.lightmaps.as_ref().and_then(|lightmap_options| {
            match build_lightmap_atlas(level, lightmap_options, &mut diagnostics) {
                Ok(atlas) => Some(atlas),
                Err(error) => {
                    diagnostics.push(Diagnostic::LightmapStageAborted { error });
                    None
                }
            }
        });
        if let Some(atlas) = &lightmap_atlas {
            for placed in &atlas.faces {
                polygons[placed.polygon_index].lightmap_uvs = Some(placed.uvs.clone());
            }
        }

        let positions = level
            .vertices()
            .iter()
            .map(|v| v * options.scale)
            .collect();

        let mut all_diagnostics = level.diagnostics().to_vec();
        all_diagnostics.extend(diagnostics.into_vec());
        info!(
            "scene: {} polygons, {} materials, {} entities, {} diagnostics",
            polygons.len(),
            materials.len(),
            level.entities().len(),
            all_diagnostics.len(),
        );

        Self {
            positions,
            polygons,
            materials,
            texture_names: level
                .tex_infos()
                .iter()
                .map(|tex_info| tex_info.texture_name.clone())
                .collect(),
            lightmap_atlas,
            entities: level.entities().to_vec(),
            diagnostics: all_diagnostics,
            scale: options.scale,
        }
    }

    /// Scaled `origin` of an entity, if it has one.
    pub fn entity_origin(&self, entity_index: usize) -> Option<Vec3> {
        self.entities
            .get(entity_index)?
            .origin()
            .map(|origin| origin * self.scale)
    }

    pub fn polygon_positions<'s>(
        &'s self,
        polygon: &'s ScenePolygon,
    ) -> impl Iterator<Item = &'s Vec3> + 's {
        polygon
            .vertices
            .iter()
            .map(move |&index| &self.positions[index as usize])
    }
}
