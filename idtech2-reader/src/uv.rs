use std::collections::HashMap;

use nalgebra_glm::{dot, Vec3};
use thiserror::Error;

use crate::bsp::TexInfo;
use crate::level::{DecodedLevel, Polygon};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureResolution {
    pub width: u32,
    pub height: u32,
}

impl TextureResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no usable resolution for texture {texture_name:?}")]
pub struct MissingTextureResolution {
    pub texture_name: String,
}

/// Supplies the pixel dimensions of the image behind a texinfo, if one was found.
pub trait TextureResolver {
    fn resolve(&self, tex_info_index: usize, tex_info: &TexInfo) -> Option<TextureResolution>;
}

/// Keyed by texture name.
impl TextureResolver for HashMap<String, TextureResolution> {
    fn resolve(&self, _tex_info_index: usize, tex_info: &TexInfo) -> Option<TextureResolution> {
        self.get(&tex_info.texture_name).copied()
    }
}

/// Indexed by texinfo.
impl TextureResolver for [Option<TextureResolution>] {
    fn resolve(&self, tex_info_index: usize, _tex_info: &TexInfo) -> Option<TextureResolution> {
        self.get(tex_info_index).copied().flatten()
    }
}

impl TextureResolver for Vec<Option<TextureResolution>> {
    fn resolve(&self, tex_info_index: usize, tex_info: &TexInfo) -> Option<TextureResolution> {
        self.as_slice().resolve(tex_info_index, tex_info)
    }
}

impl<T: TextureResolver + ?Sized> TextureResolver for &T {
    fn resolve(&self, tex_info_index: usize, tex_info: &TexInfo) -> Option<TextureResolution> {
        (**self).resolve(tex_info_index, tex_info)
    }
}

/// Projects a world-space position onto the texinfo axes, normalized by the image size.
///
/// `v` is flipped so that the top row of the image sits at `v = 1`.
pub fn project_uv(
    position: &Vec3,
    tex_info: &TexInfo,
    resolution: Option<TextureResolution>,
) -> Result<[f32; 2], MissingTextureResolution> {
    let resolution = resolution
        .filter(|r| r.width > 0 && r.height > 0)
        .ok_or_else(|| MissingTextureResolution {
            texture_name: tex_info.texture_name.clone(),
        })?;

    let u = (dot(position, &tex_info.u_axis) + tex_info.u_offset) / resolution.width as f32;
    let v = 1.0 - (dot(position, &tex_info.v_axis) + tex_info.v_offset) / resolution.height as f32;
    Ok([u, v])
}

/// UVs for every vertex of a polygon's loop, in loop order.
pub fn project_polygon_uvs<R: TextureResolver + ?Sized>(
    level: &DecodedLevel,
    polygon: &Polygon,
    resolver: &R,
) -> Result<Vec<[f32; 2]>, MissingTextureResolution> {
    let tex_info = &level.tex_infos()[polygon.tex_info_index];
    let resolution = resolver.resolve(polygon.tex_info_index, tex_info);
    level
        .polygon_positions(polygon)
        .map(|position| project_uv(position, tex_info, resolution))
        .collect()
}
