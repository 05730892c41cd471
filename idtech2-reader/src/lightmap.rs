use log::{debug, info};
use nalgebra_glm::{cross, dot, length, Vec3};
use texture_atlas::{AtlasRect, PatchId, RgbU8Image, TextureAtlas, DEFAULT_MAX_WIDTH};
use thiserror::Error;

use crate::bsp::{Face, TexInfo};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::level::{DecodedLevel, Polygon};
use crate::lump::{LumpEntry, LumpId};

/// World units covered by one lightmap texel.
pub const SAMPLE_STEP: f32 = 16.0;

const MIN_SPAN: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightmapOptions {
    /// Flip each face raster and the resulting V coordinates.
    pub flip_v: bool,
    pub min_atlas_width: usize,
    pub max_atlas_width: usize,
}

impl Default for LightmapOptions {
    fn default() -> Self {
        Self {
            flip_v: true,
            min_atlas_width: 1,
            max_atlas_width: DEFAULT_MAX_WIDTH,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LightmapError {
    #[error("degenerate {width}x{height} lightmap extent")]
    Degenerate { width: i64, height: i64 },

    #[error("face has no lightmap")]
    NoLightmap,

    #[error("lightmap bytes {start}..{end} leave the {file_len} byte file")]
    OutOfBounds { start: i64, end: i64, file_len: usize },

    #[error("no face lightmaps could be packed")]
    Empty,
}

/// Texel dimensions of a face lightmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightmapExtent {
    pub width: usize,
    pub height: usize,
}

/// Projects the loop onto the texinfo axes in sample units and measures the covered texels.
pub fn lightmap_extent<'p>(
    positions: impl IntoIterator<Item = &'p Vec3>,
    tex_info: &TexInfo,
) -> Result<LightmapExtent, LightmapError> {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for position in positions {
        let st = [
            (dot(position, &tex_info.u_axis) - tex_info.u_offset) / SAMPLE_STEP,
            (dot(position, &tex_info.v_axis) - tex_info.v_offset) / SAMPLE_STEP,
        ];
        for axis in 0..2 {
            min[axis] = min[axis].min(st[axis]);
            max[axis] = max[axis].max(st[axis]);
        }
    }

    let span = |axis: usize| {
        if min[axis].is_finite() && max[axis].is_finite() {
            (max[axis].ceil() - min[axis].floor()) as i64
        } else {
            0
        }
    };
    let (width, height) = (span(0), span(1));
    if width <= 0 || height <= 0 {
        return Err(LightmapError::Degenerate { width, height });
    }
    Ok(LightmapExtent {
        width: width as usize,
        height: height as usize,
    })
}

/// A face raster read out of the file.
pub struct FaceLightmap {
    pub image: RgbU8Image,
    /// Set when the raster runs past the lightmap lump: `(end, lump_end)`.
    pub overrun: Option<(i64, i64)>,
}

/// Reads `width * height` RGB texels for `face`, relative to the lightmap lump.
pub fn read_face_lightmap(
    bytes: &[u8],
    lightmaps: LumpEntry,
    face: &Face,
    extent: LightmapExtent,
    flip_v: bool,
) -> Result<FaceLightmap, LightmapError> {
    if face.lightmap_offset < 0 {
        return Err(LightmapError::NoLightmap);
    }

    let start = lightmaps.offset as i64 + face.lightmap_offset as i64;
    let end = extent
        .width
        .checked_mul(extent.height)
        .and_then(|texels| texels.checked_mul(3))
        .and_then(|len| i64::try_from(len).ok())
        .and_then(|len| start.checked_add(len))
        .unwrap_or(i64::MAX);
    let data = usize::try_from(start)
        .ok()
        .zip(usize::try_from(end).ok())
        .and_then(|(start, end)| bytes.get(start..end))
        .ok_or(LightmapError::OutOfBounds {
            start,
            end,
            file_len: bytes.len(),
        })?;

    let mut image = RgbU8Image::new(extent.width, extent.height, data.to_vec());
    if flip_v {
        image.flip_vertical();
    }
    let overrun = (end > lightmaps.end()).then(|| (end, lightmaps.end()));
    Ok(FaceLightmap { image, overrun })
}

/// Extent plus raster for one polygon of a decoded level.
pub fn extract_face_lightmap(
    level: &DecodedLevel,
    polygon: &Polygon,
    flip_v: bool,
) -> Result<FaceLightmap, LightmapError> {
    let face = level.face(polygon);
    if face.lightmap_offset < 0 {
        return Err(LightmapError::NoLightmap);
    }
    let extent = lightmap_extent(level.polygon_positions(polygon), level.tex_info(polygon))?;
    read_face_lightmap(
        level.bytes(),
        level.header().lump(LumpId::Lightmaps),
        face,
        extent,
        flip_v,
    )
}

fn normalize_or_zero(v: Vec3) -> Vec3 {
    let len = length(&v);
    if len > f32::EPSILON {
        v / len
    } else {
        Vec3::zeros()
    }
}

/// Newell's method, robust for non-planar and concave loops.
pub fn newell_normal(positions: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::zeros();
    for (i, a) in positions.iter().enumerate() {
        let b = &positions[(i + 1) % positions.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normalize_or_zero(normal)
}

/// Maps a polygon's loop into its atlas rectangle through a tangent frame in the polygon plane.
pub fn remap_lightmap_uvs(
    positions: &[Vec3],
    rect: &AtlasRect,
    atlas_width: usize,
    atlas_height: usize,
    flip_v: bool,
) -> Vec<[f32; 2]> {
    if positions.is_empty() {
        return Vec::new();
    }

    let tangent = if positions.len() >= 2 {
        normalize_or_zero(positions[1] - positions[0])
    } else {
        Vec3::x()
    };
    let normal = newell_normal(positions);
    let bitangent = normalize_or_zero(cross(&normal, &tangent));
    let centroid = positions.iter().fold(Vec3::zeros(), |sum, p| sum + p) / positions.len() as f32;

    let local: Vec<[f32; 2]> = positions
        .iter()
        .map(|p| {
            let rel = p - centroid;
            [dot(&rel, &tangent), dot(&rel, &bitangent)]
        })
        .collect();

    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for coords in &local {
        for axis in 0..2 {
            min[axis] = min[axis].min(coords[axis]);
            max[axis] = max[axis].max(coords[axis]);
        }
    }
    let span = |axis: usize| {
        let span = max[axis] - min[axis];
        if span == 0.0 {
            MIN_SPAN
        } else {
            span
        }
    };
    let span = [span(0), span(1)];

    let [u0, v0, u1, v1] = rect.uv_bounds(atlas_width, atlas_height);
    local
        .iter()
        .map(|coords| {
            let lu = (coords[0] - min[0]) / span[0];
            let lv = (coords[1] - min[1]) / span[1];
            let u = u0 + lu * (u1 - u0);
            let v = v0 + lv * (v1 - v0);
            [u, if flip_v { 1.0 - v } else { v }]
        })
        .collect()
}

/// A polygon whose lightmap made it into the atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLightmap {
    pub polygon_index: usize,
    pub face_index: usize,
    pub rect: AtlasRect,
    /// One UV per loop vertex, in atlas space.
    pub uvs: Vec<[f32; 2]>,
}

pub struct LightmapAtlas {
    pub image: RgbU8Image,
    /// Sorted by polygon index.
    pub faces: Vec<PlacedLightmap>,
}

impl LightmapAtlas {
    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    pub fn for_polygon(&self, polygon_index: usize) -> Option<&PlacedLightmap> {
        self.faces
            .binary_search_by_key(&polygon_index, |placed| placed.polygon_index)
            .ok()
            .map(|i| &self.faces[i])
    }
}

struct Pending {
    patch: PatchId,
    polygon_index: usize,
    face_index: usize,
    width: usize,
}

/// Extracts every polygon's lightmap, packs them, and remaps each loop into the atlas.
///
/// Per-face failures become diagnostics. Only an atlas with nothing in it is an error.
pub fn build_lightmap_atlas(
    level: &DecodedLevel,
    options: &LightmapOptions,
    diagnostics: &mut Diagnostics,
) -> Result<LightmapAtlas, LightmapError> {
    let mut atlas = TextureAtlas::new();
    let mut pending = Vec::new();

    for (polygon_index, polygon) in level.polygons().iter().enumerate() {
        let face_index = polygon.face_index;
        match extract_face_lightmap(level, polygon, options.flip_v) {
            Ok(lightmap) => {
                if let Some((end, lump_end)) = lightmap.overrun {
                    diagnostics.push(Diagnostic::SuspectSampleStep {
                        face_index,
                        end,
                        lump_end,
                    });
                }
                let width = lightmap.image.width();
                pending.push(Pending {
                    patch: atlas.insert(lightmap.image),
                    polygon_index,
                    face_index,
                    width,
                });
            }
            Err(LightmapError::NoLightmap) => {
                debug!("face {}: no lightmap", face_index);
            }
            Err(error) => diagnostics.push(Diagnostic::LightmapSkipped { face_index, error }),
        }
    }

    if atlas.is_empty() {
        return Err(LightmapError::Empty);
    }
    debug!("extracted {} face lightmaps", atlas.len());
    let atlas_width = atlas.smallest_width(options.min_atlas_width, options.max_atlas_width);
    let (fits, too_wide): (Vec<Pending>, Vec<Pending>) = pending
        .into_iter()
        .partition(|entry| entry.width <= atlas_width);
    for entry in too_wide {
        diagnostics.push(Diagnostic::LightmapTooWide {
            face_index: entry.face_index,
            width: entry.width,
            atlas_width,
        });
    }
    if fits.is_empty() {
        return Err(LightmapError::Empty);
    }

    let baked = atlas
        .bake_with_width(atlas_width)
        .map_err(|_| LightmapError::Empty)?;
    let (width, height) = (baked.image.width(), baked.image.height());

    let mut faces = Vec::with_capacity(fits.len());
    for entry in fits {
        let rect = match baked.rects.get(&entry.patch) {
            Some(rect) => *rect,
            None => continue,
        };
        let polygon = &level.polygons()[entry.polygon_index];
        let positions: Vec<Vec3> = level.polygon_positions(polygon).copied().collect();
        faces.push(PlacedLightmap {
            polygon_index: entry.polygon_index,
            face_index: entry.face_index,
            rect,
            uvs: remap_lightmap_uvs(&positions, &rect, width, height, options.flip_v),
        });
    }

    info!(
        "packed {} face lightmaps into a {}x{} atlas",
        faces.len(),
        width,
        height
    );
    Ok(LightmapAtlas {
        image: baked.image,
        faces,
    })
}
