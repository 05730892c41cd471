use std::collections::HashMap;

use log::{debug, warn};
use thiserror::Error;

pub use crate::image::RgbU8Image;

mod image;

/// Widest atlas the packer will produce unless told otherwise.
pub const DEFAULT_MAX_WIDTH: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AtlasError {
    #[error("no patches could be placed in the atlas")]
    Empty,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PatchId(usize);

impl PatchId {
    /// Insertion order of the patch.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Placement of a patch in atlas pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl AtlasRect {
    /// Returns `[u0, v0, u1, v1]` normalized by the atlas dimensions.
    pub fn uv_bounds(&self, atlas_width: usize, atlas_height: usize) -> [f32; 4] {
        let w = atlas_width as f32;
        let h = atlas_height as f32;
        [
            self.x as f32 / w,
            self.y as f32 / h,
            (self.x + self.width) as f32 / w,
            (self.y + self.height) as f32 / h,
        ]
    }

    pub fn overlaps(&self, other: &AtlasRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Result of shelf packing, before any pixels are copied.
#[derive(Debug)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub placements: Vec<(PatchId, AtlasRect)>,
    pub skipped: Vec<PatchId>,
}

pub struct BakedAtlas {
    pub image: RgbU8Image,
    pub rects: HashMap<PatchId, AtlasRect>,
    /// Patches too wide to fit the chosen atlas width.
    pub skipped: Vec<PatchId>,
}

/// Collects RGB patches and packs them into rows ("shelves") of a single image.
#[derive(Default)]
pub struct TextureAtlas {
    patches: Vec<RgbU8Image>,
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self {
            patches: Vec::new(),
        }
    }

    pub fn insert(&mut self, image: RgbU8Image) -> PatchId {
        let id = PatchId(self.patches.len());
        self.patches.push(image);
        id
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Smallest power of two that holds the widest patch, clamped to `[min_width, max_width]`.
    pub fn smallest_width(&self, min_width: usize, max_width: usize) -> usize {
        let widest = self
            .patches
            .iter()
            .map(RgbU8Image::width)
            .max()
            .unwrap_or(1)
            .max(1);
        widest
            .next_power_of_two()
            .max(min_width)
            .min(max_width)
    }

    /// Packs patches tallest first into left-to-right shelves of the given width.
    pub fn layout(&self, width: usize) -> Layout {
        let mut order: Vec<usize> = (0..self.patches.len()).collect();
        // Stable, so equal heights keep insertion order.
        order.sort_by(|&a, &b| self.patches[b].height().cmp(&self.patches[a].height()));

        let mut placements = Vec::with_capacity(order.len());
        let mut skipped = Vec::new();
        let mut cursor_x = 0;
        let mut shelf_y = 0;
        let mut shelf_height = 0;
        for index in order {
            let patch = &self.patches[index];
            if patch.width() > width {
                warn!(
                    "patch {} is {} texels wide, wider than the {} texel atlas; skipping",
                    index,
                    patch.width(),
                    width,
                );
                skipped.push(PatchId(index));
                continue;
            }

            if cursor_x + patch.width() > width {
                // Start a new shelf below the tallest patch of the current one.
                shelf_y += shelf_height;
                cursor_x = 0;
                shelf_height = 0;
            }

            placements.push((
                PatchId(index),
                AtlasRect {
                    x: cursor_x,
                    y: shelf_y,
                    width: patch.width(),
                    height: patch.height(),
                },
            ));
            cursor_x += patch.width();
            shelf_height = shelf_height.max(patch.height());
        }

        Layout {
            width,
            height: shelf_y + shelf_height,
            placements,
            skipped,
        }
    }

    pub fn bake_with_width(self, width: usize) -> Result<BakedAtlas, AtlasError> {
        let layout = self.layout(width);
        if layout.placements.is_empty() || layout.height == 0 {
            return Err(AtlasError::Empty);
        }
        debug!(
            "baking {} patches into a {}x{} atlas",
            layout.placements.len(),
            layout.width,
            layout.height,
        );

        let mut image = RgbU8Image::filled(layout.width, layout.height, [0, 0, 0]);
        let mut rects = HashMap::with_capacity(layout.placements.len());
        for (patch_id, rect) in layout.placements {
            image.blit(&self.patches[patch_id.0], rect.x, rect.y);
            rects.insert(patch_id, rect);
        }

        Ok(BakedAtlas {
            image,
            rects,
            skipped: layout.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::{AtlasError, AtlasRect, PatchId, RgbU8Image, TextureAtlas};

    fn solid(width: usize, height: usize, value: u8) -> RgbU8Image {
        RgbU8Image::filled(width, height, [value, value, value])
    }

    fn atlas_of(sizes: &[(usize, usize)]) -> TextureAtlas {
        let mut atlas = TextureAtlas::new();
        for (index, &(width, height)) in sizes.iter().enumerate() {
            atlas.insert(solid(width, height, index as u8 + 1));
        }
        atlas
    }

    #[test]
    fn single_shelf_when_everything_fits() {
        let atlas = atlas_of(&[(8, 10), (8, 10), (8, 5)]);
        let layout = atlas.layout(24);
        assert_eq!(layout.height, 10);
        assert!(layout.placements.iter().all(|(_, rect)| rect.y == 0));
    }

    #[test]
    fn shortest_patch_moves_to_second_shelf() {
        let atlas = atlas_of(&[(8, 10), (8, 10), (8, 5)]);
        let layout = atlas.layout(16);
        assert_eq!(layout.height, 15);
        assert_eq!(
            layout.placements,
            vec![
                (PatchId(0), AtlasRect { x: 0, y: 0, width: 8, height: 10 }),
                (PatchId(1), AtlasRect { x: 8, y: 0, width: 8, height: 10 }),
                (PatchId(2), AtlasRect { x: 0, y: 10, width: 8, height: 5 }),
            ],
        );
    }

    #[test]
    fn sorts_by_descending_height() {
        let atlas = atlas_of(&[(4, 2), (4, 7), (4, 3)]);
        let layout = atlas.layout(4);
        let order: Vec<usize> = layout.placements.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(layout.height, 12);
    }

    #[test]
    fn width_is_next_power_of_two() {
        let atlas = atlas_of(&[(3, 1), (17, 2)]);
        assert_eq!(atlas.smallest_width(1, 4096), 32);
        assert_eq!(atlas.smallest_width(64, 4096), 64);
        assert_eq!(atlas.smallest_width(1, 16), 16);
    }

    #[test]
    fn skips_patches_wider_than_cap() {
        let atlas = atlas_of(&[(20, 2), (4, 4)]);
        let width = atlas.smallest_width(1, 16);
        let baked = atlas.bake_with_width(width).unwrap();
        assert_eq!(baked.skipped, vec![PatchId(0)]);
        assert_eq!(baked.image.width(), 16);
        assert_eq!(baked.image.height(), 4);
        assert!(baked.rects.contains_key(&PatchId(1)));
    }

    #[test]
    fn copies_patch_pixels() {
        let mut atlas = TextureAtlas::new();
        atlas.insert(solid(2, 2, 7));
        let first = atlas.insert(RgbU8Image::new(1, 1, vec![1, 2, 3]));
        let baked = atlas.bake_with_width(4).unwrap();
        let rect = baked.rects[&first];
        assert_eq!(rect, AtlasRect { x: 2, y: 0, width: 1, height: 1 });
        assert_eq!(baked.image.pixel(2, 0), [1, 2, 3]);
        assert_eq!(baked.image.pixel(1, 1), [7, 7, 7]);
        assert_eq!(baked.image.pixel(3, 1), [0, 0, 0]);
    }

    #[test]
    fn empty_atlas_is_an_error() {
        assert_eq!(TextureAtlas::new().bake_with_width(16).err(), Some(AtlasError::Empty));
        let atlas = atlas_of(&[(32, 1)]);
        assert_eq!(atlas.bake_with_width(16).err(), Some(AtlasError::Empty));
    }

    #[test]
    fn uv_bounds_are_normalized() {
        let rect = AtlasRect { x: 8, y: 4, width: 8, height: 4 };
        assert_eq!(rect.uv_bounds(16, 8), [0.5, 0.5, 1.0, 1.0]);
    }

    #[quickcheck]
    fn placements_never_overlap(sizes: Vec<(u8, u8)>) -> bool {
        let sizes: Vec<(usize, usize)> = sizes
            .into_iter()
            .map(|(w, h)| (w as usize % 40 + 1, h as usize % 40 + 1))
            .collect();
        let atlas = atlas_of(&sizes);
        let width = atlas.smallest_width(1, 32);
        let layout = atlas.layout(width);

        let in_bounds = layout
            .placements
            .iter()
            .all(|(_, r)| r.x + r.width <= layout.width && r.y + r.height <= layout.height);
        let disjoint = layout.placements.iter().enumerate().all(|(i, (_, a))| {
            layout.placements[i + 1..]
                .iter()
                .all(|(_, b)| !a.overlaps(b))
        });
        let accounted = layout.placements.len() + layout.skipped.len() == sizes.len();
        in_bounds && disjoint && accounted
    }
}
