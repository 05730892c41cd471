use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Tightly packed 8-bit RGB raster, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbU8Image {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbU8Image {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), 3 * width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(3 * width * height)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let offset = 3 * (self.width * y + x);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Reverses the row order in place.
    pub fn flip_vertical(&mut self) {
        let stride = 3 * self.width;
        if stride == 0 {
            return;
        }
        let mut rows = self.data.chunks_exact_mut(stride);
        while let (Some(top), Some(bottom)) = (rows.next(), rows.next_back()) {
            top.swap_with_slice(bottom);
        }
    }

    /// Copies `src` so its top-left corner lands at `(x, y)`.
    pub fn blit(&mut self, src: &RgbU8Image, x: usize, y: usize) {
        assert!(x + src.width <= self.width && y + src.height <= self.height);
        let src_stride = 3 * src.width;
        for row in 0..src.height {
            let dst_offset = 3 * (self.width * (y + row) + x);
            let src_offset = src_stride * row;
            self.data[dst_offset..dst_offset + src_stride]
                .copy_from_slice(&src.data[src_offset..src_offset + src_stride]);
        }
    }

    pub fn write_png<W: Write>(&self, w: W) -> Result<()> {
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        Ok(())
    }

    pub fn write_to_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let w = BufWriter::new(
            File::create(path).with_context(|| format!("Creating image file {:?}", path))?,
        );
        self.write_png(w)
            .with_context(|| format!("Encoding PNG {:?}", path))
    }
}
