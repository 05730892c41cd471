use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use texture_atlas::RgbU8Image;

use crate::bsp::ascii_name;
use crate::error::FormatError;
use crate::palette::Palette;
use crate::uv::TextureResolution;

pub const WAL_HEADER_SIZE: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalHeader {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Byte offsets of the four mip levels, largest first.
    pub mip_offsets: [u32; 4],
    /// Next frame of an animation, empty when still.
    pub anim_name: String,
    pub flags: i32,
    pub contents: i32,
    pub value: i32,
}

impl WalHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < WAL_HEADER_SIZE {
            return Err(truncated_header(bytes.len()));
        }
        Self::read_from(&mut &bytes[..WAL_HEADER_SIZE]).map_err(|_| truncated_header(bytes.len()))
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let mut name = [0; 32];
        r.read_exact(&mut name)?;
        let width = r.read_u32::<LittleEndian>()?;
        let height = r.read_u32::<LittleEndian>()?;
        let mut mip_offsets = [0; 4];
        r.read_u32_into::<LittleEndian>(&mut mip_offsets)?;
        let mut anim_name = [0; 32];
        r.read_exact(&mut anim_name)?;
        let flags = r.read_i32::<LittleEndian>()?;
        let contents = r.read_i32::<LittleEndian>()?;
        let value = r.read_i32::<LittleEndian>()?;
        Ok(Self {
            name: ascii_name(&name),
            width,
            height,
            mip_offsets,
            anim_name: ascii_name(&anim_name),
            flags,
            contents,
            value,
        })
    }
}

fn truncated_header(available: usize) -> FormatError {
    FormatError::TruncatedLump {
        lump: "wal header",
        needed: WAL_HEADER_SIZE,
        available,
    }
}

pub struct WalImage {
    pub header: WalHeader,
    /// Mip level 0 expanded through the palette.
    pub image: RgbU8Image,
}

impl WalImage {
    pub fn resolution(&self) -> TextureResolution {
        TextureResolution::new(self.header.width, self.header.height)
    }
}

/// Decodes mip level 0 of a `.wal` file into RGB.
pub fn decode_wal(bytes: &[u8], palette: &Palette) -> Result<WalImage, FormatError> {
    let header = WalHeader::parse(bytes)?;

    let start = header.mip_offsets[0] as usize;
    let texels = (header.width as usize)
        .checked_mul(header.height as usize)
        .ok_or(FormatError::TruncatedLump {
            lump: "wal mip 0",
            needed: usize::MAX,
            available: bytes.len(),
        })?;
    let indices = start
        .checked_add(texels)
        .and_then(|end| bytes.get(start..end))
        .ok_or(FormatError::TruncatedLump {
            lump: "wal mip 0",
            needed: texels,
            available: bytes.len().saturating_sub(start),
        })?;

    debug!(
        "decoded {:?}: {}x{}",
        header.name, header.width, header.height
    );
    let image = RgbU8Image::new(
        header.width as usize,
        header.height as usize,
        palette.expand(indices),
    );
    Ok(WalImage { header, image })
}

#[cfg(test)]
pub(crate) mod tests {
    use byteorder::{LittleEndian, WriteBytesExt};

    use super::{decode_wal, WalHeader, WAL_HEADER_SIZE};
    use crate::error::FormatError;
    use crate::palette::{Palette, PALETTE_SIZE};
    use crate::uv::TextureResolution;

    pub(crate) fn wal_bytes(name: &str, width: u32, height: u32, indices: &[u8]) -> Vec<u8> {
        let mut w = Vec::new();
        let mut name_field = [0u8; 32];
        name_field[..name.len()].copy_from_slice(name.as_bytes());
        w.extend_from_slice(&name_field);
        w.write_u32::<LittleEndian>(width).unwrap();
        w.write_u32::<LittleEndian>(height).unwrap();
        let mip0 = WAL_HEADER_SIZE as u32;
        let mip1 = mip0 + width * height;
        let mip2 = mip1 + width * height / 4;
        let mip3 = mip2 + width * height / 16;
        for offset in [mip0, mip1, mip2, mip3] {
            w.write_u32::<LittleEndian>(offset).unwrap();
        }
        w.extend_from_slice(&[0; 32]);
        w.write_i32::<LittleEndian>(0).unwrap();
        w.write_i32::<LittleEndian>(1).unwrap();
        w.write_i32::<LittleEndian>(0).unwrap();
        assert_eq!(w.len(), WAL_HEADER_SIZE);
        w.extend_from_slice(indices);
        w
    }

    fn test_palette() -> Palette {
        let mut bytes = vec![0; PALETTE_SIZE];
        bytes[3..6].copy_from_slice(&[10, 20, 30]);
        bytes[6..9].copy_from_slice(&[40, 50, 60]);
        Palette::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn decodes_mip0() {
        let bytes = wal_bytes("e1u1/grate1_3", 2, 2, &[0, 1, 2, 1]);
        let wal = decode_wal(&bytes, &test_palette()).unwrap();
        assert_eq!(wal.header.name, "e1u1/grate1_3");
        assert_eq!(wal.header.contents, 1);
        assert_eq!(wal.resolution(), TextureResolution::new(2, 2));
        assert_eq!(
            wal.image.data(),
            &[0, 0, 0, 10, 20, 30, 40, 50, 60, 10, 20, 30],
        );
    }

    #[test]
    fn short_header() {
        assert_eq!(
            WalHeader::parse(&[0; 99]),
            Err(FormatError::TruncatedLump {
                lump: "wal header",
                needed: 100,
                available: 99,
            }),
        );
    }

    #[test]
    fn short_pixel_data() {
        let bytes = wal_bytes("short", 4, 4, &[0; 15]);
        assert_eq!(
            decode_wal(&bytes, &test_palette()).err(),
            Some(FormatError::TruncatedLump {
                lump: "wal mip 0",
                needed: 16,
                available: 15,
            }),
        );
    }

    #[test]
    fn uses_stock_palette() {
        let bytes = wal_bytes("gray", 1, 1, &[15]);
        let wal = decode_wal(&bytes, &Palette::quake2()).unwrap();
        assert_eq!(wal.image.pixel(0, 0), [235, 235, 235]);
    }
}
