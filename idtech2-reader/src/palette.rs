use crate::error::FormatError;

pub const PALETTE_SIZE: usize = 256 * 3;

/// 256 RGB entries addressed by an 8-bit color index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [[u8; 3]; 256],
}

impl Palette {
    /// Reads 256 interleaved RGB triples. Bytes past the first 768 are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < PALETTE_SIZE {
            return Err(FormatError::BadPalette { len: bytes.len() });
        }
        let mut colors = [[0; 3]; 256];
        for (color, rgb) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            color.copy_from_slice(rgb);
        }
        Ok(Self { colors })
    }

    /// The stock Quake II palette.
    pub fn quake2() -> Self {
        let mut colors = [[0; 3]; 256];
        for (index, color) in colors.iter_mut().enumerate() {
            *color = [QUAKE2_RED[index], QUAKE2_GREEN[index], QUAKE2_BLUE[index]];
        }
        Self { colors }
    }

    pub fn color(&self, index: u8) -> [u8; 3] {
        self.colors[index as usize]
    }

    /// Expands color indices into tightly packed RGB bytes.
    pub fn expand(&self, indices: &[u8]) -> Vec<u8> {
        indices.iter().flat_map(|&i| self.color(i)).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::quake2()
    }
}

#[cfg(test)]
mod tests {
    use super::{Palette, PALETTE_SIZE};
    use crate::error::FormatError;

    #[test]
    fn quake2_landmarks() {
        let palette = Palette::quake2();
        assert_eq!(palette.color(0), [0, 0, 0]);
        assert_eq!(palette.color(15), [235, 235, 235]);
        assert_eq!(palette.color(16), [99, 75, 35]);
        assert_eq!(palette.color(208), [0, 255, 0]);
        assert_eq!(palette.color(242), [255, 0, 0]);
        assert_eq!(palette.color(255), [159, 91, 83]);
    }

    #[test]
    fn reads_interleaved_triples() {
        let mut bytes: Vec<u8> = (0..PALETTE_SIZE).map(|i| (i % 251) as u8).collect();
        bytes.extend_from_slice(&[1, 2, 3]);
        let palette = Palette::from_bytes(&bytes).unwrap();
        assert_eq!(palette.color(0), [0, 1, 2]);
        assert_eq!(palette.color(1), [3, 4, 5]);
        assert_eq!(palette.color(255), [12, 13, 14]);
        assert_ne!(palette, Palette::quake2());
    }

    #[test]
    fn rejects_short_palette() {
        assert_eq!(
            Palette::from_bytes(&[0; 767]),
            Err(FormatError::BadPalette { len: 767 }),
        );
    }

    #[test]
    fn expands_indices() {
        let mut bytes = vec![0; PALETTE_SIZE];
        bytes[3..6].copy_from_slice(&[1, 2, 3]);
        let palette = Palette::from_bytes(&bytes).unwrap();
        assert_eq!(palette.expand(&[1, 0, 1]), vec![1, 2, 3, 0, 0, 0, 1, 2, 3]);
    }
}

const QUAKE2_RED: [u8; 256] = [
    0, 15, 31, 47, 63, 75, 91, 107, 123, 139, 155, 171, 187, 203, 219, 235,
    99, 91, 83, 79, 71, 63, 59, 51, 47, 43, 39, 35, 27, 23, 19, 15,
    95, 91, 91, 87, 83, 79, 71, 63, 59, 51, 47, 39, 35, 27, 23, 19,
    143, 123, 115, 103, 207, 167, 139, 111, 235, 203, 175, 147, 119, 91, 63, 35,
    167, 159, 151, 139, 127, 115, 103, 87, 75, 67, 59, 51, 43, 35, 27, 19,
    123, 115, 107, 103, 95, 87, 83, 75, 67, 63, 55, 47, 39, 31, 23, 15,
    111, 95, 83, 67, 55, 39, 27, 15, 179, 191, 203, 215, 203, 179, 159, 135,
    115, 91, 71, 47, 23, 19, 15, 11, 7, 7, 7, 0, 0, 0, 0, 0,
    139, 131, 123, 115, 107, 99, 91, 87, 75, 63, 51, 43, 31, 19, 11, 0,
    151, 143, 135, 127, 119, 115, 107, 99, 91, 79, 67, 55, 47, 35, 23, 15,
    159, 147, 139, 127, 119, 107, 99, 87, 79, 67, 55, 43, 31, 23, 11, 0,
    119, 111, 103, 99, 91, 83, 75, 71, 63, 55, 47, 39, 35, 27, 19, 11,
    155, 143, 135, 123, 115, 103, 95, 87, 75, 63, 55, 47, 35, 27, 19, 11,
    0, 35, 63, 83, 95, 95, 95, 255, 255, 255, 255, 255, 255, 255, 255, 255,
    255, 255, 239, 227, 211, 199, 183, 171, 155, 143, 127, 115, 95, 71, 47, 27,
    239, 55, 255, 0, 43, 27, 19, 235, 195, 159, 123, 235, 199, 167, 135, 159,
];

const QUAKE2_GREEN: [u8; 256] = [
    0, 15, 31, 47, 63, 75, 91, 107, 123, 139, 155, 171, 187, 203, 219, 235,
    75, 67, 63, 59, 55, 47, 43, 39, 35, 31, 27, 23, 19, 15, 15, 11,
    95, 91, 83, 79, 75, 71, 63, 59, 55, 47, 43, 39, 35, 27, 23, 19,
    119, 99, 91, 79, 151, 123, 103, 83, 159, 139, 119, 99, 79, 59, 39, 23,
    59, 47, 43, 39, 31, 23, 23, 19, 15, 15, 15, 11, 11, 11, 7, 7,
    95, 87, 83, 79, 71, 67, 63, 55, 51, 47, 39, 35, 27, 23, 15, 11,
    59, 55, 47, 43, 35, 27, 19, 11, 91, 123, 155, 187, 215, 199, 183, 167,
    151, 135, 119, 103, 83, 75, 67, 63, 55, 47, 39, 31, 23, 15, 7, 0,
    87, 79, 71, 67, 59, 51, 47, 43, 35, 31, 27, 19, 15, 11, 7, 0,
    159, 151, 139, 131, 123, 115, 107, 99, 91, 79, 67, 55, 47, 35, 23, 15,
    75, 67, 59, 55, 47, 43, 35, 31, 27, 23, 19, 15, 11, 7, 0, 0,
    123, 115, 107, 99, 91, 87, 79, 71, 63, 55, 47, 39, 31, 23, 15, 7,
    171, 159, 151, 139, 131, 119, 111, 103, 91, 79, 67, 59, 47, 35, 23, 15,
    255, 231, 211, 187, 167, 143, 123, 255, 255, 255, 255, 255, 255, 235, 215, 191,
    171, 147, 127, 107, 87, 71, 59, 43, 31, 23, 15, 7, 0, 0, 0, 0,
    0, 55, 0, 0, 43, 27, 19, 151, 115, 87, 63, 211, 171, 139, 107, 91,
];

const QUAKE2_BLUE: [u8; 256] = [
    0, 15, 31, 47, 63, 75, 91, 107, 123, 139, 155, 171, 187, 203, 219, 235,
    35, 31, 31, 27, 27, 23, 23, 19, 19, 19, 15, 15, 11, 11, 7, 7,
    111, 103, 95, 91, 83, 75, 67, 59, 55, 47, 43, 39, 35, 27, 23, 19,
    83, 67, 59, 47, 75, 59, 47, 39, 39, 35, 31, 27, 23, 15, 11, 7,
    43, 35, 27, 19, 15, 11, 7, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    75, 67, 63, 59, 55, 51, 47, 43, 39, 35, 27, 23, 19, 15, 11, 7,
    23, 23, 23, 23, 19, 15, 11, 7, 79, 111, 147, 183, 223, 211, 195, 183,
    167, 155, 139, 127, 111, 103, 91, 83, 75, 63, 51, 43, 31, 19, 11, 0,
    87, 79, 71, 67, 59, 51, 47, 43, 35, 31, 27, 19, 15, 11, 7, 0,
    123, 115, 107, 99, 95, 87, 79, 71, 67, 59, 51, 43, 35, 27, 19, 11,
    63, 55, 47, 39, 35, 27, 23, 19, 15, 11, 11, 7, 7, 0, 0, 0,
    207, 195, 183, 167, 155, 143, 127, 115, 103, 87, 75, 63, 47, 35, 23, 7,
    123, 111, 99, 87, 75, 67, 59, 51, 39, 27, 19, 11, 7, 0, 0, 0,
    0, 15, 27, 39, 47, 51, 51, 255, 211, 167, 127, 83, 39, 31, 23, 15,
    7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 255, 0, 255, 35, 23, 15, 127, 83, 51, 27, 199, 155, 119, 87, 83,
];
