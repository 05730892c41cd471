use thiserror::Error;

/// Structural problems that make a whole file (or a single `.wal`) unreadable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("file is {len} bytes, shorter than the {needed} byte header")]
    TooShort { len: usize, needed: usize },

    #[error("bad magic {found:#010x}, expected IBSP")]
    BadMagic { found: i32 },

    #[error("unsupported BSP version {found}, expected {expected}")]
    UnsupportedVersion { found: i32, expected: i32 },

    #[error("range at offset {offset} with length {length} is outside the {file_len} byte file")]
    LumpOutOfBounds {
        offset: i64,
        length: i64,
        file_len: usize,
    },

    #[error("{lump} needs {needed} bytes but {available} are available")]
    TruncatedLump {
        lump: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("palette needs 768 bytes but {len} are available")]
    BadPalette { len: usize },
}
