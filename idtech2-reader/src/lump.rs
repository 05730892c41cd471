use std::fmt::{self, Display, Formatter};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::FormatError;

/// `"IBSP"` read as a little-endian `i32`.
pub const MAGIC: i32 = 0x5053_4249;
pub const VERSION: i32 = 38;
pub const LUMP_COUNT: usize = 19;
pub const HEADER_SIZE: usize = 8 + 8 * LUMP_COUNT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LumpId {
    Entities,
    Planes,
    Vertices,
    Visibility,
    Nodes,
    TexInfo,
    Faces,
    Lightmaps,
    Leaves,
    LeafFaceTable,
    LeafBrushTable,
    Edges,
    FaceEdgeTable,
    Models,
    Brushes,
    BrushSides,
    Pop,
    Areas,
    AreaPortals,
}

impl LumpId {
    /// Directory order.
    pub const ALL: [LumpId; LUMP_COUNT] = [
        LumpId::Entities,
        LumpId::Planes,
        LumpId::Vertices,
        LumpId::Visibility,
        LumpId::Nodes,
        LumpId::TexInfo,
        LumpId::Faces,
        LumpId::Lightmaps,
        LumpId::Leaves,
        LumpId::LeafFaceTable,
        LumpId::LeafBrushTable,
        LumpId::Edges,
        LumpId::FaceEdgeTable,
        LumpId::Models,
        LumpId::Brushes,
        LumpId::BrushSides,
        LumpId::Pop,
        LumpId::Areas,
        LumpId::AreaPortals,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            LumpId::Entities => "entities",
            LumpId::Planes => "planes",
            LumpId::Vertices => "vertices",
            LumpId::Visibility => "visibility",
            LumpId::Nodes => "nodes",
            LumpId::TexInfo => "texinfo",
            LumpId::Faces => "faces",
            LumpId::Lightmaps => "lightmaps",
            LumpId::Leaves => "leaves",
            LumpId::LeafFaceTable => "leaf_face_table",
            LumpId::LeafBrushTable => "leaf_brush_table",
            LumpId::Edges => "edges",
            LumpId::FaceEdgeTable => "face_edge_table",
            LumpId::Models => "models",
            LumpId::Brushes => "brushes",
            LumpId::BrushSides => "brush_sides",
            LumpId::Pop => "pop",
            LumpId::Areas => "areas",
            LumpId::AreaPortals => "area_portals",
        }
    }

    /// Accepts either the lump name or its directory index.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Ok(index) = name.parse::<usize>() {
            return Self::ALL.get(index).copied();
        }
        let name = name.replace('-', "_").to_ascii_lowercase();
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }
}

impl Display for LumpId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LumpEntry {
    pub offset: i32,
    pub length: i32,
}

impl LumpEntry {
    pub fn data<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], FormatError> {
        slice_lump(bytes, self.offset, self.length)
    }

    /// Exclusive end offset, widened so it cannot overflow.
    pub fn end(&self) -> i64 {
        self.offset as i64 + self.length as i64
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: i32,
    pub version: i32,
    pub lumps: [LumpEntry; LUMP_COUNT],
}

impl Header {
    /// Checks the size and magic but accepts any version.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::TooShort {
                len: bytes.len(),
                needed: HEADER_SIZE,
            });
        }

        let truncated = |_: std::io::Error| FormatError::TooShort {
            len: bytes.len(),
            needed: HEADER_SIZE,
        };
        let mut r = &bytes[..HEADER_SIZE];
        let magic = r.read_i32::<LittleEndian>().map_err(truncated)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic });
        }
        let version = r.read_i32::<LittleEndian>().map_err(truncated)?;

        let mut lumps = [LumpEntry::default(); LUMP_COUNT];
        for lump in lumps.iter_mut() {
            lump.offset = r.read_i32::<LittleEndian>().map_err(truncated)?;
            lump.length = r.read_i32::<LittleEndian>().map_err(truncated)?;
        }

        Ok(Self {
            magic,
            version,
            lumps,
        })
    }

    pub fn lump(&self, id: LumpId) -> LumpEntry {
        self.lumps[id.index()]
    }

    pub fn lump_data<'a>(&self, bytes: &'a [u8], id: LumpId) -> Result<&'a [u8], FormatError> {
        self.lump(id).data(bytes)
    }
}

/// Parses the header and rejects any version other than 38.
pub fn read_header(bytes: &[u8]) -> Result<Header, FormatError> {
    let header = Header::parse(bytes)?;
    if header.version != VERSION {
        return Err(FormatError::UnsupportedVersion {
            found: header.version,
            expected: VERSION,
        });
    }
    Ok(header)
}

/// Returns exactly `length` bytes at `offset`, or an error if any part of the range is invalid.
pub fn slice_lump(bytes: &[u8], offset: i32, length: i32) -> Result<&[u8], FormatError> {
    let out_of_bounds = || FormatError::LumpOutOfBounds {
        offset: offset as i64,
        length: length as i64,
        file_len: bytes.len(),
    };

    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let length = usize::try_from(length).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(length).ok_or_else(out_of_bounds)?;
    bytes.get(start..end).ok_or_else(out_of_bounds)
}

#[cfg(test)]
pub(crate) mod tests {
    use byteorder::{LittleEndian, WriteBytesExt};
    use quickcheck_macros::quickcheck;

    use super::{read_header, slice_lump, Header, LumpId, HEADER_SIZE, LUMP_COUNT, MAGIC};
    use crate::error::FormatError;

    pub(crate) fn header_bytes(magic: i32, version: i32, lumps: &[(i32, i32)]) -> Vec<u8> {
        let mut w = Vec::with_capacity(HEADER_SIZE);
        w.write_i32::<LittleEndian>(magic).unwrap();
        w.write_i32::<LittleEndian>(version).unwrap();
        for index in 0..LUMP_COUNT {
            let (offset, length) = lumps.get(index).copied().unwrap_or((0, 0));
            w.write_i32::<LittleEndian>(offset).unwrap();
            w.write_i32::<LittleEndian>(length).unwrap();
        }
        w
    }

    #[test]
    fn header_size() {
        assert_eq!(HEADER_SIZE, 160);
        assert_eq!(&MAGIC.to_le_bytes(), b"IBSP");
    }

    #[test]
    fn reads_directory() {
        let mut lumps = vec![(0, 0); LUMP_COUNT];
        lumps[LumpId::Faces.index()] = (160, 40);
        lumps[LumpId::AreaPortals.index()] = (200, 8);
        let bytes = header_bytes(MAGIC, 38, &lumps);

        let header = read_header(&bytes).unwrap();
        assert_eq!(header.version, 38);
        assert_eq!(header.lump(LumpId::Faces).offset, 160);
        assert_eq!(header.lump(LumpId::Faces).length, 40);
        assert_eq!(header.lump(LumpId::AreaPortals).end(), 208);
    }

    #[test]
    fn rejects_short_file() {
        let bytes = header_bytes(MAGIC, 38, &[]);
        assert_eq!(
            read_header(&bytes[..159]),
            Err(FormatError::TooShort {
                len: 159,
                needed: 160
            }),
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = header_bytes(0x5053_4956, 38, &[]);
        assert!(matches!(
            read_header(&bytes),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn version_check_is_separate() {
        let bytes = header_bytes(MAGIC, 46, &[]);
        assert_eq!(
            read_header(&bytes),
            Err(FormatError::UnsupportedVersion {
                found: 46,
                expected: 38
            }),
        );
        assert_eq!(Header::parse(&bytes).unwrap().version, 46);
    }

    #[test]
    fn slices_exact_range() {
        let bytes: Vec<u8> = (0..10).collect();
        assert_eq!(slice_lump(&bytes, 2, 3).unwrap(), &[2, 3, 4]);
        assert_eq!(slice_lump(&bytes, 10, 0).unwrap(), &[] as &[u8]);
        assert!(slice_lump(&bytes, 8, 3).is_err());
        assert!(slice_lump(&bytes, -1, 3).is_err());
        assert!(slice_lump(&bytes, 1, -3).is_err());
        assert!(slice_lump(&bytes, i32::MAX, i32::MAX).is_err());
    }

    #[test]
    fn lump_names_round_trip() {
        for id in LumpId::ALL {
            assert_eq!(LumpId::from_name(id.name()), Some(id));
            assert_eq!(LumpId::from_name(&id.index().to_string()), Some(id));
        }
        assert_eq!(LumpId::from_name("face-edge-table"), Some(LumpId::FaceEdgeTable));
        assert_eq!(LumpId::from_name("19"), None);
    }

    #[quickcheck]
    fn slice_is_in_bounds_or_error(len: u8, offset: i32, length: i32) -> bool {
        let bytes = vec![0xA5; len as usize];
        match slice_lump(&bytes, offset, length) {
            Ok(slice) => {
                offset >= 0
                    && length >= 0
                    && slice.len() == length as usize
                    && offset as i64 + length as i64 <= len as i64
            }
            Err(_) => offset < 0 || length < 0 || offset as i64 + length as i64 > len as i64,
        }
    }
}
