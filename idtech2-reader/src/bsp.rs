use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use nalgebra_glm::{vec3, Vec3};

use crate::error::FormatError;

/// A fixed-size little-endian record stored back to back in a lump.
pub trait Record: Sized {
    const SIZE: usize;
    const LUMP: &'static str;

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self>;
}

/// Decodes a lump that must hold a whole number of `T` records.
pub fn decode_records<T: Record>(data: &[u8]) -> Result<Vec<T>, FormatError> {
    if data.len() % T::SIZE != 0 {
        return Err(FormatError::TruncatedLump {
            lump: T::LUMP,
            needed: (data.len() / T::SIZE + 1) * T::SIZE,
            available: data.len(),
        });
    }

    data.chunks_exact(T::SIZE)
        .map(|mut chunk| {
            T::read_from(&mut chunk).map_err(|_| FormatError::TruncatedLump {
                lump: T::LUMP,
                needed: T::SIZE,
                available: chunk.len(),
            })
        })
        .collect()
}

/// Fixed-width, NUL-padded name field. Anything outside ASCII becomes U+FFFD.
pub(crate) fn ascii_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    ascii_lossy(&bytes[..end])
}

pub(crate) fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

fn read_vec3<R: Read>(r: &mut R) -> io::Result<Vec3> {
    let x = r.read_f32::<LittleEndian>()?;
    let y = r.read_f32::<LittleEndian>()?;
    let z = r.read_f32::<LittleEndian>()?;
    Ok(vec3(x, y, z))
}

impl Record for Vec3 {
    const SIZE: usize = 12;
    const LUMP: &'static str = "vertices";

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        read_vec3(r)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub v: [u16; 2],
}

impl Record for Edge {
    const SIZE: usize = 4;
    const LUMP: &'static str = "edges";

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let v0 = r.read_u16::<LittleEndian>()?;
        let v1 = r.read_u16::<LittleEndian>()?;
        Ok(Self { v: [v0, v1] })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub plane: u16,
    pub plane_side: u16,
    /// Index into the face-edge table.
    pub first_edge: i32,
    pub num_edges: u16,
    pub texture_info: u16,
    pub lightmap_styles: [u8; 4],
    /// Relative to the start of the lightmap lump. Negative when the face is unlit.
    pub lightmap_offset: i32,
}

impl Record for Face {
    const SIZE: usize = 20;
    const LUMP: &'static str = "faces";

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let plane = r.read_u16::<LittleEndian>()?;
        let plane_side = r.read_u16::<LittleEndian>()?;
        let first_edge = r.read_i32::<LittleEndian>()?;
        let num_edges = r.read_u16::<LittleEndian>()?;
        let texture_info = r.read_u16::<LittleEndian>()?;
        let mut lightmap_styles = [0; 4];
        r.read_exact(&mut lightmap_styles)?;
        let lightmap_offset = r.read_i32::<LittleEndian>()?;
        Ok(Self {
            plane,
            plane_side,
            first_edge,
            num_edges,
            texture_info,
            lightmap_styles,
            lightmap_offset,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TexInfo {
    pub u_axis: Vec3,
    pub u_offset: f32,
    pub v_axis: Vec3,
    pub v_offset: f32,
    pub flags: i32,
    pub value: i32,
    pub texture_name: String,
    /// Next frame of an animated texture, or -1.
    pub next_texinfo: i32,
}

impl Record for TexInfo {
    const SIZE: usize = 76;
    const LUMP: &'static str = "texinfo";

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let u_axis = read_vec3(r)?;
        let u_offset = r.read_f32::<LittleEndian>()?;
        let v_axis = read_vec3(r)?;
        let v_offset = r.read_f32::<LittleEndian>()?;
        let flags = r.read_i32::<LittleEndian>()?;
        let value = r.read_i32::<LittleEndian>()?;
        let mut name = [0; 32];
        r.read_exact(&mut name)?;
        let next_texinfo = r.read_i32::<LittleEndian>()?;
        Ok(Self {
            u_axis,
            u_offset,
            v_axis,
            v_offset,
            flags,
            value,
            texture_name: ascii_name(&name),
            next_texinfo,
        })
    }
}

/// Signed edge reference. Negative entries walk the edge from `v[1]` to `v[0]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceEdge(pub i32);

impl Record for FaceEdge {
    const SIZE: usize = 4;
    const LUMP: &'static str = "face_edge_table";

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_i32::<LittleEndian>().map(FaceEdge)
    }
}

pub fn decode_vertices(data: &[u8]) -> Result<Vec<Vec3>, FormatError> {
    decode_records(data)
}

pub fn decode_edges(data: &[u8]) -> Result<Vec<Edge>, FormatError> {
    decode_records(data)
}

pub fn decode_faces(data: &[u8]) -> Result<Vec<Face>, FormatError> {
    decode_records(data)
}

pub fn decode_texture_infos(data: &[u8]) -> Result<Vec<TexInfo>, FormatError> {
    decode_records(data)
}

pub fn decode_face_edges(data: &[u8]) -> Result<Vec<i32>, FormatError> {
    Ok(decode_records::<FaceEdge>(data)?
        .into_iter()
        .map(|FaceEdge(index)| index)
        .collect())
}
