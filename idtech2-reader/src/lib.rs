//! Reader for idTech 2 compiled levels (`.bsp` version 38) and `.wal` textures.
//!
//! [`DecodedLevel`] decodes the geometry of one level buffer, and [`Scene`] turns it into plain
//! renderable data: polygon loops, texture UVs, materials, and a packed lightmap atlas.

pub mod bsp;
pub mod diagnostics;
pub mod entities;
pub mod error;
pub mod level;
pub mod lightmap;
pub mod lump;
pub mod material;
pub mod palette;
pub mod scene;
pub mod uv;
pub mod wal;
pub mod winding;

pub use crate::diagnostics::Diagnostic;
pub use crate::entities::{decode_entities, parse_entities, Entity};
pub use crate::error::FormatError;
pub use crate::level::{DecodedLevel, LoadOptions, Polygon};
pub use crate::lightmap::{LightmapAtlas, LightmapError, LightmapOptions, SAMPLE_STEP};
pub use crate::lump::{read_header, slice_lump, Header, LumpEntry, LumpId};
pub use crate::material::{frame_roles, FrameRole, Material, MaterialTable};
pub use crate::palette::Palette;
pub use crate::scene::{Scene, SceneOptions, ScenePolygon};
pub use crate::uv::{
    project_polygon_uvs, project_uv, MissingTextureResolution, TextureResolution, TextureResolver,
};
pub use crate::wal::{decode_wal, WalImage};
pub use crate::winding::{reconstruct_face_loop, WindingError};
