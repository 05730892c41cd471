use std::fmt::{self, Display, Formatter};

use log::warn;

use crate::lightmap::LightmapError;
use crate::winding::WindingError;

/// A non-fatal problem found while decoding a level or assembling its scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    FaceSkipped {
        face_index: usize,
        error: WindingError,
    },
    VertexOutOfRange {
        face_index: usize,
        vertex: u32,
        vertex_count: usize,
    },
    TexInfoOutOfRange {
        face_index: usize,
        tex_info_index: usize,
        tex_info_count: usize,
    },
    MissingTextureResolution {
        face_index: usize,
        texture_name: String,
    },
    LightmapSkipped {
        face_index: usize,
        error: LightmapError,
    },
    /// The lightmap range fits in the file but runs past the lightmap lump, which usually means
    /// the level was compiled with a different sample step.
    SuspectSampleStep {
        face_index: usize,
        end: i64,
        lump_end: i64,
    },
    LightmapTooWide {
        face_index: usize,
        width: usize,
        atlas_width: usize,
    },
    LightmapStageAborted {
        error: LightmapError,
    },
}

impl Diagnostic {
    pub fn face_index(&self) -> Option<usize> {
        match *self {
            Diagnostic::FaceSkipped { face_index, .. }
            | Diagnostic::VertexOutOfRange { face_index, .. }
            | Diagnostic::TexInfoOutOfRange { face_index, .. }
            | Diagnostic::MissingTextureResolution { face_index, .. }
            | Diagnostic::LightmapSkipped { face_index, .. }
            | Diagnostic::SuspectSampleStep { face_index, .. }
            | Diagnostic::LightmapTooWide { face_index, .. } => Some(face_index),
            Diagnostic::LightmapStageAborted { .. } => None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FaceSkipped { face_index, error } => {
                write!(f, "face {}: skipped, {}", face_index, error)
            }
            Diagnostic::VertexOutOfRange {
                face_index,
                vertex,
                vertex_count,
            } => write!(
                f,
                "face {}: vertex {} is outside the {} vertex array",
                face_index, vertex, vertex_count,
            ),
            Diagnostic::TexInfoOutOfRange {
                face_index,
                tex_info_index,
                tex_info_count,
            } => write!(
                f,
                "face {}: texinfo {} is outside the {} entry texinfo array",
                face_index, tex_info_index, tex_info_count,
            ),
            Diagnostic::MissingTextureResolution {
                face_index,
                texture_name,
            } => write!(
                f,
                "face {}: no resolution for texture {:?}, leaving it without UVs",
                face_index, texture_name,
            ),
            Diagnostic::LightmapSkipped { face_index, error } => {
                write!(f, "face {}: lightmap skipped, {}", face_index, error)
            }
            Diagnostic::SuspectSampleStep {
                face_index,
                end,
                lump_end,
            } => write!(
                f,
                "face {}: lightmap ends at {} past the lightmap lump end {}, sample step may differ",
                face_index, end, lump_end,
            ),
            Diagnostic::LightmapTooWide {
                face_index,
                width,
                atlas_width,
            } => write!(
                f,
                "face {}: {} texel lightmap does not fit the {} texel atlas",
                face_index, width, atlas_width,
            ),
            Diagnostic::LightmapStageAborted { error } => {
                write!(f, "lightmap atlas not built: {}", error)
            }
        }
    }
}

/// Collects diagnostics, logging each as it arrives.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.0.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}
