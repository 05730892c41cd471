use std::collections::HashSet;

use thiserror::Error;

use crate::bsp::{Edge, Face};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WindingError {
    #[error("face edges {first}..{end} leave the {len} entry face-edge table")]
    FaceEdgeOutOfRange { first: i64, end: i64, len: usize },

    #[error("edge reference {reference} does not name one of the {len} edges")]
    EdgeOutOfRange { reference: i32, len: usize },

    #[error("face loop has only {distinct} distinct vertices")]
    Degenerate { distinct: usize },
}

/// Rebuilds a face's vertex loop in authored order.
///
/// Each face-edge entry contributes both endpoints of its edge, swapped when the entry is
/// negative. Repeated vertex indices keep only their first occurrence.
pub fn reconstruct_face_loop(
    face: &Face,
    edges: &[Edge],
    face_edges: &[i32],
) -> Result<Vec<u32>, WindingError> {
    let first = face.first_edge as i64;
    let end = first + face.num_edges as i64;
    let range = usize::try_from(first)
        .ok()
        .zip(usize::try_from(end).ok())
        .and_then(|(first, end)| face_edges.get(first..end))
        .ok_or(WindingError::FaceEdgeOutOfRange {
            first,
            end,
            len: face_edges.len(),
        })?;

    let mut seen = HashSet::with_capacity(range.len());
    let mut vertices = Vec::with_capacity(range.len());
    for &reference in range {
        let edge = usize::try_from(reference.unsigned_abs())
            .ok()
            .and_then(|index| edges.get(index))
            .ok_or(WindingError::EdgeOutOfRange {
                reference,
                len: edges.len(),
            })?;
        let [a, b] = edge.v;
        let pair = if reference < 0 { [b, a] } else { [a, b] };
        for vertex in pair {
            let vertex = vertex as u32;
            if seen.insert(vertex) {
                vertices.push(vertex);
            }
        }
    }

    if vertices.len() < 3 {
        return Err(WindingError::Degenerate {
            distinct: vertices.len(),
        });
    }
    Ok(vertices)
}
