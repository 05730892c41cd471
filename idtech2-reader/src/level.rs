use log::{debug, info, warn};
use nalgebra_glm::Vec3;

use crate::bsp::{
    decode_edges, decode_face_edges, decode_faces, decode_texture_infos, decode_vertices, Edge,
    Face, TexInfo,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entities::{decode_entities, Entity};
use crate::error::FormatError;
use crate::lump::{read_header, Header, LumpId};
use crate::winding::reconstruct_face_loop;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject versions other than 38 instead of warning.
    pub strict_version: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict_version: true,
        }
    }
}

/// A face that survived winding reconstruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polygon {
    pub face_index: usize,
    pub tex_info_index: usize,
    /// Indices into the vertex array, in authored winding order.
    pub vertices: Vec<u32>,
}

/// Everything decoded from one level buffer. Immutable once built.
pub struct DecodedLevel<'a> {
    bytes: &'a [u8],
    header: Header,
    vertices: Vec<Vec3>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    tex_infos: Vec<TexInfo>,
    face_edges: Vec<i32>,
    entities: Vec<Entity>,
    polygons: Vec<Polygon>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DecodedLevel<'a> {
    pub fn decode(bytes: &'a [u8], options: &LoadOptions) -> Result<Self, FormatError> {
        let header = if options.strict_version {
            read_header(bytes)?
        } else {
            let header = Header::parse(bytes)?;
            if header.version != crate::lump::VERSION {
                warn!(
                    "BSP version {} is not {}, decoding anyway",
                    header.version,
                    crate::lump::VERSION,
                );
            }
            header
        };

        let vertices = decode_vertices(header.lump_data(bytes, LumpId::Vertices)?)?;
        let edges = decode_edges(header.lump_data(bytes, LumpId::Edges)?)?;
        let faces = decode_faces(header.lump_data(bytes, LumpId::Faces)?)?;
        let tex_infos = decode_texture_infos(header.lump_data(bytes, LumpId::TexInfo)?)?;
        let face_edges = decode_face_edges(header.lump_data(bytes, LumpId::FaceEdgeTable)?)?;
        let entities = decode_entities(header.lump_data(bytes, LumpId::Entities)?);
        debug!(
            "{} vertices, {} edges, {} faces, {} texinfos, {} face edges, {} entities",
            vertices.len(),
            edges.len(),
            faces.len(),
            tex_infos.len(),
            face_edges.len(),
            entities.len(),
        );

        let mut diagnostics = Diagnostics::new();
        let polygons = build_polygons(
            &vertices,
            &edges,
            &faces,
            &tex_infos,
            &face_edges,
            &mut diagnostics,
        );
        info!(
            "decoded {} of {} faces into polygons",
            polygons.len(),
            faces.len()
        );

        Ok(Self {
            bytes,
            header,
            vertices,
            edges,
            faces,
            tex_infos,
            face_edges,
            entities,
            polygons,
            diagnostics: diagnostics.into_vec(),
        })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn tex_infos(&self) -> &[TexInfo] {
        &self.tex_infos
    }

    pub fn face_edges(&self) -> &[i32] {
        &self.face_edges
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Problems found while building polygons.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn face(&self, polygon: &Polygon) -> &Face {
        &self.faces[polygon.face_index]
    }

    pub fn tex_info(&self, polygon: &Polygon) -> &TexInfo {
        &self.tex_infos[polygon.tex_info_index]
    }

    /// World-space positions of a polygon's loop.
    pub fn polygon_positions<'s>(
        &'s self,
        polygon: &'s Polygon,
    ) -> impl Iterator<Item = &'s Vec3> + 's {
        polygon
            .vertices
            .iter()
            .map(move |&index| &self.vertices[index as usize])
    }
}

fn build_polygons(
    vertices: &[Vec3],
    edges: &[Edge],
    faces: &[Face],
    tex_infos: &[TexInfo],
    face_edges: &[i32],
    diagnostics: &mut Diagnostics,
) -> Vec<Polygon> {
    let mut polygons = Vec::with_capacity(faces.len());
    for (face_index, face) in faces.iter().enumerate() {
        let tex_info_index = face.texture_info as usize;
        if tex_info_index >= tex_infos.len() {
            diagnostics.push(Diagnostic::TexInfoOutOfRange {
                face_index,
                tex_info_index,
                tex_info_count: tex_infos.len(),
            });
            continue;
        }

        let loop_ = match reconstruct_face_loop(face, edges, face_edges) {
            Ok(loop_) => loop_,
            Err(error) => {
                diagnostics.push(Diagnostic::FaceSkipped { face_index, error });
                continue;
            }
        };

        if let Some(&vertex) = loop_.iter().find(|&&v| v as usize >= vertices.len()) {
            diagnostics.push(Diagnostic::VertexOutOfRange {
                face_index,
                vertex,
                vertex_count: vertices.len(),
            });
            continue;
        }

        polygons.push(Polygon {
            face_index,
            tex_info_index,
            vertices: loop_,
        });
    }
    polygons
}

#[cfg(test)]
mod tests {
    use nalgebra_glm::vec3;

    use super::{build_polygons, Polygon};
    use crate::bsp::tests::tex_info;
    use crate::bsp::{Edge, Face};
    use crate::diagnostics::{Diagnostic, Diagnostics};
    use crate::winding::WindingError;

    fn face(first_edge: i32, num_edges: u16, texture_info: u16) -> Face {
        Face {
            plane: 0,
            plane_side: 0,
            first_edge,
            num_edges,
            texture_info,
            lightmap_styles: [0; 4],
            lightmap_offset: -1,
        }
    }

    #[test]
    fn skips_bad_faces_and_keeps_the_rest() {
        let vertices = vec![
            vec3(0.0, 0.0, 0.0),
            vec3(64.0, 0.0, 0.0),
            vec3(64.0, 64.0, 0.0),
        ];
        let edges = vec![
            Edge { v: [0, 1] },
            Edge { v: [1, 2] },
            Edge { v: [2, 0] },
            Edge { v: [2, 9] },
        ];
        let face_edges = vec![0, 1, 2, 0, 3];
        let faces = vec![
            face(0, 3, 0),
            face(0, 3, 5),
            face(0, 1, 0),
            face(3, 2, 0),
        ];
        let tex_infos = vec![tex_info("floor", -1)];

        let mut diagnostics = Diagnostics::new();
        let polygons = build_polygons(
            &vertices,
            &edges,
            &faces,
            &tex_infos,
            &face_edges,
            &mut diagnostics,
        );
        assert_eq!(
            polygons,
            vec![Polygon {
                face_index: 0,
                tex_info_index: 0,
                vertices: vec![0, 1, 2],
            }],
        );
        assert_eq!(
            diagnostics.into_vec(),
            vec![
                Diagnostic::TexInfoOutOfRange {
                    face_index: 1,
                    tex_info_index: 5,
                    tex_info_count: 1,
                },
                Diagnostic::FaceSkipped {
                    face_index: 2,
                    error: WindingError::Degenerate { distinct: 2 },
                },
                Diagnostic::VertexOutOfRange {
                    face_index: 3,
                    vertex: 9,
                    vertex_count: 3,
                },
            ],
        );
    }
}
