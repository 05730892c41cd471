use std::collections::HashMap;

use log::debug;

use crate::bsp::TexInfo;

/// How a texinfo takes part in an animated texture chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRole {
    Still,
    /// First texinfo of a chain.
    Head,
    /// Later frame of the chain that starts at `head`.
    Continuation { head: usize },
}

fn next_index(tex_infos: &[TexInfo], index: usize) -> Option<usize> {
    usize::try_from(tex_infos[index].next_texinfo)
        .ok()
        .filter(|&next| next < tex_infos.len())
}

/// Assigns each texinfo its role, scanning heads in index order.
pub fn frame_roles(tex_infos: &[TexInfo]) -> Vec<FrameRole> {
    let mut roles = vec![FrameRole::Still; tex_infos.len()];
    let mut claimed = vec![false; tex_infos.len()];

    for head in 0..tex_infos.len() {
        if claimed[head] || tex_infos[head].next_texinfo == -1 {
            continue;
        }
        roles[head] = FrameRole::Head;
        claimed[head] = true;

        let mut current = head;
        while let Some(next) = next_index(tex_infos, current) {
            if claimed[next] || tex_infos[next].next_texinfo == -1 {
                break;
            }
            roles[next] = FrameRole::Continuation { head };
            claimed[next] = true;
            current = next;
        }
    }
    roles
}

/// Texture names of the frames claimed by `head`, in chain order.
fn chain_frames(tex_infos: &[TexInfo], roles: &[FrameRole], head: usize) -> Vec<String> {
    let mut names = vec![tex_infos[head].texture_name.clone()];
    let mut current = head;
    while let Some(next) = next_index(tex_infos, current) {
        if roles[next] != (FrameRole::Continuation { head }) {
            break;
        }
        let name = &tex_infos[next].texture_name;
        if !names.contains(name) {
            names.push(name.clone());
        }
        current = next;
    }
    names
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    /// Base texture name.
    pub name: String,
    /// Animation frame texture names starting with the base texture. Empty when still.
    pub frames: Vec<String>,
}

impl Material {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// One material per distinct base texture, keyed by texinfo index.
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
    by_tex_info: Vec<Option<usize>>,
}

impl MaterialTable {
    pub fn build(tex_infos: &[TexInfo]) -> Self {
        let roles = frame_roles(tex_infos);
        let mut materials: Vec<Material> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut by_tex_info = vec![None; tex_infos.len()];

        for (index, tex_info) in tex_infos.iter().enumerate() {
            if let FrameRole::Continuation { .. } = roles[index] {
                continue;
            }
            let material = *by_name
                .entry(tex_info.texture_name.as_str())
                .or_insert_with(|| {
                    materials.push(Material {
                        name: tex_info.texture_name.clone(),
                        frames: Vec::new(),
                    });
                    materials.len() - 1
                });
            if roles[index] == FrameRole::Head && materials[material].frames.is_empty() {
                materials[material].frames = chain_frames(tex_infos, &roles, index);
            }
            by_tex_info[index] = Some(material);
        }

        for (index, role) in roles.iter().enumerate() {
            if let FrameRole::Continuation { head } = *role {
                by_tex_info[index] = by_tex_info[head];
            }
        }

        debug!(
            "{} materials from {} texinfos",
            materials.len(),
            tex_infos.len()
        );
        Self {
            materials,
            by_tex_info,
        }
    }

    pub fn material_for(&self, tex_info_index: usize) -> Option<usize> {
        self.by_tex_info.get(tex_info_index).copied().flatten()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn get(&self, material: usize) -> Option<&Material> {
        self.materials.get(material)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
