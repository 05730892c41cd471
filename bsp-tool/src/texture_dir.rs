use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use idtech2_reader::bsp::TexInfo;
use idtech2_reader::wal::WalHeader;
use idtech2_reader::TextureResolution;
use log::{debug, warn};

/// Finds `<root>/<texture name>.wal` for each texinfo.
pub struct WalDirectory {
    root: PathBuf,
}

impl WalDirectory {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Textures next to the map, or next to the map's directory when `from_parent` is set.
    pub fn for_map(map_path: &Path, from_parent: bool) -> Self {
        let map_dir = map_path.parent().unwrap_or_else(|| Path::new("."));
        let root = if from_parent {
            map_dir.parent().unwrap_or(map_dir)
        } else {
            map_dir
        };
        Self::new(root.to_path_buf())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, texture_name: &str) -> PathBuf {
        self.root.join(format!("{}.wal", texture_name))
    }

    pub fn load_file(&self, texture_name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(texture_name);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) => match e.kind() {
                ErrorKind::NotFound => Ok(None),
                _ => Err(e).with_context(|| format!("Reading texture {:?}", path)),
            },
        }
    }

    /// Reads the header of every distinct texture. Missing or unreadable files are logged and left out.
    pub fn resolutions(&self, tex_infos: &[TexInfo]) -> HashMap<String, TextureResolution> {
        let mut resolutions = HashMap::new();
        for tex_info in tex_infos {
            let name = &tex_info.texture_name;
            if resolutions.contains_key(name) {
                continue;
            }
            let data = match self.load_file(name) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    warn!("texture not found: {:?}", self.path_for(name));
                    continue;
                }
                Err(e) => {
                    warn!("{:#}", e);
                    continue;
                }
            };
            match WalHeader::parse(&data) {
                Ok(header) => {
                    debug!("{}: {}x{}", name, header.width, header.height);
                    resolutions.insert(
                        name.clone(),
                        TextureResolution::new(header.width, header.height),
                    );
                }
                Err(e) => warn!("{:?}: {}", self.path_for(name), e),
            }
        }
        resolutions
    }
}
