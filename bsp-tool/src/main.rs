use std::fs::{create_dir_all, File};
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use idtech2_reader::diagnostics::Diagnostics;
use idtech2_reader::lightmap::build_lightmap_atlas;
use idtech2_reader::{
    decode_wal, DecodedLevel, Header, LightmapOptions, LoadOptions, LumpId, Palette, Scene,
    SceneOptions,
};
use log::info;
use memmap::Mmap;
use texture_atlas::DEFAULT_MAX_WIDTH;

use crate::texture_dir::WalDirectory;

mod texture_dir;

#[derive(Parser)]
#[command(name = "bsp-tool", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints the lump directory and decoded record counts
    Info(MapArgs),
    /// Dumps a raw lump to stdout
    CatLump {
        #[command(flatten)]
        map: MapArgs,
        /// Lump name or index (example: entities, 7)
        lump: String,
    },
    /// Prints the entity lump as parsed key/value blocks
    Entities(MapArgs),
    /// Packs every face lightmap into one PNG atlas
    Lightmap {
        #[command(flatten)]
        map: MapArgs,
        #[command(flatten)]
        lightmaps: LightmapArgs,
        /// Path of the PNG to write (default: <map>_lightmap.png next to the map)
        #[arg(long, value_name = "PATH")]
        dst: Option<PathBuf>,
    },
    /// Converts .wal textures to PNG
    Wal {
        /// Texture files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory to write PNGs into (default: next to each texture)
        #[arg(long, value_name = "PATH")]
        dst: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        palette: Option<PathBuf>,
    },
    /// Builds the full scene and prints a summary
    Scene {
        #[command(flatten)]
        map: MapArgs,
        #[command(flatten)]
        lightmaps: LightmapArgs,
        /// Directory that texture names are relative to (default: the map's directory)
        #[arg(long, value_name = "PATH")]
        textures: Option<PathBuf>,
        /// Resolve textures from the parent of the map's directory
        #[arg(long)]
        search_from_parent: bool,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        /// Skip the lightmap atlas
        #[arg(long)]
        no_lightmaps: bool,
    },
}

#[derive(Args)]
struct MapArgs {
    /// Path to a .bsp file
    map: PathBuf,
    /// Decode files whose version is not 38
    #[arg(long)]
    lenient: bool,
}

impl MapArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict_version: !self.lenient,
        }
    }
}

#[derive(Args)]
struct LightmapArgs {
    /// Keep lightmap rows in file order
    #[arg(long)]
    no_flip: bool,
    #[arg(long, default_value_t = 1, value_name = "TEXELS")]
    min_atlas_width: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_WIDTH, value_name = "TEXELS")]
    max_atlas_width: usize,
}

impl LightmapArgs {
    fn options(&self) -> LightmapOptions {
        LightmapOptions {
            flip_v: !self.no_flip,
            min_atlas_width: self.min_atlas_width,
            max_atlas_width: self.max_atlas_width,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info(map) => info_command(&map),
        Command::CatLump { map, lump } => cat_lump(&map, &lump),
        Command::Entities(map) => entities(&map),
        Command::Lightmap {
            map,
            lightmaps,
            dst,
        } => lightmap(&map, &lightmaps, dst),
        Command::Wal {
            files,
            dst,
            palette,
        } => wal(&files, dst.as_deref(), palette.as_deref()),
        Command::Scene {
            map,
            lightmaps,
            textures,
            search_from_parent,
            scale,
            no_lightmaps,
        } => {
            let textures = match textures {
                Some(root) => WalDirectory::new(root),
                None => WalDirectory::for_map(&map.map, search_from_parent),
            };
            let options = SceneOptions {
                scale,
                lightmaps: (!no_lightmaps).then(|| lightmaps.options()),
            };
            scene(&map, &textures, &options)
        }
    }
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("Opening map file {:?}", path))?;
    let data = unsafe { Mmap::map(&file) }.with_context(|| format!("Mapping {:?}", path))?;
    Ok(data)
}

fn decode<'a>(map: &MapArgs, data: &'a [u8]) -> Result<DecodedLevel<'a>> {
    DecodedLevel::decode(data, &map.load_options())
        .with_context(|| format!("Decoding {:?}", map.map))
}

fn info_command(map: &MapArgs) -> Result<()> {
    let data = map_file(&map.map)?;
    let header = Header::parse(&data).with_context(|| format!("Reading {:?}", map.map))?;

    let stdout = stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "{:?}: version {}", map.map, header.version)?;
    for id in LumpId::ALL {
        let entry = header.lump(id);
        writeln!(
            stdout,
            "  {:>2} {:<16} offset {:>9} length {:>9}",
            id.index(),
            id.name(),
            entry.offset,
            entry.length,
        )?;
    }

    let level = decode(map, &data)?;
    writeln!(stdout, "vertices:    {}", level.vertices().len())?;
    writeln!(stdout, "edges:       {}", level.edges().len())?;
    writeln!(stdout, "face edges:  {}", level.face_edges().len())?;
    writeln!(stdout, "faces:       {}", level.faces().len())?;
    writeln!(stdout, "texinfos:    {}", level.tex_infos().len())?;
    writeln!(stdout, "entities:    {}", level.entities().len())?;
    writeln!(stdout, "polygons:    {}", level.polygons().len())?;
    for diagnostic in level.diagnostics() {
        writeln!(stdout, "  {}", diagnostic)?;
    }
    stdout.flush()?;
    Ok(())
}

fn cat_lump(map: &MapArgs, lump: &str) -> Result<()> {
    let id = match LumpId::from_name(lump) {
        Some(id) => id,
        None => bail!("unknown lump: {:?}", lump),
    };
    let data = map_file(&map.map)?;
    let header = Header::parse(&data).with_context(|| format!("Reading {:?}", map.map))?;
    let lump_data = header
        .lump_data(&data, id)
        .with_context(|| format!("Reading lump {}", id))?;

    let stdout = stdout();
    let mut stdout = stdout.lock();
    stdout.write_all(lump_data)?;
    stdout.flush()?;
    Ok(())
}

fn entities(map: &MapArgs) -> Result<()> {
    let data = map_file(&map.map)?;
    let level = decode(map, &data)?;

    let stdout = stdout();
    let mut stdout = stdout.lock();
    for entity in level.entities() {
        writeln!(stdout, "{{")?;
        for (key, value) in entity.iter() {
            writeln!(stdout, "\"{}\" \"{}\"", key, value)?;
        }
        writeln!(stdout, "}}")?;
    }
    stdout.flush()?;
    Ok(())
}

fn lightmap(map: &MapArgs, lightmaps: &LightmapArgs, dst: Option<PathBuf>) -> Result<()> {
    let data = map_file(&map.map)?;
    let level = decode(map, &data)?;
    let mut diagnostics = Diagnostics::new();
    let atlas = build_lightmap_atlas(&level, &lightmaps.options(), &mut diagnostics)
        .with_context(|| format!("Packing lightmaps of {:?}", map.map))?;

    let dst = dst.unwrap_or_else(|| sibling_with_suffix(&map.map, "_lightmap.png"));
    atlas.image.write_to_png(&dst)?;
    info!(
        "wrote {}x{} atlas with {} faces to {:?}",
        atlas.width(),
        atlas.height(),
        atlas.faces.len(),
        dst,
    );
    Ok(())
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

fn load_palette(path: Option<&Path>) -> Result<Palette> {
    match path {
        Some(path) => {
            let data =
                std::fs::read(path).with_context(|| format!("Reading palette {:?}", path))?;
            Ok(Palette::from_bytes(&data).with_context(|| format!("Parsing palette {:?}", path))?)
        }
        None => Ok(Palette::quake2()),
    }
}

fn wal(files: &[PathBuf], dst: Option<&Path>, palette: Option<&Path>) -> Result<()> {
    let palette = load_palette(palette)?;
    if let Some(dst) = dst {
        create_dir_all(dst).with_context(|| format!("Creating {:?}", dst))?;
    }

    for path in files {
        let data = std::fs::read(path).with_context(|| format!("Reading texture {:?}", path))?;
        let wal = decode_wal(&data, &palette).with_context(|| format!("Decoding {:?}", path))?;
        let mut png_path = sibling_with_suffix(path, ".png");
        if let (Some(dst), Some(file_name)) = (dst, png_path.file_name()) {
            png_path = dst.join(file_name);
        }
        wal.image.write_to_png(&png_path)?;
        info!(
            "{:?}: {}x{} -> {:?}",
            wal.header.name, wal.header.width, wal.header.height, png_path
        );
    }
    Ok(())
}

fn scene(map: &MapArgs, textures: &WalDirectory, options: &SceneOptions) -> Result<()> {
    let data = map_file(&map.map)?;
    let level = decode(map, &data)?;
    let resolutions = textures.resolutions(level.tex_infos());
    info!(
        "resolved {} textures under {:?}",
        resolutions.len(),
        textures.root()
    );
    let scene = Scene::build(&level, &resolutions, options);

    let textured = scene
        .polygons
        .iter()
        .filter(|p| p.texture_uvs.is_some())
        .count();
    let lit = scene
        .polygons
        .iter()
        .filter(|p| p.lightmap_uvs.is_some())
        .count();

    let stdout = stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "positions:   {}", scene.positions.len())?;
    writeln!(stdout, "polygons:    {}", scene.polygons.len())?;
    writeln!(stdout, "  textured:  {}", textured)?;
    writeln!(stdout, "  lit:       {}", lit)?;
    writeln!(stdout, "materials:   {}", scene.materials.len())?;
    for material in scene.materials.materials() {
        if material.is_animated() {
            writeln!(
                stdout,
                "  {} (animated: {})",
                material.name,
                material.frames.join(" -> ")
            )?;
        } else {
            writeln!(stdout, "  {}", material.name)?;
        }
    }
    if let Some(atlas) = &scene.lightmap_atlas {
        writeln!(
            stdout,
            "lightmap:    {}x{} ({} faces)",
            atlas.width(),
            atlas.height(),
            atlas.faces.len()
        )?;
    }
    writeln!(stdout, "entities:    {}", scene.entities.len())?;
    for (index, entity) in scene.entities.iter().enumerate() {
        if let Some(origin) = scene.entity_origin(index) {
            writeln!(
                stdout,
                "  {} at ({}, {}, {})",
                entity.class_name().unwrap_or("?"),
                origin.x,
                origin.y,
                origin.z
            )?;
        }
    }
    writeln!(stdout, "diagnostics: {}", scene.diagnostics.len())?;
    stdout.flush()?;
    Ok(())
}
