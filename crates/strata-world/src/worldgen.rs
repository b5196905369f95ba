use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use strata_blocks::{MaterialCatalog, MaterialId};

use crate::noise::Fractal;

#[derive(Clone, Debug, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub materials: Option<Materials>,
    #[serde(default = "default_layers")]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub caves: Caves,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub lighting: Lighting,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            world: WorldSection::default(),
            materials: None,
            layers: default_layers(),
            caves: Caves::default(),
            runtime: Runtime::default(),
            lighting: Lighting::default(),
        }
    }
}

impl StrataConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    /// Material catalog for this config: the explicit `[materials]` list when
    /// present, otherwise the names the layers use.
    pub fn catalog(&self) -> MaterialCatalog {
        match &self.materials {
            Some(m) if !m.names.is_empty() => MaterialCatalog::from_names(m.names.iter().cloned()),
            _ => MaterialCatalog::from_names(self.layers.iter().map(|l| l.material.clone())),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldSection {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_chunk_width")]
    pub chunk_width: usize,
    #[serde(default = "default_world_height")]
    pub world_height: usize,
}
fn default_seed() -> u64 {
    1337
}
fn default_chunk_width() -> usize {
    16
}
fn default_world_height() -> usize {
    128
}
impl Default for WorldSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            chunk_width: default_chunk_width(),
            world_height: default_world_height(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Materials {
    #[serde(default)]
    pub names: Vec<String>,
}

/// One terrain stratum. Layers stack bottom-up in declaration order.
#[derive(Clone, Debug, Deserialize)]
pub struct Layer {
    pub material: String,
    #[serde(default)]
    pub base_height: f32,
    #[serde(default = "default_layer_freq")]
    pub frequency: f32,
    #[serde(default)]
    pub amplitude: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_layer_octaves")]
    pub octaves: u32,
}
fn default_layer_freq() -> f32 {
    0.01
}
fn default_lacunarity() -> f32 {
    2.0
}
fn default_persistence() -> f32 {
    0.5
}
fn default_layer_octaves() -> u32 {
    4
}

impl Layer {
    pub fn fractal(&self) -> Fractal {
        Fractal {
            frequency: self.frequency,
            amplitude: self.amplitude,
            lacunarity: self.lacunarity,
            persistence: self.persistence,
            octaves: self.octaves,
        }
    }
}

fn default_layers() -> Vec<Layer> {
    let layer = |material: &str, base_height: f32, frequency: f32, amplitude: f32, octaves: u32| {
        Layer {
            material: material.to_string(),
            base_height,
            frequency,
            amplitude,
            lacunarity: default_lacunarity(),
            persistence: default_persistence(),
            octaves,
        }
    };
    vec![
        layer("stone", 48.0, 0.008, 16.0, 4),
        layer("dirt", 3.0, 0.05, 1.5, 2),
        layer("grass", 1.0, 0.0, 0.0, 0),
    ]
}

#[derive(Clone, Debug, Deserialize)]
pub struct Caves {
    #[serde(default = "default_max_worms")]
    pub max_worms_per_chunk: u32,
    #[serde(default = "default_max_segments")]
    pub max_segments: u32,
    #[serde(default = "default_step")]
    pub step: f32,
    #[serde(default = "default_cave_min_y")]
    pub min_y: f32,
    #[serde(default = "default_cave_max_y")]
    pub max_y: f32,
    #[serde(default = "default_dig")]
    pub dig: Fractal,
    #[serde(default = "default_radius_base")]
    pub radius_base: f32,
    #[serde(default = "default_radius_noise")]
    pub radius: Fractal,
}
fn default_max_worms() -> u32 {
    2
}
fn default_max_segments() -> u32 {
    48
}
fn default_step() -> f32 {
    1.0
}
fn default_cave_min_y() -> f32 {
    8.0
}
fn default_cave_max_y() -> f32 {
    56.0
}
fn default_dig() -> Fractal {
    Fractal {
        frequency: 0.04,
        amplitude: 1.0,
        lacunarity: 2.0,
        persistence: 0.5,
        octaves: 2,
    }
}
fn default_radius_base() -> f32 {
    2.0
}
fn default_radius_noise() -> Fractal {
    Fractal {
        frequency: 0.1,
        amplitude: 1.0,
        lacunarity: 2.0,
        persistence: 0.5,
        octaves: 1,
    }
}
impl Default for Caves {
    fn default() -> Self {
        Self {
            max_worms_per_chunk: default_max_worms(),
            max_segments: default_max_segments(),
            step: default_step(),
            min_y: default_cave_min_y(),
            max_y: default_cave_max_y(),
            dig: default_dig(),
            radius_base: default_radius_base(),
            radius: default_radius_noise(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Runtime {
    /// Generation worker threads; `0` means one per available core.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_view_radius")]
    pub view_radius: i32,
}
fn default_view_radius() -> i32 {
    2
}

#[derive(Clone, Debug, Deserialize)]
pub struct Lighting {
    #[serde(default = "default_light_budget")]
    pub budget: usize,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default = "default_minor_remesh_secs")]
    pub minor_remesh_interval_secs: f32,
}
fn default_light_budget() -> usize {
    65_536
}
fn default_parallel_threshold() -> usize {
    1024
}
fn default_minor_remesh_secs() -> f32 {
    5.0
}
impl Default for Lighting {
    fn default() -> Self {
        Self {
            budget: default_light_budget(),
            parallel_threshold: default_parallel_threshold(),
            minor_remesh_interval_secs: default_minor_remesh_secs(),
        }
    }
}

/// Semantic problems in an otherwise well-formed config.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    EmptyLayers,
    UnknownMaterial { layer: usize, name: String },
    ZeroDimension { field: &'static str },
    InvalidCaves(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyLayers => write!(f, "at least one terrain layer is required"),
            ConfigError::UnknownMaterial { layer, name } => {
                write!(f, "layer {layer}: unknown material '{name}'")
            }
            ConfigError::ZeroDimension { field } => write!(f, "world.{field} must be positive"),
            ConfigError::InvalidCaves(why) => write!(f, "caves: {why}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct LayerParams {
    pub material: MaterialId,
    pub base_height: f32,
    pub fractal: Fractal,
}

#[derive(Clone, Debug)]
pub struct CaveParams {
    pub max_worms_per_chunk: u32,
    pub max_segments: u32,
    pub step: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub dig: Fractal,
    pub radius_base: f32,
    pub radius: Fractal,
}

/// Flattened, validated snapshot of the generation config used in tight loops.
#[derive(Clone, Debug)]
pub struct WorldGenParams {
    pub chunk_width: usize,
    pub world_height: usize,
    pub layers: Vec<LayerParams>,
    pub caves: CaveParams,
}

impl WorldGenParams {
    pub fn from_config(cfg: &StrataConfig, catalog: &MaterialCatalog) -> Result<Self, ConfigError> {
        if cfg.world.chunk_width == 0 {
            return Err(ConfigError::ZeroDimension {
                field: "chunk_width",
            });
        }
        if cfg.world.world_height == 0 {
            return Err(ConfigError::ZeroDimension {
                field: "world_height",
            });
        }
        if cfg.layers.is_empty() {
            return Err(ConfigError::EmptyLayers);
        }
        let c = &cfg.caves;
        if !(c.step > 0.0) {
            return Err(ConfigError::InvalidCaves("step must be positive"));
        }
        if c.max_worms_per_chunk > 0 && !(c.min_y < c.max_y) {
            return Err(ConfigError::InvalidCaves("min_y must be below max_y"));
        }
        let layers = cfg
            .layers
            .iter()
            .enumerate()
            .map(|(i, l)| match catalog.get_id(&l.material) {
                Some(material) => Ok(LayerParams {
                    material,
                    base_height: l.base_height,
                    fractal: l.fractal(),
                }),
                None => Err(ConfigError::UnknownMaterial {
                    layer: i,
                    name: l.material.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            chunk_width: cfg.world.chunk_width,
            world_height: cfg.world.world_height,
            layers,
            caves: CaveParams {
                max_worms_per_chunk: c.max_worms_per_chunk,
                max_segments: c.max_segments,
                step: c.step,
                min_y: c.min_y,
                max_y: c.max_y,
                dig: c.dig,
                radius_base: c.radius_base,
                radius: c.radius,
            },
        })
    }

    /// Largest node sphere radius a worm can produce.
    pub fn max_node_radius(&self) -> f32 {
        (self.caves.radius_base + self.caves.radius.max_amplitude()).max(0.0)
    }

    /// Chunk radius a worm can carve into from its origin chunk.
    ///
    /// The last node sits at most `(max_segments - 1) * step` from the
    /// origin and carves up to `max_node_radius` further. Never smaller
    /// than `ceil(max_segments * step / chunk_width)`.
    pub fn carve_radius(&self) -> i32 {
        let c = &self.caves;
        if c.max_segments == 0 {
            return 0;
        }
        let w = self.chunk_width as f32;
        let travel = (c.max_segments as f32 * c.step / w).ceil();
        let reach = (c.max_segments - 1) as f32 * c.step + self.max_node_radius();
        travel.max((reach / w).ceil()).max(0.0) as i32
    }
}

pub fn load_config_from_path(path: &Path) -> Result<StrataConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: StrataConfig = toml::from_str(&s)?;
    log::debug!(
        "loaded {}: seed {}, {} layers",
        path.display(),
        cfg.world.seed,
        cfg.layers.len()
    );
    Ok(cfg)
}
