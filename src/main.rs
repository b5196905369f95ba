mod stage;

use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use strata_blocks::MaterialCatalog;
use strata_dimension::{BlockAccessor, Dimension};
use strata_geom::BlockPos;
use strata_world::ChunkCoord;
use strata_world::worldgen::{StrataConfig, load_config_from_path};

use stage::{CountingSink, Pipeline, Stage};

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Generate, carve and light a patch of voxel terrain headlessly")]
struct Args {
    /// TOML config; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// World seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Chunk radius around the origin to generate
    #[arg(short, long)]
    radius: Option<i32>,

    /// Stop after this many ticks even if work remains
    #[arg(short, long, default_value_t = 100_000)]
    ticks: u64,

    /// Generation worker threads (0 = one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Light positions processed per lighting step
    #[arg(long)]
    light_budget: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            log::info!("loading config from {}", path.display());
            load_config_from_path(path)?
        }
        None => StrataConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.world.seed = seed;
    }
    if let Some(radius) = args.radius {
        cfg.runtime.view_radius = radius;
    }
    if let Some(workers) = args.workers {
        cfg.runtime.workers = workers;
    }
    if let Some(budget) = args.light_budget {
        cfg.lighting.budget = budget;
    }

    let catalog = cfg.catalog();
    let mut dim = Dimension::from_config(&cfg)?;
    log::info!(
        "seed {} | chunk {}x{} | radius {} | {} layers | light budget {}",
        cfg.world.seed,
        cfg.world.chunk_width,
        cfg.world.world_height,
        cfg.runtime.view_radius,
        cfg.layers.len(),
        cfg.lighting.budget
    );

    let mut pipeline = Pipeline::standard(ChunkCoord::new(0, 0), cfg.runtime.view_radius, 1);
    let mut sink = CountingSink::default();
    let started = Instant::now();
    let mut idle = false;
    while pipeline.tick_count() < args.ticks {
        idle = pipeline.tick(&mut dim, &mut sink, Instant::now());
        if idle {
            break;
        }
        if dim.light_queue().is_empty() {
            // Only generation workers have anything left to do.
            thread::sleep(Duration::from_millis(1));
        }
    }
    for stage in pipeline.stages() {
        if let Stage::Streaming(s) = stage {
            log::info!("streamed {} chunks", s.generated());
            if !s.is_complete() {
                log::warn!("{} chunks never became ready: {:?}", s.remaining().len(), s.remaining());
            }
        }
    }
    if !idle {
        log::warn!(
            "stopped after {} ticks with work remaining ({} light entries pending)",
            pipeline.tick_count(),
            dim.light_queue().len()
        );
    }

    let stats = dim.stats();
    log::info!(
        "{} ticks in {:.1}ms: {} chunks, {} light commits, {} major / {} minor remesh",
        pipeline.tick_count(),
        started.elapsed().as_secs_f64() * 1000.0,
        stats.chunks,
        stats.light_commits,
        sink.major,
        sink.minor
    );
    log::info!(
        "chunk info: {} computed, {} hits, {} misses, {:.1}ms generating",
        stats.cache.computed,
        stats.cache.hits,
        stats.cache.misses,
        stats.cache.compute_time.as_secs_f64() * 1000.0
    );
    log::info!("column (0, 0): {}", column_profile(&dim, &catalog, 0, 0));

    dim.shutdown();
    Ok(())
}

/// Runs of identical content in one world column, bottom-up.
fn column_profile(dim: &Dimension, catalog: &MaterialCatalog, x: i32, z: i32) -> String {
    let h = dim.params().world_height as i32;
    let mut runs: Vec<(String, i32, i32)> = Vec::new();
    for y in 0..h {
        let Some(b) = dim.get_block(BlockPos::new(x, y, z)) else {
            break;
        };
        let label = if b.is_solid() {
            catalog.name_of(b.id).to_string()
        } else if b.sky() {
            "sky".to_string()
        } else {
            format!("cave(light {})", b.light())
        };
        match runs.last_mut() {
            Some((l, _, end)) if *l == label => *end = y + 1,
            _ => runs.push((label, y, y + 1)),
        }
    }
    if runs.is_empty() {
        return "not generated".to_string();
    }
    runs.iter()
        .map(|(l, a, b)| format!("{l} {a}..{b}"))
        .collect::<Vec<_>>()
        .join(" | ")
}
