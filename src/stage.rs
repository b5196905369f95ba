//! Tick pipeline: streaming, lighting and remesh stages over one dimension.

use std::time::Instant;

use strata_chunk::ChunkData;
use strata_dimension::{Dimension, GenerateError, MeshInvalidation};
use strata_lighting::StepReport;
use strata_world::ChunkCoord;

/// Receives chunks whose mesh should be rebuilt.
pub trait MeshSink {
    fn remesh(&mut self, coord: ChunkCoord, kind: MeshInvalidation, chunk: &ChunkData);
}

/// Headless sink: counts signals and logs them.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub major: usize,
    pub minor: usize,
}

impl MeshSink for CountingSink {
    fn remesh(&mut self, coord: ChunkCoord, kind: MeshInvalidation, chunk: &ChunkData) {
        match kind {
            MeshInvalidation::Major => self.major += 1,
            MeshInvalidation::Minor => self.minor += 1,
        }
        log::debug!(
            "remesh ({}, {}) {:?}, {} pending light",
            coord.cx,
            coord.cz,
            kind,
            chunk.pending_light_count()
        );
    }
}

/// Materializes every chunk in a square around a focus chunk.
#[derive(Debug)]
pub struct Streaming {
    remaining: Vec<ChunkCoord>,
    primed: bool,
    generated: usize,
}

impl Streaming {
    pub fn new(focus: ChunkCoord, radius: i32) -> Self {
        let mut remaining: Vec<ChunkCoord> = focus.neighborhood(radius.max(0)).collect();
        remaining.sort_by_key(|c| (c.distance_sq(focus), c.cx, c.cz));
        Self {
            remaining,
            primed: false,
            generated: 0,
        }
    }

    /// Chunks still waiting, nearest first.
    pub fn remaining(&self) -> &[ChunkCoord] {
        &self.remaining
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    fn update(&mut self, dim: &mut Dimension, tick: u64) {
        if self.remaining.is_empty() {
            return;
        }
        // The first attempt schedules every missing info. After that only a
        // fresh completion can unblock a chunk.
        let completed = dim.drain_completed_infos();
        if self.primed && completed.is_empty() {
            return;
        }
        self.primed = true;
        if !completed.is_empty() {
            log::debug!(target: "events", "[tick {}] ChunkInfoReady x{}", tick, completed.len());
        }

        let mut generated = 0;
        self.remaining.retain(|&c| {
            if dim.is_generated(c) {
                return false;
            }
            match dim.generate_chunk(c) {
                Ok(()) => {
                    log::info!(target: "events", "[tick {}] ChunkGenerated ({}, {})", tick, c.cx, c.cz);
                    generated += 1;
                    false
                }
                Err(GenerateError::AlreadyGenerated) => false,
                Err(GenerateError::NotReady { .. }) => true,
            }
        });
        self.generated += generated;
    }
}

/// Runs budgeted lighting steps.
#[derive(Debug)]
pub struct Lighting {
    pub steps_per_tick: usize,
}

impl Lighting {
    pub fn new(steps_per_tick: usize) -> Self {
        Self {
            steps_per_tick: steps_per_tick.max(1),
        }
    }

    fn update(&mut self, dim: &mut Dimension, tick: u64) {
        let mut total = StepReport::default();
        for _ in 0..self.steps_per_tick {
            if dim.light_queue().is_empty() {
                break;
            }
            let r = dim.tick_lighting();
            total.processed += r.processed;
            total.changed += r.changed;
        }
        if total.processed > 0 {
            log::debug!(target: "events", "[tick {}] LightStep processed={} changed={} pending={}",
                tick, total.processed, total.changed, dim.light_queue().len());
        }
    }
}

/// Forwards throttled mesh invalidations to a [`MeshSink`].
#[derive(Debug, Default)]
pub struct Remesh;

impl Remesh {
    fn render(&mut self, dim: &mut Dimension, sink: &mut dyn MeshSink, now: Instant, tick: u64) {
        for (coord, kind) in dim.take_mesh_invalidations(now) {
            let Some(chunk) = dim.chunk(coord) else {
                continue;
            };
            log::debug!(target: "events", "[tick {}] Remesh ({}, {}) {:?}", tick, coord.cx, coord.cz, kind);
            sink.remesh(coord, kind, chunk);
        }
    }
}

pub enum Stage {
    Streaming(Streaming),
    Lighting(Lighting),
    Remesh(Remesh),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Streaming(_) => "streaming",
            Stage::Lighting(_) => "lighting",
            Stage::Remesh(_) => "remesh",
        }
    }

    pub fn update(&mut self, dim: &mut Dimension, tick: u64) {
        match self {
            Stage::Streaming(s) => s.update(dim, tick),
            Stage::Lighting(l) => l.update(dim, tick),
            Stage::Remesh(_) => {}
        }
    }

    pub fn render(&mut self, dim: &mut Dimension, sink: &mut dyn MeshSink, now: Instant, tick: u64) {
        if let Stage::Remesh(r) = self {
            r.render(dim, sink, now, tick);
        }
    }

    /// True when the stage has no outstanding work.
    pub fn is_idle(&self, dim: &Dimension) -> bool {
        match self {
            Stage::Streaming(s) => s.is_complete(),
            Stage::Lighting(_) => dim.light_queue().is_empty(),
            Stage::Remesh(_) => true,
        }
    }
}

pub struct Pipeline {
    stages: Vec<Stage>,
    tick: u64,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        let names: Vec<_> = stages.iter().map(Stage::name).collect();
        log::debug!("pipeline stages: {}", names.join(" -> "));
        Self { stages, tick: 0 }
    }

    /// Streaming around `focus`, then lighting, then remesh.
    pub fn standard(focus: ChunkCoord, radius: i32, light_steps_per_tick: usize) -> Self {
        Self::new(vec![
            Stage::Streaming(Streaming::new(focus, radius)),
            Stage::Lighting(Lighting::new(light_steps_per_tick)),
            Stage::Remesh(Remesh),
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Runs every stage's update, then every stage's render. Returns whether
    /// the pipeline is idle afterwards.
    pub fn tick(&mut self, dim: &mut Dimension, sink: &mut dyn MeshSink, now: Instant) -> bool {
        self.tick += 1;
        let tick = self.tick;
        for stage in &mut self.stages {
            stage.update(dim, tick);
        }
        for stage in &mut self.stages {
            stage.render(dim, sink, now, tick);
        }
        self.is_idle(dim)
    }

    pub fn is_idle(&self, dim: &Dimension) -> bool {
        self.stages.iter().all(|s| s.is_idle(dim))
    }
}
