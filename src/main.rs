//! Par Graph Layout - GPU-accelerated force-directed 3D graph layout.
//!
//! Headless runner: seeds a particle cloud and a graph, ticks the layout
//! engine, and optionally dumps the resulting positions as JSON.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use par_graph_layout::config::LayoutConfig;
use par_graph_layout::engine::{GpuContext, GpuLayoutEngine};
use par_graph_layout::generators::{ball_cloud, preferential_graph, random_graph, ring_graph};
use par_graph_layout::simulation::{CsrGraph, Particle, ReferenceEngine};

/// Graph topology to generate.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Topology {
    /// A single cycle through all particles.
    Ring,
    /// Uniformly random edges.
    Random,
    /// Preferential attachment (hubs).
    Preferential,
}

/// Par Graph Layout - GPU-accelerated force-directed 3D graph layout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of particles.
    #[arg(long, default_value_t = 10_000)]
    particles: usize,

    /// Number of undirected edges (ignored for the ring topology).
    #[arg(long, default_value_t = 20_000)]
    edges: usize,

    /// Graph topology.
    #[arg(long, value_enum, default_value = "random")]
    topology: Topology,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// RNG seed for the initial conditions.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run the CPU reference pipeline instead of the GPU.
    #[arg(long)]
    cpu: bool,

    /// Load layout parameters from a TOML file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write final particle state to a JSON file.
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn dump_particles(path: &PathBuf, particles: &[Particle]) -> Result<()> {
    let json = serde_json::to_string(particles).context("Failed to serialize particles")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    log::info!("wrote {} particles to {}", particles.len(), path.display());
    Ok(())
}

fn run_cpu(cli: &Cli, particles: Vec<Particle>, graph: CsrGraph, config: LayoutConfig) -> Result<()> {
    let mut engine = ReferenceEngine::new(particles, graph, config)?;
    let start = Instant::now();
    for _ in 0..cli.ticks {
        engine.tick();
    }
    let elapsed = start.elapsed();
    log::info!(
        "cpu: {} ticks in {:.2?} ({:.2} ms/tick)",
        cli.ticks,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / cli.ticks.max(1) as f64
    );
    if let Some(path) = &cli.dump {
        dump_particles(path, &engine.particles())?;
    }
    Ok(())
}

fn run_gpu(cli: &Cli, particles: Vec<Particle>, graph: CsrGraph, config: LayoutConfig) -> Result<()> {
    let context = pollster::block_on(GpuContext::new())?;
    let mut engine = GpuLayoutEngine::new(context, &particles, &graph, config)?;
    let start = Instant::now();
    for _ in 0..cli.ticks {
        engine.tick();
    }
    // Readback doubles as the wait for queued work.
    let final_particles = engine.read_particles();
    let elapsed = start.elapsed();
    log::info!(
        "gpu: {} ticks in {:.2?} ({:.2} ms/tick)",
        cli.ticks,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / cli.ticks.max(1) as f64
    );
    if let Some(path) = &cli.dump {
        dump_particles(path, &final_particles)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };

    let particles = ball_cloud(cli.particles, 1.0, cli.seed);
    let graph = match cli.topology {
        Topology::Ring => ring_graph(cli.particles),
        Topology::Random => random_graph(cli.particles, cli.edges, cli.seed ^ 0x5eed),
        Topology::Preferential => {
            let links = (cli.edges / cli.particles.max(1)).max(1);
            preferential_graph(cli.particles, links, cli.seed)
        }
    };
    log::info!(
        "{} particles, {} edge entries ({:?})",
        cli.particles,
        graph.num_edges(),
        cli.topology
    );

    if cli.cpu {
        run_cpu(&cli, particles, graph, config)
    } else {
        run_gpu(&cli, particles, graph, config)
    }
}
