//! # Par Graph Layout
//!
//! A GPU-accelerated force-directed 3D graph layout library in Rust.
//!
//! ## Features
//!
//! - **GPU Pipeline**: wgpu compute shaders for physics, spatial sorting,
//!   and edge-store relocation
//! - **SFC Locality**: particles are re-sorted every tick by a
//!   space-filling-curve key so near-field forces read neighboring slots
//! - **CPU Reference**: a complete CPU implementation of the same pipeline
//!   for testing and headless fallback
//!
//! ## Example
//!
//! ```no_run
//! use par_graph_layout::config::LayoutConfig;
//! use par_graph_layout::generators::{ball_cloud, ring_graph};
//! use par_graph_layout::simulation::ReferenceEngine;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LayoutConfig::default();
//!     let particles = ball_cloud(1024, 1.0, 42);
//!     let graph = ring_graph(1024);
//!     let mut engine = ReferenceEngine::new(particles, graph, config)?;
//!     engine.tick();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod generators;
pub mod simulation;
pub mod utils;

pub use config::LayoutConfig;
pub use engine::{EngineError, GpuContext, GpuLayoutEngine};
pub use simulation::{CsrGraph, Particle, ReferenceEngine, SortAtlas, EMPTY};
