//! Simulation module containing the data model and the CPU reference
//! implementation of the per-tick pipeline.

mod graph;
mod particle;
mod physics;
mod reference;
mod sfc;
mod span_sort;

pub use graph::{CsrGraph, EMPTY};
pub use particle::{Particle, ParticleIdMass, ParticlePosKey, ParticleVel};
pub use physics::integrate_particles;
pub use reference::{validate_setup, ReferenceEngine, MAX_RELOCATE_WALK};
pub use sfc::{hilbert_index, sfc_key};
pub use span_sort::{sort_offset_for_pass, SortAtlas};
