//! CPU reference implementation of the per-tick pipeline.
//!
//! Runs the same seven stages as the GPU engine (integrate, sort encode,
//! reshuffle, identity mirror, CSR prefix-sum, coarse map, edge
//! relocation) over plain vectors. It is the oracle for the invariant
//! tests and the engine behind the `--cpu` execution mode.

use crate::config::{LayoutConfig, SPAN_SIZE};
use crate::engine::EngineError;
use crate::utils::{ceil_log2, coarse_len};

use super::graph::{CsrGraph, EMPTY};
use super::particle::{Particle, ParticleIdMass, ParticlePosKey, ParticleVel};
use super::physics::integrate_particles;
use super::sfc::sfc_key;
use super::span_sort::{sort_offset_for_pass, SortAtlas};

/// Upper bound on the relocation kernel's forward walk from the coarse
/// guess. The coarse stride is validated to stay at or below this.
pub const MAX_RELOCATE_WALK: u32 = 256;

/// Validate a particle set, graph, and config against each other.
///
/// Everything here is a construction-time configuration error; the tick
/// path assumes all of it.
pub fn validate_setup(
    particles: &[Particle],
    graph: &CsrGraph,
    config: &LayoutConfig,
) -> Result<(), String> {
    config.validate()?;
    if particles.is_empty() {
        return Err("particle count must be greater than 0".to_string());
    }
    if graph.num_particles() != particles.len() {
        return Err(format!(
            "graph is sized for {} particles but {} were supplied",
            graph.num_particles(),
            particles.len()
        ));
    }
    graph.validate()?;

    // The identity mirror scatters one write per PID; uniqueness is what
    // makes that race-free.
    let n = particles.len();
    let mut seen = vec![false; n];
    for p in particles {
        let pid = p.pid as usize;
        if pid >= n {
            return Err(format!("pid {pid} out of range for {n} particles"));
        }
        if seen[pid] {
            return Err(format!("duplicate pid {pid}"));
        }
        seen[pid] = true;
    }
    for p in particles {
        if !p.mass.is_finite() || p.mass < 0.0 {
            return Err(format!("pid {} has invalid mass {}", p.pid, p.mass));
        }
    }
    Ok(())
}

/// Largest `p` in `[0, n]` with `ptr[p] <= t`, via a fixed-iteration
/// binary search (the GPU kernel runs the same loop).
fn coarse_owner(ptr: &[u32], t: u32, iters: u32) -> u32 {
    let n = (ptr.len() - 1) as u32;
    let mut lo = 0u32;
    let mut hi = n;
    for _ in 0..iters {
        let mid = (lo + hi + 1) / 2;
        if ptr[mid as usize] <= t {
            lo = mid;
        } else {
            hi = mid.saturating_sub(1);
        }
    }
    lo
}

/// CPU implementation of the full layout engine.
pub struct ReferenceEngine {
    config: LayoutConfig,
    n: usize,

    pos: Vec<ParticlePosKey>,
    vel: Vec<ParticleVel>,
    idm: Vec<ParticleIdMass>,
    pos_scratch: Vec<ParticlePosKey>,
    vel_scratch: Vec<ParticleVel>,
    idm_scratch: Vec<ParticleIdMass>,

    csr: CsrGraph,
    csr_next: CsrGraph,
    identity: Vec<u32>,
    coarse: Vec<u32>,

    pass: u64,
}

impl ReferenceEngine {
    /// Build an engine from seeded particles and a CSR graph.
    pub fn new(
        particles: Vec<Particle>,
        graph: CsrGraph,
        config: LayoutConfig,
    ) -> Result<Self, EngineError> {
        validate_setup(&particles, &graph, &config).map_err(EngineError::Config)?;

        let n = particles.len();
        let side = config.sfc_resolution;
        let mut pos: Vec<ParticlePosKey> = particles.iter().map(ParticlePosKey::from).collect();
        for p in &mut pos {
            p.key = sfc_key(p.position(), side);
        }
        let vel: Vec<ParticleVel> = particles.iter().map(ParticleVel::from).collect();
        let idm: Vec<ParticleIdMass> = particles.iter().map(ParticleIdMass::from).collect();

        let coarse = vec![0u32; coarse_len(graph.num_edges() as u32, config.coarse_stride) as usize];

        log::debug!(
            "reference engine: {} particles, {} edges, {} coarse entries",
            n,
            graph.num_edges(),
            coarse.len()
        );

        Ok(Self {
            config,
            n,
            pos_scratch: pos.clone(),
            vel_scratch: vel.clone(),
            idm_scratch: idm.clone(),
            pos,
            vel,
            idm,
            csr_next: graph.clone(),
            csr: graph,
            identity: vec![EMPTY; n],
            coarse,
            pass: 0,
        })
    }

    /// Run one full tick of the pipeline.
    pub fn tick(&mut self) {
        let n = self.n;
        let offset = sort_offset_for_pass(self.pass, SPAN_SIZE);

        // 1. Integrate current state into scratch, refreshing SFC keys.
        integrate_particles(
            &self.pos,
            &self.vel,
            &self.idm,
            &self.csr,
            &mut self.pos_scratch,
            &mut self.vel_scratch,
            &mut self.idm_scratch,
            &self.config,
        );

        // 2. Encode the chunked sort permutation from the fresh keys.
        let keys: Vec<f32> = self.pos_scratch.iter().map(|p| p.key).collect();
        let atlas = SortAtlas::build(&keys, offset);

        // 3. Reshuffle: gather all three arrays through the atlas. One
        // source per destination keeps the tuples intact.
        for i in 0..n {
            let s = atlas.source(i as u32) as usize;
            self.pos[i] = self.pos_scratch[s];
            self.vel[i] = self.vel_scratch[s];
            self.idm[i] = self.idm_scratch[s];
        }

        // 4. Identity mirror: PID -> new physical slot.
        self.identity.fill(EMPTY);
        for i in 0..n {
            self.identity[self.idm[i].pid as usize] = i as u32;
        }

        // 5. CSR prefix-sum: counts through the atlas, inclusive scan,
        // exclusive finalize.
        let ptr_old = &self.csr.ptr;
        let mut counts = vec![0u32; n];
        for (i, c) in counts.iter_mut().enumerate() {
            let s = atlas.source(i as u32) as usize;
            *c = ptr_old[s + 1] - ptr_old[s];
        }
        let mut running = 0u32;
        for i in 0..n {
            running += counts[i];
            self.csr_next.ptr[i] = running - counts[i];
        }
        self.csr_next.ptr[n] = running;

        // 6. Coarse map over the new offsets.
        let iters = ceil_log2(n as u32) + 1;
        let stride = self.config.coarse_stride;
        for (k, slot) in self.coarse.iter_mut().enumerate() {
            *slot = coarse_owner(&self.csr_next.ptr, k as u32 * stride, iters);
        }

        // 7. Relocate every edge into the new layout.
        let num_edges = self.csr.store.len() as u32;
        for e in 0..num_edges {
            let mut p = self.coarse[(e / stride) as usize];
            let mut steps = 0;
            while e >= self.csr_next.ptr[p as usize + 1] && steps < MAX_RELOCATE_WALK {
                p += 1;
                steps += 1;
            }
            let local = e - self.csr_next.ptr[p as usize];
            let p_old = atlas.source(p);
            let e_old = ptr_old[p_old as usize] + local;
            let t_old = self.csr.store[e_old as usize];
            self.csr_next.store[e as usize] = if t_old == EMPTY {
                EMPTY
            } else {
                let pid = self.idm_scratch[t_old as usize].pid;
                self.identity[pid as usize]
            };
        }

        std::mem::swap(&mut self.csr, &mut self.csr_next);
        self.pass += 1;
    }

    /// Number of completed passes.
    #[inline]
    pub fn pass(&self) -> u64 {
        self.pass
    }

    #[inline]
    pub fn num_particles(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[inline]
    pub fn positions(&self) -> &[ParticlePosKey] {
        &self.pos
    }

    #[inline]
    pub fn velocities(&self) -> &[ParticleVel] {
        &self.vel
    }

    #[inline]
    pub fn id_mass(&self) -> &[ParticleIdMass] {
        &self.idm
    }

    #[inline]
    pub fn graph(&self) -> &CsrGraph {
        &self.csr
    }

    #[inline]
    pub fn identity(&self) -> &[u32] {
        &self.identity
    }

    /// Reassemble particle structs from the SoA arrays, in slot order.
    pub fn particles(&self) -> Vec<Particle> {
        (0..self.n)
            .map(|i| Particle {
                x: self.pos[i].x,
                y: self.pos[i].y,
                z: self.pos[i].z,
                vx: self.vel[i].vx,
                vy: self.vel[i].vy,
                vz: self.vel[i].vz,
                mass: self.idm[i].mass,
                pid: self.idm[i].pid,
                tint: self.idm[i].tint,
            })
            .collect()
    }

    /// The logical edge multiset as `(owner PID, target PID)` pairs,
    /// skipping sentinel holes. Slot-independent, so comparable across
    /// ticks.
    pub fn logical_edges(&self) -> Vec<(u32, u32)> {
        let mut edges = Vec::with_capacity(self.csr.num_edges());
        for p in 0..self.n {
            for &t in self.csr.edges_of(p) {
                if t != EMPTY {
                    edges.push((self.idm[p].pid, self.idm[t as usize].pid));
                }
            }
        }
        edges
    }
}
