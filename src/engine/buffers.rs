//! GPU buffer management for the layout pipeline.
//!
//! Everything the pipeline touches lives here: the three particle arrays
//! with their scratch counterparts, the CSR pointer/store ping-pong pairs,
//! the scan pair for the prefix sum, the sort atlas, the identity map, and
//! the coarse map. All of it is allocated once at construction; ticks only
//! write.

use bytemuck::{Pod, Zeroable};
use wgpu::{util::DeviceExt, Buffer, BufferUsages, Device, Queue};

use crate::config::{LayoutConfig, SPAN_SIZE};
use crate::simulation::{
    sfc_key, sort_offset_for_pass, CsrGraph, Particle, ParticleIdMass, ParticlePosKey, ParticleVel,
};
use crate::utils::{ceil_log2, chunk_count, coarse_len};

/// Per-tick parameters shared by every kernel.
///
/// Matches the WGSL `TickParams` struct field for field; 64 bytes.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct TickParamsUniform {
    /// Number of particles.
    pub num_particles: u32,
    /// Number of edge-store entries.
    pub num_edges: u32,
    /// Near-field gravity window half-width in slots.
    pub gravity_window: u32,
    /// Rolling sort offset for this pass (0 or 64).
    pub sort_offset: u32,
    /// Number of sort chunks this pass.
    pub chunk_count: u32,
    /// Coarse map stride.
    pub coarse_stride: u32,
    /// Hilbert grid side for SFC keys.
    pub sfc_side: u32,
    /// Fixed iteration count for the coarse-map binary search.
    pub search_iters: u32,
    /// Integration time step.
    pub dt: f32,
    /// Gravitational constant (negative repels).
    pub gravity: f32,
    /// Spring constant for edges.
    pub spring_k: f32,
    /// Gravity denominator softening.
    pub eps: f32,
    /// Velocity damping per step.
    pub damping: f32,
    /// Radial boundary pull strength (0 disables).
    pub boundary_strength: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

impl TickParamsUniform {
    /// Parameters for one tick of the given pass counter.
    pub fn for_pass(config: &LayoutConfig, n: u32, num_edges: u32, pass: u64) -> Self {
        let sort_offset = sort_offset_for_pass(pass, SPAN_SIZE);
        Self {
            num_particles: n,
            num_edges,
            gravity_window: config.gravity_window,
            sort_offset,
            chunk_count: chunk_count(n, sort_offset, SPAN_SIZE),
            coarse_stride: config.coarse_stride,
            sfc_side: config.sfc_resolution,
            search_iters: ceil_log2(n) + 1,
            dt: config.dt,
            gravity: config.gravity,
            spring_k: config.spring_k,
            eps: config.eps,
            damping: config.damping,
            boundary_strength: config.boundary_strength,
            _pad0: 0.0,
            _pad1: 0.0,
        }
    }
}

/// The three particle arrays, each with a scratch counterpart.
///
/// Index 0 is the current array, index 1 the scratch. The roles are fixed
/// within a tick: the integrator writes scratch, the reshuffle gathers
/// back into current, so no swap is needed at tick boundaries.
pub struct ParticleBuffers {
    /// Position + SFC key, `vec4<f32>` per slot.
    pub pos: [Buffer; 2],
    /// Velocity, `vec4<f32>` per slot.
    pub vel: [Buffer; 2],
    /// PID, mass, and tint per slot.
    pub id_mass: [Buffer; 2],
    /// Current number of particles.
    pub num_particles: u32,
}

impl ParticleBuffers {
    /// Upload initial particle state, seeding the SFC keys from the
    /// starting positions so the first sort has real keys to work with.
    pub fn new(device: &Device, particles: &[Particle], config: &LayoutConfig) -> Self {
        let side = config.sfc_resolution;
        let mut pos_data: Vec<ParticlePosKey> =
            particles.iter().map(ParticlePosKey::from).collect();
        for p in &mut pos_data {
            p.key = sfc_key(p.position(), side);
        }
        let vel_data: Vec<ParticleVel> = particles.iter().map(ParticleVel::from).collect();
        let idm_data: Vec<ParticleIdMass> = particles.iter().map(ParticleIdMass::from).collect();

        let usage = BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC;
        let make = |label: &str, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        };

        Self {
            pos: [
                make("Particle Pos/Key Buffer", bytemuck::cast_slice(&pos_data)),
                make("Particle Pos/Key Scratch", bytemuck::cast_slice(&pos_data)),
            ],
            vel: [
                make("Particle Velocity Buffer", bytemuck::cast_slice(&vel_data)),
                make("Particle Velocity Scratch", bytemuck::cast_slice(&vel_data)),
            ],
            id_mass: [
                make("Particle Id/Mass Buffer", bytemuck::cast_slice(&idm_data)),
                make("Particle Id/Mass Scratch", bytemuck::cast_slice(&idm_data)),
            ],
            num_particles: particles.len() as u32,
        }
    }

    /// Current (post-reshuffle) buffers.
    #[inline]
    pub fn current_pos(&self) -> &Buffer {
        &self.pos[0]
    }
    #[inline]
    pub fn current_vel(&self) -> &Buffer {
        &self.vel[0]
    }
    #[inline]
    pub fn current_id_mass(&self) -> &Buffer {
        &self.id_mass[0]
    }

    /// Scratch (integrator output) buffers.
    #[inline]
    pub fn scratch_pos(&self) -> &Buffer {
        &self.pos[1]
    }
    #[inline]
    pub fn scratch_vel(&self) -> &Buffer {
        &self.vel[1]
    }
    #[inline]
    pub fn scratch_id_mass(&self) -> &Buffer {
        &self.id_mass[1]
    }
}

/// CSR buffers: pointer/store ping-pong pairs plus the scan pair and the
/// coarse map.
pub struct CsrBuffers {
    /// Start offsets, `n + 1` entries each.
    pub ptr: [Buffer; 2],
    /// Edge targets. At least one element even when the graph is empty so
    /// bind groups stay valid.
    pub store: [Buffer; 2],
    /// Which ptr/store pair is current (the other is written this tick).
    pub current: usize,
    /// Hillis-Steele scan ping-pong pair, `n` entries each.
    pub scan: [Buffer; 2],
    /// Coarse edge-to-owner samples.
    pub coarse: Buffer,
    /// Real edge count (the store buffers may be padded to one element).
    pub num_edges: u32,
    /// Number of coarse samples.
    pub coarse_entries: u32,
}

impl CsrBuffers {
    pub fn new(device: &Device, graph: &CsrGraph, config: &LayoutConfig) -> Self {
        let n = graph.num_particles();
        let num_edges = graph.num_edges() as u32;
        let coarse_entries = coarse_len(num_edges, config.coarse_stride);

        let usage = BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC;

        let ptr_init = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&graph.ptr),
                usage,
            })
        };
        // Both pair members start from the seeded data; the stale side is
        // fully rewritten before it is ever read.
        let store_data: Vec<u32> = if graph.store.is_empty() {
            vec![0]
        } else {
            graph.store.clone()
        };
        let store_init = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&store_data),
                usage,
            })
        };
        let scan_init = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: (n * std::mem::size_of::<u32>()) as u64,
                usage,
                mapped_at_creation: false,
            })
        };

        let coarse = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Edge Coarse Map"),
            size: (coarse_entries.max(1) as usize * std::mem::size_of::<u32>()) as u64,
            usage,
            mapped_at_creation: false,
        });

        Self {
            ptr: [ptr_init("Edge Ptr Buffer A"), ptr_init("Edge Ptr Buffer B")],
            store: [
                store_init("Edge Store Buffer A"),
                store_init("Edge Store Buffer B"),
            ],
            current: 0,
            scan: [scan_init("Csr Scan Buffer A"), scan_init("Csr Scan Buffer B")],
            coarse,
            num_edges,
            coarse_entries,
        }
    }

    /// The ptr buffer kernels read this tick.
    #[inline]
    pub fn current_ptr(&self) -> &Buffer {
        &self.ptr[self.current]
    }

    /// The ptr buffer the prefix-sum writes this tick.
    #[inline]
    pub fn next_ptr(&self) -> &Buffer {
        &self.ptr[1 - self.current]
    }

    #[inline]
    pub fn current_store(&self) -> &Buffer {
        &self.store[self.current]
    }

    #[inline]
    pub fn next_store(&self) -> &Buffer {
        &self.store[1 - self.current]
    }

    /// Swap the ptr/store pairs after relocation.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

/// Sort atlas and identity map.
pub struct SortBuffers {
    /// Chunked sort permutation, `ceil(n / 128) * 128` entries.
    pub atlas: Buffer,
    /// PID -> physical slot, `n` entries.
    pub identity: Buffer,
}

impl SortBuffers {
    pub fn new(device: &Device, n: u32) -> Self {
        let usage = BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC;
        let atlas_entries = chunk_count(n, 0, SPAN_SIZE) * SPAN_SIZE;
        let atlas = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sort Atlas Buffer"),
            size: (atlas_entries as usize * std::mem::size_of::<u32>()) as u64,
            usage,
            mapped_at_creation: false,
        });
        let identity = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Identity Map Buffer"),
            size: (n as usize * std::mem::size_of::<u32>()) as u64,
            usage,
            mapped_at_creation: false,
        });
        Self { atlas, identity }
    }
}

/// Create the per-tick params uniform buffer.
pub fn create_params_buffer(device: &Device, params: &TickParamsUniform) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Tick Params Buffer"),
        contents: bytemuck::bytes_of(params),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    })
}

/// Pre-allocate one step uniform per scan pass so the whole prefix sum
/// records into a single encoder without intermediate submits.
pub fn create_scan_step_buffers(device: &Device, passes: u32) -> Vec<Buffer> {
    (0..passes.max(1))
        .map(|pass_idx| {
            let step = 1u32 << pass_idx;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Scan Step Uniform Pass {pass_idx}")),
                contents: bytemuck::bytes_of(&step),
                usage: BufferUsages::UNIFORM,
            })
        })
        .collect()
}

/// Blocking readback of `count` Pod elements from a buffer.
///
/// Copies into a staging buffer, maps it, and waits for the GPU.
pub(crate) fn read_back<T: Pod>(
    device: &Device,
    queue: &Queue,
    buffer: &Buffer,
    count: usize,
) -> Vec<T> {
    if count == 0 {
        return Vec::new();
    }
    let size = (count * std::mem::size_of::<T>()) as u64;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
    rx.recv().unwrap().unwrap();

    let data = slice.get_mapped_range();
    let out: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    out
}
