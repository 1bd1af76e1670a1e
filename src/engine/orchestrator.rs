//! The GPU layout engine orchestrator.
//!
//! Owns every buffer and pipeline, and issues one tick as a single command
//! encoder: integrate, sort encode, reshuffle, identity mirror, CSR
//! prefix-sum, coarse map, edge relocation. Submission order is the only
//! synchronization the pipeline needs; each kernel writes a buffer that
//! only later kernels read.

use wgpu::Buffer;

use crate::config::LayoutConfig;
use crate::simulation::{
    validate_setup, CsrGraph, Particle, ParticleIdMass, ParticlePosKey, ParticleVel, EMPTY,
};
use crate::utils::ceil_log2;

use super::buffers::{
    create_params_buffer, create_scan_step_buffers, read_back, CsrBuffers, ParticleBuffers,
    SortBuffers, TickParamsUniform,
};
use super::context::GpuContext;
use super::pipelines::{CsrPipelines, IntegratePipeline, SortPipelines};
use super::EngineError;

/// Threads per workgroup for per-element kernels.
const WORKGROUP: u32 = 256;
/// Threads per workgroup for the small per-chunk kernels.
const WORKGROUP_SMALL: u32 = 64;

/// GPU implementation of the full layout engine.
pub struct GpuLayoutEngine {
    context: GpuContext,
    config: LayoutConfig,

    particles: ParticleBuffers,
    csr: CsrBuffers,
    sort: SortBuffers,
    params_buffer: Buffer,
    scan_steps: Vec<Buffer>,
    scan_passes: u32,

    integrate: IntegratePipeline,
    sort_pipelines: SortPipelines,
    csr_pipelines: CsrPipelines,

    pass: u64,
}

impl GpuLayoutEngine {
    /// Build an engine from seeded particles and a CSR graph.
    ///
    /// All buffers are allocated here with fixed dimensions; ticking never
    /// allocates.
    pub fn new(
        context: GpuContext,
        particles: &[Particle],
        graph: &CsrGraph,
        config: LayoutConfig,
    ) -> Result<Self, EngineError> {
        validate_setup(particles, graph, &config).map_err(EngineError::Config)?;

        let device = &context.device;
        let n = particles.len() as u32;
        let num_edges = graph.num_edges() as u32;
        let scan_passes = ceil_log2(n);

        let particle_buffers = ParticleBuffers::new(device, particles, &config);
        let csr_buffers = CsrBuffers::new(device, graph, &config);
        let sort_buffers = SortBuffers::new(device, n);

        let params = TickParamsUniform::for_pass(&config, n, num_edges, 0);
        let params_buffer = create_params_buffer(device, &params);
        let scan_steps = create_scan_step_buffers(device, scan_passes);

        let integrate = IntegratePipeline::new(device);
        let sort_pipelines = SortPipelines::new(device);
        let csr_pipelines = CsrPipelines::new(device);

        log::info!(
            "layout engine: {} particles, {} edges, {} scan passes, {} coarse entries",
            n,
            num_edges,
            scan_passes,
            csr_buffers.coarse_entries
        );

        Ok(Self {
            context,
            config,
            particles: particle_buffers,
            csr: csr_buffers,
            sort: sort_buffers,
            params_buffer,
            scan_steps,
            scan_passes,
            integrate,
            sort_pipelines,
            csr_pipelines,
            pass: 0,
        })
    }

    /// Run one tick of the pipeline.
    pub fn tick(&mut self) {
        let device = &self.context.device;
        let n = self.particles.num_particles;
        let num_edges = self.csr.num_edges;

        let params = TickParamsUniform::for_pass(&self.config, n, num_edges, self.pass);
        self.context
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let particle_workgroups = n.div_ceil(WORKGROUP);
        let mut encoder = self.context.create_encoder("Layout Tick Encoder");

        // 1. Integrate: current -> scratch, with fresh SFC keys.
        let integrate_bind_group = self.integrate.create_bind_group(
            device,
            self.particles.current_pos(),
            self.particles.current_vel(),
            self.particles.current_id_mass(),
            self.csr.current_ptr(),
            self.csr.current_store(),
            self.particles.scratch_pos(),
            self.particles.scratch_vel(),
            self.particles.scratch_id_mass(),
            &self.params_buffer,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Integrate Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.integrate.pipeline);
            pass.set_bind_group(0, &integrate_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }

        // 2. Sort encode: one invocation per chunk.
        if params.chunk_count > 0 {
            let encode_bind_group = self.sort_pipelines.create_encode_bind_group(
                device,
                self.particles.scratch_pos(),
                &self.sort.atlas,
                &self.params_buffer,
            );
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Sort Encode Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sort_pipelines.encode_pipeline);
            pass.set_bind_group(0, &encode_bind_group, &[]);
            pass.dispatch_workgroups(params.chunk_count.div_ceil(WORKGROUP_SMALL), 1, 1);
        }

        // 3. Reshuffle: gather scratch -> current through the atlas.
        let reshuffle_bind_group = self.sort_pipelines.create_reshuffle_bind_group(
            device,
            self.particles.scratch_pos(),
            self.particles.scratch_vel(),
            self.particles.scratch_id_mass(),
            &self.sort.atlas,
            self.particles.current_pos(),
            self.particles.current_vel(),
            self.particles.current_id_mass(),
            &self.params_buffer,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Reshuffle Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sort_pipelines.reshuffle_pipeline);
            pass.set_bind_group(0, &reshuffle_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }

        // 4. Identity mirror: clear to sentinel, then scatter PID -> slot.
        let identity_clear_bind_group = self
            .sort_pipelines
            .create_identity_clear_bind_group(device, &self.sort.identity);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Identity Clear Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sort_pipelines.identity_clear_pipeline);
            pass.set_bind_group(0, &identity_clear_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }
        let identity_scatter_bind_group = self.sort_pipelines.create_identity_scatter_bind_group(
            device,
            self.particles.current_id_mass(),
            &self.sort.identity,
            &self.params_buffer,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Identity Scatter Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sort_pipelines.identity_scatter_pipeline);
            pass.set_bind_group(0, &identity_scatter_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }

        // 5. CSR prefix-sum: counts into scan A, Hillis-Steele ping-pong,
        // finalize into the other ptr buffer.
        let edge_count_bind_group = self.csr_pipelines.create_edge_count_bind_group(
            device,
            self.csr.current_ptr(),
            &self.sort.atlas,
            &self.csr.scan[0],
            &self.params_buffer,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Edge Count Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.csr_pipelines.edge_count_pipeline);
            pass.set_bind_group(0, &edge_count_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }
        for p in 0..self.scan_passes {
            let src = &self.csr.scan[(p % 2) as usize];
            let dst = &self.csr.scan[((p + 1) % 2) as usize];
            let scan_bind_group = self.csr_pipelines.create_prefix_sum_bind_group(
                device,
                src,
                dst,
                &self.scan_steps[p as usize],
            );
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Prefix Sum Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.csr_pipelines.prefix_sum_pipeline);
            pass.set_bind_group(0, &scan_bind_group, &[]);
            pass.dispatch_workgroups(particle_workgroups, 1, 1);
        }
        let inclusive = &self.csr.scan[(self.scan_passes % 2) as usize];
        let finalize_bind_group = self.csr_pipelines.create_finalize_bind_group(
            device,
            inclusive,
            self.csr.current_ptr(),
            &self.sort.atlas,
            self.csr.next_ptr(),
            &self.params_buffer,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ptr Finalize Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.csr_pipelines.finalize_pipeline);
            pass.set_bind_group(0, &finalize_bind_group, &[]);
            pass.dispatch_workgroups((n + 1).div_ceil(WORKGROUP), 1, 1);
        }

        // 6 + 7. Coarse map and relocation; nothing to do without edges.
        if num_edges > 0 {
            let coarse_bind_group = self.csr_pipelines.create_coarse_bind_group(
                device,
                self.csr.next_ptr(),
                &self.csr.coarse,
                &self.params_buffer,
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Coarse Map Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.csr_pipelines.coarse_pipeline);
                pass.set_bind_group(0, &coarse_bind_group, &[]);
                pass.dispatch_workgroups(self.csr.coarse_entries.div_ceil(WORKGROUP_SMALL), 1, 1);
            }

            let relocate_bind_group = self.csr_pipelines.create_relocate_bind_group(
                device,
                self.csr.current_store(),
                self.csr.current_ptr(),
                self.csr.next_ptr(),
                &self.csr.coarse,
                &self.sort.atlas,
                self.particles.scratch_id_mass(),
                &self.sort.identity,
                self.csr.next_store(),
                &self.params_buffer,
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Relocate Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.csr_pipelines.relocate_pipeline);
                pass.set_bind_group(0, &relocate_bind_group, &[]);
                pass.dispatch_workgroups(num_edges.div_ceil(WORKGROUP), 1, 1);
            }
        }

        self.context.submit(encoder.finish());

        self.csr.swap();
        self.pass += 1;
    }

    /// Number of completed passes.
    #[inline]
    pub fn pass(&self) -> u64 {
        self.pass
    }

    #[inline]
    pub fn num_particles(&self) -> u32 {
        self.particles.num_particles
    }

    #[inline]
    pub fn num_edges(&self) -> u32 {
        self.csr.num_edges
    }

    #[inline]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[inline]
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// GPU handles to the particle arrays, for an external renderer to
    /// bind directly.
    #[inline]
    pub fn particle_buffers(&self) -> &ParticleBuffers {
        &self.particles
    }

    /// GPU handles to the CSR buffers.
    #[inline]
    pub fn csr_buffers(&self) -> &CsrBuffers {
        &self.csr
    }

    /// Read back the current positions and SFC keys.
    ///
    /// Blocks until the GPU is done; intended for diagnostics and tests.
    pub fn read_positions(&self) -> Vec<ParticlePosKey> {
        read_back(
            &self.context.device,
            &self.context.queue,
            self.particles.current_pos(),
            self.particles.num_particles as usize,
        )
    }

    /// Read back the current velocities.
    pub fn read_velocities(&self) -> Vec<ParticleVel> {
        read_back(
            &self.context.device,
            &self.context.queue,
            self.particles.current_vel(),
            self.particles.num_particles as usize,
        )
    }

    /// Read back the current id/mass array.
    pub fn read_id_mass(&self) -> Vec<ParticleIdMass> {
        read_back(
            &self.context.device,
            &self.context.queue,
            self.particles.current_id_mass(),
            self.particles.num_particles as usize,
        )
    }

    /// Read back the current CSR offsets (`n + 1` entries).
    pub fn read_ptr(&self) -> Vec<u32> {
        read_back(
            &self.context.device,
            &self.context.queue,
            self.csr.current_ptr(),
            self.particles.num_particles as usize + 1,
        )
    }

    /// Read back the current edge store.
    pub fn read_store(&self) -> Vec<u32> {
        read_back(
            &self.context.device,
            &self.context.queue,
            self.csr.current_store(),
            self.csr.num_edges as usize,
        )
    }

    /// Read back the identity map.
    pub fn read_identity(&self) -> Vec<u32> {
        read_back(
            &self.context.device,
            &self.context.queue,
            &self.sort.identity,
            self.particles.num_particles as usize,
        )
    }

    /// Reassemble particle structs from GPU state, in slot order.
    pub fn read_particles(&self) -> Vec<Particle> {
        let pos = self.read_positions();
        let vel = self.read_velocities();
        let idm = self.read_id_mass();
        (0..pos.len())
            .map(|i| Particle {
                x: pos[i].x,
                y: pos[i].y,
                z: pos[i].z,
                vx: vel[i].vx,
                vy: vel[i].vy,
                vz: vel[i].vz,
                mass: idm[i].mass,
                pid: idm[i].pid,
                tint: idm[i].tint,
            })
            .collect()
    }

    /// The logical edge multiset as `(owner PID, target PID)` pairs,
    /// skipping sentinel holes.
    pub fn read_logical_edges(&self) -> Vec<(u32, u32)> {
        let idm = self.read_id_mass();
        let ptr = self.read_ptr();
        let store = self.read_store();
        let mut edges = Vec::with_capacity(store.len());
        for p in 0..idm.len() {
            for e in ptr[p]..ptr[p + 1] {
                let t = store[e as usize];
                if t != EMPTY {
                    edges.push((idm[p].pid, idm[t as usize].pid));
                }
            }
        }
        edges
    }
}
