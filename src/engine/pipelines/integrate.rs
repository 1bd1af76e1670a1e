//! Physics integrator pipeline.
//!
//! Reads the current particle arrays and the CSR edge data, writes the
//! scratch arrays with refreshed SFC keys. One dispatch writes all three
//! outputs; separate rasterizer passes are a texture-era relic.

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    Buffer, ComputePipeline, ComputePipelineDescriptor, Device, PipelineCompilationOptions,
    PipelineLayoutDescriptor,
};

use super::{load_shader, storage_entry, uniform_entry};

/// Compute pipeline for the physics integrator.
pub struct IntegratePipeline {
    /// The integrator pipeline.
    pub pipeline: ComputePipeline,
    /// Its bind group layout.
    pub bind_group_layout: BindGroupLayout,
}

impl IntegratePipeline {
    /// Create the integrator pipeline.
    pub fn new(device: &Device) -> Self {
        let shader = load_shader(
            device,
            "Integrate Shader",
            include_str!("../../../shaders/integrate.wgsl"),
        );

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Integrate Bind Group Layout"),
            entries: &[
                // pos_in, vel_in, idm_in
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                // edge_ptr, edge_store
                storage_entry(3, true),
                storage_entry(4, true),
                // pos_out, vel_out, idm_out
                storage_entry(5, false),
                storage_entry(6, false),
                storage_entry(7, false),
                // params
                uniform_entry(8),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Integrate Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("Integrate Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: PipelineCompilationOptions::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Create the integrator bind group for one tick.
    #[allow(clippy::too_many_arguments)]
    pub fn create_bind_group(
        &self,
        device: &Device,
        pos_in: &Buffer,
        vel_in: &Buffer,
        idm_in: &Buffer,
        edge_ptr: &Buffer,
        edge_store: &Buffer,
        pos_out: &Buffer,
        vel_out: &Buffer,
        idm_out: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Integrate Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: pos_in.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: vel_in.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: idm_in.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: edge_ptr.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 4,
                    resource: edge_store.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 5,
                    resource: pos_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 6,
                    resource: vel_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 7,
                    resource: idm_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 8,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}
