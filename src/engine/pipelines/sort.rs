//! Sort, reshuffle, and identity-mirror pipelines.
//!
//! The encoder sorts each 128-slot span by SFC key and writes the
//! permutation atlas; the reshuffle gathers all three particle arrays
//! through it; the identity mirror rebuilds the PID-to-slot inverse map in
//! a clear pass plus a scatter pass.

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    Buffer, ComputePipeline, ComputePipelineDescriptor, Device, PipelineCompilationOptions,
    PipelineLayoutDescriptor,
};

use super::{load_shader, storage_entry, uniform_entry};

/// Compute pipelines for the sort encoder, reshuffle, and identity mirror.
pub struct SortPipelines {
    /// Pipeline encoding the per-chunk bitonic permutation.
    pub encode_pipeline: ComputePipeline,
    /// Pipeline gathering particle state through the atlas.
    pub reshuffle_pipeline: ComputePipeline,
    /// Pipeline clearing the identity map to sentinel.
    pub identity_clear_pipeline: ComputePipeline,
    /// Pipeline scattering PID -> slot.
    pub identity_scatter_pipeline: ComputePipeline,
    /// Bind group layout for the encoder.
    pub encode_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the reshuffle.
    pub reshuffle_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the identity clear.
    pub identity_clear_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the identity scatter.
    pub identity_scatter_bind_group_layout: BindGroupLayout,
}

impl SortPipelines {
    /// Create the sort pipelines.
    pub fn new(device: &Device) -> Self {
        let encode_shader = load_shader(
            device,
            "Sort Encode Shader",
            include_str!("../../../shaders/sort_encode.wgsl"),
        );
        let reshuffle_shader = load_shader(
            device,
            "Reshuffle Shader",
            include_str!("../../../shaders/reshuffle.wgsl"),
        );
        let clear_shader = load_shader(
            device,
            "Identity Clear Shader",
            include_str!("../../../shaders/identity_clear.wgsl"),
        );
        let scatter_shader = load_shader(
            device,
            "Identity Scatter Shader",
            include_str!("../../../shaders/identity_scatter.wgsl"),
        );

        let encode_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Sort Encode Bind Group Layout"),
                entries: &[
                    // scratch positions (keys in .w)
                    storage_entry(0, true),
                    // atlas
                    storage_entry(1, false),
                    // params
                    uniform_entry(2),
                ],
            });

        let reshuffle_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Reshuffle Bind Group Layout"),
                entries: &[
                    // scratch pos/vel/idm
                    storage_entry(0, true),
                    storage_entry(1, true),
                    storage_entry(2, true),
                    // atlas
                    storage_entry(3, true),
                    // current pos/vel/idm
                    storage_entry(4, false),
                    storage_entry(5, false),
                    storage_entry(6, false),
                    // params
                    uniform_entry(7),
                ],
            });

        let identity_clear_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Identity Clear Bind Group Layout"),
                entries: &[storage_entry(0, false)],
            });

        let identity_scatter_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Identity Scatter Bind Group Layout"),
                entries: &[
                    // current id/mass
                    storage_entry(0, true),
                    // identity map
                    storage_entry(1, false),
                    // params
                    uniform_entry(2),
                ],
            });

        let make_pipeline = |label: &str, layout: &BindGroupLayout, module: &wgpu::ShaderModule| {
            let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some("main"),
                compilation_options: PipelineCompilationOptions::default(),
                cache: None,
            })
        };

        let encode_pipeline =
            make_pipeline("Sort Encode Pipeline", &encode_bind_group_layout, &encode_shader);
        let reshuffle_pipeline = make_pipeline(
            "Reshuffle Pipeline",
            &reshuffle_bind_group_layout,
            &reshuffle_shader,
        );
        let identity_clear_pipeline = make_pipeline(
            "Identity Clear Pipeline",
            &identity_clear_bind_group_layout,
            &clear_shader,
        );
        let identity_scatter_pipeline = make_pipeline(
            "Identity Scatter Pipeline",
            &identity_scatter_bind_group_layout,
            &scatter_shader,
        );

        Self {
            encode_pipeline,
            reshuffle_pipeline,
            identity_clear_pipeline,
            identity_scatter_pipeline,
            encode_bind_group_layout,
            reshuffle_bind_group_layout,
            identity_clear_bind_group_layout,
            identity_scatter_bind_group_layout,
        }
    }

    /// Create the sort-encode bind group.
    pub fn create_encode_bind_group(
        &self,
        device: &Device,
        scratch_pos: &Buffer,
        atlas: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Sort Encode Bind Group"),
            layout: &self.encode_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: scratch_pos.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: atlas.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the reshuffle bind group.
    #[allow(clippy::too_many_arguments)]
    pub fn create_reshuffle_bind_group(
        &self,
        device: &Device,
        scratch_pos: &Buffer,
        scratch_vel: &Buffer,
        scratch_idm: &Buffer,
        atlas: &Buffer,
        pos_out: &Buffer,
        vel_out: &Buffer,
        idm_out: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Reshuffle Bind Group"),
            layout: &self.reshuffle_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: scratch_pos.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: scratch_vel.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: scratch_idm.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: atlas.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 4,
                    resource: pos_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 5,
                    resource: vel_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 6,
                    resource: idm_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 7,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the identity-clear bind group.
    pub fn create_identity_clear_bind_group(
        &self,
        device: &Device,
        identity: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Identity Clear Bind Group"),
            layout: &self.identity_clear_bind_group_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: identity.as_entire_binding(),
            }],
        })
    }

    /// Create the identity-scatter bind group.
    pub fn create_identity_scatter_bind_group(
        &self,
        device: &Device,
        idm: &Buffer,
        identity: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Identity Scatter Bind Group"),
            layout: &self.identity_scatter_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: idm.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: identity.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}
