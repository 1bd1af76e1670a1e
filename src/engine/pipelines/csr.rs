//! CSR rebuild pipelines: prefix-sum, coarse map, and edge relocation.
//!
//! The prefix sum runs as init + log2(n) Hillis-Steele passes + finalize,
//! ping-ponging the two scan buffers. The coarse map then samples the new
//! offsets, and the relocation rewrites the whole edge store.

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    Buffer, ComputePipeline, ComputePipelineDescriptor, Device, PipelineCompilationOptions,
    PipelineLayoutDescriptor,
};

use super::{load_shader, storage_entry, uniform_entry};

/// Compute pipelines for the CSR rebuild stages.
pub struct CsrPipelines {
    /// Pipeline deriving per-slot edge counts through the atlas.
    pub edge_count_pipeline: ComputePipeline,
    /// Pipeline for one Hillis-Steele scan step.
    pub prefix_sum_pipeline: ComputePipeline,
    /// Pipeline converting the inclusive scan into new offsets.
    pub finalize_pipeline: ComputePipeline,
    /// Pipeline building the coarse edge-to-owner map.
    pub coarse_pipeline: ComputePipeline,
    /// Pipeline relocating the edge store.
    pub relocate_pipeline: ComputePipeline,
    /// Bind group layout for the count stage.
    pub edge_count_bind_group_layout: BindGroupLayout,
    /// Bind group layout for one scan step.
    pub prefix_sum_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the finalize stage.
    pub finalize_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the coarse map.
    pub coarse_bind_group_layout: BindGroupLayout,
    /// Bind group layout for the relocation.
    pub relocate_bind_group_layout: BindGroupLayout,
}

impl CsrPipelines {
    /// Create the CSR pipelines.
    pub fn new(device: &Device) -> Self {
        let edge_count_shader = load_shader(
            device,
            "Edge Count Shader",
            include_str!("../../../shaders/edge_count.wgsl"),
        );
        let prefix_sum_shader = load_shader(
            device,
            "Prefix Sum Shader",
            include_str!("../../../shaders/prefix_sum.wgsl"),
        );
        let finalize_shader = load_shader(
            device,
            "Ptr Finalize Shader",
            include_str!("../../../shaders/ptr_finalize.wgsl"),
        );
        let coarse_shader = load_shader(
            device,
            "Coarse Map Shader",
            include_str!("../../../shaders/coarse_map.wgsl"),
        );
        let relocate_shader = load_shader(
            device,
            "Relocate Shader",
            include_str!("../../../shaders/relocate.wgsl"),
        );

        let edge_count_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Edge Count Bind Group Layout"),
                entries: &[
                    // ptr_old, atlas
                    storage_entry(0, true),
                    storage_entry(1, true),
                    // scan output
                    storage_entry(2, false),
                    // params
                    uniform_entry(3),
                ],
            });

        let prefix_sum_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Prefix Sum Bind Group Layout"),
                entries: &[
                    // source, destination
                    storage_entry(0, true),
                    storage_entry(1, false),
                    // step size
                    uniform_entry(2),
                ],
            });

        let finalize_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Ptr Finalize Bind Group Layout"),
                entries: &[
                    // inclusive scan, ptr_old, atlas
                    storage_entry(0, true),
                    storage_entry(1, true),
                    storage_entry(2, true),
                    // ptr_new
                    storage_entry(3, false),
                    // params
                    uniform_entry(4),
                ],
            });

        let coarse_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Coarse Map Bind Group Layout"),
                entries: &[
                    // ptr_new
                    storage_entry(0, true),
                    // coarse map
                    storage_entry(1, false),
                    // params
                    uniform_entry(2),
                ],
            });

        let relocate_bind_group_layout =
            device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Relocate Bind Group Layout"),
                entries: &[
                    // store_old, ptr_old, ptr_new, coarse, atlas, idm_scratch, identity
                    storage_entry(0, true),
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, true),
                    storage_entry(4, true),
                    storage_entry(5, true),
                    storage_entry(6, true),
                    // store_new
                    storage_entry(7, false),
                    // params
                    uniform_entry(8),
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

        let edge_count_pipeline = make_pipeline(
            "Edge Count Pipeline",
            &edge_count_bind_group_layout,
            &edge_count_shader,
        );
        let prefix_sum_pipeline = make_pipeline(
            "Prefix Sum Pipeline",
            &prefix_sum_bind_group_layout,
            &prefix_sum_shader,
        );
        let finalize_pipeline = make_pipeline(
            "Ptr Finalize Pipeline",
            &finalize_bind_group_layout,
            &finalize_shader,
        );
        let coarse_pipeline =
            make_pipeline("Coarse Map Pipeline", &coarse_bind_group_layout, &coarse_shader);
        let relocate_pipeline = make_pipeline(
            "Relocate Pipeline",
            &relocate_bind_group_layout,
            &relocate_shader,
        );

        Self {
            edge_count_pipeline,
            prefix_sum_pipeline,
            finalize_pipeline,
            coarse_pipeline,
            relocate_pipeline,
            edge_count_bind_group_layout,
            prefix_sum_bind_group_layout,
            finalize_bind_group_layout,
            coarse_bind_group_layout,
            relocate_bind_group_layout,
        }
    }

    /// Create the edge-count bind group.
    pub fn create_edge_count_bind_group(
        &self,
        device: &Device,
        ptr_old: &Buffer,
        atlas: &Buffer,
        scan_out: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Edge Count Bind Group"),
            layout: &self.edge_count_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: ptr_old.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: atlas.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: scan_out.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Create a prefix-sum bind group for one scan step.
    pub fn create_prefix_sum_bind_group(
        &self,
        device: &Device,
        source: &Buffer,
        destination: &Buffer,
        step: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Prefix Sum Bind Group"),
            layout: &self.prefix_sum_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: source.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: destination.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: step.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the finalize bind group.
    pub fn create_finalize_bind_group(
        &self,
        device: &Device,
        inclusive: &Buffer,
        ptr_old: &Buffer,
        atlas: &Buffer,
        ptr_new: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Ptr Finalize Bind Group"),
            layout: &self.finalize_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: inclusive.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: ptr_old.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: atlas.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: ptr_new.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 4,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the coarse-map bind group.
    pub fn create_coarse_bind_group(
        &self,
        device: &Device,
        ptr_new: &Buffer,
        coarse: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Coarse Map Bind Group"),
            layout: &self.coarse_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: ptr_new.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: coarse.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the relocation bind group.
    #[allow(clippy::too_many_arguments)]
    pub fn create_relocate_bind_group(
        &self,
        device: &Device,
        store_old: &Buffer,
        ptr_old: &Buffer,
        ptr_new: &Buffer,
        coarse: &Buffer,
        atlas: &Buffer,
        idm_scratch: &Buffer,
        identity: &Buffer,
        store_new: &Buffer,
        params: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("Relocate Bind Group"),
            layout: &self.relocate_bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: store_old.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: ptr_old.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: ptr_new.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: coarse.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 4,
                    resource: atlas.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 5,
                    resource: idm_scratch.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 6,
                    resource: identity.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 7,
                    resource: store_new.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 8,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}
