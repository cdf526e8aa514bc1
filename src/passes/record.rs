//! Record Pass (spec §4.4): `connection + state[prev] + probability[curr]
//! + history[prev] + noise[prev] -> history[curr]`, full `(2W) x (2H)`
//! viewport. Shares `decide()` with [`crate::passes::transition`] via
//! textual composition so the two passes agree bit-exactly.

use crate::error::{PbrrnError, Result};
use crate::gpu::GpuContext;
use crate::passes::{DecisionParams, float_texture_entry, full_screen_pipeline, uint_texture_entry, uniform_entry};
use crate::textures::TextureFamilies;

pub struct RecordPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl RecordPass {
    /// # Errors
    ///
    /// Returns [`PbrrnError::ShaderCompile`] if the composed record shader
    /// or its pipeline fails to compile/link on this adapter (spec §4.1/§7).
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        gpu.capture_validation(
            || {
                let source = crate::gpu::compose_shader(
                    include_str!("../shaders/common.wgsl"),
                    include_str!("../shaders/record.wgsl"),
                );
                let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("pbrrn-record-shader"),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                });

                let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("pbrrn-record-bind-group-layout"),
                    entries: &[
                        uniform_entry(0),
                        float_texture_entry(1),
                        float_texture_entry(2),
                        float_texture_entry(3),
                        uint_texture_entry(4),
                        float_texture_entry(5),
                    ],
                });

                let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("pbrrn-record-pipeline-layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

                let pipeline = full_screen_pipeline(
                    &gpu.device,
                    "pbrrn-record-pipeline",
                    &shader,
                    &layout,
                    &[Some(wgpu::ColorTargetState {
                        format: gpu.float_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                );

                let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("pbrrn-record-uniforms"),
                    size: std::mem::size_of::<DecisionParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                Self { pipeline, bind_group_layout, uniform_buffer }
            },
            |detail| PbrrnError::ShaderCompile { pass: "record", detail },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        textures: &TextureFamilies,
        width: u32,
        height: u32,
        prev: usize,
        curr: usize,
        probability_limit: f32,
        history_decay_rate: f32,
        disable_self_inputs: bool,
    ) {
        let params = DecisionParams {
            width,
            height,
            probability_limit,
            disable_self_inputs: u32::from(disable_self_inputs),
            history_decay_rate,
            _pad: [0; 3],
        };
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pbrrn-record-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.connection_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(textures.state.view(prev)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(textures.probability.view(curr)),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(textures.noise.view(prev)),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(textures.history.view(prev)),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pbrrn-record-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: textures.history.view(curr),
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod decay_tests {
    //! Spec §8 property 5, worked out in plain floating point: a
    //! `shaders/record.wgsl` `mix(old, active, r)` applied with `active=1`
    //! for `k` consecutive steps has the closed form `1-(1-r)^k`, mirroring
    //! the GPU's per-step blend without needing a device to iterate it.

    fn active_bucket_after(r: f32, k: u32) -> f32 {
        let mut v = 0.0f32;
        for _ in 0..k {
            v += (1.0 - v) * r;
        }
        v
    }

    #[test]
    fn matches_closed_form_decay_law() {
        let r = 0.1;
        for k in [1, 2, 5, 10, 50] {
            let simulated = active_bucket_after(r, k);
            let closed_form = 1.0 - (1.0 - r).powi(k as i32);
            assert!((simulated - closed_form).abs() < 1e-4, "k={k}: {simulated} vs {closed_form}");
        }
    }

    #[test]
    fn inactive_bucket_decays_toward_zero() {
        let r = 0.05;
        let mut v = 1.0f32;
        for _ in 0..20 {
            v *= 1.0 - r;
        }
        assert!(v < (1.0 - r).powi(20) + 1e-6);
        assert!(v > 0.0);
    }
}
