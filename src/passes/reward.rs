//! Reward Pass (spec §4.3): `history[prev] + probability[prev] + reward
//! -> probability[curr]`, full `(2W) x H` viewport.

use crate::error::{PbrrnError, Result};
use crate::gpu::GpuContext;
use crate::passes::{float_texture_entry, full_screen_pipeline, uniform_entry};
use crate::textures::TextureFamilies;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RewardParams {
    reward: f32,
    probability_limit: f32,
    _pad0: f32,
    _pad1: f32,
}

pub struct RewardPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl RewardPass {
    /// # Errors
    ///
    /// Returns [`PbrrnError::ShaderCompile`] if the reward shader or its
    /// pipeline fails to compile/link on this adapter (spec §4.1/§7).
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        gpu.capture_validation(
            || {
                let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("pbrrn-reward-shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/reward.wgsl").into()),
                });

                let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("pbrrn-reward-bind-group-layout"),
                    entries: &[uniform_entry(0), float_texture_entry(1), float_texture_entry(2)],
                });

                let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("pbrrn-reward-pipeline-layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

                let pipeline = full_screen_pipeline(
                    &gpu.device,
                    "pbrrn-reward-pipeline",
                    &shader,
                    &layout,
                    &[Some(wgpu::ColorTargetState {
                        format: gpu.float_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                );

                let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("pbrrn-reward-uniforms"),
                    size: std::mem::size_of::<RewardParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                Self { pipeline, bind_group_layout, uniform_buffer }
            },
            |detail| PbrrnError::ShaderCompile { pass: "reward", detail },
        )
    }

    /// Records the Reward draw into `encoder`, reading `history[prev]` and
    /// `probability[prev]`, writing `probability[curr]`.
    pub fn run(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        textures: &TextureFamilies,
        prev: usize,
        curr: usize,
        reward: f32,
        probability_limit: f32,
    ) {
        let params = RewardParams { reward, probability_limit, _pad0: 0.0, _pad1: 0.0 };
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pbrrn-reward-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(textures.history.view(prev)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(textures.probability.view(prev)),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pbrrn-reward-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: textures.probability.view(curr),
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
mod algebra_tests {
    //! Plain-floating-point mirror of `shaders/reward.wgsl`'s `update_rule`,
    //! exercising the properties spec §4.3/§8 demand without standing up a
    //! GPU. Kept textually close to the WGSL so a diff between the two is
    //! easy to spot; the WGSL remains the single source of truth at runtime.

    fn update_rule(q: f32, pos_count: f32, neg_count: f32, reward: f32, limit: f32) -> f32 {
        let diff = pos_count - neg_count;
        let sum = pos_count + neg_count;
        let reinforced = q + reward.max(0.0) * diff;
        let punish_sum = reward.min(0.0) * sum;
        let punished =
            reinforced + (-reinforced.max(0.0)).max(punish_sum) - reinforced.min(0.0).max(punish_sum);
        punished.clamp(-limit, limit)
    }

    #[test]
    fn zero_reward_leaves_q_unchanged() {
        for q in [-5.0, -1.0, 0.0, 2.5, 5.9] {
            for (pos, neg) in [(0.0, 0.0), (0.3, 0.1), (1.0, 0.0), (0.0, 1.0)] {
                let out = update_rule(q, pos, neg, 0.0, 6.0);
                assert!((out - q).abs() < 1e-6, "q={q} pos={pos} neg={neg} -> {out}, expected unchanged");
            }
        }
    }

    #[test]
    fn zero_history_leaves_q_unchanged() {
        for q in [-5.0, -1.0, 0.0, 2.5, 5.9] {
            for reward in [-2.0, -0.2, 0.0, 0.4, 3.0] {
                let out = update_rule(q, 0.0, 0.0, reward, 6.0);
                assert!((out - q).abs() < 1e-6, "q={q} reward={reward} -> {out}, expected unchanged");
            }
        }
    }

    /// Spec §8 S6: with saturated history (`sum=1`) in one direction, a
    /// single `reward=-1` step reduces `|q|` by exactly `sum`, never past
    /// zero.
    #[test]
    fn saturated_negative_reward_reduces_q_by_exactly_sum() {
        let out = update_rule(3.0, 1.0, 0.0, -1.0, 6.0);
        assert!((out - 2.0).abs() < 1e-6, "expected |q| reduced by sum=1: got {out}");

        let out_neg = update_rule(-3.0, 0.0, 1.0, -1.0, 6.0);
        assert!((out_neg - (-2.0)).abs() < 1e-6, "expected |q| reduced by sum=1: got {out_neg}");
    }

    #[test]
    fn negative_reward_never_overshoots_zero() {
        let out = update_rule(0.5, 1.0, 0.0, -1.0, 6.0);
        assert!(out.abs() < 1e-6, "expected q to land exactly at 0, got {out}");

        let out_neg = update_rule(-0.5, 0.0, 1.0, -1.0, 6.0);
        assert!(out_neg.abs() < 1e-6, "expected q to land exactly at 0, got {out_neg}");
    }

    /// Large negative reward with saturated history pulls `q` to (but not
    /// past) 0.5 once mapped back to probability space.
    #[test]
    fn large_negative_reward_approaches_neutral_probability() {
        let limit = 6.0;
        let q = update_rule(5.0, 0.5, 0.5, -1000.0, limit);
        let p = q / (2.0 * limit) + 0.5;
        assert!((p - 0.5).abs() < 1e-6, "expected p to settle at neutral 0.5, got {p}");
    }

    #[test]
    fn result_always_within_limit() {
        for reward in [-1e6, -3.0, 0.0, 3.0, 1e6] {
            for (pos, neg) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.7, 0.7)] {
                let out = update_rule(2.0, pos, neg, reward, 6.0);
                assert!((-6.0..=6.0).contains(&out), "q={out} escaped the clamp for reward={reward}");
            }
        }
    }
}
