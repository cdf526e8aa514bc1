//! Transition Pass (spec §4.5): `connection + state[prev] +
//! probability[curr] + noise[prev] -> state[curr], noise[curr]`, full
//! `W x H` viewport, two colour attachments written simultaneously.
//! Shares `decide()` with [`crate::passes::record`] via textual
//! composition: the `next` bit committed here must equal the one Record
//! wrote into the history texture this same step.

use crate::error::{PbrrnError, Result};
use crate::gpu::GpuContext;
use crate::passes::{DecisionParams, float_texture_entry, full_screen_pipeline, uint_texture_entry, uniform_entry};
use crate::textures::TextureFamilies;

pub struct TransitionPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl TransitionPass {
    /// # Errors
    ///
    /// Returns [`PbrrnError::ShaderCompile`] if the composed transition
    /// shader or its two-attachment pipeline fails to compile/link on this
    /// adapter (spec §4.1/§7).
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        gpu.capture_validation(
            || {
                let source = crate::gpu::compose_shader(
                    include_str!("../shaders/common.wgsl"),
                    include_str!("../shaders/transition.wgsl"),
                );
                let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("pbrrn-transition-shader"),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                });

                let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("pbrrn-transition-bind-group-layout"),
                    entries: &[
                        uniform_entry(0),
                        float_texture_entry(1),
                        float_texture_entry(2),
                        float_texture_entry(3),
                        uint_texture_entry(4),
                    ],
                });

                let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("pbrrn-transition-pipeline-layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

                // Two simultaneous colour attachments: state (R8Unorm) + noise
                // (Rgba8Uint) — the two-attachment framebuffer C1 requires.
                let pipeline = full_screen_pipeline(
                    &gpu.device,
                    "pbrrn-transition-pipeline",
                    &shader,
                    &layout,
                    &[
                        Some(wgpu::ColorTargetState {
                            format: wgpu::TextureFormat::R8Unorm,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        }),
                        Some(wgpu::ColorTargetState {
                            format: wgpu::TextureFormat::Rgba8Uint,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        }),
                    ],
                );

                let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("pbrrn-transition-uniforms"),
                    size: std::mem::size_of::<DecisionParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                Self { pipeline, bind_group_layout, uniform_buffer }
            },
            |detail| PbrrnError::ShaderCompile { pass: "transition", detail },
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
        disable_self_inputs: bool,
    ) {
        let params = DecisionParams {
            width,
            height,
            probability_limit,
            disable_self_inputs: u32::from(disable_self_inputs),
            history_decay_rate: 0.0,
            _pad: [0; 3],
        };
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pbrrn-transition-bind-group"),
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
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pbrrn-transition-pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: textures.state.view(curr),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: textures.noise.view(curr),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
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
mod prng_tests {
    //! Spec §8 property 4: the per-cell LCG is a permutation of `u32`.
    //! Mirrors `shaders/transition.wgsl`'s `advanced = s*1664525+1013904223`
    //! in plain Rust (`wrapping_*` standing in for WGSL's defined-wraparound
    //! `u32` arithmetic).

    fn advance(s: u32) -> u32 {
        s.wrapping_mul(1664525).wrapping_add(1013904223)
    }

    /// A map `s -> s*a+c (mod 2^32)` is a bijection on `Z/2^32` iff `a` is
    /// odd (i.e. a unit in the ring) — the actual reason this LCG is a
    /// permutation, not an empirical accident.
    #[test]
    fn multiplier_is_odd() {
        assert_eq!(1664525u32 % 2, 1);
    }

    #[test]
    fn sampled_seeds_advance_to_distinct_states() {
        use std::collections::HashSet;
        let mut rng_state = 0x1234_5678u32;
        let mut seeds = Vec::with_capacity(20_000);
        for _ in 0..20_000 {
            rng_state = advance(rng_state);
            seeds.push(rng_state);
        }
        let distinct: HashSet<u32> = seeds.iter().copied().collect();
        assert_eq!(distinct.len(), seeds.len(), "LCG produced a collision within one trajectory before 2^32 steps");
    }

    #[test]
    fn advancing_is_deterministic() {
        let seed = 0xDEAD_BEEFu32;
        assert_eq!(advance(seed), advance(seed));
    }

    #[test]
    fn inverse_multiplier_recovers_previous_state() {
        // Modular inverse of 1664525 mod 2^32, computed once via the
        // extended Euclidean algorithm; multiplying by it undoes the `a*s`
        // step, which is the textbook proof technique for LCG invertibility.
        let a: u64 = 1664525;
        let modulus: u64 = 1u64 << 32;
        let inverse = mod_inverse(a, modulus) as u32;

        let seed = 0x0BAD_C0DEu32;
        let advanced = advance(seed);
        let undone_add = advanced.wrapping_sub(1013904223);
        let recovered = undone_add.wrapping_mul(inverse);
        assert_eq!(recovered, seed);
    }

    fn mod_inverse(a: u64, modulus: u64) -> u64 {
        let (mut old_r, mut r) = (a as i128, modulus as i128);
        let (mut old_s, mut s) = (1i128, 0i128);
        while r != 0 {
            let quotient = old_r / r;
            (old_r, r) = (r, old_r - quotient * r);
            (old_s, s) = (s, old_s - quotient * s);
        }
        old_s.rem_euclid(modulus as i128) as u64
    }
}
