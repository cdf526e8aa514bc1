//! The three fragment passes (spec §4.3-§4.5), one ping-pong step each.
//!
//! Every pass draws the same degenerate full-screen triangle (three
//! vertices, no vertex buffer, positions derived from `vertex_index` —
//! the `wgpu`-idiomatic full-screen quad, grounded on the teacher's
//! `MipmapGenerator` blit pipeline) over a target sized to the texture
//! family it writes. Record and Transition share `shaders/common.wgsl`
//! at the text level via [`crate::gpu::compose_shader`] so their
//! next-state computation cannot drift apart.

pub mod record;
pub mod reward;
pub mod transition;

/// Builds the (vertex, fragment) `RenderPipeline` shared shape every pass
/// in this crate uses: no vertex buffers, no depth/stencil, no blending,
/// triangle-list topology over the 3-vertex full-screen triangle.
pub(crate) fn full_screen_pipeline(
    device: &wgpu::Device,
    label: &'static str,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    targets: &[Option<wgpu::ColorTargetState>],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Unfilterable-float texture binding layout entry (every texture in this
/// crate is sampled with `textureLoad`, never `textureSample`, so none of
/// them need a filtering sampler — see `gpu` module docs).
pub(crate) fn float_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Unsigned-integer texture binding layout entry (used for the noise
/// texture, `Rgba8Uint`).
pub(crate) fn uint_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Uint,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Host-side mirror of `shaders/common.wgsl`'s `Params` struct, shared by
/// the Record and Transition passes (`decide()` reads the same uniform
/// layout in both).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct DecisionParams {
    pub width: u32,
    pub height: u32,
    pub probability_limit: f32,
    pub disable_self_inputs: u32,
    pub history_decay_rate: f32,
    pub _pad: [u32; 3],
}
