//! Double-buffered texture families
//!
//! Treats each texture family as a pair `(prev, curr)` with an index flipped
//! atomically at step end, replacing the implicit in-place mutation a CPU
//! simulation would otherwise reach for. Generalises the teacher's
//! transient-texture-pool ping-pong idea down to the fixed pair per family
//! PBRRN actually needs (these textures are long-lived for the model's
//! whole lifetime, not per-frame transients).

use crate::gpu::GpuContext;

/// A texture family with two physical buffers, addressed by a shared
/// `0`/`1` index that the [`crate::engine::Pbrrn`] orchestrator flips after
/// every successful `step`.
pub struct DoubleBuffered {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
}

impl DoubleBuffered {
    pub fn new(
        gpu: &GpuContext,
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let (tex_a, view_a) = gpu.create_texture(label, width, height, format, usage);
        let (tex_b, view_b) = gpu.create_texture(label, width, height, format, usage);
        Self { textures: [tex_a, tex_b], views: [view_a, view_b] }
    }

    #[inline]
    #[must_use]
    pub fn texture(&self, index: usize) -> &wgpu::Texture {
        &self.textures[index]
    }

    #[inline]
    #[must_use]
    pub fn view(&self, index: usize) -> &wgpu::TextureView {
        &self.views[index]
    }
}

/// All four texture families for one PBRRN instance, plus the static
/// connection map. Dimensions follow spec.md §3: state/connection/noise are
/// `W x H`; probability is `(2W) x H`; history is `(2W) x (2H)`.
pub struct TextureFamilies {
    pub connection: wgpu::Texture,
    pub connection_view: wgpu::TextureView,
    pub state: DoubleBuffered,
    pub probability: DoubleBuffered,
    pub history: DoubleBuffered,
    pub noise: DoubleBuffered,
}

impl TextureFamilies {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        const SAMPLED_ATTACHMENT: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
            .union(wgpu::TextureUsages::RENDER_ATTACHMENT)
            .union(wgpu::TextureUsages::COPY_SRC)
            .union(wgpu::TextureUsages::COPY_DST);

        let (connection, connection_view) = gpu.create_texture(
            "pbrrn-connection",
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );

        let state =
            DoubleBuffered::new(gpu, "pbrrn-state", width, height, wgpu::TextureFormat::R8Unorm, SAMPLED_ATTACHMENT);
        let probability =
            DoubleBuffered::new(gpu, "pbrrn-probability", 2 * width, height, gpu.float_format, SAMPLED_ATTACHMENT);
        let history = DoubleBuffered::new(
            gpu,
            "pbrrn-history",
            2 * width,
            2 * height,
            gpu.float_format,
            SAMPLED_ATTACHMENT,
        );
        let noise = DoubleBuffered::new(
            gpu,
            "pbrrn-noise",
            width,
            height,
            wgpu::TextureFormat::Rgba8Uint,
            SAMPLED_ATTACHMENT,
        );

        Self { connection, connection_view, state, probability, history, noise }
    }
}

/// Encodes a probability value `p in [0,1]` into bytes for the texture
/// format actually in use (`f32` little-endian x4, or a single `u8` mapped
/// through `Rgba8Unorm`'s `byte/255` convention — both round-trip exactly
/// for `p = 0.5`, the documented neutral initial value).
#[must_use]
pub fn probability_initial_bytes(format: wgpu::TextureFormat, cell_count: usize) -> Vec<u8> {
    match format {
        wgpu::TextureFormat::Rgba32Float => {
            let mut bytes = Vec::with_capacity(cell_count * 2 * 16);
            for _ in 0..(cell_count * 2) {
                for _ in 0..4 {
                    bytes.extend_from_slice(&0.5f32.to_le_bytes());
                }
            }
            bytes
        }
        _ => vec![128u8; cell_count * 2 * 4],
    }
}
