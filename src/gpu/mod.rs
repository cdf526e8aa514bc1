//! GPU Backend Abstraction
//!
//! A minimal typed wrapper over `wgpu`'s device/texture/pipeline pipeline,
//! standing in for the original engine's WebGL context. Two colour
//! attachments per framebuffer (the Transition pass writes state + noise
//! simultaneously), nearest-neighbour texel addressing (via `textureLoad`,
//! never a filtering sampler, in every shader in this crate) and disabled
//! blending/depth are the fixed contract every pass in this crate relies on.

use crate::error::{PbrrnError, Result};

/// Owns the `wgpu` device and queue for one PBRRN instance.
///
/// Mirrors the teacher's `WgpuContext`, minus the surface/swapchain
/// machinery: this engine's core simulation is headless (it renders into
/// its own textures, never to a window), so there is no surface to
/// configure or present.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format chosen for the probability and history textures: `Rgba32Float`
    /// when the adapter can filter/render it, `Rgba8Unorm` otherwise. Both
    /// store the `p` probability directly (already normalised to `[0,1]`),
    /// so the 8-bit fallback only costs precision, never range.
    pub float_format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Requests an adapter and device with no particular surface in mind.
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::AdapterRequestFailed`] if no adapter is
    /// available, or [`PbrrnError::DeviceCreateFailed`] if the device
    /// request is rejected.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| PbrrnError::AdapterRequestFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pbrrn-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let float_format = if Self::supports_filterable_float(&adapter) {
            log::debug!("pbrrn: using Rgba32Float for probability/history textures");
            wgpu::TextureFormat::Rgba32Float
        } else if Self::supports_render_sample(&adapter, wgpu::TextureFormat::Rgba8Unorm) {
            log::debug!("pbrrn: adapter cannot filter Rgba32Float, falling back to Rgba8Unorm");
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            // Neither the preferred float format nor its 8-bit fallback can
            // be sampled/rendered on this adapter — there is no format left
            // to back the probability/history textures with (spec §4.1/§7).
            return Err(PbrrnError::FloatTextureUnsupported);
        };

        Ok(Self { device, queue, float_format })
    }

    fn supports_render_sample(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
        let features = adapter.get_texture_format_features(format);
        features.allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
    }

    fn supports_filterable_float(adapter: &wgpu::Adapter) -> bool {
        let features = adapter.get_texture_format_features(wgpu::TextureFormat::Rgba32Float);
        features.flags.contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
            && Self::supports_render_sample(adapter, wgpu::TextureFormat::Rgba32Float)
    }

    /// Runs `build` inside a `wgpu` validation error scope, converting any
    /// validation error raised while it runs into `on_error(detail)` instead
    /// of leaving it to surface later as an unrelated runtime panic. Used by
    /// [`crate::engine::Pbrrn::new`] and the pass/visualiser constructors so
    /// construction-time shader/pipeline/texture failures become the fatal
    /// [`PbrrnError`] variants spec §7 documents, the same way `step()`
    /// already turns a runtime validation error into [`PbrrnError::DeviceLost`].
    pub fn capture_validation<T>(
        &self,
        build: impl FnOnce() -> T,
        on_error: impl FnOnce(String) -> PbrrnError,
    ) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(on_error(err.to_string())),
            None => Ok(value),
        }
    }

    /// Creates a 2-D texture and its default view in one call.
    pub fn create_texture(
        &self,
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Uploads tightly-packed RGBA8 (4 bytes/texel) bytes into a texture's
    /// full extent.
    pub fn write_texture_rgba8(&self, texture: &wgpu::Texture, width: u32, height: u32, data: &[u8]) {
        self.write_texture_full(texture, width, height, 4, data);
    }

    /// Uploads tightly-packed bytes into a texture's full extent, for an
    /// explicit `bytes_per_texel` (4 for `Rgba8Unorm`/`Rgba8Uint`, 16 for
    /// `Rgba32Float` — the probability/history textures pick one of these
    /// two depending on adapter float-texture support, spec §3).
    pub fn write_texture_full(&self, texture: &wgpu::Texture, width: u32, height: u32, bytes_per_texel: u32, data: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_texel),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    /// Uploads a single-channel byte region into a texture (used by
    /// `setState`/`setStates`, which only read the buffer's R channel).
    pub fn write_texture_region_r8(
        &self,
        texture: &wgpu::Texture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        r_bytes: &[u8],
    ) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            r_bytes,
            wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(width), rows_per_image: Some(height) },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    /// Reads back a rectangular region of a single-channel 8-bit texture,
    /// blocking until the GPU readback completes. Used by `getState(s)`.
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::DeviceLost`] if the device poll or the buffer
    /// map fails (context loss, device removal) rather than panicking.
    pub fn blocking_read_r8(&self, texture: &wgpu::Texture, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        self.blocking_read(texture, x, y, width, height, 1)
    }

    /// Reads back a rectangular region of an RGBA8 texture (used by
    /// visualisers/debug readback). Bytes per pixel fixed at 4.
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::DeviceLost`] on a poll/map failure.
    pub fn blocking_read_rgba8(
        &self,
        texture: &wgpu::Texture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        self.blocking_read(texture, x, y, width, height, 4)
    }

    /// Reads back a rectangular region of a 4-channel probability/history
    /// texture and decodes every channel to `f32 in [0,1]`, regardless of
    /// whether the adapter backs it with `Rgba32Float` or the `Rgba8Unorm`
    /// fallback (spec §3's float/8-bit backend choice). Test-only: the
    /// public API never exposes these textures directly.
    #[cfg(test)]
    pub(crate) fn blocking_read_channels_f32(
        &self,
        texture: &wgpu::Texture,
        format: wgpu::TextureFormat,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<f32>> {
        match format {
            wgpu::TextureFormat::Rgba32Float => {
                let raw = self.blocking_read(texture, x, y, width, height, 16)?;
                Ok(raw.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
            }
            _ => {
                let raw = self.blocking_read(texture, x, y, width, height, 4)?;
                Ok(raw.iter().map(|&b| f32::from(b) / 255.0).collect())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`PbrrnError::DeviceLost`] if the device poll fails or the
    /// buffer-map callback reports an error/never completes — surfaced
    /// instead of panicking, so `getState(s)`/the visualisers stay within
    /// the crate's recoverable-error contract (spec §7).
    fn blocking_read(
        &self,
        texture: &wgpu::Texture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    ) -> Result<Vec<u8>> {
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pbrrn-readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("pbrrn-readback-encoder") });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PbrrnError::DeviceLost(format!("device poll failed during readback: {e}")))?;
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(PbrrnError::DeviceLost(format!("buffer map failed: {e}"))),
            Err(_) => {
                return Err(PbrrnError::DeviceLost("readback channel closed before buffer map completed".into()));
            }
        }

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            let end = start + unpadded_bytes_per_row as usize;
            out.extend_from_slice(&data[start..end]);
        }
        drop(data);
        buffer.unmap();
        Ok(out)
    }
}

/// Concatenates the shared decision snippet ahead of a pass-specific WGSL
/// body, so Record and Transition are built from the literal same source
/// text for their next-state computation (spec.md's bit-exact agreement
/// requirement, §4.5/§9: "share the snippet at source level").
#[must_use]
pub fn compose_shader(common: &str, specific: &str) -> String {
    format!("{common}\n{specific}")
}
