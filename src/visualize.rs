//! Visualisers (spec §4.7)
//!
//! Both visualisers are passive: they only ever read from a [`Pbrrn`]'s
//! public `getState(s)` API or its backing textures, never mutate them,
//! so `getState` readback stays valid for the model's owner across any
//! number of `update()` calls — the spec's "restore the model's primary
//! output afterward" requirement is satisfied by construction rather
//! than by an explicit restore step.

use crate::engine::Pbrrn;
use crate::error::{PbrrnError, Result};
use crate::gpu::GpuContext;
use crate::passes::{float_texture_entry, full_screen_pipeline, uniform_entry};

const BACKGROUND: [u8; 4] = [24, 24, 24, 255];
const ACTIVE: [u8; 4] = [235, 235, 235, 255];

/// Scrolling 1-D history strip over a fixed set of model locations
/// (spec §4.7). Each location gets its own row of `length` samples; rows
/// are interleaved with a background separator row, giving an output
/// image `length` wide and `2 * locations.len() - 1` tall.
pub struct StateVisualiser {
    locations: Vec<(u32, u32)>,
    length: u32,
    /// One ring buffer per location, written at `position` and advanced
    /// in lock-step across locations.
    rings: Vec<Vec<bool>>,
    position: u32,
}

impl StateVisualiser {
    /// # Errors
    ///
    /// Returns [`PbrrnError::InvalidOption`] if `locations` is empty or
    /// `length` is zero.
    pub fn new(locations: Vec<(u32, u32)>, length: u32) -> Result<Self> {
        if locations.is_empty() {
            return Err(PbrrnError::InvalidOption("StateVisualiser needs at least one location".into()));
        }
        if length == 0 {
            return Err(PbrrnError::InvalidOption("StateVisualiser length must be >= 1".into()));
        }
        let rings = vec![vec![false; length as usize]; locations.len()];
        Ok(Self { locations, length, rings, position: 0 })
    }

    /// Samples every configured location's current boolean state and
    /// writes one column into the ring at `position`, then advances.
    ///
    /// # Errors
    ///
    /// Propagates [`PbrrnError::OutOfBounds`] if a configured location
    /// falls outside `model`'s grid.
    pub fn update(&mut self, model: &Pbrrn) -> Result<()> {
        for (row, &(x, y)) in self.locations.iter().enumerate() {
            self.rings[row][self.position as usize] = model.get_state(x, y)?;
        }
        self.position = (self.position + 1) % self.length;
        Ok(())
    }

    /// Mean of the ring's samples per location. Exact `1.0`/`0.0` once a
    /// location has been pinned for at least `length` consecutive
    /// updates (spec §8 S3).
    #[must_use]
    pub fn average_states(&self) -> Vec<f32> {
        self.rings
            .iter()
            .map(|ring| ring.iter().filter(|&&v| v).count() as f32 / self.length as f32)
            .collect()
    }

    /// Renders the scrolling strip as row-major RGBA8 bytes, `length`
    /// wide by `2 * locations.len() - 1` tall. The ring is copied in two
    /// slices — `[position..]` then `[..position]` — so the rightmost
    /// column is always the most recently sampled one.
    #[must_use]
    pub fn image(&self) -> (u32, u32, Vec<u8>) {
        let width = self.length;
        let height = 2 * self.locations.len() as u32 - 1;
        let mut out = vec![0u8; (width * height * 4) as usize];

        for (row_idx, ring) in self.rings.iter().enumerate() {
            let image_row = (row_idx as u32) * 2;
            let base = (image_row * width * 4) as usize;
            let pos = self.position as usize;
            let ordered = ring[pos..].iter().chain(ring[..pos].iter());
            for (col, &value) in ordered.enumerate() {
                let px = base + col * 4;
                out[px..px + 4].copy_from_slice(if value { &ACTIVE } else { &BACKGROUND });
            }
        }
        // Separator rows (odd image rows) stay at BACKGROUND from the
        // zero-initialised buffer's alpha; fill RGB too for a flat colour.
        for row in (1..height).step_by(2) {
            let base = (row * width * 4) as usize;
            for col in 0..width as usize {
                let px = base + col * 4;
                out[px..px + 4].copy_from_slice(&BACKGROUND);
            }
        }
        (width, height, out)
    }
}

/// Which backing texture family [`TextureVisualiser::render`] samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Connection,
    Probability,
    History,
}

/// Debug view blitting a model's connection/probability/history texture
/// into a caller-owned `Rgba8Unorm` target (spec §4.7). The packed
/// sub-texel layout (§3) already is the "2- or 4-quadrant unfolding" the
/// spec describes — probability's `(2W)xH` and history's `(2W)x(2H)`
/// extents are rendered as-is, nearest-remapped to the target's size.
pub struct TextureVisualiser {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct VisualizeParams {
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
}

impl TextureVisualiser {
    #[must_use]
    pub fn new(gpu: &GpuContext) -> Self {
        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pbrrn-visualize-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/visualize.wgsl").into()),
        });

        let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pbrrn-visualize-bind-group-layout"),
            entries: &[uniform_entry(0), float_texture_entry(1)],
        });

        let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pbrrn-visualize-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = full_screen_pipeline(
            &gpu.device,
            "pbrrn-visualize-pipeline",
            &shader,
            &layout,
            &[Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::Rgba8Unorm,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        );

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pbrrn-visualize-uniforms"),
            size: std::mem::size_of::<VisualizeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { pipeline, bind_group_layout, uniform_buffer }
    }

    /// Blits `model`'s `kind` texture into `target`, submitting its own
    /// command buffer (never shares `model`'s step encoder). `target`
    /// must be an `Rgba8Unorm` render-attachment-capable texture view.
    pub fn render(
        &self,
        gpu: &GpuContext,
        model: &Pbrrn,
        kind: TextureKind,
        target: &wgpu::TextureView,
        target_width: u32,
        target_height: u32,
    ) {
        let options = model.options();
        let idx = model.texture_index();
        let (source_view, source_width, source_height) = match kind {
            TextureKind::Connection => (&model.textures().connection_view, options.width, options.height),
            TextureKind::Probability => {
                (model.textures().probability.view(idx), 2 * options.width, options.height)
            }
            TextureKind::History => (model.textures().history.view(idx), 2 * options.width, 2 * options.height),
        };

        let params =
            VisualizeParams { source_width, source_height, target_width, target_height };
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pbrrn-visualize-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(source_view) },
            ],
        });

        let mut encoder =
            gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("pbrrn-visualize") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pbrrn-visualize-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
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
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_fixture(length: u32) -> StateVisualiser {
        StateVisualiser::new(vec![(0, 0)], length).unwrap()
    }

    #[test]
    fn rejects_empty_locations() {
        assert!(StateVisualiser::new(vec![], 4).is_err());
    }

    #[test]
    fn rejects_zero_length() {
        assert!(StateVisualiser::new(vec![(0, 0)], 0).is_err());
    }

    #[test]
    fn image_dimensions_match_locations_and_length() {
        let vis = StateVisualiser::new(vec![(0, 0), (1, 1), (2, 2)], 8).unwrap();
        let (w, h, bytes) = vis.image();
        assert_eq!(w, 8);
        assert_eq!(h, 5);
        assert_eq!(bytes.len(), (8 * 5 * 4) as usize);
    }

    #[test]
    fn all_true_samples_average_to_one() {
        let mut vis = ring_fixture(4);
        for i in 0..4 {
            vis.rings[0][i] = true;
        }
        assert!((vis.average_states()[0] - 1.0).abs() < f32::EPSILON);
    }
}
