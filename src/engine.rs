//! Step Orchestrator & Public API (spec §4.6)
//!
//! [`Pbrrn`] owns one GPU context and the four double-buffered texture
//! families, ping-pongs `texture_index` across Reward → Record →
//! Transition, and exposes the host-facing `step`/`setState(s)`/
//! `getState(s)` contract.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::error::{PbrrnError, Result};
use crate::gpu::GpuContext;
use crate::layout::build_connection_map;
use crate::passes::record::RecordPass;
use crate::passes::reward::RewardPass;
use crate::passes::transition::TransitionPass;
use crate::textures::{TextureFamilies, probability_initial_bytes};

/// Construction options (spec §6). Matches the spec's documented
/// defaults; `probability_limit = 6.0`, `history_decay_rate = 0.01`.
#[derive(Debug, Clone, Copy)]
pub struct PbrrnOptions {
    pub width: u32,
    pub height: u32,
    pub probability_limit: f32,
    pub history_decay_rate: f32,
    pub disable_self_inputs: bool,
}

impl Default for PbrrnOptions {
    fn default() -> Self {
        Self { width: 8, height: 8, probability_limit: 6.0, history_decay_rate: 0.01, disable_self_inputs: false }
    }
}

impl PbrrnOptions {
    fn validate(self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PbrrnError::InvalidOption("width and height must be >= 1".into()));
        }
        if !self.probability_limit.is_finite() || self.probability_limit <= 0.0 {
            return Err(PbrrnError::InvalidOption("probability_limit must be a positive finite number".into()));
        }
        if !(0.0..=1.0).contains(&self.history_decay_rate) {
            return Err(PbrrnError::InvalidOption("history_decay_rate must be in [0, 1]".into()));
        }
        Ok(())
    }
}

/// A probabilistic binary rule-reinforcement network instance. Owns an
/// exclusive GPU device (spec §5: "the GPU device is owned exclusively by
/// one PBRRN instance").
pub struct Pbrrn {
    gpu: GpuContext,
    textures: TextureFamilies,
    reward_pass: RewardPass,
    record_pass: RecordPass,
    transition_pass: TransitionPass,
    options: PbrrnOptions,
    /// Index of the buffer holding the publicly-visible committed state;
    /// flipped as the last action of a successful `step`.
    texture_index: usize,
    /// Set once a fatal runtime error occurs; every public method checks
    /// this first and refuses to run until the engine is reconstructed.
    poisoned: bool,
}

impl Pbrrn {
    /// # Errors
    ///
    /// Returns [`PbrrnError::InvalidOption`] for bad construction options,
    /// or an initialisation error if the GPU is unavailable.
    pub fn new(options: PbrrnOptions) -> Result<Self> {
        options.validate()?;

        let gpu = GpuContext::new()?;
        let textures = gpu.capture_validation(
            || TextureFamilies::new(&gpu, options.width, options.height),
            PbrrnError::FramebufferIncomplete,
        )?;

        let connection_bytes = build_connection_map(options.width, options.height);
        gpu.write_texture_rgba8(&textures.connection, options.width, options.height, &connection_bytes);

        let mut rng = StdRng::seed_from_u64(0xBADC0FFEu64);
        let initial_state: Vec<u8> =
            (0..(options.width * options.height)).map(|_| u8::from(rng.random_range(0..2u8) == 1) * 255).collect();
        gpu.write_texture_region_r8(
            textures.state.texture(0),
            0,
            0,
            options.width,
            options.height,
            &initial_state,
        );

        let cell_count = (options.width * options.height) as usize;
        let bytes_per_texel: u32 = if gpu.float_format == wgpu::TextureFormat::Rgba32Float { 16 } else { 4 };

        let probability_bytes = probability_initial_bytes(gpu.float_format, cell_count);
        gpu.write_texture_full(
            textures.probability.texture(0),
            2 * options.width,
            options.height,
            bytes_per_texel,
            &probability_bytes,
        );

        let history_bytes = vec![0u8; cell_count * 4 * (bytes_per_texel as usize)];
        gpu.write_texture_full(
            textures.history.texture(0),
            2 * options.width,
            2 * options.height,
            bytes_per_texel,
            &history_bytes,
        );

        let noise_bytes: Vec<u8> =
            (0..(options.width * options.height * 4)).map(|_| rng.random_range(0..=255u8)).collect();
        gpu.write_texture_rgba8(textures.noise.texture(0), options.width, options.height, &noise_bytes);

        let reward_pass = RewardPass::new(&gpu)?;
        let record_pass = RecordPass::new(&gpu)?;
        let transition_pass = TransitionPass::new(&gpu)?;

        Ok(Self { gpu, textures, reward_pass, record_pass, transition_pass, options, texture_index: 0, poisoned: false })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.options.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.options.height
    }

    fn check_alive(&self) -> Result<()> {
        if self.poisoned { Err(PbrrnError::Poisoned) } else { Ok(()) }
    }

    fn check_bounds(&self, x: u32, y: u32, w: u32, h: u32) -> Result<()> {
        if x.checked_add(w).is_none_or(|right| right > self.options.width)
            || y.checked_add(h).is_none_or(|bottom| bottom > self.options.height)
        {
            return Err(PbrrnError::OutOfBounds(format!(
                "rect ({x},{y},{w},{h}) outside {}x{} grid",
                self.options.width, self.options.height
            )));
        }
        Ok(())
    }

    /// Runs Reward → Record → Transition once against the current/other
    /// buffer pair, then flips `texture_index`. Either all three passes
    /// commit, or (on a fatal GPU error) none do and the engine is
    /// poisoned (spec §4.6/§7).
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::InvalidOption`] for a non-finite `reward`,
    /// [`PbrrnError::Poisoned`] if a prior step already poisoned the
    /// engine, or [`PbrrnError::DeviceLost`] if the GPU backend reports a
    /// validation/device error for this step.
    pub fn step(&mut self, reward: f32) -> Result<()> {
        self.check_alive()?;
        if !reward.is_finite() {
            return Err(PbrrnError::InvalidOption("reward must be a finite number".into()));
        }

        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let prev = self.texture_index;
        let curr = 1 - prev;

        let mut encoder =
            self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("pbrrn-step") });

        self.reward_pass.run(
            &self.gpu,
            &mut encoder,
            &self.textures,
            prev,
            curr,
            reward,
            self.options.probability_limit,
        );
        self.record_pass.run(
            &self.gpu,
            &mut encoder,
            &self.textures,
            self.options.width,
            self.options.height,
            prev,
            curr,
            self.options.probability_limit,
            self.options.history_decay_rate,
            self.options.disable_self_inputs,
        );
        self.transition_pass.run(
            &self.gpu,
            &mut encoder,
            &self.textures,
            self.options.width,
            self.options.height,
            prev,
            curr,
            self.options.probability_limit,
            self.options.disable_self_inputs,
        );

        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            self.poisoned = true;
            log::error!("pbrrn: step failed, engine poisoned: {err}");
            return Err(PbrrnError::DeviceLost(err.to_string()));
        }

        self.texture_index = curr;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`PbrrnError::OutOfBounds`] if `(x, y)` is outside the grid,
    /// or [`PbrrnError::DeviceLost`] if the GPU readback fails.
    pub fn get_state(&self, x: u32, y: u32) -> Result<bool> {
        self.check_alive()?;
        self.check_bounds(x, y, 1, 1)?;
        let bytes = self.gpu.blocking_read_r8(self.textures.state.texture(self.texture_index), x, y, 1, 1)?;
        Ok(bytes[0] >= 128)
    }

    /// Reads back an `w x h` rectangle of states into `out`, only the R
    /// channel of each RGBA8 group is meaningful (spec §6: "full RGBA
    /// simplifies DMA").
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::OutOfBounds`] for an out-of-range rect,
    /// [`PbrrnError::BufferLengthMismatch`] if `out.len() != w*h*4`, or
    /// [`PbrrnError::DeviceLost`] if the GPU readback fails.
    pub fn get_states(&self, x: u32, y: u32, w: u32, h: u32, out: &mut [u8]) -> Result<()> {
        self.check_alive()?;
        self.check_bounds(x, y, w, h)?;
        let expected = (w * h * 4) as usize;
        if out.len() != expected {
            return Err(PbrrnError::BufferLengthMismatch { expected, actual: out.len() });
        }
        let bytes = self.gpu.blocking_read_r8(self.textures.state.texture(self.texture_index), x, y, w, h)?;
        for (i, &b) in bytes.iter().enumerate() {
            out[i * 4] = b;
            out[i * 4 + 1] = b;
            out[i * 4 + 2] = b;
            out[i * 4 + 3] = 255;
        }
        Ok(())
    }

    /// Writes the *current* state texture directly; takes effect at the
    /// next `step` (spec §4.6).
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::OutOfBounds`] if `(x, y)` is outside the grid.
    pub fn set_state(&mut self, x: u32, y: u32, value: bool) -> Result<()> {
        self.check_alive()?;
        self.check_bounds(x, y, 1, 1)?;
        self.gpu.write_texture_region_r8(
            self.textures.state.texture(self.texture_index),
            x,
            y,
            1,
            1,
            &[u8::from(value) * 255],
        );
        Ok(())
    }

    /// Only the R channel of each RGBA8 group in `buffer` is read (spec
    /// §6).
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::OutOfBounds`] for an out-of-range rect, or
    /// [`PbrrnError::BufferLengthMismatch`] if `buffer.len() != w*h*4`.
    pub fn set_states(&mut self, x: u32, y: u32, w: u32, h: u32, buffer: &[u8]) -> Result<()> {
        self.check_alive()?;
        self.check_bounds(x, y, w, h)?;
        let expected = (w * h * 4) as usize;
        if buffer.len() != expected {
            return Err(PbrrnError::BufferLengthMismatch { expected, actual: buffer.len() });
        }
        let r_channel: Vec<u8> = buffer.chunks_exact(4).map(|chunk| chunk[0]).collect();
        self.gpu.write_texture_region_r8(self.textures.state.texture(self.texture_index), x, y, w, h, &r_channel);
        Ok(())
    }

    /// The device/queue backing this instance. Exposed so a caller can
    /// build a target texture compatible with [`crate::visualize::TextureVisualiser`]
    /// on the same device the model's own textures live on.
    #[must_use]
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    #[must_use]
    pub(crate) fn textures(&self) -> &TextureFamilies {
        &self.textures
    }

    #[must_use]
    pub(crate) fn texture_index(&self) -> usize {
        self.texture_index
    }

    #[must_use]
    pub(crate) fn options(&self) -> PbrrnOptions {
        self.options
    }

    /// Releases all GPU objects. Consuming `self` makes double-dispose a
    /// compile-time impossibility rather than a runtime check (spec §7's
    /// "idempotent; no error" is satisfied more strongly by ownership
    /// than by a dispose flag) — see `DESIGN.md`.
    pub fn dispose(self) {
        drop(self);
    }

    /// Overwrites the *current* noise buffer directly. Test-only: the
    /// public API never exposes noise, but scenario S1 (spec §8) needs a
    /// deterministic all-zero PRNG state to pin down the expected output.
    #[cfg(test)]
    pub(crate) fn set_noise_bytes(&mut self, bytes: &[u8]) {
        self.gpu.write_texture_rgba8(
            self.textures.noise.texture(self.texture_index),
            self.options.width,
            self.options.height,
            bytes,
        );
    }
}
