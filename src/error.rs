//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`PbrrnError`] covers all failure modes laid out by
//! the engine's error-handling design: GPU initialisation failures, runtime
//! GPU loss, and usage errors (bad coordinates, bad construction options).
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, PbrrnError>`.

use thiserror::Error;

/// The main error type for the PBRRN engine.
#[derive(Error, Debug)]
pub enum PbrrnError {
    // ========================================================================
    // Initialisation errors — fatal, the constructor fails
    // ========================================================================
    /// No compatible GPU adapter could be found.
    #[error("no compatible GPU adapter is available")]
    AdapterRequestFailed,

    /// The GPU device could not be created (unsupported features/limits).
    #[error("failed to create GPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A shader module failed to compile, or a pipeline failed to link.
    #[error("shader compile/link failure in {pass}: {detail}")]
    ShaderCompile {
        /// Which pass's shader failed (`"reward"`, `"record"`, `"transition"`, ...).
        pass: &'static str,
        /// Validation error text surfaced by the backend.
        detail: String,
    },

    /// A framebuffer (colour attachment set) could not be constructed.
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// Float textures were requested but the adapter cannot filter them.
    #[error("float textures requested but unsupported by this adapter")]
    FloatTextureUnsupported,

    // ========================================================================
    // Runtime errors — surfaced from `step`/`getStates`; engine is poisoned
    // ========================================================================
    /// The GPU context was lost, or a draw call failed, mid-step.
    #[error("GPU context lost or device error: {0}")]
    DeviceLost(String),

    /// A public method was called after the engine was poisoned by a prior
    /// fatal runtime error. The caller must reconstruct the engine.
    #[error("engine is poisoned after a prior fatal error and must be reconstructed")]
    Poisoned,

    // ========================================================================
    // Usage errors — engine state is left unchanged
    // ========================================================================
    /// A coordinate or rectangle fell outside `[0, width) x [0, height)`.
    #[error("coordinate/range out of bounds: {0}")]
    OutOfBounds(String),

    /// A construction option was invalid (negative dimension, NaN reward, ...).
    #[error("invalid construction option: {0}")]
    InvalidOption(String),

    /// A buffer passed to `setStates`/`getStates` had the wrong length.
    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferLengthMismatch {
        /// Expected length in bytes (`w * h * 4`).
        expected: usize,
        /// Actual length of the caller-supplied buffer.
        actual: usize,
    },
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, PbrrnError>;
