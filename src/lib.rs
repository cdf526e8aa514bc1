//! Probabilistic binary rule-reinforcement network (PBRRN)
//!
//! A GPU-resident simulation of a 2-D grid of binary cells, each governed
//! by a learned 8-entry rule table reinforced by a scalar reward over a
//! decayed trace of recent decisions. The simulation runs as a ping-pong
//! pipeline of three `wgpu` fragment passes (Reward, Record, Transition)
//! over four double-buffered texture families plus a per-cell PRNG.
//!
//! # Modules
//!
//! - [`engine`]: the [`engine::Pbrrn`] step orchestrator and public
//!   `step`/`setState(s)`/`getState(s)` API.
//! - [`gpu`]: the `wgpu` device/texture/pipeline wrapper passes build on.
//! - [`layout`]: sub-texel packing constants and the static connection map.
//! - [`passes`]: the Reward, Record and Transition fragment passes.
//! - [`textures`]: the double-buffered texture families.
//! - [`visualize`]: [`visualize::StateVisualiser`] and
//!   [`visualize::TextureVisualiser`], passive debug views over a model.
//! - [`hierarchy`]: the binary reinforcement hierarchy (BRH) composing
//!   PBRRN instances into a parent/child tree.
//! - [`error`]: the crate's [`error::PbrrnError`] error type.

pub mod engine;
pub mod error;
pub mod gpu;
pub mod hierarchy;
pub mod layout;
pub mod passes;
pub mod textures;
pub mod visualize;

pub use engine::{Pbrrn, PbrrnOptions};
pub use error::{PbrrnError, Result};
pub use hierarchy::{Brh, BrhLevelOptions};
pub use visualize::{StateVisualiser, TextureKind, TextureVisualiser};
