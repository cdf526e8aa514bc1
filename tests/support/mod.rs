//! Shared helper for the integration test binaries in `tests/`.
//!
//! Every test here drives a real `wgpu::Device`, which CI runners without
//! a software rasteriser (llvmpipe/lavapipe) or GPU simply don't have.
//! Rather than fail the suite in that environment, construction failures
//! caused by a missing adapter are treated as a skip.

use pbrrn::{Pbrrn, PbrrnError, PbrrnOptions};

static LOGGER: std::sync::Once = std::sync::Once::new();

/// Initialises `env_logger` once per test binary so `log::debug!`/`error!`
/// calls in `gpu`/`engine` (adapter/format selection, poisoning) surface
/// when a test is run with `RUST_LOG` set, rather than being silently
/// dropped for lack of any installed logger.
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn try_engine(options: PbrrnOptions) -> Option<Pbrrn> {
    init_logging();
    match Pbrrn::new(options) {
        Ok(model) => Some(model),
        Err(PbrrnError::AdapterRequestFailed | PbrrnError::DeviceCreateFailed(_)) => {
            eprintln!("pbrrn: skipping test, no GPU adapter available in this environment");
            None
        }
        Err(e) => panic!("unexpected construction error: {e}"),
    }
}
