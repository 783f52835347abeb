//! Interactive scale, rotate, perspective and unified transforms over layers,
//! selection masks and vector paths, with handle hit-testing, parameter
//! history and a grouped-undo commit into a content store.

pub mod batch;
pub mod commit;
mod config;
pub mod error;
pub mod geometry;
pub mod handles;
pub mod history;
pub mod input;
pub mod logging;
pub mod progress;
pub mod render;
pub mod state;
pub mod store;
pub mod tools;

pub use batch::{BatchReport, BatchRequest, BatchTransform};
pub use config::load_transform_options;
pub use error::{AppError, AppResult};
pub use state::{EventOutcome, SessionHost, TransformSession};
pub use tools::{ToolKind, TransformOptions};

/// Entrypoint for scripted use: transforms one image file with the options
/// from the user config.
pub fn run_batch(request: &BatchRequest) -> AppResult<BatchReport> {
    logging::init();
    let options = load_transform_options();
    tracing::info!(kind = %request.transform.kind(), "starting batch transform");

    let report = batch::transform_file(request, options)?;
    tracing::info!(bounds = ?report.bounds, "batch transform complete");
    Ok(report)
}
