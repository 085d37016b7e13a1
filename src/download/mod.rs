//! Download management and processing

pub mod arena;
pub mod delivery;
pub mod error;
pub mod locator;
pub mod pipeline;
pub mod postprocess;
pub mod probe;
pub mod progress;
pub mod source;
pub mod strategy;

// Re-exports for convenience
pub use arena::TaskArena;
pub use delivery::{check_default_delivery_size, check_delivery_size, DeliveryError};
pub use error::DownloadError;
pub use pipeline::{Pipeline, PipelineError, PipelineOutput};
pub use progress::PipelineStage;
pub use source::{FetchExecutor, FetchMethod, FetchRequest, FetchResult, MediaKind};
