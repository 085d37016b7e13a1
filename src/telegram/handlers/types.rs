//! Handler types and dependencies

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config;
use crate::download::pipeline::Pipeline;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub pipeline: Arc<Pipeline>,
    /// Root under which each message gets its own arena directory
    pub download_root: PathBuf,
    /// Delivery ceiling for uploads
    pub max_file_size: u64,
}

impl HandlerDeps {
    pub fn new(pipeline: Arc<Pipeline>, download_root: PathBuf) -> Self {
        Self {
            pipeline,
            download_root,
            max_file_size: config::delivery::MAX_FILE_SIZE_BYTES,
        }
    }
}
