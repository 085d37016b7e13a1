//! Delivery-time size gate.
//!
//! The pipeline completes regardless of artifact size; the ceiling is applied
//! only when a front end is about to hand the file to the caller.

use std::path::Path;
use thiserror::Error;

use crate::core::config;
use crate::core::metrics;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("file is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("artifact unavailable: {0}")]
    Missing(#[from] std::io::Error),
}

/// Accepts a size at or under `limit`.
pub fn check_size(size: u64, limit: u64) -> Result<u64, DeliveryError> {
    if size > limit {
        metrics::DELIVERY_TOO_LARGE_TOTAL.inc();
        return Err(DeliveryError::TooLarge { size, limit });
    }
    Ok(size)
}

/// Reads the artifact's size and applies [`check_size`] with `limit`.
pub async fn check_delivery_size(path: &Path, limit: u64) -> Result<u64, DeliveryError> {
    let size = tokio::fs::metadata(path).await?.len();
    check_size(size, limit)
}

/// [`check_delivery_size`] with the Bot API ceiling.
pub async fn check_default_delivery_size(path: &Path) -> Result<u64, DeliveryError> {
    check_delivery_size(path, config::delivery::MAX_FILE_SIZE_BYTES).await
}
