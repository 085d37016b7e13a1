//! Ephemeral task storage for the web API

pub mod tasks;

// Re-exports for convenience
pub use tasks::{TaskRecord, TaskStatus, TaskStore};
