//! Shortgrab - short-video and picture-post downloader
//!
//! Takes a link from a chat message or a web form, fetches the media with
//! the method that fits the platform, converts it into something Telegram
//! can play and hands it back.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, metrics and process helpers
//! - `download`: Strategy selection, fetch executors, probing, post-processing
//! - `storage`: In-memory task registry for the web front end
//! - `telegram`: Telegram bot integration and handlers
//! - `web`: HTTP API and the single-page front end

#![allow(clippy::too_many_arguments)]

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;
pub mod web;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use download::{FetchMethod, FetchRequest, Pipeline, PipelineError, PipelineOutput, PipelineStage};
pub use storage::{TaskRecord, TaskStatus, TaskStore};
pub use telegram::{create_bot, run_bot, schema, HandlerDeps};
