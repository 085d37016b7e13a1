//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod progress;

use std::sync::Arc;

use teloxide::prelude::*;

use crate::core::config;
use crate::download::pipeline::Pipeline;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps};

/// Runs the bot with long polling until Ctrl-C.
pub async fn run_bot(pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    log::info!("Starting bot...");
    let bot = create_bot()?;

    match bot.get_me().await {
        Ok(me) => log::info!("🤖 Logged in as @{}", me.username()),
        Err(e) => anyhow::bail!("Bot token rejected by Telegram: {}", e),
    }

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let deps = HandlerDeps::new(pipeline, config::DOWNLOAD_FOLDER.clone());
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
