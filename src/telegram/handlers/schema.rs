//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::download::handle_url_message;
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::progress::welcome_text;

/// Creates the dispatcher schema for the Telegram bot.
///
/// Commands are matched first; any other text message goes to the URL
/// handler.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler())
        .branch(message_handler(deps))
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        |bot: Bot, msg: Message, cmd: Command| async move {
            log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
            match cmd {
                Command::Start | Command::Help => {
                    bot.send_message(msg.chat.id, welcome_text()).await?;
                }
            }
            Ok(())
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                // Each message runs detached so a slow download never blocks the chat.
                tokio::spawn(async move {
                    if let Err(e) = handle_url_message(&bot, &msg, &deps).await {
                        log::error!("❌ Message handler failed for chat {}: {}", msg.chat.id, e);
                    }
                });
                Ok(())
            }
        })
}
