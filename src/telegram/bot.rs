//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list registration in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "how to use the bot")]
    Start,
    #[command(description = "supported platforms")]
    Help,
}

/// Creates a Bot instance from the configured token
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(AppError::Validation)` - No token configured
/// * `Err(AppError::Http)` - The HTTP client failed to build
pub fn create_bot() -> AppResult<Bot> {
    bot_with_token(config::BOT_TOKEN.as_str())
}

fn bot_with_token(token: &str) -> AppResult<Bot> {
    if token.is_empty() {
        return Err(AppError::Validation("TELEGRAM_BOT_TOKEN is not set".to_string()));
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(token, client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "shortgrab_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/help", "shortgrab_bot").unwrap(), Command::Help);
        assert!(Command::parse("/unknown", "shortgrab_bot").is_err());
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(bot_with_token(""), Err(AppError::Validation(_))));
        assert!(bot_with_token("123:abc").is_ok());
    }

    #[test]
    fn test_command_descriptions_listed() {
        let text = Command::descriptions().to_string();
        assert!(text.contains("/start"));
        assert!(text.contains("/help"));
    }
}
