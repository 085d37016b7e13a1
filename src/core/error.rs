use thiserror::Error;

/// Centralized error types for the application
///
/// Front ends and start-up code convert everything to this enum for consistent
/// handling. Failures inside a request's pipeline are mapped to
/// [`PipelineError`](crate::download::pipeline::PipelineError) before they reach a caller.
///
/// # Example
///
/// ```no_run
/// use shortgrab::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or invalid configuration
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = AppError::Validation("TELEGRAM_BOT_TOKEN is not set".to_string());
        assert_eq!(err.to_string(), "Validation error: TELEGRAM_BOT_TOKEN is not set");
    }

    #[test]
    fn test_error_is_send_sync_for_handlers() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<AppError>();
    }
}
