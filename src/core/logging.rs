//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Toolchain and session-cookie configuration report at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already installed
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Returns true if `bin` resolves to an executable, either as a path or on PATH.
pub fn binary_available(bin: &str) -> bool {
    which::which(bin).is_ok()
}

/// Logs which external tools and session cookies are configured.
///
/// Missing tools are not fatal: the fallback chain skips past a downloader
/// that cannot be spawned, and probing failures are absorbed.
pub fn log_toolchain_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🧰 Toolchain Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let tools = [
        ("VIDEODL_BIN", config::VIDEODL_BIN.as_str()),
        ("YTDL_BIN", config::YTDL_BIN.as_str()),
        ("FFMPEG_BIN", config::FFMPEG_BIN.as_str()),
        ("FFPROBE_BIN", config::FFPROBE_BIN.as_str()),
    ];
    for (name, bin) in tools {
        if binary_available(bin) {
            log::info!("✅ {}: {}", name, bin);
        } else {
            log::warn!("⚠️  {}: {} (not found, steps using it will fail)", name, bin);
        }
    }

    match config::CHROME_BIN.as_ref() {
        Some(path) if path.is_file() => log::info!("✅ CHROME_BIN: {}", path.display()),
        Some(path) => log::error!("❌ CHROME_BIN: {} (FILE NOT FOUND!)", path.display()),
        None => log::info!("ℹ️  CHROME_BIN not set, browser will be autodetected"),
    }

    let cookie_names: Vec<&str> = config::XHS_COOKIES.iter().map(|(name, _)| name.as_str()).collect();
    if cookie_names.iter().any(|name| *name == "web_session") {
        log::info!("✅ XHS_COOKIES: {}", cookie_names.join(", "));
    } else {
        log::warn!(
            "⚠️  XHS_COOKIES has no web_session ({}); login-gated notes will fall back to videodl",
            cookie_names.join(", ")
        );
    }

    log::info!("📁 DOWNLOAD_FOLDER: {}", config::DOWNLOAD_FOLDER.display());
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_available_for_missing_tool() {
        assert!(!binary_available("definitely-not-a-real-binary-shortgrab"));
        assert!(!binary_available("/nonexistent/dir/ffmpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_binary_available_for_path_tool() {
        assert!(binary_available("sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_binary_available_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("fake-ffmpeg");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!binary_available(tool.to_str().unwrap()));

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(binary_available(tool.to_str().unwrap()));
    }
}
