use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use serde_json::json;
use tokio::sync::watch;

use shortgrab::cli::{Cli, Commands};
use shortgrab::core::{config, init_logger, log_toolchain_configuration};
use shortgrab::download::arena::TaskArena;
use shortgrab::download::{FetchRequest, Pipeline, PipelineStage};
use shortgrab::telegram::run_bot;
use shortgrab::web::{start_web_server, WebState};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the matching subcommand. With no
/// subcommand the web server and the bot run side by side.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from spawned tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // .env must load before any config static is touched
    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH)?;
    log_toolchain_configuration();

    let pipeline = Arc::new(Pipeline::with_system_tools());

    match cli.command {
        Some(Commands::Run) | None => run_all(pipeline).await,
        Some(Commands::Bot) => run_bot(pipeline).await,
        Some(Commands::Web { port }) => {
            let state = WebState::new(pipeline, config::DOWNLOAD_FOLDER.clone());
            start_web_server(port.unwrap_or(*config::WEB_PORT), state).await
        }
        Some(Commands::Fetch { url, output }) => run_fetch(pipeline, url, output).await,
    }
}

/// Runs the web server, plus the bot when a token is configured.
async fn run_all(pipeline: Arc<Pipeline>) -> Result<()> {
    let state = WebState::new(pipeline.clone(), config::DOWNLOAD_FOLDER.clone());
    let web = start_web_server(*config::WEB_PORT, state);

    if config::BOT_TOKEN.is_empty() {
        log::error!("BOT_TOKEN is not set, running the web front end only");
        return web.await;
    }

    tokio::select! {
        res = web => {
            log::warn!("Web server stopped");
            res
        }
        res = run_bot(pipeline) => {
            log::warn!("Bot stopped");
            res
        }
    }
}

/// Downloads one URL into `output` and prints a JSON summary.
async fn run_fetch(pipeline: Arc<Pipeline>, url: String, output: Option<PathBuf>) -> Result<()> {
    let root = output.unwrap_or_else(|| config::DOWNLOAD_FOLDER.clone());
    let arena = TaskArena::create(&root).await?;
    log::info!("Fetching {} into {}", url, arena.dir().display());

    let (stage_tx, mut stage_rx) = watch::channel(PipelineStage::Queued);
    let reporter = tokio::spawn(async move {
        while stage_rx.changed().await.is_ok() {
            let stage = *stage_rx.borrow_and_update();
            log::info!("{}", stage.label());
            if stage == PipelineStage::Finished {
                break;
            }
        }
    });

    let request = FetchRequest::new(url, arena.dir());
    let result = pipeline.run(&request, &stage_tx).await;
    drop(stage_tx);
    let _ = reporter.await;

    match result {
        Ok(out) => {
            let summary = json!({
                "file": out.artifact,
                "kind": out.kind,
                "gallery": out.gallery,
                "file_size": out.file_size,
                "method": out.method,
                "post_process": out.post_process.as_str(),
                "width": out.probe.as_ref().and_then(|p| p.width),
                "height": out.probe.as_ref().and_then(|p| p.height),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            arena.remove().await;
            Err(anyhow::anyhow!(e.user_message()))
        }
    }
}
