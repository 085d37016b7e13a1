//! URL message flow: status message, pipeline run, size gate, upload, cleanup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, MessageId};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::types::{HandlerDeps, HandlerError};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::utils::{extract_first_url, truncate_chars};
use crate::download::arena::TaskArena;
use crate::download::delivery::{check_delivery_size, DeliveryError};
use crate::download::pipeline::PipelineOutput;
use crate::download::progress::{source_display_name, PipelineStage};
use crate::download::source::{FetchRequest, MediaKind};
use crate::telegram::progress;

/// Handles one text message: finds the first URL and runs it through the
/// pipeline in a fresh arena, editing a status message as it goes.
pub async fn handle_url_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id;
    let Some(url) = msg.text().and_then(extract_first_url) else {
        bot.send_message(chat_id, progress::no_url_text()).await?;
        return Ok(());
    };

    log::info!("📨 Chat {} requested {}", chat_id, url);
    let source = source_display_name(&url);
    let started = Instant::now();
    let status = bot
        .send_message(
            chat_id,
            progress::status_text(source, 0, Duration::ZERO, &PipelineStage::Queued.label()),
        )
        .await?;

    let arena = match TaskArena::create(&deps.download_root).await {
        Ok(arena) => arena,
        Err(e) => {
            log::error!("Failed to create arena for chat {}: {}", chat_id, e);
            edit_status(bot, chat_id, status.id, progress::failure_text("could not prepare a work directory")).await;
            return Ok(());
        }
    };

    let (stage_tx, stage_rx) = watch::channel(PipelineStage::Queued);
    let cancel = CancellationToken::new();
    let ticker = tokio::spawn(animate_status(
        bot.clone(),
        chat_id,
        status.id,
        source,
        started,
        stage_rx,
        cancel.clone(),
    ));

    let pipeline = deps.pipeline.clone();
    let request = FetchRequest::new(url, arena.dir());
    let run = tokio::spawn(async move { pipeline.run(&request, &stage_tx).await });
    let outcome = run.await;

    cancel.cancel();
    let _ = ticker.await;

    match outcome {
        Ok(Ok(output)) => deliver(bot, chat_id, status.id, &output, started, deps.max_file_size).await,
        Ok(Err(e)) => {
            edit_status(bot, chat_id, status.id, progress::failure_text(&e.user_message())).await;
        }
        Err(join_err) => {
            log::error!("Pipeline task for chat {} crashed: {}", chat_id, join_err);
            let detail = truncate_chars(
                &format!("Unexpected error: {}", join_err),
                config::delivery::ERROR_DETAIL_MAX_CHARS,
            );
            edit_status(bot, chat_id, status.id, progress::failure_text(&detail)).await;
        }
    }

    arena.remove().await;
    Ok(())
}

/// Edits the status message every animation tick until cancelled.
async fn animate_status(
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
    source: &'static str,
    started: Instant,
    stage_rx: watch::Receiver<PipelineStage>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config::animation::update_interval());
    interval.tick().await;
    let mut tick: usize = 1;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let stage = stage_rx.borrow().label();
                let text = progress::status_text(source, tick, started.elapsed(), &stage);
                // "message is not modified" and rate limits are expected here
                if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
                    log::debug!("Status edit skipped: {}", e);
                }
                tick = tick.wrapping_add(1);
            }
        }
    }
}

async fn edit_status(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: String) {
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        log::warn!("Failed to edit status message: {}", e);
    }
}

/// Applies the size gate and uploads. Returns the files that pass the gate,
/// or the first rejection.
async fn deliverable_files(output: &PipelineOutput, limit: u64) -> Result<Vec<PathBuf>, DeliveryError> {
    let candidates: Vec<PathBuf> = if output.kind == MediaKind::Image && !output.gallery.is_empty() {
        output
            .gallery
            .iter()
            .take(config::download::MAX_IMAGES)
            .cloned()
            .collect()
    } else {
        vec![output.artifact.clone()]
    };

    let mut accepted = Vec::new();
    let mut first_rejection = None;
    for path in candidates {
        match check_delivery_size(&path, limit).await {
            Ok(_) => accepted.push(path),
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                first_rejection.get_or_insert(e);
            }
        }
    }
    match (accepted.is_empty(), first_rejection) {
        (true, Some(e)) => Err(e),
        _ => Ok(accepted),
    }
}

async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    status_id: MessageId,
    output: &PipelineOutput,
    started: Instant,
    limit: u64,
) {
    let files = match deliverable_files(output, limit).await {
        Ok(files) if !files.is_empty() => files,
        Ok(_) => {
            edit_status(bot, chat_id, status_id, progress::failure_text("nothing to send")).await;
            return;
        }
        Err(DeliveryError::TooLarge { size, limit }) => {
            edit_status(bot, chat_id, status_id, progress::too_large_text(size, limit)).await;
            return;
        }
        Err(DeliveryError::Missing(e)) => {
            log::error!("Artifact vanished before upload: {}", e);
            edit_status(bot, chat_id, status_id, progress::failure_text("file disappeared")).await;
            return;
        }
    };

    edit_status(
        bot,
        chat_id,
        status_id,
        progress::success_text(output.file_size, started.elapsed()),
    )
    .await;

    let sent = match output.kind {
        MediaKind::Image => send_images(bot, chat_id, &files).await,
        _ => send_video(bot, chat_id, &files[0], output).await,
    };

    match sent {
        Ok(()) => {
            log::info!("📤 Delivered {} file(s) to chat {}", files.len(), chat_id);
            if let Err(e) = bot.delete_message(chat_id, status_id).await {
                log::debug!("Failed to delete status message: {}", e);
            }
        }
        Err(e) => {
            log::error!("Upload to chat {} failed: {}", chat_id, e);
            edit_status(bot, chat_id, status_id, progress::upload_failed_text().to_string()).await;
        }
    }
}

async fn send_video(bot: &Bot, chat_id: ChatId, path: &Path, output: &PipelineOutput) -> AppResult<()> {
    let mut request = bot
        .send_video(chat_id, InputFile::file(path.to_path_buf()))
        .supports_streaming(true);
    if let Some(probe) = &output.probe {
        if let (Some(width), Some(height)) = (probe.width, probe.height) {
            request = request.width(width).height(height);
        }
    }
    request.await?;
    Ok(())
}

async fn send_images(bot: &Bot, chat_id: ChatId, files: &[PathBuf]) -> AppResult<()> {
    if let [single] = files {
        bot.send_photo(chat_id, InputFile::file(single.clone())).await?;
        return Ok(());
    }
    let media: Vec<InputMedia> = files
        .iter()
        .map(|path| InputMedia::Photo(InputMediaPhoto::new(InputFile::file(path.clone()))))
        .collect();
    bot.send_media_group(chat_id, media).await?;
    Ok(())
}
