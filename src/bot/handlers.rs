//! Update handlers for `/link`, private uploads and channel posts.
//!
//! Handlers work on [`RequestMessage`] and [`MediaItem`] so they run unchanged
//! against the live client and the test fake; `runner` does the teloxide plumbing.

use super::batch::{BatchProcessor, BatchProgress};
use super::client::{MediaItem, RequestMessage};
use super::messages::{
    batch_too_large, ERROR_INVALID_COUNT, ERROR_NOT_ADMIN, ERROR_NO_FILE, ERROR_REPLY_FILE,
    PROCESSING_FILE, PROCESSING_REQUEST,
};
use super::pipeline::LinkPipeline;
use crate::gate::{admits, AccessGate};
use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::utils::command::BotCommands;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Generate links for the replied file, or for N files starting with it
    #[command(description = "reply to a file to get its links; /link N for N files.")]
    Link(String),
}

/// The message a `/link` command replies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// ID of the replied message
    pub message_id: i32,
    /// Its media, if it carries any
    pub media: Option<MediaItem>,
}

/// Everything a handler needs, shared across updates
#[derive(Clone)]
pub struct AppContext {
    /// Single-item pipeline
    pub pipeline: LinkPipeline,
    /// Batch driver
    pub batch: BatchProcessor,
    /// Admission checks
    pub gate: Arc<dyn AccessGate>,
    /// Archival chat, whose own posts are never processed
    pub bin_channel: i64,
    /// Largest accepted `/link N`
    pub max_batch_size: usize,
}

impl AppContext {
    /// Wire up the pipeline, batch processor and gate
    #[must_use]
    pub fn new(
        pipeline: LinkPipeline,
        gate: Arc<dyn AccessGate>,
        bin_channel: i64,
        max_batch_size: usize,
    ) -> Self {
        Self {
            batch: BatchProcessor::new(pipeline.clone()),
            pipeline,
            gate,
            bin_channel,
            max_batch_size,
        }
    }

    async fn reply(&self, request: &RequestMessage, text: &str) {
        if let Err(e) = self
            .pipeline
            .client()
            .send_text(request.chat_id, text, Some(request.message_id), None)
            .await
        {
            warn!(chat_id = request.chat_id, error = %e, "Failed to reply");
        }
    }

    async fn admits_sender(&self, request: &RequestMessage) -> bool {
        match &request.from {
            Some(user) => admits(self.gate.as_ref(), user.id).await,
            None => true,
        }
    }
}

/// Parse the `/link` argument: empty means one file
fn parse_batch_count(arg: &str) -> Option<usize> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Some(1);
    }
    arg.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Handle `/link [N]` in a group.
///
/// A single file is processed inline. For `N > 1` the batch runs on its own task,
/// whose handle is returned.
///
/// # Errors
///
/// Returns an error only if the status placeholder cannot be sent.
pub async fn handle_link_command(
    ctx: &AppContext,
    request: RequestMessage,
    reply: Option<ReplyTarget>,
    arg: &str,
) -> Result<Option<JoinHandle<BatchProgress>>> {
    if !ctx.admits_sender(&request).await {
        return Ok(None);
    }

    if request.chat_kind.is_group() && !ctx.gate.is_admin(request.chat_id).await {
        ctx.reply(&request, ERROR_NOT_ADMIN).await;
        return Ok(None);
    }

    let Some(count) = parse_batch_count(arg) else {
        ctx.reply(&request, ERROR_INVALID_COUNT).await;
        return Ok(None);
    };
    if count > ctx.max_batch_size {
        ctx.reply(&request, &batch_too_large(ctx.max_batch_size))
            .await;
        return Ok(None);
    }

    let Some(reply) = reply else {
        ctx.reply(&request, ERROR_REPLY_FILE).await;
        return Ok(None);
    };
    if count == 1 && reply.media.is_none() {
        ctx.reply(&request, ERROR_NO_FILE).await;
        return Ok(None);
    }

    let status = ctx
        .pipeline
        .client()
        .send_text(
            request.chat_id,
            PROCESSING_REQUEST,
            Some(request.message_id),
            None,
        )
        .await
        .context("Failed to send status message")?;
    let shortener = ctx.gate.shortener_enabled(request.chat_id).await;

    if count == 1 {
        if let Some(media) = &reply.media {
            ctx.pipeline
                .process(&request, media, Some(status), shortener, None)
                .await;
        }
        return Ok(None);
    }

    info!(
        chat_id = request.chat_id,
        start_id = reply.message_id,
        count,
        "Starting batch"
    );
    let batch = ctx.batch.clone();
    let handle = tokio::spawn(async move {
        batch
            .process_batch(&request, reply.message_id, count, status, shortener)
            .await
    });
    Ok(Some(handle))
}

/// Handle media sent to the bot in a private chat.
///
/// # Errors
///
/// Returns an error only if the status placeholder cannot be sent.
pub async fn handle_private_media(
    ctx: &AppContext,
    request: RequestMessage,
    media: MediaItem,
) -> Result<()> {
    if request.from.is_none() || !ctx.admits_sender(&request).await {
        return Ok(());
    }

    let status = ctx
        .pipeline
        .client()
        .send_text(
            request.chat_id,
            PROCESSING_FILE,
            Some(request.message_id),
            None,
        )
        .await
        .context("Failed to send status message")?;
    let shortener = ctx.gate.shortener_enabled(request.chat_id).await;

    ctx.pipeline
        .process(&request, &media, Some(status), shortener, None)
        .await;
    Ok(())
}

/// Handle a media post in a channel the bot administers
pub async fn handle_channel_post(ctx: &AppContext, post: RequestMessage, media: MediaItem) {
    if post.chat_id == ctx.bin_channel {
        return;
    }

    if ctx.gate.is_banned_channel(post.chat_id).await {
        info!(chat_id = post.chat_id, "Leaving banned channel");
        if let Err(e) = ctx.pipeline.client().leave_chat(post.chat_id).await {
            warn!(chat_id = post.chat_id, error = %e, "Failed to leave banned channel");
        }
        return;
    }

    if !ctx.gate.is_admin(post.chat_id).await {
        debug!(chat_id = post.chat_id, "Not an admin of channel, ignoring post");
        return;
    }

    let shortener = ctx.gate.shortener_enabled(post.chat_id).await;
    ctx.pipeline
        .process_channel_post(&post, &media, shortener)
        .await;
}
