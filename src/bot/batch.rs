//! Batch processing of a contiguous run of source messages.

use super::client::{MessageRef, RequestMessage};
use super::messages::{
    render_batch_chunk, render_batch_chunk_dm, render_summary, render_tally,
    render_window_progress,
};
use super::pipeline::LinkPipeline;
use crate::config::{BATCH_WINDOW_SIZE, CHUNK_DELAY_MS, DELIVERY_CHUNK_SIZE, PROGRESS_STEP};
use std::time::Duration;
use tracing::{info, warn};

/// Counters and collected links of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items that produced links
    pub processed: usize,
    /// Items that did not
    pub failed: usize,
    /// Requested item count
    pub total: usize,
    /// Download links of processed items, in source order
    pub links: Vec<String>,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Items finished so far, successful or not
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.processed + self.failed
    }

    fn is_report_point(&self) -> bool {
        let done = self.completed();
        done > 0 && (done % PROGRESS_STEP == 0 || done == self.total)
    }
}

/// Drives [`LinkPipeline`] over `count` consecutive message IDs
#[derive(Clone)]
pub struct BatchProcessor {
    pipeline: LinkPipeline,
}

impl BatchProcessor {
    /// Create a processor around `pipeline`
    #[must_use]
    pub const fn new(pipeline: LinkPipeline) -> Self {
        Self { pipeline }
    }

    /// Process messages `start_id..start_id + count` of the request's chat.
    ///
    /// Messages are fetched ten at a time and processed one after another. The
    /// status placeholder shows the current window, a running tally every five
    /// completions, and a final summary. Collected links are delivered in messages
    /// of twenty, with a private copy when the request came from a group.
    pub async fn process_batch(
        &self,
        request: &RequestMessage,
        start_id: i32,
        count: usize,
        status: MessageRef,
        use_shortener: bool,
    ) -> BatchProgress {
        let client = self.pipeline.client();
        let ids: Vec<i32> = (0..count)
            .map_while(|offset| {
                i32::try_from(offset)
                    .ok()
                    .and_then(|offset| start_id.checked_add(offset))
            })
            .collect();
        let windows = count.div_ceil(BATCH_WINDOW_SIZE);
        let mut progress = BatchProgress::new(count);

        info!(
            chat_id = request.chat_id,
            start_id, count, windows, "Batch started"
        );

        for (index, window) in ids.chunks(BATCH_WINDOW_SIZE).enumerate() {
            client
                .edit_status_safe(
                    status,
                    render_window_progress(index + 1, windows, window.len()),
                )
                .await;

            let messages = match client.fetch_messages(request.chat_id, window).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(
                        chat_id = request.chat_id,
                        window = index + 1,
                        error = %e,
                        "Failed to fetch batch window"
                    );
                    vec![None; window.len()]
                }
            };

            for message in messages {
                let links = match message {
                    Some(item) => {
                        self.pipeline
                            .process(request, &item, None, use_shortener, Some(request))
                            .await
                    }
                    None => None,
                };
                match links {
                    Some(links) => {
                        progress.processed += 1;
                        progress.links.extend(links.online_link);
                    }
                    None => progress.failed += 1,
                }

                if progress.is_report_point() {
                    client
                        .edit_status_safe(
                            status,
                            render_tally(progress.processed, progress.failed, progress.total),
                        )
                        .await;
                }
            }
        }
        // IDs past i32::MAX do not exist
        progress.failed += count - ids.len();

        self.deliver_chunks(request, &progress.links).await;

        client
            .edit_status_safe(
                status,
                render_summary(progress.processed, progress.failed, progress.total),
            )
            .await;

        info!(
            chat_id = request.chat_id,
            processed = progress.processed,
            failed = progress.failed,
            "Batch finished"
        );
        progress
    }

    async fn deliver_chunks(&self, request: &RequestMessage, links: &[String]) {
        let client = self.pipeline.client();
        let chunks: Vec<&[String]> = links.chunks(DELIVERY_CHUNK_SIZE).collect();

        for (index, chunk) in chunks.iter().enumerate() {
            if let Err(e) = client
                .send_text(
                    request.chat_id,
                    render_batch_chunk(chunk),
                    Some(request.message_id),
                    None,
                )
                .await
            {
                warn!(chat_id = request.chat_id, error = %e, "Failed to deliver batch links");
            }

            if !request.chat_kind.is_private() {
                if let Some(user) = &request.from {
                    let text = render_batch_chunk_dm(request.chat_title.as_deref(), chunk);
                    if client.send_text(user.id, text, None, None).await.is_err() {
                        self.pipeline.notify_dm_failed(request).await;
                    }
                }
            }

            if index + 1 < chunks.len() {
                tokio::time::sleep(Duration::from_millis(CHUNK_DELAY_MS)).await;
            }
        }
    }
}
