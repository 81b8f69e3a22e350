//! Single-item processing: archive, generate links, deliver, clean up.

use super::buttons::build_link_buttons;
use super::client::{ButtonRow, MediaItem, MessageRef, RequestMessage, StoredItem};
use super::forward::MediaForwarder;
use super::messages::{
    render_audit_entry, render_critical_alert, render_links, render_links_dm,
    ERROR_DM_FAILED, ERROR_PROCESSING_MEDIA,
};
use super::notify::OperatorNotifier;
use super::resilient::ResilientClient;
use crate::links::{LinkGenerator, LinkRecord};
use crate::utils::correlation_token;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs one media item through the archive → links → delivery steps
#[derive(Clone)]
pub struct LinkPipeline {
    client: ResilientClient,
    forwarder: MediaForwarder,
    links: Arc<dyn LinkGenerator>,
    notifier: Arc<dyn OperatorNotifier>,
    bin_channel: i64,
}

impl LinkPipeline {
    /// Create a pipeline that archives into `bin_channel`
    #[must_use]
    pub fn new(
        client: ResilientClient,
        links: Arc<dyn LinkGenerator>,
        notifier: Arc<dyn OperatorNotifier>,
        bin_channel: i64,
    ) -> Self {
        Self {
            forwarder: MediaForwarder::new(client.clone(), bin_channel),
            client,
            links,
            notifier,
            bin_channel,
        }
    }

    /// The client every step goes through
    #[must_use]
    pub const fn client(&self) -> &ResilientClient {
        &self.client
    }

    /// Process one media item for `request`.
    ///
    /// Inside a batch (`batch_source` set) the links are not posted to the request
    /// chat; the batch collects them instead. A group requester still gets the
    /// private copy. Returns `None` when the item could not be archived or an
    /// unexpected error occurred; in the latter case the status placeholder shows a
    /// generic failure and operators receive an alert.
    pub async fn process(
        &self,
        request: &RequestMessage,
        file: &MediaItem,
        status: Option<MessageRef>,
        use_shortener: bool,
        batch_source: Option<&RequestMessage>,
    ) -> Option<LinkRecord> {
        match self
            .try_process(request, file, status, use_shortener, batch_source.is_some())
            .await
        {
            Ok(links) => links,
            Err(e) => {
                self.report_failure(status, request.chat_id, file.message_id, &e)
                    .await;
                None
            }
        }
    }

    async fn try_process(
        &self,
        request: &RequestMessage,
        file: &MediaItem,
        status: Option<MessageRef>,
        use_shortener: bool,
        in_batch: bool,
    ) -> Result<Option<LinkRecord>> {
        let Some(stored) = self.forwarder.forward(file).await else {
            return Ok(None);
        };

        let links = self
            .links
            .generate_links(&stored, use_shortener)
            .await
            .context("Link generation failed")?;
        let buttons = build_link_buttons(&links);

        if !in_batch {
            self.client
                .send_with_buttons(
                    request.chat_id,
                    render_links(&links),
                    Some(request.message_id),
                    buttons.clone(),
                )
                .await
                .context("Failed to deliver links")?;
        }

        if !request.chat_kind.is_private() {
            self.deliver_private_copy(request, &links, buttons).await;
        }

        self.post_audit_entry(request, &stored, &links).await;

        if let Some(status) = status {
            self.client.delete_status_safe(status).await;
        }

        info!(
            chat_id = request.chat_id,
            message_id = file.message_id,
            stored_id = stored.message_id,
            "Links generated"
        );
        Ok(Some(links))
    }

    /// Archive a channel post and put the buttons under the post itself.
    ///
    /// When the buttons cannot be attached (or there are none), a regular link
    /// message is posted in the channel instead.
    pub async fn process_channel_post(
        &self,
        post: &RequestMessage,
        file: &MediaItem,
        use_shortener: bool,
    ) -> Option<LinkRecord> {
        match self.try_channel_post(post, file, use_shortener).await {
            Ok(links) => links,
            Err(e) => {
                self.report_failure(None, post.chat_id, file.message_id, &e)
                    .await;
                None
            }
        }
    }

    async fn try_channel_post(
        &self,
        post: &RequestMessage,
        file: &MediaItem,
        use_shortener: bool,
    ) -> Result<Option<LinkRecord>> {
        let Some(stored) = self.forwarder.forward(file).await else {
            return Ok(None);
        };
        let links = self
            .links
            .generate_links(&stored, use_shortener)
            .await
            .context("Link generation failed")?;

        self.post_audit_entry(post, &stored, &links).await;

        let target = MessageRef {
            chat_id: post.chat_id,
            message_id: post.message_id,
        };
        let attached = match build_link_buttons(&links) {
            Some(row) => match self.client.attach_buttons(target, row).await {
                Ok(()) => true,
                Err(e) => {
                    debug!(chat_id = post.chat_id, error = %e, "Cannot attach buttons to post");
                    false
                }
            },
            None => false,
        };

        if !attached {
            self.client
                .send_with_buttons(
                    post.chat_id,
                    render_links(&links),
                    Some(post.message_id),
                    build_link_buttons(&links),
                )
                .await
                .context("Failed to deliver links to channel")?;
        }

        Ok(Some(links))
    }

    async fn deliver_private_copy(
        &self,
        request: &RequestMessage,
        links: &LinkRecord,
        buttons: Option<ButtonRow>,
    ) {
        let Some(user) = &request.from else {
            return;
        };
        let text = render_links_dm(request.chat_title.as_deref(), links);
        if let Err(e) = self
            .client
            .send_with_buttons(user.id, text, None, buttons)
            .await
        {
            debug!(user_id = user.id, error = %e, "Private copy not delivered");
            self.notify_dm_failed(request).await;
        }
    }

    /// Tell the requester that a private message could not be delivered
    pub(crate) async fn notify_dm_failed(&self, request: &RequestMessage) {
        if let Err(e) = self
            .client
            .send_text(
                request.chat_id,
                ERROR_DM_FAILED,
                Some(request.message_id),
                None,
            )
            .await
        {
            warn!(chat_id = request.chat_id, error = %e, "Failed to send DM notice");
        }
    }

    async fn post_audit_entry(
        &self,
        request: &RequestMessage,
        stored: &StoredItem,
        links: &LinkRecord,
    ) {
        let (source, source_id) = match &request.from {
            Some(user) => (user.first_name.as_str(), user.id),
            None => (
                request.chat_title.as_deref().unwrap_or("Unknown Channel"),
                request.chat_id,
            ),
        };
        let text = render_audit_entry(source, source_id, links);
        if let Err(e) = self
            .client
            .send_text(self.bin_channel, text, Some(stored.message_id), None)
            .await
        {
            warn!(stored_id = stored.message_id, error = %e, "Failed to post audit entry");
        }
    }

    async fn report_failure(
        &self,
        status: Option<MessageRef>,
        chat_id: i64,
        message_id: i32,
        err: &anyhow::Error,
    ) {
        let error_id = correlation_token();
        error!(
            chat_id,
            message_id,
            error_id = %error_id,
            error = %format!("{err:#}"),
            "Media processing failed"
        );
        if let Some(status) = status {
            self.client
                .edit_status_safe(status, ERROR_PROCESSING_MEDIA)
                .await;
        }
        self.notifier
            .notify_operators(&render_critical_alert(&format!("{err:#}"), &error_id))
            .await;
    }
}
