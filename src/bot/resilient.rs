//! Resilient messaging utilities for Telegram API operations.
//!
//! Every remote call goes through [`call_with_flood_wait`], which honours the
//! platform's flood control: on [`PlatformError::RateLimited`] it sleeps for the
//! mandated wait and retries the same operation, with no retry cap. Other errors are
//! returned to the caller untouched.
//!
//! # Usage
//!
//! ```ignore
//! use stream_link_bot::bot::resilient::ResilientClient;
//!
//! let client = ResilientClient::new(api, CancellationToken::new());
//! let status = client.send_text(chat_id, "⏳ Processing...", Some(reply_to), None).await?;
//! client.edit_status_safe(status, "Updated!").await;
//! ```

use super::client::{
    ButtonRow, CaptionMode, MediaItem, MessageRef, PlatformError, TelegramApi,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run a remote operation, sleeping through flood-control waits.
///
/// The wait is raced against `cancel`; a cancelled token ends the loop with
/// [`PlatformError::Cancelled`].
///
/// # Errors
///
/// Returns the first error that is not a rate-limit signal.
pub async fn call_with_flood_wait<T, F, Fut>(
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    loop {
        match operation().await {
            Err(PlatformError::RateLimited { wait }) => {
                warn!(wait_secs = wait.as_secs(), "Flood wait requested, sleeping before retry");
                tokio::select! {
                    () = cancel.cancelled() => return Err(PlatformError::Cancelled),
                    () = tokio::time::sleep(wait) => {}
                }
            }
            other => return other,
        }
    }
}

/// Send something with a button row, falling back to no buttons if the row is rejected.
///
/// `send` receives the buttons to attach. When the platform refuses them the message
/// is sent once more with `None`, so button trouble never blocks the content.
///
/// # Errors
///
/// Returns any error other than a button rejection, or the error of the fallback send.
pub async fn send_with_button_fallback<T, F, Fut>(
    cancel: &CancellationToken,
    mut send: F,
    buttons: Option<ButtonRow>,
) -> Result<T, PlatformError>
where
    F: FnMut(Option<ButtonRow>) -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    match call_with_flood_wait(cancel, || send(buttons.clone())).await {
        Err(PlatformError::ButtonUrlInvalid) => {
            warn!("Platform rejected button URL, resending without buttons");
            call_with_flood_wait(cancel, || send(None)).await
        }
        other => other,
    }
}

/// A [`TelegramApi`] handle whose calls all go through [`call_with_flood_wait`].
#[derive(Clone)]
pub struct ResilientClient {
    api: Arc<dyn TelegramApi>,
    cancel: CancellationToken,
}

impl ResilientClient {
    /// Wrap a platform client
    #[must_use]
    pub fn new(api: Arc<dyn TelegramApi>, cancel: CancellationToken) -> Self {
        Self { api, cancel }
    }

    /// Send a message with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the send fails for any other reason.
    pub async fn send_text(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        reply_to: Option<i32>,
        buttons: Option<ButtonRow>,
    ) -> Result<MessageRef, PlatformError> {
        let text = text.into();
        call_with_flood_wait(&self.cancel, || {
            self.api
                .send_text(chat_id, text.clone(), reply_to, buttons.clone())
        })
        .await
    }

    /// Send a message with buttons, resending without them if they are rejected.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the send fails for any other reason.
    pub async fn send_with_buttons(
        &self,
        chat_id: i64,
        text: impl Into<String>,
        reply_to: Option<i32>,
        buttons: Option<ButtonRow>,
    ) -> Result<MessageRef, PlatformError> {
        let text = text.into();
        send_with_button_fallback(
            &self.cancel,
            |row| self.api.send_text(chat_id, text.clone(), reply_to, row),
            buttons,
        )
        .await
    }

    /// Edit a message with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the edit fails for any other reason.
    pub async fn edit_text(
        &self,
        message: MessageRef,
        text: impl Into<String>,
    ) -> Result<(), PlatformError> {
        let text = text.into();
        call_with_flood_wait(&self.cancel, || self.api.edit_text(message, text.clone())).await
    }

    /// Edit a status placeholder, tolerating edits that change nothing.
    ///
    /// # Returns
    ///
    /// - `true` if the message was edited
    /// - `false` if the edit was skipped (not modified) or failed
    pub async fn edit_status_safe(&self, message: MessageRef, text: impl Into<String>) -> bool {
        match self.edit_text(message, text).await {
            Ok(()) => true,
            Err(PlatformError::MessageNotModified) => {
                debug!(message_id = message.message_id, "Status update skipped: not modified");
                false
            }
            Err(e) => {
                warn!(message_id = message.message_id, error = %e, "Failed to edit status message");
                false
            }
        }
    }

    /// Delete a message with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the delete fails for any other reason.
    pub async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.delete_message(message)).await
    }

    /// Delete a status placeholder; failures are logged and otherwise ignored.
    pub async fn delete_status_safe(&self, message: MessageRef) {
        match self.delete_message(message).await {
            Ok(()) => {}
            Err(PlatformError::Forbidden(reason)) => {
                debug!(message_id = message.message_id, %reason, "Not allowed to delete status message");
            }
            Err(e) => {
                debug!(message_id = message.message_id, error = %e, "Failed to delete status message");
            }
        }
    }

    /// Copy media into another chat with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the copy fails for any other reason.
    pub async fn copy_media(
        &self,
        to_chat: i64,
        item: &MediaItem,
        caption: CaptionMode,
    ) -> Result<i32, PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.copy_media(to_chat, item, caption)).await
    }

    /// Fetch a run of messages with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the fetch fails for any other reason.
    pub async fn fetch_messages(
        &self,
        chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<Option<MediaItem>>, PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.fetch_messages(chat_id, ids)).await
    }

    /// Attach buttons to an existing message with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the edit fails for any other reason.
    pub async fn attach_buttons(
        &self,
        message: MessageRef,
        buttons: ButtonRow,
    ) -> Result<(), PlatformError> {
        call_with_flood_wait(&self.cancel, || {
            self.api.attach_buttons(message, buttons.clone())
        })
        .await
    }

    /// Leave a chat with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if leaving fails for any other reason.
    pub async fn leave_chat(&self, chat_id: i64) -> Result<(), PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.leave_chat(chat_id)).await
    }

    /// Check the bot's admin rights with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the lookup fails for any other reason.
    pub async fn bot_is_admin(&self, chat_id: i64) -> Result<bool, PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.bot_is_admin(chat_id)).await
    }

    /// Check chat membership with automatic flood-wait retry.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the lookup fails for any other reason.
    pub async fn is_chat_member(&self, chat_id: i64, user_id: i64) -> Result<bool, PlatformError> {
        call_with_flood_wait(&self.cancel, || self.api.is_chat_member(chat_id, user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::client::LinkButton;
    use crate::testing::{Call, FakeTelegram};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn client_for(fake: &Arc<FakeTelegram>) -> ResilientClient {
        ResilientClient::new(fake.clone(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success_waits_and_retries() {
        let attempts = AtomicUsize::new(0);
        let start = Instant::now();

        let result = call_with_flood_wait(&CancellationToken::new(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(PlatformError::RateLimited {
                        wait: Duration::from_secs(7),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_has_no_retry_cap() {
        let attempts = AtomicUsize::new(0);

        let result = call_with_flood_wait(&CancellationToken::new(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 25 {
                    Err(PlatformError::RateLimited {
                        wait: Duration::from_secs(1),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 26);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = call_with_flood_wait(&CancellationToken::new(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PlatformError::Other("boom".to_string())) }
        })
        .await;

        assert_eq!(result, Err(PlatformError::Other("boom".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_flood_wait() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result: Result<(), _> = call_with_flood_wait(&cancel, || async {
            Err(PlatformError::RateLimited {
                wait: Duration::from_secs(3600),
            })
        })
        .await;

        assert_eq!(result, Err(PlatformError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_send_has_single_side_effect() {
        let fake = Arc::new(FakeTelegram::new());
        fake.fail_next_send(PlatformError::RateLimited {
            wait: Duration::from_secs(3),
        });
        let client = client_for(&fake);

        let start = Instant::now();
        let sent = client.send_text(10, "hello", None, None).await;

        assert!(sent.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(fake.sent_to(10).len(), 1);
    }

    #[tokio::test]
    async fn test_button_rejection_resends_without_buttons() {
        let fake = Arc::new(FakeTelegram::new());
        fake.fail_next_send(PlatformError::ButtonUrlInvalid);
        let client = client_for(&fake);
        let row = vec![LinkButton::new("Stream", "https://x.test/a")];

        let sent = client.send_with_buttons(10, "links", Some(3), Some(row)).await;

        assert!(sent.is_ok());
        let sends = fake.sent_to(10);
        assert_eq!(sends.len(), 1);
        match &sends[0] {
            Call::Send { buttons, reply_to, .. } => {
                assert!(buttons.is_none());
                assert_eq!(*reply_to, Some(3));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_button_failure_propagates_from_fallback_sender() {
        let fake = Arc::new(FakeTelegram::new());
        fake.fail_next_send(PlatformError::Forbidden("bot was blocked".to_string()));
        let client = client_for(&fake);
        let row = vec![LinkButton::new("Stream", "https://x.test/a")];

        let sent = client.send_with_buttons(10, "links", None, Some(row)).await;

        assert!(matches!(sent, Err(PlatformError::Forbidden(_))));
        assert!(fake.sent_to(10).is_empty());
    }

    #[tokio::test]
    async fn test_edit_status_safe_swallows_not_modified() {
        let fake = Arc::new(FakeTelegram::new());
        fake.fail_next_edit(PlatformError::MessageNotModified);
        let client = client_for(&fake);
        let status = MessageRef {
            chat_id: 10,
            message_id: 99,
        };

        assert!(!client.edit_status_safe(status, "same").await);
        assert!(client.edit_status_safe(status, "different").await);
        assert_eq!(fake.edits().len(), 1);
    }
}
