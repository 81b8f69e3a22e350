//! Re-storing submitted media in the archival chat.

use super::client::{CaptionMode, MediaItem, PlatformError, StoredItem};
use super::resilient::ResilientClient;
use tracing::{debug, error};

/// Copies media into the archival chat.
#[derive(Clone)]
pub struct MediaForwarder {
    client: ResilientClient,
    bin_channel: i64,
}

impl MediaForwarder {
    /// Create a forwarder that stores into `bin_channel`
    #[must_use]
    pub fn new(client: ResilientClient, bin_channel: i64) -> Self {
        Self {
            client,
            bin_channel,
        }
    }

    /// Archive `item`.
    ///
    /// A caption over the platform limit is dropped and the copy retried once. Any
    /// other failure is logged and yields `None`; callers count it as a soft failure.
    pub async fn forward(&self, item: &MediaItem) -> Option<StoredItem> {
        match self
            .client
            .copy_media(self.bin_channel, item, CaptionMode::Keep)
            .await
        {
            Ok(message_id) => Some(StoredItem {
                message_id,
                caption: item.caption.clone(),
                media: item.clone(),
            }),
            Err(PlatformError::CaptionTooLong) => {
                debug!(
                    chat_id = item.chat_id,
                    message_id = item.message_id,
                    "Caption too long, retrying copy without caption"
                );
                match self
                    .client
                    .copy_media(self.bin_channel, item, CaptionMode::Clear)
                    .await
                {
                    Ok(message_id) => Some(StoredItem {
                        message_id,
                        caption: None,
                        media: item.clone(),
                    }),
                    Err(e) => {
                        error!(
                            chat_id = item.chat_id,
                            message_id = item.message_id,
                            error = %e,
                            "Failed to copy media without caption"
                        );
                        None
                    }
                }
            }
            Err(e) => {
                error!(
                    chat_id = item.chat_id,
                    message_id = item.message_id,
                    error = %e,
                    "Failed to copy media into archival chat"
                );
                None
            }
        }
    }
}
