//! Platform client boundary.
//!
//! Every remote call the pipeline makes goes through [`TelegramApi`]. Implementations
//! translate their transport errors into [`PlatformError`] so the rest of the crate can
//! switch on the error kind instead of inspecting message text.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the chat platform, grouped by how callers react to them
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Flood control: the platform asks the caller to wait before retrying
    #[error("Rate limited, retry after {}s", wait.as_secs())]
    RateLimited {
        /// Wait mandated by the platform
        wait: Duration,
    },
    /// An inline button carried a URL the platform refuses
    #[error("Button URL is invalid")]
    ButtonUrlInvalid,
    /// Media caption is longer than the platform allows
    #[error("Media caption is too long")]
    CaptionTooLong,
    /// Edit would not change the message content
    #[error("Message is not modified")]
    MessageNotModified,
    /// Missing rights, blocked bot, or a message that may not be touched
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Target chat or message does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// The surrounding operation was cancelled while waiting
    #[error("Operation cancelled")]
    Cancelled,
    /// Anything else
    #[error("Telegram error: {0}")]
    Other(String),
}

/// Kind of chat a message lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with a user
    Private,
    /// Basic group
    Group,
    /// Supergroup
    Supergroup,
    /// Broadcast channel
    Channel,
}

impl ChatKind {
    /// Returns true for one-to-one chats
    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }

    /// Returns true for basic groups and supergroups
    #[must_use]
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// The user behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Telegram user ID
    pub id: i64,
    /// Display name
    pub first_name: String,
}

/// The message that triggered processing (a command, a private upload or a channel post)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    /// Chat the request was made in
    pub chat_id: i64,
    /// Kind of that chat
    pub chat_kind: ChatKind,
    /// Chat title for groups and channels
    pub chat_title: Option<String>,
    /// ID of the request message
    pub message_id: i32,
    /// Sender, when the platform exposes one
    pub from: Option<Requester>,
}

/// Attachment kind of a media message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Generic file
    Document,
    /// Video
    Video,
    /// Audio track
    Audio,
    /// Photo
    Photo,
    /// Voice note
    Voice,
    /// GIF-like animation
    Animation,
    /// Round video note
    VideoNote,
}

impl MediaKind {
    /// Lowercase name used in fallback file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Photo => "photo",
            Self::Voice => "voice",
            Self::Animation => "animation",
            Self::VideoNote => "video_note",
        }
    }
}

/// A chat message carrying a media attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Chat the message lives in
    pub chat_id: i64,
    /// Message ID inside that chat
    pub message_id: i32,
    /// Sender, if known
    pub sender: Option<i64>,
    /// Attachment kind
    pub kind: MediaKind,
    /// Platform-wide stable file identifier
    pub file_unique_id: String,
    /// Original file name, if the attachment has one
    pub file_name: Option<String>,
    /// File size in bytes
    pub file_size: Option<u64>,
    /// Caption attached to the message
    pub caption: Option<String>,
}

/// The archived copy of a media item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    /// Message ID inside the archival chat
    pub message_id: i32,
    /// Caption kept on the copy (`None` when it had to be dropped)
    pub caption: Option<String>,
    /// The source the copy was made from
    pub media: MediaItem,
}

/// Address of a message the bot sent or received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat ID
    pub chat_id: i64,
    /// Message ID
    pub message_id: i32,
}

/// URL button shown under a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    /// Button label
    pub label: String,
    /// Target URL
    pub url: String,
}

impl LinkButton {
    /// Create a new URL button
    #[must_use]
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// A single row of URL buttons
pub type ButtonRow = Vec<LinkButton>;

/// What to do with the caption when copying media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionMode {
    /// Keep the source caption
    Keep,
    /// Drop the caption, keep the content
    Clear,
}

/// Remote operations the pipeline needs from the chat platform.
///
/// Text is always sent as HTML with link previews disabled.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Send a text message, optionally as a reply and with a button row
    async fn send_text(
        &self,
        chat_id: i64,
        text: String,
        reply_to: Option<i32>,
        buttons: Option<ButtonRow>,
    ) -> Result<MessageRef, PlatformError>;

    /// Replace the text of a message
    async fn edit_text(&self, message: MessageRef, text: String) -> Result<(), PlatformError>;

    /// Delete a message
    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError>;

    /// Copy a media message into another chat, returning the new message ID
    async fn copy_media(
        &self,
        to_chat: i64,
        item: &MediaItem,
        caption: CaptionMode,
    ) -> Result<i32, PlatformError>;

    /// Fetch a run of messages in one call.
    ///
    /// The result is aligned with `ids`; `None` marks a message that does not exist
    /// or carries no media.
    async fn fetch_messages(
        &self,
        chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<Option<MediaItem>>, PlatformError>;

    /// Attach a button row to an existing message
    async fn attach_buttons(
        &self,
        message: MessageRef,
        buttons: ButtonRow,
    ) -> Result<(), PlatformError>;

    /// Leave a chat
    async fn leave_chat(&self, chat_id: i64) -> Result<(), PlatformError>;

    /// Whether the bot itself is an administrator of the chat
    async fn bot_is_admin(&self, chat_id: i64) -> Result<bool, PlatformError>;

    /// Whether a user is currently a member of the chat
    async fn is_chat_member(&self, chat_id: i64, user_id: i64) -> Result<bool, PlatformError>;
}
