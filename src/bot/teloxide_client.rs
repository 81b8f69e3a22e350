//! [`TelegramApi`] on top of teloxide.
//!
//! This is the only place that looks at teloxide error types. Errors that teloxide
//! does not model as their own variant are recognized by the Bot API description text.

use super::client::{
    ButtonRow, CaptionMode, ChatKind, MediaItem, MediaKind, MessageRef, PlatformError,
    RequestMessage, Requester, TelegramApi,
};
use super::message_cache::MessageCache;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::requests::Requester as _;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions, MessageId,
    ParseMode, ReplyParameters, UserId,
};
use teloxide::{ApiError, RequestError};

const BUTTON_URL_INVALID: &str = "BUTTON_URL_INVALID";
const CAPTION_TOO_LONG: &str = "MEDIA_CAPTION_TOO_LONG";
const NOT_MODIFIED: &str = "message is not modified";

/// Classify a teloxide request error
#[must_use]
pub fn classify_request_error(err: &RequestError) -> PlatformError {
    match err {
        RequestError::RetryAfter(wait) => PlatformError::RateLimited {
            wait: wait.duration(),
        },
        RequestError::Api(api) => classify_api_error(api),
        other => PlatformError::Other(other.to_string()),
    }
}

fn classify_api_error(err: &ApiError) -> PlatformError {
    match err {
        ApiError::ButtonUrlInvalid => PlatformError::ButtonUrlInvalid,
        ApiError::MessageNotModified => PlatformError::MessageNotModified,
        ApiError::MessageCantBeDeleted
        | ApiError::MessageCantBeEdited
        | ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::CantInitiateConversation
        | ApiError::NotEnoughRightsToPostMessages => PlatformError::Forbidden(err.to_string()),
        ApiError::ChatNotFound
        | ApiError::MessageToDeleteNotFound
        | ApiError::MessageToEditNotFound => PlatformError::NotFound(err.to_string()),
        other => classify_description(&other.to_string()),
    }
}

/// Fallback for errors teloxide reports as plain text
fn classify_description(description: &str) -> PlatformError {
    if description.contains(BUTTON_URL_INVALID) {
        PlatformError::ButtonUrlInvalid
    } else if description.contains(CAPTION_TOO_LONG) {
        PlatformError::CaptionTooLong
    } else if description.contains(NOT_MODIFIED) {
        PlatformError::MessageNotModified
    } else if description.starts_with("Forbidden") {
        PlatformError::Forbidden(description.to_string())
    } else {
        PlatformError::Other(description.to_string())
    }
}

fn markup(buttons: ButtonRow) -> Result<InlineKeyboardMarkup, PlatformError> {
    let row = buttons
        .into_iter()
        .map(|button| {
            url::Url::parse(&button.url)
                .map(|url| InlineKeyboardButton::url(button.label, url))
                .map_err(|_| PlatformError::ButtonUrlInvalid)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(InlineKeyboardMarkup::new(vec![row]))
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn user_id(id: i64) -> Result<UserId, PlatformError> {
    u64::try_from(id)
        .map(UserId)
        .map_err(|_| PlatformError::Other(format!("invalid user id {id}")))
}

/// Extract the media attachment of a message, if it has one
#[must_use]
pub fn media_item_from(msg: &Message) -> Option<MediaItem> {
    let (kind, file, file_name) = if let Some(doc) = msg.document() {
        (MediaKind::Document, &doc.file, doc.file_name.clone())
    } else if let Some(video) = msg.video() {
        (MediaKind::Video, &video.file, video.file_name.clone())
    } else if let Some(audio) = msg.audio() {
        (MediaKind::Audio, &audio.file, audio.file_name.clone())
    } else if let Some(photo) = msg.photo().and_then(<[_]>::last) {
        (MediaKind::Photo, &photo.file, None)
    } else if let Some(voice) = msg.voice() {
        (MediaKind::Voice, &voice.file, None)
    } else if let Some(animation) = msg.animation() {
        (MediaKind::Animation, &animation.file, animation.file_name.clone())
    } else if let Some(note) = msg.video_note() {
        (MediaKind::VideoNote, &note.file, None)
    } else {
        return None;
    };

    Some(MediaItem {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender: msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()),
        kind,
        file_unique_id: file.unique_id.to_string(),
        file_name,
        file_size: Some(u64::from(file.size)),
        caption: msg.caption().map(ToString::to_string),
    })
}

/// Describe the chat and sender of an inbound message
#[must_use]
pub fn request_from(msg: &Message) -> RequestMessage {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else if msg.chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    };

    RequestMessage {
        chat_id: msg.chat.id.0,
        chat_kind,
        chat_title: msg.chat.title().map(ToString::to_string),
        message_id: msg.id.0,
        from: msg.from.as_ref().and_then(|user| {
            i64::try_from(user.id.0).ok().map(|id| Requester {
                id,
                first_name: user.first_name.clone(),
            })
        }),
    }
}

/// Live Telegram client
#[derive(Clone)]
pub struct TeloxideClient {
    bot: Bot,
    bot_id: UserId,
    cache: MessageCache,
}

impl TeloxideClient {
    /// Connect with `bot`, resolving the bot's own user ID
    ///
    /// # Errors
    ///
    /// Returns the classified error if `getMe` fails.
    pub async fn connect(bot: Bot, cache: MessageCache) -> Result<Self, PlatformError> {
        let me = bot
            .get_me()
            .await
            .map_err(|e| classify_request_error(&e))?;
        Ok(Self {
            bot_id: me.user.id,
            bot,
            cache,
        })
    }
}

#[async_trait]
impl TelegramApi for TeloxideClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: String,
        reply_to: Option<i32>,
        buttons: Option<ButtonRow>,
    ) -> Result<MessageRef, PlatformError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview());
        if let Some(id) = reply_to {
            request = request
                .reply_parameters(ReplyParameters::new(MessageId(id)).allow_sending_without_reply());
        }
        if let Some(buttons) = buttons {
            request = request.reply_markup(markup(buttons)?);
        }
        let sent = request.await.map_err(|e| classify_request_error(&e))?;
        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn edit_text(&self, message: MessageRef, text: String) -> Result<(), PlatformError> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .await
            .map(|_| ())
            .map_err(|e| classify_request_error(&e))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await
            .map(|_| ())
            .map_err(|e| classify_request_error(&e))
    }

    async fn copy_media(
        &self,
        to_chat: i64,
        item: &MediaItem,
        caption: CaptionMode,
    ) -> Result<i32, PlatformError> {
        let mut request = self.bot.copy_message(
            ChatId(to_chat),
            ChatId(item.chat_id),
            MessageId(item.message_id),
        );
        if caption == CaptionMode::Clear {
            request = request.caption(String::new());
        }
        request
            .await
            .map(|id| id.0)
            .map_err(|e| classify_request_error(&e))
    }

    async fn fetch_messages(
        &self,
        chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<Option<MediaItem>>, PlatformError> {
        Ok(self.cache.lookup(chat_id, ids).await)
    }

    async fn attach_buttons(
        &self,
        message: MessageRef,
        buttons: ButtonRow,
    ) -> Result<(), PlatformError> {
        self.bot
            .edit_message_reply_markup(ChatId(message.chat_id), MessageId(message.message_id))
            .reply_markup(markup(buttons)?)
            .await
            .map(|_| ())
            .map_err(|e| classify_request_error(&e))
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<(), PlatformError> {
        self.bot
            .leave_chat(ChatId(chat_id))
            .await
            .map(|_| ())
            .map_err(|e| classify_request_error(&e))
    }

    async fn bot_is_admin(&self, chat_id: i64) -> Result<bool, PlatformError> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), self.bot_id)
            .await
            .map_err(|e| classify_request_error(&e))?;
        Ok(member.kind.is_privileged())
    }

    async fn is_chat_member(&self, chat_id: i64, user_id_raw: i64) -> Result<bool, PlatformError> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), user_id(user_id_raw)?)
            .await
            .map_err(|e| classify_request_error(&e))?;
        Ok(member.kind.is_present())
    }
}
