//! Testing helpers and mock utilities.
//!
//! Provides a recording in-memory [`TelegramApi`] and convenient constructors for
//! mocked collaborators.

use crate::bot::client::{
    ButtonRow, CaptionMode, ChatKind, MediaItem, MediaKind, MessageRef, PlatformError,
    RequestMessage, Requester, TelegramApi,
};
use crate::bot::notify::MockOperatorNotifier;
use crate::links::{LinkRecord, MockLinkGenerator};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

/// Archival chat used throughout the tests
pub const BIN_CHANNEL: i64 = -100_777;

/// A successful remote call recorded by [`FakeTelegram`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `send_text`
    Send {
        /// Target chat
        chat_id: i64,
        /// Message text
        text: String,
        /// Replied-to message
        reply_to: Option<i32>,
        /// Attached buttons
        buttons: Option<ButtonRow>,
    },
    /// `edit_text`
    Edit {
        /// Edited message
        message: MessageRef,
        /// New text
        text: String,
    },
    /// `delete_message`
    Delete {
        /// Deleted message
        message: MessageRef,
    },
    /// `copy_media`
    Copy {
        /// Destination chat
        to_chat: i64,
        /// Source message
        message_id: i32,
        /// Caption handling
        caption: CaptionMode,
    },
    /// `fetch_messages`
    Fetch {
        /// Source chat
        chat_id: i64,
        /// Requested ids
        ids: Vec<i32>,
    },
    /// `attach_buttons`
    AttachButtons {
        /// Target message
        message: MessageRef,
        /// Attached buttons
        buttons: ButtonRow,
    },
    /// `leave_chat`
    Leave {
        /// Left chat
        chat_id: i64,
    },
}

/// In-memory platform that records successful calls and replays scripted failures.
///
/// Scripted failures are consumed in order; a failed call is not recorded.
#[derive(Default)]
pub struct FakeTelegram {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    send_failures: Mutex<VecDeque<PlatformError>>,
    edit_failures: Mutex<VecDeque<PlatformError>>,
    delete_failures: Mutex<VecDeque<PlatformError>>,
    copy_failures: Mutex<VecDeque<PlatformError>>,
    fetch_failures: Mutex<VecDeque<PlatformError>>,
    attach_failures: Mutex<VecDeque<PlatformError>>,
    blocked_chats: Mutex<HashSet<i64>>,
    media: Mutex<HashMap<(i64, i32), MediaItem>>,
    admin_chats: Mutex<HashSet<i64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("fake telegram mutex poisoned")
}

fn pop(queue: &Mutex<VecDeque<PlatformError>>) -> Option<PlatformError> {
    lock(queue).pop_front()
}

impl FakeTelegram {
    /// Create an empty fake
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            ..Self::default()
        }
    }

    /// Make the next `send_text` fail
    pub fn fail_next_send(&self, err: PlatformError) {
        lock(&self.send_failures).push_back(err);
    }

    /// Make the next `edit_text` fail
    pub fn fail_next_edit(&self, err: PlatformError) {
        lock(&self.edit_failures).push_back(err);
    }

    /// Make the next `delete_message` fail
    pub fn fail_next_delete(&self, err: PlatformError) {
        lock(&self.delete_failures).push_back(err);
    }

    /// Make the next `copy_media` fail
    pub fn fail_next_copy(&self, err: PlatformError) {
        lock(&self.copy_failures).push_back(err);
    }

    /// Make every `copy_media` fail with a non-recoverable error
    pub fn fail_all_copies(&self, times: usize) {
        let mut queue = lock(&self.copy_failures);
        for _ in 0..times {
            queue.push_back(PlatformError::Other("CHAT_WRITE_FORBIDDEN".to_string()));
        }
    }

    /// Make the next `fetch_messages` fail
    pub fn fail_next_fetch(&self, err: PlatformError) {
        lock(&self.fetch_failures).push_back(err);
    }

    /// Make the next `attach_buttons` fail
    pub fn fail_next_attach(&self, err: PlatformError) {
        lock(&self.attach_failures).push_back(err);
    }

    /// Reject every message sent to `chat_id` (e.g. a user who never started the bot)
    pub fn block_chat(&self, chat_id: i64) {
        lock(&self.blocked_chats).insert(chat_id);
    }

    /// Mark the bot as administrator of `chat_id`
    pub fn grant_admin(&self, chat_id: i64) {
        lock(&self.admin_chats).insert(chat_id);
    }

    /// Make a media message available to `fetch_messages`
    pub fn put_media(&self, item: MediaItem) {
        lock(&self.media).insert((item.chat_id, item.message_id), item);
    }

    /// All recorded calls in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Recorded sends to one chat
    #[must_use]
    pub fn sent_to(&self, chat_id: i64) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { chat_id: id, .. } if *id == chat_id))
            .collect()
    }

    /// Texts of recorded sends to one chat
    #[must_use]
    pub fn texts_sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent_to(chat_id)
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Recorded edits as `(message, text)`
    #[must_use]
    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { message, text } => Some((message, text)),
                _ => None,
            })
            .collect()
    }

    /// Recorded deletes
    #[must_use]
    pub fn deletes(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Recorded copies as `(source message, caption mode)`
    #[must_use]
    pub fn copies(&self) -> Vec<(i32, CaptionMode)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Copy {
                    message_id, caption, ..
                } => Some((message_id, caption)),
                _ => None,
            })
            .collect()
    }

    /// Recorded fetch windows
    #[must_use]
    pub fn fetches(&self) -> Vec<Vec<i32>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fetch { ids, .. } => Some(ids),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn next_message_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl TelegramApi for FakeTelegram {
    async fn send_text(
        &self,
        chat_id: i64,
        text: String,
        reply_to: Option<i32>,
        buttons: Option<ButtonRow>,
    ) -> Result<MessageRef, PlatformError> {
        if let Some(err) = pop(&self.send_failures) {
            return Err(err);
        }
        if lock(&self.blocked_chats).contains(&chat_id) {
            return Err(PlatformError::Forbidden("bot can't initiate conversation".to_string()));
        }
        self.record(Call::Send {
            chat_id,
            text,
            reply_to,
            buttons,
        });
        Ok(MessageRef {
            chat_id,
            message_id: self.next_message_id(),
        })
    }

    async fn edit_text(&self, message: MessageRef, text: String) -> Result<(), PlatformError> {
        if let Some(err) = pop(&self.edit_failures) {
            return Err(err);
        }
        self.record(Call::Edit { message, text });
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), PlatformError> {
        if let Some(err) = pop(&self.delete_failures) {
            return Err(err);
        }
        self.record(Call::Delete { message });
        Ok(())
    }

    async fn copy_media(
        &self,
        to_chat: i64,
        item: &MediaItem,
        caption: CaptionMode,
    ) -> Result<i32, PlatformError> {
        if let Some(err) = pop(&self.copy_failures) {
            return Err(err);
        }
        self.record(Call::Copy {
            to_chat,
            message_id: item.message_id,
            caption,
        });
        Ok(self.next_message_id())
    }

    async fn fetch_messages(
        &self,
        chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<Option<MediaItem>>, PlatformError> {
        if let Some(err) = pop(&self.fetch_failures) {
            return Err(err);
        }
        self.record(Call::Fetch {
            chat_id,
            ids: ids.to_vec(),
        });
        let media = lock(&self.media);
        Ok(ids
            .iter()
            .map(|id| media.get(&(chat_id, *id)).cloned())
            .collect())
    }

    async fn attach_buttons(
        &self,
        message: MessageRef,
        buttons: ButtonRow,
    ) -> Result<(), PlatformError> {
        if let Some(err) = pop(&self.attach_failures) {
            return Err(err);
        }
        self.record(Call::AttachButtons { message, buttons });
        Ok(())
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<(), PlatformError> {
        self.record(Call::Leave { chat_id });
        Ok(())
    }

    async fn bot_is_admin(&self, chat_id: i64) -> Result<bool, PlatformError> {
        Ok(lock(&self.admin_chats).contains(&chat_id))
    }

    async fn is_chat_member(&self, _chat_id: i64, user_id: i64) -> Result<bool, PlatformError> {
        Ok(!lock(&self.blocked_chats).contains(&user_id))
    }
}

/// A document message in `chat_id`
#[must_use]
pub fn media(chat_id: i64, message_id: i32) -> MediaItem {
    MediaItem {
        chat_id,
        message_id,
        sender: Some(42),
        kind: MediaKind::Document,
        file_unique_id: format!("uniq{message_id}"),
        file_name: Some(format!("file {message_id}.mkv")),
        file_size: Some(1024 * 1024),
        caption: Some("caption".to_string()),
    }
}

/// A request made by user 42 in a private chat
#[must_use]
pub fn private_request(message_id: i32) -> RequestMessage {
    RequestMessage {
        chat_id: 42,
        chat_kind: ChatKind::Private,
        chat_title: None,
        message_id,
        from: Some(Requester {
            id: 42,
            first_name: "Alice".to_string(),
        }),
    }
}

/// A request made by user 42 in group `-500`
#[must_use]
pub fn group_request(message_id: i32) -> RequestMessage {
    RequestMessage {
        chat_id: -500,
        chat_kind: ChatKind::Supergroup,
        chat_title: Some("Movie Club".to_string()),
        message_id,
        from: Some(Requester {
            id: 42,
            first_name: "Alice".to_string(),
        }),
    }
}

/// A post in channel `-900`
#[must_use]
pub fn channel_post(message_id: i32) -> RequestMessage {
    RequestMessage {
        chat_id: -900,
        chat_kind: ChatKind::Channel,
        chat_title: Some("Releases".to_string()),
        message_id,
        from: None,
    }
}

/// Links for a stored copy, derived from its archival message ID
#[must_use]
pub fn links_for(message_id: i32) -> LinkRecord {
    LinkRecord {
        media_name: format!("file {message_id}.mkv"),
        media_size: "1.00 MiB".to_string(),
        online_link: Some(format!("https://dl.test/{message_id}")),
        stream_link: Some(format!("https://dl.test/watch/{message_id}")),
    }
}

/// Create a mock link generator that always succeeds.
///
/// Links are derived from the archival message ID with [`links_for`].
#[must_use]
pub fn mock_links_ok() -> MockLinkGenerator {
    let mut mock = MockLinkGenerator::new();
    mock.expect_generate_links()
        .returning(|stored, _| Ok(links_for(stored.message_id)));
    mock
}

/// Create a mock notifier that accepts any number of alerts
#[must_use]
pub fn mock_notifier_noop() -> MockOperatorNotifier {
    let mut mock = MockOperatorNotifier::new();
    mock.expect_notify_operators().returning(|_| ());
    mock
}

/// Shared handle to a fresh fake
#[must_use]
pub fn fake() -> Arc<FakeTelegram> {
    Arc::new(FakeTelegram::new())
}
