//! User-facing texts
//!
//! All texts are sent in HTML parse mode; every interpolated value is escaped here.

use crate::config::OPERATOR_ALERT_MAX_CHARS;
use crate::links::LinkRecord;
use crate::utils::truncate_str;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Shown in place of a missing file name or size
pub const UNKNOWN: &str = "Unknown";
/// Shown in place of a missing link
pub const NOT_AVAILABLE: &str = "N/A";

// ─────────────────────────────────────────────────────────────────────────────
// Buttons
// ─────────────────────────────────────────────────────────────────────────────

/// Label of the stream button
pub const BUTTON_STREAM: &str = "🖥️ Stream now";
/// Label of the download button
pub const BUTTON_DOWNLOAD: &str = "📥 Download";

// ─────────────────────────────────────────────────────────────────────────────
// Status placeholders and notices
// ─────────────────────────────────────────────────────────────────────────────

/// Placeholder while a `/link` request is handled
pub const PROCESSING_REQUEST: &str = "⏳ <b>Processing your request...</b>";
/// Placeholder while a privately sent file is handled
pub const PROCESSING_FILE: &str = "⏳ <b>Processing your file...</b>";
/// Generic failure shown to the requester
pub const ERROR_PROCESSING_MEDIA: &str =
    "❌ <b>Error processing media.</b> Please try again later.";
/// Private copy could not be delivered
pub const ERROR_DM_FAILED: &str =
    "⚠️ I could not send you a private message. Start a chat with me and try again.";
/// `/link` without a reply
pub const ERROR_REPLY_FILE: &str = "⚠️ Reply to a file with <code>/link</code> to get its links.";
/// `/link` replying to a message without media
pub const ERROR_NO_FILE: &str = "⚠️ The replied message does not contain a file.";
/// Bot lacks admin rights in the group
pub const ERROR_NOT_ADMIN: &str = "⚠️ Make me an administrator of this group first.";
/// `/link` argument is not a positive number
pub const ERROR_INVALID_COUNT: &str =
    "⚠️ Usage: <code>/link</code> or <code>/link N</code> where N is a positive number.";

/// Requested batch exceeds the configured maximum
#[must_use]
pub fn batch_too_large(max: usize) -> String {
    format!("⚠️ You can process at most <b>{max}</b> files at once.")
}

// ─────────────────────────────────────────────────────────────────────────────
// Link delivery
// ─────────────────────────────────────────────────────────────────────────────

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

fn link_or_na(link: Option<&str>) -> String {
    match link.filter(|l| !l.trim().is_empty()) {
        Some(url) => format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(url),
            encode_text(url)
        ),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Link message for a single file
#[must_use]
pub fn render_links(links: &LinkRecord) -> String {
    let name = or_fallback(Some(&links.media_name), UNKNOWN);
    let size = or_fallback(Some(&links.media_size), UNKNOWN);
    format!(
        "🔗 <b>Your links are ready!</b>\n\n\
         📄 <b>File:</b> <code>{}</code>\n\
         📦 <b>Size:</b> {}\n\n\
         📥 <b>Download:</b> {}\n\
         🖥️ <b>Stream:</b> {}",
        encode_text(name),
        encode_text(size),
        link_or_na(links.online_link.as_deref()),
        link_or_na(links.stream_link.as_deref()),
    )
}

/// Private copy of a single file's links
#[must_use]
pub fn render_links_dm(chat_title: Option<&str>, links: &LinkRecord) -> String {
    format!(
        "📬 Links for your file from <b>{}</b>:\n{}",
        encode_text(or_fallback(chat_title, "the chat")),
        render_links(links)
    )
}

/// One consolidated delivery message of a batch
#[must_use]
pub fn render_batch_chunk(links: &[String]) -> String {
    let mut text = format!("📦 <b>Batch links ({})</b>\n", links.len());
    for (index, link) in links.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, link_or_na(Some(link))));
    }
    text
}

/// Private copy of a batch delivery message
#[must_use]
pub fn render_batch_chunk_dm(chat_title: Option<&str>, links: &[String]) -> String {
    format!(
        "📬 Batch links from <b>{}</b>:\n\n{}",
        encode_text(or_fallback(chat_title, "the chat")),
        render_batch_chunk(links)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch progress
// ─────────────────────────────────────────────────────────────────────────────

/// Header shown when a fetch window starts
#[must_use]
pub fn render_window_progress(window: usize, windows: usize, size: usize) -> String {
    format!("⏳ <b>Processing batch {window}/{windows}</b> ({size} files)")
}

/// Running tally
#[must_use]
pub fn render_tally(processed: usize, failed: usize, total: usize) -> String {
    format!(
        "⏳ <b>Progress:</b> {}/{total}\n✅ Processed: {processed}\n❌ Failed: {failed}",
        processed + failed
    )
}

/// Final batch summary
#[must_use]
pub fn render_summary(processed: usize, failed: usize, total: usize) -> String {
    format!(
        "✅ <b>Batch complete</b>\n\n📊 Total: {total}\n✅ Processed: {processed}\n❌ Failed: {failed}"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Archival chat and operators
// ─────────────────────────────────────────────────────────────────────────────

/// Audit entry posted in the archival chat next to the stored copy
#[must_use]
pub fn render_audit_entry(source: &str, source_id: i64, links: &LinkRecord) -> String {
    format!(
        "🆕 <b>New file request</b>\n\n\
         👤 <b>From:</b> {}\n\
         🆔 <b>ID:</b> <code>{source_id}</code>\n\n\
         📥 <b>Download:</b> {}\n\
         🖥️ <b>Stream:</b> {}",
        encode_text(or_fallback(Some(source), UNKNOWN)),
        link_or_na(links.online_link.as_deref()),
        link_or_na(links.stream_link.as_deref()),
    )
}

/// Operator alert for an unexpected failure
#[must_use]
pub fn render_critical_alert(error: &str, error_id: &str) -> String {
    format!(
        "🚨 <b>Critical error</b>\n\n<b>Error ID:</b> <code>{}</code>\n<pre>{}</pre>",
        encode_text(error_id),
        encode_text(&truncate_str(error, OPERATOR_ALERT_MAX_CHARS))
    )
}
