//! Link generation for archived media.
//!
//! The pipeline only depends on [`LinkGenerator`]; [`BaseUrlLinkGenerator`] is the
//! default implementation that serves files from a stream server rooted at
//! `stream_base_url`.

use crate::bot::buttons::quote_path;
use crate::bot::client::StoredItem;
use crate::utils::format_size;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the hash prefix that guards stream URLs
const HASH_LEN: usize = 6;

/// Links and display data produced for one archived file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkRecord {
    /// File name shown to users
    pub media_name: String,
    /// Human-readable file size
    pub media_size: String,
    /// Direct download link
    pub online_link: Option<String>,
    /// Browser player link
    pub stream_link: Option<String>,
}

/// Errors from link generation
#[derive(Debug, Error)]
pub enum LinkError {
    /// Generator is not configured
    #[error("Link generator is not configured: {0}")]
    Config(String),
    /// The shortening service failed
    #[error("Shortener error: {0}")]
    Shortener(String),
    /// Anything else
    #[error("Link generation failed: {0}")]
    Other(String),
}

/// Produces links for a stored file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkGenerator: Send + Sync {
    /// Generate links for `stored`, shortened when `shortener` is set
    async fn generate_links(
        &self,
        stored: &StoredItem,
        shortener: bool,
    ) -> Result<LinkRecord, LinkError>;
}

/// Builds `{base}/{hash}{id}/{name}` and `{base}/watch/{hash}{id}/{name}` links.
///
/// The hash is the first six hex digits of SHA-256 over the file's unique ID, so a link
/// cannot be guessed from the message ID alone. No shortening service is wired in;
/// requests for short links get the full links.
pub struct BaseUrlLinkGenerator {
    base_url: String,
}

impl BaseUrlLinkGenerator {
    /// Create a generator rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] when `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, LinkError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = url::Url::parse(trimmed)
            .map_err(|e| LinkError::Config(format!("invalid stream_base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LinkError::Config(format!(
                "stream_base_url must use http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    fn file_hash(file_unique_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_unique_id.as_bytes());
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(HASH_LEN);
        hex
    }
}

#[async_trait]
impl LinkGenerator for BaseUrlLinkGenerator {
    async fn generate_links(
        &self,
        stored: &StoredItem,
        _shortener: bool,
    ) -> Result<LinkRecord, LinkError> {
        let media = &stored.media;
        let name = media
            .file_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}_{}", media.kind.as_str(), stored.message_id));

        let key = format!(
            "{}{}/{}",
            Self::file_hash(&media.file_unique_id),
            stored.message_id,
            quote_path(&name)
        );

        Ok(LinkRecord {
            media_size: media.file_size.map(format_size).unwrap_or_default(),
            online_link: Some(format!("{}/{key}", self.base_url)),
            stream_link: Some(format!("{}/watch/{key}", self.base_url)),
            media_name: name,
        })
    }
}
