//! Operator alerts.

use super::resilient::ResilientClient;
use async_trait::async_trait;
use tracing::warn;

/// Fire-and-forget alert channel for internal errors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    /// Deliver `message` (HTML) to the operators. Never fails.
    async fn notify_operators(&self, message: &str);
}

/// Sends alerts as private messages to every configured owner
pub struct OwnerNotifier {
    client: ResilientClient,
    owner_ids: Vec<i64>,
}

impl OwnerNotifier {
    /// Create a notifier for the given owners
    #[must_use]
    pub fn new(client: ResilientClient, owner_ids: impl IntoIterator<Item = i64>) -> Self {
        let mut owner_ids: Vec<i64> = owner_ids.into_iter().collect();
        owner_ids.sort_unstable();
        Self { client, owner_ids }
    }
}

#[async_trait]
impl OperatorNotifier for OwnerNotifier {
    async fn notify_operators(&self, message: &str) {
        if self.owner_ids.is_empty() {
            warn!("No owners configured, operator alert dropped");
            return;
        }
        for owner in &self.owner_ids {
            if let Err(e) = self.client.send_text(*owner, message, None, None).await {
                warn!(owner_id = owner, error = %e, "Failed to deliver operator alert");
            }
        }
    }
}
