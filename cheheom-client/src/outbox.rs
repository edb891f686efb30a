//! Durable queue of background writes that could not reach the server.
//!
//! Entries are tagged with the account email they were made for and
//! replayed in order the next time that account's session is established.
//! The email is the only identity known both offline and after sign-in.

use serde::{Deserialize, Serialize};

use cheheom_shared::types::{
    Application, ApplicationStatus, FavoriteAction, Notification, Product, Review, UpdateReviewRequest,
};

use crate::error::SyncError;
use crate::remote::RemoteClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PendingSync {
    CreateApplication { application: Application },
    DeleteApplication { id: String },
    UpdateApplicationStatus { id: String, status: ApplicationStatus },
    UpdateFavorite { product_id: String, action: FavoriteAction },
    CreateProduct { product: Product },
    CreateReview { review: Review },
    UpdateReview { id: String, change: UpdateReviewRequest },
    CreateNotification { target_user_id: String, notification: Notification },
    MarkNotificationRead { id: String },
}

impl PendingSync {
    pub fn name(&self) -> &'static str {
        match self {
            PendingSync::CreateApplication { .. } => "createApplication",
            PendingSync::DeleteApplication { .. } => "deleteApplication",
            PendingSync::UpdateApplicationStatus { .. } => "updateApplicationStatus",
            PendingSync::UpdateFavorite { .. } => "updateFavorite",
            PendingSync::CreateProduct { .. } => "createProduct",
            PendingSync::CreateReview { .. } => "createReview",
            PendingSync::UpdateReview { .. } => "updateReview",
            PendingSync::CreateNotification { .. } => "createNotification",
            PendingSync::MarkNotificationRead { .. } => "markNotificationRead",
        }
    }

    /// Send this write to the server.
    pub async fn send(&self, remote: &RemoteClient, token: &str) -> Result<(), SyncError> {
        match self {
            PendingSync::CreateApplication { application } => {
                remote.create_application(token, application).await.map(drop)
            }
            PendingSync::DeleteApplication { id } => remote.delete_application(token, id).await,
            PendingSync::UpdateApplicationStatus { id, status } => {
                remote.update_application_status(token, id, *status).await.map(drop)
            }
            PendingSync::UpdateFavorite { product_id, action } => {
                remote.update_favorite(token, product_id, *action).await.map(drop)
            }
            PendingSync::CreateProduct { product } => remote.create_product(token, product).await.map(drop),
            PendingSync::CreateReview { review } => remote.create_review(token, review).await.map(drop),
            PendingSync::UpdateReview { id, change } => remote.update_review(token, id, change).await.map(drop),
            PendingSync::CreateNotification { target_user_id, notification } => remote
                .create_notification(token, target_user_id, notification)
                .await
                .map(drop),
            PendingSync::MarkNotificationRead { id } => remote.mark_notification_read(token, id).await.map(drop),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub account: String,
    #[serde(flatten)]
    pub op: PendingSync,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outbox {
    entries: Vec<OutboxEntry>,
}

#[derive(Debug, Default, PartialEq)]
pub struct FlushSummary {
    pub sent: usize,
    pub dropped: usize,
    pub remaining: usize,
    /// Ops the server refused outright, in replay order.
    pub rejected: Vec<PendingSync>,
}

impl FlushSummary {
    pub fn was_rejected(&self, op: &PendingSync) -> bool {
        self.rejected.contains(op)
    }
}

impl Outbox {
    pub fn push(&mut self, account: &str, op: PendingSync) {
        self.entries.push(OutboxEntry {
            account: account.to_string(),
            op,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_for<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a PendingSync> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.account == account)
            .map(|e| &e.op)
    }

    /// Replay `account`'s entries in order.
    ///
    /// A transient failure stops the flush and keeps that entry and everything
    /// after it. Entries the server rejects outright are dropped and handed
    /// back in [`FlushSummary::rejected`] so the caller can undo them locally.
    pub async fn flush(&mut self, remote: &RemoteClient, token: &str, account: &str) -> FlushSummary {
        let mut summary = FlushSummary::default();
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut stalled = false;

        for entry in std::mem::take(&mut self.entries) {
            if stalled || entry.account != account {
                kept.push(entry);
                continue;
            }

            match entry.op.send(remote, token).await {
                Ok(()) => summary.sent += 1,
                Err(e) if e.is_transient() => {
                    tracing::debug!(op = entry.op.name(), error = %e, "outbox flush stalled");
                    stalled = true;
                    kept.push(entry);
                }
                Err(e) => {
                    tracing::warn!(op = entry.op.name(), error = %e, "server rejected queued write; dropping it");
                    summary.dropped += 1;
                    summary.rejected.push(entry.op);
                }
            }
        }

        self.entries = kept;
        summary.remaining = self.entries.len();
        if summary.sent > 0 || summary.dropped > 0 {
            tracing::info!(sent = summary.sent, dropped = summary.dropped, remaining = summary.remaining, "outbox flushed");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn entries_serialize_with_op_tag() {
        let mut outbox = Outbox::default();
        outbox.push(
            "fan@example.com",
            PendingSync::UpdateFavorite {
                product_id: "p1".into(),
                action: FavoriteAction::Add,
            },
        );
        let value = serde_json::to_value(&outbox).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"account": "fan@example.com", "op": "updateFavorite", "productId": "p1", "action": "add"}])
        );

        let back: Outbox = serde_json::from_value(value).unwrap();
        assert_eq!(back, outbox);
    }

    #[tokio::test]
    async fn unreachable_server_keeps_entries_in_order() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            legacy_prefix: String::new(),
            timeout_ms: 2_000,
            ..ClientConfig::default()
        };
        let remote = RemoteClient::new(&config).unwrap();

        let mut outbox = Outbox::default();
        outbox.push("a@example.com", PendingSync::DeleteApplication { id: "a1".into() });
        outbox.push("b@example.com", PendingSync::MarkNotificationRead { id: "n1".into() });
        outbox.push("a@example.com", PendingSync::MarkNotificationRead { id: "n2".into() });

        let summary = outbox.flush(&remote, "token", "a@example.com").await;
        assert_eq!(summary.sent, 0);
        assert!(summary.rejected.is_empty());
        assert_eq!(summary.remaining, 3);
        assert_eq!(outbox.pending_for("a@example.com").count(), 2);
        assert_eq!(outbox.pending_for("b@example.com").count(), 1);
    }
}
