//! Notification dispatch boundary.
//!
//! The scheduler treats delivery as fire-and-forget: a batch goes to the
//! [`NotificationDispatcher`] after a mutation commits, and a dispatch
//! failure must never affect the mutation's reported success. Callers
//! hold the dispatcher as an injected trait object, so tests can swap in
//! a recording or failing double.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use slateboard_models::ids::UserId;

/// One notification to one recipient.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient_id: UserId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver a batch. Implementations may be asynchronous internally;
    /// an `Err` here is logged by the caller and discarded.
    async fn dispatch(&self, batch: Vec<Notification>) -> anyhow::Result<()>;
}

/// Dispatcher writing one row per recipient into the `notifications`
/// outbox table, from which the delivery worker drains.
pub struct PgNotificationDispatcher {
    pool: PgPool,
}

impl PgNotificationDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationDispatcher for PgNotificationDispatcher {
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn dispatch(&self, batch: Vec<Notification>) -> anyhow::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for notification in &batch {
            sqlx::query(
                r#"INSERT INTO notifications (user_id, kind, title, message, metadata)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(notification.recipient_id)
            .bind(&notification.kind)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.metadata)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(count = batch.len(), "queued notifications");
        Ok(())
    }
}
