//! Notification store: push endpoints and the per-user inbox

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::StoredNotification;
use crate::error::ApiError;

/// Persistence for push endpoints and stored notifications.
#[derive(Clone)]
pub struct NotificationService {
    db_pool: PgPool,
}

impl NotificationService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Register a push endpoint for a user. Idempotent: registering the
    /// same token twice leaves exactly one row.
    pub async fn register_endpoint(&self, user_id: Uuid, token: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO push_tokens (user_id, token, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .context("Failed to register push endpoint")?;

        Ok(())
    }

    /// All push endpoints registered by a user.
    pub async fn endpoints_for(&self, user_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM push_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.db_pool)
                .await
                .context("Failed to load push endpoints")?;

        Ok(rows.into_iter().map(|(token,)| token).collect())
    }

    /// Record an inbox copy of a dispatched notification.
    pub async fn store(&self, user_id: Uuid, title: &str, body: &str) -> Result<StoredNotification> {
        let notification = sqlx::query_as::<_, StoredNotification>(
            r#"
            INSERT INTO notifications (id, user_id, title, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .context("Failed to store notification")?;

        Ok(notification)
    }

    /// All stored notifications for a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<StoredNotification>> {
        let notifications = sqlx::query_as::<_, StoredNotification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to list notifications")?;

        Ok(notifications)
    }

    /// Delete a stored notification. Only the owning recipient may delete;
    /// a second delete of the same id yields `NotFound`.
    pub async fn delete(&self, id: Uuid, requester_id: Uuid) -> Result<(), ApiError> {
        let owner: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?;

        let (owner_id,) = owner
            .ok_or_else(|| ApiError::NotFound(format!("Notification {} not found", id)))?;

        if owner_id != requester_id {
            return Err(ApiError::Forbidden(
                "You are not authorized to delete this notification".to_string(),
            ));
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }
}
