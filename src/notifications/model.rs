//! Stored notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification kept in the recipient's inbox. Created on dispatch,
/// deleted only by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Request to register a push endpoint for the current user
#[derive(Debug, Deserialize, validator::Validate)]
pub struct StoreTokenRequest {
    #[validate(length(min = 1, message = "token must not be empty"))]
    pub token: String,
}
