//! Notification API handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::notifications::{StoreTokenRequest, StoredNotification};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub detail: String,
}

/// POST /notifications/store-token
pub async fn store_token(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<StoreTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    body.validate()?;

    state
        .notifications
        .register_endpoint(user.user_id, &body.token)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(MessageResponse {
        detail: "Push token stored successfully".to_string(),
    }))
}

/// GET /notifications/list
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<StoredNotification>>> {
    let notifications = state
        .notifications
        .list_for_user(user.user_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(notifications))
}

/// DELETE /notifications/delete/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.notifications.delete(id, user.user_id).await?;

    Ok(Json(MessageResponse {
        detail: "Notification deleted successfully".to_string(),
    }))
}
