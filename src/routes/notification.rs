//! Notification route definitions

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::notifications::*;
use crate::state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/store-token", post(store_token))
        .route("/notifications/list", get(list_notifications))
        .route("/notifications/delete/:id", delete(delete_notification))
}
