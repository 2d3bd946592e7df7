//! Loan route definitions

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::loans::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loans/request", post(request_loan))
        .route("/loans/approve", post(approve_loan))
        .route("/loans/reject", post(reject_loan))
        .route("/loans/repay", post(repay_loan))
        .route("/loans/request-renegotiation", post(request_renegotiation))
        .route("/loans/approve-renegotiation", post(approve_renegotiation))
        .route("/loans", get(list_loans))
}
