//! Application state shared across handlers

use axum::extract::FromRef;
use std::sync::Arc;

use crate::identity::IdentityResolver;
use crate::ledger::{LoanLedger, TxBuilder};
use crate::middleware::JwtVerifier;
use crate::notifications::NotificationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LoanLedger>,
    pub tx_builder: Arc<TxBuilder>,
    pub identity: Arc<IdentityResolver>,
    pub notifications: Arc<NotificationService>,
    pub jwt_verifier: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn LoanLedger>,
        tx_builder: Arc<TxBuilder>,
        identity: Arc<IdentityResolver>,
        notifications: Arc<NotificationService>,
        jwt_verifier: Arc<JwtVerifier>,
    ) -> Self {
        Self {
            ledger,
            tx_builder,
            identity,
            notifications,
            jwt_verifier,
        }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<IdentityResolver> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for Arc<NotificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifications.clone()
    }
}
