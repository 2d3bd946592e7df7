//! Reminder directory: the scheduler's view of participants and endpoints
//!
//! The scheduler resolves identities once per run (batched) and then needs
//! per-borrower endpoints plus an inbox record per delivery. Bundling those
//! behind one trait keeps the scheduler testable without a database.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::service::NotificationService;
use crate::identity::{Address, IdentityResolver, Participant};

#[async_trait]
pub trait ReminderDirectory: Send + Sync {
    /// Bulk-resolve every address in one round trip. Unknown addresses map
    /// to the "Unknown" placeholder.
    async fn resolve_participants(
        &self,
        addresses: &HashSet<Address>,
    ) -> Result<HashMap<Address, Participant>>;

    /// Push endpoints registered by a participant.
    async fn push_endpoints(&self, user_id: Uuid) -> Result<Vec<String>>;

    /// Record an inbox copy of a dispatched reminder.
    async fn record_delivery(&self, user_id: Uuid, title: &str, body: &str) -> Result<()>;
}

/// Production directory backed by the identity resolver and the
/// notification store.
pub struct DbReminderDirectory {
    identity: IdentityResolver,
    notifications: NotificationService,
}

impl DbReminderDirectory {
    pub fn new(identity: IdentityResolver, notifications: NotificationService) -> Self {
        Self {
            identity,
            notifications,
        }
    }
}

#[async_trait]
impl ReminderDirectory for DbReminderDirectory {
    async fn resolve_participants(
        &self,
        addresses: &HashSet<Address>,
    ) -> Result<HashMap<Address, Participant>> {
        self.identity.resolve_users(addresses).await
    }

    async fn push_endpoints(&self, user_id: Uuid) -> Result<Vec<String>> {
        self.notifications.endpoints_for(user_id).await
    }

    async fn record_delivery(&self, user_id: Uuid, title: &str, body: &str) -> Result<()> {
        self.notifications.store(user_id, title, body).await?;
        Ok(())
    }
}
