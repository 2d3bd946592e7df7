//! Identity resolution between local participants and ledger addresses

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::Address;

/// A participant attributed to a ledger address.
///
/// Addresses with no linked participant resolve to an explicit "Unknown"
/// placeholder rather than failing the batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Participant {
    pub user_id: Option<Uuid>,
    pub display_name: String,
}

impl Participant {
    pub fn unknown() -> Self {
        Self {
            user_id: None,
            display_name: "Unknown".to_string(),
        }
    }
}

/// Resolves participants to ledger addresses and back.
#[derive(Clone)]
pub struct IdentityResolver {
    db_pool: PgPool,
}

impl IdentityResolver {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Look up the ledger address linked to a participant.
    pub async fn resolve_address(&self, user_id: Uuid) -> Result<Option<Address>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT ledger_address FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await
                .context("Failed to look up user address")?;

        match row {
            Some((raw,)) => {
                let address = Address::parse(&raw)
                    .with_context(|| format!("Stored address for user {} is malformed", user_id))?;
                Ok(Some(address))
            }
            None => Ok(None),
        }
    }

    /// Bulk-resolve a set of ledger addresses in a single round trip.
    ///
    /// The returned map contains an entry for every requested address;
    /// unlinked addresses map to [`Participant::unknown`].
    pub async fn resolve_users(
        &self,
        addresses: &HashSet<Address>,
    ) -> Result<HashMap<Address, Participant>> {
        let mut resolved: HashMap<Address, Participant> = addresses
            .iter()
            .map(|a| (a.clone(), Participant::unknown()))
            .collect();

        if addresses.is_empty() {
            return Ok(resolved);
        }

        let wanted: Vec<String> = addresses.iter().map(|a| a.as_str().to_string()).collect();

        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, display_name, ledger_address FROM users WHERE ledger_address = ANY($1)",
        )
        .bind(&wanted)
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to bulk-resolve participants")?;

        for (user_id, display_name, raw_address) in rows {
            // Stored addresses are canonical, but normalize again so the map
            // key matches the requested form no matter what is in the table.
            if let Ok(address) = Address::parse(&raw_address) {
                resolved.insert(
                    address,
                    Participant {
                        user_id: Some(user_id),
                        display_name,
                    },
                );
            } else {
                tracing::warn!(user_id = %user_id, "Skipping user with malformed ledger address");
            }
        }

        Ok(resolved)
    }
}
