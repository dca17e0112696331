//! Notification dispatch — one best-effort send per matched record.
//!
//! Resolution and transport failures are outcomes, not errors: the caller
//! gets `Skipped`/`Failed` and the batch keeps moving. Only a storage
//! failure propagates.

use std::sync::Arc;

use tokio::sync::Mutex;

use candles_core::error::Result;
use candles_core::traits::Host;
use candles_core::types::{GroupId, UserId};
use candles_store::EventStore;

/// Why a notification was skipped without an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The group never configured a destination.
    NoDestination,
    /// The configured destination no longer resolves.
    UnresolvableDestination,
    /// The user no longer resolves within the group.
    UnresolvableUser,
}

/// Result of one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Skipped(SkipReason),
    Failed(String),
}

/// Resolves a group's destination and a user's identity, then performs a
/// best-effort send of the fixed reminder template.
pub struct Dispatcher {
    store: Arc<Mutex<EventStore>>,
    host: Arc<dyn Host>,
}

impl Dispatcher {
    pub fn new(store: Arc<Mutex<EventStore>>, host: Arc<dyn Host>) -> Self {
        Self { store, host }
    }

    /// Notify one user in one group. Never fails for resolution or
    /// transport problems; storage failure is the only `Err`.
    pub async fn notify(&self, group: GroupId, user: UserId) -> Result<Outcome> {
        let destination = { self.store.lock().await.destination_for_group(group)? };
        let Some(destination) = destination else {
            tracing::warn!("No destination configured for group {group}, skipping");
            return Ok(Outcome::Skipped(SkipReason::NoDestination));
        };

        let Some(dest) = self.host.resolve_destination(destination).await else {
            tracing::warn!("Destination {destination} in group {group} no longer resolves");
            return Ok(Outcome::Skipped(SkipReason::UnresolvableDestination));
        };
        let Some(member) = self.host.resolve_user(group, user).await else {
            tracing::warn!("User {user} in group {group} no longer resolves, skipping");
            return Ok(Outcome::Skipped(SkipReason::UnresolvableUser));
        };

        let text = format!("Happy birthday, {}! 🥳🎂", member.mention);
        match self.host.send(&dest, &text).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Reminder sent for {} to {} in group {group}",
                    member.display_name,
                    dest.name
                );
                Ok(Outcome::Sent)
            }
            Err(e) => {
                tracing::warn!("⚠️ Send failed for user {user} in group {group}: {e}");
                Ok(Outcome::Failed(e.to_string()))
            }
        }
    }
}
