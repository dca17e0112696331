//! Command-facing surface: the operations external handlers call against
//! the same store the poll loop reads.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tokio::sync::Mutex;

use candles_core::error::{CandlesError, Result};
use candles_core::traits::{Clock, Host};
use candles_core::types::{DestinationId, GroupId, UserId};
use candles_store::EventStore;

use crate::upcoming::{upcoming, UpcomingEntry};

/// The write and query operations exposed to command handlers.
pub struct CandlesService {
    store: Arc<Mutex<EventStore>>,
    host: Arc<dyn Host>,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl CandlesService {
    pub fn new(
        store: Arc<Mutex<EventStore>>,
        host: Arc<dyn Host>,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            host,
            clock,
            tz,
        }
    }

    /// Record (or replace) a user's event date. `date_str` must be an
    /// ISO-8601 calendar date (YYYY-MM-DD).
    pub async fn set_event(&self, group: GroupId, user: UserId, date_str: &str) -> Result<()> {
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|_| {
            CandlesError::Validation(format!(
                "invalid date '{date_str}', expected YYYY-MM-DD"
            ))
        })?;
        self.store
            .lock()
            .await
            .set_event(group, user, date, self.clock.now())?;
        tracing::info!("📅 Event saved for user {user} in group {group}: {date}");
        Ok(())
    }

    /// Configure (or replace) the group's notification destination.
    pub async fn set_destination(&self, group: GroupId, destination: DestinationId) -> Result<()> {
        self.store.lock().await.set_destination(group, destination)?;
        tracing::info!("📣 Destination for group {group} set to {destination}");
        Ok(())
    }

    /// The soonest `limit` upcoming occurrences for a group, relative to
    /// today in the configured zone.
    pub async fn list_upcoming(&self, group: GroupId, limit: usize) -> Result<Vec<UpcomingEntry>> {
        let today = self.clock.now().with_timezone(&self.tz).date_naive();
        let records = { self.store.lock().await.events_for_group(group)? };
        upcoming(records, &*self.host, today, limit).await
    }
}
