//! The daily poll loop.
//!
//! Two states: sleeping until the trigger instant, and running one poll
//! cycle. The next target is always recomputed from the wall clock as "the
//! trigger time on the next calendar day" — never a fixed 24h offset — so
//! clock-shift days come out right. Cancellation is honored at the sleep
//! suspension point via a watch channel owned by [`SchedulerHandle`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use candles_core::error::Result;
use candles_core::traits::{Clock, Host};
use candles_store::EventStore;

use crate::dispatch::Dispatcher;
use crate::occurrence::next_occurrence;

/// Owned handle to the background loop. Dropping it without calling
/// [`shutdown`](Self::shutdown) leaves the task running detached.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request cancellation and wait for the loop to exit at its next
    /// suspension point.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the daily poll loop as a background tokio task.
pub fn spawn_daily(
    store: Arc<Mutex<EventStore>>,
    host: Arc<dyn Host>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    trigger: NaiveTime,
) -> SchedulerHandle {
    let (shutdown, mut cancelled) = watch::channel(false);
    let dispatcher = Dispatcher::new(store.clone(), host);

    let task = tokio::spawn(async move {
        tracing::info!("⏰ Daily scheduler started (trigger {trigger} {tz})");
        let mut target = next_trigger(clock.now().with_timezone(&tz), trigger);

        loop {
            let now = clock.now().with_timezone(&tz);
            let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!("Next poll at {target} (in {}s)", wait.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let today = clock.now().with_timezone(&tz).date_naive();
                    tracing::info!("🔔 Polling events for {today}");
                    match run_poll_cycle(&store, &dispatcher, today).await {
                        Ok(matched) => {
                            tracing::info!("Poll cycle done, {matched} record(s) matched today");
                        }
                        Err(e) => {
                            // This day's poll failed; the loop carries on.
                            tracing::error!("Poll cycle failed: {e}");
                        }
                    }
                    target = trigger_on(tz, next_day(today), trigger);
                }
                _ = cancelled.changed() => {
                    tracing::info!("Scheduler loop stopped");
                    break;
                }
            }
        }
    });

    SchedulerHandle { shutdown, task }
}

/// One poll cycle: scan every record, dispatch those occurring today.
/// A failure on one record never stops the rest of the batch.
pub async fn run_poll_cycle(
    store: &Mutex<EventStore>,
    dispatcher: &Dispatcher,
    today: NaiveDate,
) -> Result<usize> {
    let records = { store.lock().await.all_events()? };

    let mut matched = 0;
    for record in records {
        if next_occurrence(today, record.date) != today {
            continue;
        }
        matched += 1;
        if let Err(e) = dispatcher.notify(record.group_id, record.user_id).await {
            tracing::error!(
                "Error notifying user {} in group {}: {e}",
                record.user_id,
                record.group_id
            );
        }
    }
    Ok(matched)
}

/// The next instant the trigger time occurs, strictly after "right now" if
/// today's trigger has already passed.
pub fn next_trigger(now: DateTime<Tz>, trigger: NaiveTime) -> DateTime<Tz> {
    let today = trigger_on(now.timezone(), now.date_naive(), trigger);
    if now < today {
        today
    } else {
        trigger_on(now.timezone(), next_day(now.date_naive()), trigger)
    }
}

/// Resolve a local wall-clock (date, time) to an instant in `tz`.
/// A DST-skipped time shifts forward one hour; an ambiguous time takes the
/// earlier instant.
pub fn trigger_on(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            let shifted = date.and_time(time) + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(earlier, _) => earlier,
                // Double-skip does not happen in the tz database; fall back
                // to interpreting the wall time as UTC rather than panic.
                LocalResult::None => tz.from_utc_datetime(&date.and_time(time)),
            }
        }
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, MockHost};
    use candles_core::types::{DestinationId, GroupId, UserId};
    use chrono::Utc;
    use chrono_tz::America::New_York;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn nine_am() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_next_trigger_later_today() {
        let next = next_trigger(local(2024, 6, 30, 7, 15), nine_am());
        assert_eq!(next, local(2024, 6, 30, 9, 0));
    }

    #[test]
    fn test_next_trigger_rolls_to_tomorrow() {
        let next = next_trigger(local(2024, 6, 30, 9, 0), nine_am());
        assert_eq!(next, local(2024, 7, 1, 9, 0));
    }

    #[test]
    fn test_target_strictly_increases_across_dst() {
        // Spring-forward day in America/New_York: 2024-03-10.
        let next = next_trigger(local(2024, 3, 9, 10, 0), nine_am());
        assert_eq!(next, local(2024, 3, 10, 9, 0));

        let d9 = trigger_on(New_York, date(2024, 3, 9), nine_am());
        let d10 = trigger_on(New_York, date(2024, 3, 10), nine_am());
        let d11 = trigger_on(New_York, date(2024, 3, 11), nine_am());
        assert!(d9 < d10 && d10 < d11);
        // Only 23 real hours pass on the shift day; a flat 24h add would
        // land at 10:00 local.
        assert_eq!((d10 - d9).num_hours(), 23);
        assert_eq!((d11 - d10).num_hours(), 24);
    }

    #[test]
    fn test_skipped_local_time_shifts_forward() {
        // 02:30 does not exist on 2024-03-10 in New York.
        let resolved = trigger_on(New_York, date(2024, 3, 10), NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(resolved, local(2024, 3, 10, 3, 30));
    }

    async fn poll_fixture(
        records: &[(u64, u64, NaiveDate)],
        host: MockHost,
    ) -> (Arc<Mutex<EventStore>>, Arc<MockHost>) {
        let store = Arc::new(Mutex::new(EventStore::open_in_memory().unwrap()));
        {
            let guard = store.lock().await;
            for (group, user, event_date) in records {
                guard
                    .set_event(GroupId(*group), UserId(*user), *event_date, Utc::now())
                    .unwrap();
            }
        }
        (store, Arc::new(host))
    }

    #[tokio::test]
    async fn test_poll_cycle_notifies_only_todays_matches() {
        let host = MockHost::new(
            vec![DestinationId(9)],
            vec![(GroupId(1), UserId(2)), (GroupId(1), UserId(3))],
        );
        let (store, host) = poll_fixture(
            &[
                (1, 2, date(2019, 7, 1)),
                (1, 3, date(1990, 12, 25)),
            ],
            host,
        )
        .await;
        store
            .lock()
            .await
            .set_destination(GroupId(1), DestinationId(9))
            .unwrap();
        let dispatcher = Dispatcher::new(store.clone(), host.clone());

        let matched = run_poll_cycle(&store, &dispatcher, date(2024, 7, 1))
            .await
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(host.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_cycle_survives_unconfigured_group() {
        // Group 1 has no destination; group 2's record must still go out.
        let host = MockHost::new(
            vec![DestinationId(9)],
            vec![(GroupId(1), UserId(2)), (GroupId(2), UserId(3))],
        );
        let (store, host) = poll_fixture(
            &[(1, 2, date(2019, 7, 1)), (2, 3, date(1990, 7, 1))],
            host,
        )
        .await;
        store
            .lock()
            .await
            .set_destination(GroupId(2), DestinationId(9))
            .unwrap();
        let dispatcher = Dispatcher::new(store.clone(), host.clone());

        let matched = run_poll_cycle(&store, &dispatcher, date(2024, 7, 1))
            .await
            .unwrap();
        assert_eq!(matched, 2);
        assert_eq!(host.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown_while_sleeping() {
        let store = Arc::new(Mutex::new(EventStore::open_in_memory().unwrap()));
        let host = Arc::new(MockHost::new(vec![], vec![]));
        let clock = Arc::new(FixedClock(Utc::now()));

        let handle = spawn_daily(store, host, clock, New_York, nine_am());
        // The loop is parked on its sleep; shutdown must resolve promptly.
        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown did not complete");
    }
}
