//! The "what's coming up" read path: resolve, sort, filter, truncate.

use chrono::NaiveDate;

use candles_core::error::{CandlesError, Result};
use candles_core::traits::{Host, UserHandle};
use candles_core::types::EventRecord;

use crate::occurrence::{days_until, next_occurrence};

/// One row of an upcoming listing.
#[derive(Debug, Clone)]
pub struct UpcomingEntry {
    pub user: UserHandle,
    pub date: NaiveDate,
    pub days_until: i64,
}

/// Resolve each record to its next occurrence and return the soonest
/// `limit` entries, ordered by (days_until, user_id).
///
/// Users the host can no longer resolve are dropped *before* truncation,
/// so they never count against `limit`.
pub async fn upcoming(
    records: Vec<EventRecord>,
    host: &dyn Host,
    today: NaiveDate,
    limit: usize,
) -> Result<Vec<UpcomingEntry>> {
    if limit < 1 {
        return Err(CandlesError::Validation(
            "limit must be greater than 0".into(),
        ));
    }

    let mut resolved: Vec<(EventRecord, NaiveDate)> = records
        .into_iter()
        .map(|record| {
            let occurrence = next_occurrence(today, record.date);
            (record, occurrence)
        })
        .collect();
    resolved.sort_by_key(|(record, occurrence)| (*occurrence, record.user_id));

    let mut entries = Vec::new();
    for (record, occurrence) in resolved {
        if entries.len() == limit {
            break;
        }
        match host.resolve_user(record.group_id, record.user_id).await {
            Some(user) => entries.push(UpcomingEntry {
                user,
                date: occurrence,
                days_until: days_until(today, occurrence),
            }),
            None => {
                tracing::debug!(
                    "Dropping unresolvable user {} from upcoming list for group {}",
                    record.user_id,
                    record.group_id
                );
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;
    use candles_core::types::{DestinationId, GroupId, UserId};
    use chrono::Utc;

    const GROUP: GroupId = GroupId(1);

    fn record(user: u64, y: i32, m: u32, d: u32) -> EventRecord {
        EventRecord {
            group_id: GROUP,
            user_id: UserId(user),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            last_updated: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn host_with(users: &[u64]) -> MockHost {
        MockHost::new(
            vec![DestinationId(9)],
            users.iter().map(|u| (GROUP, UserId(*u))).collect(),
        )
    }

    #[tokio::test]
    async fn test_sorted_with_user_id_tiebreak() {
        let host = host_with(&[5, 3, 7]);
        let records = vec![
            record(7, 1990, 8, 15),
            record(5, 2020, 7, 1),
            record(3, 1985, 7, 1),
        ];
        let entries = upcoming(records, &host, date(2024, 6, 30), 10)
            .await
            .unwrap();

        // Both July 1 events resolve to days_until = 1; user 3 before user 5.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].user.id, UserId(3));
        assert_eq!(entries[0].days_until, 1);
        assert_eq!(entries[1].user.id, UserId(5));
        assert_eq!(entries[1].days_until, 1);
        assert_eq!(entries[2].user.id, UserId(7));
        assert_eq!(entries[2].date, date(2024, 8, 15));
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let host = host_with(&[1, 2, 3]);
        let records = vec![
            record(1, 1990, 7, 1),
            record(2, 1990, 7, 2),
            record(3, 1990, 7, 3),
        ];
        let entries = upcoming(records, &host, date(2024, 6, 30), 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].user.id, UserId(2));
    }

    #[tokio::test]
    async fn test_unresolvable_users_do_not_count_against_limit() {
        // User 1 has the soonest date but has left the group.
        let host = host_with(&[2, 3]);
        let records = vec![
            record(1, 1990, 7, 1),
            record(2, 1990, 7, 2),
            record(3, 1990, 7, 3),
        ];
        let entries = upcoming(records, &host, date(2024, 6, 30), 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user.id, UserId(2));
        assert_eq!(entries[1].user.id, UserId(3));
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let host = host_with(&[1]);
        let err = upcoming(vec![record(1, 1990, 7, 1)], &host, date(2024, 6, 30), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CandlesError::Validation(_)));
    }
}
