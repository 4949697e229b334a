use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use sqlx::FromRow;

/// A pending job as stored in the `jobs` table.
///
/// `reserved_at` is `None` while the job is available. A job can be claimed
/// once `available_at` has passed and nobody holds a reservation on it.
#[derive(FromRow, Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Assigned by the database, never reused
    #[getset(get_copy = "pub")]
    id: i64,
    /// Encoded job definition, opaque to the queue
    #[sqlx(rename = "job")]
    #[getset(get = "pub")]
    payload: Vec<u8>,
    /// Number of releases and lease reclaims so far
    #[getset(get_copy = "pub")]
    attempts: i16,
    #[getset(get_copy = "pub")]
    reserved_at: Option<DateTime<Utc>>,
    /// The job must not be claimed before this instant
    #[getset(get_copy = "pub")]
    available_at: DateTime<Utc>,
    #[getset(get_copy = "pub")]
    created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn is_reserved(&self) -> bool {
        self.reserved_at.is_some()
    }

    /// Whether a worker could claim this job at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.reserved_at.is_none() && self.available_at <= now
    }
}

/// A job that exited the retry cycle, as stored in the `failures` table.
#[derive(FromRow, Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    #[getset(get_copy = "pub")]
    id: i64,
    /// Id the job had while it was pending
    #[getset(get_copy = "pub")]
    job_id: i64,
    #[sqlx(rename = "job")]
    #[getset(get = "pub")]
    payload: Vec<u8>,
    /// `{kind}: {message} (#{code})`, or `None` when no error was given
    #[getset(get = "pub")]
    error: Option<String>,
    #[getset(get_copy = "pub")]
    failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(reserved_at: Option<DateTime<Utc>>, available_at: DateTime<Utc>) -> JobRecord {
        JobRecord {
            id: 1,
            payload: b"{}".to_vec(),
            attempts: 0,
            reserved_at,
            available_at,
            created_at: available_at,
        }
    }

    #[test]
    fn due_only_when_available_and_unreserved() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let later = t + chrono::Duration::seconds(60);

        assert!(record(None, t).is_due(t));
        assert!(record(None, t).is_due(later));
        assert!(!record(None, later).is_due(t));
        assert!(!record(Some(t), t).is_due(later));
    }

    #[test]
    fn reserved_flag_follows_reserved_at() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(!record(None, t).is_reserved());
        assert!(record(Some(t), t).is_reserved());
    }
}
