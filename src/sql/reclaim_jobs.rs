use chrono::{DateTime, Utc};
use indoc::formatdoc;
use sqlx::{query, PgExecutor};
use tracing::info;

use crate::errors::Result;

/// How long a reservation stays valid before the job goes back to the pool.
pub const LEASE_DURATION: std::time::Duration = std::time::Duration::from_secs(300);

/// Returns every job whose lease expired at `now` to the pool, counting the
/// lost reservation as an attempt. `available_at` is left alone.
///
/// Concurrent reclaims cannot bump the same job twice: the second update
/// waits on the row lock, then re-checks `reserved_at` and skips the row.
#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn reclaim_expired_jobs<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let sql = formatdoc!(
        r#"
            update {escaped_schema}.jobs
                set
                    attempts = least(attempts, 32766) + 1,
                    reserved_at = null
                where reserved_at <= $1::timestamptz
        "#
    );

    let expired_before = now - chrono::Duration::seconds(LEASE_DURATION.as_secs() as i64);
    let reclaimed = query(&sql)
        .bind(expired_before)
        .execute(executor)
        .await?
        .rows_affected();

    if reclaimed > 0 {
        info!(reclaimed, %expired_before, "Reclaimed jobs with expired leases");
    }

    Ok(reclaimed)
}
