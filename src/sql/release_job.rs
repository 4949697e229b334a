use chrono::{DateTime, Utc};
use indoc::formatdoc;
use sqlx::{query, PgExecutor};

use crate::errors::Result;

/// Gives a reservation back and counts it as an attempt.
///
/// Only matches while the row still carries the reservation the caller got
/// from `pop`: once the lease was reclaimed (and maybe claimed again) this is
/// a no-op, which keeps `attempts` from being bumped twice for one lease.
#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn release_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
    reserved_at: DateTime<Utc>,
) -> Result<bool> {
    let sql = formatdoc!(
        r#"
            update {escaped_schema}.jobs
                set
                    attempts = least(attempts, 32766) + 1,
                    reserved_at = null
                where id = $1::bigint
                and reserved_at = $2::timestamptz
        "#
    );

    let released = query(&sql)
        .bind(job_id)
        .bind(reserved_at)
        .execute(executor)
        .await?
        .rows_affected();

    Ok(released > 0)
}
