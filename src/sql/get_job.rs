use indoc::formatdoc;
use retry_queue_job::{FailureRecord, JobRecord};
use sqlx::{query_as, PgExecutor};

use crate::errors::Result;

pub async fn get_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
) -> Result<Option<JobRecord>> {
    let sql = formatdoc!(
        r#"
            select * from {escaped_schema}.jobs
                where id = $1::bigint
        "#
    );

    let job = query_as(&sql).bind(job_id).fetch_optional(executor).await?;
    Ok(job)
}

pub async fn get_failure<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    failure_id: i64,
) -> Result<Option<FailureRecord>> {
    let sql = formatdoc!(
        r#"
            select * from {escaped_schema}.failures
                where id = $1::bigint
        "#
    );

    let failure = query_as(&sql)
        .bind(failure_id)
        .fetch_optional(executor)
        .await?;
    Ok(failure)
}
