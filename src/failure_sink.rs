use std::sync::Arc;

use chrono::{DateTime, Utc};
use getset::Getters;
use retry_queue_job::{FailureRecord, JobRecord};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::errors::Result;
use crate::job_error::{format_job_error, JobError};
use crate::sql::count_jobs::count_failures;
use crate::sql::get_job::get_failure;
use crate::sql::record_failure::{insert_failure, take_job};

/// Durable storage of jobs that left the retry cycle.
#[derive(Clone, Getters, Debug)]
pub struct FailureSink {
    #[getset(get = "pub")]
    pg_pool: PgPool,

    #[getset(get = "pub")]
    escaped_schema: String,

    clock: Arc<dyn Clock>,
}

impl FailureSink {
    pub fn new(pg_pool: PgPool, escaped_schema: String, clock: Arc<dyn Clock>) -> Self {
        Self {
            pg_pool,
            escaped_schema,
            clock,
        }
    }

    /// Moves `job` from the queue into the failures table.
    ///
    /// Both writes share one transaction, so the job ends up in exactly one of
    /// the two tables. If the job is not pending anymore nothing is written
    /// and `None` is returned.
    #[tracing::instrument(skip_all, err, fields(job_id = job.id()))]
    pub async fn record(
        &self,
        job: &JobRecord,
        error: Option<&dyn JobError>,
    ) -> Result<Option<FailureRecord>> {
        self.move_to_failures(job, error, None).await
    }

    /// Like [`record`](Self::record), but only while the job still carries the
    /// reservation `job` was popped with. Returns `None` once the lease was
    /// reclaimed, even if another worker holds the job now.
    #[tracing::instrument(skip_all, err, fields(job_id = job.id()))]
    pub async fn record_reserved(
        &self,
        job: &JobRecord,
        error: Option<&dyn JobError>,
    ) -> Result<Option<FailureRecord>> {
        let Some(reserved_at) = job.reserved_at() else {
            return Ok(None);
        };
        self.move_to_failures(job, error, Some(reserved_at)).await
    }

    async fn move_to_failures(
        &self,
        job: &JobRecord,
        error: Option<&dyn JobError>,
        reserved_at: Option<DateTime<Utc>>,
    ) -> Result<Option<FailureRecord>> {
        let error = format_job_error(error);
        let failed_at = self.clock.now();

        let mut tx = self.pg_pool.begin().await?;

        let Some(payload) =
            take_job(tx.as_mut(), &self.escaped_schema, job.id(), reserved_at).await?
        else {
            tx.rollback().await?;
            warn!("Job is not pending anymore, failure not recorded");
            return Ok(None);
        };

        let failure = insert_failure(
            tx.as_mut(),
            &self.escaped_schema,
            job.id(),
            &payload,
            error.as_deref(),
            failed_at,
        )
        .await?;

        tx.commit().await?;

        info!(
            failure_id = failure.id(),
            error = failure.error().as_deref(),
            "Job permanently failed"
        );

        Ok(Some(failure))
    }

    /// Number of recorded failures.
    pub async fn failed_jobs(&self) -> Result<i64> {
        count_failures(&self.pg_pool, &self.escaped_schema).await
    }

    pub async fn get_failure(&self, failure_id: i64) -> Result<Option<FailureRecord>> {
        get_failure(&self.pg_pool, &self.escaped_schema, failure_id).await
    }
}
