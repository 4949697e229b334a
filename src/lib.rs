//! A persistent, retry-capable job queue on PostgreSQL.
//!
//! Any number of worker processes can share one queue. A job is claimed by
//! exactly one of them with [`QueueStore::pop`], then either deleted on
//! success, released for another try, reclaimed automatically once its
//! 300 second lease runs out, or moved to the [`FailureSink`].
//!
//! ```no_run
//! use retry_queue::{FailureReason, JsonCodec, QueueOptions, WorkerOptions};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct SendEmail {
//!     to: String,
//! }
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = QueueOptions::from_env()?.init().await?;
//!     let codec = JsonCodec::<SendEmail>::new();
//!
//!     queue
//!         .store()
//!         .push_job(&codec, &SendEmail { to: "a@example.com".into() }, Duration::ZERO)
//!         .await?;
//!
//!     let worker = WorkerOptions::default().concurrency(4).build(
//!         queue,
//!         codec,
//!         |email: SendEmail| async move {
//!             println!("sending to {}", email.to);
//!             Ok::<(), FailureReason>(())
//!         },
//!     );
//!     worker.run().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod clock;
pub mod codec;
pub mod errors;
pub mod failure_sink;
pub mod job_error;
pub mod queue_store;
pub mod sql;
mod utils;
pub mod worker;

pub use crate::builder::{Queue, QueueBuildError, QueueOptions};
pub use crate::clock::{Clock, SystemClock};
pub use crate::codec::{CodecError, JsonCodec, PayloadCodec};
pub use crate::errors::{QueueError, Result};
pub use crate::failure_sink::FailureSink;
pub use crate::job_error::{format_job_error, FailureReason, JobError};
pub use crate::queue_store::QueueStore;
pub use crate::sql::reclaim_jobs::LEASE_DURATION;
pub use crate::worker::{JobHandler, JobOutcome, RunSummary, Worker, WorkerOptions};
pub use retry_queue_job::{FailureRecord, JobRecord};
pub use retry_queue_shutdown_signal::{shutdown_signal_from, ShutdownSignal};
