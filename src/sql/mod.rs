pub mod count_jobs;
pub mod delete_job;
pub mod get_job;
pub mod pop_job;
pub mod push_job;
pub mod reclaim_jobs;
pub mod record_failure;
pub mod release_job;
