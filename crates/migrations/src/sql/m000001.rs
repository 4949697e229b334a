use indoc::indoc;

use super::QueueMigration;

pub const M000001_MIGRATION: QueueMigration = QueueMigration {
    name: "m000001",
    stmts: &[
        indoc! {r#"
            create table :QUEUE_SCHEMA.jobs (
                id bigint primary key generated always as identity,
                job bytea not null,
                attempts smallint not null default 0 check (attempts >= 0),
                reserved_at timestamptz,
                available_at timestamptz not null,
                created_at timestamptz not null
            );
        "#},
        indoc! {r#"
            create index jobs_available_at_id_idx
                on :QUEUE_SCHEMA.jobs (available_at, id)
                where reserved_at is null;
        "#},
        indoc! {r#"
            create index jobs_reserved_at_idx
                on :QUEUE_SCHEMA.jobs (reserved_at)
                where reserved_at is not null;
        "#},
        indoc! {r#"
            create table :QUEUE_SCHEMA.failures (
                id bigint primary key generated always as identity,
                job_id bigint not null,
                job bytea not null,
                error text,
                failed_at timestamptz not null
            );
        "#},
    ],
};
