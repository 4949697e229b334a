use indoc::formatdoc;
use sqlx::{query, PgExecutor, Row};

use crate::MigrateError;

/// Fetches the postgres version and checks if it is compatible with retry_queue
pub async fn fetch_and_check_postgres_version<'e, E>(executor: E) -> Result<u32, MigrateError>
where
    E: PgExecutor<'e>,
{
    let sql = formatdoc!(
        r#"
            select current_setting('server_version_num') as server_version_num
        "#
    );

    let row = query(&sql).fetch_one(executor).await?;
    let version_string: String = row.try_get("server_version_num")?;

    check_postgres_version(&version_string)
}

/// `skip locked` and identity columns are both needed, 12 is the oldest
/// release still tested against.
pub fn check_postgres_version(version_string: &str) -> Result<u32, MigrateError> {
    let version = version_string.parse::<u32>()?;

    if version < 120000 {
        return Err(MigrateError::IncompatibleVersion(version));
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_twelve_and_later() {
        for v in ["120000", "120001", "130100", "160004", "170000"] {
            let version = check_postgres_version(v).unwrap();
            assert_eq!(version.to_string(), v);
        }
    }

    #[test]
    fn rejects_old_or_garbage_versions() {
        assert!(matches!(
            check_postgres_version("119999"),
            Err(MigrateError::IncompatibleVersion(119999))
        ));
        assert!(matches!(
            check_postgres_version("100000"),
            Err(MigrateError::IncompatibleVersion(100000))
        ));
        assert!(matches!(
            check_postgres_version("foo"),
            Err(MigrateError::ParseVersionError(_))
        ));
    }
}
