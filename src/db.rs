use sqlx::{error::ErrorKind, SqlitePool};
use thiserror::Error;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS job_seekers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        address TEXT,
        preferences TEXT NOT NULL DEFAULT '[]',
        skills TEXT NOT NULL DEFAULT '[]',
        personality TEXT,
        bio TEXT,
        experience TEXT,
        education TEXT,
        profile_image_url TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS companies (
        id TEXT PRIMARY KEY,
        company_name TEXT NOT NULL,
        email TEXT NOT NULL,
        description TEXT,
        culture TEXT,
        benefits TEXT NOT NULL DEFAULT '[]',
        location TEXT,
        website TEXT,
        company_size TEXT,
        industry TEXT,
        logo_url TEXT,
        subscription_status TEXT NOT NULL DEFAULT 'trial'
            CHECK (subscription_status IN ('active','inactive','trial')),
        subscription_end_date TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS job_vacancies (
        id TEXT PRIMARY KEY,
        company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        requirements TEXT,
        responsibilities TEXT,
        salary_range TEXT,
        employment_type TEXT
            CHECK (employment_type IN ('full-time','part-time','contract','freelance','internship')),
        experience_level TEXT
            CHECK (experience_level IN ('entry','junior','mid','senior','executive')),
        location TEXT,
        remote_work BOOLEAN NOT NULL DEFAULT FALSE,
        skills_required TEXT NOT NULL DEFAULT '[]',
        benefits TEXT NOT NULL DEFAULT '[]',
        department TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        applications_count INTEGER NOT NULL DEFAULT 0,
        views_count INTEGER NOT NULL DEFAULT 0,
        posted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS swipes (
        id TEXT PRIMARY KEY,
        swiper_id TEXT NOT NULL,
        swiped_id TEXT NOT NULL,
        vacancy_id TEXT,
        swipe_type TEXT NOT NULL CHECK (swipe_type IN ('like','pass')),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    // passes stay re-insertable, a like is recorded once per target/vacancy
    r#"CREATE UNIQUE INDEX IF NOT EXISTS swipes_like_once
        ON swipes (swiper_id, swiped_id, IFNULL(vacancy_id, ''))
        WHERE swipe_type = 'like'"#,
    "CREATE INDEX IF NOT EXISTS swipes_swiped ON swipes (swiped_id, swiper_id)",
    // rows here are materialized outside this service
    r#"CREATE TABLE IF NOT EXISTS matches (
        id TEXT PRIMARY KEY,
        job_seeker_id TEXT NOT NULL,
        company_id TEXT NOT NULL,
        vacancy_id TEXT,
        matched_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        sender_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        is_read BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    "CREATE INDEX IF NOT EXISTS messages_pair ON messages (sender_id, receiver_id, created_at)",
];

pub async fn migrate(db_pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }

    info!(statements = SCHEMA.len(), "schema ready");
    Ok(())
}

/// A store failure sorted into the cases callers branch on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate row: {0}")]
    Duplicate(String),

    #[error("column {column} does not exist: {message}")]
    MissingColumn { column: String, message: String },

    #[error(transparent)]
    Other(sqlx::Error),
}

impl StoreError {
    pub fn is_missing_column(&self, name: &str) -> bool {
        matches!(self, StoreError::MissingColumn { column, .. } if column == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return StoreError::Other(err);
        };

        let message = db_err.message().to_owned();
        let code = db_err.code();

        if db_err.kind() == ErrorKind::UniqueViolation || code.as_deref() == Some("23505") {
            return StoreError::Duplicate(message);
        }

        if code.as_deref() == Some("42703") || message.contains("no column named") || message.contains("no such column") {
            if let Some(column) = missing_column_name(&message) {
                return StoreError::MissingColumn { column, message };
            }
        }

        StoreError::Other(err)
    }
}

// sqlite: "table swipes has no column named vacancy_id" / "no such column: vacancy_id"
// postgres: column "vacancy_id" of relation "swipes" does not exist
fn missing_column_name(message: &str) -> Option<String> {
    if let Some(rest) = message.split("no column named ").nth(1) {
        return rest.split_whitespace().next().map(str::to_owned);
    }
    if let Some(rest) = message.split("no such column: ").nth(1) {
        let name = rest.split_whitespace().next()?;
        return Some(name.rsplit('.').next().unwrap_or(name).to_owned());
    }
    let start = message.find("column \"")? + "column \"".len();
    let end = message[start..].find('"')?;
    Some(message[start..start + end].to_owned())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&db_pool).await.unwrap();
    db_pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_missing_column_from_either_dialect() {
        assert_eq!(
            missing_column_name("table swipes has no column named vacancy_id").as_deref(),
            Some("vacancy_id")
        );
        assert_eq!(
            missing_column_name("no such column: s.vacancy_id").as_deref(),
            Some("vacancy_id")
        );
        assert_eq!(
            missing_column_name(r#"column "vacancy_id" of relation "swipes" does not exist"#).as_deref(),
            Some("vacancy_id")
        );
        assert_eq!(missing_column_name("disk I/O error"), None);
    }

    #[tokio::test]
    async fn second_like_is_a_duplicate() {
        let db_pool = test_pool().await;
        let insert = "INSERT INTO swipes (id,swiper_id,swiped_id,swipe_type) VALUES (?,'a','b','like')";

        sqlx::query(insert).bind("1").execute(&db_pool).await.unwrap();
        let err = sqlx::query(insert).bind("2").execute(&db_pool).await.unwrap_err();

        assert!(matches!(StoreError::from(err), StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn passes_are_not_unique() {
        let db_pool = test_pool().await;
        let insert = "INSERT INTO swipes (id,swiper_id,swiped_id,swipe_type) VALUES (?,'a','b','pass')";

        sqlx::query(insert).bind("1").execute(&db_pool).await.unwrap();
        sqlx::query(insert).bind("2").execute(&db_pool).await.unwrap();
    }

    #[tokio::test]
    async fn legacy_swipes_table_reports_missing_column() {
        let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE swipes (id TEXT PRIMARY KEY, swiper_id TEXT, swiped_id TEXT, swipe_type TEXT)")
            .execute(&db_pool)
            .await
            .unwrap();

        let err = sqlx::query("INSERT INTO swipes (id,swiper_id,swiped_id,vacancy_id,swipe_type) VALUES ('1','a','b','v','like')")
            .execute(&db_pool)
            .await
            .unwrap_err();

        assert!(StoreError::from(err).is_missing_column("vacancy_id"));
    }
}
