use std::{str::FromStr, time::Duration};

use sea_orm::{
    DatabaseConnection, RuntimeErr, SqlxSqliteConnector,
    sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::{DbErr, TransactionTrait};

#[derive(Clone)]
pub struct DBService {
    pub conn: DatabaseConnection,
}

fn sqlx_err(err: sea_orm::sqlx::Error) -> DbErr {
    DbErr::Conn(RuntimeErr::Internal(err.to_string()))
}

impl DBService {
    /// Connects to `DATABASE_URL` when set, otherwise to the sqlite file in
    /// the asset directory, and runs pending migrations.
    pub async fn new() -> Result<DBService, DbErr> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}?mode=rwc",
                asset_dir().join("db.sqlite").to_string_lossy()
            )
        });
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(sqlx_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(sqlx_err)?;

        let conn = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        db_migration::Migrator::up(&conn, None).await?;
        Ok(DBService { conn })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    use super::*;

    #[tokio::test]
    async fn connect_applies_sqlite_journal_and_timeout_options() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("db.sqlite").to_string_lossy()
        );
        let db = DBService::connect(&url).await.unwrap();

        let row = db
            .conn
            .query_one_raw(Statement::from_string(
                DatabaseBackend::Sqlite,
                "PRAGMA journal_mode",
            ))
            .await
            .unwrap()
            .expect("journal_mode row");
        let mode: String = row.try_get_by_index(0).unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let row = db
            .conn
            .query_one_raw(Statement::from_string(
                DatabaseBackend::Sqlite,
                "PRAGMA busy_timeout",
            ))
            .await
            .unwrap()
            .expect("busy_timeout row");
        let timeout_ms: i64 = row.try_get_by_index(0).unwrap();
        assert_eq!(timeout_ms, 30_000);
    }
}
