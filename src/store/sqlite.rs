use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};

use super::CredentialStore;
use crate::errors::AppError;

/// SQLite-backed credential store.
///
/// The pool holds a single connection, so writers are serialized and every
/// transaction sees a consistent view of a team.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !database_url.contains(":memory:") {
            opts = opts.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            // an in-memory database lives only as long as its connection
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn insert_team(conn: &mut SqliteConnection, team_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO teams (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(team_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn team_exists(conn: &mut SqliteConnection, team_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?)")
        .bind(team_id)
        .fetch_one(conn)
        .await
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn ensure_team(&self, team_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_team(&mut tx, team_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_user_token(
        &self,
        team_id: &str,
        user_id: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_team(&mut tx, team_id).await?;
        sqlx::query(
            r#"INSERT INTO team_users (team_id, user_id, token) VALUES (?, ?, ?)
               ON CONFLICT(team_id, user_id)
               DO UPDATE SET token = excluded.token, updated_at = datetime('now')"#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(token)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(team_id, user_id, "saved user token");
        Ok(())
    }

    async fn get_auth_token(&self, team_id: &str) -> Result<String, AppError> {
        let mut tx = self.pool.begin().await?;
        if !team_exists(&mut tx, team_id).await? {
            return Err(AppError::NotRegistered(team_id.to_string()));
        }

        let token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM team_users WHERE team_id = ? ORDER BY user_id ASC LIMIT 1",
        )
        .bind(team_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        token.ok_or_else(|| AppError::NoUsers(team_id.to_string()))
    }

    async fn delete_user_token(&self, team_id: &str, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM team_users WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(team_id, user_id, "no user token to delete");
        }
        Ok(())
    }

    async fn save_project_token(
        &self,
        team_id: &str,
        project: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_team(&mut tx, team_id).await?;
        sqlx::query(
            r#"INSERT INTO team_projects (team_id, project, token) VALUES (?, ?, ?)
               ON CONFLICT(team_id, project)
               DO UPDATE SET token = excluded.token, updated_at = datetime('now')"#,
        )
        .bind(team_id)
        .bind(project)
        .bind(token)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(team_id, project, "saved project token");
        Ok(())
    }

    async fn get_project_token(
        &self,
        team_id: &str,
        project: &str,
    ) -> Result<Option<String>, AppError> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM team_projects WHERE team_id = ? AND project = ?",
        )
        .bind(team_id)
        .bind(project)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn list_projects(&self, team_id: &str) -> Result<Vec<String>, AppError> {
        let projects = sqlx::query_scalar::<_, String>(
            "SELECT project FROM team_projects WHERE team_id = ? ORDER BY project ASC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn delete_project_token(&self, team_id: &str, project: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM team_projects WHERE team_id = ? AND project = ?")
            .bind(team_id)
            .bind(project)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_team(&self, team_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM team_users WHERE team_id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM team_projects WHERE team_id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(team_id, existed = removed.rows_affected() > 0, "deleted team data");
        Ok(())
    }

    async fn list_teams(&self) -> Result<Vec<String>, AppError> {
        let teams = sqlx::query_scalar::<_, String>("SELECT id FROM teams ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(teams)
    }
}
