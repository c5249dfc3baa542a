pub mod sqlite;

use async_trait::async_trait;

use crate::errors::AppError;

/// Per-team credential storage.
///
/// A team owns two collections: users (user id → Slack OAuth token used for
/// posting unfurls) and projects (normalized `org/project` → Rollbar read
/// token). Every mutation is atomic; readers never see a half-created team.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create the team and its collections if absent. Idempotent and safe to
    /// race with itself.
    async fn ensure_team(&self, team_id: &str) -> Result<(), AppError>;

    async fn save_user_token(&self, team_id: &str, user_id: &str, token: &str)
        -> Result<(), AppError>;

    /// Token of the first user (by user id) in the team.
    ///
    /// Fails with `NotRegistered` when the team is unknown and `NoUsers` when
    /// it has no stored user tokens.
    async fn get_auth_token(&self, team_id: &str) -> Result<String, AppError>;

    async fn delete_user_token(&self, team_id: &str, user_id: &str) -> Result<(), AppError>;

    /// Insert or replace the read token for `project`.
    async fn save_project_token(&self, team_id: &str, project: &str, token: &str)
        -> Result<(), AppError>;

    /// `Ok(None)` when either the team or the project entry is absent.
    async fn get_project_token(&self, team_id: &str, project: &str)
        -> Result<Option<String>, AppError>;

    async fn list_projects(&self, team_id: &str) -> Result<Vec<String>, AppError>;

    async fn delete_project_token(&self, team_id: &str, project: &str) -> Result<(), AppError>;

    /// Remove the team and everything under it. Deleting an unknown team is a no-op.
    async fn delete_team(&self, team_id: &str) -> Result<(), AppError>;

    async fn list_teams(&self) -> Result<Vec<String>, AppError>;
}
