use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::command::SLASH_COMMAND;
use crate::errors::AppError;
use crate::unfurl::{LinkSharedEvent, SharedLink};
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const THANKS_HTML: &str = include_str!("../../static/thanks.html");

// ── Request / Response DTOs ──────────────────────────────────

/// Outer envelope of every Events API delivery.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub api_app_id: String,
    #[serde(rename = "type", default)]
    pub envelope_type: String,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub event: SlackEvent,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    // link_shared
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub message_ts: String,
    #[serde(default)]
    pub links: Vec<SharedLink>,
    // tokens_revoked
    #[serde(default)]
    pub tokens: RevokedTokens,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokedTokens {
    /// User ids whose OAuth tokens were revoked.
    #[serde(default)]
    pub oauth: Vec<String>,
    #[serde(default)]
    pub bot: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SlashCommandResponse {
    pub response_type: &'static str,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub error: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /: landing page with the "Add to Slack" button
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /slack: Events API endpoint
pub async fn slack_events(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let envelope: EventEnvelope = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("invalid JSON received: {}", e);
        AppError::Validation(format!("invalid JSON: {}", e))
    })?;

    verify_token(&state.config.verification_token, &envelope.token, "/slack")?;

    let team = envelope.team_id.as_str();
    tracing::info!(
        team_id = team,
        event_id = %envelope.event_id,
        "received event of type {}/{}",
        envelope.envelope_type,
        envelope.event.event_type
    );

    match envelope.envelope_type.as_str() {
        "url_verification" => Ok(envelope.challenge.into_response()),
        "event_callback" => {
            handle_event_callback(&state, team, envelope.event).await;
            Ok(StatusCode::OK.into_response())
        }
        other => {
            tracing::info!("unknown event type {}", other);
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn handle_event_callback(state: &Arc<AppState>, team: &str, event: SlackEvent) {
    match event.event_type.as_str() {
        "link_shared" => {
            tracing::info!(
                team_id = team,
                channel = %event.channel,
                ts = %event.message_ts,
                links = ?event.links.iter().map(|l| l.url.as_str()).collect::<Vec<_>>(),
                "link shared event"
            );
            state.pipeline.dispatch(
                team.to_string(),
                LinkSharedEvent {
                    channel: event.channel,
                    message_ts: event.message_ts,
                    links: event.links,
                },
            );
        }
        "tokens_revoked" => {
            for user in &event.tokens.oauth {
                tracing::info!(team_id = team, user_id = %user, "deleting oauth token");
                if let Err(e) = state.store.delete_user_token(team, user).await {
                    tracing::error!(team_id = team, user_id = %user, error = %e, "delete_user_token failed");
                }
            }
        }
        "app_uninstalled" => {
            tracing::info!(team_id = team, "deleting team data");
            if let Err(e) = state.store.delete_team(team).await {
                tracing::error!(team_id = team, error = %e, "delete_team failed");
            }
        }
        other => tracing::info!("unsupported event subtype {}", other),
    }
}

/// POST /slash: slash command endpoint
pub async fn slash_command(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SlashCommandForm>,
) -> Result<Response, AppError> {
    verify_token(&state.config.verification_token, &form.token, "/slash")?;

    tracing::info!(
        team_id = %form.team_id,
        user_id = %form.user_id,
        "received slash command: {} {}",
        form.command,
        form.text
    );

    if form.command != SLASH_COMMAND {
        tracing::info!("unsupported slack command {}", form.command);
        return Ok(StatusCode::OK.into_response());
    }

    let text = state.commands.execute(&form.team_id, &form.text).await;
    Ok(Json(SlashCommandResponse {
        response_type: "ephemeral",
        text,
    })
    .into_response())
}

/// GET /oauth: redirect target of the "Add to Slack" flow
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallback>,
) -> Html<&'static str> {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!("oauth flow returned error: {}", error);
    }

    if let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) {
        if let Err(e) = complete_oauth(&state, code).await {
            tracing::warn!(error = %e, "oauth exchange failed");
        }
    }

    Html(THANKS_HTML)
}

async fn complete_oauth(state: &AppState, code: &str) -> Result<(), AppError> {
    let access = state
        .slack
        .exchange_oauth_code(&state.config.client_id, &state.config.client_secret, code)
        .await?;

    state
        .store
        .save_user_token(&access.team_id, &access.user_id, &access.access_token)
        .await?;

    tracing::info!(
        team_id = %access.team_id,
        user_id = %access.user_id,
        team_name = %access.team_name,
        scope = %access.scope,
        "saved auth token"
    );
    Ok(())
}

/// Compare the verification token Slack sent with the configured one.
fn verify_token(expected: &str, provided: &str, endpoint: &str) -> Result<(), AppError> {
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        return Ok(());
    }

    // Never log the full provided token
    let masked = if provided.len() > 8 {
        format!("{}…", provided.chars().take(4).collect::<String>())
    } else {
        "****".to_string()
    };
    tracing::warn!(endpoint, provided = %masked, "verification token did not match");
    Err(AppError::AuthMismatch)
}
