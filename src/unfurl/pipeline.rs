//! Resolves the links of one `link_shared` event into previews and posts
//! them back to Slack in a single `chat.unfurl` call.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::assembler::{build_preview, Preview};
use super::matcher::match_item_link;
use crate::notification::slack::SlackClient;
use crate::rollbar::RollbarClient;
use crate::store::CredentialStore;

#[derive(Debug, Clone, Deserialize)]
pub struct SharedLink {
    #[serde(default)]
    pub domain: String,
    pub url: String,
}

/// The parts of a `link_shared` event the pipeline needs. `channel` and
/// `message_ts` are only echoed back to address the unfurl.
#[derive(Debug, Clone)]
pub struct LinkSharedEvent {
    pub channel: String,
    pub message_ts: String,
    pub links: Vec<SharedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnfurlOutcome {
    Posted { previews: usize },
    NothingToUnfurl,
    NoPostbackToken,
    PostbackFailed,
}

pub struct UnfurlPipeline {
    store: Arc<dyn CredentialStore>,
    rollbar: RollbarClient,
    slack: SlackClient,
}

impl UnfurlPipeline {
    pub fn new(store: Arc<dyn CredentialStore>, rollbar: RollbarClient, slack: SlackClient) -> Self {
        Self {
            store,
            rollbar,
            slack,
        }
    }

    /// Process the event on its own task. The outcome is only visible in logs.
    pub fn dispatch(self: &Arc<Self>, team: String, event: LinkSharedEvent) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = pipeline.run(&team, &event).await;
            tracing::debug!(
                team_id = %team,
                channel = %event.channel,
                ts = %event.message_ts,
                ?outcome,
                "unfurl pipeline finished"
            );
        });
    }

    pub async fn run(&self, team: &str, event: &LinkSharedEvent) -> UnfurlOutcome {
        let mut previews: BTreeMap<String, Preview> = BTreeMap::new();
        for link in &event.links {
            if let Some(preview) = self.preview_link(team, &link.url).await {
                previews.insert(link.url.clone(), preview);
            }
        }

        if previews.is_empty() {
            tracing::info!(
                channel = %event.channel,
                ts = %event.message_ts,
                "no links processed"
            );
            return UnfurlOutcome::NothingToUnfurl;
        }

        let unfurls = match serde_json::to_string(&previews) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(channel = %event.channel, ts = %event.message_ts, error = %e, "unfurl serialization failed");
                return UnfurlOutcome::PostbackFailed;
            }
        };

        let token = match self.store.get_auth_token(team).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(team_id = team, error = %e, "couldn't retrieve oauth token for team");
                return UnfurlOutcome::NoPostbackToken;
            }
        };

        match self
            .slack
            .post_unfurl(&token, &event.channel, &event.message_ts, &unfurls)
            .await
        {
            Ok(()) => UnfurlOutcome::Posted {
                previews: previews.len(),
            },
            Err(e) => {
                tracing::warn!(channel = %event.channel, ts = %event.message_ts, error = %e, "chat.unfurl failed");
                UnfurlOutcome::PostbackFailed
            }
        }
    }

    /// Build the preview for one link, or `None` if the link should be skipped.
    async fn preview_link(&self, team: &str, url: &str) -> Option<Preview> {
        let Some(item_ref) = match_item_link(url) else {
            tracing::debug!(url, "not a rollbar item link");
            return None;
        };

        let token = match self.store.get_project_token(team, &item_ref.project).await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                tracing::info!(team_id = team, project = %item_ref.project, "project isn't configured for team");
                return None;
            }
            Err(e) => {
                tracing::warn!(team_id = team, project = %item_ref.project, error = %e, "project token lookup failed");
                return None;
            }
        };

        let item = match self.rollbar.get_item(&item_ref.counter, &token).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(url, error = %e, "error getting item data");
                return None;
            }
        };

        // TODO: cache occurrences by id; they never change once recorded.
        let occurrence = match item.activating_occurrence_id {
            Some(id) => match self.rollbar.get_occurrence(id, &token).await {
                Ok(occurrence) => Some(occurrence),
                Err(e) => {
                    tracing::warn!(url, occurrence_id = id, error = %e, "couldn't fetch occurrence data");
                    None
                }
            },
            None => None,
        };

        Some(build_preview(&item, occurrence.as_ref(), Utc::now()))
    }
}
