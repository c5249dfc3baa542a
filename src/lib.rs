//! Unfurler: Rollbar item previews for Slack.
//!
//! Library crate shared by the server binary and the integration tests in `tests/`.

pub mod api;
pub mod command;
pub mod config;
pub mod errors;
pub mod notification;
pub mod rollbar;
pub mod store;
pub mod unfurl;

use std::sync::Arc;

use command::CommandProcessor;
use notification::slack::SlackClient;
use rollbar::RollbarClient;
use store::CredentialStore;
use unfurl::UnfurlPipeline;

/// Shared application state passed to handlers.
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub pipeline: Arc<UnfurlPipeline>,
    pub commands: CommandProcessor,
    pub slack: SlackClient,
    pub config: config::Config,
}

impl AppState {
    /// Wire the clients and processors around an already opened store.
    pub fn new(config: config::Config, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let rollbar = RollbarClient::new(config.rollbar_api_base.clone())?;
        let slack = SlackClient::new(config.slack_api_base.clone())?;

        Ok(Self {
            pipeline: Arc::new(UnfurlPipeline::new(store.clone(), rollbar.clone(), slack.clone())),
            commands: CommandProcessor::new(store.clone(), rollbar),
            store,
            slack,
            config,
        })
    }
}
