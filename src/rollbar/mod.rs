//! Rollbar read API client.
//!
//! Three calls are used:
//! - `item_by_counter/{counter}` to resolve a public item link
//! - `instance/{id}` to fetch the occurrence carrying the stack trace
//! - `item/1` as a cheap probe when validating a freshly registered token

pub mod types;

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::errors::AppError;
pub use types::{Frame, Item, Occurrence, Trace};
use types::ApiEnvelope;

const INVALID_TOKEN_MESSAGE: &str = "invalid access token";

#[derive(Clone)]
pub struct RollbarClient {
    http: reqwest::Client,
    api_base: String,
}

impl RollbarClient {
    pub fn new(api_base: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("unfurler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build rollbar HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether `token` is accepted by Rollbar as a read token.
    ///
    /// Rollbar offers no way to check which project a token belongs to, so
    /// this only rejects tokens the API explicitly calls invalid. Transport
    /// and decode failures count as invalid.
    pub async fn is_valid_token(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let envelope = match self
            .fetch::<serde_json::Value>("item/1", token)
            .await
        {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "token validation request failed");
                return false;
            }
        };

        envelope.err == 0 || envelope.message.as_deref() != Some(INVALID_TOKEN_MESSAGE)
    }

    pub async fn get_item(&self, counter: &str, token: &str) -> Result<Item, AppError> {
        let envelope = self
            .fetch::<Item>(&format!("item_by_counter/{}", counter), token)
            .await?;
        unwrap_result(envelope)
    }

    pub async fn get_occurrence(&self, occurrence_id: u64, token: &str) -> Result<Occurrence, AppError> {
        let envelope = self
            .fetch::<Occurrence>(&format!("instance/{}", occurrence_id), token)
            .await?;
        unwrap_result(envelope)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<ApiEnvelope<T>, AppError> {
        let url = format!("{}/{}", self.api_base, path);
        tracing::debug!(%url, "calling rollbar");

        let resp = self
            .http
            .get(&url)
            .query(&[("access_token", token)])
            .send()
            .await?;

        // Rollbar reports application errors in the body, often with a 4xx
        // status, so the envelope is decoded regardless of status.
        let status = resp.status();
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AppError::Remote(format!(
                "undecodable rollbar response (status {}): {} (body: {})",
                status,
                e,
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}

fn unwrap_result<T>(envelope: ApiEnvelope<T>) -> Result<T, AppError> {
    if envelope.err != 0 {
        return Err(AppError::Remote(format!(
            "API error: {}",
            envelope.message.unwrap_or_default()
        )));
    }
    envelope
        .result
        .ok_or_else(|| AppError::Remote("response missing result".to_string()))
}
