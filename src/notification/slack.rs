use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::errors::AppError;

/// Slack Web API calls made on behalf of a team: posting unfurls and
/// completing the OAuth install flow.
#[derive(Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Result of exchanging an OAuth code for a user token.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAccess {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_id: String,
}

impl SlackClient {
    pub fn new(api_base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("unfurler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build slack HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Attach `unfurls` (a JSON object of URL → attachment) to the message
    /// identified by `channel` and `ts`.
    pub async fn post_unfurl(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        unfurls: &str,
    ) -> Result<(), AppError> {
        tracing::info!(channel, ts, "posting chat.unfurl");

        let resp = self
            .client
            .post(format!("{}/chat.unfurl", self.api_base))
            .form(&[
                ("token", token),
                ("channel", channel),
                ("ts", ts),
                ("unfurls", unfurls),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(channel, ts, %status, body = %body, "chat.unfurl response");

        let parsed: SlackResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Remote(format!("undecodable chat.unfurl response: {}", e)))?;
        if !parsed.ok {
            return Err(AppError::Remote(format!(
                "chat.unfurl failed: {}",
                parsed.error.unwrap_or_else(|| status.to_string())
            )));
        }
        Ok(())
    }

    /// Trade the code from the OAuth redirect for a user token.
    pub async fn exchange_oauth_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<OAuthAccess, AppError> {
        tracing::info!("posting oauth.access");

        let access: OAuthAccess = self
            .client
            .post(format!("{}/oauth.access", self.api_base))
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
            ])
            .send()
            .await?
            .json()
            .await?;

        if !access.ok {
            return Err(AppError::Remote(format!(
                "oauth.access failed: {}",
                access.error.clone().unwrap_or_default()
            )));
        }
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_unfurl_sends_form_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.unfurl"))
            .and(body_string_contains("token=xoxp-1"))
            .and(body_string_contains("channel=C123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SlackClient::new(mock_server.uri()).unwrap();
        client
            .post_unfurl("xoxp-1", "C123", "1500000000.000100", "{}")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_post_unfurl_surfaces_slack_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.unfurl"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ok":false,"error":"cannot_unfurl_url"}"#),
            )
            .mount(&mock_server)
            .await;

        let client = SlackClient::new(mock_server.uri()).unwrap();
        let err = client.post_unfurl("t", "C1", "1.1", "{}").await.unwrap_err();
        assert!(err.to_string().contains("cannot_unfurl_url"));
    }

    #[tokio::test]
    async fn test_oauth_exchange_returns_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth.access"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"ok":true,"access_token":"xoxp-9","scope":"links:write","user_id":"U1","team_name":"Acme","team_id":"T1"}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SlackClient::new(mock_server.uri()).unwrap();
        let access = client.exchange_oauth_code("id", "secret", "abc").await.unwrap();
        assert_eq!(access.access_token, "xoxp-9");
        assert_eq!(access.user_id, "U1");
        assert_eq!(access.team_id, "T1");
    }

    #[tokio::test]
    async fn test_oauth_exchange_rejected_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth.access"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ok":false,"error":"invalid_code"}"#),
            )
            .mount(&mock_server)
            .await;

        let client = SlackClient::new(mock_server.uri()).unwrap();
        let err = client.exchange_oauth_code("id", "secret", "bad").await.unwrap_err();
        assert!(matches!(err, AppError::Remote(ref m) if m.contains("invalid_code")));
    }
}
