pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://unfurler.db";
pub const DEFAULT_ROLLBAR_API: &str = "https://api.rollbar.com/api/1";
pub const DEFAULT_SLACK_API: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct Config {
    /// Host to listen on. Empty means all interfaces.
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub client_secret: String,
    /// Shared secret Slack sends with every event and slash command.
    pub verification_token: String,
    pub database_url: String,
    pub rollbar_api_base: String,
    pub slack_api_base: String,
}

impl Config {
    pub fn bind_addr(&self, port: u16) -> String {
        let host = if self.host.is_empty() { "0.0.0.0" } else { &self.host };
        format!("{}:{}", host, port)
    }

    /// The Slack app credentials are only needed to serve webhooks;
    /// operator commands run without them.
    pub fn require_slack(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("UNFURLER_CLIENT_ID", &self.client_id),
            ("UNFURLER_CLIENT_SECRET", &self.client_secret),
            ("UNFURLER_VERIFICATION_TOKEN", &self.verification_token),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} is not set", name);
            }
        }
        Ok(())
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Ok(from_lookup(|name| std::env::var(name).ok()))
}

fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Config {
    Config {
        host: var("UNFURLER_HOST").unwrap_or_default(),
        port: var("UNFURLER_PORT")
            .and_then(|v| v.parse().ok())
            .filter(|p| *p != 0)
            .unwrap_or(DEFAULT_PORT),
        client_id: var("UNFURLER_CLIENT_ID").unwrap_or_default(),
        client_secret: var("UNFURLER_CLIENT_SECRET").unwrap_or_default(),
        verification_token: var("UNFURLER_VERIFICATION_TOKEN").unwrap_or_default(),
        database_url: var("UNFURLER_DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
        rollbar_api_base: var("UNFURLER_ROLLBAR_API")
            .unwrap_or_else(|| DEFAULT_ROLLBAR_API.into()),
        slack_api_base: var("UNFURLER_SLACK_API").unwrap_or_else(|| DEFAULT_SLACK_API.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str) -> Config {
        Config {
            host: host.into(),
            port: DEFAULT_PORT,
            client_id: "id".into(),
            client_secret: "secret".into(),
            verification_token: "verify".into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            rollbar_api_base: DEFAULT_ROLLBAR_API.into(),
            slack_api_base: DEFAULT_SLACK_API.into(),
        }
    }

    #[test]
    fn test_bind_addr_defaults_to_all_interfaces() {
        assert_eq!(config("").bind_addr(8888), "0.0.0.0:8888");
    }

    #[test]
    fn test_bind_addr_uses_configured_host() {
        assert_eq!(config("127.0.0.1").bind_addr(9000), "127.0.0.1:9000");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_operator_config_loads_without_slack_credentials() {
        let cfg = from_lookup(lookup(&[("UNFURLER_DATABASE_URL", "sqlite://ops.db")]));
        assert_eq!(cfg.database_url, "sqlite://ops.db");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.rollbar_api_base, DEFAULT_ROLLBAR_API);
        assert!(cfg.client_id.is_empty());
    }

    #[test]
    fn test_require_slack_names_missing_variable() {
        let cfg = from_lookup(lookup(&[
            ("UNFURLER_CLIENT_ID", "id"),
            ("UNFURLER_CLIENT_SECRET", "secret"),
        ]));
        let err = cfg.require_slack().unwrap_err();
        assert_eq!(err.to_string(), "UNFURLER_VERIFICATION_TOKEN is not set");

        let cfg = from_lookup(lookup(&[("UNFURLER_CLIENT_ID", "  ")]));
        assert_eq!(cfg.require_slack().unwrap_err().to_string(), "UNFURLER_CLIENT_ID is not set");
    }

    #[test]
    fn test_require_slack_accepts_full_config() {
        assert!(config("").require_slack().is_ok());
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let cfg = from_lookup(lookup(&[("UNFURLER_PORT", "not-a-port")]));
        assert_eq!(cfg.port, DEFAULT_PORT);
        let cfg = from_lookup(lookup(&[("UNFURLER_PORT", "9000")]));
        assert_eq!(cfg.port, 9000);
    }
}
