//! Recognizes Rollbar item links and project URLs.

use once_cell::sync::Lazy;
use regex::Regex;

pub const ROLLBAR_WEB_BASE: &str = "https://rollbar.com";

static ITEM_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9_\-.]+/[a-zA-Z0-9_\-.]+)/items/(\d+)/?").expect("valid item regex")
});

static PROJECT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://rollbar\.com/([a-zA-Z0-9_\-.]+/[a-zA-Z0-9_\-.]+)(?:/.*)?$")
        .expect("valid project regex")
});

/// A reference to one item inside a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Lower-cased `org/project`.
    pub project: String,
    /// Public per-project item counter, kept as text.
    pub counter: String,
}

/// Extract the project and item counter from a link such as
/// `https://rollbar.com/Acme/web/items/42/`.
pub fn match_item_link(url: &str) -> Option<ItemRef> {
    let caps = ITEM_LINK.captures(url)?;
    Some(ItemRef {
        project: caps[1].to_lowercase(),
        counter: caps[2].to_string(),
    })
}

/// Extract the normalized `org/project` from a project URL such as
/// `https://rollbar.com/Acme/web/`.
pub fn match_project_url(url: &str) -> Option<String> {
    PROJECT_URL
        .captures(url)
        .map(|caps| caps[1].to_lowercase())
}

/// Canonical web URL of a project.
pub fn project_url(project: &str) -> String {
    format!("{}/{}/", ROLLBAR_WEB_BASE, project)
}
