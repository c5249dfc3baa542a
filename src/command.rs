//! `/rollbar` slash command: register, remove, and list project tokens.

use std::sync::Arc;

use crate::rollbar::RollbarClient;
use crate::store::CredentialStore;
use crate::unfurl::matcher::{match_project_url, project_url, ROLLBAR_WEB_BASE};

pub const SLASH_COMMAND: &str = "/rollbar";

pub const USAGE: &str = "Usage:\n\
    `/rollbar set <project url> <project token>` - set read access token for project\n\
    `/rollbar clear <project url>` - clear access token for project\n\
    `/rollbar list` - list all projects that I will unfurl\n\n\
    For example: `/rollbar set https://rollbar.com/MyOrganization/MyProject/ abcdef12345`";

pub const GENERAL_ERROR: &str = "An error occurred while executing the command. Please try again!";

pub const NO_PROJECTS: &str = "No Rollbar projects have been configured for your team.\n\
    Use `/rollbar set` to add one.";

fn invalid_project_url(input: &str) -> String {
    format!(
        "Sorry, {} doesn't look like a Rollbar project URL. It should look like this: \
         {}/MyOrganization/MyProject/",
        input, ROLLBAR_WEB_BASE
    )
}

fn invalid_token(token: &str, project: &str) -> String {
    format!(
        "Sorry, Rollbar reports {} is not a valid access token. Please copy the _read_ token from \
         {}/{}/settings/access_tokens/",
        token, ROLLBAR_WEB_BASE, project
    )
}

fn token_added(project: &str) -> String {
    format!(
        "Thanks! I will now unfurl links from {}/{}/items/ for you.",
        ROLLBAR_WEB_BASE, project
    )
}

fn token_removed(project: &str) -> String {
    format!(
        "Done! I will no longer unfurl links from {}/{}/items/.",
        ROLLBAR_WEB_BASE, project
    )
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    List,
    Set { project_url: &'a str, token: &'a str },
    Clear { project_url: &'a str },
    Usage,
}

impl<'a> Command<'a> {
    pub fn parse(text: &'a str) -> Self {
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            ["list", ..] => Command::List,
            ["set", url, token] => Command::Set {
                project_url: *url,
                token: *token,
            },
            ["clear", url] => Command::Clear { project_url: *url },
            _ => Command::Usage,
        }
    }
}

#[derive(Clone)]
pub struct CommandProcessor {
    store: Arc<dyn CredentialStore>,
    rollbar: RollbarClient,
}

impl CommandProcessor {
    pub fn new(store: Arc<dyn CredentialStore>, rollbar: RollbarClient) -> Self {
        Self { store, rollbar }
    }

    /// Run the command and return the text to show the user. Never fails;
    /// every error becomes a message.
    pub async fn execute(&self, team: &str, text: &str) -> String {
        match Command::parse(text) {
            Command::List => self.list(team).await,
            Command::Set { project_url, token } => self.set(team, project_url, token).await,
            Command::Clear { project_url } => self.clear(team, project_url).await,
            Command::Usage => USAGE.to_string(),
        }
    }

    async fn list(&self, team: &str) -> String {
        let projects = match self.store.list_projects(team).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(team_id = team, error = %e, "list_projects failed");
                return GENERAL_ERROR.to_string();
            }
        };

        if projects.is_empty() {
            return NO_PROJECTS.to_string();
        }

        let urls: Vec<String> = projects.iter().map(|p| project_url(p)).collect();
        format!("I will unfurl links from the following projects:\n{}", urls.join("\n"))
    }

    async fn set(&self, team: &str, input_url: &str, token: &str) -> String {
        let Some(project) = match_project_url(input_url) else {
            return invalid_project_url(input_url);
        };

        if !self.rollbar.is_valid_token(token).await {
            tracing::info!(team_id = team, project = %project, "rejected invalid rollbar token");
            return invalid_token(token, &project);
        }

        match self.store.save_project_token(team, &project, token).await {
            Ok(()) => {
                tracing::info!(team_id = team, project = %project, "project token registered");
                token_added(&project)
            }
            Err(e) => {
                tracing::error!(team_id = team, project = %project, error = %e, "save_project_token failed");
                GENERAL_ERROR.to_string()
            }
        }
    }

    async fn clear(&self, team: &str, input_url: &str) -> String {
        let Some(project) = match_project_url(input_url) else {
            return invalid_project_url(input_url);
        };

        match self.store.delete_project_token(team, &project).await {
            Ok(()) => {
                tracing::info!(team_id = team, project = %project, "project token cleared");
                token_removed(&project)
            }
            Err(e) => {
                tracing::error!(team_id = team, project = %project, error = %e, "delete_project_token failed");
                GENERAL_ERROR.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_ignores_extra_arguments() {
        assert_eq!(Command::parse("list"), Command::List);
        assert_eq!(Command::parse("list everything"), Command::List);
    }

    #[test]
    fn test_parse_set_requires_exactly_two_arguments() {
        assert_eq!(
            Command::parse("set https://rollbar.com/a/b/ tok"),
            Command::Set {
                project_url: "https://rollbar.com/a/b/",
                token: "tok"
            }
        );
        assert_eq!(Command::parse("set https://rollbar.com/a/b/"), Command::Usage);
        assert_eq!(Command::parse("set a b c"), Command::Usage);
    }

    #[test]
    fn test_parse_clear_requires_one_argument() {
        assert_eq!(
            Command::parse("clear https://rollbar.com/a/b/"),
            Command::Clear {
                project_url: "https://rollbar.com/a/b/"
            }
        );
        assert_eq!(Command::parse("clear"), Command::Usage);
        assert_eq!(Command::parse("clear x y"), Command::Usage);
    }

    #[test]
    fn test_parse_tolerates_repeated_whitespace() {
        assert_eq!(
            Command::parse("  clear   https://rollbar.com/a/b/  "),
            Command::Clear {
                project_url: "https://rollbar.com/a/b/"
            }
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(Command::parse(""), Command::Usage);
        assert_eq!(Command::parse("help"), Command::Usage);
        assert_eq!(Command::parse("LIST"), Command::Usage);
    }

    #[test]
    fn test_messages_name_the_project() {
        assert!(token_added("acme/web").contains("https://rollbar.com/acme/web/items/"));
        assert!(token_removed("acme/web").contains("https://rollbar.com/acme/web/items/"));
        assert!(invalid_token("tok", "acme/web").contains("tok"));
        assert!(invalid_project_url("foo").starts_with("Sorry, foo doesn't look like"));
    }
}
