use clap::{Parser, Subcommand};

/// Unfurler: Rollbar link previews for Slack
#[derive(Parser)]
#[command(name = "unfurler", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to bind (overrides UNFURLER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or remove installed teams
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Inspect or remove registered Rollbar projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Subcommand)]
pub enum TeamCommands {
    /// List every team with stored credentials
    List,
    /// Delete a team together with its user and project tokens
    Delete {
        #[arg(long)]
        team: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects registered for a team
    List {
        #[arg(long)]
        team: String,
    },
    /// Remove the read token for one project
    Clear {
        #[arg(long)]
        team: String,
        /// Project path, e.g. acme/web
        #[arg(long)]
        project: String,
    },
}
