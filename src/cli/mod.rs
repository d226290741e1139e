//! Command dispatch.
//!
//! - [`registry`] - the name-to-handler table and the [`LoggedIn`] decorator
//! - [`handlers`] - one function per command
//!
//! A process runs exactly one command: `main` builds a [`State`], looks the
//! command up in [`CommandRegistry::standard`] and runs it.

pub mod handlers;
pub mod registry;

pub use registry::{CommandRegistry, Handler, HandlerFuture, LoggedIn, UserHandler};

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::feed::HttpFeedClient;
use crate::storage::{Database, DatabaseError};
use crate::util::UrlValidationError;

/// Failures a command reports back to `main`. All of them end the process
/// with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("not logged in, run `gator login <name>` first")]
    NotLoggedIn,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),
}

/// Everything a handler may touch.
pub struct State {
    pub db: Database,
    pub config: Config,
    pub client: HttpFeedClient,
}

impl State {
    pub fn new(db: Database, config: Config, client: HttpFeedClient) -> Self {
        Self { db, config, client }
    }
}

/// One CLI invocation: the command name and its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Exactly `N` arguments, or a usage error built from `usage`.
    ///
    /// `usage` names the arguments, e.g. `"<name> <url>"`.
    pub fn exact_args<const N: usize>(&self, usage: &str) -> Result<[&str; N], CommandError> {
        if self.args.len() != N {
            return Err(self.usage(usage));
        }
        Ok(std::array::from_fn(|i| self.args[i].as_str()))
    }

    /// A usage error for this command.
    pub fn usage(&self, usage: &str) -> CommandError {
        CommandError::Usage(format!("{} {usage}", self.name).trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_args() {
        let cmd = Command::new("addfeed", ["Hacker News", "https://news.ycombinator.com/rss"]);
        let [name, url] = cmd.exact_args::<2>("<name> <url>").unwrap();
        assert_eq!(name, "Hacker News");
        assert_eq!(url, "https://news.ycombinator.com/rss");
    }

    #[test]
    fn test_exact_args_wrong_count() {
        let cmd = Command::new("login", Vec::<String>::new());
        let err = cmd.exact_args::<1>("<name>").unwrap_err();
        assert_eq!(err.to_string(), "usage: login <name>");

        let cmd = Command::new("reset", ["now"]);
        let err = cmd.exact_args::<0>("").unwrap_err();
        assert_eq!(err.to_string(), "usage: reset");
    }
}
