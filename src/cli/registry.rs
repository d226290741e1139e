use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;

use super::{handlers, Command, CommandError, State};
use crate::storage::User;

/// The future every handler returns.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), CommandError>>;

/// A command that runs without a resolved user.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, state: &'a mut State, command: &'a Command) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut State, &'a Command) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
        self(state, command)
    }
}

/// A command that needs the logged-in user. Wrap it in [`LoggedIn`] to
/// register it.
pub trait UserHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        state: &'a mut State,
        command: &'a Command,
        user: User,
    ) -> HandlerFuture<'a>;
}

impl<F> UserHandler for F
where
    F: for<'a> Fn(&'a mut State, &'a Command, User) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        state: &'a mut State,
        command: &'a Command,
        user: User,
    ) -> HandlerFuture<'a> {
        self(state, command, user)
    }
}

/// Resolves the current user before running the inner handler.
///
/// Fails with [`CommandError::NotLoggedIn`] when the config names no user and
/// [`CommandError::NotFound`] when the named user is gone from the store; in
/// both cases the inner handler is never called.
pub struct LoggedIn<H>(pub H);

impl<H: UserHandler> Handler for LoggedIn<H> {
    fn call<'a>(&'a self, state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
        async move {
            let name = state
                .config
                .current_user()
                .ok_or(CommandError::NotLoggedIn)?
                .to_string();
            let user = state
                .db
                .get_user_by_name(&name)
                .await?
                .ok_or_else(|| CommandError::NotFound(format!("user {name:?}")))?;
            tracing::debug!(user = %user.name, command = %command.name, "Resolved current user");
            self.0.call(state, command, user).await
        }
        .boxed()
    }
}

/// Name-to-handler table.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every gator command.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("register", handlers::register);
        registry.register("login", handlers::login);
        registry.register("reset", handlers::reset);
        registry.register("users", handlers::users);
        registry.register("agg", handlers::agg);
        registry.register("feeds", handlers::feeds);
        registry.register("addfeed", LoggedIn(handlers::addfeed));
        registry.register("follow", LoggedIn(handlers::follow));
        registry.register("following", LoggedIn(handlers::following));
        registry.register("unfollow", LoggedIn(handlers::unfollow));
        registry.register("browse", LoggedIn(handlers::browse));
        registry
    }

    /// Add `handler` under `name`, replacing any handler already there.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            tracing::debug!(command = %name, "Replaced existing handler");
        }
    }

    /// Dispatch `command` to its handler.
    pub async fn run(&self, state: &mut State, command: &Command) -> Result<(), CommandError> {
        let handler = self
            .handlers
            .get(&command.name)
            .ok_or_else(|| CommandError::UnknownCommand(command.name.clone()))?;
        tracing::debug!(command = %command.name, args = ?command.args, "Running command");
        handler.call(state, command).await
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::feed::HttpFeedClient;
    use crate::storage::Database;
    use std::sync::{Arc, Mutex};

    /// Records its label every time it runs.
    struct Recorder {
        label: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Handler for Recorder {
        fn call<'a>(&'a self, _state: &'a mut State, _command: &'a Command) -> HandlerFuture<'a> {
            self.calls.lock().unwrap().push(self.label.to_string());
            async { Ok(()) }.boxed()
        }
    }

    impl UserHandler for Recorder {
        fn call<'a>(
            &'a self,
            _state: &'a mut State,
            _command: &'a Command,
            user: User,
        ) -> HandlerFuture<'a> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, user.name));
            async { Ok(()) }.boxed()
        }
    }

    async fn state(user: Option<&str>) -> State {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let mut config = Config::new(
            std::env::temp_dir().join(format!("gator_registry_{}.json", uuid::Uuid::new_v4())),
            "sqlite::memory:",
        );
        if let Some(name) = user {
            config.current_user_name = name.to_string();
        }
        State::new(db, config, HttpFeedClient::new().unwrap())
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        registry.register("ping", Recorder { label: "first", calls: calls.clone() });
        registry.register("ping", Recorder { label: "second", calls: calls.clone() });

        let mut state = state(None).await;
        registry
            .run(&mut state, &Command::new("ping", Vec::<String>::new()))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["second".to_string()]);
        assert_eq!(registry.names(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let registry = CommandRegistry::new();
        let mut state = state(None).await;
        let err = registry
            .run(&mut state, &Command::new("nope", ["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_logged_in_without_user_skips_inner() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        registry.register("secret", LoggedIn(Recorder { label: "secret", calls: calls.clone() }));

        let mut state = state(None).await;
        let err = registry
            .run(&mut state, &Command::new("secret", Vec::<String>::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::NotLoggedIn));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logged_in_unknown_user_skips_inner() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        registry.register("secret", LoggedIn(Recorder { label: "secret", calls: calls.clone() }));

        let mut state = state(Some("ghost")).await;
        let err = registry
            .run(&mut state, &Command::new("secret", Vec::<String>::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::NotFound(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logged_in_passes_resolved_user() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        registry.register("secret", LoggedIn(Recorder { label: "secret", calls: calls.clone() }));

        let mut state = state(Some("alice")).await;
        state.db.create_user("alice").await.unwrap();
        registry
            .run(&mut state, &Command::new("secret", Vec::<String>::new()))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["secret:alice".to_string()]);
    }

    #[test]
    fn test_standard_table() {
        let registry = CommandRegistry::standard();
        assert_eq!(
            registry.names(),
            vec![
                "addfeed", "agg", "browse", "feeds", "follow", "following", "login", "register",
                "reset", "unfollow", "users",
            ]
        );
    }
}
