//! The gator commands.
//!
//! Handlers print their result on stdout and report failures as
//! [`CommandError`]; logging goes to stderr through `tracing`.
use futures::FutureExt;
use std::time::Duration;

use super::{Command, CommandError, HandlerFuture, State};
use crate::feed::FeedScheduler;
use crate::storage::{Database, Feed, PostWithFeed, User};
use crate::util::{strip_control_chars, strip_markup, validate_url};

/// Posts shown by `browse` when no limit is given
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// Descriptions containing this are link-aggregator boilerplate, not content
const BOILERPLATE_MARKER: &str = "<p>Article URL:";

// ============================================================================
// Account commands
// ============================================================================

pub fn register<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let [name] = command.exact_args::<1>("<name>")?;
        let user = match state.db.create_user(name).await {
            Ok(user) => user,
            Err(e) if e.is_unique_violation() => {
                return Err(CommandError::Conflict(format!("user {name:?} already exists")));
            }
            Err(e) => return Err(e.into()),
        };
        state.config.set_user(&user.name)?;
        tracing::info!(user = %user.name, id = %user.id, "User registered");
        println!("User created: {}", user.name);
        Ok(())
    }
    .boxed()
}

pub fn login<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let [name] = command.exact_args::<1>("<name>")?;
        let user = state
            .db
            .get_user_by_name(name)
            .await?
            .ok_or_else(|| CommandError::NotFound(format!("user {name:?}")))?;
        state.config.set_user(&user.name)?;
        println!("Logged in as {}", user.name);
        Ok(())
    }
    .boxed()
}

pub fn reset<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.exact_args::<0>("")?;
        let removed = state.db.reset().await?;
        tracing::info!(users = removed, "Database reset");
        println!("Database reset, {removed} user(s) removed");
        Ok(())
    }
    .boxed()
}

pub fn users<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.exact_args::<0>("")?;
        let current = state.config.current_user();
        let users = state.db.get_users(current).await?;
        print!("{}", render_users(&users, current));
        Ok(())
    }
    .boxed()
}

fn render_users(users: &[User], current: Option<&str>) -> String {
    users
        .iter()
        .map(|user| {
            if Some(user.name.as_str()) == current {
                format!("* {} (current)\n", user.name)
            } else {
                format!("* {}\n", user.name)
            }
        })
        .collect()
}

// ============================================================================
// Aggregation
// ============================================================================

pub fn agg<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        let [raw] = command.exact_args::<1>("<time_between_reqs>")?;
        let interval = parse_interval(raw).map_err(|reason| command.usage(&reason))?;

        println!("Collecting feeds every {}", humantime::format_duration(interval));
        let scheduler = FeedScheduler::new(state.db.clone(), state.client.clone());
        scheduler.run_forever(interval, shutdown_signal()).await;
        Ok(())
    }
    .boxed()
}

/// A humantime duration such as `30s` or `1m30s`. Zero is refused.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw)
        .map_err(|e| format!("<time_between_reqs> ({raw:?} is not a duration: {e})"))?;
    if interval.is_zero() {
        return Err("<time_between_reqs> (must be greater than zero)".to_string());
    }
    Ok(interval)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Feed commands
// ============================================================================

pub fn addfeed<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        let [name, raw_url] = command.exact_args::<2>("<name> <url>")?;
        let url = validate_url(raw_url)?;

        let feed = match state.db.create_feed(name, url.as_str(), user.id).await {
            Ok(feed) => feed,
            Err(e) if e.is_unique_violation() => {
                return Err(CommandError::Conflict(format!(
                    "a feed with URL {} already exists",
                    url.as_str()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        // The feed was created a moment ago, so nobody can be following it yet
        let follow = state.db.create_feed_follow(user.id, feed.id).await?;

        tracing::info!(feed = %feed.name, url = %feed.url, user = %user.name, "Feed added");
        println!("Feed added: {} ({})", feed.name, feed.url);
        println!("{} is now following {}", follow.user_name, follow.feed_name);
        Ok(())
    }
    .boxed()
}

pub fn feeds<'a>(state: &'a mut State, command: &'a Command) -> HandlerFuture<'a> {
    async move {
        command.exact_args::<0>("")?;
        let feeds = state.db.get_feeds_with_owners().await?;
        if feeds.is_empty() {
            println!("No feeds yet, add one with `gator addfeed <name> <url>`");
        }
        for feed in &feeds {
            println!("* {} ({}) added by {}", feed.name, feed.url, feed.owner_name);
        }
        Ok(())
    }
    .boxed()
}

pub fn follow<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        let [target] = command.exact_args::<1>("<feed name or url>")?;
        let feed = resolve_feed(&state.db, target)
            .await?
            .ok_or_else(|| CommandError::NotFound(format!("feed {target:?}")))?;

        if state.db.get_feed_follow(user.id, feed.id).await?.is_some() {
            return Err(CommandError::Conflict(format!(
                "you are already following {:?}",
                feed.name
            )));
        }
        let follow = state.db.create_feed_follow(user.id, feed.id).await?;
        println!("{} is now following {}", follow.user_name, follow.feed_name);
        Ok(())
    }
    .boxed()
}

pub fn following<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        command.exact_args::<0>("")?;
        let follows = state.db.get_feed_follows_for_user(user.id).await?;
        if follows.is_empty() {
            println!("{} is not following any feeds", user.name);
        }
        for follow in &follows {
            println!("* {}", follow.feed_name);
        }
        Ok(())
    }
    .boxed()
}

pub fn unfollow<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        let [target] = command.exact_args::<1>("<feed name or url>")?;
        let feed = resolve_feed(&state.db, target)
            .await?
            .ok_or_else(|| CommandError::NotFound(format!("feed {target:?}")))?;

        if state.db.delete_feed_follow(user.id, feed.id).await? == 0 {
            return Err(CommandError::NotFound(format!(
                "a follow of {:?} by {}",
                feed.name, user.name
            )));
        }
        println!("{} unfollowed {}", user.name, feed.name);
        Ok(())
    }
    .boxed()
}

/// Find a feed by name or URL. URLs are also tried in the normalized form
/// `addfeed` stores them in (`https://example.com` -> `https://example.com/`).
async fn resolve_feed(db: &Database, target: &str) -> Result<Option<Feed>, CommandError> {
    if let Some(feed) = db.find_feed(target).await? {
        return Ok(Some(feed));
    }
    match url::Url::parse(target.trim()) {
        Ok(url) if url.as_str() != target => Ok(db.find_feed(url.as_str()).await?),
        _ => Ok(None),
    }
}

// ============================================================================
// Reading
// ============================================================================

pub fn browse<'a>(state: &'a mut State, command: &'a Command, user: User) -> HandlerFuture<'a> {
    async move {
        let limit = parse_limit(command)?;
        let posts = state.db.get_posts_for_user(user.id, limit).await?;
        if posts.is_empty() {
            println!("No posts yet, follow some feeds and run `gator agg`");
        }
        for post in &posts {
            println!("{}", render_post(post));
        }
        Ok(())
    }
    .boxed()
}

fn parse_limit(command: &Command) -> Result<i64, CommandError> {
    match command.args.as_slice() {
        [] => Ok(DEFAULT_BROWSE_LIMIT),
        [raw] => match raw.parse::<i64>() {
            Ok(limit) if limit > 0 => Ok(limit),
            _ => Err(command.usage("[limit] (a positive whole number)")),
        },
        _ => Err(command.usage("[limit]")),
    }
}

fn render_post(post: &PostWithFeed) -> String {
    let published = chrono::DateTime::from_timestamp(post.published_at, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S %z").to_string())
        .unwrap_or_else(|| post.published_at.to_string());

    let mut out = format!(
        "{}\n  {}\n  {published} | {}\n",
        strip_control_chars(&post.title),
        strip_control_chars(&post.url),
        strip_control_chars(&post.feed_name),
    );
    if !post.description.contains(BOILERPLATE_MARKER) {
        let text = strip_markup(&post.description);
        if !text.is_empty() {
            out.push_str("  ");
            out.push_str(&strip_control_chars(&text));
            out.push('\n');
        }
    }
    out
}
