//! gator: a command-line RSS aggregator.
//!
//! Users follow feeds, `gator agg` polls them one at a time and stores new
//! posts, and `gator browse` shows the latest posts from followed feeds.

pub mod cli;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
