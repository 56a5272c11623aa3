/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! # Forkey Engine
//!
//! IRC bot on top of the Forkey session reactor.
//!
//! This crate provides:
//! - **Bot**: Session handler answering pings, joining and announcing videos
//! - **Configuration**: JSON bot config and its session/TLS settings
//! - **IRC helpers**: Line inspection and command formatting
//! - **Link extraction**: Video id detection in channel messages
//! - **YouTube lookup**: Fetcher turning API responses into summary lines
//! - **Builder API**: Fluent configuration of a TLS reactor

pub mod bot;
pub mod builder;
pub mod config;
pub mod irc;
pub mod links;
pub mod youtube;

pub use bot::Bot;
pub use builder::{EngineBuilder, TlsReactor};
pub use config::BotConfig;
pub use links::find_youtube_ids;
pub use youtube::YoutubeFetcher;
