//! Discord adapter for the antenne relay.
//!
//! Implements the core's platform seams on top of serenity (gateway,
//! cache, REST) and songbird (voice connection, audio driver):
//!
//! - **[`DiscordPlatform`]**: guild and channel lookups, voice-state
//!   presence from the gateway cache, and voice joins.
//! - **[`SongbirdPlayer`]**: the audio output; plays one file at a time on
//!   the attached call and reports track end / error events.
//! - **[`DiscordBot`]**: builds the serenity client with songbird
//!   registered, waits for the gateway to become ready, and shuts the
//!   shards down on exit.

pub mod bot;
pub mod error;
pub mod platform;
pub mod player;

pub use bot::DiscordBot;
pub use error::DiscordError;
pub use platform::{DiscordPlatform, SongbirdConnection};
pub use player::SongbirdPlayer;
