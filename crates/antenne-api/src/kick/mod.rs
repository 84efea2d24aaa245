// Kick public API
//
// Read-only access to the channel endpoint, which carries the current
// livestream record for a channel slug.

pub mod client;
pub mod models;

pub use client::KickClient;
pub use models::{ChannelResponse, Livestream};
