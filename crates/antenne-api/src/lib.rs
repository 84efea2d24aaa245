// antenne-api: Async client for the Kick livestream-status API

pub mod error;
pub mod kick;
pub mod transport;

pub use error::Error;
pub use kick::{ChannelResponse, KickClient, Livestream};
pub use transport::TransportConfig;
