//! # Candles Channels
//! Host platform implementations. Currently Discord, over plain REST.

pub mod discord;

pub use discord::DiscordChannel;
