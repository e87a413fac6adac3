//! YouTrack REST API client.
//!
//! A thin pass-through client: requests are typed, responses are relayed
//! as the JSON YouTrack returns.

pub mod client;

pub use client::YouTrackClient;
