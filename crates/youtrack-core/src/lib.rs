//! Core traits, types, and error handling for the YouTrack MCP server.
//!
//! This crate provides the foundational abstractions shared by the REST
//! client, the MCP server, and the CLI.

pub mod config;
pub mod error;
pub mod service;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use service::{IssueFields, IssueService, SearchParams};
