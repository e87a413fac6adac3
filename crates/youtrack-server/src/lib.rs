//! MCP (Model Context Protocol) server exposing YouTrack tools.
//!
//! The protocol speaks JSON-RPC 2.0 over two transports: newline-delimited
//! messages on stdio, and HTTP with an SSE response channel. The HTTP
//! transport additionally serves a `/health` probe and a simplified
//! `POST /mcp` tool-call envelope.

pub mod handlers;
pub mod http;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handlers::ToolHandler;
pub use server::McpServer;
