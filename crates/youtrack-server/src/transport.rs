//! Stdio transport for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. Logging must go to
//! stderr; stdout carries only protocol messages.

use std::io::{self, BufRead, Write};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Message received from the client.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Parse a JSON-RPC message. Requests carry an `id`; anything that
    /// parses without one is a notification.
    pub fn parse(json: &str) -> Option<Self> {
        if let Ok(request) = serde_json::from_str::<JsonRpcRequest>(json) {
            return Some(IncomingMessage::Request(request));
        }
        if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(json) {
            return Some(IncomingMessage::Notification(notification));
        }
        None
    }
}

/// Transport reading/writing newline-delimited JSON-RPC messages.
pub struct StdioTransport {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self {
            reader: Box::new(io::BufReader::new(io::stdin())),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create a transport with custom reader/writer (for testing).
    #[cfg(test)]
    pub fn new(reader: Box<dyn BufRead + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self { reader, writer }
    }

    /// Read the next JSON-RPC message. Returns `None` on EOF. Blank lines
    /// are skipped.
    pub fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        loop {
            let mut line = String::new();

            match self.reader.read_line(&mut line) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    tracing::debug!("Received: {}", line);

                    return match IncomingMessage::parse(line) {
                        Some(msg) => Ok(Some(msg)),
                        None => {
                            tracing::warn!("Failed to parse message: {}", line);
                            Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                format!("Invalid JSON-RPC message: {}", line),
                            ))
                        }
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Write a JSON-RPC response followed by a newline, then flush.
    pub fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )
        })?;

        tracing::debug!("Sending: {}", json);

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }
}
