//! Tool handlers for the MCP server.
//!
//! Each tool maps directly onto one `IssueService` operation. Mutating
//! tools are gated on the read-only flag before any network traffic
//! happens.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use youtrack_core::{Error, IssueFields, IssueService, Result, SearchParams, ServerConfig};

use crate::protocol::{ToolCallResult, ToolDefinition};

/// Tool handler that executes tools against the YouTrack backend.
pub struct ToolHandler {
    service: Arc<dyn IssueService>,
    config: Arc<ServerConfig>,
}

impl ToolHandler {
    /// Create a new tool handler.
    pub fn new(service: Arc<dyn IssueService>, config: Arc<ServerConfig>) -> Self {
        Self { service, config }
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "server_info".to_string(),
                description: "Get YouTrack MCP server status and configuration".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolDefinition {
                name: "youtrack_search_issues".to_string(),
                description: "Search for issues in YouTrack using a query".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query string (YouTrack query syntax)"
                        },
                        "fields": {
                            "type": "string",
                            "description": "Comma-separated list of fields to return for each issue"
                        },
                        "custom_fields": {
                            "type": "string",
                            "description": "Additional comma-separated list of custom fields to include"
                        },
                        "top": {
                            "type": "integer",
                            "description": "The maximum number of issues to return (default: 100)",
                            "minimum": 0
                        },
                        "skip": {
                            "type": "integer",
                            "description": "The number of issues to skip from the beginning of the results",
                            "minimum": 0
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "youtrack_get_issue".to_string(),
                description: "Get details for a specific YouTrack issue by its ID".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "issue_id": {
                            "type": "string",
                            "description": "The ID of the issue (e.g. \"PROJ-123\")"
                        },
                        "fields": {
                            "type": "string",
                            "description": "Comma-separated list of fields to return for the issue"
                        },
                        "custom_fields": {
                            "type": "string",
                            "description": "Additional comma-separated list of custom fields to include"
                        }
                    },
                    "required": ["issue_id"]
                }),
            },
            ToolDefinition {
                name: "youtrack_update_issue".to_string(),
                description: "Update an existing YouTrack issue by its ID".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "issue_id": {
                            "type": "string",
                            "description": "The ID of the issue to update"
                        },
                        "data": {
                            "type": "object",
                            "description": "Fields to update and their new values, forwarded verbatim"
                        },
                        "fields": {
                            "type": "string",
                            "description": "Comma-separated list of fields to return for the updated issue"
                        }
                    },
                    "required": ["issue_id", "data"]
                }),
            },
            ToolDefinition {
                name: "youtrack_add_comment".to_string(),
                description: "Add a comment to a YouTrack issue".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "issue_id": {
                            "type": "string",
                            "description": "The ID of the issue to comment on"
                        },
                        "comment_text": {
                            "type": "string",
                            "description": "The text content of the comment"
                        },
                        "fields": {
                            "type": "string",
                            "description": "Comma-separated list of fields to return for the created comment"
                        }
                    },
                    "required": ["issue_id", "comment_text"]
                }),
            },
        ]
    }

    /// The `server_info` payload, also served as the `server://info`
    /// resource.
    pub fn server_info(&self) -> Value {
        json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "server": self.config.server_name,
            "youtrack_url": self.config.display_url(),
            "host_binding": self.config.host,
            "port": self.config.port,
            "debug_mode": self.config.debug_mode(),
        })
    }

    /// Invoke a tool by name, returning the raw JSON result.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        match name {
            "server_info" => Ok(self.server_info()),
            "youtrack_search_issues" => {
                let args: SearchIssuesArgs = parse_args(arguments)?;
                self.service
                    .search_issues(SearchParams {
                        query: args.query,
                        fields: args.fields,
                        custom_fields: args.custom_fields,
                        top: args.top,
                        skip: args.skip,
                    })
                    .await
            }
            "youtrack_get_issue" => {
                let args: GetIssueArgs = parse_args(arguments)?;
                self.service
                    .get_issue(
                        &args.issue_id,
                        IssueFields {
                            fields: args.fields,
                            custom_fields: args.custom_fields,
                        },
                    )
                    .await
            }
            "youtrack_update_issue" => {
                self.ensure_writable("youtrack_update_issue")?;
                let args: UpdateIssueArgs = parse_args(arguments)?;
                self.service
                    .update_issue(&args.issue_id, args.data, args.fields)
                    .await
            }
            "youtrack_add_comment" => {
                self.ensure_writable("youtrack_add_comment")?;
                let args: AddCommentArgs = parse_args(arguments)?;
                self.service
                    .add_comment(&args.issue_id, &args.comment_text, args.fields)
                    .await
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }

    /// Invoke a tool and wrap the outcome as an MCP tool-call result.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        tracing::info!(tool = name, "Calling tool");

        match self.invoke(name, arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text),
                Err(e) => ToolCallResult::error(format!("Failed to serialize result: {}", e)),
            },
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        }
    }

    fn ensure_writable(&self, operation: &str) -> Result<()> {
        if self.config.read_only {
            tracing::warn!(tool = operation, "Rejected mutating call in read-only mode");
            return Err(Error::ReadOnly(operation.to_string()));
        }
        Ok(())
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let value = arguments.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::from_value(value).map_err(|e| Error::InvalidParams(e.to_string()))
}

/// Arguments for youtrack_search_issues.
#[derive(Debug, Deserialize)]
struct SearchIssuesArgs {
    query: String,
    fields: Option<String>,
    custom_fields: Option<String>,
    top: Option<u32>,
    skip: Option<u32>,
}

/// Arguments for youtrack_get_issue.
#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    issue_id: String,
    fields: Option<String>,
    custom_fields: Option<String>,
}

/// Arguments for youtrack_update_issue.
#[derive(Debug, Deserialize)]
struct UpdateIssueArgs {
    issue_id: String,
    data: Value,
    fields: Option<String>,
}

/// Arguments for youtrack_add_comment.
#[derive(Debug, Deserialize)]
struct AddCommentArgs {
    issue_id: String,
    comment_text: String,
    fields: Option<String>,
}
