//! The seam between MCP tool handlers and the YouTrack REST client.
//!
//! Responses are passed through as raw JSON: the response shape is
//! caller-selected via the `fields` parameter, so a fixed struct cannot
//! represent it.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Parameters for an issue search.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Search query (YouTrack query syntax)
    pub query: String,
    /// Comma-separated list of fields to return for each issue
    pub fields: Option<String>,
    /// Additional comma-separated custom fields, appended to `fields`
    pub custom_fields: Option<String>,
    /// Maximum number of issues to return
    pub top: Option<u32>,
    /// Number of issues to skip from the beginning of the results
    pub skip: Option<u32>,
}

/// Field selection for a single-issue fetch.
#[derive(Debug, Clone, Default)]
pub struct IssueFields {
    /// Comma-separated list of fields to return
    pub fields: Option<String>,
    /// Additional comma-separated custom fields, appended to `fields`
    pub custom_fields: Option<String>,
}

/// Issue-tracker operations exposed as MCP tools.
#[async_trait]
pub trait IssueService: Send + Sync {
    /// Search for issues using a query string.
    async fn search_issues(&self, params: SearchParams) -> Result<Value>;

    /// Get details for a single issue by its ID (e.g. "PROJ-123").
    async fn get_issue(&self, issue_id: &str, fields: IssueFields) -> Result<Value>;

    /// Apply a partial update to an issue. The `data` payload is forwarded
    /// verbatim.
    async fn update_issue(
        &self,
        issue_id: &str,
        data: Value,
        fields: Option<String>,
    ) -> Result<Value>;

    /// Add a comment to an issue.
    async fn add_comment(
        &self,
        issue_id: &str,
        comment_text: &str,
        fields: Option<String>,
    ) -> Result<Value>;
}
