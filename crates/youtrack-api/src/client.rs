//! YouTrack REST API client implementation.
//!
//! All endpoints live under `/api/` on the instance URL and authenticate
//! with a permanent token via `Authorization: Bearer`. Responses are
//! returned as raw JSON; the shape is whatever the caller selected with
//! the `fields` parameter.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};
use youtrack_core::{Error, IssueFields, IssueService, Result, SearchParams};

/// Default field list for issue search results.
pub const DEFAULT_SEARCH_FIELDS: &str = "idReadable,summary,project(shortName)";

/// Default field list for a single-issue fetch.
pub const DEFAULT_ISSUE_FIELDS: &str = "idReadable,summary,description,project(shortName),\
customFields(projectCustomField(field(name)),value(name,login,fullName,text))";

/// Default field list returned after an update.
pub const DEFAULT_UPDATE_FIELDS: &str = "idReadable,summary";

/// Default field list for a created comment.
pub const DEFAULT_COMMENT_FIELDS: &str = "id,text,author(login)";

/// Default result-count limit for searches.
pub const DEFAULT_TOP: u32 = 100;

/// YouTrack API client.
pub struct YouTrackClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl YouTrackClient {
    /// Create a new client for a YouTrack instance.
    ///
    /// Empty URL or token is allowed here; operations then fail with a
    /// configuration error when invoked.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::builder()
                .user_agent("youtrack-mcp")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// The instance base URL (without `/api`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.base_url.is_empty() || self.token.is_empty() {
            return Err(Error::Config(
                "YOUTRACK_URL and YOUTRACK_TOKEN must be set".to_string(),
            ));
        }
        Ok(())
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    /// Build a request with auth and content headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    /// Make an authenticated GET request.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        debug!(url = url, "YouTrack GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<B: serde::Serialize>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Value> {
        debug!(url = url, "YouTrack POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle response and map errors. `204 No Content` maps to `{}`.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = %message,
                "YouTrack API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }
}

/// Resolve the effective field list: explicit fields (or the default),
/// with any custom fields appended comma-separated.
fn merge_fields(fields: Option<&str>, default: &str, custom_fields: Option<&str>) -> String {
    let base = match fields {
        Some(f) if !f.is_empty() => f,
        _ => default,
    };
    match custom_fields {
        Some(extra) if !extra.is_empty() => format!("{},{}", base, extra),
        _ => base.to_string(),
    }
}

#[async_trait]
impl IssueService for YouTrackClient {
    async fn search_issues(&self, params: SearchParams) -> Result<Value> {
        self.ensure_configured()?;

        let fields = merge_fields(
            params.fields.as_deref(),
            DEFAULT_SEARCH_FIELDS,
            params.custom_fields.as_deref(),
        );
        let top = params.top.unwrap_or(DEFAULT_TOP);
        let skip = params.skip.unwrap_or(0);

        debug!(query = %params.query, top, skip, "Searching YouTrack issues");

        let url = self.api_url("issues");
        let query = [
            ("query", params.query),
            ("fields", fields),
            ("$top", top.to_string()),
            ("$skip", skip.to_string()),
        ];

        self.get(&url, &query).await
    }

    async fn get_issue(&self, issue_id: &str, fields: IssueFields) -> Result<Value> {
        self.ensure_configured()?;

        let fields = merge_fields(
            fields.fields.as_deref(),
            DEFAULT_ISSUE_FIELDS,
            fields.custom_fields.as_deref(),
        );

        debug!(issue = issue_id, "Fetching YouTrack issue");

        let url = self.api_url(&format!("issues/{}", issue_id));
        self.get(&url, &[("fields", fields)]).await
    }

    async fn update_issue(
        &self,
        issue_id: &str,
        data: Value,
        fields: Option<String>,
    ) -> Result<Value> {
        self.ensure_configured()?;

        let fields = fields.unwrap_or_else(|| DEFAULT_UPDATE_FIELDS.to_string());

        debug!(issue = issue_id, "Updating YouTrack issue");

        let url = self.api_url(&format!("issues/{}", issue_id));
        self.post(&url, &[("fields", fields)], &data).await
    }

    async fn add_comment(
        &self,
        issue_id: &str,
        comment_text: &str,
        fields: Option<String>,
    ) -> Result<Value> {
        self.ensure_configured()?;

        let fields = fields.unwrap_or_else(|| DEFAULT_COMMENT_FIELDS.to_string());

        debug!(issue = issue_id, "Adding comment to YouTrack issue");

        let url = self.api_url(&format!("issues/{}/comments", issue_id));
        self.post(&url, &[("fields", fields)], &json!({ "text": comment_text }))
            .await
    }
}
