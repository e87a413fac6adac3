//! MCP server dispatch.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Handle tool calls and resource reads
//! 3. Shutdown on EOF

use std::sync::Arc;

use serde_json::Value;
use youtrack_core::ServerConfig;

use crate::handlers::ToolHandler;
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ReadResourceParams, ReadResourceResult, RequestId, ResourceContents, ResourceDescriptor,
    ResourcesCapability, ResourcesListResult, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::transport::{IncomingMessage, StdioTransport};

/// URI of the server-info resource.
const RESOURCE_SERVER_INFO: &str = "server://info";
/// URI of the projects hint resource.
const RESOURCE_PROJECTS: &str = "youtrack://projects";
/// URI of the health resource.
const RESOURCE_HEALTH: &str = "mcp://health";

const PROJECTS_HINT: &str = "This resource provides access to YouTrack projects. \
Use the youtrack_search_issues tool to query projects.";

/// MCP server for YouTrack tools. One instance per connection/session.
pub struct McpServer {
    handler: Arc<ToolHandler>,
    config: Arc<ServerConfig>,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(handler: Arc<ToolHandler>, config: Arc<ServerConfig>) -> Self {
        Self {
            handler,
            config,
            initialized: false,
        }
    }

    /// Run the server main loop over stdio until EOF.
    pub async fn run_stdio(&mut self) -> youtrack_core::Result<()> {
        tracing::info!(
            server = %self.config.server_name,
            url = %self.config.display_url(),
            read_only = self.config.read_only,
            "Starting MCP server on stdio"
        );

        let mut transport = StdioTransport::stdio();

        loop {
            match transport.read_message() {
                Ok(Some(msg)) => {
                    if let Some(resp) = self.handle_message(msg).await {
                        if let Err(e) = transport.write_response(&resp) {
                            tracing::error!("Failed to write response: {}", e);
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    let error_resp = JsonRpcResponse::error(
                        RequestId::Null,
                        JsonRpcError::parse_error(&e.to_string()),
                    );
                    let _ = transport.write_response(&error_resp);
                }
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle an incoming message. Notifications produce no response.
    pub async fn handle_message(&mut self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "resources/list" => self.handle_resources_list(req.id),
            "resources/read" => self.handle_resources_read(req.id, req.params),
            "ping" => self.handle_ping(req.id),
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    /// Handle notifications (no response).
    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init.client_info.name,
                        init.client_info.version,
                        init.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.config.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.handler.available_tools(),
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, JsonRpcError::invalid_params(&e.to_string()));
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        let result = self.handler.execute(&params.name, params.arguments).await;
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle resources/list request.
    fn handle_resources_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ResourcesListResult {
            resources: vec![
                ResourceDescriptor {
                    uri: RESOURCE_SERVER_INFO.to_string(),
                    name: "Server info".to_string(),
                    description: Some("YouTrack MCP server status and configuration".to_string()),
                    mime_type: "application/json".to_string(),
                },
                ResourceDescriptor {
                    uri: RESOURCE_PROJECTS.to_string(),
                    name: "YouTrack projects".to_string(),
                    description: Some("Hint on how to query YouTrack projects".to_string()),
                    mime_type: "text/plain".to_string(),
                },
                ResourceDescriptor {
                    uri: RESOURCE_HEALTH.to_string(),
                    name: "Health check".to_string(),
                    description: Some("Liveness information for container monitoring".to_string()),
                    mime_type: "application/json".to_string(),
                },
            ],
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle resources/read request.
    fn handle_resources_read(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ReadResourceParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, JsonRpcError::invalid_params(&e.to_string()));
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        let (mime_type, text) = match params.uri.as_str() {
            RESOURCE_SERVER_INFO => (
                "application/json",
                self.handler.server_info().to_string(),
            ),
            RESOURCE_PROJECTS => ("text/plain", PROJECTS_HINT.to_string()),
            RESOURCE_HEALTH => (
                "application/json",
                serde_json::json!({
                    "status": "healthy",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "version": env!("CARGO_PKG_VERSION"),
                })
                .to_string(),
            ),
            other => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(&format!("Unknown resource: {}", other)),
                );
            }
        };

        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: mime_type.to_string(),
                text,
            }],
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle ping request.
    fn handle_ping(&self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JSONRPC_VERSION as V;
    use async_trait::async_trait;
    use serde_json::json;
    use youtrack_core::{Error, IssueFields, IssueService, Result, SearchParams};

    struct StubService;

    #[async_trait]
    impl IssueService for StubService {
        async fn search_issues(&self, _params: SearchParams) -> Result<Value> {
            Ok(json!([]))
        }
        async fn get_issue(&self, issue_id: &str, _fields: IssueFields) -> Result<Value> {
            Ok(json!({"idReadable": issue_id}))
        }
        async fn update_issue(
            &self,
            _issue_id: &str,
            _data: Value,
            _fields: Option<String>,
        ) -> Result<Value> {
            Err(Error::NotFound("not found".into()))
        }
        async fn add_comment(
            &self,
            _issue_id: &str,
            _comment_text: &str,
            _fields: Option<String>,
        ) -> Result<Value> {
            Err(Error::NotFound("not found".into()))
        }
    }

    fn make_server() -> McpServer {
        let config = Arc::new(ServerConfig {
            youtrack_url: "https://example.youtrack.cloud".to_string(),
            token: "perm:test".to_string(),
            ..Default::default()
        });
        let handler = Arc::new(ToolHandler::new(Arc::new(StubService), config.clone()));
        McpServer::new(handler, config)
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: V.to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let mut server = make_server();

        let resp = server
            .handle_request(request(
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                })),
            ))
            .await;

        assert!(resp.error.is_none());
        assert!(server.initialized);

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "YouTrack MCP Server");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_initialize_without_params() {
        let mut server = make_server();
        let resp = server.handle_initialize(RequestId::Number(1), None);

        assert!(resp.result.is_some());
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn test_double_initialize_error() {
        let mut server = make_server();
        server.initialized = true;

        let resp = server.handle_initialize(RequestId::Number(1), None);

        assert!(resp.error.is_some());
        assert!(resp.result.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = make_server();
        let resp = server.handle_tools_list(RequestId::Number(1));

        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 5);
        assert!(result
            .tools
            .iter()
            .any(|t| t.name == "youtrack_search_issues"));
        assert!(result.tools.iter().any(|t| t.name == "server_info"));
    }

    #[tokio::test]
    async fn test_tools_call_get_issue() {
        let mut server = make_server();

        let resp = server
            .handle_request(request(
                "tools/call",
                Some(json!({
                    "name": "youtrack_get_issue",
                    "arguments": {"issue_id": "PROJ-42"}
                })),
            ))
            .await;

        let result = resp.result.unwrap();
        assert_ne!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("PROJ-42"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let mut server = make_server();
        let resp = server.handle_request(request("tools/call", None)).await;

        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let mut server = make_server();
        let resp = server
            .handle_request(request("tools/call", Some(json!("not an object"))))
            .await;

        assert!(resp.error.is_some());
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_result() {
        let mut server = make_server();

        let resp = server
            .handle_request(request(
                "tools/call",
                Some(json!({"name": "bogus_tool", "arguments": {}})),
            ))
            .await;

        // Tool-level failures are in-band error results, not protocol errors
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_ping() {
        let server = make_server();
        let resp = server.handle_ping(RequestId::String("ping-1".to_string()));

        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut server = make_server();
        let resp = server.handle_request(request("unknown/method", None)).await;

        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resources_list() {
        let server = make_server();
        let resp = server.handle_resources_list(RequestId::Number(1));

        let result: ResourcesListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        let uris: Vec<&str> = result.resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec!["server://info", "youtrack://projects", "mcp://health"]
        );
    }

    #[tokio::test]
    async fn test_resources_read_server_info() {
        let server = make_server();
        let resp = server.handle_resources_read(
            RequestId::Number(1),
            Some(json!({"uri": "server://info"})),
        );

        let result: ReadResourceResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.contents[0].mime_type, "application/json");
        let payload: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn test_resources_read_health() {
        let server = make_server();
        let resp = server
            .handle_resources_read(RequestId::Number(1), Some(json!({"uri": "mcp://health"})));

        let result: ReadResourceResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        let payload: Value = serde_json::from_str(&result.contents[0].text).unwrap();
        assert_eq!(payload["status"], "healthy");
        assert!(payload["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_resources_read_unknown_uri() {
        let server = make_server();
        let resp = server
            .handle_resources_read(RequestId::Number(1), Some(json!({"uri": "nope://missing"})));

        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notification_produces_no_response() {
        let mut server = make_server();

        let msg = IncomingMessage::Notification(crate::protocol::JsonRpcNotification {
            jsonrpc: V.to_string(),
            method: "initialized".to_string(),
            params: None,
        });

        assert!(server.handle_message(msg).await.is_none());
    }

    #[tokio::test]
    async fn test_request_produces_response() {
        let mut server = make_server();

        let msg = IncomingMessage::Request(request("ping", None));
        let resp = server.handle_message(msg).await;

        assert!(resp.is_some());
    }
}
