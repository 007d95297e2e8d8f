use berlin_opendata::{
    AnalyzeDatasets, BERLIN_GROUPS, BerlinClient, BerlinError, GetDataset, ListCategories,
    ListTags, SearchDatasets,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ServerConfig, Transport};
use crate::transport;

const SERVER_NAME: &str = "berlin-opendata-mcp-server";
const PROTOCOL_VERSION: &str = "2024-11-05";

const INSTRUCTIONS: &str = "MCP server for the open data of the State of Berlin. \
Gives access to 2500+ datasets via the CKAN API of datenregister.berlin.de. \
Categories include labour, education, demographics, health, culture, environment, \
transport, administration, economy and housing. \
Data is published under various open licenses (CC0, CC-BY, dl-de-zero-2.0, dl-de-by-2.0).";

const DATASET_URI_PREFIX: &str = "berlin://dataset/";
const CATEGORY_URI_PREFIX: &str = "berlin://category/";

const METHODS: &[&str] = &[
    "initialize",
    "notifications/initialized",
    "ping",
    "shutdown",
    "tools/list",
    "tools/call",
    "resources/list",
    "resources/templates/list",
    "resources/read",
];

pub struct BerlinMcpServer {
    client: BerlinClient,
}

impl BerlinMcpServer {
    pub async fn bootstrap(config: ServerConfig) -> Result<(), ServerError> {
        let transport = config.transport;
        let bind_addr = config.bind_addr();
        let server = Arc::new(Self::new(BerlinClient::with_config(config.berlin)));

        tracing::info!(?transport, methods = ?METHODS, "berlin open data MCP server starting");
        match transport {
            Transport::Stdio => transport::serve_stdio(server).await,
            Transport::Http => transport::serve_http(server, &bind_addr).await,
        }
    }

    pub fn new(client: BerlinClient) -> Self {
        Self { client }
    }

    /// Handle one raw JSON-RPC message. Notifications yield no response.
    pub async fn handle_message(&self, message: &str) -> Option<Response> {
        let value = match serde_json::from_str::<Value>(message) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("unparsable message: {err}");
                return Some(Response::error(None, ServerError::Json(err)));
            }
        };

        let request = match serde_json::from_value::<Request>(value) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("invalid request: {err}");
                return Some(Response::error(
                    None,
                    ServerError::InvalidRequest(err.to_string()),
                ));
            }
        };

        self.handle_request(request).await
    }

    async fn handle_request(&self, request: Request) -> Option<Response> {
        let outcome = self.dispatch(&request.method, request.params).await;
        match (request.id, outcome) {
            (Some(id), Ok(result)) => Some(Response::success(Some(id), result)),
            (Some(id), Err(err)) => Some(Response::error(Some(id), err)),
            (None, Ok(_)) => None,
            (None, Err(err)) => {
                tracing::warn!(method = %request.method, "notification failed: {err}");
                None
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        tracing::debug!(method, "dispatch");
        match method {
            "initialize" => {
                let params: InitializeParams = parse_optional_params(method, params)?;
                let result = InitializeResult::new(params.client_info);
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "notifications/initialized" | "initialized" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "shutdown" => Ok(Value::Null),
            "tools/list" => {
                let _: CursorParams = parse_optional_params(method, params)?;
                let result = ListToolsResult {
                    tools: tool_descriptors(),
                    next_cursor: None,
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "tools/call" => {
                let params: CallToolParams = parse_required_params(method, params)?;
                let spec = find_tool_spec(&params.name)
                    .ok_or_else(|| ServerError::InvalidMethod(params.name.clone()))?;
                let text = self.call_tool(spec.name, params.arguments).await?;
                serde_json::to_value(ToolResponse::text(text)).map_err(ServerError::Serialization)
            }
            "resources/list" => {
                let _: CursorParams = parse_optional_params(method, params)?;
                Ok(json!({ "resources": [] }))
            }
            "resources/templates/list" => {
                let _: CursorParams = parse_optional_params(method, params)?;
                let result = ListResourceTemplatesResult {
                    resource_templates: resource_templates(),
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "resources/read" => {
                let params: ReadResourceParams = parse_required_params(method, params)?;
                let text = self.read_resource(&params.uri).await?;
                let result = ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: params.uri,
                        mime_type: "application/json",
                        text,
                    }],
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            other => Err(ServerError::InvalidMethod(other.to_string())),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<String, ServerError> {
        tracing::info!(tool = name, "tool call");
        let text = match name {
            "berlin_search_datasets" => {
                let params: SearchDatasets = parse_required_params(name, arguments)?;
                self.client.search_datasets(&params.validated()?).await
            }
            "berlin_get_dataset" => {
                let params: GetDataset = parse_required_params(name, arguments)?;
                self.client.get_dataset(&params.validated()?).await
            }
            "berlin_list_categories" => {
                let params: ListCategories = parse_optional_params(name, arguments)?;
                self.client.list_categories(&params.validated()?).await
            }
            "berlin_list_tags" => {
                let params: ListTags = parse_optional_params(name, arguments)?;
                self.client.list_tags(&params.validated()?).await
            }
            "berlin_analyze_datasets" => {
                let params: AnalyzeDatasets = parse_required_params(name, arguments)?;
                self.client.analyze_datasets(&params.validated()?).await
            }
            "berlin_catalog_stats" => {
                let _: NoParams = parse_optional_params(name, arguments)?;
                self.client.catalog_stats().await
            }
            other => return Err(ServerError::InvalidMethod(other.to_string())),
        };
        Ok(text)
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ServerError> {
        if let Some(name) = uri.strip_prefix(DATASET_URI_PREFIX).filter(|s| !s.is_empty()) {
            return Ok(self.client.dataset_json(name).await?);
        }
        if let Some(group_id) = uri.strip_prefix(CATEGORY_URI_PREFIX).filter(|s| !s.is_empty()) {
            return Ok(self.client.category_json(group_id).await?);
        }
        Err(ServerError::InvalidParams(format!("unknown resource: {uri}")))
    }
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default, rename = "jsonrpc")]
    _jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ResponseError::from(error)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::InvalidRequest(_) => -32600,
            ServerError::InvalidMethod(_) => -32601,
            ServerError::InvalidParams(_) => -32602,
            ServerError::Berlin(BerlinError::ValidationError { .. }) => -32602,
            ServerError::Json(_) => -32700,
            ServerError::Berlin(_) => -32010,
            ServerError::Io(_) | ServerError::Config(_) | ServerError::Serialization(_) => -32603,
        };
        let message = match err {
            ServerError::InvalidMethod(method) => format!("Unknown method: {method}"),
            other => other.to_string(),
        };
        Self {
            code,
            message,
            data: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown method: {0}")]
    InvalidMethod(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Berlin(#[from] BerlinError),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

type ServerResult<T> = Result<T, ServerError>;

fn parse_required_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Err(ServerError::InvalidParams(format!(
            "{method}: missing parameters"
        ))),
    }
}

fn parse_optional_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "clientInfo")]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
    capabilities: Value,
    instructions: &'static str,
    #[serde(skip_serializing_if = "Option::is_none", rename = "clientInfo")]
    client_info: Option<ClientInfoSummary>,
}

impl InitializeResult {
    fn new(client_info: Option<ClientInfo>) -> Self {
        let client_info = client_info.map(|info| ClientInfoSummary {
            name: info.name,
            version: info.version,
        });

        Self {
            protocol_version: PROTOCOL_VERSION,
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: json!({
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            }),
            instructions: INSTRUCTIONS,
            client_info,
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ClientInfoSummary {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CursorParams {
    #[serde(default, rename = "cursor")]
    _cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug)]
struct ToolSpec {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolDescriptor {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
    annotations: ToolAnnotations,
}

/// Every tool is a read-only catalog query
#[derive(Debug, Serialize)]
struct ToolAnnotations {
    title: &'static str,
    #[serde(rename = "readOnlyHint")]
    read_only_hint: bool,
    #[serde(rename = "destructiveHint")]
    destructive_hint: bool,
    #[serde(rename = "idempotentHint")]
    idempotent_hint: bool,
    #[serde(rename = "openWorldHint")]
    open_world_hint: bool,
}

impl ToolAnnotations {
    fn read_only(title: &'static str) -> Self {
        Self {
            title,
            read_only_hint: true,
            destructive_hint: false,
            idempotent_hint: true,
            open_world_hint: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ListResourceTemplatesResult {
    #[serde(rename = "resourceTemplates")]
    resource_templates: Vec<ResourceTemplate>,
}

#[derive(Debug, Serialize)]
struct ResourceTemplate {
    #[serde(rename = "uriTemplate")]
    uri_template: &'static str,
    name: &'static str,
    description: &'static str,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ReadResourceResult {
    contents: Vec<ResourceContents>,
}

#[derive(Debug, Serialize)]
struct ResourceContents {
    uri: String,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
    text: String,
}

fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: "berlin://dataset/{name}",
            name: "dataset",
            description: "Raw dataset metadata as JSON",
            mime_type: "application/json",
        },
        ResourceTemplate {
            uri_template: "berlin://category/{group_id}",
            name: "category",
            description: "Raw category details, including its datasets, as JSON",
            mime_type: "application/json",
        },
    ]
}

fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.name,
            title: spec.title,
            description: spec.description,
            input_schema: spec.input_schema,
            annotations: ToolAnnotations::read_only(spec.title),
        })
        .collect()
}

fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.name == name)
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "berlin_search_datasets",
            title: "Search datasets",
            description: "Full-text search over the Berlin open data catalog (CKAN/Solr) across titles, descriptions, tags and metadata. Returns a Markdown list of dataset summaries.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "maxLength": 500, "description": "Search term(s), e.g. 'Einwohner', 'Verkehr', 'Kita'. Supports Solr syntax: AND, OR, NOT, wildcards (*), fuzzy (~)."},
                    "rows": {"type": "integer", "minimum": 1, "maximum": 50, "default": 10, "description": "Number of results (max. 50)"},
                    "offset": {"type": "integer", "minimum": 0, "default": 0, "description": "Offset for pagination"},
                    "sort": {"type": "string", "description": "Sort order, e.g. 'metadata_modified desc', 'title asc', 'score desc'"},
                    "filter_group": {"type": "string", "enum": BERLIN_GROUPS, "description": "Filter by category"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: "berlin_get_dataset",
            title: "Get dataset details",
            description: "Fetch full metadata and all resources of one dataset: title, description, author, license, formats and download URLs.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "minLength": 1, "description": "ID or name of the dataset, e.g. 'einwohnerinnen-und-einwohner-berlin-lor-planungsraeume'"}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: "berlin_list_categories",
            title: "List data categories",
            description: "List all 25 thematic categories with their dataset counts, or show the datasets of one category.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "group_id": {"type": "string", "description": format!("Category ID for details. Available: {}. When empty, all categories are listed.", BERLIN_GROUPS.join(", "))}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: "berlin_list_tags",
            title: "Browse tags",
            description: "Search the tags used in the catalog to find thematically related datasets.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Tag search term, e.g. 'einwohner', 'bezirk', 'kita'"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100, "default": 30, "description": "Maximum number of tags"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: "berlin_analyze_datasets",
            title: "Analyze datasets",
            description: "Relevance-ranked analysis of the top matches for a query: available formats, freshness and per-resource structure. Berlin's CKAN has no DataStore, so data must be downloaded from the resource URLs.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "description": "Search term for the analysis, e.g. 'Einwohner', 'Verkehr', 'Wohnen'"},
                    "max_datasets": {"type": "integer", "minimum": 1, "maximum": 20, "default": 5, "description": "Maximum number of datasets to analyze"},
                    "include_structure": {"type": "boolean", "default": true, "description": "Include per-resource formats and URLs"},
                    "include_freshness": {"type": "boolean", "default": true, "description": "Include last-modified and data-updated dates"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: "berlin_catalog_stats",
            title: "Catalog statistics",
            description: "Overview of the whole catalog: total dataset count and the distribution over categories, formats and tags.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
    ]
}
