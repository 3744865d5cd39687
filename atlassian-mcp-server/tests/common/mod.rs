/// Common utilities for Atlassian MCP Server integration tests
use async_trait::async_trait;
use atlassian_mcp_server::atlassian_client::{QueryParams, RemoteApi};
use atlassian_mcp_server::config::{AtlassianConfig, AuthConfig};
use atlassian_mcp_server::error::{AtlassianMcpError, AtlassianMcpResult};
use atlassian_mcp_server::AtlassianMcpServer;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// One request seen by [`FakeApi`]
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[allow(dead_code)]
impl RecordedCall {
    /// Value of a query parameter, if sent
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Route {
    method: &'static str,
    path: String,
    query: Vec<(String, String)>,
    response: Result<Value, (u16, String)>,
}

/// Scripted in-memory Atlassian instance
///
/// A request is answered by the first route with the same method and path
/// whose query pairs are all present in the request. Unmatched requests get
/// an HTTP 404. Every request is recorded in order.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeApi {
    routes: Vec<Route>,
    calls: Mutex<Vec<RecordedCall>>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(
        mut self,
        method: &'static str,
        path: &str,
        query: &[(&str, &str)],
        response: Result<Value, (u16, String)>,
    ) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response,
        });
        self
    }

    pub fn get(self, path: &str, query: &[(&str, &str)], body: Value) -> Self {
        self.route("GET", path, query, Ok(body))
    }

    pub fn get_fails(self, path: &str, query: &[(&str, &str)], status: u16, body: &str) -> Self {
        self.route("GET", path, query, Err((status, body.to_string())))
    }

    pub fn post(self, path: &str, body: Value) -> Self {
        self.route("POST", path, &[], Ok(body))
    }

    pub fn put(self, path: &str, body: Value) -> Self {
        self.route("PUT", path, &[], Ok(body))
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests to `path`, in order
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }

    fn answer(
        &self,
        method: &'static str,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> AtlassianMcpResult<Value> {
        let response = self
            .routes
            .iter()
            .find(|r| {
                r.method == method
                    && r.path == path
                    && r.query.iter().all(|pair| query.contains(pair))
            })
            .map(|r| r.response.clone());

        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            query,
            body,
        });

        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err((status, body))) => Err(AtlassianMcpError::http(status, body)),
            None => Err(AtlassianMcpError::http(
                404,
                format!("{{\"errorMessages\":[\"No route for {} {}\"]}}", method, path),
            )),
        }
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn get(&self, path: &str, query: &QueryParams<'_>) -> AtlassianMcpResult<Value> {
        let query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.answer("GET", path, query, None)
    }

    async fn post(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value> {
        self.answer("POST", path, Vec::new(), Some(body.clone()))
    }

    async fn put(&self, path: &str, body: &Value) -> AtlassianMcpResult<Value> {
        self.answer("PUT", path, Vec::new(), Some(body.clone()))
    }
}

/// Server wired to a fake instance
#[allow(dead_code)]
pub fn server_with(api: Arc<FakeApi>) -> AtlassianMcpServer {
    let config = AtlassianConfig::new("https://test.atlassian.net", AuthConfig::Anonymous)
        .expect("valid test config");
    AtlassianMcpServer::with_api(Arc::new(config), api)
}

/// Minimal Jira issue payload
#[allow(dead_code)]
pub fn issue_json(key: &str, summary: &str) -> Value {
    json!({
        "id": format!("1{}", key.rsplit('-').next().unwrap_or("0")),
        "key": key,
        "fields": {
            "summary": summary,
            "status": {"name": "To Do"},
            "issuetype": {"name": "Task"},
            "assignee": null
        }
    })
}

/// MCP Test Client for sending JSON-RPC requests to the server
#[allow(dead_code)]
pub struct McpTestClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[allow(dead_code)]
impl McpTestClient {
    /// Create a new test client by spawning the server
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Tests run from workspace root, so .env is in current directory
        dotenv::from_filename(".env").ok();

        let instance_url = std::env::var("ATLASSIAN_INSTANCE_URL")?;
        let email = std::env::var("ATLASSIAN_EMAIL")?;
        let api_token = std::env::var("ATLASSIAN_API_TOKEN")?;

        let binary_path = [
            "target/debug/atlassian-mcp-server",
            "target/release/atlassian-mcp-server",
            "../target/debug/atlassian-mcp-server",
            "../target/release/atlassian-mcp-server",
        ]
        .into_iter()
        .find(|path| std::path::Path::new(path).exists())
        .ok_or_else(|| {
            let cwd = std::env::current_dir().unwrap_or_default();
            format!(
                "Server binary not found. Current dir: {:?}. Looked in target/debug and target/release",
                cwd
            )
        })?;

        let mut child = Command::new(binary_path)
            .env("ATLASSIAN_INSTANCE_URL", instance_url)
            .env("ATLASSIAN_EMAIL", email)
            .env("ATLASSIAN_API_TOKEN", api_token)
            .env("RUST_LOG", "error")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("Failed to open stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to open stdout"));

        let mut client = Self {
            child,
            stdin,
            stdout,
        };

        client.initialize()?;

        Ok(client)
    }

    /// Initialize the MCP session
    fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "rust-test-client",
                    "version": "1.0.0"
                }
            }
        });

        self.send_request(&request)?;
        let response = self.read_response()?;

        if response.get("error").is_some() {
            return Err(format!("Initialization failed: {:?}", response["error"]).into());
        }

        Ok(())
    }

    /// Call an MCP tool
    pub fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        let request_id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);

        let request = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": "tools/call",
            "params": {
                "name": tool_name,
                "arguments": arguments
            }
        });

        self.send_request(&request)?;
        self.read_response()
    }

    fn send_request(&mut self, request: &Value) -> Result<(), Box<dyn std::error::Error>> {
        let request_str = serde_json::to_string(request)?;
        writeln!(self.stdin, "{}", request_str)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_response(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut line = String::new();
        self.stdout.read_line(&mut line)?;

        if line.is_empty() {
            return Err("Server closed connection".into());
        }

        Ok(serde_json::from_str(&line)?)
    }

    /// Text content of a tool response
    pub fn extract_tool_text(response: &Value) -> Result<String, String> {
        if let Some(error) = response.get("error") {
            return Err(format!("Tool call failed: {:?}", error));
        }

        let content = response
            .pointer("/result/content")
            .and_then(Value::as_array)
            .ok_or("No content array in result")?;

        content
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "No text content found".to_string())
    }

    /// Tool result parsed as JSON
    pub fn extract_tool_result(response: &Value) -> Result<Value, String> {
        let text = Self::extract_tool_text(response)?;

        if std::env::var("RUST_TEST_DEBUG").is_ok() {
            eprintln!("Tool result text: {}", text);
        }

        serde_json::from_str(&text).map_err(|e| {
            format!(
                "Failed to parse tool result JSON: {}. Text was: {}",
                e, text
            )
        })
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Project key used by live tests
#[allow(dead_code)]
pub fn test_project_key() -> String {
    std::env::var("TEST_PROJECT_KEY").unwrap_or_else(|_| "SCRUM".to_string())
}

/// Issue key used by live tests
#[allow(dead_code)]
pub fn test_issue_key() -> String {
    std::env::var("TEST_ISSUE_KEY").unwrap_or_else(|_| format!("{}-1", test_project_key()))
}
