//! MCP server protocol implementation
//!
//! Newline-delimited JSON-RPC over any async reader/writer pair (stdio in
//! the binary). Each request runs on its own task; responses go through a
//! single writer task so lines never interleave.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use sfmcp_core::{BackendClient, BridgeConfig, Credentials, Dispatcher};

use crate::error::{McpError, McpResult};
use crate::protocol::{McpRequest, McpResponse, JSONRPC_VERSION, PROTOCOL_VERSION};
use crate::{SERVER_INSTRUCTIONS, SERVER_NAME, SERVER_VERSION};

/// MCP front end over a [`Dispatcher`]
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Wire a live Salesforce backend. No login happens until the first
    /// tool call.
    pub fn connect(config: BridgeConfig, credentials: Credentials) -> McpResult<Self> {
        let backend = BackendClient::connect(&config, credentials)?;
        Ok(Self::new(Dispatcher::new(backend, config)))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run over stdin/stdout until stdin closes
    pub async fn run_stdio(self) -> McpResult<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited requests from `reader`, answering on `writer`
    pub async fn serve<R, W>(self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let server = Arc::new(self);
        let mut in_flight = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();

        loop {
            // Finished tasks are reaped as they complete, not at EOF
            let line = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => line,
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Request task failed");
                    }
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let server = Arc::clone(&server);
            let tx = tx.clone();
            in_flight.spawn(async move {
                let Some(response) = server.handle_line(&line).await else {
                    return;
                };
                match serde_json::to_string(&response) {
                    Ok(text) => {
                        if tx.send(text).is_err() {
                            tracing::warn!("Response dropped, writer closed");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
                }
            });
        }

        // Input closed: finish what is in flight, then drain the writer
        while in_flight.join_next().await.is_some() {}
        drop(tx);

        writer_task
            .await
            .map_err(|e| McpError::Internal(e.to_string()))??;

        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handle one raw line; `None` for notifications
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => Some(McpResponse::failure(Value::Null, &McpError::Parse(e.to_string()))),
        }
    }

    /// Handle one parsed JSON-RPC message; `None` for notifications
    pub async fn handle_value(&self, value: Value) -> Option<McpResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        let request: McpRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return Some(McpResponse::failure(id, &McpError::InvalidRequest(e.to_string()))),
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(McpResponse::failure(
                id,
                &McpError::InvalidRequest(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            ));
        }

        self.handle_request(request).await
    }

    /// Handle an MCP request
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        tracing::debug!(method = %request.method, "MCP request");

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "notifications/initialized" | "notifications/cancelled" => {
                tracing::debug!(method = %request.method, "Notification received");
                return None;
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request.params).await,
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        if request.is_notification() {
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        Some(match outcome {
            Ok(result) => McpResponse::success(id, result),
            Err(e) => McpResponse::failure(id, &e),
        })
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "instructions": SERVER_INSTRUCTIONS
        })
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<Value> = self
            .dispatcher
            .list_tools()
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: &Value) -> McpResult<Value> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| McpError::InvalidParams("tools/call requires a tool name".to_string()))?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let result = self.dispatcher.dispatch(name, &arguments).await;

        Ok(json!({
            "content": [{
                "type": "text",
                "text": result.to_text()
            }],
            "isError": !result.success
        }))
    }
}
