// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-server
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// The fixed 23-tool catalog and `mf.capabilities` payload.
pub mod catalog;
/// Per-tool input shapes and handlers.
pub mod tools;

use std::io::{BufRead, Write};

use mf_config::MotionForgeConfig;
use mf_plan::PlanRegistry;
use mf_runtime::Runtime;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Everything a running server instance owns: the single runtime, its
/// in-flight plans, and the configuration that bounds its I/O.
///
/// There is exactly one of these per process. Every `tools/call` runs to
/// completion against it before the next request is read (spec §5's
/// single-threaded cooperative model) so no internal locking is needed.
pub struct ServerState {
    /// The process-wide animation runtime.
    pub runtime: Runtime,
    /// Plans awaiting preview or apply, keyed by id.
    pub plans: PlanRegistry,
    /// Byte limits and transport policy loaded at startup.
    pub config: MotionForgeConfig,
    /// Short commit hash reported by `mf.capabilities`, from `GITHUB_SHA`.
    pub tooling_commit: Option<String>,
}

impl ServerState {
    /// Construct a fresh server state: an empty runtime sized to
    /// `config.max_json_bytes`, an empty plan registry, no staged load.
    #[must_use]
    pub fn new(config: MotionForgeConfig, tooling_commit: Option<String>) -> Self {
        Self { runtime: Runtime::new(config.max_json_bytes), plans: PlanRegistry::new(), config, tooling_commit }
    }
}

/// One line of the JSON-RPC 2.0 wire protocol this server speaks (spec §6).
#[derive(Debug, serde::Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, serde::Serialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

fn rpc_result(id: Value, result: Value) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: None, error: Some(RpcErrorObject { code, message: message.into() }) }
}

/// Wrap a tool's `{ok, ...}` envelope as MCP `tools/call` content (spec
/// §4.7): a single text block carrying the envelope's canonical JSON, with
/// `isError` mirroring `!ok`.
fn wrap_envelope(envelope: Value) -> Value {
    let is_error = envelope.get("ok").and_then(Value::as_bool) == Some(false);
    let text = envelope.to_string();
    json!({ "content": [{ "type": "text", "text": text }], "isError": is_error })
}

#[derive(Debug, serde::Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Handle one already-parsed JSON-RPC line, returning the response to send
/// back (never `None`: even a notification-shaped request gets an answer,
/// since this server only ever receives requests a client expects a reply
/// to).
fn handle_request(state: &mut ServerState, request: RpcRequest) -> RpcResponse {
    match request.method.as_str() {
        "tools/list" => rpc_result(request.id, catalog::tools_list()),
        "tools/call" => {
            let params: ToolCallParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(err) => return rpc_error(request.id, INVALID_PARAMS, format!("invalid tools/call params: {err}")),
            };
            debug!(tool = %params.name, "dispatching tool call");
            let envelope = tools::dispatch(state, &params.name, params.arguments);
            rpc_result(request.id, wrap_envelope(envelope))
        }
        "ping" => rpc_result(request.id, json!({})),
        other => rpc_error(request.id, METHOD_NOT_FOUND, format!("unknown method '{other}'")),
    }
}

/// Parse and handle one raw line of input, producing the JSON text of the
/// response to write back.
fn handle_line(state: &mut ServerState, line: &str) -> String {
    let request: Result<RpcRequest, _> = serde_json::from_str(line);
    let response = match request {
        Ok(request) => handle_request(state, request),
        Err(err) => {
            warn!(error = %err, "failed to parse request line");
            rpc_error(Value::Null, PARSE_ERROR, format!("invalid JSON-RPC request: {err}"))
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|err| {
        error!(error = %err, "failed to serialize response, reporting a parse error instead");
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"failed to serialize response"}}"#.to_string()
    })
}

/// Run the server against real stdin/stdout until stdin closes.
///
/// # Errors
///
/// Propagates any I/O error reading stdin or writing stdout.
pub fn run(state: &mut ServerState) -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_with_io(state, &mut stdin.lock(), &mut stdout.lock())
}

/// Run the server's read-dispatch-write loop against injectable I/O, one
/// JSON-RPC request per line, until `reader` reaches EOF.
///
/// Blank lines are skipped rather than treated as malformed requests, so a
/// client that pads its stream with newlines doesn't spuriously error.
///
/// # Errors
///
/// Propagates any I/O error reading from `reader` or writing to `writer`.
pub fn run_with_io<R: BufRead, W: Write>(state: &mut ServerState, reader: &mut R, writer: &mut W) -> std::io::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let response_json = handle_line(state, trimmed);
        writeln!(writer, "{response_json}")?;
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn new_state() -> ServerState {
        ServerState::new(MotionForgeConfig::default(), None)
    }

    fn call(state: &mut ServerState, input: &str) -> Vec<Value> {
        let mut reader = BufReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut output = Vec::new();
        run_with_io(state, &mut reader, &mut output).unwrap();
        String::from_utf8(output).unwrap().lines().map(|line| serde_json::from_str(line).unwrap()).collect()
    }

    #[test]
    fn tools_list_reports_all_23_tools() {
        let mut state = new_state();
        let responses = call(&mut state, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n");
        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 23);
    }

    #[test]
    fn ping_round_trips() {
        let mut state = new_state();
        let request = json!({"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"mf.ping","arguments":{}}}).to_string();
        let responses = call(&mut state, &format!("{request}\n"));
        assert_eq!(responses[0]["result"]["isError"], json!(false));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut state = new_state();
        let responses = call(&mut state, "\n\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n\n");
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn unknown_method_reports_method_not_found() {
        let mut state = new_state();
        let responses = call(&mut state, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"bogus\"}\n");
        assert_eq!(responses[0]["error"]["code"], json!(METHOD_NOT_FOUND));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let mut state = new_state();
        let responses = call(&mut state, "not json\n");
        assert_eq!(responses[0]["error"]["code"], json!(PARSE_ERROR));
    }

    #[test]
    fn unknown_tool_is_a_tool_level_error_not_a_transport_error() {
        let mut state = new_state();
        let request = json!({"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"mf.nope","arguments":{}}}).to_string();
        let responses = call(&mut state, &format!("{request}\n"));
        assert_eq!(responses[0]["result"]["isError"], json!(true));
    }
}
