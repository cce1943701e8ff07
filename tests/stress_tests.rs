//! Stress tests for concurrent clients, slow tools and failing tools.
//!
//! These tests run on a multi-threaded runtime so that requests really do
//! arrive at the dispatcher at the same time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_test::{assert_err, assert_ok};

use ue_mcp_server::mcp::server::{McpServer, Reply};
use ue_mcp_server::mcp::transport::SESSION_HEADER;
use ue_mcp_server::mcp::HttpServer;
use ue_mcp_server::modules::{ActorModule, InMemoryActorModule};
use ue_mcp_server::tools::{builtin_registry, Tool, ToolCallResult, ToolRegistry};

// =============================================================================
// Helpers
// =============================================================================

/// Sleeps on the blocking pool while tracking how many copies run at once.
struct SleepyTool {
    name: &'static str,
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SleepyTool {
    fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Tool for SleepyTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Sleeps for a fixed delay"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute(&self, _arguments: &Map<String, Value>) -> ToolCallResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        ToolCallResult::text("done")
    }
}

struct PanickingTool;

impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Panics when executed"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute(&self, _arguments: &Map<String, Value>) -> ToolCallResult {
        panic!("tool exploded");
    }
}

async fn open_session(server: &McpServer) -> String {
    server
        .process(
            r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
            None,
        )
        .await
        .new_session_id
        .expect("initialize creates a session")
}

async fn call(server: &McpServer, session: &str, name: &str) -> Value {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name}
    })
    .to_string();
    match server.process(&body, Some(session)).await.reply {
        Reply::Single(message) => serde_json::to_value(message).unwrap(),
        other => panic!("Expected single reply, got {other:?}"),
    }
}

// =============================================================================
// Serialised execution
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tools_never_run_concurrently() {
    let tool = SleepyTool::new("sleepy", Duration::from_millis(30));
    let peak = Arc::clone(&tool.peak);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(tool)).unwrap();
    let server = Arc::new(McpServer::new(registry));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            let session = open_session(&server).await;
            call(&server, &session, "sleepy").await
        }));
    }

    for handle in handles {
        let json = handle.await.unwrap();
        assert_eq!(json["result"]["isError"], false);
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_tool_times_out() {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(SleepyTool::new("slow", Duration::from_millis(400))))
        .unwrap();
    let server = McpServer::new(registry).with_request_timeout(Duration::from_millis(50));
    let session = open_session(&server).await;

    let json = call(&server, &session, "slow").await;

    assert_eq!(json["error"]["code"], -32000);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("timed out"));
    assert_eq!(json["error"]["data"]["timeoutMs"], 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timed_out_tool_still_blocks_the_next() {
    let slow = SleepyTool::new("slow", Duration::from_millis(300));
    let fast = SleepyTool {
        name: "fast",
        delay: Duration::from_millis(1),
        active: Arc::clone(&slow.active),
        peak: Arc::clone(&slow.peak),
    };
    let peak = Arc::clone(&slow.peak);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(slow)).unwrap();
    registry.register(Arc::new(fast)).unwrap();
    let server = McpServer::new(registry).with_request_timeout(Duration::from_millis(100));
    let session = open_session(&server).await;

    let timed_out = call(&server, &session, "slow").await;
    assert_eq!(timed_out["error"]["code"], -32000);

    // The slow call is still running; the next one waits for it.
    let server = server.with_request_timeout(Duration::from_secs(5));
    let json = call(&server, &session, "fast").await;
    assert_eq!(json["result"]["isError"], false);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_tool_is_server_error() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PanickingTool)).unwrap();
    registry
        .register(Arc::new(SleepyTool::new("sleepy", Duration::from_millis(1))))
        .unwrap();
    let server = McpServer::new(registry);
    let session = open_session(&server).await;

    let json = call(&server, &session, "explode").await;
    assert_eq!(json["error"]["code"], -32000);
    assert!(!json["error"]["message"].as_str().unwrap().is_empty());

    // The dispatch lock was released by the unwinding task.
    let json = call(&server, &session, "sleepy").await;
    assert_eq!(json["result"]["isError"], false);
}

// =============================================================================
// Sessions under load
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_with_actor_tools() {
    let actors: Arc<dyn ActorModule> = Arc::new(InMemoryActorModule::new());
    let server = Arc::new(McpServer::new(builtin_registry(&actors)));

    let mut handles = Vec::new();
    for i in 0..16 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            let session = open_session(&server).await;
            let body = json!({
                "jsonrpc": "2.0",
                "id": i,
                "method": "tools/call",
                "params": {
                    "name": "spawn_actor",
                    "arguments": {"actor_class": "/Script/Engine.PointLight", "location": {"x": i}}
                }
            })
            .to_string();
            server.process(&body, Some(&session)).await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome.reply, Reply::Single(ref m) if m.as_error().is_none()));
    }

    assert_eq!(server.sessions().len(), 16);
    let names: std::collections::HashSet<String> = assert_ok!(actors.get_actors_in_level(None))
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names.len(), 16);
}

#[tokio::test]
async fn test_idle_sessions_are_pruned() {
    let server = McpServer::new(ToolRegistry::new())
        .with_session_idle_timeout(Duration::from_millis(20));
    let stale = open_session(&server).await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    let fresh = open_session(&server).await;

    assert!(!server.sessions().is_valid(&stale));
    assert!(server.sessions().is_valid(&fresh));
}

#[tokio::test]
async fn test_listener_restart_cycle() {
    let server = Arc::new(McpServer::new(ToolRegistry::new()));
    let mut http = HttpServer::new(server, ([127, 0, 0, 1], 0).into())
        .with_shutdown_timeout(Duration::from_millis(200));

    for _ in 0..5 {
        let addr = assert_ok!(http.start().await);
        assert_err!(http.start().await);
        assert_eq!(http.local_addr(), Some(addr));
        http.stop().await;
        assert!(!http.is_running());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_ends_in_flight_requests() {
    let tool = SleepyTool::new("slow", Duration::from_millis(1500));
    let active = Arc::clone(&tool.active);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(tool)).unwrap();
    let server = Arc::new(McpServer::new(registry).with_request_timeout(Duration::from_secs(10)));
    let session = open_session(&server).await;

    let mut http = HttpServer::new(Arc::clone(&server), ([127, 0, 0, 1], 0).into())
        .with_shutdown_timeout(Duration::from_millis(200));
    let addr = assert_ok!(http.start().await);

    let client = tokio::spawn(async move {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"slow"}}"#;
        let request = format!(
            "POST /mcp HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\n{SESSION_HEADER}: {session}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        String::from_utf8(raw).unwrap()
    });

    while active.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let started = Instant::now();
    http.stop().await;
    assert!(started.elapsed() < Duration::from_secs(1), "{:?}", started.elapsed());
    assert!(!http.is_running());

    let response = assert_ok!(tokio::time::timeout(Duration::from_millis(500), client).await).unwrap();
    assert!(response.starts_with("HTTP/1.1 503"), "{response}");
    assert!(!response.contains("done"));
}
