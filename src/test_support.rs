//! Local axum servers standing in for the assistant backend in tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the fake assistant answers each user frame.
#[derive(Debug, Clone, Copy)]
pub enum ServerBehavior {
    /// One assistant frame per query, role upper-cased.
    Reply,
    /// Same as `Reply`, but the frame is JSON-stringified twice.
    ReplyDoubleEncoded,
    /// Replies with text that is not JSON.
    Garbage,
    /// Records queries, never answers.
    Silent,
    /// Sends a Close frame as soon as the socket opens.
    Hangup,
    /// Records the first query, then sends a Close frame without answering.
    HangupAfterQuery,
}

#[derive(Clone)]
struct WsState {
    behavior: ServerBehavior,
    received: Arc<Mutex<Vec<Value>>>,
}

pub struct TestWsServer {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl TestWsServer {
    /// Frames the server has received so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for TestWsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bind `app` on an ephemeral localhost port and serve it in the background.
pub async fn serve(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

pub async fn spawn_ws_server(behavior: ServerBehavior) -> TestWsServer {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = WsState {
        behavior,
        received: received.clone(),
    };
    let app = Router::new().route("/ws", get(ws_upgrade)).with_state(state);
    let (addr, handle) = serve(app).await;

    TestWsServer {
        url: format!("ws://{addr}/ws"),
        received,
        handle,
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: WsState) {
    if matches!(state.behavior, ServerBehavior::Hangup) {
        let _ = socket.send(AxumMessage::Close(None)).await;
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let AxumMessage::Text(text) = msg else {
            continue;
        };
        let Ok(query) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        state.received.lock().unwrap().push(query.clone());

        if matches!(state.behavior, ServerBehavior::HangupAfterQuery) {
            let _ = socket.send(AxumMessage::Close(None)).await;
            return;
        }

        let reply = json!({
            "id": format!("reply-{}", query["id"].as_str().unwrap_or_default()),
            "role": "ASSISTANT",
            "content": format!("Answer to: {}", query["content"].as_str().unwrap_or_default()),
            "created_at": "2024-01-01T00:00:00Z",
        })
        .to_string();

        let out = match state.behavior {
            ServerBehavior::Reply => reply,
            ServerBehavior::ReplyDoubleEncoded => serde_json::to_string(&reply).unwrap(),
            ServerBehavior::Garbage => "not valid json {{{".to_string(),
            ServerBehavior::Silent
            | ServerBehavior::Hangup
            | ServerBehavior::HangupAfterQuery => continue,
        };

        if socket.send(AxumMessage::Text(out)).await.is_err() {
            break;
        }
    }
}
