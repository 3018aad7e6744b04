use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use fit_core::graph::DependencyGraph;
use futures::{sink::SinkExt, stream::StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

mod commands;

use commands::handle_command;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

// Application State
struct AppState {
    graph: Arc<RwLock<DependencyGraph>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let shared_state = Arc::new(AppState {
        graph: Arc::new(RwLock::new(DependencyGraph::new())),
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let addr = std::env::var("FIT_BACKEND_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = match addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid FIT_BACKEND_ADDR '{}': {}", addr, e);
            return;
        }
    };

    info!("listening on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

async fn root() -> String {
    format!("Fit model backend {}", fit_core::version())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Client connected");
    let (mut sender, mut receiver) = socket.split();

    // Send the current graph so the client starts in sync
    let initial = {
        let mut graph = state.graph.write().await;
        handle_command(&mut graph, "GRAPH")
    };
    if let Ok(replies) = initial {
        for reply in replies {
            if sender.send(Message::Text(reply)).await.is_err() {
                return;
            }
        }
    }

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        info!("Received message: {}", text);

        let replies = {
            let mut graph = state.graph.write().await;
            match handle_command(&mut graph, &text) {
                Ok(replies) => replies,
                Err(e) => {
                    let message = e.to_message();
                    warn!("Command failed: {}", message);
                    vec![message]
                }
            }
        };

        for reply in replies {
            if sender.send(Message::Text(reply)).await.is_err() {
                return;
            }
        }
    }
    info!("Client disconnected");
}
