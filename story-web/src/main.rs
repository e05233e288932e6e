//! Browser front-end for the interactive storyteller.
//!
//! Serves a single page at `/` and a websocket at `/ws`. Each socket owns its
//! own story; see [`protocol`] for the message format.

mod connection;
mod protocol;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use story_core::{Generate, StoryConfig, Storyteller};
use tokio::sync::mpsc;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use connection::Connection;
use protocol::ServerMessage;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Outgoing messages buffered per socket before generation waits on the writer.
const OUTBOX_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve the interactive storyteller to a browser")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "STORY_WEB_ADDR", default_value = "127.0.0.1:5000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StoryConfig::from_env()?;
    let teller = Storyteller::from_config(&config)?;
    if let Err(e) = teller.generator().client().list_models().await {
        tracing::warn!(error = %e, url = %config.base_url, "Ollama server not reachable");
    }

    let listener = tokio::net::TcpListener::bind(cli.addr).await?;
    tracing::info!(addr = %listener.local_addr()?, model = %config.model, "serving story-web");
    axum::serve(listener, app(teller)).await?;
    Ok(())
}

fn app<G: Generate + 'static>(teller: Storyteller<G>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler::<G>))
        .with_state(Arc::new(teller))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ws_handler<G: Generate + 'static>(
    ws: WebSocketUpgrade,
    State(teller): State<Arc<Storyteller<G>>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, teller))
}

async fn serve_socket<G: Generate + 'static>(socket: WebSocket, teller: Arc<Storyteller<G>>) {
    tracing::info!("client connected");
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut pending) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(message) = pending.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut connection = Connection::new(teller, outbox);
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "websocket read failed");
                break;
            }
        }
    }

    // Dropping the connection closes the outbox and ends the writer.
    drop(connection);
    let _ = writer.await;
    tracing::info!("client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_core::ScriptedGenerator;

    #[tokio::test]
    async fn test_index_page_is_served() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(Storyteller::new(ScriptedGenerator::default()));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let body = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("new WebSocket"));
        assert!(body.contains("story_stream"));
    }

    #[test]
    fn test_cli_addr_flag() {
        let cli = Cli::parse_from(["story-web", "--addr", "0.0.0.0:8080"]);
        assert_eq!(cli.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }
}
