use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use log::{debug, info, warn};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

pub const LIVERELOAD_PATH: &str = "/__livereload";
const RELOAD_MESSAGE: &str = "reload";

/// Configuration for the development server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory to serve
    pub root: PathBuf,
    /// Open a browser once listening
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            root: PathBuf::from("dist"),
            open: false,
        }
    }
}

/// Tells connected browsers to reload.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<String>,
}

impl Reloader {
    /// Returns the number of browsers notified.
    pub fn reload(&self) -> usize {
        match self.tx.send(RELOAD_MESSAGE.to_string()) {
            Ok(clients) => {
                debug!("Sent reload to {clients} clients");
                clients
            }
            Err(_) => 0,
        }
    }
}

/// Static file server for the output directory with websocket live reload.
pub struct DevServer {
    config: DevServerConfig,
    reloader: Reloader,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            config,
            reloader: Reloader { tx },
        }
    }

    pub fn reloader(&self) -> Reloader {
        self.reloader.clone()
    }

    pub fn address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| format!("invalid address {}:{}", self.config.host, self.config.port))
    }

    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            anyhow::bail!("Root directory does not exist: {}", self.config.root.display());
        }
        let addr = self.address()?;

        let app = Router::new()
            .route(LIVERELOAD_PATH, get(websocket_handler))
            .fallback_service(ServeDir::new(&self.config.root))
            .with_state(self.reloader.clone());

        info!("Serving {} at http://{addr}", self.config.root.display());
        if self.config.open {
            if let Err(e) = open::that(format!("http://{addr}")) {
                warn!("Failed to open browser: {e}");
            }
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn websocket_handler(ws: WebSocketUpgrade, State(reloader): State<Reloader>) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_connection(socket, reloader))
}

async fn websocket_connection(mut socket: WebSocket, reloader: Reloader) {
    let mut rx = reloader.tx.subscribe();
    debug!("Live reload client connected");

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = outgoing(msg) else { break };
                if socket.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
    debug!("Live reload client disconnected");
}

/// Message to forward for a broadcast receive, or `None` once the channel is
/// closed. Every broadcast is a reload, so a lagging client still gets one.
fn outgoing(received: Result<String, broadcast::error::RecvError>) -> Option<String> {
    match received {
        Ok(msg) => Some(msg),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!("Live reload client skipped {skipped} messages");
            Some(RELOAD_MESSAGE.to_string())
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

/// Browser side of the live reload socket.
pub fn livereload_script(host: &str, port: u16) -> String {
    format!(
        r#"<script>
(function() {{
    const socket = new WebSocket('ws://{host}:{port}{LIVERELOAD_PATH}');
    socket.onmessage = function(event) {{
        if (event.data === '{RELOAD_MESSAGE}') {{
            location.reload();
        }}
    }};
}})();
</script>
"#
    )
}

/// Insert `script` before the closing body tag, or append it.
pub fn inject_livereload_script(html: &str, script: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => {
            let mut result = String::with_capacity(html.len() + script.len());
            result.push_str(&html[..pos]);
            result.push_str(script);
            result.push_str(&html[pos..]);
            result
        }
        None => format!("{html}{script}"),
    }
}
