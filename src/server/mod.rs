// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Development server
//!
//! Serves the destination tree over HTTP and tells connected browsers to
//! reload whenever a file under it changes. HTML responses get a small
//! script that long-polls the reload endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, Debouncer};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::ServerConfig;

/// Long-poll endpoint used by the injected script
pub const RELOAD_PATH: &str = "/__assetflow/reload";

const LONG_POLL: Duration = Duration::from_secs(30);

const RELOAD_SCRIPT: &str = "<script>(function poll(){fetch('/__assetflow/reload')\
.then(function(r){if(r.status===200){location.reload()}else{poll()}})\
.catch(function(){setTimeout(poll,1000)})})();</script>";

#[derive(Clone)]
struct AppState {
    root: Arc<PathBuf>,
    reload: broadcast::Sender<()>,
}

/// Static file server with live reload
pub struct DevServer {
    root: PathBuf,
    address: String,
    debounce: Duration,
    reload: broadcast::Sender<()>,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>, config: &ServerConfig) -> Self {
        let (reload, _) = broadcast::channel(16);
        Self {
            root: root.into(),
            address: format!("{}:{}", config.host, config.port),
            debounce: Duration::from_millis(100),
            reload,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Handle for signalling a reload to every waiting browser
    pub fn reloader(&self) -> broadcast::Sender<()> {
        self.reload.clone()
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            root: Arc::new(self.root.clone()),
            reload: self.reload.clone(),
        };

        Router::new()
            .route(RELOAD_PATH, get(reload_poll))
            .fallback(serve_file)
            .with_state(state)
    }

    /// Watch the output tree and signal reloads; keep the returned
    /// debouncer alive for as long as reloads are wanted
    pub fn watch_output(
        &self,
    ) -> AssetflowResult<Debouncer<notify::RecommendedWatcher>> {
        let reload = self.reload.clone();
        let mut debouncer = new_debouncer(self.debounce, move |result: notify_debouncer_mini::DebounceEventResult| {
            if let Ok(events) = result {
                if !events.is_empty() {
                    tracing::debug!(changed = events.len(), "output changed, reloading browsers");
                    let _ = reload.send(());
                }
            }
        })?;
        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)?;
        Ok(debouncer)
    }

    /// Bind the configured address and serve until Ctrl+C
    pub async fn run(self) -> AssetflowResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let _watcher = self.watch_output()?;

        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|e| AssetflowError::Server {
                message: format!("cannot bind {}: {}", self.address, e),
            })?;

        println!(
            "{} {} at {}",
            "Serving".bold(),
            self.root.display(),
            format!("http://{}", self.address).cyan()
        );
        self.serve_on(listener).await
    }

    pub async fn serve_on(self, listener: TcpListener) -> AssetflowResult<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(|e| AssetflowError::Server {
                message: e.to_string(),
            })
    }
}

async fn reload_poll(State(state): State<AppState>) -> Response {
    let mut rx = state.reload.subscribe();
    match tokio::time::timeout(LONG_POLL, rx.recv()).await {
        Ok(Ok(())) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
            (StatusCode::OK, "reload").into_response()
        }
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn serve_file(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(mut path) = resolve(&state.root, uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        path.push("index.html");
    }

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let content_type = content_type(&path);
    let body = if content_type.starts_with("text/html") {
        inject_reload(contents)
    } else {
        contents
    };

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Map a request path onto the served root; `None` for anything that
/// would escape it
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(request_path)?;
    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn inject_reload(html: Vec<u8>) -> Vec<u8> {
    let marker = b"</body>";
    let position = html
        .windows(marker.len())
        .rposition(|w| w.eq_ignore_ascii_case(marker));

    let mut out = Vec::with_capacity(html.len() + RELOAD_SCRIPT.len());
    match position {
        Some(at) => {
            out.extend_from_slice(&html[..at]);
            out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
            out.extend_from_slice(&html[at..]);
        }
        None => {
            out.extend_from_slice(&html);
            out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
        }
    }
    out
}
