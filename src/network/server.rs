//! Query server: the catalog executor behind a local socket.
//!
//! Each connection is handled on its own thread and carries one request.
//!
//! Methods:
//!   ping        -> {"pong": true}
//!   query_books -> QueryOutcome JSON (params: filter model)
//!   shutdown    -> {"shutting_down": true}, then the listener stops

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use interprocess::local_socket::{prelude::*, GenericFilePath, ListenerOptions, Stream};
use serde_json::Value;

use super::protocol::{
    RpcError, RpcRequest, RpcResponse, ERR_INTERNAL, ERR_METHOD_NOT_FOUND, ERR_PARSE,
    METHOD_PING, METHOD_QUERY_BOOKS, METHOD_SHUTDOWN,
};
use crate::filter::FilterModel;
use crate::query::BookQueryService;
use crate::{ShopError, ShopResult};

pub struct QueryServer {
    service: Arc<dyn BookQueryService>,
    socket_path: PathBuf,
    stop: Arc<AtomicBool>,
}

impl QueryServer {
    pub fn new(service: Arc<dyn BookQueryService>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            service,
            socket_path: socket_path.into(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the server once set (signal handlers, `shutdown`).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve until the stop flag is set. Blocks the calling thread.
    pub fn serve(&self) -> ShopResult<()> {
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener_handle = {
            let service = self.service.clone();
            let stop = self.stop.clone();
            let sock = self.socket_path.clone();
            let listener = bind(&sock)?;
            tracing::info!(socket = %sock.display(), "Query server listening");
            std::thread::spawn(move || accept_loop(listener, &sock, service, stop))
        };

        while !self.stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(200));
        }

        tracing::info!("Query server shutting down");
        wake(&self.socket_path);
        let _ = listener_handle.join();
        let _ = std::fs::remove_file(&self.socket_path);
        tracing::info!("Query server stopped");
        Ok(())
    }
}

fn bind(socket_path: &Path) -> ShopResult<interprocess::local_socket::Listener> {
    // Stale socket file from a previous run (harmless on Windows).
    let _ = std::fs::remove_file(socket_path);
    let name = socket_path
        .to_fs_name::<GenericFilePath>()
        .map_err(|e| ShopError::Transport(format!("Invalid socket name: {}", e)))?;
    ListenerOptions::new()
        .name(name)
        .create_sync()
        .map_err(|e| ShopError::Transport(format!("Failed to bind {}: {}", socket_path.display(), e)))
}

fn accept_loop(
    listener: interprocess::local_socket::Listener,
    socket_path: &Path,
    service: Arc<dyn BookQueryService>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok(stream) => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                let service = service.clone();
                let stop = stop.clone();
                std::thread::spawn(move || handle_connection(stream, service.as_ref(), &stop));
            }
            Err(e) => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                tracing::warn!(socket = %socket_path.display(), "Accept error: {}", e);
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }
}

/// Unblock `accept()` by connecting once.
pub fn wake(socket_path: &Path) {
    if let Ok(name) = socket_path.to_fs_name::<GenericFilePath>() {
        let _ = Stream::connect(name);
    }
}

fn handle_connection(mut stream: Stream, service: &dyn BookQueryService, stop: &AtomicBool) {
    let mut line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
            return;
        }
    }

    let response = match serde_json::from_str::<RpcRequest>(&line) {
        Ok(request) => {
            let started = Instant::now();
            let result = dispatch(&request.method, &request.params, service, stop);
            tracing::debug!(
                method = %request.method,
                id = request.id,
                duration_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "IPC request completed"
            );
            match result {
                Ok(value) => RpcResponse::ok(value, request.id),
                Err(error) => RpcResponse::err(error, request.id),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "IPC: invalid JSON received");
            RpcResponse::err(RpcError::new(ERR_PARSE, format!("Invalid request: {}", e)), 0)
        }
    };

    if let Ok(json) = serde_json::to_string(&response) {
        let _ = stream.write_all(json.as_bytes());
        let _ = stream.write_all(b"\n");
        let _ = stream.flush();
    }
}

/// Route one request. Split out from the socket handling so it can be
/// exercised directly.
pub fn dispatch(
    method: &str,
    params: &Value,
    service: &dyn BookQueryService,
    stop: &AtomicBool,
) -> Result<Value, RpcError> {
    match method {
        METHOD_PING => Ok(serde_json::json!({"pong": true})),

        METHOD_SHUTDOWN => {
            tracing::info!("Shutdown requested via IPC");
            stop.store(true, Ordering::Relaxed);
            Ok(serde_json::json!({"shutting_down": true}))
        }

        METHOD_QUERY_BOOKS => {
            let filters = match params {
                Value::Null => FilterModel::default(),
                other => FilterModel::from_value(other.clone()).map_err(|e| RpcError::from(&e))?,
            };
            let outcome = service.query(&filters).map_err(|e| {
                tracing::warn!("query_books failed: {}", e);
                RpcError::from(&e)
            })?;
            tracing::info!(
                status = outcome.status(),
                candidates = outcome.books().len(),
                "query_books served"
            );
            serde_json::to_value(&outcome)
                .map_err(|e| RpcError::new(ERR_INTERNAL, e.to_string()))
        }

        other => Err(RpcError::new(
            ERR_METHOD_NOT_FOUND,
            format!("Unknown method: {}", other),
        )),
    }
}
