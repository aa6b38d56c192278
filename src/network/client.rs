//! Query client: `BookQueryService` over the local socket.
//!
//! The retrieval loop cannot tell this apart from the in-process executor.
//! Anything that stops a request from reaching the server (no socket,
//! refused connection, timeout) is a store fault.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use interprocess::local_socket::{prelude::*, GenericFilePath, Stream};
use serde_json::Value;

use super::protocol::{RpcRequest, RpcResponse, METHOD_PING, METHOD_QUERY_BOOKS, METHOD_SHUTDOWN};
use crate::constants::IPC_TIMEOUT_SECS;
use crate::filter::FilterModel;
use crate::query::{BookQueryService, QueryOutcome};
use crate::{ShopError, ShopResult};

pub struct RemoteQueryClient {
    socket_path: PathBuf,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RemoteQueryClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(IPC_TIMEOUT_SECS),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// True when the server answers.
    pub fn ping(&self) -> bool {
        self.call(METHOD_PING, Value::Null)
            .map(|v| v.get("pong").is_some())
            .unwrap_or(false)
    }

    pub fn shutdown(&self) -> ShopResult<()> {
        self.call(METHOD_SHUTDOWN, Value::Null).map(|_| ())
    }

    /// One request/response exchange, bounded by the client timeout.
    pub fn call(&self, method: &str, params: Value) -> ShopResult<Value> {
        #[cfg(unix)]
        if !self.socket_path.exists() {
            return Err(ShopError::StoreUnavailable(format!(
                "Query server socket not found: {}. Is `serve` running?",
                self.socket_path.display()
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::to_string(&RpcRequest::new(method, params, id))?;

        // Connect/read have no timeout of their own; run on a helper thread.
        let (tx, rx) = std::sync::mpsc::channel();
        let sock = self.socket_path.clone();
        std::thread::spawn(move || {
            tx.send(exchange(&sock, &request)).ok();
        });
        let response = rx.recv_timeout(self.timeout).map_err(|_| {
            ShopError::StoreUnavailable(format!(
                "Query server timeout after {}s",
                self.timeout.as_secs_f32()
            ))
        })??;

        if let Some(error) = response.error {
            return Err(error.into());
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

fn exchange(socket_path: &Path, request: &str) -> ShopResult<RpcResponse> {
    let name = socket_path
        .to_fs_name::<GenericFilePath>()
        .map_err(|e| ShopError::Transport(format!("Invalid socket name: {}", e)))?;

    let mut stream = Stream::connect(name)
        .map_err(|e| ShopError::StoreUnavailable(format!("Failed to connect to query server: {}", e)))?;

    let unavailable = |e: std::io::Error| ShopError::StoreUnavailable(format!("Query server I/O: {}", e));
    stream.write_all(request.as_bytes()).map_err(unavailable)?;
    stream.write_all(b"\n").map_err(unavailable)?;
    stream.flush().map_err(unavailable)?;

    let mut line = String::new();
    BufReader::new(&mut stream)
        .read_line(&mut line)
        .map_err(unavailable)?;
    if line.trim().is_empty() {
        return Err(ShopError::StoreUnavailable("Query server closed the connection".into()));
    }

    serde_json::from_str(&line)
        .map_err(|e| ShopError::Transport(format!("Invalid server response: {}", e)))
}

impl BookQueryService for RemoteQueryClient {
    fn query(&self, filters: &FilterModel) -> ShopResult<QueryOutcome> {
        let params = serde_json::to_value(filters)?;
        let result = self.call(METHOD_QUERY_BOOKS, params)?;
        serde_json::from_value(result)
            .map_err(|e| ShopError::Transport(format!("Unexpected query_books result: {}", e)))
    }
}
