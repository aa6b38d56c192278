//! Wire types shared by the query server and its client.
//!
//! Each message is a single JSON object terminated by `\n`:
//!
//! ```text
//! -> {"jsonrpc":"2.0","method":"query_books","params":{...filter model...},"id":1}
//! <- {"jsonrpc":"2.0","result":{"status":"success","books":[...]},"id":1}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ShopError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_PING: &str = "ping";
pub const METHOD_QUERY_BOOKS: &str = "query_books";
pub const METHOD_SHUTDOWN: &str = "shutdown";

pub const ERR_PARSE: i64 = -32700;
pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERR_INVALID_PARAMS: i64 = -32602;
pub const ERR_INTERNAL: i64 = -32603;
pub const ERR_VALIDATION: i64 = -32001;
pub const ERR_STORE_UNAVAILABLE: i64 = -32002;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: u64,
}

impl RpcResponse {
    pub fn ok(result: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn err(error: RpcError, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&ShopError> for RpcError {
    fn from(e: &ShopError) -> Self {
        let code = match e {
            ShopError::Validation(_) => ERR_VALIDATION,
            ShopError::InvalidInput(_) | ShopError::Serialization(_) => ERR_INVALID_PARAMS,
            e if e.is_store_fault() => ERR_STORE_UNAVAILABLE,
            _ => ERR_INTERNAL,
        };
        Self::new(code, e.to_string())
    }
}

impl From<RpcError> for ShopError {
    /// Server-side failures keep their class across the socket, so a remote
    /// store fault still aborts retrieval on the calling side.
    fn from(e: RpcError) -> Self {
        match e.code {
            ERR_VALIDATION => ShopError::Validation(e.message),
            ERR_STORE_UNAVAILABLE => ShopError::StoreUnavailable(e.message),
            ERR_INVALID_PARAMS => ShopError::InvalidInput(e.message),
            _ => ShopError::Transport(format!("Remote error {}: {}", e.code, e.message)),
        }
    }
}
