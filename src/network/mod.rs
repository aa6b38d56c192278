//! Out-of-process query transport.
//!
//! Line-delimited JSON-RPC over a local socket (Unix domain socket, or named
//! pipe on Windows), one request per connection.

pub mod client;
pub mod protocol;
pub mod server;
