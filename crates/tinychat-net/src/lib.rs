//! Socket client for TinyChat servers.
//!
//! This crate provides a minimal TCP client that moves opaque bytes
//! between an application and a chat server:
//!
//! - **Connection lifecycle**: connect with a bounded timeout, explicit
//!   idempotent disconnect, no automatic retry
//! - **Polling**: a background task per connection, or caller-driven
//!   cycles, with suspend/resume that leaves the socket open
//! - **Observer**: a weakly-held listener that receives data, connect and
//!   fault notifications in arrival order
//!
//! Message framing is left to the consumer of the byte stream.
//!
//! # Tracing
//!
//! The client logs through the `tracing` crate under the targets in
//! [`targets`]. Install a subscriber in the host application to see them.

pub mod chat;
mod error;

pub use chat::{
    ChatClientConfig, ChatClientObserver, ChatSocketClient, ChatSocketConfig, ConnectionState,
    ConnectionStats, PollOutcome, PollingMode, PollingState,
};
pub use error::{ChatClientError, Result};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Connection lifecycle and writes.
    pub const CLIENT: &str = "tinychat_net::client";
    /// Poll cycles and the background polling loop.
    pub const POLL: &str = "tinychat_net::poll";
}
