//! Chat server socket client.
//!
//! [`ChatSocketClient`] owns one TCP connection to a chat server, writes
//! caller-supplied bytes to it and polls it for incoming bytes. Received
//! bytes are pushed, unframed, to a weakly-held [`ChatClientObserver`].
//!
//! Polling runs either as a background tokio task per connection or on
//! the caller's own schedule, see [`PollingMode`]. It can be suspended and
//! resumed without closing the socket.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tinychat_net::chat::{ChatClientConfig, ChatClientObserver, ChatSocketClient};
//!
//! struct Printer;
//!
//! impl ChatClientObserver for Printer {
//!     fn on_connect(&self) {
//!         println!("Connected!");
//!     }
//!
//!     fn on_data(&self, bytes: &[u8]) {
//!         println!("Received {} bytes", bytes.len());
//!     }
//! }
//!
//! let printer = Arc::new(Printer);
//! let client = ChatSocketClient::new(ChatClientConfig::default());
//! client.set_observer(&printer);
//!
//! client.connect("127.0.0.1", 1234).await?;
//! client.write(b"{'msg': 'hello'}").await?;
//!
//! // App moved to the background
//! client.suspend();
//! // ...and back
//! client.resume();
//! ```

mod client;
mod config;
mod observer;
mod state;
mod stats;

pub use client::{ChatSocketClient, PollOutcome};
pub use config::{
    ChatClientConfig, ChatSocketConfig, DEFAULT_CHAT_SERVER_HOST, DEFAULT_CHAT_SERVER_PORT,
    DEFAULT_READ_BUFFER_SIZE, PollingMode,
};
pub use observer::ChatClientObserver;
pub use state::{ConnectionState, PollingState};
pub use stats::ConnectionStats;
