//! Error types for the chat socket client.

use std::io;

use thiserror::Error;

/// Errors produced by [`ChatSocketClient`](crate::chat::ChatSocketClient).
///
/// The type is `Clone` so the same value can be returned to a caller and
/// pushed to the observer's fault path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatClientError {
    /// The host name could not be resolved to any socket address.
    #[error("Failed to resolve {host}: {message}")]
    ResolutionFailure {
        /// The host that failed to resolve.
        host: String,
        /// Resolver error text.
        message: String,
    },
    /// The remote endpoint refused the connection.
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),
    /// The connection attempt did not complete within the connect timeout.
    #[error("Connection timed out")]
    ConnectTimeout,
    /// Any other I/O failure while establishing the connection.
    #[error("Connection error: {0}")]
    ConnectFailure(String),
    /// `connect` was called while a connection is already live or pending.
    #[error("Already connected")]
    AlreadyConnected,
    /// The operation requires a live connection.
    #[error("Not connected")]
    NotConnected,
    /// A connection attempt was abandoned because `disconnect` was called.
    #[error("Connection attempt was cancelled")]
    Cancelled,
    /// Writing to the socket failed; the connection is unusable.
    #[error("Write failed: {0}")]
    WriteFailure(String),
    /// Reading from the socket failed; the connection is unusable.
    #[error("Read failed: {0}")]
    ReadFailure(String),
    /// The peer closed its end of the connection.
    #[error("Connection closed by peer")]
    PeerClosed,
}

impl ChatClientError {
    /// Classify an I/O error raised while establishing a connection.
    pub(crate) fn from_connect(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused(err.to_string()),
            io::ErrorKind::TimedOut => Self::ConnectTimeout,
            _ => Self::ConnectFailure(err.to_string()),
        }
    }

    /// Whether this error ends the connection it was raised on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::WriteFailure(_) | Self::ReadFailure(_) | Self::PeerClosed
        )
    }
}

/// A specialized Result type for chat client operations.
pub type Result<T> = std::result::Result<T, ChatClientError>;
