//! State enums for the chat connection and its polling loop.

/// Current state of the chat server connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket is open.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and ready to send/receive data.
    Connected,
    /// The last connect attempt or an I/O operation failed. The socket, if
    /// any, is defunct until `disconnect` releases it.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Whether the client is permitted to check for incoming data.
///
/// Independent of [`ConnectionState`]: suspending never closes the socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollingState {
    /// Poll cycles run on schedule.
    #[default]
    Active,
    /// Poll cycles are skipped until resumed.
    Suspended,
}

impl std::fmt::Display for PollingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Suspended => write!(f, "Suspended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(PollingState::default(), PollingState::Active);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Failed.to_string(), "Failed");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(PollingState::Suspended.to_string(), "Suspended");
    }
}
