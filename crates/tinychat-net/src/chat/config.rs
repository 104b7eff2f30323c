//! Configuration types for the chat socket client.

use std::time::Duration;

/// Address of the public chat server the client was written against.
pub const DEFAULT_CHAT_SERVER_HOST: &str = "52.91.109.76";
/// Port of the public chat server.
pub const DEFAULT_CHAT_SERVER_PORT: u16 = 1234;
/// Maximum number of bytes taken from the socket in one poll cycle.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// How poll cycles are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollingMode {
    /// The client spawns one recurring tokio task per connection that polls
    /// every [`ChatClientConfig::poll_interval`].
    #[default]
    Background,
    /// Nothing is spawned; the caller drives [`poll`](super::ChatSocketClient::poll)
    /// from its own scheduler.
    Manual,
}

/// Socket-level options for the chat connection.
#[derive(Clone, Debug)]
pub struct ChatSocketConfig {
    /// Enable TCP_NODELAY (disable Nagle's algorithm).
    pub no_delay: bool,
    /// Read buffer size in bytes. Bounds a single poll cycle.
    pub read_buffer_size: usize,
    /// Upper bound on resolving and connecting.
    pub connect_timeout: Duration,
    /// How long one poll cycle waits for the socket to become readable.
    pub read_timeout: Duration,
    /// Upper bound on a full `write`. `None` means no timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for ChatSocketConfig {
    fn default() -> Self {
        Self {
            no_delay: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_millis(20),
            write_timeout: None,
        }
    }
}

impl ChatSocketConfig {
    /// Create a new socket configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable TCP_NODELAY.
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = enabled;
        self
    }

    /// Set the read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long a poll cycle waits for data.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

/// Configuration for a [`ChatSocketClient`](super::ChatSocketClient).
///
/// The endpoint is not part of the configuration; it is supplied to each
/// `connect` call.
#[derive(Clone, Debug)]
pub struct ChatClientConfig {
    /// Socket-level options.
    pub socket: ChatSocketConfig,
    /// Delay between background poll cycles.
    pub poll_interval: Duration,
    /// Who schedules poll cycles.
    pub polling: PollingMode,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            socket: ChatSocketConfig::default(),
            poll_interval: Duration::from_millis(50),
            polling: PollingMode::Background,
        }
    }
}

impl ChatClientConfig {
    /// Create a new client configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set socket options.
    pub fn socket_config(mut self, config: ChatSocketConfig) -> Self {
        self.socket = config;
        self
    }

    /// Enable TCP_NODELAY.
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.socket.no_delay = enabled;
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.socket.connect_timeout = timeout;
        self
    }

    /// Set how long a poll cycle waits for data.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.socket.read_timeout = timeout;
        self
    }

    /// Set the background poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Let the caller drive `poll` instead of spawning a background task.
    pub fn manual_polling(mut self) -> Self {
        self.polling = PollingMode::Manual;
        self
    }

    /// Set the polling mode.
    pub fn polling_mode(mut self, mode: PollingMode) -> Self {
        self.polling = mode;
        self
    }

    /// Poll interval with a 1 ms floor, since `tokio::time::interval` rejects zero.
    pub(crate) fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    pub(crate) fn effective_read_buffer_size(&self) -> usize {
        self.socket.read_buffer_size.max(1)
    }
}
