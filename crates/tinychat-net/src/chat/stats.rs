//! Connection statistics.

use std::net::SocketAddr;
use std::time::SystemTime;

/// Snapshot of traffic and connection history for a client.
///
/// Byte counters and `connect_count` accumulate across connections.
/// `last_connected_at` survives disconnects so a host can ask the chat
/// server for whatever it missed since then.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total bytes written to the server.
    pub bytes_sent: u64,
    /// Total bytes delivered from the server.
    pub bytes_received: u64,
    /// Number of successful connects.
    pub connect_count: u64,
    /// Peer of the live connection.
    pub peer_addr: Option<SocketAddr>,
    /// When the live connection was established.
    pub connected_since: Option<SystemTime>,
    /// Last moment a connection was known to be alive: refreshed after
    /// each successful write and when a live connection is torn down.
    pub last_connected_at: Option<SystemTime>,
}

impl ConnectionStats {
    pub(crate) fn record_connect(&mut self, peer: SocketAddr) {
        let now = SystemTime::now();
        self.connect_count += 1;
        self.peer_addr = Some(peer);
        self.connected_since = Some(now);
        self.last_connected_at = Some(now);
    }

    pub(crate) fn record_sent(&mut self, count: usize) {
        self.bytes_sent += count as u64;
        self.last_connected_at = Some(SystemTime::now());
    }

    pub(crate) fn record_received(&mut self, count: usize) {
        self.bytes_received += count as u64;
    }

    /// Clear per-connection fields. `was_live` refreshes the last-connected stamp.
    pub(crate) fn record_teardown(&mut self, was_live: bool) {
        if was_live {
            self.last_connected_at = Some(SystemTime::now());
        }
        self.peer_addr = None;
        self.connected_since = None;
    }
}
