//! Chat socket client with a suspendable polling loop.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{MissedTickBehavior, timeout};

use super::config::{ChatClientConfig, PollingMode};
use super::observer::{ChatClientObserver, ObserverSlot};
use super::state::{ConnectionState, PollingState};
use super::stats::ConnectionStats;
use crate::error::{ChatClientError, Result};
use crate::targets;

/// Result of a single poll cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Bytes read this cycle. They have already been handed to the observer.
    Data(Bytes),
    /// Nothing arrived within the read timeout.
    Empty,
    /// Polling is suspended; the socket was not touched.
    Suspended,
}

/// One open socket and the locks that serialize access to it.
struct Session {
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    /// Flips to `true` once the session is released.
    closed: watch::Sender<bool>,
    read_lock: AsyncMutex<()>,
    write_lock: AsyncMutex<()>,
}

impl Session {
    fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Resolves once the session has been released.
    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Mutable connection bookkeeping, guarded by a single lock.
struct ClientInner {
    connection: ConnectionState,
    session: Option<Arc<Session>>,
    /// Bumped by every connect attempt and teardown. Work started under an
    /// older epoch is stale and must not reach the observer.
    epoch: u64,
    stats: ConnectionStats,
}

impl ClientInner {
    fn is_current(&self, session_id: u64) -> bool {
        self.connection == ConnectionState::Connected && self.epoch == session_id
    }

    /// Release the session and reset to `Disconnected`.
    fn teardown(&mut self) -> Option<Arc<Session>> {
        let was_live = self.connection == ConnectionState::Connected;
        self.epoch += 1;
        self.connection = ConnectionState::Disconnected;
        self.stats.record_teardown(was_live);
        self.session.take()
    }
}

/// State shared between the client handle and its polling task.
struct Shared {
    config: ChatClientConfig,
    inner: Mutex<ClientInner>,
    polling: watch::Sender<PollingState>,
    observer: ObserverSlot,
    /// Held while an observer callback runs. Re-entrant so callbacks may
    /// call back into the client.
    dispatch: ReentrantMutex<()>,
}

impl Shared {
    fn polling_state(&self) -> PollingState {
        *self.polling.borrow()
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.inner.lock().is_current(session_id)
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        let inner = self.inner.lock();
        match inner.connection {
            ConnectionState::Connected => inner.session.clone(),
            _ => None,
        }
    }

    /// Move to `Connecting` and return the epoch of the new attempt.
    fn begin_connect(&self) -> Result<u64> {
        let (epoch, stale) = {
            let mut inner = self.inner.lock();
            let stale = match inner.connection {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    return Err(ChatClientError::AlreadyConnected);
                }
                ConnectionState::Failed => inner.teardown(),
                ConnectionState::Disconnected => None,
            };
            inner.epoch += 1;
            inner.connection = ConnectionState::Connecting;
            (inner.epoch, stale)
        };
        if let Some(session) = stale {
            session.close();
        }
        Ok(epoch)
    }

    fn fail_connect(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch && inner.connection == ConnectionState::Connecting {
            inner.connection = ConnectionState::Failed;
        }
    }

    /// Adopt a freshly opened stream, unless `disconnect` won the race.
    fn install(&self, epoch: u64, stream: TcpStream, peer: SocketAddr) -> Result<Arc<Session>> {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.connection != ConnectionState::Connecting {
            return Err(ChatClientError::Cancelled);
        }

        let (closed, _) = watch::channel(false);
        let session = Arc::new(Session {
            id: epoch,
            stream,
            peer,
            closed,
            read_lock: AsyncMutex::new(()),
            write_lock: AsyncMutex::new(()),
        });

        inner.session = Some(session.clone());
        inner.connection = ConnectionState::Connected;
        inner.stats.record_connect(peer);
        self.polling.send_replace(PollingState::Active);
        Ok(session)
    }

    /// Tear down whatever connection exists. Returns `false` if there was none.
    fn teardown(&self) -> bool {
        let session = {
            let mut inner = self.inner.lock();
            if inner.connection == ConnectionState::Disconnected {
                return false;
            }
            inner.teardown()
        };
        self.polling.send_replace(PollingState::Active);
        if let Some(session) = session {
            session.close();
        }
        true
    }

    /// Mark the connection defunct after a fatal write error.
    fn mark_failed(&self, session_id: u64) {
        let mut inner = self.inner.lock();
        if inner.is_current(session_id) {
            inner.connection = ConnectionState::Failed;
            tracing::debug!(target: targets::CLIENT, session = session_id, "Connection marked failed");
        }
    }

    fn record_sent(&self, session_id: u64, count: usize) {
        let mut inner = self.inner.lock();
        if inner.epoch == session_id {
            inner.stats.record_sent(count);
        }
    }

    fn notify_connected(&self, session_id: u64) {
        let _dispatch = self.dispatch.lock();
        if !self.is_current(session_id) {
            return;
        }
        if let Some(observer) = self.observer.get() {
            observer.on_connect();
        }
    }

    /// Hand received bytes to the observer. Returns `false` if the session
    /// went stale while the read was in flight, in which case nothing is
    /// delivered.
    fn deliver_data(&self, session_id: u64, data: &[u8]) -> bool {
        let _dispatch = self.dispatch.lock();
        {
            let mut inner = self.inner.lock();
            if !inner.is_current(session_id) {
                return false;
            }
            inner.stats.record_received(data.len());
        }
        if let Some(observer) = self.observer.get() {
            observer.on_data(data);
        }
        true
    }

    /// Apply a fatal read-side error and push it to the observer.
    fn deliver_fault(&self, session_id: u64, error: &ChatClientError) {
        let _dispatch = self.dispatch.lock();
        let released = {
            let mut inner = self.inner.lock();
            if !inner.is_current(session_id) {
                return;
            }
            match error {
                ChatClientError::PeerClosed => inner.teardown(),
                _ => {
                    inner.connection = ConnectionState::Failed;
                    None
                }
            }
        };
        if let Some(session) = released {
            self.polling.send_replace(PollingState::Active);
            session.close();
        }

        tracing::warn!(target: targets::CLIENT, session = session_id, %error, "Connection lost");
        if let Some(observer) = self.observer.get() {
            observer.on_fault(error);
        }
    }

    /// Run one poll cycle against `session`.
    async fn poll_session(&self, session: &Session) -> Result<PollOutcome> {
        let suspended = self.polling_state() == PollingState::Suspended;
        if suspended {
            return Ok(PollOutcome::Suspended);
        }

        let _cycle = session.read_lock.lock().await;
        let capacity = self.config.effective_read_buffer_size();
        let wait = self.config.socket.read_timeout;

        let read = tokio::select! {
            biased;
            _ = session.closed() => return Err(ChatClientError::NotConnected),
            read = read_once(&session.stream, capacity, wait) => read,
        };

        match read {
            Ok(None) => Ok(PollOutcome::Empty),
            Ok(Some(data)) => {
                tracing::trace!(
                    target: targets::POLL,
                    session = session.id,
                    bytes = data.len(),
                    "Received data"
                );
                if self.deliver_data(session.id, &data) {
                    Ok(PollOutcome::Data(data))
                } else {
                    Err(ChatClientError::NotConnected)
                }
            }
            Err(error) => {
                self.deliver_fault(session.id, &error);
                Err(error)
            }
        }
    }
}

/// Wait up to `wait` for the socket to become readable, then perform one read.
///
/// `Ok(None)` means no data was available.
async fn read_once(stream: &TcpStream, capacity: usize, wait: Duration) -> Result<Option<Bytes>> {
    match timeout(wait, stream.readable()).await {
        Err(_) => return Ok(None),
        Ok(Err(e)) => return Err(ChatClientError::ReadFailure(e.to_string())),
        Ok(Ok(())) => {}
    }

    let mut buffer = BytesMut::zeroed(capacity);
    match stream.try_read(&mut buffer) {
        Ok(0) => Err(ChatClientError::PeerClosed),
        Ok(n) => {
            buffer.truncate(n);
            Ok(Some(buffer.freeze()))
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            Ok(None)
        }
        Err(e) => Err(ChatClientError::ReadFailure(e.to_string())),
    }
}

/// Write all of `data`, looping on partial writes.
async fn write_all(session: &Session, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        tokio::select! {
            biased;
            _ = session.closed() => return Err(ChatClientError::NotConnected),
            ready = session.stream.writable() => {
                ready.map_err(|e| ChatClientError::WriteFailure(e.to_string()))?;
            }
        }

        match session.stream.try_write(data) {
            Ok(0) => {
                return Err(ChatClientError::WriteFailure(
                    "socket accepted zero bytes".into(),
                ));
            }
            Ok(n) => {
                tracing::trace!(target: targets::CLIENT, session = session.id, bytes = n, "Partial write");
                data = &data[n..];
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
            Err(e) => return Err(ChatClientError::WriteFailure(e.to_string())),
        }
    }
    Ok(())
}

/// Resolve `host` and connect to the first address that accepts.
async fn open_stream(host: &str, port: u16) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ChatClientError::ResolutionFailure {
            host: host.to_string(),
            message: e.to_string(),
        })?
        .collect();

    let mut last_error = ChatClientError::ResolutionFailure {
        host: host.to_string(),
        message: "no addresses found".into(),
    };
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(target: targets::CLIENT, %addr, error = %e, "Connect attempt failed");
                last_error = ChatClientError::from_connect(&e);
            }
        }
    }
    Err(last_error)
}

/// Background polling loop. One instance runs per connected session.
async fn run_polling_loop(shared: Arc<Shared>, session: Arc<Session>) {
    let mut ticker = tokio::time::interval(shared.config.effective_poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polling = shared.polling.subscribe();

    tracing::debug!(target: targets::POLL, session = session.id, "Polling loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = session.closed() => break,
        }
        if !shared.is_current(session.id) {
            break;
        }

        let suspended = *polling.borrow_and_update() == PollingState::Suspended;
        if suspended {
            let resumed = tokio::select! {
                resumed = async { polling.wait_for(|s| *s == PollingState::Active).await.is_ok() } => resumed,
                _ = session.closed() => false,
            };
            if !resumed {
                break;
            }
            ticker.reset();
            continue;
        }

        if shared.poll_session(&session).await.is_err() {
            break;
        }
    }

    tracing::debug!(target: targets::POLL, session = session.id, "Polling loop stopped");
}

/// A TCP client for a chat server that moves opaque bytes.
///
/// The client owns at most one socket. Received bytes are pushed to a
/// weakly-held [`ChatClientObserver`], either from a background task the
/// client spawns per connection ([`PollingMode::Background`]) or from
/// explicit [`poll`](Self::poll) calls ([`PollingMode::Manual`]).
///
/// Polling can be suspended and resumed without touching the connection.
/// Data that arrives while suspended stays in the OS receive buffer and is
/// delivered by the first poll cycle after resuming.
///
/// # Example
///
/// ```ignore
/// let client = ChatSocketClient::new(ChatClientConfig::default());
/// client.set_observer(&observer);
///
/// client.connect("127.0.0.1", 1234).await?;
/// client.write(b"ping").await?;
///
/// client.suspend();
/// client.resume();
/// client.disconnect();
/// ```
pub struct ChatSocketClient {
    shared: Arc<Shared>,
}

impl ChatSocketClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ChatClientConfig) -> Self {
        let (polling, _) = watch::channel(PollingState::Active);
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(ClientInner {
                    connection: ConnectionState::Disconnected,
                    session: None,
                    epoch: 0,
                    stats: ConnectionStats::default(),
                }),
                polling,
                observer: ObserverSlot::default(),
                dispatch: ReentrantMutex::new(()),
            }),
        }
    }

    /// Register the observer. Only a weak reference is kept.
    pub fn set_observer<O>(&self, observer: &Arc<O>)
    where
        O: ChatClientObserver + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.shared.observer.set(weak);
    }

    /// Forget the observer.
    pub fn clear_observer(&self) {
        self.shared.observer.clear();
    }

    /// Whether a live observer is registered.
    pub fn has_observer(&self) -> bool {
        self.shared.observer.get().is_some()
    }

    /// Connect to `host:port`.
    ///
    /// Resolution and connection together are bounded by the configured
    /// connect timeout. On success the observer's `on_connect` fires and, in
    /// background mode, the polling loop starts. On failure the state becomes
    /// [`ConnectionState::Failed`]; no retry is attempted.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let epoch = self.shared.begin_connect()?;
        tracing::info!(target: targets::CLIENT, host, port, "Connecting to chat server");

        let limit = self.shared.config.socket.connect_timeout;
        let opened = match timeout(limit, open_stream(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(ChatClientError::ConnectTimeout),
        };
        let opened = opened.and_then(|stream| {
            let peer = stream
                .peer_addr()
                .map_err(|e| ChatClientError::from_connect(&e))?;
            Ok((stream, peer))
        });

        let (stream, peer) = match opened {
            Ok(opened) => opened,
            Err(error) => {
                tracing::warn!(target: targets::CLIENT, host, port, %error, "Connect failed");
                self.shared.fail_connect(epoch);
                return Err(error);
            }
        };

        if let Err(e) = stream.set_nodelay(self.shared.config.socket.no_delay) {
            tracing::warn!(target: targets::CLIENT, error = %e, "Failed to set TCP_NODELAY");
        }

        let session = self.shared.install(epoch, stream, peer)?;
        tracing::info!(target: targets::CLIENT, %peer, session = session.id, "Connected to chat server");

        self.shared.notify_connected(session.id);
        if !self.shared.is_current(session.id) {
            return Err(ChatClientError::Cancelled);
        }

        if self.shared.config.polling == PollingMode::Background {
            tokio::spawn(run_polling_loop(self.shared.clone(), session));
        }
        Ok(())
    }

    /// Close the connection and stop polling.
    ///
    /// Idempotent and callable from any thread. Once this returns, no further
    /// observer notification from the closed connection will be delivered;
    /// an in-flight poll cycle has its result discarded.
    pub fn disconnect(&self) {
        if self.shared.teardown() {
            tracing::info!(target: targets::CLIENT, "Disconnected from chat server");
        }
        // Wait out a notification that was already being delivered.
        drop(self.shared.dispatch.lock());
    }

    /// Write the whole buffer, looping on partial writes.
    ///
    /// Fails with [`ChatClientError::NotConnected`] unless connected. A write
    /// error moves the connection to [`ConnectionState::Failed`]; the caller
    /// must still `disconnect` to release the socket.
    pub async fn write(&self, data: &[u8]) -> Result<usize> {
        let session = self
            .shared
            .current_session()
            .ok_or(ChatClientError::NotConnected)?;
        let _writer = session.write_lock.lock().await;
        // An earlier write may have failed, or disconnect may have run, while queued.
        if !self.shared.is_current(session.id) {
            return Err(ChatClientError::NotConnected);
        }

        let result = match self.shared.config.socket.write_timeout {
            Some(limit) => match timeout(limit, write_all(&session, data)).await {
                Ok(result) => result,
                Err(_) => Err(ChatClientError::WriteFailure("write timed out".into())),
            },
            None => write_all(&session, data).await,
        };

        match result {
            Ok(()) => {
                self.shared.record_sent(session.id, data.len());
                Ok(data.len())
            }
            Err(error) => {
                if error.is_fatal() {
                    tracing::warn!(target: targets::CLIENT, session = session.id, %error, "Write failed");
                    self.shared.mark_failed(session.id);
                }
                Err(error)
            }
        }
    }

    /// Run one poll cycle.
    ///
    /// Waits at most the configured read timeout. Received bytes are
    /// delivered to the observer before being returned. Peer close and read
    /// errors are pushed to the observer's fault path as well as returned.
    pub async fn poll(&self) -> Result<PollOutcome> {
        let session = self
            .shared
            .current_session()
            .ok_or(ChatClientError::NotConnected)?;
        self.shared.poll_session(&session).await
    }

    /// Stop scheduling poll cycles. A cycle already running completes.
    pub fn suspend(&self) {
        let changed = self.shared.polling.send_if_modified(|state| {
            if *state == PollingState::Suspended {
                false
            } else {
                *state = PollingState::Suspended;
                true
            }
        });
        if changed {
            tracing::debug!(target: targets::POLL, "Polling suspended");
        }
    }

    /// Resume polling from the next scheduling tick.
    pub fn resume(&self) {
        let changed = self.shared.polling.send_if_modified(|state| {
            if *state == PollingState::Active {
                false
            } else {
                *state = PollingState::Active;
                true
            }
        });
        if changed {
            tracing::debug!(target: targets::POLL, "Polling resumed");
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().connection
    }

    /// Get the current polling state.
    pub fn polling_state(&self) -> PollingState {
        self.shared.polling_state()
    }

    /// Check if the client is connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Check if polling is suspended.
    pub fn is_suspended(&self) -> bool {
        self.polling_state() == PollingState::Suspended
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared
            .inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.peer)
    }

    /// Snapshot of the connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.shared.inner.lock().stats.clone()
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &ChatClientConfig {
        &self.shared.config
    }
}

impl Default for ChatSocketClient {
    fn default() -> Self {
        Self::new(ChatClientConfig::default())
    }
}

impl Drop for ChatSocketClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for ChatSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSocketClient")
            .field("state", &self.state())
            .field("polling", &self.polling_state())
            .field("peer", &self.peer_addr())
            .finish()
    }
}
