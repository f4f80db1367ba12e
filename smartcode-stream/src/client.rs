//! Server-push (SSE) consumer for live test results.
//!
//! Provides:
//! - Connection lifecycle (`Connecting → Open → Closed | Errored`)
//! - Frame decoding, classification and validation
//! - Serial, in-order callback dispatch on one task per connection
//! - Idempotent close that never interrupts a running callback
//!
//! There is no automatic reconnection. A terminal handle stays terminal;
//! the caller opens a new one to retry.

use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::protocol::{self, Inbound, TestEvent, TEST_UPDATE_EVENT};
use crate::sse::{SseDecoder, SseFrame};

/// Consumer configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Push-channel URL
    pub endpoint: String,
    /// SSE event name carrying test results
    pub event_name: String,
    /// Bound on establishing the TCP/TLS connection (None = no bound).
    /// The open stream itself is never timed out.
    pub connect_timeout: Option<Duration>,
    /// Events held for a handle nobody subscribed to yet. Further events
    /// are dropped and counted in [`StreamStats::backlog_overflow`].
    pub backlog_limit: usize,
}

/// Default for [`StreamConfig::backlog_limit`].
pub const DEFAULT_BACKLOG_LIMIT: usize = 1024;

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/events".to_string(),
            event_name: TEST_UPDATE_EVENT.to_string(),
            connect_timeout: None,
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
        }
    }
}

impl StreamConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "disconnected",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server answered with status {0}")]
    Status(u16),
    #[error("Unexpected content type '{0}'")]
    ContentType(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Stream ended without close")]
    ConnectionLost,
    #[error("No tokio runtime to drive the stream")]
    Runtime,
}

/// Per-handle frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_received: u64,
    pub events_delivered: u64,
    /// Frames for the watched event name that failed validation.
    pub frames_dropped: u64,
    /// Frames for other event names.
    pub frames_ignored: u64,
    /// Valid events dropped because the pre-subscription backlog was full.
    pub backlog_overflow: u64,
}

#[derive(Default)]
struct Counters {
    frames_received: AtomicU64,
    events_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    frames_ignored: AtomicU64,
    backlog_overflow: AtomicU64,
}

type EventCallback = Box<dyn FnMut(&TestEvent) + Send>;

/// Subscribers plus the events decoded before anyone subscribed.
#[derive(Default)]
struct Dispatcher {
    subscribers: Vec<EventCallback>,
    backlog: VecDeque<TestEvent>,
}

/// State shared between a handle and its pump task.
struct Shared {
    id: Uuid,
    event_name: String,
    backlog_limit: usize,
    closed: AtomicBool,
    close_signal: Notify,
    state: watch::Sender<ConnectionState>,
    dispatcher: Mutex<Dispatcher>,
    counters: Counters,
    last_error: Mutex<Option<String>>,
    retry_hint: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn new(config: &StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            id: Uuid::new_v4(),
            event_name: config.event_name.clone(),
            backlog_limit: config.backlog_limit,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            state,
            dispatcher: Mutex::new(Dispatcher::default()),
            counters: Counters::default(),
            last_error: Mutex::new(None),
            retry_hint: Mutex::new(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Move to `next` unless already terminal. Returns whether it moved.
    fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    /// Move to `Errored` unless closed or already terminal.
    ///
    /// The closed flag is read inside the state update so a concurrent
    /// `close()` either lands first (and wins) or finds `Errored` already
    /// published.
    fn fail(&self, error: StreamError) {
        let failed = self.state.send_if_modified(|current| {
            if self.is_closed() || current.is_terminal() {
                return false;
            }
            *lock(&self.last_error) = Some(error.to_string());
            *current = ConnectionState::Errored;
            true
        });
        if failed {
            log::warn!("Stream {}: {error}", self.id);
        }
    }

    fn handle_frame(&self, frame: SseFrame) {
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);
        match protocol::classify(&frame, &self.event_name) {
            Inbound::Event(event) => self.dispatch(event),
            Inbound::Ignored => {
                self.counters.frames_ignored.fetch_add(1, Ordering::Relaxed);
                log::trace!("Stream {}: ignoring '{}' frame", self.id, frame.event);
            }
            Inbound::Malformed(e) => {
                self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Stream {}: dropped malformed frame: {e}", self.id);
            }
        }
    }

    fn dispatch(&self, event: TestEvent) {
        let mut dispatcher = lock(&self.dispatcher);
        // Re-checked under the lock: close() may have landed while the
        // previous callback ran.
        if self.is_closed() {
            return;
        }
        if dispatcher.subscribers.is_empty() {
            if dispatcher.backlog.len() >= self.backlog_limit {
                self.counters.backlog_overflow.fetch_add(1, Ordering::Relaxed);
                log::debug!("Stream {}: backlog full, dropping event", self.id);
            } else {
                dispatcher.backlog.push_back(event);
            }
            return;
        }
        for callback in dispatcher.subscribers.iter_mut() {
            callback(&event);
        }
        self.counters.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Decode and dispatch until the source ends, fails, or close is requested.
    async fn pump<S, B, E>(&self, stream: S)
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        if self.transition(ConnectionState::Open) {
            log::info!("Stream {}: open", self.id);
        }

        let mut stream = std::pin::pin!(stream);
        let mut decoder = SseDecoder::new();

        while !self.is_closed() {
            let next = tokio::select! {
                biased;
                _ = self.close_signal.notified() => break,
                item = stream.next() => item,
            };

            match next {
                Some(Ok(chunk)) => {
                    for frame in decoder.feed(chunk.as_ref()) {
                        if self.is_closed() {
                            break;
                        }
                        self.handle_frame(frame);
                    }
                    if let Some(retry) = decoder.retry() {
                        *lock(&self.retry_hint) = Some(retry);
                    }
                }
                Some(Err(e)) => {
                    self.fail(StreamError::Transport(e.to_string()));
                    break;
                }
                None => {
                    self.fail(StreamError::ConnectionLost);
                    break;
                }
            }
        }
    }

    async fn run_http(self: Arc<Self>, client: reqwest::Client, endpoint: String) {
        let request = client
            .get(&endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");

        let response = tokio::select! {
            biased;
            _ = self.close_signal.notified() => return,
            response = request.send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => return self.fail(StreamError::Request(e)),
        };
        if !response.status().is_success() {
            return self.fail(StreamError::Status(response.status().as_u16()));
        }
        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with("text/event-stream") {
                return self.fail(StreamError::ContentType(content_type.to_string()));
            }
        }

        log::debug!("Stream {}: connected to {endpoint}", self.id);
        self.pump(response.bytes_stream()).await;
    }
}

// ---------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------

/// Opens push-channel connections.
pub struct EventStreamConsumer {
    config: StreamConfig,
    client: reqwest::Client,
}

impl EventStreamConsumer {
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            config,
            client: builder.build()?,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start connecting. Failures show up as [`ConnectionState::Errored`]
    /// on the returned handle, never as an error here.
    pub fn connect(&self) -> StreamHandle {
        let shared = Arc::new(Shared::new(&self.config));
        log::info!("Stream {}: connecting to {}", shared.id, self.config.endpoint);

        let task = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(
                shared
                    .clone()
                    .run_http(self.client.clone(), self.config.endpoint.clone()),
            )),
            Err(_) => {
                shared.fail(StreamError::Runtime);
                None
            }
        };

        StreamHandle { shared, task }
    }
}

// ---------------------------------------------------------------
// Handle
// ---------------------------------------------------------------

/// Control surface for one connection. Dropping it closes the connection.
pub struct StreamHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Drive the consumer over an arbitrary byte stream instead of HTTP.
    /// The source ending counts as transport loss.
    pub fn from_byte_stream<S, B, E>(config: &StreamConfig, stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let shared = Arc::new(Shared::new(config));
        let task = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let pump_shared = shared.clone();
                Some(runtime.spawn(async move { pump_shared.pump(stream).await }))
            }
            Err(_) => {
                shared.fail(StreamError::Runtime);
                None
            }
        };
        Self { shared, task }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Register a callback for every valid event, in arrival order.
    ///
    /// Events decoded before the first registration are replayed into the
    /// first callback, on the calling thread, before this returns. Later
    /// events run on the consumer task. Either way callbacks run one at a
    /// time and must not register further callbacks.
    pub fn on_event<F>(&self, callback: F)
    where
        F: FnMut(&TestEvent) + Send + 'static,
    {
        let mut dispatcher = lock(&self.shared.dispatcher);
        dispatcher.subscribers.push(Box::new(callback));
        if dispatcher.subscribers.len() != 1 || self.shared.is_closed() {
            return;
        }

        let Dispatcher { subscribers, backlog } = &mut *dispatcher;
        if let Some(first) = subscribers.first_mut() {
            while let Some(event) = backlog.pop_front() {
                if self.shared.is_closed() {
                    backlog.clear();
                    break;
                }
                first(&event);
                self.shared.counters.events_delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Request close. Idempotent; a callback already running completes,
    /// nothing is dispatched afterwards.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.close_signal.notify_one();
        if self.shared.transition(ConnectionState::Closed) {
            log::info!("Stream {}: closed", self.shared.id);
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Resolve once the handle reaches `Closed` or `Errored`.
    pub async fn wait_terminal(&self) -> ConnectionState {
        let mut rx = self.shared.state.subscribe();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    /// Wait for the pump task to exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Stream {}: pump task failed: {e}", self.shared.id);
            }
        }
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.last_error).clone()
    }

    /// Reconnection delay suggested by the server, recorded only.
    pub fn retry_hint(&self) -> Option<Duration> {
        *lock(&self.shared.retry_hint)
    }

    pub fn stats(&self) -> StreamStats {
        let c = &self.shared.counters;
        StreamStats {
            frames_received: c.frames_received.load(Ordering::Relaxed),
            events_delivered: c.events_delivered.load(Ordering::Relaxed),
            frames_dropped: c.frames_dropped.load(Ordering::Relaxed),
            frames_ignored: c.frames_ignored.load(Ordering::Relaxed),
            backlog_overflow: c.backlog_overflow.load(Ordering::Relaxed),
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}
