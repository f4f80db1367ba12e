//! # smartcode-stream: live test results over server push
//!
//! Consumes the test runner's `text/event-stream` channel and keeps an
//! ordered, append-only log of results for display.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   text/event-stream   ┌─────────────────────┐
//! │ Test runner  │ ────────────────────► │ EventStreamConsumer │
//! │ (server)     │   event: test-update  │ (one task / handle) │
//! └──────────────┘                       └──────────┬──────────┘
//!                                                   │ TestEvent (in order)
//!                                                   ▼
//!                                        ┌─────────────────────┐
//!                                        │ LogView             │
//!                                        │  LogStore.append    │
//!                                        │  PostAppendHook(s)  │
//!                                        └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sse`]: incremental event-stream frame decoder
//! - [`protocol`]: `TestEvent` payload validation
//! - [`client`]: connection lifecycle and serial dispatch
//! - [`store`]: append-only result log
//! - [`hook`]: post-append effects (deferred auto-scroll)
//! - [`view`]: log + connection owner

pub mod client;
pub mod hook;
pub mod protocol;
pub mod sse;
pub mod store;
pub mod view;

pub use client::{
    ConnectionState, EventStreamConsumer, StreamConfig, StreamError, StreamHandle, StreamStats,
    DEFAULT_BACKLOG_LIMIT,
};
pub use hook::{DeferredHook, PostAppendHook, ScrollToLatest, DEFAULT_SCROLL_DELAY};
pub use protocol::{FrameError, TestEvent, TestStatus, TEST_UPDATE_EVENT};
pub use sse::{SseDecoder, SseFrame};
pub use store::{LogStore, LogSummary};
pub use view::LogView;
