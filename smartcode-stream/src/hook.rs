//! Effects that run after every append to the log.
//!
//! Hooks are invoked on the consumer task, once per appended event, in
//! append order. A hook that does visual work should schedule it instead
//! of doing it inline; [`DeferredHook`] does exactly that.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::protocol::TestEvent;

/// Delay before the auto-scroll effect runs.
pub const DEFAULT_SCROLL_DELAY: Duration = Duration::from_millis(150);

pub trait PostAppendHook: Send + Sync {
    fn after_append(&self, event: &TestEvent, index: usize);
}

impl<F> PostAppendHook for F
where
    F: Fn(&TestEvent, usize) + Send + Sync,
{
    fn after_append(&self, event: &TestEvent, index: usize) {
        self(event, index)
    }
}

/// Runs `effect` on the tokio runtime after `delay`, without waiting for
/// it. Outside a runtime the effect runs inline.
pub struct DeferredHook<F> {
    delay: Duration,
    effect: Arc<F>,
}

impl<F> DeferredHook<F>
where
    F: Fn(TestEvent, usize) + Send + Sync + 'static,
{
    pub fn new(delay: Duration, effect: F) -> Self {
        Self {
            delay,
            effect: Arc::new(effect),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<F> PostAppendHook for DeferredHook<F>
where
    F: Fn(TestEvent, usize) + Send + Sync + 'static,
{
    fn after_append(&self, event: &TestEvent, index: usize) {
        let event = event.clone();
        let effect = self.effect.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let delay = self.delay;
                runtime.spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    effect(event, index);
                });
            }
            Err(_) => effect(event, index),
        }
    }
}

/// Publishes the newest log index for a viewport to follow.
///
/// The published index only moves forward, so timers firing out of order
/// never scroll the view back.
pub struct ScrollToLatest {
    inner: DeferredHook<Box<dyn Fn(TestEvent, usize) + Send + Sync>>,
}

impl ScrollToLatest {
    pub fn new(delay: Duration) -> (Self, watch::Receiver<Option<usize>>) {
        let (tx, rx) = watch::channel(None);
        let effect: Box<dyn Fn(TestEvent, usize) + Send + Sync> = Box::new(move |_, index| {
            tx.send_if_modified(|latest| match *latest {
                Some(current) if current >= index => false,
                _ => {
                    *latest = Some(index);
                    true
                }
            });
        });
        (
            Self {
                inner: DeferredHook::new(delay, effect),
            },
            rx,
        )
    }
}

impl Default for ScrollToLatest {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_DELAY).0
    }
}

impl PostAppendHook for ScrollToLatest {
    fn after_append(&self, event: &TestEvent, index: usize) {
        self.inner.after_append(event, index);
    }
}
