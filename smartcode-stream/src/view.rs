//! Hosting view for the live test log.
//!
//! Owns the log for its whole lifetime and at most one connection at a
//! time. The connection is closed when a new one is attached, on
//! `detach`, and when the view is dropped.

use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{ConnectionState, StreamHandle};
use crate::hook::PostAppendHook;
use crate::protocol::TestEvent;
use crate::store::{LogStore, LogSummary};

type HookList = Arc<RwLock<Vec<Arc<dyn PostAppendHook>>>>;

#[derive(Default)]
pub struct LogView {
    store: Arc<RwLock<LogStore>>,
    hooks: HookList,
    handle: Option<StreamHandle>,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(self, hook: impl PostAppendHook + 'static) -> Self {
        self.add_hook(hook);
        self
    }

    /// Hooks run in registration order after each append.
    pub fn add_hook(&self, hook: impl PostAppendHook + 'static) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Route `handle`'s events into this view, closing any previous handle.
    pub fn attach(&mut self, handle: StreamHandle) {
        self.detach();

        let store = self.store.clone();
        let hooks = self.hooks.clone();
        handle.on_event(move |event| {
            let index = store
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .append(event.clone());
            let hooks = hooks.read().unwrap_or_else(PoisonError::into_inner);
            for hook in hooks.iter() {
                hook.after_append(event, index);
            }
        });

        log::debug!("LogView: attached stream {}", handle.id());
        self.handle = Some(handle);
    }

    /// Close and release the current connection, if any.
    pub fn detach(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            log::debug!("LogView: detached stream {}", handle.id());
        }
    }

    pub fn handle(&self) -> Option<&StreamHandle> {
        self.handle.as_ref()
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.handle.as_ref().map(StreamHandle::state)
    }

    /// Ordered copy of every event appended so far.
    pub fn snapshot(&self) -> Vec<TestEvent> {
        self.read(|store| store.all().to_vec())
    }

    pub fn len(&self) -> usize {
        self.read(LogStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> LogSummary {
        self.read(LogStore::summary)
    }

    pub fn read<R>(&self, f: impl FnOnce(&LogStore) -> R) -> R {
        f(&self.store.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StreamConfig;
    use futures_util::stream;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    type Chunk = Result<Vec<u8>, std::io::Error>;

    fn source() -> (
        mpsc::UnboundedSender<Chunk>,
        impl futures_util::Stream<Item = Chunk> + Send + 'static,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|c| (c, rx)) });
        (tx, source)
    }

    fn frame(event: &TestEvent) -> Chunk {
        Ok(event.to_frame("test-update").into_bytes())
    }

    #[tokio::test]
    async fn test_scenario_pass_then_fail() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let sink = calls.clone();
        let mut view = LogView::new().with_hook(move |event: &TestEvent, index: usize| {
            sink.lock().unwrap().push((event.test_name.clone(), index));
            let _ = done_tx.send(());
        });

        let (tx, src) = source();
        view.attach(StreamHandle::from_byte_stream(&StreamConfig::default(), src));

        let login = TestEvent::pass("loginTest", "ok");
        let upload = TestEvent::fail("uploadTest", "timeout");
        tx.send(frame(&login)).unwrap();
        tx.send(frame(&upload)).unwrap();
        for _ in 0..2 {
            timeout(Duration::from_secs(2), done_rx.recv()).await.unwrap();
        }

        assert_eq!(view.snapshot(), vec![login, upload]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![("loginTest".to_string(), 0), ("uploadTest".to_string(), 1)]
        );
        assert_eq!(view.summary(), LogSummary { total: 2, passed: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_hook_sees_event_already_appended() {
        let view_store: Arc<Mutex<Option<Arc<RwLock<LogStore>>>>> = Arc::new(Mutex::new(None));
        let (ok_tx, mut ok_rx) = mpsc::unbounded_channel();
        let slot = view_store.clone();
        let mut view = LogView::new().with_hook(move |event: &TestEvent, index: usize| {
            let guard = slot.lock().unwrap();
            let store = guard.as_ref().unwrap().read().unwrap();
            let _ = ok_tx.send(store.get(index) == Some(event) && store.len() == index + 1);
        });
        *view_store.lock().unwrap() = Some(view.store.clone());

        let (tx, src) = source();
        view.attach(StreamHandle::from_byte_stream(&StreamConfig::default(), src));
        tx.send(frame(&TestEvent::pass("a", ""))).unwrap();
        tx.send(frame(&TestEvent::pass("b", ""))).unwrap();

        for _ in 0..2 {
            let ok = timeout(Duration::from_secs(2), ok_rx.recv()).await.unwrap().unwrap();
            assert!(ok);
        }
    }

    #[tokio::test]
    async fn test_attach_replaces_and_closes_previous() {
        let mut view = LogView::new();
        let (_tx1, src1) = source();
        view.attach(StreamHandle::from_byte_stream(&StreamConfig::default(), src1));
        let mut first_state = view.handle().unwrap().subscribe_state();

        let (tx2, src2) = source();
        view.attach(StreamHandle::from_byte_stream(&StreamConfig::default(), src2));
        timeout(Duration::from_secs(2), first_state.wait_for(|s| *s == ConnectionState::Closed))
            .await
            .unwrap()
            .unwrap();

        tx2.send(frame(&TestEvent::pass("second", ""))).unwrap();
        timeout(Duration::from_secs(2), async {
            while view.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(view.snapshot()[0].test_name, "second");
    }

    #[tokio::test]
    async fn test_detach_closes_and_keeps_log() {
        let mut view = LogView::new();
        let (tx, src) = source();
        view.attach(StreamHandle::from_byte_stream(&StreamConfig::default(), src));
        tx.send(frame(&TestEvent::pass("kept", ""))).unwrap();
        timeout(Duration::from_secs(2), async {
            while view.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let mut state = view.handle().unwrap().subscribe_state();
        view.detach();
        assert!(view.handle().is_none());
        assert_eq!(*state.borrow_and_update(), ConnectionState::Closed);

        let _ = tx.send(frame(&TestEvent::pass("late", "")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(view.len(), 1);
    }
}
