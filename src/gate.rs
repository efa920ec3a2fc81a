//! Readiness gate: buffer until the host registers a handler, then flush in order

use std::sync::Arc;
use tracing::debug;

use crate::content::ContentReference;
use crate::dispatch::Dispatcher;
use crate::observability::{Diagnostics, Verbosity};
use crate::relay::{PendingRelay, PendingSlot, Result};

/// Whether the host application has registered its receiving handler.
///
/// Only ever moves `NotReady -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerState {
    #[default]
    NotReady,
    Ready,
}

/// Outcome of [`ReadinessGate::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Persisted in the relay until the handler is registered
    Buffered,
    /// Handed to the dispatcher immediately
    Dispatched,
}

/// ReadinessGate decides between buffering and dispatching
///
/// Flow:
/// 1. `submit` while `NotReady` queues the reference in process and stores
///    it in the relay as the URL-form slot (the durable copy of the latest)
/// 2. `mark_ready` drains the relay, then dispatches the local queue in
///    submission order followed by the drained slots in drain order
/// 3. `submit` while `Ready` dispatches directly
///
/// A drained URL slot equal to the last locally queued URI is this
/// process's own copy and is not dispatched twice.
///
/// All methods take `&mut self`, so nothing can be submitted while a drain
/// is in progress; buffered content always goes out before newer content.
pub struct ReadinessGate {
    state: HandlerState,
    buffered: Vec<ContentReference>,
    relay: PendingRelay,
    dispatcher: Arc<Dispatcher>,
    diagnostics: Arc<Diagnostics>,
}

impl ReadinessGate {
    pub fn new(relay: PendingRelay, dispatcher: Arc<Dispatcher>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            state: HandlerState::NotReady,
            buffered: Vec::new(),
            relay,
            dispatcher,
            diagnostics,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == HandlerState::Ready
    }

    pub fn relay(&self) -> &PendingRelay {
        &self.relay
    }

    pub async fn submit(&mut self, reference: ContentReference) -> Result<Submission> {
        match self.state {
            HandlerState::NotReady => {
                self.relay.store(&PendingSlot::Url(reference.uri.clone()))?;
                self.diagnostics.slot_buffered();
                if self.diagnostics.allows(Verbosity::Debug) {
                    debug!(uri = %reference.uri, "Handler not registered yet, buffering");
                }
                self.buffered.push(reference);
                Ok(Submission::Buffered)
            }
            HandlerState::Ready => {
                self.dispatcher.dispatch_reference(reference).await;
                Ok(Submission::Dispatched)
            }
        }
    }

    /// Queue references that an earlier owner already stored in the relay.
    ///
    /// They go out ahead of anything submitted to this gate. Once ready,
    /// there is nothing left to wait for and they are dispatched directly.
    pub async fn requeue(&mut self, references: Vec<ContentReference>) {
        match self.state {
            HandlerState::NotReady => {
                let mut queued = references;
                queued.append(&mut self.buffered);
                self.buffered = queued;
            }
            HandlerState::Ready => {
                for reference in references {
                    self.dispatcher.dispatch_reference(reference).await;
                }
            }
        }
    }

    /// Transition to `Ready` and flush everything buffered.
    ///
    /// Idempotent: once ready, further calls dispatch nothing and return 0.
    /// If the drain fails the gate stays `NotReady` and nothing was removed
    /// from the relay.
    pub async fn mark_ready(&mut self) -> Result<usize> {
        if self.is_ready() {
            return Ok(0);
        }

        let mut slots = self.relay.drain_pending()?;
        self.state = HandlerState::Ready;

        let buffered = std::mem::take(&mut self.buffered);
        if let Some(last) = buffered.last() {
            slots.retain(|slot| !matches!(slot, PendingSlot::Url(uri) if *uri == last.uri));
        }

        if self.diagnostics.allows(Verbosity::Debug) {
            debug!(
                buffered = buffered.len(),
                drained = slots.len(),
                "Handler registered, flushing buffered content"
            );
        }

        let count = buffered.len();
        for reference in buffered {
            self.dispatcher.dispatch_reference(reference).await;
        }

        Ok(count + self.dispatch_all(slots).await)
    }

    /// Dispatch anything another process stored since the last drain.
    ///
    /// Does nothing while `NotReady`; buffered slots wait for `mark_ready`.
    pub async fn flush_pending(&mut self) -> Result<usize> {
        if !self.is_ready() {
            return Ok(0);
        }

        let slots = self.relay.drain_pending()?;
        Ok(self.dispatch_all(slots).await)
    }

    async fn dispatch_all(&self, slots: Vec<PendingSlot>) -> usize {
        let count = slots.len();
        self.diagnostics.slots_drained(count);

        for slot in slots {
            self.dispatcher.dispatch_slot(slot).await;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Classifier, ExtrasExtractor, FsResourceReader};
    use crate::event::{NoSourceApp, ReceivedFiles};
    use crate::relay::{MemorySuiteStore, RelayKeys};
    use tokio::sync::mpsc;

    fn gate() -> (ReadinessGate, mpsc::UnboundedReceiver<ReceivedFiles>, PendingRelay) {
        let (tx, rx) = mpsc::unbounded_channel();
        let diagnostics = Arc::new(Diagnostics::new(Verbosity::Debug));
        let dispatcher = Arc::new(Dispatcher::new(
            Classifier::default(),
            ExtrasExtractor::new(Arc::new(FsResourceReader::default())),
            Arc::new(NoSourceApp),
            Arc::new(tx),
            diagnostics.clone(),
        ));
        let relay = PendingRelay::new(Arc::new(MemorySuiteStore::new()), RelayKeys::default());
        (ReadinessGate::new(relay.clone(), dispatcher, diagnostics), rx, relay)
    }

    fn uris(rx: &mut mpsc::UnboundedReceiver<ReceivedFiles>) -> Vec<String> {
        let mut uris = Vec::new();
        while let Ok(event) = rx.try_recv() {
            uris.push(event.data().and_then(|e| e.uri.clone()).unwrap_or_default());
        }
        uris
    }

    #[tokio::test]
    async fn test_starts_not_ready_and_buffers() {
        let (mut gate, mut rx, relay) = gate();
        assert_eq!(gate.state(), HandlerState::NotReady);

        let outcome = gate
            .submit(ContentReference::from_uri("https://example.com/a"))
            .await
            .unwrap();
        assert_eq!(outcome, Submission::Buffered);
        assert!(uris(&mut rx).is_empty());

        assert_eq!(
            relay.drain_pending().unwrap(),
            vec![PendingSlot::url("https://example.com/a")]
        );
    }

    #[tokio::test]
    async fn test_mark_ready_flushes_then_dispatches_directly() {
        let (mut gate, mut rx, _) = gate();

        gate.submit(ContentReference::from_uri("https://example.com/r1"))
            .await
            .unwrap();
        assert_eq!(gate.mark_ready().await.unwrap(), 1);
        assert_eq!(gate.state(), HandlerState::Ready);

        let outcome = gate
            .submit(ContentReference::from_uri("https://example.com/r2"))
            .await
            .unwrap();
        assert_eq!(outcome, Submission::Dispatched);

        assert_eq!(
            uris(&mut rx),
            vec!["https://example.com/r1", "https://example.com/r2"]
        );
    }

    #[tokio::test]
    async fn test_buffered_references_keep_submission_order() {
        let (mut gate, mut rx, relay) = gate();

        gate.submit(ContentReference::from_uri("https://example.com/r1"))
            .await
            .unwrap();
        gate.submit(ContentReference::from_uri("https://example.com/r2"))
            .await
            .unwrap();
        assert_eq!(gate.mark_ready().await.unwrap(), 2);

        gate.submit(ContentReference::from_uri("https://example.com/r3"))
            .await
            .unwrap();

        assert_eq!(
            uris(&mut rx),
            vec![
                "https://example.com/r1",
                "https://example.com/r2",
                "https://example.com/r3"
            ]
        );
        assert!(relay.drain_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_slots_follow_local_queue() {
        let (mut gate, mut rx, relay) = gate();

        gate.submit(ContentReference::from_uri("https://example.com/local"))
            .await
            .unwrap();
        relay.store(&PendingSlot::url("https://example.com/extension")).unwrap();
        relay.store(&PendingSlot::content("clip", "text/plain")).unwrap();

        assert_eq!(gate.mark_ready().await.unwrap(), 3);
        assert_eq!(
            uris(&mut rx),
            vec![
                "https://example.com/local",
                "https://example.com/extension",
                "clip"
            ]
        );
    }

    #[tokio::test]
    async fn test_requeued_references_go_first() {
        let (mut gate, mut rx, relay) = gate();
        relay.store(&PendingSlot::url("https://example.com/early")).unwrap();

        gate.submit(ContentReference::from_uri("https://example.com/late"))
            .await
            .unwrap();
        gate.requeue(vec![ContentReference::from_uri("https://example.com/early")])
            .await;

        assert_eq!(gate.mark_ready().await.unwrap(), 2);
        assert_eq!(
            uris(&mut rx),
            vec!["https://example.com/early", "https://example.com/late"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_mark_ready_is_noop() {
        let (mut gate, mut rx, _) = gate();

        gate.submit(ContentReference::from_uri("https://example.com/once"))
            .await
            .unwrap();
        gate.mark_ready().await.unwrap();
        assert_eq!(gate.mark_ready().await.unwrap(), 0);
        assert_eq!(gate.mark_ready().await.unwrap(), 0);

        assert_eq!(uris(&mut rx), vec!["https://example.com/once"]);
    }

    #[tokio::test]
    async fn test_flush_pending_waits_for_ready() {
        let (mut gate, mut rx, relay) = gate();
        relay.store(&PendingSlot::content("note", "text/plain")).unwrap();

        assert_eq!(gate.flush_pending().await.unwrap(), 0);
        assert!(uris(&mut rx).is_empty());

        gate.mark_ready().await.unwrap();
        relay.store(&PendingSlot::url("https://example.com/late")).unwrap();
        assert_eq!(gate.flush_pending().await.unwrap(), 1);

        assert_eq!(uris(&mut rx), vec!["note", "https://example.com/late"]);
    }
}
