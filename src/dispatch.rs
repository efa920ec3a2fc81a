//! Dispatcher: builds one normalized event per item and hands it to the listener

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::content::{Classifier, ContentReference, Extras, ExtrasExtractor};
use crate::event::{RECEIVED_FILES, ReceivedFiles, SharedEvent, SourceAppProvider};
use crate::observability::{Diagnostics, Verbosity};
use crate::relay::{PendingSlot, SlotForm};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener is closed")]
    Closed,

    #[error("no listener registered")]
    NoListener,

    #[error("listener failed: {0}")]
    Failed(String),
}

/// Host-side receiver of `receivedFiles` emissions
pub trait EventListener: Send + Sync {
    fn on_received(&self, event: &ReceivedFiles) -> Result<(), ListenerError>;
}

impl EventListener for mpsc::UnboundedSender<ReceivedFiles> {
    fn on_received(&self, event: &ReceivedFiles) -> Result<(), ListenerError> {
        self.send(event.clone()).map_err(|_| ListenerError::Closed)
    }
}

/// Turns references and pending slots into [`ReceivedFiles`] emissions.
///
/// Each call produces exactly one emission and invokes the listener once.
/// Listener failures are counted and logged, never retried.
pub struct Dispatcher {
    classifier: Classifier,
    extractor: ExtrasExtractor,
    sources: Arc<dyn SourceAppProvider>,
    listener: Arc<dyn EventListener>,
    diagnostics: Arc<Diagnostics>,
}

impl Dispatcher {
    pub fn new(
        classifier: Classifier,
        extractor: ExtrasExtractor,
        sources: Arc<dyn SourceAppProvider>,
        listener: Arc<dyn EventListener>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            sources,
            listener,
            diagnostics,
        }
    }

    /// Classify, extract and assemble the event for a reference.
    ///
    /// A URI that does not parse at all cannot be accessed and yields an
    /// error emission instead of data.
    pub async fn build_event(&self, reference: &ContentReference) -> ReceivedFiles {
        if reference.parse_uri().is_none() {
            return ReceivedFiles::Error(format!(
                "content reference is not accessible: {}",
                reference.uri
            ));
        }

        let classified = self.classifier.classify(reference);
        let extras = self.extractor.extract(&classified).await;

        ReceivedFiles::Data(SharedEvent {
            source: self.sources.source_app(),
            action: reference.action,
            uri: Some(reference.uri.clone()),
            scheme: Some(reference.scheme.clone()).filter(|s| !s.is_empty()),
            content_type: classified.mime_essence(),
            extras: Some(extras),
            clip_data: Some(reference.clip_data.clone()).filter(|items| !items.is_empty()),
        })
    }

    pub async fn dispatch_reference(&self, reference: ContentReference) {
        let event = self.build_event(&reference).await;
        self.emit(SlotForm::Url, &reference.uri, event);
    }

    /// Dispatch a drained slot.
    ///
    /// URL-form slots go through classification and extraction; content-form
    /// slots become a minimal event with `uri`, `type` and empty extras.
    pub async fn dispatch_slot(&self, slot: PendingSlot) {
        let label = slot.describe();
        match slot {
            PendingSlot::Url(uri) => {
                self.dispatch_reference(ContentReference::from_uri(&uri)).await;
            }
            PendingSlot::Content {
                content,
                content_type,
            } => {
                let event = ReceivedFiles::Data(SharedEvent {
                    uri: Some(content),
                    content_type: Some(content_type),
                    extras: Some(Extras::new()),
                    ..SharedEvent::default()
                });
                self.emit(SlotForm::Content, &label, event);
            }
        }
    }

    /// `item` names the item in logs: the URI, or a description for inline
    /// content. The content itself is never logged.
    fn emit(&self, form: SlotForm, item: &str, event: ReceivedFiles) {
        if event.is_error() {
            self.diagnostics.error_emitted();
        } else {
            self.diagnostics.event_dispatched();
        }

        match self.listener.on_received(&event) {
            Ok(()) => {
                if self.diagnostics.allows(Verbosity::Debug) {
                    debug!(stream = RECEIVED_FILES, ?form, %item, error = event.is_error(), "Event dispatched");
                }
                if self.diagnostics.allows(Verbosity::Info) {
                    info!(?form, %item, "Shared item delivered");
                }
            }
            Err(e) => {
                self.diagnostics.listener_failed();
                if self.diagnostics.allows(Verbosity::Warn) {
                    warn!(?form, %item, error = %e, "Listener failed to accept event");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FsResourceReader, keys};
    use crate::event::{ClipItem, FixedSourceApp, NoSourceApp, ShareAction, SourceApp};
    use std::fs;
    use tempfile::TempDir;

    struct FailingListener;

    impl EventListener for FailingListener {
        fn on_received(&self, _event: &ReceivedFiles) -> Result<(), ListenerError> {
            Err(ListenerError::Failed("host threw".to_string()))
        }
    }

    fn dispatcher(
        listener: Arc<dyn EventListener>,
        sources: Arc<dyn SourceAppProvider>,
    ) -> (Dispatcher, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new(Verbosity::Debug));
        let dispatcher = Dispatcher::new(
            Classifier::default(),
            ExtrasExtractor::new(Arc::new(FsResourceReader::default())),
            sources,
            listener,
            diagnostics.clone(),
        );
        (dispatcher, diagnostics)
    }

    #[tokio::test]
    async fn test_reference_event_is_complete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todo.txt");
        fs::write(&path, "ship it").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = SourceApp {
            package_name: "com.example.mail".to_string(),
            application_name: "Mail".to_string(),
            application_icon: "mail-icon".to_string(),
        };
        let (dispatcher, diagnostics) = dispatcher(Arc::new(tx), Arc::new(FixedSourceApp(source.clone())));

        let reference = ContentReference::from_uri(path.to_str().unwrap());
        dispatcher.dispatch_reference(reference.clone()).await;

        let received = rx.recv().await.unwrap();
        let event = received.data().unwrap();
        assert_eq!(event.source.as_ref(), Some(&source));
        assert_eq!(event.uri.as_deref(), Some(reference.uri.as_str()));
        assert_eq!(event.scheme.as_deref(), Some("file"));
        assert_eq!(event.content_type.as_deref(), Some("text/plain"));

        let extras = event.extras.as_ref().unwrap();
        assert_eq!(extras.text(keys::TITLE), Some("todo.txt"));
        assert_eq!(extras.text(keys::TEXT), Some("ship it"));

        assert!(rx.try_recv().is_err());
        assert_eq!(diagnostics.snapshot().events_dispatched, 1);
    }

    #[tokio::test]
    async fn test_unreadable_reference_still_dispatched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vanished.txt");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, _) = dispatcher(Arc::new(tx), Arc::new(NoSourceApp));

        dispatcher
            .dispatch_reference(ContentReference::from_uri(path.to_str().unwrap()))
            .await;

        let received = rx.recv().await.unwrap();
        let extras = received.data().unwrap().extras.clone().unwrap();
        assert_eq!(extras.text(keys::TITLE), Some("vanished.txt"));
        assert!(!extras.contains(keys::TEXT));
    }

    #[tokio::test]
    async fn test_content_slot_is_minimal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, _) = dispatcher(Arc::new(tx), Arc::new(NoSourceApp));

        dispatcher
            .dispatch_slot(PendingSlot::content("hello there", "text/plain"))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            ReceivedFiles::Data(SharedEvent {
                uri: Some("hello there".to_string()),
                content_type: Some("text/plain".to_string()),
                extras: Some(Extras::new()),
                ..SharedEvent::default()
            })
        );
    }

    #[tokio::test]
    async fn test_action_and_clip_data_carried_over() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, _) = dispatcher(Arc::new(tx), Arc::new(NoSourceApp));

        let clip = ClipItem {
            text: Some("see this".to_string()),
            ..ClipItem::default()
        };
        let reference = ContentReference::from_uri("https://example.com/page")
            .with_action(ShareAction::Send)
            .with_clip_data(vec![clip.clone()]);
        dispatcher.dispatch_reference(reference).await;

        let received = rx.recv().await.unwrap();
        let event = received.data().unwrap();
        assert_eq!(event.action, Some(ShareAction::Send));
        assert_eq!(event.clip_data, Some(vec![clip]));

        dispatcher
            .dispatch_reference(ContentReference::from_uri("https://example.com/plain"))
            .await;
        let received = rx.recv().await.unwrap();
        let event = received.data().unwrap();
        assert!(event.action.is_none());
        assert!(event.clip_data.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_reference_emits_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dispatcher, diagnostics) = dispatcher(Arc::new(tx), Arc::new(NoSourceApp));

        dispatcher
            .dispatch_reference(ContentReference::new("not a uri", "", ""))
            .await;

        let received = rx.recv().await.unwrap();
        assert!(received.is_error());
        assert_eq!(diagnostics.snapshot().errors_emitted, 1);
    }

    #[tokio::test]
    async fn test_listener_failure_is_not_retried() {
        let (dispatcher, diagnostics) = dispatcher(Arc::new(FailingListener), Arc::new(NoSourceApp));

        dispatcher
            .dispatch_slot(PendingSlot::url("https://example.com/page"))
            .await;

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.events_dispatched, 1);
        assert_eq!(snapshot.listener_failures, 1);
    }
}
