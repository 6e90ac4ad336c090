//! In-process event dispatch for base-translation edits.
//!
//! Publishing is a one-way send into an unbounded channel: it never awaits,
//! never blocks and never returns an error to the editorial write path. The
//! `PropagationWorker` owns the receiving end and runs each event through
//! the propagation handler of its content type.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::metrics::SyncMetrics;
use crate::propagation::{handle_base_translation_updated, PropagationOutcome};
use crate::registry::ContentTypeRegistry;
use crate::translation::{Actor, ContentId, LanguageId, TextFields};

/// Published when the base-language translation of a content item is edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseTranslationUpdated {
    pub content_type: String,
    pub content_id: ContentId,
    pub language_id: LanguageId,
    pub fields: TextFields,
    pub actor: Actor,
}

/// Receiving half of a dispatcher channel
pub struct EventReceiver {
    inner: mpsc::UnboundedReceiver<BaseTranslationUpdated>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<BaseTranslationUpdated> {
        self.inner.recv().await
    }
}

/// Publishing handle, cloned into every service that edits translations
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::UnboundedSender<BaseTranslationUpdated>,
    metrics: Arc<SyncMetrics>,
}

impl EventDispatcher {
    pub fn channel(metrics: Arc<SyncMetrics>) -> (Self, EventReceiver) {
        let (sender, inner) = mpsc::unbounded_channel();
        (Self { sender, metrics }, EventReceiver { inner })
    }

    /// A dispatcher with no worker behind it; every publish is counted as dropped
    pub fn closed(metrics: Arc<SyncMetrics>) -> Self {
        Self::channel(metrics).0
    }

    /// Fire-and-forget publish. A stopped worker is logged and counted only.
    pub fn publish(&self, event: BaseTranslationUpdated) {
        match self.sender.send(event) {
            Ok(()) => self.metrics.record_event_published(),
            Err(mpsc::error::SendError(event)) => {
                warn!(
                    content_type = %event.content_type,
                    content_id = event.content_id,
                    "Propagation worker is not running, event dropped"
                );
                self.metrics.record_event_dropped();
            }
        }
    }
}

/// Consumes published events until every dispatcher has been dropped
pub struct PropagationWorker {
    receiver: EventReceiver,
    registry: Arc<ContentTypeRegistry>,
    metrics: Arc<SyncMetrics>,
}

impl PropagationWorker {
    pub fn new(
        receiver: EventReceiver,
        registry: Arc<ContentTypeRegistry>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            receiver,
            registry,
            metrics,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("✓ Propagation worker started");
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(event).await;
        }
        info!("Propagation worker stopped");
    }

    async fn dispatch(&self, event: BaseTranslationUpdated) {
        let Some(adapter) = self.registry.adapter(&event.content_type) else {
            warn!(
                content_type = %event.content_type,
                "Event for unregistered content type dropped"
            );
            self.metrics.record_event_dropped();
            return;
        };

        // Run on its own task so a panicking handler cannot take the worker down
        let handler =
            tokio::spawn(async move { handle_base_translation_updated(adapter.as_ref(), &event).await });

        match handler.await {
            Ok(PropagationOutcome::Applied(tally)) => {
                self.metrics.record_tally(&tally);
                self.metrics.record_event_applied();
            }
            Ok(PropagationOutcome::Dropped(_)) => self.metrics.record_event_dropped(),
            Err(e) => {
                error!("Propagation handler panicked: {}", e);
                self.metrics.record_event_dropped();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ContentTypeAdapter, InMemoryContentType, InMemoryLanguages};
    use crate::i18n::Language;
    use crate::translation::NewTranslation;

    fn title(text: &str) -> TextFields {
        TextFields::new().with("title", text)
    }

    fn event(content_type: &str, text: &str) -> BaseTranslationUpdated {
        BaseTranslationUpdated {
            content_type: content_type.to_string(),
            content_id: 1,
            language_id: 1,
            fields: title(text),
            actor: Actor::new("editor"),
        }
    }

    async fn setup() -> (Arc<ContentTypeRegistry>, InMemoryContentType) {
        let languages = InMemoryLanguages::new("ko");
        languages.upsert(Language::new(1, "ko", "Korean")).unwrap();
        languages.upsert(Language::new(2, "en", "English")).unwrap();
        let popups = InMemoryContentType::new("popup", languages.clone());
        popups.add_item(1).unwrap();
        popups
            .create_translations(
                1,
                &[
                    NewTranslation::pinned(1, title("A")),
                    NewTranslation::synced(2, title("A")),
                ],
                &Actor::system(),
            )
            .await
            .unwrap();

        let mut registry = ContentTypeRegistry::new(Arc::new(languages));
        registry.register(Arc::new(popups.clone()), 60).unwrap();
        (Arc::new(registry), popups)
    }

    // ==================== Dispatcher Tests ====================

    #[tokio::test]
    async fn test_publish_without_worker_does_not_fail() {
        let metrics = Arc::new(SyncMetrics::new());
        let (dispatcher, receiver) = EventDispatcher::channel(metrics.clone());
        drop(receiver);

        dispatcher.publish(event("popup", "B"));

        let report = metrics.report();
        assert_eq!(report.events_published, 0);
        assert_eq!(report.events_dropped, 1);
    }

    #[tokio::test]
    async fn test_closed_dispatcher_counts_drops() {
        let metrics = Arc::new(SyncMetrics::new());
        let dispatcher = EventDispatcher::closed(metrics.clone());

        dispatcher.publish(event("popup", "B"));
        dispatcher.publish(event("popup", "C"));

        assert_eq!(metrics.report().events_dropped, 2);
    }

    // ==================== Worker Tests ====================

    #[tokio::test]
    async fn test_worker_applies_events_and_stops_when_dispatchers_drop() {
        let (registry, popups) = setup().await;
        let metrics = Arc::new(SyncMetrics::new());
        let (dispatcher, receiver) = EventDispatcher::channel(metrics.clone());
        let worker = PropagationWorker::new(receiver, registry, metrics.clone()).spawn();

        dispatcher.publish(event("popup", "B"));
        drop(dispatcher);
        worker.await.expect("worker should exit cleanly");

        assert_eq!(popups.translation(1, 2).unwrap().unwrap().fields, title("B"));
        let report = metrics.report();
        assert_eq!(report.events_published, 1);
        assert_eq!(report.events_applied, 1);
        assert_eq!(report.records_synced, 1);
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_dropped() {
        let (registry, _) = setup().await;
        let metrics = Arc::new(SyncMetrics::new());
        let (dispatcher, receiver) = EventDispatcher::channel(metrics.clone());
        let worker = PropagationWorker::new(receiver, registry, metrics.clone()).spawn();

        dispatcher.publish(event("brochure", "B"));
        drop(dispatcher);
        worker.await.expect("worker should exit cleanly");

        assert_eq!(metrics.report().events_dropped, 1);
    }

    #[tokio::test]
    async fn test_events_processed_in_publish_order() {
        let (registry, popups) = setup().await;
        let metrics = Arc::new(SyncMetrics::new());
        let (dispatcher, receiver) = EventDispatcher::channel(metrics.clone());
        let worker = PropagationWorker::new(receiver, registry, metrics).spawn();

        for text in ["B", "C", "D"] {
            dispatcher.publish(event("popup", text));
        }
        drop(dispatcher);
        worker.await.expect("worker should exit cleanly");

        let english = popups.get_translations(1).await.unwrap().remove(1);
        assert_eq!(english.fields, title("D"));
    }
}
