//! `SyncEngine`: one handle over the registry, the dispatcher, the
//! propagation worker and the metrics. Every entry point names its content
//! type; unknown types are `NotFound`.

use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::adapter::ContentTypeAdapter;
use crate::backfill::{BackfillSummary, LanguageBackfill};
use crate::creation::{self, CreationReport};
use crate::edit::{self, EditReport};
use crate::error::{SyncError, SyncResult};
use crate::events::{EventDispatcher, PropagationWorker};
use crate::metrics::{MetricsReport, SyncMetrics};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::ContentTypeRegistry;
use crate::translation::{Actor, ContentId, LanguageId, TextFields, TranslationId, TranslationInput};

pub struct SyncEngine {
    registry: Arc<ContentTypeRegistry>,
    metrics: Arc<SyncMetrics>,
    system_actor: Actor,
    dispatcher: Mutex<Option<EventDispatcher>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Build the engine and spawn its propagation worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(registry: ContentTypeRegistry, system_actor: Actor) -> Self {
        let registry = Arc::new(registry);
        let metrics = Arc::new(SyncMetrics::new());
        let (dispatcher, receiver) = EventDispatcher::channel(Arc::clone(&metrics));
        let worker =
            PropagationWorker::new(receiver, Arc::clone(&registry), Arc::clone(&metrics)).spawn();

        info!(
            content_types = ?registry.names(),
            actor = %system_actor,
            "✓ Sync engine started"
        );

        Self {
            registry,
            metrics,
            system_actor,
            dispatcher: Mutex::new(Some(dispatcher)),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn registry(&self) -> &Arc<ContentTypeRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Publishing handle for services that edit translations outside the engine.
    /// After shutdown the returned dispatcher drops every event.
    pub fn dispatcher(&self) -> EventDispatcher {
        self.dispatcher
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| EventDispatcher::closed(Arc::clone(&self.metrics)))
    }

    pub fn adapter(&self, content_type: &str) -> SyncResult<Arc<dyn ContentTypeAdapter>> {
        self.registry
            .adapter(content_type)
            .ok_or_else(|| SyncError::not_found("content type", content_type))
    }

    pub async fn create_translations(
        &self,
        content_type: &str,
        content_id: ContentId,
        inputs: &[TranslationInput],
        actor: &Actor,
    ) -> SyncResult<CreationReport> {
        let adapter = self.adapter(content_type)?;
        creation::create_translations(adapter.as_ref(), content_id, inputs, actor).await
    }

    pub async fn edit_translation(
        &self,
        content_type: &str,
        content_id: ContentId,
        language_id: LanguageId,
        fields: &TextFields,
        actor: &Actor,
    ) -> SyncResult<EditReport> {
        let adapter = self.adapter(content_type)?;
        let dispatcher = self.dispatcher();
        edit::edit_translation(adapter.as_ref(), &dispatcher, content_id, language_id, fields, actor)
            .await
    }

    pub async fn unpin_translation(
        &self,
        content_type: &str,
        content_id: ContentId,
        language_id: LanguageId,
        actor: &Actor,
    ) -> SyncResult<TranslationId> {
        let adapter = self.adapter(content_type)?;
        edit::unpin_translation(adapter.as_ref(), content_id, language_id, actor).await
    }

    pub fn reconciler(&self, content_type: &str) -> SyncResult<Reconciler> {
        Ok(Reconciler::new(
            self.adapter(content_type)?,
            self.system_actor.clone(),
            Arc::clone(&self.metrics),
        ))
    }

    pub async fn reconcile(&self, content_type: &str) -> SyncResult<ReconcileReport> {
        Ok(self.reconciler(content_type)?.execute().await)
    }

    /// Reconcile every registered type concurrently
    pub async fn reconcile_all(&self) -> Vec<ReconcileReport> {
        let runs = self.registry.entries().iter().map(|entry| {
            Reconciler::new(
                Arc::clone(&entry.adapter),
                self.system_actor.clone(),
                Arc::clone(&self.metrics),
            )
            .execute_owned()
        });
        join_all(runs).await
    }

    pub async fn backfill_language(&self, language_code: &str) -> BackfillSummary {
        LanguageBackfill::new(
            Arc::clone(&self.registry),
            self.system_actor.clone(),
            Arc::clone(&self.metrics),
        )
        .run(language_code)
        .await
    }

    /// Stop accepting events and wait for the worker to drain the queue.
    ///
    /// Dispatchers cloned out through `dispatcher()` keep the worker alive
    /// until they are dropped too.
    pub async fn shutdown(&self) {
        if let Ok(mut guard) = self.dispatcher.lock() {
            guard.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Propagation worker ended abnormally: {}", e);
            }
            info!("Sync engine stopped");
        }
    }
}
