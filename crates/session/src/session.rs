use crate::error::{AnnotationKind, Result, SessionError};
use crate::render::{DetailSurface, GraphRenderer, RenderAck};
use chatmap_graph::{
    run_pipeline, FilterCriteria, FocusConfig, FocusController, GraphError, ProjectionConfig,
    Projector, RecordStore, VisibleSet,
};
use chatmap_protocol::{FocusRequest, ViewFrame};
use chatmap_store::{AnnotationService, DatasetSource, NoopRefresh, RefreshTrigger};
use std::sync::Arc;

/// Transient per-cycle view state.
#[derive(Debug, Clone, Default)]
pub struct GraphViewState {
    pub visible: VisibleSet,
    pub focus_record_id: Option<String>,
    pub selected_record_id: Option<String>,
}

/// One interactive session over a loaded chat forest.
///
/// Every trigger (load, filter change, annotation edit) ends in the same
/// filter -> reconcile -> project cycle, after which the renderer gets the frame and the
/// focus controller decides whether to move the camera.
pub struct ChatSession {
    store: RecordStore,
    criteria: FilterCriteria,
    projector: Projector,
    focus: FocusController,
    view: GraphViewState,
    frame: ViewFrame,
    /// Refocus flag of rendered cycles whose post-render hook has not run yet
    pending_hook: Option<bool>,
    source: Arc<dyn DatasetSource>,
    annotations: Arc<dyn AnnotationService>,
    refresh: Arc<dyn RefreshTrigger>,
    renderer: Box<dyn GraphRenderer>,
    detail: Box<dyn DetailSurface>,
}

impl ChatSession {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        annotations: Arc<dyn AnnotationService>,
        renderer: Box<dyn GraphRenderer>,
        detail: Box<dyn DetailSurface>,
    ) -> Self {
        Self {
            store: RecordStore::new(),
            criteria: FilterCriteria::default(),
            projector: Projector::default(),
            focus: FocusController::default(),
            view: GraphViewState::default(),
            frame: ViewFrame::default(),
            pending_hook: None,
            source,
            annotations,
            refresh: Arc::new(NoopRefresh),
            renderer,
            detail,
        }
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: Arc<dyn RefreshTrigger>) -> Self {
        self.refresh = refresh;
        self
    }

    #[must_use]
    pub fn with_projection(mut self, config: ProjectionConfig) -> Self {
        self.projector = Projector::new(config);
        self
    }

    #[must_use]
    pub fn with_focus(mut self, config: FocusConfig) -> Self {
        self.focus = FocusController::new(config);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn view(&self) -> &GraphViewState {
        &self.view
    }

    /// Frame handed to the renderer by the latest cycle.
    pub fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    /// Replace the criteria without running a cycle; the next load or cycle uses them.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// Fetch the dataset and all three annotation documents, then swap in a new store.
    ///
    /// Returns the focus request of the first-draw cycle when the renderer confirmed it.
    /// On failure nothing in the session changes.
    pub async fn load(&mut self) -> Result<Option<FocusRequest>> {
        let source = Arc::clone(&self.source);
        let (dataset, favorites, tags, vocabulary) = tokio::try_join!(
            source.load_dataset(),
            source.load_favorites(),
            source.load_tags(),
            source.load_vocabulary(),
        )
        .map_err(|err| {
            log::warn!("Load failed: {err}");
            SessionError::Load(err)
        })?;

        self.store = RecordStore::load(&dataset, favorites, tags, vocabulary);
        self.focus.reset();
        self.view.focus_record_id = self.store.default_focus_id().map(str::to_string);

        if let Some(selected) = self.view.selected_record_id.clone() {
            match self.store.detail(&selected) {
                Some(detail) => self.detail.show(Some(&detail)),
                None => self.clear_selection(),
            }
        }

        Ok(self.run_cycle(false))
    }

    /// Ask ingestion to rebuild the dataset, then reload everything.
    pub async fn refresh(&mut self) -> Result<Option<FocusRequest>> {
        self.refresh.refresh().await.map_err(|err| {
            log::warn!("Refresh failed: {err}");
            SessionError::Load(err)
        })?;
        self.load().await
    }

    /// New criteria from the host; `refocus` asks for a camera move after the redraw.
    pub fn apply_filters(&mut self, criteria: FilterCriteria, refocus: bool) -> Option<FocusRequest> {
        self.criteria = criteria;
        self.run_cycle(refocus)
    }

    /// Filter, reconcile, project and hand the frame to the renderer.
    pub fn run_cycle(&mut self, refocus: bool) -> Option<FocusRequest> {
        let (visible, frame) = run_pipeline(&self.store, &self.criteria, &self.projector);
        log::debug!("Showing {}", frame.counter);
        self.view.visible = visible;
        self.frame = frame;
        // A refocus still waiting on a deferred render survives later cycles.
        self.pending_hook = Some(self.pending_hook.unwrap_or(false) || refocus);

        match self.renderer.render(&self.frame) {
            RenderAck::Confirmed => self.on_rendered(),
            RenderAck::Deferred => None,
        }
    }

    /// Post-render hook. No-op unless a rendered cycle is waiting for it.
    pub fn on_rendered(&mut self) -> Option<FocusRequest> {
        let refocus = self.pending_hook.take()?;
        let request = self.focus.after_render(
            &self.store,
            &self.view.visible,
            self.view.focus_record_id.as_deref(),
            refocus,
        )?;
        log::debug!("Focusing {}", request.target_id);
        self.view.focus_record_id = Some(request.target_id.clone());
        self.renderer.focus_camera(&request);
        Some(request)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        let detail = self
            .store
            .detail(id)
            .ok_or_else(|| GraphError::UnknownRecord(id.to_string()))?;
        self.view.selected_record_id = Some(detail.id.clone());
        self.detail.show(Some(&detail));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.view.selected_record_id = None;
        self.detail.show(None);
    }

    /// Flip favorite state; returns the new state.
    pub async fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let favorite = self.store.toggle_favorite(id)?;
        log::info!("Chat {id} favorite: {favorite}");

        if let Some(node) = self.projector.node_by_id(&self.store, id) {
            if self.view.visible.contains_id(&self.store, id) {
                self.renderer.update_node(&node);
            }
        }
        self.refresh_selected();

        self.finish_mutation(&[AnnotationKind::Favorites]).await?;
        Ok(favorite)
    }

    /// Assign a tag, adding it to the vocabulary when it is new there.
    pub async fn add_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let added = self.store.add_tag(id, tag)?;
        let mut changed = Vec::with_capacity(2);
        if added {
            changed.push(AnnotationKind::Tags);
        }
        if self.store.add_global_tag(tag)? {
            changed.push(AnnotationKind::Vocabulary);
        }
        self.refresh_selected();

        self.finish_mutation(&changed).await?;
        Ok(added)
    }

    pub async fn remove_tag(&mut self, id: &str, tag: &str) -> Result<bool> {
        let removed = self.store.remove_tag(id, tag)?;
        self.refresh_selected();

        let changed: &[AnnotationKind] = if removed { &[AnnotationKind::Tags] } else { &[] };
        self.finish_mutation(changed).await?;
        Ok(removed)
    }

    pub async fn add_global_tag(&mut self, tag: &str) -> Result<bool> {
        let added = self.store.add_global_tag(tag)?;

        let changed: &[AnnotationKind] = if added { &[AnnotationKind::Vocabulary] } else { &[] };
        self.finish_mutation(changed).await?;
        Ok(added)
    }

    /// Drop a tag everywhere; both the vocabulary and the tag map are saved.
    pub async fn remove_global_tag(&mut self, tag: &str) -> Result<bool> {
        let removed = self.store.remove_global_tag(tag)?;
        self.refresh_selected();

        let changed: &[AnnotationKind] = if removed {
            &[AnnotationKind::Vocabulary, AnnotationKind::Tags]
        } else {
            &[]
        };
        self.finish_mutation(changed).await?;
        Ok(removed)
    }

    fn refresh_selected(&mut self) {
        let Some(selected) = self.view.selected_record_id.as_deref() else {
            return;
        };
        if let Some(detail) = self.store.detail(selected) {
            self.detail.show(Some(&detail));
        }
    }

    /// Persist what changed, then redraw without moving the camera.
    ///
    /// The redraw happens even when a write failed; the first failure is returned.
    async fn finish_mutation(&mut self, changed: &[AnnotationKind]) -> Result<()> {
        let persisted = self.persist(changed).await;
        self.run_cycle(false);
        persisted
    }

    async fn persist(&self, changed: &[AnnotationKind]) -> Result<()> {
        let mut first_failure = None;
        for &kind in changed {
            let overlay = self.store.overlay();
            let result = match kind {
                AnnotationKind::Favorites => {
                    self.annotations.save_favorites(&overlay.favorites_doc()).await
                }
                AnnotationKind::Tags => self.annotations.save_tags(&overlay.tags_doc()).await,
                AnnotationKind::Vocabulary => {
                    self.annotations
                        .save_vocabulary(&overlay.vocabulary_doc())
                        .await
                }
            };
            if let Err(source) = result {
                log::warn!("Failed to save {kind}: {source}");
                first_failure.get_or_insert(SessionError::Persist {
                    collection: kind,
                    source,
                });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
