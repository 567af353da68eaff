//! Synchronization engine.
//!
//! [`SyncEngine`] owns the feature store and its views and drives every
//! mutation through the persistence gateway. It is single-threaded: async
//! methods take `&self`, hold the state borrow only in synchronous sections
//! and never across a gateway call.
//!
//! Every gateway call captures the active [`FolderContext`]. When the call
//! returns, the context is compared against the current one and the result is
//! discarded with [`SyncError::StaleFolder`] if the folder changed meanwhile.
//!
//! Views are only touched by `EngineState::publish`, which applies a
//! [`StoreChange`] to the canvas and the table in one synchronous pass.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::canvas::CanvasRenderer;
use crate::constants::{DEFAULT_ICON_SIZE, DEFAULT_ID_PREFIX_LEN};
use crate::error::{SyncError, Warning, WarningKind};
use crate::gateway::{GatewayError, PersistenceGateway};
use crate::image_frame::ImageFrame;
use crate::model::{
    Feature, FeatureDraft, FeatureId, FeatureKind, FeaturePatch, FolderContext, FolderName, Point,
};
use crate::placement::{
    ClickOutcome, LineForm, MarkerForm, PlacementMachine, PlacementMode, Snapper,
};
use crate::selection::{EditModal, SelectionSession};
use crate::store::{FeatureStore, StoreChange};
use crate::table::{Column, DeletePrompt, NotesView, SortDirection, SortMode, TableView};

/// When `update` and `remove` touch the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit locally after the gateway acknowledged
    #[default]
    Pessimistic,
    /// Commit locally first, warn on gateway failure without rollback
    Optimistic,
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub snapper: Snapper,
    pub commit_policy: CommitPolicy,
    pub id_prefix_len: usize,
    pub icon_size: u32,
    pub sort_mode: SortMode,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snapper: Snapper::default(),
            commit_policy: CommitPolicy::default(),
            id_prefix_len: DEFAULT_ID_PREFIX_LEN,
            icon_size: DEFAULT_ICON_SIZE,
            sort_mode: SortMode::default(),
        }
    }
}

impl EngineSettings {
    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn with_snapper(mut self, snapper: Snapper) -> Self {
        self.snapper = snapper;
        self
    }

    pub fn with_sort_mode(mut self, mode: SortMode) -> Self {
        self.sort_mode = mode;
        self
    }
}

/// Mutable state behind the engine's `RefCell`.
#[derive(Debug)]
struct EngineState {
    context: Option<FolderContext>,
    last_epoch: u64,
    store: FeatureStore,
    canvas: CanvasRenderer,
    table: TableView,
    placement: PlacementMachine,
    selection: SelectionSession,
    icon_options: Vec<String>,
    pending_delete: Option<DeletePrompt>,
    warnings: Vec<Warning>,
}

impl EngineState {
    fn new(settings: &EngineSettings) -> Self {
        Self {
            context: None,
            last_epoch: 0,
            store: FeatureStore::new(),
            canvas: CanvasRenderer::new(settings.icon_size),
            table: TableView::new(settings.id_prefix_len, settings.sort_mode),
            placement: PlacementMachine::new(settings.snapper),
            selection: SelectionSession::new(),
            icon_options: Vec::new(),
            pending_delete: None,
            warnings: Vec::new(),
        }
    }

    fn current_context(&self) -> Result<FolderContext, SyncError> {
        self.context.clone().ok_or(SyncError::NoActiveFolder)
    }

    /// Fail with `StaleFolder` unless `ctx` is still the active folder.
    fn ensure_current(&self, ctx: &FolderContext) -> Result<(), SyncError> {
        if self.context.as_ref() == Some(ctx) {
            Ok(())
        } else {
            log::debug!(
                "Discarding response for {} (epoch {})",
                ctx.name,
                ctx.epoch
            );
            Err(SyncError::StaleFolder {
                folder: ctx.name.to_string(),
            })
        }
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        log::warn!("{}", message);
        self.warnings.push(Warning::new(kind, message));
    }

    /// Apply a store change to canvas and table.
    fn publish(&mut self, change: StoreChange) {
        match change {
            StoreChange::Reset => {
                self.canvas.clear_all();
                self.table.clear();
                for feature in self.store.iter() {
                    if let Err(e) = self.canvas.show(feature) {
                        log::error!("Cannot render {}: {}", feature.id(), e);
                    }
                    self.table.upsert(feature);
                }
                if let Some(id) = self.selection.selected().cloned() {
                    if !self.store.contains(&id) {
                        self.selection.cancel();
                    }
                }
                if self
                    .pending_delete
                    .as_ref()
                    .is_some_and(|p| !self.store.contains(&p.id))
                {
                    self.pending_delete = None;
                }
                self.sync_highlight();
            }
            StoreChange::Upserted(id) => {
                if let Some(feature) = self.store.get(&id) {
                    if let Err(e) = self.canvas.show(feature) {
                        log::error!("Cannot render {}: {}", id, e);
                    }
                    self.table.upsert(feature);
                }
            }
            StoreChange::Removed(id) => {
                self.canvas.hide(&id);
                self.table.remove(&id);
                if self.selection.clear_if(&id) {
                    self.sync_highlight();
                }
                if self.pending_delete.as_ref().is_some_and(|p| p.id == id) {
                    self.pending_delete = None;
                }
            }
        }
    }

    /// Mirror the selection onto canvas and table highlights.
    fn sync_highlight(&mut self) {
        let selected = self.selection.selected().cloned();
        self.canvas.highlight(selected.as_ref());
        self.table.highlight(selected.as_ref());
    }

    /// Remove an entry the backend no longer has.
    fn drop_stale(&mut self, id: &FeatureId) {
        if let Some((_, change)) = self.store.remove(id) {
            self.publish(change);
        }
        self.warn(
            WarningKind::StaleEntry,
            format!("{} no longer exists on the server and was removed", id),
        );
    }

    fn end_gesture(&mut self) {
        self.placement.cancel();
        self.canvas.set_preview(None);
    }
}

/// Orchestrates store, views, placement and selection over a gateway.
pub struct SyncEngine<G> {
    gateway: G,
    settings: EngineSettings,
    state: RefCell<EngineState>,
}

impl<G: PersistenceGateway> SyncEngine<G> {
    pub fn new(gateway: G, settings: EngineSettings) -> Self {
        let state = RefCell::new(EngineState::new(&settings));
        Self {
            gateway,
            settings,
            state,
        }
    }

    pub fn with_defaults(gateway: G) -> Self {
        Self::new(gateway, EngineSettings::default())
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn store(&self) -> Ref<'_, FeatureStore> {
        Ref::map(self.state.borrow(), |s| &s.store)
    }

    pub fn canvas(&self) -> Ref<'_, CanvasRenderer> {
        Ref::map(self.state.borrow(), |s| &s.canvas)
    }

    pub fn table(&self) -> Ref<'_, TableView> {
        Ref::map(self.state.borrow(), |s| &s.table)
    }

    pub fn placement(&self) -> Ref<'_, PlacementMachine> {
        Ref::map(self.state.borrow(), |s| &s.placement)
    }

    pub fn selection(&self) -> Ref<'_, SelectionSession> {
        Ref::map(self.state.borrow(), |s| &s.selection)
    }

    pub fn active_folder(&self) -> Option<FolderContext> {
        self.state.borrow().context.clone()
    }

    pub fn icon_options(&self) -> Vec<String> {
        self.state.borrow().icon_options.clone()
    }

    /// Drain queued user-visible warnings.
    pub fn take_warnings(&self) -> Vec<Warning> {
        std::mem::take(&mut self.state.borrow_mut().warnings)
    }

    /// Ids present in some but not all of store, canvas and table.
    pub fn consistency_violations(&self) -> Vec<FeatureId> {
        let st = self.state.borrow();
        let store: BTreeSet<&FeatureId> = st.store.ids().collect();
        let canvas: BTreeSet<&FeatureId> = st.canvas.ids().collect();
        let table: BTreeSet<&FeatureId> = st.table.rows().iter().map(|r| &r.id).collect();
        let all: BTreeSet<&FeatureId> = store.iter().chain(&canvas).chain(&table).copied().collect();
        all.into_iter()
            .filter(|id| !(store.contains(id) && canvas.contains(id) && table.contains(id)))
            .cloned()
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        let st = self.state.borrow();
        let table_unique = st
            .table
            .rows()
            .iter()
            .map(|r| &r.id)
            .collect::<BTreeSet<_>>()
            .len()
            == st.table.len();
        drop(st);
        table_unique && self.consistency_violations().is_empty()
    }

    // =========================================================================
    // Folders
    // =========================================================================

    /// Folder names known to the backend. Invalid names are skipped.
    pub async fn list_folders(&self) -> Result<Vec<FolderName>, SyncError> {
        let names = self.gateway.list_folders().await.map_err(|e| {
            let err = SyncError::from(e);
            self.state
                .borrow_mut()
                .warn(WarningKind::Network, format!("Could not list folders: {}", err));
            err
        })?;
        Ok(names
            .iter()
            .filter_map(|name| match FolderName::parse(name) {
                Ok(folder) => Some(folder),
                Err(e) => {
                    log::warn!("Skipping folder {:?}: {}", name, e);
                    None
                }
            })
            .collect())
    }

    /// URL of a folder's base image.
    pub async fn image_url(&self, folder: &FolderName) -> Result<String, SyncError> {
        Ok(self.gateway.image_url(folder).await?)
    }

    /// Make `folder` the active folder and load it.
    ///
    /// All views of the previous folder are cleared in one pass before any
    /// request is issued. If loading fails the new folder stays empty.
    pub async fn switch_folder(&self, folder: FolderName, frame: ImageFrame) -> Result<(), SyncError> {
        {
            let mut st = self.state.borrow_mut();
            st.last_epoch += 1;
            let ctx = FolderContext {
                name: folder,
                epoch: st.last_epoch,
            };
            log::info!("Switching to folder {} (epoch {})", ctx.name, ctx.epoch);
            st.context = Some(ctx.clone());
            st.canvas.set_frame(frame);
            st.end_gesture();
            st.selection.cancel();
            st.pending_delete = None;
            let change = st.store.reset(ctx);
            st.publish(change);
        }
        self.load().await
    }

    /// Reload the active folder, replacing the store's contents.
    ///
    /// Fails closed: on error the previous contents stay untouched.
    pub async fn load(&self) -> Result<(), SyncError> {
        let ctx = self.state.borrow().current_context()?;

        let fetched = match self.gateway.list_markers(&ctx.name).await {
            Ok(markers) => self
                .gateway
                .list_lines(&ctx.name)
                .await
                .map(|lines| (markers, lines)),
            Err(e) => Err(e),
        };
        let (markers, lines) = self.settle(&ctx, fetched, || format!("Could not load folder {}", ctx.name))?;

        self.fetch_templates(markers.iter().map(|m| m.icon_type.as_str()))
            .await;

        let mut st = self.state.borrow_mut();
        st.ensure_current(&ctx)?;
        log::info!(
            "Loaded {} markers and {} lines for {}",
            markers.len(),
            lines.len(),
            ctx.name
        );
        let change = st.store.replace(markers, lines);
        st.publish(change);
        Ok(())
    }

    /// Refresh the icon names offered in the creation and edit forms.
    pub async fn refresh_icon_options(&self) -> Result<Vec<String>, SyncError> {
        match self.gateway.list_icon_templates().await {
            Ok(names) => {
                self.state.borrow_mut().icon_options = names.clone();
                Ok(names)
            }
            Err(e) => {
                let err = SyncError::from(e);
                self.state
                    .borrow_mut()
                    .warn(WarningKind::Network, format!("Could not list icons: {}", err));
                Err(err)
            }
        }
    }

    /// Re-fetch a single feature from the backend.
    pub async fn refresh_feature(&self, id: &FeatureId) -> Result<(), SyncError> {
        let (ctx, kind) = {
            let st = self.state.borrow();
            let ctx = st.current_context()?;
            let kind = st
                .store
                .get(id)
                .map(Feature::kind)
                .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
            (ctx, kind)
        };

        let fetched = match kind {
            FeatureKind::Marker => self.gateway.get_marker(&ctx.name, id).await.map(Feature::from),
            FeatureKind::Line => self.gateway.get_line(&ctx.name, id).await.map(Feature::from),
        };
        let feature = match fetched {
            Err(GatewayError::NotFound(_)) => {
                let mut st = self.state.borrow_mut();
                st.ensure_current(&ctx)?;
                st.drop_stale(id);
                return Err(SyncError::NotFound { id: id.clone() });
            }
            other => self.settle(&ctx, other, || format!("Could not refresh {}", id))?,
        };

        if let Some(icon) = feature.icon_type() {
            self.fetch_templates([icon]).await;
        }

        let mut st = self.state.borrow_mut();
        st.ensure_current(&ctx)?;
        let change = st.store.insert(feature);
        st.publish(change);
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a feature. It enters the store only after the backend assigned
    /// an id.
    pub async fn add(&self, draft: FeatureDraft) -> Result<FeatureId, SyncError> {
        draft.validate()?;
        let ctx = {
            let st = self.state.borrow();
            let ctx = st.current_context()?;
            st.canvas.require_frame()?;
            ctx
        };

        let created = match &draft {
            FeatureDraft::Marker(m) => self.gateway.create_marker(&ctx.name, m).await,
            FeatureDraft::Line(l) => self.gateway.create_line(&ctx.name, l).await,
        };
        let kind = draft.kind();
        let id = self.settle(&ctx, created, || format!("Could not create {}", kind.name()))?;

        if let FeatureDraft::Marker(m) = &draft {
            self.fetch_templates([m.icon_type.as_str()]).await;
        }

        let mut st = self.state.borrow_mut();
        st.ensure_current(&ctx)?;
        let change = st.store.insert(draft.into_feature(id.clone()));
        st.publish(change);
        log::info!("Created {} {}", kind.name(), id);
        Ok(id)
    }

    /// Merge `patch` into a feature and persist it.
    pub async fn update(&self, id: &FeatureId, patch: FeaturePatch) -> Result<(), SyncError> {
        if patch.is_empty() {
            return Ok(());
        }
        let ctx = self.state.borrow().current_context()?;
        let merged = self.state.borrow().store.merged(id, &patch)?;
        if let Some(icon) = &patch.icon_type {
            self.fetch_templates([icon.as_str()]).await;
        }

        let optimistic = self.settings.commit_policy == CommitPolicy::Optimistic;
        if optimistic {
            let mut st = self.state.borrow_mut();
            st.ensure_current(&ctx)?;
            let change = st.store.merge(id, &patch)?;
            st.publish(change);
        }

        let result = match &merged {
            Feature::Marker(m) => self.gateway.update_marker(&ctx.name, m).await,
            Feature::Line(l) => self.gateway.update_line(&ctx.name, l).await,
        };

        let mut st = self.state.borrow_mut();
        st.ensure_current(&ctx)?;
        match result {
            Ok(()) => {
                if !optimistic && st.store.contains(id) {
                    let change = st.store.insert(merged);
                    st.publish(change);
                }
                log::info!("Updated {}", id);
                Ok(())
            }
            Err(GatewayError::NotFound(_)) => {
                st.drop_stale(id);
                Err(SyncError::NotFound { id: id.clone() })
            }
            Err(e) => {
                let err = SyncError::from(e);
                let message = if optimistic {
                    format!("Changes to {} are shown but were not saved: {}", id, err)
                } else {
                    format!("Could not save changes to {}: {}", id, err)
                };
                st.warn(WarningKind::Network, message);
                Err(err)
            }
        }
    }

    /// Delete a feature from the backend and all views.
    ///
    /// A feature the backend no longer has is removed locally as well.
    pub async fn remove(&self, id: &FeatureId) -> Result<(), SyncError> {
        let (ctx, kind) = {
            let st = self.state.borrow();
            let ctx = st.current_context()?;
            let kind = st
                .store
                .get(id)
                .map(Feature::kind)
                .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
            (ctx, kind)
        };

        let optimistic = self.settings.commit_policy == CommitPolicy::Optimistic;
        if optimistic {
            let mut st = self.state.borrow_mut();
            if let Some((_, change)) = st.store.remove(id) {
                st.publish(change);
            }
        }

        let result = self.gateway.delete_feature(&ctx.name, kind, id).await;

        let mut st = self.state.borrow_mut();
        st.ensure_current(&ctx)?;
        let already_gone = matches!(result, Err(GatewayError::NotFound(_)));
        match result {
            Ok(()) | Err(GatewayError::NotFound(_)) => {
                if already_gone {
                    log::warn!("{} was already gone on the server", id);
                }
                if let Some((_, change)) = st.store.remove(id) {
                    st.publish(change);
                }
                log::info!("Deleted {} {}", kind.name(), id);
                Ok(())
            }
            Err(e) => {
                let err = SyncError::from(e);
                let message = if optimistic {
                    format!("{} was removed here but not on the server: {}", id, err)
                } else {
                    format!("Could not delete {}: {}", id, err)
                };
                st.warn(WarningKind::Network, message);
                Err(err)
            }
        }
    }

    /// Ask for confirmation before deleting `id`.
    pub fn request_delete(&self, id: &FeatureId) -> Result<DeletePrompt, SyncError> {
        let mut st = self.state.borrow_mut();
        let prompt = st
            .table
            .delete_prompt(id)
            .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
        st.pending_delete = Some(prompt.clone());
        Ok(prompt)
    }

    /// Delete after the user confirmed the prompt for `id`.
    pub async fn confirm_delete(&self, id: &FeatureId) -> Result<(), SyncError> {
        let confirmed = self
            .state
            .borrow_mut()
            .pending_delete
            .take_if(|p| &p.id == id)
            .is_some();
        if !confirmed {
            return Err(SyncError::validation(format!(
                "No pending delete for {}",
                id
            )));
        }
        self.remove(id).await
    }

    pub fn cancel_delete(&self) -> bool {
        self.state.borrow_mut().pending_delete.take().is_some()
    }

    pub fn pending_delete(&self) -> Option<DeletePrompt> {
        self.state.borrow().pending_delete.clone()
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Feed a click on empty canvas space into the placement machine.
    pub fn click(&self, point: Point) -> Result<ClickOutcome, SyncError> {
        let mut guard = self.state.borrow_mut();
        let st = &mut *guard;
        st.current_context()?;
        let frame = st.canvas.require_frame()?;
        if !frame.contains(point) {
            return Err(SyncError::validation(format!(
                "Click at ({}, {}) is outside the {}x{} image",
                point.x, point.y, frame.width, frame.height
            )));
        }
        let outcome = st
            .placement
            .click(point, st.store.line_endpoints(), &st.icon_options);
        // A rejected second point still moves the rubber band
        st.canvas.set_preview(st.placement.preview());
        outcome
    }

    /// Track the cursor for the line preview.
    pub fn cursor_moved(&self, point: Point) -> bool {
        let mut st = self.state.borrow_mut();
        let changed = st.placement.cursor_moved(point);
        if changed {
            let preview = st.placement.preview();
            st.canvas.set_preview(preview);
        }
        changed
    }

    /// Submit the open marker form. A rejected form stays open.
    pub async fn submit_marker_form(&self, form: &MarkerForm) -> Result<FeatureId, SyncError> {
        let draft = {
            let mut st = self.state.borrow_mut();
            let draft = st.placement.marker_draft(form)?;
            st.end_gesture();
            draft
        };
        self.add(FeatureDraft::Marker(draft)).await
    }

    /// Submit the open line form and discard the preview.
    pub async fn submit_line_form(&self, form: &LineForm) -> Result<FeatureId, SyncError> {
        let draft = {
            let mut st = self.state.borrow_mut();
            let draft = st.placement.line_draft(form)?;
            st.end_gesture();
            draft
        };
        self.add(FeatureDraft::Line(draft)).await
    }

    /// Dismiss the open form or the line in progress.
    pub fn cancel_placement(&self) -> bool {
        let mut st = self.state.borrow_mut();
        let was_active = !st.placement.state().is_idle();
        st.end_gesture();
        was_active
    }

    pub fn set_mode(&self, mode: PlacementMode) -> bool {
        self.state.borrow_mut().placement.set_mode(mode)
    }

    pub fn toggle_mode(&self) -> bool {
        self.state.borrow_mut().placement.toggle_mode()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a feature and open its edit modal. Unsaved edits of a previous
    /// selection are discarded.
    pub fn select(&self, id: &FeatureId) -> Result<(), SyncError> {
        let mut guard = self.state.borrow_mut();
        let st = &mut *guard;
        let feature = st
            .store
            .get(id)
            .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
        st.selection.select(feature, st.icon_options.clone());
        st.sync_highlight();
        log::debug!("Selected {}", id);
        Ok(())
    }

    /// Select the visible object under `point`, if any.
    pub fn select_at(&self, point: Point) -> Option<FeatureId> {
        let hit = self.state.borrow().canvas.hit_test(point).cloned()?;
        self.select(&hit).ok()?;
        Some(hit)
    }

    /// Edit the open modal's fields.
    pub fn edit_modal<R>(&self, edit: impl FnOnce(&mut EditModal) -> R) -> Option<R> {
        self.state.borrow_mut().selection.modal_mut().map(edit)
    }

    /// Close the modal and persist the changed fields.
    pub async fn submit_edit(&self) -> Result<(), SyncError> {
        let (id, patch) = {
            let mut st = self.state.borrow_mut();
            let modal = st
                .selection
                .modal()
                .ok_or_else(|| SyncError::validation("No edit in progress"))?;
            modal.changes().validate_for(modal.kind())?;
            let submitted = st.selection.submit();
            st.sync_highlight();
            submitted.ok_or_else(|| SyncError::validation("No edit in progress"))?
        };
        self.update(&id, patch).await
    }

    /// Close the modal without saving.
    pub fn cancel_edit(&self) -> bool {
        let mut st = self.state.borrow_mut();
        let closed = st.selection.cancel();
        st.sync_highlight();
        closed
    }

    // =========================================================================
    // Table and canvas controls
    // =========================================================================

    pub fn sort_by(&self, column: Column) -> SortDirection {
        self.state.borrow_mut().table.sort_by(column)
    }

    pub fn set_filter(&self, text: &str) {
        self.state.borrow_mut().table.set_filter(text);
    }

    /// Commit an in-place cell edit.
    pub async fn commit_cell(&self, id: &FeatureId, column: Column, text: &str) -> Result<(), SyncError> {
        let patch = self.state.borrow().table.commit_cell(id, column, text)?;
        match patch {
            Some(patch) => self.update(id, patch).await,
            None => Ok(()),
        }
    }

    pub fn expand_notes(&self, id: &FeatureId) -> Option<NotesView> {
        self.state.borrow().table.expand_notes(id)
    }

    pub fn toggle_markers(&self) -> bool {
        self.state.borrow_mut().canvas.toggle_markers()
    }

    pub fn toggle_lines(&self) -> bool {
        self.state.borrow_mut().canvas.toggle_lines()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolve a gateway result issued under `ctx`. Stale results are
    /// discarded; failures are queued as warnings.
    fn settle<T>(
        &self,
        ctx: &FolderContext,
        result: Result<T, GatewayError>,
        describe: impl FnOnce() -> String,
    ) -> Result<T, SyncError> {
        let mut st = self.state.borrow_mut();
        st.ensure_current(ctx)?;
        result.map_err(|e| {
            let err = SyncError::from(e);
            st.warn(WarningKind::Network, format!("{}: {}", describe(), err));
            err
        })
    }

    /// Fetch icon templates that are not cached yet. Failures leave the
    /// template missing, so affected markers get a placeholder.
    async fn fetch_templates<'a>(&self, names: impl IntoIterator<Item = &'a str>) {
        let missing: BTreeSet<String> = {
            let st = self.state.borrow();
            names
                .into_iter()
                .filter(|name| !name.is_empty() && !st.canvas.has_template(name))
                .map(str::to_string)
                .collect()
        };
        for name in missing {
            match self.gateway.fetch_icon_template(&name).await {
                Ok(svg) => self.state.borrow_mut().canvas.cache_template(name, svg),
                Err(e) => log::warn!("Could not fetch icon {}: {}", name, e),
            }
        }
    }
}
