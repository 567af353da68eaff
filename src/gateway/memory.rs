//! In-process gateway backed by plain collections.
//!
//! Behaves like the annotation server (ids assigned on create, unknown ids
//! reported as not found) and supports failure injection per operation.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use super::{GatewayError, PersistenceGateway};
use crate::model::{FeatureId, FeatureKind, FolderName, Line, LineDraft, Marker, MarkerDraft};

/// Gateway operations, used for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOp {
    ListFolders,
    ImageUrl,
    ListMarkers,
    ListLines,
    GetMarker,
    GetLine,
    CreateMarker,
    CreateLine,
    UpdateMarker,
    UpdateLine,
    DeleteFeature,
    ListIconTemplates,
    FetchIconTemplate,
}

#[derive(Debug, Default)]
struct FolderData {
    image_url: String,
    markers: Vec<Marker>,
    lines: Vec<Line>,
}

#[derive(Debug, Default)]
struct Backend {
    folders: BTreeMap<FolderName, FolderData>,
    icons: BTreeMap<String, String>,
    queued_ids: VecDeque<String>,
    failures: Vec<GatewayOp>,
    calls: Vec<GatewayOp>,
}

impl Backend {
    /// Record a call and consume an injected failure for it, if any.
    fn enter(&mut self, op: GatewayOp) -> Result<(), GatewayError> {
        self.calls.push(op);
        if let Some(pos) = self.failures.iter().position(|f| *f == op) {
            self.failures.remove(pos);
            return Err(GatewayError::Network(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }

    fn next_id(&mut self) -> FeatureId {
        let id = self
            .queued_ids
            .pop_front()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        FeatureId::new(id)
    }

    fn folder_mut(&mut self, folder: &FolderName) -> &mut FolderData {
        self.folders.entry(folder.clone()).or_default()
    }
}

/// Gateway that keeps all folders in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    backend: RefCell<Backend>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder with its base image URL.
    pub fn with_folder(self, folder: &FolderName, image_url: impl Into<String>) -> Self {
        self.backend.borrow_mut().folder_mut(folder).image_url = image_url.into();
        self
    }

    /// Register an icon template.
    pub fn with_icon(self, name: impl Into<String>, svg: impl Into<String>) -> Self {
        self.backend
            .borrow_mut()
            .icons
            .insert(name.into(), svg.into());
        self
    }

    /// Store a marker directly, bypassing the create call.
    pub fn seed_marker(&self, folder: &FolderName, marker: Marker) {
        self.backend.borrow_mut().folder_mut(folder).markers.push(marker);
    }

    /// Store a line directly, bypassing the create call.
    pub fn seed_line(&self, folder: &FolderName, line: Line) {
        self.backend.borrow_mut().folder_mut(folder).lines.push(line);
    }

    /// Use `id` for the next created feature instead of a random UUID.
    pub fn queue_id(&self, id: impl Into<String>) {
        self.backend.borrow_mut().queued_ids.push_back(id.into());
    }

    /// Make the next call of `op` fail with a network error.
    pub fn fail_next(&self, op: GatewayOp) {
        self.backend.borrow_mut().failures.push(op);
    }

    /// Delete a feature as if another client had removed it.
    pub fn forget(&self, folder: &FolderName, id: &FeatureId) {
        let mut backend = self.backend.borrow_mut();
        let data = backend.folder_mut(folder);
        data.markers.retain(|m| &m.id != id);
        data.lines.retain(|l| &l.id != id);
    }

    /// Ids stored for a folder, markers first.
    pub fn stored_ids(&self, folder: &FolderName) -> Vec<FeatureId> {
        let backend = self.backend.borrow();
        backend
            .folders
            .get(folder)
            .map(|data| {
                data.markers
                    .iter()
                    .map(|m| m.id.clone())
                    .chain(data.lines.iter().map(|l| l.id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stored_marker(&self, folder: &FolderName, id: &FeatureId) -> Option<Marker> {
        let backend = self.backend.borrow();
        backend
            .folders
            .get(folder)?
            .markers
            .iter()
            .find(|m| &m.id == id)
            .cloned()
    }

    pub fn stored_line(&self, folder: &FolderName, id: &FeatureId) -> Option<Line> {
        let backend = self.backend.borrow();
        backend
            .folders
            .get(folder)?
            .lines
            .iter()
            .find(|l| &l.id == id)
            .cloned()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<GatewayOp> {
        self.backend.borrow().calls.clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.backend.borrow().calls.iter().filter(|c| **c == op).count()
    }
}

impl PersistenceGateway for MemoryGateway {
    async fn list_folders(&self) -> Result<Vec<String>, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::ListFolders)?;
        Ok(backend.folders.keys().map(|f| f.to_string()).collect())
    }

    async fn image_url(&self, folder: &FolderName) -> Result<String, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::ImageUrl)?;
        backend
            .folders
            .get(folder)
            .map(|data| data.image_url.clone())
            .ok_or_else(|| GatewayError::NotFound(folder.to_string()))
    }

    async fn list_markers(&self, folder: &FolderName) -> Result<Vec<Marker>, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::ListMarkers)?;
        Ok(backend
            .folders
            .get(folder)
            .map(|data| data.markers.clone())
            .unwrap_or_default())
    }

    async fn list_lines(&self, folder: &FolderName) -> Result<Vec<Line>, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::ListLines)?;
        Ok(backend
            .folders
            .get(folder)
            .map(|data| data.lines.clone())
            .unwrap_or_default())
    }

    async fn get_marker(
        &self,
        folder: &FolderName,
        id: &FeatureId,
    ) -> Result<Marker, GatewayError> {
        self.backend.borrow_mut().enter(GatewayOp::GetMarker)?;
        self.stored_marker(folder, id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn get_line(&self, folder: &FolderName, id: &FeatureId) -> Result<Line, GatewayError> {
        self.backend.borrow_mut().enter(GatewayOp::GetLine)?;
        self.stored_line(folder, id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn create_marker(
        &self,
        folder: &FolderName,
        draft: &MarkerDraft,
    ) -> Result<FeatureId, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::CreateMarker)?;
        let id = backend.next_id();
        let marker = draft.clone().into_marker(id.clone());
        backend.folder_mut(folder).markers.push(marker);
        Ok(id)
    }

    async fn create_line(
        &self,
        folder: &FolderName,
        draft: &LineDraft,
    ) -> Result<FeatureId, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::CreateLine)?;
        let id = backend.next_id();
        let line = draft.clone().into_line(id.clone());
        backend.folder_mut(folder).lines.push(line);
        Ok(id)
    }

    async fn update_marker(&self, folder: &FolderName, marker: &Marker) -> Result<(), GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::UpdateMarker)?;
        let stored = backend
            .folder_mut(folder)
            .markers
            .iter_mut()
            .find(|m| m.id == marker.id)
            .ok_or_else(|| GatewayError::NotFound(marker.id.to_string()))?;
        stored.info = marker.info.clone();
        stored.notes = marker.notes.clone();
        stored.icon_color = marker.icon_color;
        stored.icon_type = marker.icon_type.clone();
        Ok(())
    }

    async fn update_line(&self, folder: &FolderName, line: &Line) -> Result<(), GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::UpdateLine)?;
        let stored = backend
            .folder_mut(folder)
            .lines
            .iter_mut()
            .find(|l| l.id == line.id)
            .ok_or_else(|| GatewayError::NotFound(line.id.to_string()))?;
        stored.info = line.info.clone();
        stored.notes = line.notes.clone();
        stored.color = line.color;
        Ok(())
    }

    async fn delete_feature(
        &self,
        folder: &FolderName,
        kind: FeatureKind,
        id: &FeatureId,
    ) -> Result<(), GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::DeleteFeature)?;
        let data = backend.folder_mut(folder);
        let before = data.markers.len() + data.lines.len();
        match kind {
            FeatureKind::Marker => data.markers.retain(|m| &m.id != id),
            FeatureKind::Line => data.lines.retain(|l| &l.id != id),
        }
        if data.markers.len() + data.lines.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_icon_templates(&self) -> Result<Vec<String>, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::ListIconTemplates)?;
        Ok(backend.icons.keys().cloned().collect())
    }

    async fn fetch_icon_template(&self, name: &str) -> Result<String, GatewayError> {
        let mut backend = self.backend.borrow_mut();
        backend.enter(GatewayOp::FetchIconTemplate)?;
        backend
            .icons
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))
    }
}
