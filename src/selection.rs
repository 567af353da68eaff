//! Selection and the edit modal.
//!
//! At most one feature is selected at a time, and the selection always has an
//! edit modal open. Selecting another feature drops unsaved edits.

use crate::color_utils::Rgb;
use crate::error::SyncError;
use crate::model::{Feature, FeatureId, FeatureKind, FeaturePatch};

/// Edit modal pre-filled with a feature's current values.
#[derive(Debug, Clone, PartialEq)]
pub struct EditModal {
    id: FeatureId,
    kind: FeatureKind,
    /// Icon names offered for markers
    pub icon_options: Vec<String>,
    pub info: String,
    pub notes: String,
    pub color: Rgb,
    /// Markers only
    pub icon_type: Option<String>,
    /// Values at open time, used to compute the patch
    original: Feature,
}

impl EditModal {
    fn open(feature: &Feature, icon_options: Vec<String>) -> Self {
        Self {
            id: feature.id().clone(),
            kind: feature.kind(),
            icon_options: match feature.kind() {
                FeatureKind::Marker => icon_options,
                FeatureKind::Line => Vec::new(),
            },
            info: feature.info().to_string(),
            notes: feature.notes().to_string(),
            color: feature.color(),
            icon_type: feature.icon_type().map(str::to_string),
            original: feature.clone(),
        }
    }

    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Header line, e.g. `Edit Marker abc12345`.
    pub fn title(&self, prefix_len: usize) -> String {
        format!("Edit {} {}", self.kind.name(), self.id.short(prefix_len))
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    /// Pick another icon. Lines have none.
    pub fn set_icon_type(&mut self, icon_type: impl Into<String>) -> Result<(), SyncError> {
        match self.kind {
            FeatureKind::Marker => {
                self.icon_type = Some(icon_type.into());
                Ok(())
            }
            FeatureKind::Line => Err(SyncError::validation("Lines have no icon type")),
        }
    }

    /// Fields that differ from the values the modal was opened with.
    pub fn changes(&self) -> FeaturePatch {
        let mut patch = FeaturePatch::new();
        if self.info != self.original.info() {
            patch.info = Some(self.info.clone());
        }
        if self.notes != self.original.notes() {
            patch.notes = Some(self.notes.clone());
        }
        if self.color != self.original.color() {
            patch.color = Some(self.color);
        }
        if self.icon_type.as_deref() != self.original.icon_type() {
            patch.icon_type = self.icon_type.clone();
        }
        patch
    }
}

/// The single active selection.
#[derive(Debug, Default)]
pub struct SelectionSession {
    modal: Option<EditModal>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a feature and open its modal. Any open modal is discarded
    /// without saving; returns the id it belonged to.
    pub fn select(&mut self, feature: &Feature, icon_options: Vec<String>) -> Option<FeatureId> {
        let previous = self.modal.take().map(|m| m.id);
        if let Some(prev) = &previous {
            log::debug!("Discarding unsaved edit of {}", prev);
        }
        self.modal = Some(EditModal::open(feature, icon_options));
        previous
    }

    pub fn selected(&self) -> Option<&FeatureId> {
        self.modal.as_ref().map(|m| &m.id)
    }

    pub fn modal(&self) -> Option<&EditModal> {
        self.modal.as_ref()
    }

    pub fn modal_mut(&mut self) -> Option<&mut EditModal> {
        self.modal.as_mut()
    }

    /// Close the modal and hand back the edited fields.
    pub fn submit(&mut self) -> Option<(FeatureId, FeaturePatch)> {
        let modal = self.modal.take()?;
        let patch = modal.changes();
        Some((modal.id, patch))
    }

    /// Close the modal without changes. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        self.modal.take().is_some()
    }

    /// Drop the selection if it refers to `id`.
    pub fn clear_if(&mut self, id: &FeatureId) -> bool {
        if self.selected() == Some(id) {
            self.modal = None;
            true
        } else {
            false
        }
    }
}
