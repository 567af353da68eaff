//! Table view: one row per feature with in-place editing, sorting and a
//! description filter.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color_utils::{Rgb, TextColor};
use crate::constants::{DEFAULT_ID_PREFIX_LEN, ICON_TEMPLATE_EXTENSION, LINE_TYPE_LABEL};
use crate::error::SyncError;
use crate::model::{Feature, FeatureId, FeatureKind, FeaturePatch};

/// Table columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Kind,
    Color,
    Description,
    Notes,
}

impl Column {
    pub fn all() -> &'static [Column] {
        &[
            Column::Id,
            Column::Kind,
            Column::Color,
            Column::Description,
            Column::Notes,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Kind => "type",
            Column::Color => "color",
            Column::Description => "description",
            Column::Notes => "notes",
        }
    }

    /// Whether committing a cell of this column produces an update.
    pub fn is_editable(&self) -> bool {
        matches!(self, Column::Color | Column::Description | Column::Notes)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Column::all()
            .iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| SyncError::validation(format!("Unknown column '{}'", s)))
    }
}

/// How header clicks pick the sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// One direction flag for the whole table, flipped on every header click
    #[default]
    SharedToggle,
    /// Each column remembers its own direction
    PerColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: FeatureId,
    pub kind: FeatureKind,
    /// Truncated id shown in the id column
    pub short_id: String,
    /// Icon name without extension for markers, `line` for lines
    pub type_label: String,
    pub color: Rgb,
    /// Readable text color on top of the swatch
    pub swatch_text: TextColor,
    pub description: String,
    pub notes: String,
}

impl TableRow {
    fn from_feature(feature: &Feature, prefix_len: usize) -> Self {
        let type_label = match feature {
            Feature::Marker(m) => m
                .icon_type
                .strip_suffix(ICON_TEMPLATE_EXTENSION)
                .unwrap_or(&m.icon_type)
                .to_string(),
            Feature::Line(_) => LINE_TYPE_LABEL.to_string(),
        };
        let color = feature.color();
        Self {
            id: feature.id().clone(),
            kind: feature.kind(),
            short_id: feature.id().short(prefix_len).to_string(),
            type_label,
            color,
            swatch_text: color.text_color(),
            description: feature.info().to_string(),
            notes: feature.notes().to_string(),
        }
    }

    /// Text of a cell, as used for sorting.
    pub fn cell_text(&self, column: Column) -> String {
        match column {
            Column::Id => self.short_id.clone(),
            Column::Kind => self.type_label.clone(),
            Column::Color => self.color.to_hex(),
            Column::Description => self.description.clone(),
            Column::Notes => self.notes.clone(),
        }
    }
}

/// Expanded notes view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesView {
    pub header: String,
    pub notes: String,
}

/// Confirmation shown before a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub id: FeatureId,
    pub kind: FeatureKind,
    pub message: String,
}

/// Row set of the active folder.
#[derive(Debug)]
pub struct TableView {
    /// Rows in display order
    rows: Vec<TableRow>,
    prefix_len: usize,
    sort_mode: SortMode,
    /// Direction of the next click in shared-toggle mode
    next_shared: SortDirection,
    /// Direction of the last click per column in per-column mode
    column_directions: HashMap<Column, SortDirection>,
    last_sort: Option<(Column, SortDirection)>,
    filter: String,
    highlighted: Option<FeatureId>,
}

impl Default for TableView {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX_LEN, SortMode::default())
    }
}

impl TableView {
    pub fn new(prefix_len: usize, sort_mode: SortMode) -> Self {
        Self {
            rows: Vec::new(),
            prefix_len,
            sort_mode,
            next_shared: SortDirection::Ascending,
            column_directions: HashMap::new(),
            last_sort: None,
            filter: String::new(),
            highlighted: None,
        }
    }

    // ==================== Row mapping ====================

    /// Insert a row for a new feature at the end, or refresh an existing
    /// row in place.
    pub fn upsert(&mut self, feature: &Feature) {
        let row = TableRow::from_feature(feature, self.prefix_len);
        match self.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    /// Remove the row for `id`. Returns whether one was present.
    pub fn remove(&mut self, id: &FeatureId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| &r.id != id);
        if self.highlighted.as_ref() == Some(id) {
            self.highlighted = None;
        }
        self.rows.len() != before
    }

    /// Drop every row. Sort state and filter text are kept.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.highlighted = None;
    }

    pub fn row(&self, id: &FeatureId) -> Option<&TableRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.row(id).is_some()
    }

    /// All rows in display order, ignoring the filter.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // ==================== Sort and filter ====================

    /// Sort the rows by a column's text, case-insensitive and stable.
    /// Returns the direction that was applied.
    pub fn sort_by(&mut self, column: Column) -> SortDirection {
        let direction = match self.sort_mode {
            SortMode::SharedToggle => {
                let direction = self.next_shared;
                self.next_shared = direction.flipped();
                direction
            }
            SortMode::PerColumn => {
                let direction = self
                    .column_directions
                    .get(&column)
                    .map_or(SortDirection::Ascending, |d| d.flipped());
                self.column_directions.insert(column, direction);
                direction
            }
        };

        self.rows
            .sort_by_cached_key(|row| row.cell_text(column).to_lowercase());
        if direction == SortDirection::Descending {
            self.rows.reverse();
        }

        log::debug!("Sorted table by {} {:?}", column, direction);
        self.last_sort = Some((column, direction));
        direction
    }

    pub fn last_sort(&self) -> Option<(Column, SortDirection)> {
        self.last_sort
    }

    /// Set the description filter. Always applied to the full row set.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Rows matching the filter, in display order.
    pub fn visible_rows(&self) -> impl Iterator<Item = &TableRow> {
        let needle = self.filter.to_lowercase();
        self.rows
            .iter()
            .filter(move |r| r.description.to_lowercase().contains(&needle))
    }

    // ==================== Selection ====================

    /// Highlight one row exclusively. Unknown ids clear the highlight.
    pub fn highlight(&mut self, id: Option<&FeatureId>) {
        self.highlighted = id.filter(|id| self.contains(id)).cloned();
    }

    pub fn highlighted(&self) -> Option<&FeatureId> {
        self.highlighted.as_ref()
    }

    // ==================== Editing ====================

    /// Turn a committed cell edit into a patch with just that field.
    ///
    /// Returns `Ok(None)` when the text equals the current value.
    pub fn commit_cell(
        &self,
        id: &FeatureId,
        column: Column,
        text: &str,
    ) -> Result<Option<FeaturePatch>, SyncError> {
        let row = self
            .row(id)
            .ok_or_else(|| SyncError::UnknownFeature { id: id.clone() })?;
        let patch = match column {
            Column::Description if text != row.description => FeaturePatch::new().info(text),
            Column::Notes if text != row.notes => FeaturePatch::new().notes(text),
            Column::Color => {
                let color = Rgb::parse(text)
                    .ok_or_else(|| SyncError::validation(format!("Invalid color '{}'", text)))?;
                if color == row.color {
                    return Ok(None);
                }
                FeaturePatch::new().color(color)
            }
            Column::Description | Column::Notes => return Ok(None),
            Column::Id | Column::Kind => {
                return Err(SyncError::validation(format!(
                    "Column '{}' is not editable",
                    column
                )));
            }
        };
        Ok(Some(patch))
    }

    /// Header and full text for the expanded notes view.
    pub fn expand_notes(&self, id: &FeatureId) -> Option<NotesView> {
        let row = self.row(id)?;
        Some(NotesView {
            header: format!("Notes for: {} - {}", row.short_id, row.description),
            notes: row.notes.clone(),
        })
    }

    /// Confirmation text for deleting the feature in row `id`.
    pub fn delete_prompt(&self, id: &FeatureId) -> Option<DeletePrompt> {
        let row = self.row(id)?;
        Some(DeletePrompt {
            id: row.id.clone(),
            kind: row.kind,
            message: format!(
                "Are you sure you want to delete {} {} with description \"{}\"?",
                row.kind.name(),
                row.short_id,
                row.description
            ),
        })
    }
}
