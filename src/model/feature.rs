//! Feature data types: markers, lines, their drafts and patches.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color_utils::Rgb;
use crate::error::SyncError;

/// Opaque, server-assigned identifier of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `len` characters, as shown in the table.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> f32 {
        let (vx, vy) = (b.x - a.x, b.y - a.y);
        let len_sq = vx * vx + vy * vy;
        if len_sq == 0.0 {
            return self.distance_to(a);
        }
        let t = (((self.x - a.x) * vx + (self.y - a.y) * vy) / len_sq).clamp(0.0, 1.0);
        self.distance_to(&Point::new(a.x + t * vx, a.y + t * vy))
    }
}

/// The two kinds of feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Marker,
    Line,
}

impl FeatureKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Marker => "Marker",
            FeatureKind::Line => "Line",
        }
    }
}

/// A point annotation drawn with a tinted icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: FeatureId,
    pub position: Point,
    /// Icon template name, e.g. `pin.svg`
    pub icon_type: String,
    pub icon_color: Rgb,
    /// Short description
    pub info: String,
    pub notes: String,
}

/// A straight line annotation between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: FeatureId,
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
    /// Short description
    pub info: String,
    pub notes: String,
}

/// A marker or a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Marker(Marker),
    Line(Line),
}

impl Feature {
    pub fn id(&self) -> &FeatureId {
        match self {
            Feature::Marker(m) => &m.id,
            Feature::Line(l) => &l.id,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Marker(_) => FeatureKind::Marker,
            Feature::Line(_) => FeatureKind::Line,
        }
    }

    pub fn info(&self) -> &str {
        match self {
            Feature::Marker(m) => &m.info,
            Feature::Line(l) => &l.info,
        }
    }

    pub fn notes(&self) -> &str {
        match self {
            Feature::Marker(m) => &m.notes,
            Feature::Line(l) => &l.notes,
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Feature::Marker(m) => m.icon_color,
            Feature::Line(l) => l.color,
        }
    }

    pub fn icon_type(&self) -> Option<&str> {
        match self {
            Feature::Marker(m) => Some(&m.icon_type),
            Feature::Line(_) => None,
        }
    }

    /// Merge a patch into this feature. The patch must already be validated
    /// against this feature's kind.
    pub fn apply(&mut self, patch: &FeaturePatch) {
        let (info, notes) = match self {
            Feature::Marker(m) => {
                if let Some(color) = patch.color {
                    m.icon_color = color;
                }
                if let Some(icon_type) = &patch.icon_type {
                    m.icon_type = icon_type.clone();
                }
                (&mut m.info, &mut m.notes)
            }
            Feature::Line(l) => {
                if let Some(color) = patch.color {
                    l.color = color;
                }
                (&mut l.info, &mut l.notes)
            }
        };
        if let Some(new_info) = &patch.info {
            *info = new_info.clone();
        }
        if let Some(new_notes) = &patch.notes {
            *notes = new_notes.clone();
        }
    }
}

impl From<Marker> for Feature {
    fn from(marker: Marker) -> Self {
        Feature::Marker(marker)
    }
}

impl From<Line> for Feature {
    fn from(line: Line) -> Self {
        Feature::Line(line)
    }
}

/// Marker fields before the server has assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDraft {
    pub position: Point,
    pub icon_type: String,
    pub icon_color: Rgb,
    pub info: String,
    pub notes: String,
}

impl MarkerDraft {
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.position.is_finite() {
            return Err(SyncError::validation("Marker position must be finite"));
        }
        if self.icon_type.trim().is_empty() {
            return Err(SyncError::validation("Marker icon type is required"));
        }
        Ok(())
    }

    pub fn into_marker(self, id: FeatureId) -> Marker {
        Marker {
            id,
            position: self.position,
            icon_type: self.icon_type,
            icon_color: self.icon_color,
            info: self.info,
            notes: self.notes,
        }
    }
}

/// Line fields before the server has assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
    pub info: String,
    pub notes: String,
}

impl LineDraft {
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(SyncError::validation("Line endpoints must be finite"));
        }
        if self.start == self.end {
            return Err(SyncError::validation(
                "Line start and end are the same point",
            ));
        }
        Ok(())
    }

    pub fn into_line(self, id: FeatureId) -> Line {
        Line {
            id,
            start: self.start,
            end: self.end,
            color: self.color,
            info: self.info,
            notes: self.notes,
        }
    }
}

/// A feature awaiting creation.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureDraft {
    Marker(MarkerDraft),
    Line(LineDraft),
}

impl FeatureDraft {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureDraft::Marker(_) => FeatureKind::Marker,
            FeatureDraft::Line(_) => FeatureKind::Line,
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        match self {
            FeatureDraft::Marker(m) => m.validate(),
            FeatureDraft::Line(l) => l.validate(),
        }
    }

    /// Attach the server-assigned id.
    pub fn into_feature(self, id: FeatureId) -> Feature {
        match self {
            FeatureDraft::Marker(m) => Feature::Marker(m.into_marker(id)),
            FeatureDraft::Line(l) => Feature::Line(l.into_line(id)),
        }
    }
}

impl From<Marker> for FeatureDraft {
    fn from(marker: Marker) -> Self {
        FeatureDraft::Marker(MarkerDraft {
            position: marker.position,
            icon_type: marker.icon_type,
            icon_color: marker.icon_color,
            info: marker.info,
            notes: marker.notes,
        })
    }
}

impl From<Line> for FeatureDraft {
    fn from(line: Line) -> Self {
        FeatureDraft::Line(LineDraft {
            start: line.start,
            end: line.end,
            color: line.color,
            info: line.info,
            notes: line.notes,
        })
    }
}

/// Partial update of a feature's editable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePatch {
    pub info: Option<String>,
    pub notes: Option<String>,
    pub color: Option<Rgb>,
    /// Markers only
    pub icon_type: Option<String>,
}

impl FeaturePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn icon_type(mut self, icon_type: impl Into<String>) -> Self {
        self.icon_type = Some(icon_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.notes.is_none() && self.color.is_none() && self.icon_type.is_none()
    }

    /// Check that the patch makes sense for a feature of `kind`.
    pub fn validate_for(&self, kind: FeatureKind) -> Result<(), SyncError> {
        if let Some(icon_type) = &self.icon_type {
            if kind == FeatureKind::Line {
                return Err(SyncError::validation("Lines have no icon type"));
            }
            if icon_type.trim().is_empty() {
                return Err(SyncError::validation("Marker icon type is required"));
            }
        }
        Ok(())
    }
}
