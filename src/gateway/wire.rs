//! JSON records exchanged with the annotation server.
//!
//! Field names follow the server's schema. `lat` is the vertical image
//! coordinate (y) and `lng` the horizontal one (x).

use serde::{Deserialize, Serialize};

use crate::color_utils::Rgb;
use crate::model::{FeatureId, Line, LineDraft, Marker, MarkerDraft, Point};

/// A stored marker as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(rename = "markerId")]
    pub marker_id: String,
    pub lat: f32,
    pub lng: f32,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(rename = "iconType")]
    pub icon_type: String,
    #[serde(rename = "iconColor", default)]
    pub icon_color: Option<String>,
    #[serde(rename = "markerNotes", default)]
    pub marker_notes: Option<String>,
}

/// A stored line as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    #[serde(rename = "lineId")]
    pub line_id: String,
    pub start_lat: f32,
    pub start_lng: f32,
    pub end_lat: f32,
    pub end_lng: f32,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of a marker creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarker {
    pub lat: f32,
    pub lng: f32,
    pub info: String,
    #[serde(rename = "iconType")]
    pub icon_type: String,
    #[serde(rename = "iconColor")]
    pub icon_color: String,
    #[serde(rename = "markerNotes")]
    pub marker_notes: String,
}

/// Body of a line creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLine {
    pub start_lat: f32,
    pub start_lng: f32,
    pub end_lat: f32,
    pub end_lng: f32,
    pub info: String,
    pub color: String,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedMarker {
    pub marker_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedLine {
    pub line_id: String,
}

/// Body of `/update_marker`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerUpdate {
    pub id: String,
    pub info: String,
    #[serde(rename = "iconType")]
    pub icon_type: String,
    #[serde(rename = "iconColor")]
    pub icon_color: String,
    #[serde(rename = "markerNotes")]
    pub marker_notes: String,
}

/// Body of `/update_line`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineUpdate {
    pub id: String,
    pub info: String,
    pub color: String,
    pub notes: String,
}

/// Body of `/delete_marker` and `/delete_line`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteRequest {
    pub id: String,
}

/// Parse a stored color. Unparseable values load as black.
fn stored_color(color: Option<&str>, id: &str) -> Rgb {
    match color.and_then(Rgb::parse) {
        Some(rgb) => rgb,
        None => {
            log::warn!("Feature {} has invalid color {:?}, using black", id, color);
            Rgb::BLACK
        }
    }
}

impl From<MarkerRecord> for Marker {
    fn from(record: MarkerRecord) -> Self {
        let icon_color = stored_color(record.icon_color.as_deref(), &record.marker_id);
        Marker {
            id: FeatureId::new(record.marker_id),
            position: Point::new(record.lng, record.lat),
            icon_type: record.icon_type,
            icon_color,
            info: record.info.unwrap_or_default(),
            notes: record.marker_notes.unwrap_or_default(),
        }
    }
}

impl From<LineRecord> for Line {
    fn from(record: LineRecord) -> Self {
        let color = stored_color(record.color.as_deref(), &record.line_id);
        Line {
            id: FeatureId::new(record.line_id),
            start: Point::new(record.start_lng, record.start_lat),
            end: Point::new(record.end_lng, record.end_lat),
            color,
            info: record.info.unwrap_or_default(),
            notes: record.notes.unwrap_or_default(),
        }
    }
}

impl From<&MarkerDraft> for NewMarker {
    fn from(draft: &MarkerDraft) -> Self {
        Self {
            lat: draft.position.y,
            lng: draft.position.x,
            info: draft.info.clone(),
            icon_type: draft.icon_type.clone(),
            icon_color: draft.icon_color.to_hex(),
            marker_notes: draft.notes.clone(),
        }
    }
}

impl From<&LineDraft> for NewLine {
    fn from(draft: &LineDraft) -> Self {
        Self {
            start_lat: draft.start.y,
            start_lng: draft.start.x,
            end_lat: draft.end.y,
            end_lng: draft.end.x,
            info: draft.info.clone(),
            color: draft.color.to_hex(),
            notes: draft.notes.clone(),
        }
    }
}

impl From<&Marker> for MarkerUpdate {
    fn from(marker: &Marker) -> Self {
        Self {
            id: marker.id.to_string(),
            info: marker.info.clone(),
            icon_type: marker.icon_type.clone(),
            icon_color: marker.icon_color.to_hex(),
            marker_notes: marker.notes.clone(),
        }
    }
}

impl From<&Line> for LineUpdate {
    fn from(line: &Line) -> Self {
        Self {
            id: line.id.to_string(),
            info: line.info.clone(),
            color: line.color.to_hex(),
            notes: line.notes.clone(),
        }
    }
}
