//! Canvas renderer: one rendered object per feature on the base image.
//!
//! The renderer owns the id → object mapping, the icon template cache and
//! two visibility overlays. Overlays only filter what [`CanvasRenderer::visible_objects`]
//! yields; they never add or remove mapping entries.

use std::collections::HashMap;
use std::sync::Arc;

use annosync_icons::{IconStyle, Raster};

use crate::color_utils::Rgb;
use crate::constants::{DEFAULT_ICON_SIZE, LINE_HIT_DISTANCE, MARKER_HIT_RADIUS, PREVIEW_LINE_COLOR};
use crate::error::SyncError;
use crate::image_frame::ImageFrame;
use crate::model::{Feature, FeatureId, FeatureKind, Point};

/// How a marker's icon is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerVisual {
    /// Template recolored to the marker color
    Tinted(Raster),
    /// Template unavailable or unusable
    Placeholder,
}

impl MarkerVisual {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, MarkerVisual::Placeholder)
    }
}

/// Geometry and appearance of a rendered object.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasShape {
    Marker {
        position: Point,
        icon_type: String,
        color: Rgb,
        visual: MarkerVisual,
    },
    Line {
        start: Point,
        end: Point,
        color: Rgb,
    },
}

/// A rendered feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasObject {
    pub id: FeatureId,
    pub shape: CanvasShape,
    pub info: String,
    pub notes: String,
}

impl CanvasObject {
    pub fn kind(&self) -> FeatureKind {
        match self.shape {
            CanvasShape::Marker { .. } => FeatureKind::Marker,
            CanvasShape::Line { .. } => FeatureKind::Line,
        }
    }

    pub fn color(&self) -> Rgb {
        match &self.shape {
            CanvasShape::Marker { color, .. } | CanvasShape::Line { color, .. } => *color,
        }
    }

    /// Popup text: the description, followed by the notes when present.
    pub fn popup(&self) -> String {
        if self.notes.is_empty() {
            self.info.clone()
        } else {
            format!("{}\n{}", self.info, self.notes)
        }
    }

    fn distance_to(&self, point: &Point) -> f32 {
        match &self.shape {
            CanvasShape::Marker { position, .. } => point.distance_to(position),
            CanvasShape::Line { start, end, .. } => point.distance_to_segment(start, end),
        }
    }
}

/// Rubber-band line drawn while a line is being placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLine {
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
}

/// Rendered state of the active folder.
#[derive(Debug)]
pub struct CanvasRenderer {
    frame: Option<ImageFrame>,
    objects: HashMap<FeatureId, CanvasObject>,
    /// Icon templates by name, kept across folder switches
    templates: HashMap<String, Arc<str>>,
    icon_size: u32,
    markers_visible: bool,
    lines_visible: bool,
    preview: Option<PreviewLine>,
    highlighted: Option<FeatureId>,
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_SIZE)
    }
}

impl CanvasRenderer {
    pub fn new(icon_size: u32) -> Self {
        Self {
            frame: None,
            objects: HashMap::new(),
            templates: HashMap::new(),
            icon_size,
            markers_visible: true,
            lines_visible: true,
            preview: None,
            highlighted: None,
        }
    }

    // =========================================================================
    // Coordinate space
    // =========================================================================

    /// Establish the base image. Replaces any previous frame.
    pub fn set_frame(&mut self, frame: ImageFrame) {
        log::debug!(
            "Canvas frame {} ({}x{})",
            frame.url,
            frame.width,
            frame.height
        );
        self.frame = Some(frame);
    }

    pub fn frame(&self) -> Option<&ImageFrame> {
        self.frame.as_ref()
    }

    pub fn require_frame(&self) -> Result<&ImageFrame, SyncError> {
        self.frame.as_ref().ok_or(SyncError::NoImage)
    }

    // =========================================================================
    // Icon templates
    // =========================================================================

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Cache a template. Later fetches of the same name are skipped.
    pub fn cache_template(&mut self, name: impl Into<String>, svg: impl Into<Arc<str>>) {
        let name = name.into();
        log::debug!("Caching icon template {}", name);
        self.templates.insert(name, svg.into());
    }

    fn marker_visual(&self, icon_type: &str, color: Rgb) -> MarkerVisual {
        let Some(template) = self.templates.get(icon_type) else {
            log::warn!("No template for icon {}, drawing placeholder", icon_type);
            return MarkerVisual::Placeholder;
        };
        match IconStyle::new(Arc::clone(template), color.to_array()).produce_visual(self.icon_size) {
            Ok(raster) => MarkerVisual::Tinted(raster),
            Err(e) => {
                log::warn!("Icon {} failed to render: {}, drawing placeholder", icon_type, e);
                MarkerVisual::Placeholder
            }
        }
    }

    // =========================================================================
    // Object mapping
    // =========================================================================

    /// Create or update the object for a feature.
    pub fn show(&mut self, feature: &Feature) -> Result<(), SyncError> {
        self.require_frame()?;
        let shape = match feature {
            Feature::Marker(m) => {
                // Reuse the raster when only the text changed
                let visual = match self.objects.get(&m.id).map(|o| &o.shape) {
                    Some(CanvasShape::Marker {
                        icon_type,
                        color,
                        visual,
                        ..
                    }) if *icon_type == m.icon_type
                        && *color == m.icon_color
                        && !visual.is_placeholder() =>
                    {
                        visual.clone()
                    }
                    _ => self.marker_visual(&m.icon_type, m.icon_color),
                };
                CanvasShape::Marker {
                    position: m.position,
                    icon_type: m.icon_type.clone(),
                    color: m.icon_color,
                    visual,
                }
            }
            Feature::Line(l) => CanvasShape::Line {
                start: l.start,
                end: l.end,
                color: l.color,
            },
        };
        let object = CanvasObject {
            id: feature.id().clone(),
            shape,
            info: feature.info().to_string(),
            notes: feature.notes().to_string(),
        };
        self.objects.insert(object.id.clone(), object);
        Ok(())
    }

    /// Remove the object for `id`. Returns whether one was present.
    pub fn hide(&mut self, id: &FeatureId) -> bool {
        if self.highlighted.as_ref() == Some(id) {
            self.highlighted = None;
        }
        self.objects.remove(id).is_some()
    }

    /// Remove every rendered object, the preview and the highlight.
    pub fn clear_all(&mut self) {
        log::debug!("Clearing {} canvas objects", self.objects.len());
        self.objects.clear();
        self.preview = None;
        self.highlighted = None;
    }

    pub fn object(&self, id: &FeatureId) -> Option<&CanvasObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &FeatureId> {
        self.objects.keys()
    }

    /// Number of mapped objects, regardless of visibility.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // =========================================================================
    // Visibility overlays
    // =========================================================================

    pub fn markers_visible(&self) -> bool {
        self.markers_visible
    }

    pub fn lines_visible(&self) -> bool {
        self.lines_visible
    }

    pub fn set_markers_visible(&mut self, visible: bool) {
        self.markers_visible = visible;
    }

    pub fn set_lines_visible(&mut self, visible: bool) {
        self.lines_visible = visible;
    }

    /// Flip the marker overlay and return the new state.
    pub fn toggle_markers(&mut self) -> bool {
        self.markers_visible = !self.markers_visible;
        self.markers_visible
    }

    /// Flip the line overlay and return the new state.
    pub fn toggle_lines(&mut self) -> bool {
        self.lines_visible = !self.lines_visible;
        self.lines_visible
    }

    fn is_visible(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Marker => self.markers_visible,
            FeatureKind::Line => self.lines_visible,
        }
    }

    /// Objects currently drawn, after applying the overlays.
    pub fn visible_objects(&self) -> impl Iterator<Item = &CanvasObject> {
        self.objects.values().filter(|o| self.is_visible(o.kind()))
    }

    /// The visible object under `point`. Markers win over lines; among the
    /// same kind the closest one is picked.
    pub fn hit_test(&self, point: Point) -> Option<&FeatureId> {
        let closest = |kind: FeatureKind, radius: f32| {
            self.visible_objects()
                .filter(|o| o.kind() == kind)
                .map(|o| (o, o.distance_to(&point)))
                .filter(|(_, d)| *d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(o, _)| &o.id)
        };
        closest(FeatureKind::Marker, MARKER_HIT_RADIUS)
            .or_else(|| closest(FeatureKind::Line, LINE_HIT_DISTANCE))
    }

    // =========================================================================
    // Preview and highlight
    // =========================================================================

    pub fn set_preview(&mut self, segment: Option<(Point, Point)>) {
        self.preview = segment.map(|(start, end)| PreviewLine {
            start,
            end,
            color: PREVIEW_LINE_COLOR,
        });
    }

    pub fn preview(&self) -> Option<&PreviewLine> {
        self.preview.as_ref()
    }

    /// Highlight one object exclusively. Unknown ids clear the highlight.
    pub fn highlight(&mut self, id: Option<&FeatureId>) {
        self.highlighted = id.filter(|id| self.objects.contains_key(*id)).cloned();
    }

    pub fn highlighted(&self) -> Option<&FeatureId> {
        self.highlighted.as_ref()
    }
}
