//! Placement state machine: turns canvas clicks into marker and line drafts.
//!
//! ```text
//!            click (marker mode)            submit / cancel
//!   Idle ───────────────────────▶ MarkerPending ─────────────▶ Idle
//!    │
//!    │ click (line mode, snapped)        click (snapped, != anchor)
//!    └──────────────────────▶ LineAnchored ─────────────▶ LineFormPending
//!                                  │                            │
//!                                  └──── cancel ──▶ Idle ◀──────┘ submit / cancel
//! ```

use serde::{Deserialize, Serialize};

use crate::color_utils::Rgb;
use crate::constants::{DEFAULT_FEATURE_COLOR, DEFAULT_SNAP_TOLERANCE};
use crate::error::SyncError;
use crate::model::{LineDraft, MarkerDraft, Point};

/// What a click on an empty canvas area creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementMode {
    #[default]
    Marker,
    Line,
}

impl PlacementMode {
    pub fn name(&self) -> &'static str {
        match self {
            PlacementMode::Marker => "Marker",
            PlacementMode::Line => "Line",
        }
    }

    fn other(self) -> Self {
        match self {
            PlacementMode::Marker => PlacementMode::Line,
            PlacementMode::Line => PlacementMode::Marker,
        }
    }
}

/// Current step of a placement gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlacementState {
    #[default]
    Idle,
    /// Marker creation form open for this position
    MarkerPending { position: Point },
    /// First endpoint fixed, preview follows the cursor
    LineAnchored { anchor: Point, cursor: Point },
    /// Both endpoints fixed, line creation form open
    LineFormPending { start: Point, end: Point },
}

impl PlacementState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PlacementState::Idle)
    }
}

/// Which endpoint wins when several are within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapPolicy {
    /// First endpoint in store order (lines in order, start before end)
    #[default]
    FirstMatch,
    /// Closest endpoint; ties keep the earlier one
    Nearest,
}

/// Coerces clicks onto nearby line endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapper {
    pub tolerance: f32,
    pub policy: SnapPolicy,
}

impl Default for Snapper {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SNAP_TOLERANCE,
            policy: SnapPolicy::default(),
        }
    }
}

impl Snapper {
    pub fn new(tolerance: f32, policy: SnapPolicy) -> Self {
        Self { tolerance, policy }
    }

    /// The endpoint `click` snaps to, or `click` itself. Distance must be
    /// strictly below the tolerance.
    pub fn snap(&self, click: Point, endpoints: impl IntoIterator<Item = Point>) -> Point {
        let mut in_range = endpoints
            .into_iter()
            .map(|p| (p, click.distance_to(&p)))
            .filter(|(_, d)| *d < self.tolerance);

        let target = match self.policy {
            SnapPolicy::FirstMatch => in_range.next(),
            SnapPolicy::Nearest => in_range.fold(None, |best: Option<(Point, f32)>, cand| match best {
                Some(b) if b.1 <= cand.1 => Some(b),
                _ => Some(cand),
            }),
        };

        match target {
            Some((point, _)) => {
                log::debug!(
                    "Snapped ({}, {}) to ({}, {})",
                    click.x,
                    click.y,
                    point.x,
                    point.y
                );
                point
            }
            None => click,
        }
    }
}

/// Editable fields of the marker creation form.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerForm {
    /// Icon template names to choose from
    pub icon_options: Vec<String>,
    pub icon_type: String,
    pub color: Rgb,
    pub info: String,
    pub notes: String,
}

impl MarkerForm {
    /// A form preselecting the first available icon.
    pub fn new(icon_options: Vec<String>) -> Self {
        let icon_type = icon_options.first().cloned().unwrap_or_default();
        Self {
            icon_options,
            icon_type,
            color: DEFAULT_FEATURE_COLOR,
            info: String::new(),
            notes: String::new(),
        }
    }
}

/// Editable fields of the line creation form.
#[derive(Debug, Clone, PartialEq)]
pub struct LineForm {
    pub color: Rgb,
    pub info: String,
    pub notes: String,
}

impl Default for LineForm {
    fn default() -> Self {
        Self {
            color: DEFAULT_FEATURE_COLOR,
            info: String::new(),
            notes: String::new(),
        }
    }
}

/// Result of a canvas click.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Marker form opened (or reopened) at `position`
    MarkerFormOpened { position: Point, form: MarkerForm },
    /// First line endpoint fixed
    LineAnchored { anchor: Point },
    /// Second endpoint fixed, line form opened
    LineFormOpened { start: Point, end: Point, form: LineForm },
    /// Click has no meaning in the current state
    Ignored,
}

/// Interactive placement of new features.
#[derive(Debug, Default)]
pub struct PlacementMachine {
    mode: PlacementMode,
    state: PlacementState,
    snapper: Snapper,
}

impl PlacementMachine {
    pub fn new(snapper: Snapper) -> Self {
        Self {
            mode: PlacementMode::default(),
            state: PlacementState::Idle,
            snapper,
        }
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn snapper(&self) -> &Snapper {
        &self.snapper
    }

    /// Switch mode. Only allowed while idle; returns whether it took effect.
    pub fn set_mode(&mut self, mode: PlacementMode) -> bool {
        if !self.state.is_idle() {
            log::debug!(
                "Ignoring switch to {} mode during {:?}",
                mode.name(),
                self.state
            );
            return false;
        }
        self.mode = mode;
        true
    }

    /// Flip between marker and line mode. Only allowed while idle.
    pub fn toggle_mode(&mut self) -> bool {
        self.set_mode(self.mode.other())
    }

    /// Handle a click at `point`. `endpoints` are the existing line endpoints
    /// of the active folder in store order; `icon_options` prefill the marker
    /// form.
    pub fn click(
        &mut self,
        point: Point,
        endpoints: impl IntoIterator<Item = Point>,
        icon_options: &[String],
    ) -> Result<ClickOutcome, SyncError> {
        if !point.is_finite() {
            return Err(SyncError::validation("Click position must be finite"));
        }

        let outcome = match (self.state, self.mode) {
            (PlacementState::Idle, PlacementMode::Marker) | (PlacementState::MarkerPending { .. }, _) => {
                self.state = PlacementState::MarkerPending { position: point };
                ClickOutcome::MarkerFormOpened {
                    position: point,
                    form: MarkerForm::new(icon_options.to_vec()),
                }
            }
            (PlacementState::Idle, PlacementMode::Line) => {
                let anchor = self.snapper.snap(point, endpoints);
                self.state = PlacementState::LineAnchored {
                    anchor,
                    cursor: anchor,
                };
                ClickOutcome::LineAnchored { anchor }
            }
            (PlacementState::LineAnchored { anchor, .. }, _) => {
                let end = self.snapper.snap(point, endpoints);
                if end == anchor {
                    self.state = PlacementState::LineAnchored {
                        anchor,
                        cursor: anchor,
                    };
                    return Err(SyncError::validation(
                        "Line start and end are the same point",
                    ));
                }
                self.state = PlacementState::LineFormPending { start: anchor, end };
                ClickOutcome::LineFormOpened {
                    start: anchor,
                    end,
                    form: LineForm::default(),
                }
            }
            (PlacementState::LineFormPending { .. }, _) => ClickOutcome::Ignored,
        };

        log::debug!("Placement click -> {:?}", self.state);
        Ok(outcome)
    }

    /// Track the cursor for the rubber-band preview. Returns whether the
    /// preview changed.
    pub fn cursor_moved(&mut self, point: Point) -> bool {
        match &mut self.state {
            PlacementState::LineAnchored { cursor, .. } if point.is_finite() => {
                *cursor = point;
                true
            }
            _ => false,
        }
    }

    /// The preview segment to draw, if a line is in progress.
    pub fn preview(&self) -> Option<(Point, Point)> {
        match self.state {
            PlacementState::LineAnchored { anchor, cursor } => Some((anchor, cursor)),
            PlacementState::LineFormPending { start, end } => Some((start, end)),
            _ => None,
        }
    }

    /// Build a marker draft from a submitted form. Does not change state,
    /// so a rejected form stays open.
    pub fn marker_draft(&self, form: &MarkerForm) -> Result<MarkerDraft, SyncError> {
        let PlacementState::MarkerPending { position } = self.state else {
            return Err(SyncError::validation("No marker form is open"));
        };
        let draft = MarkerDraft {
            position,
            icon_type: form.icon_type.clone(),
            icon_color: form.color,
            info: form.info.clone(),
            notes: form.notes.clone(),
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Build a line draft from a submitted form. Does not change state.
    pub fn line_draft(&self, form: &LineForm) -> Result<LineDraft, SyncError> {
        let PlacementState::LineFormPending { start, end } = self.state else {
            return Err(SyncError::validation("No line form is open"));
        };
        let draft = LineDraft {
            start,
            end,
            color: form.color,
            info: form.info.clone(),
            notes: form.notes.clone(),
        };
        draft.validate()?;
        Ok(draft)
    }

    /// End the current gesture, discarding any draft and both anchors.
    /// Returns whether a gesture was in progress.
    pub fn cancel(&mut self) -> bool {
        let was_active = !self.state.is_idle();
        if was_active {
            log::debug!("Placement cancelled from {:?}", self.state);
        }
        self.state = PlacementState::Idle;
        was_active
    }
}
