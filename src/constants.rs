//! Global constants for the annotation engine

/// Maximum distance (image pixels) at which a line anchor snaps onto an
/// existing line endpoint. Comparison is strict.
pub const DEFAULT_SNAP_TOLERANCE: f32 = 1.5;

/// Number of id characters shown in the table's id column.
pub const DEFAULT_ID_PREFIX_LEN: usize = 8;

/// Rendered marker icon edge length in pixels.
pub const DEFAULT_ICON_SIZE: u32 = 30;

/// Color preselected in the creation forms.
pub const DEFAULT_FEATURE_COLOR: crate::color_utils::Rgb = crate::color_utils::Rgb::BLACK;

/// Color of the rubber-band preview line.
pub const PREVIEW_LINE_COLOR: crate::color_utils::Rgb = crate::color_utils::Rgb::RED;

/// Hit radius around a marker position for canvas picking.
pub const MARKER_HIT_RADIUS: f32 = 15.0;

/// Hit distance from a line segment for canvas picking.
pub const LINE_HIT_DISTANCE: f32 = 4.0;

/// Type label shown in the table for lines.
pub const LINE_TYPE_LABEL: &str = "line";

/// Extension stripped from icon template names in the table.
pub const ICON_TEMPLATE_EXTENSION: &str = ".svg";

/// Default backend address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
