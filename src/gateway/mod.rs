//! Persistence gateway: CRUD access to the backend that owns the features.
//!
//! The engine only talks to the backend through [`PersistenceGateway`]. Two
//! implementations are provided:
//! - [`HttpGateway`] speaks the JSON routes of the annotation server
//! - [`MemoryGateway`] keeps everything in process (tests, demos)

mod http;
mod memory;
pub mod wire;

pub use http::HttpGateway;
pub use memory::{GatewayOp, MemoryGateway};

use thiserror::Error;

use crate::model::{FeatureId, FeatureKind, FolderName, Line, LineDraft, Marker, MarkerDraft};

/// Transport-level failures of a gateway call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Network(String),

    /// The backend does not know the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status
    #[error("Server returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Asynchronous CRUD contract consumed by the engine.
///
/// Every call is a suspension point. Implementations must not retry silently.
/// The engine runs on a single thread, so the futures need not be `Send`.
#[expect(async_fn_in_trait)]
pub trait PersistenceGateway {
    /// Names of all folders known to the backend.
    async fn list_folders(&self) -> Result<Vec<String>, GatewayError>;

    /// URL (or server-relative path) of a folder's base image.
    async fn image_url(&self, folder: &FolderName) -> Result<String, GatewayError>;

    async fn list_markers(&self, folder: &FolderName) -> Result<Vec<Marker>, GatewayError>;

    async fn list_lines(&self, folder: &FolderName) -> Result<Vec<Line>, GatewayError>;

    /// Fetch a single marker by id.
    async fn get_marker(&self, folder: &FolderName, id: &FeatureId)
    -> Result<Marker, GatewayError>;

    /// Fetch a single line by id.
    async fn get_line(&self, folder: &FolderName, id: &FeatureId) -> Result<Line, GatewayError>;

    /// Persist a new marker and return the id the backend assigned.
    async fn create_marker(
        &self,
        folder: &FolderName,
        draft: &MarkerDraft,
    ) -> Result<FeatureId, GatewayError>;

    /// Persist a new line and return the id the backend assigned.
    async fn create_line(
        &self,
        folder: &FolderName,
        draft: &LineDraft,
    ) -> Result<FeatureId, GatewayError>;

    /// Store the editable fields (info, notes, color, icon type) of a marker.
    async fn update_marker(&self, folder: &FolderName, marker: &Marker)
    -> Result<(), GatewayError>;

    /// Store the editable fields (info, notes, color) of a line.
    async fn update_line(&self, folder: &FolderName, line: &Line) -> Result<(), GatewayError>;

    async fn delete_feature(
        &self,
        folder: &FolderName,
        kind: FeatureKind,
        id: &FeatureId,
    ) -> Result<(), GatewayError>;

    /// Names of the available icon templates.
    async fn list_icon_templates(&self) -> Result<Vec<String>, GatewayError>;

    /// Raw SVG text of one icon template.
    async fn fetch_icon_template(&self, name: &str) -> Result<String, GatewayError>;
}
