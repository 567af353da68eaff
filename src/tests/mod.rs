//! Scenario tests driving the engine against the in-memory gateway.
//!
//! Shared fixtures live here. `SlowGateway` yields once before every call so
//! two engine operations driven by `futures::future::join` interleave.

mod folder_tests;
mod placement_tests;
mod table_tests;

use crate::color_utils::Rgb;
use crate::engine::{EngineSettings, SyncEngine};
use crate::gateway::{GatewayError, MemoryGateway, PersistenceGateway};
use crate::image_frame::ImageFrame;
use crate::model::{
    FeatureId, FeatureKind, FolderName, Line, LineDraft, Marker, MarkerDraft, Point,
};

pub(crate) const PIN_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" fill="black"><rect width="10" height="10"/></svg>"#;

pub(crate) fn folder(name: &str) -> FolderName {
    FolderName::parse(name).unwrap()
}

pub(crate) fn frame() -> ImageFrame {
    ImageFrame::new("img/base.png", 800, 600)
}

pub(crate) fn marker(id: &str, x: f32, y: f32, info: &str) -> Marker {
    Marker {
        id: FeatureId::new(id),
        position: Point::new(x, y),
        icon_type: "pin.svg".to_string(),
        icon_color: Rgb::RED,
        info: info.to_string(),
        notes: String::new(),
    }
}

pub(crate) fn line(id: &str, start: (f32, f32), end: (f32, f32), info: &str) -> Line {
    Line {
        id: FeatureId::new(id),
        start: Point::new(start.0, start.1),
        end: Point::new(end.0, end.1),
        color: Rgb::new(0, 0, 255),
        info: info.to_string(),
        notes: String::new(),
    }
}

/// Gateway with folders `garden` and `orchard` and a `pin.svg` icon.
pub(crate) fn gateway() -> MemoryGateway {
    MemoryGateway::new()
        .with_folder(&folder("garden"), "img/garden.png")
        .with_folder(&folder("orchard"), "img/orchard.png")
        .with_icon("pin.svg", PIN_SVG)
}

/// Engine with `garden` opened.
pub(crate) fn open_engine(
    gateway: MemoryGateway,
    settings: EngineSettings,
) -> SyncEngine<MemoryGateway> {
    let engine = SyncEngine::new(gateway, settings);
    pollster::block_on(engine.refresh_icon_options()).unwrap();
    pollster::block_on(engine.switch_folder(folder("garden"), frame())).unwrap();
    engine
}

/// Memory gateway whose calls each suspend once before completing.
pub(crate) struct SlowGateway(pub MemoryGateway);

impl PersistenceGateway for SlowGateway {
    async fn list_folders(&self) -> Result<Vec<String>, GatewayError> {
        tokio::task::yield_now().await;
        self.0.list_folders().await
    }

    async fn image_url(&self, folder: &FolderName) -> Result<String, GatewayError> {
        tokio::task::yield_now().await;
        self.0.image_url(folder).await
    }

    async fn list_markers(&self, folder: &FolderName) -> Result<Vec<Marker>, GatewayError> {
        tokio::task::yield_now().await;
        self.0.list_markers(folder).await
    }

    async fn list_lines(&self, folder: &FolderName) -> Result<Vec<Line>, GatewayError> {
        tokio::task::yield_now().await;
        self.0.list_lines(folder).await
    }

    async fn get_marker(&self, folder: &FolderName, id: &FeatureId) -> Result<Marker, GatewayError> {
        tokio::task::yield_now().await;
        self.0.get_marker(folder, id).await
    }

    async fn get_line(&self, folder: &FolderName, id: &FeatureId) -> Result<Line, GatewayError> {
        tokio::task::yield_now().await;
        self.0.get_line(folder, id).await
    }

    async fn create_marker(
        &self,
        folder: &FolderName,
        draft: &MarkerDraft,
    ) -> Result<FeatureId, GatewayError> {
        tokio::task::yield_now().await;
        self.0.create_marker(folder, draft).await
    }

    async fn create_line(
        &self,
        folder: &FolderName,
        draft: &LineDraft,
    ) -> Result<FeatureId, GatewayError> {
        tokio::task::yield_now().await;
        self.0.create_line(folder, draft).await
    }

    async fn update_marker(&self, folder: &FolderName, marker: &Marker) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        self.0.update_marker(folder, marker).await
    }

    async fn update_line(&self, folder: &FolderName, line: &Line) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        self.0.update_line(folder, line).await
    }

    async fn delete_feature(
        &self,
        folder: &FolderName,
        kind: FeatureKind,
        id: &FeatureId,
    ) -> Result<(), GatewayError> {
        tokio::task::yield_now().await;
        self.0.delete_feature(folder, kind, id).await
    }

    async fn list_icon_templates(&self) -> Result<Vec<String>, GatewayError> {
        tokio::task::yield_now().await;
        self.0.list_icon_templates().await
    }

    async fn fetch_icon_template(&self, name: &str) -> Result<String, GatewayError> {
        tokio::task::yield_now().await;
        self.0.fetch_icon_template(name).await
    }
}
