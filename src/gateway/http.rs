//! HTTP gateway speaking the annotation server's JSON routes.
//!
//! The server applies create/update/delete calls to the folder held in the
//! cookie session, not to the folder in the URL. Listing and fetch-by-id
//! routes move that session, as does `GET /set_image_folder`. The gateway
//! tracks where the session points and moves it before every write, holding
//! a lock so concurrent calls cannot move it in between.
//!
//! The update and delete routes answer 200 even for unknown ids, so those
//! calls fetch the feature by id first. That request also scopes the session
//! and turns a missing feature into [`GatewayError::NotFound`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::wire::{
    CreatedLine, CreatedMarker, DeleteRequest, LineRecord, LineUpdate, MarkerRecord,
    MarkerUpdate, NewLine, NewMarker,
};
use super::{GatewayError, PersistenceGateway};
use crate::model::{FeatureId, FeatureKind, FolderName, Line, LineDraft, Marker, MarkerDraft};

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            GatewayError::Status {
                status: status.as_u16(),
            }
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

/// Gateway talking to a running annotation server.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    /// Folder the server session points at, `None` when unknown
    session: Arc<Mutex<Option<FolderName>>>,
}

impl HttpGateway {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::info!("Using annotation server at {}", base_url);
        Ok(Self {
            client,
            base_url,
            session: Arc::new(Mutex::new(None)),
        })
    }

    /// Resolve a server-relative path (leading slash optional).
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Download raw bytes, e.g. a base image.
    pub async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            log::error!("{} failed with status {}", what, status);
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Ok(response.json().await?)
    }

    async fn get_text(&self, path: &str) -> Result<String, GatewayError> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Ok(response.text().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .send(self.client.post(self.url(path)).json(body), path)
            .await?;
        Ok(response.json().await?)
    }

    async fn post_ack<B: Serialize>(&self, path: &str, body: &B) -> Result<(), GatewayError> {
        self.send(self.client.post(self.url(path)).json(body), path)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Session scoping
    // =========================================================================

    /// GET a route that moves the server session to `folder`.
    async fn scoped_get(
        &self,
        session: &mut Option<FolderName>,
        folder: &FolderName,
        path: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        // A failed request may or may not have moved the session
        *session = None;
        let response = self.send(self.client.get(self.url(path)), path).await?;
        *session = Some(folder.clone());
        Ok(response)
    }

    /// Move the server session to `folder` unless it already points there.
    async fn scope_session(
        &self,
        session: &mut Option<FolderName>,
        folder: &FolderName,
    ) -> Result<(), GatewayError> {
        if session.as_ref() == Some(folder) {
            return Ok(());
        }
        let path = format!("/set_image_folder?image_folder={}", folder);
        self.scoped_get(session, folder, &path).await?;
        log::debug!("Server session moved to {}", folder);
        Ok(())
    }

    async fn get_scoped<T: DeserializeOwned>(
        &self,
        folder: &FolderName,
        path: &str,
    ) -> Result<T, GatewayError> {
        let mut session = self.session.lock().await;
        let response = self.scoped_get(&mut session, folder, path).await?;
        Ok(response.json().await?)
    }

    async fn create_in<B: Serialize, T: DeserializeOwned>(
        &self,
        folder: &FolderName,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let mut session = self.session.lock().await;
        self.scope_session(&mut session, folder).await?;
        self.post_json(path, body).await
    }

    /// POST a change to the feature at `feature_path` after confirming it exists.
    async fn change_in<B: Serialize>(
        &self,
        folder: &FolderName,
        feature_path: &str,
        path: &str,
        body: &B,
    ) -> Result<(), GatewayError> {
        let mut session = self.session.lock().await;
        self.scoped_get(&mut session, folder, feature_path).await?;
        self.post_ack(path, body).await
    }
}

fn feature_path(folder: &FolderName, kind: FeatureKind, id: &FeatureId) -> String {
    match kind {
        FeatureKind::Marker => format!("/markers/{}/{}", folder, id),
        FeatureKind::Line => format!("/lines/{}/{}", folder, id),
    }
}

impl PersistenceGateway for HttpGateway {
    async fn list_folders(&self) -> Result<Vec<String>, GatewayError> {
        self.get_json("/get_folders").await
    }

    async fn image_url(&self, folder: &FolderName) -> Result<String, GatewayError> {
        let path = self.get_text(&format!("/get_image_url/{}", folder)).await?;
        Ok(self.url(path.trim()))
    }

    async fn list_markers(&self, folder: &FolderName) -> Result<Vec<Marker>, GatewayError> {
        let records: Vec<MarkerRecord> = self
            .get_scoped(folder, &format!("/markers/{}", folder))
            .await?;
        Ok(records.into_iter().map(Marker::from).collect())
    }

    async fn list_lines(&self, folder: &FolderName) -> Result<Vec<Line>, GatewayError> {
        let records: Vec<LineRecord> = self
            .get_scoped(folder, &format!("/lines/{}", folder))
            .await?;
        Ok(records.into_iter().map(Line::from).collect())
    }

    async fn get_marker(
        &self,
        folder: &FolderName,
        id: &FeatureId,
    ) -> Result<Marker, GatewayError> {
        let path = feature_path(folder, FeatureKind::Marker, id);
        let record: MarkerRecord = self.get_scoped(folder, &path).await?;
        Ok(Marker::from(record))
    }

    async fn get_line(&self, folder: &FolderName, id: &FeatureId) -> Result<Line, GatewayError> {
        let path = feature_path(folder, FeatureKind::Line, id);
        let record: LineRecord = self.get_scoped(folder, &path).await?;
        Ok(Line::from(record))
    }

    async fn create_marker(
        &self,
        folder: &FolderName,
        draft: &MarkerDraft,
    ) -> Result<FeatureId, GatewayError> {
        let created: CreatedMarker = self
            .create_in(folder, &format!("/markers/{}", folder), &NewMarker::from(draft))
            .await?;
        Ok(FeatureId::new(created.marker_id))
    }

    async fn create_line(
        &self,
        folder: &FolderName,
        draft: &LineDraft,
    ) -> Result<FeatureId, GatewayError> {
        let created: CreatedLine = self
            .create_in(folder, &format!("/lines/{}", folder), &NewLine::from(draft))
            .await?;
        Ok(FeatureId::new(created.line_id))
    }

    async fn update_marker(&self, folder: &FolderName, marker: &Marker) -> Result<(), GatewayError> {
        let path = feature_path(folder, FeatureKind::Marker, &marker.id);
        self.change_in(folder, &path, "/update_marker", &MarkerUpdate::from(marker))
            .await
    }

    async fn update_line(&self, folder: &FolderName, line: &Line) -> Result<(), GatewayError> {
        let path = feature_path(folder, FeatureKind::Line, &line.id);
        self.change_in(folder, &path, "/update_line", &LineUpdate::from(line))
            .await
    }

    async fn delete_feature(
        &self,
        folder: &FolderName,
        kind: FeatureKind,
        id: &FeatureId,
    ) -> Result<(), GatewayError> {
        let route = match kind {
            FeatureKind::Marker => "/delete_marker",
            FeatureKind::Line => "/delete_line",
        };
        let body = DeleteRequest { id: id.to_string() };
        self.change_in(folder, &feature_path(folder, kind, id), route, &body)
            .await
    }

    async fn list_icon_templates(&self) -> Result<Vec<String>, GatewayError> {
        self.get_json("/icon_filenames").await
    }

    async fn fetch_icon_template(&self, name: &str) -> Result<String, GatewayError> {
        self.get_text(&format!("/icons/{}", name)).await
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::color_utils::Rgb;
    use crate::model::Point;

    /// Server that applies writes to its session folder, like the real one.
    #[derive(Default)]
    struct SessionServer {
        session: Option<String>,
        requests: Vec<String>,
        /// `(folder, id)` pairs
        markers: Vec<(String, String)>,
        updates: Vec<String>,
        next_id: u32,
    }

    type Shared = Arc<Mutex<SessionServer>>;

    #[derive(Deserialize)]
    struct FolderQuery {
        image_folder: String,
    }

    fn marker_json(id: &str) -> Value {
        json!({
            "markerId": id,
            "lat": 5.0,
            "lng": 5.0,
            "info": "Well",
            "iconType": "pin.svg",
            "iconColor": "#ff0000",
            "markerNotes": ""
        })
    }

    async fn set_folder(State(state): State<Shared>, Query(query): Query<FolderQuery>) -> &'static str {
        let mut server = state.lock().await;
        server
            .requests
            .push(format!("GET /set_image_folder?image_folder={}", query.image_folder));
        server.session = Some(query.image_folder);
        "OK"
    }

    async fn list_markers(State(state): State<Shared>, Path(dir): Path<String>) -> Response {
        let mut server = state.lock().await;
        server.requests.push(format!("GET /markers/{}", dir));
        server.session = Some(dir.clone());
        if dir == "broken" {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        let records: Vec<Value> = server
            .markers
            .iter()
            .filter(|(folder, _)| *folder == dir)
            .map(|(_, id)| marker_json(id))
            .collect();
        Json(records).into_response()
    }

    async fn get_marker(
        State(state): State<Shared>,
        Path((dir, id)): Path<(String, String)>,
    ) -> Response {
        let mut server = state.lock().await;
        server.requests.push(format!("GET /markers/{}/{}", dir, id));
        server.session = Some(dir.clone());
        if server.markers.iter().any(|(f, m)| *f == dir && *m == id) {
            Json(marker_json(&id)).into_response()
        } else {
            (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
        }
    }

    async fn create_marker(State(state): State<Shared>, Path(dir): Path<String>) -> Json<Value> {
        let mut server = state.lock().await;
        server.requests.push(format!("POST /markers/{}", dir));
        server.next_id += 1;
        let id = format!("m{}", server.next_id);
        let folder = server.session.clone().unwrap_or_default();
        server.markers.push((folder, id.clone()));
        Json(json!({ "marker_id": id }))
    }

    async fn update_marker(State(state): State<Shared>, Json(body): Json<Value>) -> &'static str {
        let mut server = state.lock().await;
        server.requests.push("POST /update_marker".to_string());
        let folder = server.session.clone().unwrap_or_default();
        let id = body["id"].as_str().unwrap_or_default().to_string();
        server.updates.push(format!("{} in {}", id, folder));
        "OK"
    }

    async fn delete_marker(State(state): State<Shared>, Json(body): Json<Value>) -> &'static str {
        let mut server = state.lock().await;
        server.requests.push("POST /delete_marker".to_string());
        let folder = server.session.clone().unwrap_or_default();
        let id = body["id"].as_str().unwrap_or_default().to_string();
        server.markers.retain(|(f, m)| !(*f == folder && *m == id));
        "OK"
    }

    async fn start_server(state: Shared) -> HttpGateway {
        let app = Router::new()
            .route("/set_image_folder", get(set_folder))
            .route("/markers/{dir}", get(list_markers).post(create_marker))
            .route("/markers/{dir}/{id}", get(get_marker))
            .route("/update_marker", post(update_marker))
            .route("/delete_marker", post(delete_marker))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        HttpGateway::new(format!("http://{}", addr)).unwrap()
    }

    fn folder(name: &str) -> FolderName {
        FolderName::parse(name).unwrap()
    }

    fn draft() -> MarkerDraft {
        MarkerDraft {
            position: Point::new(20.0, 30.0),
            icon_type: "pin.svg".to_string(),
            icon_color: Rgb::RED,
            info: "Shed".to_string(),
            notes: String::new(),
        }
    }

    fn existing(id: &str) -> Marker {
        Marker {
            id: FeatureId::new(id),
            position: Point::new(5.0, 5.0),
            icon_type: "pin.svg".to_string(),
            icon_color: Rgb::RED,
            info: "Dry well".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_moves_session_to_its_folder() {
        let state = Shared::default();
        let gateway = start_server(state.clone()).await;

        gateway.list_markers(&folder("garden")).await.unwrap();
        let first = gateway.create_marker(&folder("orchard"), &draft()).await.unwrap();
        let second = gateway.create_marker(&folder("orchard"), &draft()).await.unwrap();

        let server = state.lock().await;
        assert_eq!(
            server.requests,
            [
                "GET /markers/garden",
                "GET /set_image_folder?image_folder=orchard",
                "POST /markers/orchard",
                "POST /markers/orchard",
            ]
        );
        assert_eq!(
            server.markers,
            [
                ("orchard".to_string(), first.to_string()),
                ("orchard".to_string(), second.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_listing_forgets_session() {
        let state = Shared::default();
        let gateway = start_server(state.clone()).await;

        gateway.list_markers(&folder("garden")).await.unwrap();
        let failed = gateway.list_markers(&folder("broken")).await;
        assert!(matches!(failed, Err(GatewayError::Status { status: 500 })));
        let id = gateway.create_marker(&folder("garden"), &draft()).await.unwrap();

        let server = state.lock().await;
        assert_eq!(
            &server.requests[2..],
            [
                "GET /set_image_folder?image_folder=garden",
                "POST /markers/garden",
            ]
        );
        assert_eq!(server.markers, [("garden".to_string(), id.to_string())]);
    }

    #[tokio::test]
    async fn test_update_fetches_feature_before_posting() {
        let state = Shared::default();
        state
            .lock()
            .await
            .markers
            .push(("garden".to_string(), "m1".to_string()));
        let gateway = start_server(state.clone()).await;

        gateway.list_markers(&folder("orchard")).await.unwrap();
        gateway
            .update_marker(&folder("garden"), &existing("m1"))
            .await
            .unwrap();

        let missing = gateway.update_marker(&folder("garden"), &existing("gone")).await;
        assert!(matches!(missing, Err(GatewayError::NotFound(_))));

        let server = state.lock().await;
        assert_eq!(
            server.requests,
            [
                "GET /markers/orchard",
                "GET /markers/garden/m1",
                "POST /update_marker",
                "GET /markers/garden/gone",
            ]
        );
        assert_eq!(server.updates, ["m1 in garden"]);
    }

    #[tokio::test]
    async fn test_delete_targets_requested_folder() {
        let state = Shared::default();
        {
            let mut server = state.lock().await;
            server.markers.push(("garden".to_string(), "m1".to_string()));
            server.markers.push(("orchard".to_string(), "m1".to_string()));
        }
        let gateway = start_server(state.clone()).await;
        let id = FeatureId::new("m1");

        gateway.list_markers(&folder("orchard")).await.unwrap();
        gateway
            .delete_feature(&folder("garden"), FeatureKind::Marker, &id)
            .await
            .unwrap();
        let again = gateway
            .delete_feature(&folder("garden"), FeatureKind::Marker, &id)
            .await;
        assert!(matches!(again, Err(GatewayError::NotFound(_))));

        let server = state.lock().await;
        assert_eq!(server.markers, [("orchard".to_string(), "m1".to_string())]);
        assert_eq!(
            server
                .requests
                .iter()
                .filter(|r| *r == "POST /delete_marker")
                .count(),
            1
        );
    }

    #[test]
    fn test_url_joining() {
        let gateway = HttpGateway::new("http://localhost:5000/").unwrap();
        assert_eq!(gateway.url("/markers/a"), "http://localhost:5000/markers/a");
        assert_eq!(
            gateway.url("img/a/photo.png"),
            "http://localhost:5000/img/a/photo.png"
        );
        assert_eq!(gateway.url("https://cdn/x.png"), "https://cdn/x.png");
    }
}
