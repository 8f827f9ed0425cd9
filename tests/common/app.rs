//! Test application factory for integration tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

use inkframe::models::AppConfig;
use inkframe::panel::{BoxedBus, SimulatedPanel, SimulatedPanelLog};
use inkframe::server::{build_router, create_app_state, AppState};

use super::fixtures;

/// Test application with router and direct access to the simulated panel
pub struct TestApp {
    router: axum::Router,
    pub state: AppState,
    pub panel: SimulatedPanelLog,
    preview_dir: TempDir,
}

impl TestApp {
    /// Create a test application on a default simulated panel
    pub fn new() -> Self {
        Self::with_panel(SimulatedPanel::new(), |_| {})
    }

    /// Create a test application on `panel`, letting the caller adjust the
    /// config first. Previews always go to a fresh temporary directory.
    pub fn with_panel(panel: SimulatedPanel, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let preview_dir = tempfile::tempdir().expect("Failed to create preview dir");

        let mut config = AppConfig::default();
        config.upload.preview_dir = Some(preview_dir.path().to_path_buf());
        configure(&mut config);

        let log = panel.log();
        let bus: BoxedBus = Box::new(panel);
        let state = create_app_state(&config, bus).expect("Failed to create app state");

        // Build router using shared server module (same as production)
        let router = build_router(state.clone());

        Self {
            router,
            state,
            panel: log,
            preview_dir,
        }
    }

    pub fn preview_dir(&self) -> &Path {
        self.preview_dir.path()
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a multipart form with a single file field
    pub async fn upload(
        &self,
        field: &str,
        content_type: &str,
        data: &[u8],
    ) -> TestResponse {
        let (boundary, body) = fixtures::multipart_body(field, "photo", content_type, data);
        let request = Request::post("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.request(request).await
    }

    /// POST a PNG in the `file` field
    pub async fn upload_png(&self, png: &[u8]) -> TestResponse {
        self.upload("file", "image/png", png).await
    }

    /// Send a request to the router
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Check if response is a PNG image
    pub fn is_png(&self) -> bool {
        self.body.len() >= 8 && &self.body[0..8] == b"\x89PNG\r\n\x1a\n"
    }
}
