use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{DecodeError, TransportError};
use crate::image::{ServerImage, TrainingImageRecord, UploadPayload};
use crate::lock::{Mutex, Semaphore};

use super::{image_url, CavRequest, CavResult, CavServer, CropsResponse, ImageFormat};

/// Client for the compute server's `/api` endpoints.
///
/// Uploads are bounded by a semaphore. The session check runs once, under a
/// mutex, before the first request.
pub struct HttpCavServer {
    base_url: String,
    search_dataset: String,
    client: Client,
    uploads: Semaphore,
    session_gate: Mutex,
    session_ready: parking_lot::Mutex<bool>,
}

#[derive(Deserialize)]
struct ImageSetResponse {
    images: Vec<TrainingImageRecord>,
}

impl HttpCavServer {
    pub fn new(config: &SyncConfig) -> Self {
        HttpCavServer {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            search_dataset: config.search_dataset.clone(),
            client: Client::new(),
            uploads: Semaphore::new(config.upload_concurrency),
            session_gate: Mutex::new(),
            session_ready: parking_lot::Mutex::new(false),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn image_url(&self, image: &ServerImage, format: ImageFormat) -> String {
        image_url(&self.base_url, image, format)
    }

    pub fn cav_url(&self, cav_id: &str) -> String {
        format!("{}/media/cavs/{}.cav", self.base_url, cav_id)
    }

    async fn ensure_session(&self) -> Result<(), TransportError> {
        self.session_gate
            .run_exclusive(|| async {
                if *self.session_ready.lock() {
                    return Ok(());
                }
                self.send(Method::GET, "/api/ping_cav_server", None).await?;
                info!(server = %self.base_url, "compute server session ready");
                *self.session_ready.lock() = true;
                Ok(())
            })
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, TransportError> {
        self.ensure_session().await?;
        let response = self.send(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DecodeError::Invalid(e.to_string()).into())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, TransportError> {
        debug!(%method, path, "compute request");
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string));
        Err(match detail {
            Some(detail) => TransportError::Detail {
                status: status.as_u16(),
                detail,
            },
            None => TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            },
        })
    }
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn generate_cav_body(request: &CavRequest, search_dataset: &str) -> Value {
    let mut body = json!({
        "positive_images": request.positive_images,
        "negative_images": request.negative_images,
        "model_layer": request.model_layer.as_str(),
    });
    match &request.search_images {
        Some(images) => {
            let ids: Vec<Value> = images.iter().map(|i| json!({"id": i.id})).collect();
            body["search_images"] = Value::Array(ids);
            body["search_set"] = json!("custom");
        }
        None => body["search_set"] = json!(search_dataset),
    }
    body
}

#[async_trait]
impl CavServer for HttpCavServer {
    async fn upload_image(&self, payload: &UploadPayload) -> Result<ServerImage, TransportError> {
        self.uploads
            .run(|| async {
                let body = json!({
                    "data224": data_uri("image/png", &payload.thumbnail_png),
                    "data1200": data_uri("image/jpeg", &payload.full_jpeg),
                });
                self.request(Method::POST, "/api/upload_image", Some(body))
                    .await
            })
            .await
    }

    async fn generate_cav(&self, request: &CavRequest) -> Result<CavResult, TransportError> {
        let body = generate_cav_body(request, &self.search_dataset);
        self.request(Method::POST, "/api/generate_cav", Some(body))
            .await
    }

    async fn get_image_crops(
        &self,
        image: &ServerImage,
        cav_id: &str,
    ) -> Result<CropsResponse, TransportError> {
        let body = json!({"image": image, "cav_id": cav_id});
        self.request(Method::POST, "/api/crops", Some(body)).await
    }

    async fn get_image_set(&self, name: &str) -> Result<Vec<TrainingImageRecord>, TransportError> {
        let response: ImageSetResponse = self
            .request(Method::GET, &format!("/api/image_set/{name}"), None)
            .await?;
        Ok(response.images)
    }
}
