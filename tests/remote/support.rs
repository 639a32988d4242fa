//! A fake backend serving both the `/api/db` storage routes and the compute
//! routes from shared in-process tables.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Default)]
pub struct Tables {
    pub snapshots: HashMap<String, Value>,
    pub search_sets: HashMap<String, Value>,
    pub pings: usize,
    pub uploads: usize,
    pub uploads_in_flight: usize,
    pub peak_uploads: usize,
    pub cav_bodies: Vec<Value>,
}

pub type Shared = Arc<Mutex<Tables>>;

pub struct FakeBackend {
    pub url: String,
    pub tables: Shared,
}

impl FakeBackend {
    pub fn pings(&self) -> usize {
        self.tables.lock().unwrap().pings
    }

    pub fn uploads(&self) -> usize {
        self.tables.lock().unwrap().uploads
    }

    /// Most uploads seen in progress at once.
    pub fn peak_uploads(&self) -> usize {
        self.tables.lock().unwrap().peak_uploads
    }

    pub fn snapshot(&self, snapshot_id: &str) -> Option<Value> {
        self.tables.lock().unwrap().snapshots.get(snapshot_id).cloned()
    }

    pub fn insert_snapshot(&self, data: Value) {
        let id = data["snapshotId"].as_str().unwrap().to_string();
        self.tables.lock().unwrap().snapshots.insert(id, data);
    }

    pub fn last_cav_body(&self) -> Option<Value> {
        self.tables.lock().unwrap().cav_bodies.last().cloned()
    }
}

/// Bind to port 0 and return the backend with its actual address.
pub async fn start_backend() -> FakeBackend {
    let tables = Shared::default();
    let app = router(tables.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeBackend {
        url: format!("http://{addr}"),
        tables,
    }
}

fn router(tables: Shared) -> Router {
    Router::new()
        .route("/api/db/get_snapshot", get(get_snapshot))
        .route("/api/db/set_snapshot", post(set_snapshot))
        .route("/api/db/delete_snapshot", post(delete_snapshot))
        .route(
            "/api/db/get_all_snapshots_for_project_including_snapshot",
            get(list_snapshots),
        )
        .route("/api/db/get_user_projects_summary", get(projects_summary))
        .route("/api/db/get_search_sets", get(get_search_sets))
        .route("/api/db/get_search_set", get(get_search_set))
        .route("/api/db/set_search_set", post(set_search_set))
        .route("/api/db/delete_search_set", post(delete_search_set))
        .route(
            "/api/db/copy_snapshot_to_new_project",
            post(copy_snapshot),
        )
        .route("/api/ping_cav_server", get(ping))
        .route("/api/upload_image", post(upload_image))
        .route("/api/generate_cav", post(generate_cav))
        .route("/api/crops", post(crops))
        .route("/api/image_set/:name", get(image_set))
        .with_state(tables)
}

type Params = Query<HashMap<String, String>>;

fn param<'a>(params: &'a Params, name: &str) -> &'a str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

fn one(data: Option<Value>) -> Response {
    match data {
        Some(data) => Json(json!({"result": {"data": data}})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn many(records: Vec<Value>) -> Response {
    let results: Vec<Value> = records.into_iter().map(|data| json!({"data": data})).collect();
    Json(json!({"results": results})).into_response()
}

async fn get_snapshot(State(tables): State<Shared>, params: Params) -> Response {
    let id = param(&params, "snapshotId");
    one(tables.lock().unwrap().snapshots.get(id).cloned())
}

async fn set_snapshot(State(tables): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let id = body["snapshotId"].as_str().unwrap_or_default().to_string();
    tables
        .lock()
        .unwrap()
        .snapshots
        .insert(id, body["snapshot"].clone());
    StatusCode::OK
}

async fn delete_snapshot(State(tables): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let id = body["snapshotId"].as_str().unwrap_or_default();
    match tables.lock().unwrap().snapshots.get_mut(id) {
        Some(data) => {
            data["deleted"] = json!(true);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn list_snapshots(State(tables): State<Shared>, params: Params) -> Response {
    let tables = tables.lock().unwrap();
    let Some(anchor) = tables.snapshots.get(param(&params, "snapshotId")) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let project_id = anchor["projectId"].clone();
    many(
        tables
            .snapshots
            .values()
            .filter(|data| data["projectId"] == project_id)
            .cloned()
            .collect(),
    )
}

async fn projects_summary(State(tables): State<Shared>) -> Json<Value> {
    let tables = tables.lock().unwrap();
    let results: Vec<Value> = tables
        .snapshots
        .values()
        .map(|data| {
            json!({
                "id": data["projectId"],
                "latestSnapshot": {
                    "id": data["snapshotId"],
                    "date": data["date"],
                    "name": data["name"],
                    "topImages": data["positiveSet"]["images"],
                }
            })
        })
        .collect();
    Json(json!({"results": results}))
}

async fn get_search_sets(State(tables): State<Shared>) -> Response {
    many(tables.lock().unwrap().search_sets.values().cloned().collect())
}

async fn get_search_set(State(tables): State<Shared>, params: Params) -> Response {
    let id = param(&params, "searchSetId");
    one(tables.lock().unwrap().search_sets.get(id).cloned())
}

async fn set_search_set(State(tables): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let id = body["searchSetId"].as_str().unwrap_or_default().to_string();
    let mut set = body["searchSet"].clone();
    set["owner"] = json!("tester");
    tables.lock().unwrap().search_sets.insert(id, set);
    StatusCode::OK
}

async fn delete_search_set(State(tables): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let id = body["searchSetId"].as_str().unwrap_or_default();
    match tables.lock().unwrap().search_sets.get_mut(id) {
        Some(data) => {
            data["deleted"] = json!(true);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn copy_snapshot(State(tables): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let mut tables = tables.lock().unwrap();
    let Some(source) = tables
        .snapshots
        .get(body["srcSnapshotId"].as_str().unwrap_or_default())
        .cloned()
    else {
        return StatusCode::NOT_FOUND;
    };
    let mut copy = source;
    copy["projectId"] = body["dstProjectId"].clone();
    copy["snapshotId"] = body["dstSnapshotId"].clone();
    copy["name"] = body["dstName"].clone();
    let id = body["dstSnapshotId"].as_str().unwrap_or_default().to_string();
    tables.snapshots.insert(id, copy);
    StatusCode::OK
}

async fn ping(State(tables): State<Shared>) -> Json<Value> {
    tables.lock().unwrap().pings += 1;
    Json(json!({"ok": true}))
}

async fn upload_image(State(tables): State<Shared>, Json(body): Json<Value>) -> Response {
    let thumbnail = body["data224"].as_str().unwrap_or_default();
    let full = body["data1200"].as_str().unwrap_or_default();
    if !thumbnail.starts_with("data:image/png;base64,")
        || !full.starts_with("data:image/jpeg;base64,")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "expected data URIs"})),
        )
            .into_response();
    }
    {
        let mut tables = tables.lock().unwrap();
        tables.uploads_in_flight += 1;
        tables.peak_uploads = tables.peak_uploads.max(tables.uploads_in_flight);
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut tables = tables.lock().unwrap();
    tables.uploads_in_flight -= 1;
    tables.uploads += 1;
    Json(json!({"id": format!("up-{}", tables.uploads), "user_generated": true})).into_response()
}

async fn generate_cav(State(tables): State<Shared>, Json(body): Json<Value>) -> Response {
    tables.lock().unwrap().cav_bodies.push(body.clone());
    let positives = body["positive_images"].as_array().cloned().unwrap_or_default();
    if positives.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "no positive images"})),
        )
            .into_response();
    }
    let results: Vec<Value> = positives
        .iter()
        .map(|image| json!({"id": image["id"], "user_generated": image["user_generated"]}))
        .collect();
    Json(json!({
        "result_images": results,
        "cav_id": "cav-remote",
        "cav_string": format!("{}:remote", body["model_layer"].as_str().unwrap_or_default()),
    }))
    .into_response()
}

async fn crops() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn image_set(Path(name): Path<String>) -> Response {
    if name != cavstudio::NEGATIVE_DATASET {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": format!("no image set {name}")})),
        )
            .into_response();
    }
    let images: Vec<Value> = (0..10)
        .map(|i| json!({"id": format!("scout-{i}"), "weight": 1, "enabled": true, "user_generated": false}))
        .collect();
    Json(json!({"images": images})).into_response()
}
