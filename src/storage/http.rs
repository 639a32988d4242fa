use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{DecodeError, TransportError};
use crate::snapshot::{CustomSearchSet, ProjectSnapshot};

use super::{CopySnapshot, ProjectStorage, ProjectSummary};

#[derive(Deserialize)]
struct Record {
    data: Value,
}

#[derive(Deserialize)]
struct One {
    result: Record,
}

#[derive(Deserialize)]
struct Many<T> {
    results: Vec<T>,
}

/// Client for the `/api/db` storage endpoints.
#[derive(Clone)]
pub struct HttpProjectStorage {
    base_url: String,
    client: Client,
}

impl HttpProjectStorage {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            base_url: server_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/db/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        debug!(path, "storage GET");
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(network)?;
        check(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DecodeError::Invalid(e.to_string()).into())
    }

    async fn post(&self, path: &str, body: Value) -> Result<(), TransportError> {
        debug!(path, "storage POST");
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        check(response).await?;
        Ok(())
    }
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

async fn check(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(TransportError::NotFound(response.url().path().to_string()));
    }
    Err(TransportError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

fn is_deleted(data: &Value) -> bool {
    data.get("deleted").and_then(Value::as_bool).unwrap_or(false)
}

fn search_set_from(data: Value) -> Result<CustomSearchSet, TransportError> {
    let set: CustomSearchSet = serde_json::from_value(data).map_err(DecodeError::from)?;
    set.validate()?;
    Ok(set)
}

#[async_trait]
impl ProjectStorage for HttpProjectStorage {
    async fn get_snapshot(&self, snapshot_id: &str) -> Result<ProjectSnapshot, TransportError> {
        let one: One = self
            .get("get_snapshot", &[("snapshotId", snapshot_id)])
            .await?;
        Ok(ProjectSnapshot::from_value(one.result.data)?)
    }

    async fn set_snapshot(
        &self,
        _project_id: &str,
        snapshot_id: &str,
        content: &ProjectSnapshot,
    ) -> Result<(), TransportError> {
        self.post(
            "set_snapshot",
            json!({"snapshotId": snapshot_id, "snapshot": content}),
        )
        .await
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), TransportError> {
        self.post("delete_snapshot", json!({"snapshotId": snapshot_id}))
            .await
    }

    async fn list_snapshots_for_project(
        &self,
        snapshot_id: &str,
    ) -> Result<Vec<ProjectSnapshot>, TransportError> {
        let many: Many<Record> = self
            .get(
                "get_all_snapshots_for_project_including_snapshot",
                &[("snapshotId", snapshot_id)],
            )
            .await?;
        let mut snapshots = many
            .results
            .into_iter()
            .map(|record| ProjectSnapshot::from_value(record.data))
            .collect::<Result<Vec<_>, DecodeError>>()?;
        snapshots.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(snapshots)
    }

    async fn get_user_projects_summary(&self) -> Result<Vec<ProjectSummary>, TransportError> {
        let many: Many<ProjectSummary> = self.get("get_user_projects_summary", &[]).await?;
        Ok(many.results)
    }

    async fn get_search_sets(&self) -> Result<Vec<CustomSearchSet>, TransportError> {
        let many: Many<Record> = self.get("get_search_sets", &[]).await?;
        many.results
            .into_iter()
            .filter(|record| !is_deleted(&record.data))
            .map(|record| search_set_from(record.data))
            .collect()
    }

    async fn get_search_set(&self, search_set_id: &str) -> Result<CustomSearchSet, TransportError> {
        let one: One = self
            .get("get_search_set", &[("searchSetId", search_set_id)])
            .await?;
        search_set_from(one.result.data)
    }

    async fn set_search_set(
        &self,
        search_set_id: &str,
        content: &CustomSearchSet,
    ) -> Result<(), TransportError> {
        self.post(
            "set_search_set",
            json!({"searchSetId": search_set_id, "searchSet": content}),
        )
        .await
    }

    async fn delete_search_set(&self, search_set_id: &str) -> Result<(), TransportError> {
        self.post("delete_search_set", json!({"searchSetId": search_set_id}))
            .await
    }

    async fn copy_snapshot_to_new_project(
        &self,
        copy: &CopySnapshot,
    ) -> Result<(), TransportError> {
        self.post("copy_snapshot_to_new_project", json!(copy)).await
    }
}
