//! REST client for out-of-band setup and teardown
//!
//! Journeys seed and clean entities through `/api/v2` directly so the UI
//! under test only ever performs the action being tested.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::server::HEALTH_PATH;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub conn_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagRun {
    pub dag_run_id: String,
    pub dag_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub logical_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub dag_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobCollection {
    jobs: Vec<Job>,
}

/// Authenticated client for the server's public API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> E2eResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: Url::parse(base_url)?,
            token: None,
        })
    }

    /// Client carrying a bearer token from `POST /auth/token`
    pub async fn login(base_url: &str, username: &str, password: &str, timeout: Duration) -> E2eResult<Self> {
        let mut api = Self::new(base_url, timeout)?;
        let token: TokenResponse = api
            .send(
                api.request(Method::POST, &["auth", "token"])?
                    .json(&json!({ "username": username, "password": password })),
            )
            .await?;
        api.token = Some(token.access_token);
        debug!("Obtained API token for {}", username);
        Ok(api)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL from raw path segments. Each segment is percent-encoded, so run ids
    /// containing `:` or `+` survive.
    pub fn url(&self, segments: &[&str]) -> E2eResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| E2eError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> E2eResult<RequestBuilder> {
        let url = self.url(segments)?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn v2(&self, method: Method, segments: &[&str]) -> E2eResult<RequestBuilder> {
        let mut path = vec!["api", "v2"];
        path.extend_from_slice(segments);
        self.request(method, &path)
    }

    /// Send and require a 2xx status, keeping the body of failures
    async fn send_raw(&self, builder: RequestBuilder) -> E2eResult<(StatusCode, String)> {
        let request = builder.build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} {} -> {}", method, url, status);

        if !status.is_success() {
            return Err(E2eError::Api {
                method,
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok((status, body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> E2eResult<T> {
        let (_, body) = self.send_raw(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// DELETE that treats 404 as already gone. Returns whether something was deleted.
    async fn delete(&self, segments: &[&str]) -> E2eResult<bool> {
        match self.send_raw(self.v2(Method::DELETE, segments)?).await {
            Ok(_) => Ok(true),
            Err(E2eError::Api { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn health(&self) -> E2eResult<serde_json::Value> {
        let segments: Vec<&str> = HEALTH_PATH.trim_start_matches('/').split('/').collect();
        self.send(self.request(Method::GET, &segments)?).await
    }

    pub async fn create_connection(&self, connection: &Connection) -> E2eResult<Connection> {
        self.send(self.v2(Method::POST, &["connections"])?.json(connection))
            .await
    }

    pub async fn get_connection(&self, connection_id: &str) -> E2eResult<Option<Connection>> {
        match self.send(self.v2(Method::GET, &["connections", connection_id])?).await {
            Ok(connection) => Ok(Some(connection)),
            Err(E2eError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_connection(&self, connection_id: &str) -> E2eResult<bool> {
        self.delete(&["connections", connection_id]).await
    }

    pub async fn unpause_dag(&self, dag_id: &str) -> E2eResult<()> {
        let _: serde_json::Value = self
            .send(
                self.v2(Method::PATCH, &["dags", dag_id])?
                    .json(&json!({ "is_paused": false })),
            )
            .await?;
        Ok(())
    }

    pub async fn trigger_dag_run(
        &self,
        dag_id: &str,
        dag_run_id: &str,
        logical_date: &str,
    ) -> E2eResult<DagRun> {
        self.send(
            self.v2(Method::POST, &["dags", dag_id, "dagRuns"])?
                .json(&json!({ "dag_run_id": dag_run_id, "logical_date": logical_date })),
        )
        .await
    }

    pub async fn get_dag_run(&self, dag_id: &str, dag_run_id: &str) -> E2eResult<DagRun> {
        self.send(self.v2(Method::GET, &["dags", dag_id, "dagRuns", dag_run_id])?)
            .await
    }

    /// Force a run into a terminal state (`success` / `failed` / `queued`)
    pub async fn patch_dag_run_state(&self, dag_id: &str, dag_run_id: &str, state: &str) -> E2eResult<DagRun> {
        self.send(
            self.v2(Method::PATCH, &["dags", dag_id, "dagRuns", dag_run_id])?
                .json(&json!({ "state": state })),
        )
        .await
    }

    pub async fn delete_dag_run(&self, dag_id: &str, dag_run_id: &str) -> E2eResult<bool> {
        self.delete(&["dags", dag_id, "dagRuns", dag_run_id]).await
    }

    pub async fn list_jobs(&self, limit: usize) -> E2eResult<Vec<Job>> {
        let builder = self
            .v2(Method::GET, &["jobs"])?
            .query(&[("limit", limit.to_string())]);
        let jobs: JobCollection = self.send(builder).await?;
        Ok(jobs.jobs)
    }
}
