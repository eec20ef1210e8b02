//! reqwest-backed client for the remote REST endpoints.

use railsync_core::{Attachment, AttachmentBody, CaseId, ProjectId, ResultEntry, ResultId, RunId};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use async_trait::async_trait;

use crate::api::RunApi;
use crate::error::ClientError;
use crate::types::{
    AddResultsRequest, Run, RunPayload, RunTest, SubmittedResult, UpdateRunRequest, User,
};

/// Client for a TestRail-style REST API.
///
/// All endpoints hang off `index.php?/api/v2/` and authenticate with
/// basic auth.
pub struct TestRailClient {
    inner: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl TestRailClient {
    /// Create a new client for the given host and credentials.
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: host.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/index.php?/api/v2/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), body));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path);
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl RunApi for TestRailClient {
    async fn get_current_user(&self) -> Result<User, ClientError> {
        self.get_json("get_current_user").await
    }

    async fn get_run(&self, run_id: RunId) -> Result<Run, ClientError> {
        self.get_json(&format!("get_run/{run_id}")).await
    }

    async fn add_run(
        &self,
        project_id: ProjectId,
        payload: &RunPayload,
    ) -> Result<Run, ClientError> {
        self.post_json(&format!("add_run/{project_id}"), payload)
            .await
    }

    async fn update_run(&self, run_id: RunId, case_ids: &[CaseId]) -> Result<Run, ClientError> {
        self.post_json(
            &format!("update_run/{run_id}"),
            &UpdateRunRequest { case_ids },
        )
        .await
    }

    async fn close_run(&self, run_id: RunId) -> Result<Run, ClientError> {
        self.post_json(&format!("close_run/{run_id}"), &serde_json::json!({}))
            .await
    }

    async fn get_tests(&self, run_id: RunId) -> Result<Vec<RunTest>, ClientError> {
        self.get_json(&format!("get_tests/{run_id}")).await
    }

    async fn add_results_for_cases(
        &self,
        run_id: RunId,
        entries: &[ResultEntry],
    ) -> Result<Vec<SubmittedResult>, ClientError> {
        self.post_json(
            &format!("add_results_for_cases/{run_id}"),
            &AddResultsRequest { results: entries },
        )
        .await
    }

    async fn add_attachment_to_result(
        &self,
        result_id: ResultId,
        attachment: &Attachment,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("add_attachment_to_result/{result_id}"));
        debug!(url = %url, name = %attachment.name, "uploading attachment");

        let bytes = match &attachment.body {
            AttachmentBody::Path(path) => tokio::fs::read(path).await?,
            AttachmentBody::Bytes(bytes) => bytes.clone(),
        };
        let part = Part::bytes(bytes)
            .file_name(attachment.name.clone())
            .mime_str(&attachment.content_type)?;
        let form = Form::new().part("attachment", part);

        let response = self
            .inner
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), body));
        }
        Ok(())
    }
}
