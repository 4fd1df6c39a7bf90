//! `reqwest`-backed implementation of [`BackendClient`].

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use tracing::{debug, instrument};

use crate::candidate::UploadCandidate;
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError, IngestError};

use super::sse::SseDecoder;
use super::types::{DuplicateCheckResult, PersistResponse, TaskEvent, UploadHistoryEntry};
use super::{BackendClient, PersistOptions, TaskEventStream};

const USER_AGENT: &str = concat!("reportflow/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the report backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, IngestError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            base_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_part(candidate: &UploadCandidate) -> Result<Part, ApiError> {
        let mut part = Part::bytes(candidate.file.bytes.clone())
            .file_name(candidate.file.name.clone());
        if let Some(mime) = &candidate.file.mime_type {
            part = part.mime_str(mime)?;
        }
        Ok(part)
    }

    async fn ensure_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    #[instrument(skip(self, candidate), fields(file = %candidate.file.name))]
    async fn check_duplicate(
        &self,
        candidate: &UploadCandidate,
    ) -> Result<DuplicateCheckResult, ApiError> {
        let form = Form::new().part("file", Self::file_part(candidate)?);
        let response = self
            .client
            .post(self.url("/reports/upload/check-duplicate"))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let result: DuplicateCheckResult = response.json().await?;
        debug!(is_duplicate = result.is_duplicate, "Duplicate check done");
        Ok(result)
    }

    #[instrument(skip(self, candidate, options), fields(file = %candidate.file.name, force = options.force_import))]
    async fn persist(
        &self,
        candidate: &UploadCandidate,
        options: &PersistOptions,
    ) -> Result<PersistResponse, ApiError> {
        let mut query: Vec<(&str, String)> = vec![
            ("use_llm", candidate.parse_mode.use_llm().to_string()),
            ("force_import", options.force_import.to_string()),
        ];
        if let Some(year) = options.override_year {
            query.push(("override_year", year.to_string()));
        }
        if let Some(week) = &options.override_week {
            query.push(("override_week", week.clone()));
        }
        if let Some(category) = &options.override_category {
            query.push(("override_category", category.clone()));
        }
        if let Some(user) = &options.created_by {
            query.push(("created_by", user.clone()));
        }

        let form = Form::new().part("file", Self::file_part(candidate)?);
        let response = self
            .client
            .post(self.url("/reports/upload/persist"))
            .timeout(self.request_timeout)
            .query(&query)
            .multipart(form)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    // The stream is long-lived, so the per-request timeout does not apply.
    #[instrument(skip(self))]
    async fn task_events(&self, task_id: &str) -> Result<TaskEventStream, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{task_id}/stream")))
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        struct StreamState {
            bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
            decoder: SseDecoder,
            pending: VecDeque<String>,
            done: bool,
        }

        let state = StreamState {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(payload) = state.pending.pop_front() {
                    let item = serde_json::from_str::<TaskEvent>(&payload).map_err(ApiError::Decode);
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.feed(&chunk));
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(ApiError::Transport(e)), state));
                    }
                    None => {
                        state.done = true;
                        return None;
                    }
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn upload_history(&self) -> Result<Vec<UploadHistoryEntry>, ApiError> {
        let response = self
            .client
            .get(self.url("/reports/uploads"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }
}
