//! Assist collaborators: page audit, UI critique, design critique, component
//! generation and refactoring.
//!
//! The workspace only knows the request/response contracts below. Calls are
//! never retried; each failure surfaces as one `AssistError`. A newer call in
//! the same `AssistSlot` supersedes an older one still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AssistConfig;
use crate::rewrite::is_local_target;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch page HTML: {0}")]
    PageFetch(String),

    #[error("Assist call failed: {0}")]
    Service(String),

    #[error("Superseded by a newer request")]
    Superseded,
}

pub type AssistResult<T> = std::result::Result<T, AssistError>;

// ─── Contracts ────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub description: String,
    pub suggestion: String,
}

/// Input to audit and UI critique. HTML, when present, takes precedence
/// over the URL for analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysisRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub accessibility_issues: Vec<Issue>,
    pub performance_issues: Vec<Issue>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueResponse {
    pub ui_issues: Vec<Issue>,
}

/// Audit and critique merged into one report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub accessibility_issues: Vec<Issue>,
    pub performance_issues: Vec<Issue>,
    pub ui_issues: Vec<Issue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> AssistResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(AssistError::InvalidInput("Prompt is empty".into()));
        }
        Ok(Self { prompt })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub component_name: String,
    pub code: String,
    pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorRequest {
    pub code: String,
    pub instructions: String,
}

impl RefactorRequest {
    pub fn new(code: impl Into<String>, instructions: impl Into<String>) -> AssistResult<Self> {
        let (code, instructions) = (code.into(), instructions.into());
        if code.trim().is_empty() {
            return Err(AssistError::InvalidInput("Code is empty".into()));
        }
        if instructions.trim().is_empty() {
            return Err(AssistError::InvalidInput("Instructions are empty".into()));
        }
        Ok(Self { code, instructions })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorResponse {
    pub refactored_code: String,
    pub explanation: String,
}

/// Screenshot critique. The image is a base64 data URI with a MIME type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignCritiqueRequest {
    pub image_data_uri: String,
    pub prompt: String,
}

impl DesignCritiqueRequest {
    pub fn new(image_data_uri: impl Into<String>, prompt: impl Into<String>) -> AssistResult<Self> {
        let (image_data_uri, prompt) = (image_data_uri.into(), prompt.into());
        let well_formed = image_data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .is_some_and(|(mime, data)| !mime.is_empty() && !data.is_empty());
        if !well_formed {
            return Err(AssistError::InvalidInput(
                "Image must be a base64 data URI with a MIME type".into(),
            ));
        }
        if prompt.trim().is_empty() {
            return Err(AssistError::InvalidInput("Prompt is empty".into()));
        }
        Ok(Self {
            image_data_uri,
            prompt,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignCritiqueResponse {
    pub critique: String,
}

// ─── Ports ────────────────────────────────────────────────────

#[async_trait]
pub trait AssistService: Send + Sync {
    async fn audit(&self, request: &PageAnalysisRequest) -> AssistResult<AuditResponse>;
    async fn critique_ui(&self, request: &PageAnalysisRequest) -> AssistResult<CritiqueResponse>;
    async fn critique_design(
        &self,
        request: &DesignCritiqueRequest,
    ) -> AssistResult<DesignCritiqueResponse>;
    async fn generate(&self, request: &GenerateRequest) -> AssistResult<GenerateResponse>;
    async fn refactor(&self, request: &RefactorRequest) -> AssistResult<RefactorResponse>;
}

/// Raw HTML for targets the assist service cannot reach itself.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> AssistResult<String>;
}

// ─── HTTP implementations ─────────────────────────────────────

/// JSON-over-HTTP assist service: `POST {base}/{flow}`.
pub struct HttpAssistClient {
    client: Client,
    base_url: String,
}

impl HttpAssistClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AssistResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistError::Service(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AssistConfig) -> AssistResult<Self> {
        Self::new(&config.base_url, config.timeout)
    }

    async fn call<Req, Resp>(&self, flow: &str, request: &Req) -> AssistResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, flow);
        tracing::debug!("Assist call {}", flow);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AssistError::Service(format!("{flow}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Assist call {} failed with {}", flow, status);
            let detail = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(AssistError::Service(format!("{flow}: {detail}")));
        }
        response
            .json()
            .await
            .map_err(|e| AssistError::Service(format!("{flow}: invalid response: {e}")))
    }
}

#[async_trait]
impl AssistService for HttpAssistClient {
    async fn audit(&self, request: &PageAnalysisRequest) -> AssistResult<AuditResponse> {
        self.call("audit", request).await
    }

    async fn critique_ui(&self, request: &PageAnalysisRequest) -> AssistResult<CritiqueResponse> {
        self.call("critique-ui", request).await
    }

    async fn critique_design(
        &self,
        request: &DesignCritiqueRequest,
    ) -> AssistResult<DesignCritiqueResponse> {
        self.call("critique-design", request).await
    }

    async fn generate(&self, request: &GenerateRequest) -> AssistResult<GenerateResponse> {
        self.call("generate", request).await
    }

    async fn refactor(&self, request: &RefactorRequest) -> AssistResult<RefactorResponse> {
        self.call("refactor", request).await
    }
}

/// Fetches raw HTML through the host's `/fetch-html` route.
pub struct FetchHtmlClient {
    client: Client,
    host_base: String,
}

impl FetchHtmlClient {
    pub fn new(host_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host_base: host_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PageSource for FetchHtmlClient {
    async fn fetch_html(&self, url: &str) -> AssistResult<String> {
        let response = self
            .client
            .get(format!("{}/fetch-html", self.host_base))
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| AssistError::PageFetch(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssistError::PageFetch(e.to_string()))?;
        if !status.is_success() {
            return Err(AssistError::PageFetch(if body.is_empty() {
                status.to_string()
            } else {
                body
            }));
        }
        Ok(body)
    }
}

// ─── Orchestration ────────────────────────────────────────────

/// Audit and critique one page concurrently. Local targets are fetched
/// first and their HTML is sent along with the URL.
pub async fn audit_page(
    service: &dyn AssistService,
    pages: &dyn PageSource,
    target: &str,
) -> AssistResult<PageReport> {
    if target.trim().is_empty() {
        return Err(AssistError::InvalidInput("URL is empty".into()));
    }
    let mut request = PageAnalysisRequest {
        url: Some(target.to_string()),
        html_content: None,
    };
    if is_local_target(target) {
        tracing::debug!("Fetching local page {} for audit", target);
        request.html_content = Some(pages.fetch_html(target).await?);
    }

    let (audit, critique) =
        tokio::try_join!(service.audit(&request), service.critique_ui(&request))?;

    Ok(PageReport {
        accessibility_issues: audit.accessibility_issues,
        performance_issues: audit.performance_issues,
        ui_issues: critique.ui_issues,
    })
}

// ─── Supersession ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct SlotState {
    issued: AtomicU64,
    settled: AtomicU64,
}

/// One logical assist call site (the generator, the audit dialog). Only the
/// most recently started call may deliver a result.
#[derive(Clone, Debug, Default)]
pub struct AssistSlot {
    state: Arc<SlotState>,
}

impl AssistSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the most recent call has not completed yet.
    pub fn is_pending(&self) -> bool {
        self.state.issued.load(Ordering::SeqCst) != self.state.settled.load(Ordering::SeqCst)
    }

    /// Run `call` in this slot. Its result is replaced by `Superseded` if a
    /// newer call started before it finished.
    pub async fn run<T, F>(&self, call: F) -> AssistResult<T>
    where
        F: std::future::Future<Output = AssistResult<T>>,
    {
        let generation = self.state.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = call.await;
        if self.state.issued.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding superseded assist result");
            return Err(AssistError::Superseded);
        }
        self.state.settled.store(generation, Ordering::SeqCst);
        result
    }
}
