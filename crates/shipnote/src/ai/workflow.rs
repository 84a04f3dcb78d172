//! The summarization workflow: cache, availability gate, session, passes.
//!
//! ```text
//! Idle ─► CacheCheck ──hit──► Done (from cache)
//!             │
//!             ▼
//!      AvailabilityCheck ──Unsupported──► Aborted (NotAvailable)
//!        │        │
//!      Ready   NeedsDownload / Downloading
//!        │        ├─ not confirmed ──► NeedsConfirmation (returned to caller)
//!        │        ├─ Downloading + confirmed ──► Aborted (StillDownloading)
//!        │        └─ NeedsDownload + confirmed ─┐
//!        ▼                                      ▼
//!   Summarizing ──ok──► Done (cached)   ──err──► Aborted (session invalidated)
//! ```
//!
//! Confirmation is a two-phase protocol: the workflow returns
//! [`SummarizationResult::NeedsConfirmation`] and the caller re-invokes with
//! `user_confirmed = true` once it has collected consent. Nothing inside the
//! workflow blocks on a prompt.
//!
//! Only one invocation runs at a time per workflow. The whole call holds an
//! async mutex, which also makes the cache read-then-write atomic with
//! respect to other callers.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::availability::{AvailabilityProber, AvailabilityStatus};
use super::cache::SummaryCache;
use super::capability::{SessionConfig, SummarizerCapability, SummarizerSession};
use super::chunk::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHARS, chunk_commits, truncate_commits, truncate_text,
};
use super::session::SessionManager;
use crate::store::KvStore;

// ── Results and errors ─────────────────────────────────────────────

/// Which download situation requires the caller's consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// The model has not been downloaded yet.
    BeforeDownload,
    /// A download is already running.
    AfterDownload,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeDownload => "before-download",
            Self::AfterDownload => "after-download",
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one [`SummarizationWorkflow::summarize`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizationResult {
    /// The caller must ask the user and re-invoke with confirmation.
    NeedsConfirmation(ConfirmationStatus),
    /// A summary, either fresh or from the cache.
    Success { text: String, from_cache: bool },
}

/// Failures surfaced by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    #[error("No commits to summarize")]
    NoCommits,
    #[error("Summarizer not available: {0}")]
    NotAvailable(String),
    #[error(
        "AI model is still downloading. Please wait a few minutes and try again. \
         Run `shipnote ai-status` to check progress."
    )]
    StillDownloading,
    #[error("Failed to summarize: {0}")]
    SummarizationFailed(String),
}

/// Identifies a tag range for caching. Any empty field disables caching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryKey {
    pub project: String,
    pub from_tag: String,
    pub to_tag: String,
}

impl SummaryKey {
    pub fn new(
        project: impl Into<String>,
        from_tag: impl Into<String>,
        to_tag: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            from_tag: from_tag.into(),
            to_tag: to_tag.into(),
        }
    }

    /// A key that never hits or populates the cache.
    pub fn uncached() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        !self.project.is_empty() && !self.from_tag.is_empty() && !self.to_tag.is_empty()
    }
}

/// UI-facing availability summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiStatus {
    /// The model can summarize right now.
    pub available: bool,
    /// Whether a "summarize" control should be offered.
    pub button_enabled: bool,
    pub status_message: String,
}

// ── Configuration ──────────────────────────────────────────────────

/// Tuning for the chunking and truncation passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// More commits than this switches to the chunked policy.
    pub chunk_threshold: usize,
    /// Commits per chunk.
    pub chunk_size: usize,
    /// Character budget for any single model input.
    pub max_input_chars: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 20,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_input_chars: DEFAULT_MAX_CHARS,
        }
    }
}

// ── Workflow ───────────────────────────────────────────────────────

/// Single-flight summarization over an injected capability.
pub struct SummarizationWorkflow {
    cache: SummaryCache,
    prober: AvailabilityProber,
    sessions: SessionManager,
    config: WorkflowConfig,
    flight: Mutex<()>,
}

impl SummarizationWorkflow {
    /// Assemble a workflow from its parts.
    pub fn new(cache: SummaryCache, prober: AvailabilityProber, sessions: SessionManager) -> Self {
        Self {
            cache,
            prober,
            sessions,
            config: WorkflowConfig::default(),
            flight: Mutex::new(()),
        }
    }

    /// Build a workflow with default session settings around `capability`.
    pub fn with_capability(
        store: Arc<dyn KvStore>,
        capability: Arc<dyn SummarizerCapability>,
    ) -> Self {
        Self::new(
            SummaryCache::new(store),
            AvailabilityProber::new(Some(capability.clone())),
            SessionManager::new(capability, SessionConfig::default()),
        )
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Summarize `commits` for the tag range in `key`.
    pub async fn summarize(
        &self,
        commits: &[String],
        key: &SummaryKey,
        user_confirmed: bool,
    ) -> Result<SummarizationResult, SummarizeError> {
        if commits.is_empty() {
            return Err(SummarizeError::NoCommits);
        }

        let _flight = self.flight.lock().await;

        if key.is_complete()
            && let Some(text) = self.cache.get(&key.project, &key.from_tag, &key.to_tag)
        {
            return Ok(SummarizationResult::Success {
                text,
                from_cache: true,
            });
        }

        match self.prober.probe().await {
            AvailabilityStatus::Ready => {}
            AvailabilityStatus::NeedsDownload if !user_confirmed => {
                return Ok(SummarizationResult::NeedsConfirmation(
                    ConfirmationStatus::BeforeDownload,
                ));
            }
            AvailabilityStatus::Downloading if !user_confirmed => {
                return Ok(SummarizationResult::NeedsConfirmation(
                    ConfirmationStatus::AfterDownload,
                ));
            }
            AvailabilityStatus::Downloading => return Err(SummarizeError::StillDownloading),
            AvailabilityStatus::NeedsDownload => {
                info!("Download confirmed; creating the session will fetch the model");
            }
            AvailabilityStatus::Unsupported(reason) => {
                return Err(SummarizeError::NotAvailable(reason));
            }
        }

        let text = match self.run_passes(commits, &key.project).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Summarization error: {e}");
                self.sessions.invalidate().await;
                return Err(SummarizeError::SummarizationFailed(e));
            }
        };
        info!("Summary generated; keeping session alive");

        if key.is_complete() {
            self.cache.put(&key.project, &key.from_tag, &key.to_tag, &text);
        }

        Ok(SummarizationResult::Success {
            text,
            from_cache: false,
        })
    }

    /// Availability folded into what a UI needs to render its controls.
    pub async fn check_availability(&self) -> AiStatus {
        match self.prober.probe().await {
            AvailabilityStatus::Ready => AiStatus {
                available: true,
                button_enabled: true,
                status_message: "ready".to_string(),
            },
            AvailabilityStatus::NeedsDownload => AiStatus {
                available: false,
                button_enabled: true,
                status_message: "Summarize to download the AI model".to_string(),
            },
            AvailabilityStatus::Downloading => AiStatus {
                available: false,
                button_enabled: true,
                status_message: "Model downloading... Please wait".to_string(),
            },
            AvailabilityStatus::Unsupported(reason) => AiStatus {
                available: false,
                button_enabled: false,
                status_message: format!("Not supported: {reason}"),
            },
        }
    }

    /// Release the session. Call on shutdown. Waits for any in-flight
    /// summarization to finish first.
    pub async fn cleanup(&self) {
        let _flight = self.flight.lock().await;
        self.sessions.release().await;
    }

    async fn run_passes(&self, commits: &[String], project: &str) -> Result<String, String> {
        let session = self.sessions.acquire().await?;
        info!("Processing {} commits", commits.len());

        if commits.len() > self.config.chunk_threshold {
            self.summarize_chunked(session.as_ref(), commits, project).await
        } else {
            self.summarize_truncated(session.as_ref(), commits, project).await
        }
    }

    async fn summarize_chunked(
        &self,
        session: &dyn SummarizerSession,
        commits: &[String],
        project: &str,
    ) -> Result<String, String> {
        let chunks = chunk_commits(commits, self.config.chunk_size);
        info!("Too many commits, summarizing {} chunks", chunks.len());

        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let text = truncate_text(&chunk.join("\n"), self.config.max_input_chars);
            debug!(
                "Summarizing chunk {}/{} ({} chars)",
                i + 1,
                chunks.len(),
                text.chars().count()
            );
            summaries.push(session.summarize(&text, None).await?);
        }

        if summaries.len() == 1 {
            return Ok(summaries.remove(0));
        }

        debug!("Combining {} chunk summaries", summaries.len());
        let context = format!(
            "These are summarized deployment changes from multiple commit summaries. \
             Provide a concise overall summary. This is project repository for {project}."
        );
        session.summarize(&summaries.join(" "), Some(context.as_str())).await
    }

    async fn summarize_truncated(
        &self,
        session: &dyn SummarizerSession,
        commits: &[String],
        project: &str,
    ) -> Result<String, String> {
        let kept = truncate_commits(commits, self.config.max_input_chars);
        if kept.len() < commits.len() {
            warn!(
                "Input budget reached: summarizing {} of {} commits",
                kept.len(),
                commits.len()
            );
        }
        let text = kept.join("\n");
        debug!(
            "Summarizing {} commits ({} chars)",
            kept.len(),
            text.chars().count()
        );

        let context = format!(
            "These are truncated commits that were shortened to first 200 characters. \
             Provide a concise overall summary. This is project repository for {project}."
        );
        session.summarize(&text, Some(context.as_str())).await
    }
}
