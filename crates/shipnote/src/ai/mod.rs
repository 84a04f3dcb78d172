//! On-device commit summarization: caching, availability, sessions, and the
//! confirmation workflow that ties them together.
//!
//! - [`cache`]: [`SummaryCache`], persisted summaries keyed by project and
//!   tag range, expiring after 30 days.
//! - [`capability`]: the [`SummarizerCapability`] / [`SummarizerSession`]
//!   traits a model backend implements.
//! - [`availability`]: [`AvailabilityProber`] maps the backend's raw state to
//!   an [`AvailabilityStatus`].
//! - [`session`]: [`SessionManager`] keeps one long-lived session.
//! - [`chunk`]: truncation and batching of commit titles.
//! - [`workflow`]: [`SummarizationWorkflow`], the two-phase consent flow.
//! - [`prompt`]: text for the download confirmation step.
//! - [`local`]: [`LocalModel`], a backend for an Ollama-compatible server.

pub mod availability;
pub mod cache;
pub mod capability;
pub mod chunk;
pub mod local;
pub mod prompt;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use availability::{AvailabilityProber, AvailabilityStatus};
pub use cache::{CacheStats, SummaryCache};
pub use capability::{SessionConfig, SummarizerCapability, SummarizerSession, UnsupportedCapability};
pub use local::LocalModel;
pub use prompt::ConfirmationPrompt;
pub use session::SessionManager;
pub use workflow::{
    AiStatus, ConfirmationStatus, SummarizationResult, SummarizationWorkflow, SummarizeError,
    SummaryKey, WorkflowConfig,
};
