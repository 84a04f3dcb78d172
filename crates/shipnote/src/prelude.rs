//! Convenience re-exports for common `shipnote` types.
//!
//! ```ignore
//! use shipnote::prelude::*;
//! ```
//!
//! Covers the announcement pipeline end to end: the [`GitLabClient`], the
//! [`Announcement`] renderers, the [`SummarizationWorkflow`] and its
//! results, and the stores backing it. Lower-level pieces (chunking, the
//! availability prober, wire types) stay in their modules.

// ── GitLab ──────────────────────────────────────────────────────────
pub use crate::gitlab::{GitLabClient, Pipeline, ProjectInfo, ProjectRefs, RepoSlug};

// ── Formatting ──────────────────────────────────────────────────────
pub use crate::format::{Announcement, format_deploy_time, suggest_deploy_time};

// ── Summarization ───────────────────────────────────────────────────
pub use crate::ai::{
    AiStatus, ConfirmationPrompt, ConfirmationStatus, LocalModel, SessionConfig,
    SummarizationResult, SummarizationWorkflow, SummarizeError, SummarizerCapability,
    SummaryCache, SummaryKey, UnsupportedCapability,
};

// ── Storage ─────────────────────────────────────────────────────────
pub use crate::store::{FileStore, KvStore, MemoryStore};
