//! The summarization capability seam.
//!
//! The workflow never talks to a model backend directly. Instead it is given
//! a [`SummarizerCapability`] that can report availability and construct a
//! [`SummarizerSession`]. [`LocalModel`](super::local::LocalModel) is the
//! shipped backend; [`UnsupportedCapability`] stands in on hosts without one.
//!
//! Both traits use boxed futures so they stay dyn-compatible.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by capability and session methods.
pub type CapabilityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// Raw availability values a backend may report.
pub mod platform {
    /// The model must be downloaded before a session can be created.
    pub const DOWNLOADABLE: &str = "downloadable";
    /// A download is in progress.
    pub const DOWNLOADING: &str = "downloading";
    /// The model is ready.
    pub const AVAILABLE: &str = "available";
}

/// Shared context given to every session.
pub const DEFAULT_SHARED_CONTEXT: &str = "These are deployment changes from a GitLab repository. \
Focus on what was changed. \
Do not include information related to the commit's label or categorization. \
Exclude introductory phrases like 'This GitLab...'. \
Provide information about the repository name.";

/// Kind of summary a session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryType {
    Tldr,
    Teaser,
    KeyPoints,
    Headline,
}

impl SummaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tldr => "tldr",
            Self::Teaser => "teaser",
            Self::KeyPoints => "key-points",
            Self::Headline => "headline",
        }
    }
}

/// Target length of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

/// Output markup of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    PlainText,
    Markdown,
}

impl SummaryFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain-text",
            Self::Markdown => "markdown",
        }
    }
}

/// Fixed configuration a session is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub shared_context: String,
    pub summary_type: SummaryType,
    pub length: SummaryLength,
    pub format: SummaryFormat,
    pub expected_input_languages: Vec<String>,
    pub output_language: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shared_context: DEFAULT_SHARED_CONTEXT.to_string(),
            summary_type: SummaryType::Tldr,
            length: SummaryLength::Short,
            format: SummaryFormat::PlainText,
            expected_input_languages: vec!["en".to_string()],
            output_language: "en".to_string(),
        }
    }
}

/// A live model session.
pub trait SummarizerSession: Send + Sync {
    /// Summarize `text`, optionally steered by a per-call `context`.
    fn summarize<'a>(&'a self, text: &'a str, context: Option<&'a str>)
    -> CapabilityFuture<'a, String>;

    /// Release backend resources held by the session.
    fn destroy(&self) -> CapabilityFuture<'_, ()>;
}

/// A host's summarization capability.
pub trait SummarizerCapability: Send + Sync {
    /// Whether the host offers summarization at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Query the raw availability value (see [`platform`]).
    fn availability(&self) -> CapabilityFuture<'_, String>;

    /// Create a session. May download the model first and take minutes.
    fn create_session<'a>(
        &'a self,
        config: &'a SessionConfig,
    ) -> CapabilityFuture<'a, Box<dyn SummarizerSession>>;
}

/// Capability for hosts with no summarization support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCapability;

impl SummarizerCapability for UnsupportedCapability {
    fn is_supported(&self) -> bool {
        false
    }

    fn availability(&self) -> CapabilityFuture<'_, String> {
        Box::pin(async { Err("summarization is not supported".to_string()) })
    }

    fn create_session<'a>(
        &'a self,
        _config: &'a SessionConfig,
    ) -> CapabilityFuture<'a, Box<dyn SummarizerSession>> {
        Box::pin(async { Err("summarization is not supported".to_string()) })
    }
}
