//! Probing whether the summarization model can be used right now.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::capability::{SummarizerCapability, platform};

/// Reason reported when the host offers no capability at all.
pub const NOT_SUPPORTED_REASON: &str = "not supported in this environment";

/// Result of an availability probe. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityStatus {
    Ready,
    NeedsDownload,
    Downloading,
    Unsupported(String),
}

impl AvailabilityStatus {
    /// Map a raw platform value onto a status.
    pub fn from_platform(value: &str) -> Self {
        match value {
            platform::DOWNLOADABLE => Self::NeedsDownload,
            platform::DOWNLOADING => Self::Downloading,
            platform::AVAILABLE => Self::Ready,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NeedsDownload => write!(f, "model needs to be downloaded"),
            Self::Downloading => write!(f, "model is downloading"),
            Self::Unsupported(reason) => write!(f, "unsupported: {reason}"),
        }
    }
}

/// Queries a capability and folds every outcome into an
/// [`AvailabilityStatus`]. Side-effect free and safe to call repeatedly.
#[derive(Clone)]
pub struct AvailabilityProber {
    capability: Option<Arc<dyn SummarizerCapability>>,
}

impl AvailabilityProber {
    pub fn new(capability: Option<Arc<dyn SummarizerCapability>>) -> Self {
        Self { capability }
    }

    pub async fn probe(&self) -> AvailabilityStatus {
        let Some(capability) = self.capability.as_ref().filter(|c| c.is_supported()) else {
            return AvailabilityStatus::Unsupported(NOT_SUPPORTED_REASON.to_string());
        };

        let status = match capability.availability().await {
            Ok(value) => AvailabilityStatus::from_platform(&value),
            Err(e) => AvailabilityStatus::Unsupported(e),
        };
        debug!("Summarizer availability: {status}");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::capability::UnsupportedCapability;
    use crate::ai::test_support::FakeCapability;

    #[test]
    fn platform_values_map_to_statuses() {
        assert_eq!(
            AvailabilityStatus::from_platform("available"),
            AvailabilityStatus::Ready
        );
        assert_eq!(
            AvailabilityStatus::from_platform("downloadable"),
            AvailabilityStatus::NeedsDownload
        );
        assert_eq!(
            AvailabilityStatus::from_platform("downloading"),
            AvailabilityStatus::Downloading
        );
        assert_eq!(
            AvailabilityStatus::from_platform("unavailable"),
            AvailabilityStatus::Unsupported("unavailable".into())
        );
    }

    #[tokio::test]
    async fn missing_capability_is_unsupported() {
        let prober = AvailabilityProber::new(None);
        assert_eq!(
            prober.probe().await,
            AvailabilityStatus::Unsupported(NOT_SUPPORTED_REASON.into())
        );
    }

    #[tokio::test]
    async fn unsupported_capability_is_not_queried() {
        let prober = AvailabilityProber::new(Some(Arc::new(UnsupportedCapability)));
        assert_eq!(
            prober.probe().await,
            AvailabilityStatus::Unsupported(NOT_SUPPORTED_REASON.into())
        );
    }

    #[tokio::test]
    async fn query_errors_become_unsupported() {
        let cap = FakeCapability::failing_probe("connection refused");
        let prober = AvailabilityProber::new(Some(cap.clone()));
        assert_eq!(
            prober.probe().await,
            AvailabilityStatus::Unsupported("connection refused".into())
        );
        assert_eq!(cap.probe_calls(), 1);
    }

    #[tokio::test]
    async fn probing_is_repeatable() {
        let cap = FakeCapability::new("downloadable");
        let prober = AvailabilityProber::new(Some(cap.clone()));
        assert_eq!(prober.probe().await, AvailabilityStatus::NeedsDownload);
        assert_eq!(prober.probe().await, AvailabilityStatus::NeedsDownload);
        assert_eq!(cap.probe_calls(), 2);
        assert_eq!(cap.sessions_created(), 0);
    }
}
