//! Ownership of the single long-lived summarizer session.
//!
//! [`SessionManager`] creates the session lazily on the first
//! [`acquire`](SessionManager::acquire) and hands out the same handle until
//! it is [`invalidated`](SessionManager::invalidate) or
//! [`released`](SessionManager::release). The slot is guarded by an async
//! mutex: concurrent acquirers wait for one construction instead of racing
//! to build two sessions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::capability::{SessionConfig, SummarizerCapability, SummarizerSession};

/// Lazily created, reusable session slot.
pub struct SessionManager {
    capability: Arc<dyn SummarizerCapability>,
    config: SessionConfig,
    slot: Mutex<Option<Arc<dyn SummarizerSession>>>,
}

impl SessionManager {
    pub fn new(capability: Arc<dyn SummarizerCapability>, config: SessionConfig) -> Self {
        Self {
            capability,
            config,
            slot: Mutex::new(None),
        }
    }

    /// Return the live session, creating one if needed.
    ///
    /// Creation may trigger a model download and run for minutes. The slot
    /// stays locked for the duration, so other callers wait on it.
    pub async fn acquire(&self) -> Result<Arc<dyn SummarizerSession>, String> {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.as_ref() {
            debug!("Reusing existing summarizer session");
            return Ok(session.clone());
        }

        info!("Creating new summarizer session...");
        let session: Arc<dyn SummarizerSession> =
            Arc::from(self.capability.create_session(&self.config).await?);
        *slot = Some(session.clone());
        Ok(session)
    }

    /// Whether a session is currently held.
    pub async fn is_live(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Destroy and drop the session after a failed summarization.
    pub async fn invalidate(&self) {
        if self.take_and_destroy().await {
            info!("Summarizer session invalidated; next use will recreate it");
        }
    }

    /// Destroy and drop the session, e.g. on shutdown.
    pub async fn release(&self) {
        if self.take_and_destroy().await {
            info!("Summarizer session released");
        }
    }

    async fn take_and_destroy(&self) -> bool {
        let Some(session) = self.slot.lock().await.take() else {
            return false;
        };
        if let Err(e) = session.destroy().await {
            warn!("Error destroying summarizer session: {e}");
        }
        true
    }
}
