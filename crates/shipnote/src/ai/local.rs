//! Summarization through a local, Ollama-compatible model server.
//!
//! The model runs on the same machine, so the first use may need a large
//! download. [`LocalModel`] maps the server's state onto the capability
//! contract:
//!
//! | Server state | Reported value |
//! |--------------|----------------|
//! | model listed by `GET /api/tags` | `available` |
//! | pull started by this process still running | `downloading` |
//! | model not listed | `downloadable` |
//! | server unreachable / HTTP error | error (probed as unsupported) |
//!
//! Creating a session pulls a missing model via streaming `POST /api/pull`,
//! logging progress as it arrives. Summaries come from `POST /api/generate`.
//! No overall request timeout is set; pulls and generations can take minutes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::capability::{
    CapabilityFuture, SessionConfig, SummarizerCapability, SummarizerSession, SummaryType,
    platform,
};

/// Default base URL of the model server.
pub const DEFAULT_MODEL_URL: &str = "http://localhost:11434";

/// Default model used for summaries.
pub const DEFAULT_MODEL: &str = "gemma3:1b";

/// Sampling temperature for summaries.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize, Debug)]
struct ListedModel {
    name: String,
}

#[derive(Serialize, Debug)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// One NDJSON line from a streaming pull.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PullProgress {
    #[serde(default)]
    pub status: String,
    pub total: Option<u64>,
    pub completed: Option<u64>,
    pub error: Option<String>,
}

impl PullProgress {
    /// Whole-number percentage, when the line carries byte counts.
    pub fn percent(&self) -> Option<u64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => Some(done.min(total) * 100 / total),
            _ => None,
        }
    }
}

/// Parse one pull line. Blank or malformed lines yield `None`.
pub fn parse_pull_line(line: &str) -> Option<PullProgress> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(progress) => Some(progress),
        Err(e) => {
            trace!("Skipping unparsable pull line: {e}");
            None
        }
    }
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize, Debug)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Compose the system prompt for one summarization call.
pub fn build_system_prompt(config: &SessionConfig, context: Option<&str>) -> String {
    let kind = match config.summary_type {
        SummaryType::Tldr => "TL;DR",
        SummaryType::Teaser => "teaser",
        SummaryType::KeyPoints => "key-points",
        SummaryType::Headline => "headline",
    };

    let mut prompt = config.shared_context.clone();
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt.push_str(&format!(
        "\n\nWrite a {} {kind} summary of the input as {}. \
         The input is written in {}. Respond only in {}.",
        config.length.as_str(),
        config.format.as_str(),
        config.expected_input_languages.join(", "),
        config.output_language,
    ));
    prompt
}

fn model_matches(listed: &str, wanted: &str) -> bool {
    listed == wanted || (!wanted.contains(':') && listed == format!("{wanted}:latest"))
}

// ── Capability ─────────────────────────────────────────────────────

/// Clears the shared "downloading" flag when a pull ends, however it ends.
struct PullGuard(Arc<AtomicBool>);

impl Drop for PullGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// [`SummarizerCapability`] backed by a local model server.
pub struct LocalModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    pulling: Arc<AtomicBool>,
}

impl LocalModel {
    /// Create a capability for `model` served at `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shipnote/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            pulling: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the model is already present on the server.
    async fn installed(&self) -> Result<bool, String> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("model server unreachable at {}: {e}", self.base_url))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        if !status.is_success() {
            return Err(format!("Model server HTTP {status}: {text}"));
        }

        let tags: TagsResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse model list: {e}"))?;
        debug!("Model server lists {} model(s)", tags.models.len());
        Ok(tags
            .models
            .iter()
            .any(|m| model_matches(&m.name, &self.model)))
    }

    /// Download the model, logging progress until the server reports success.
    async fn pull(&self) -> Result<(), String> {
        self.pulling.store(true, Ordering::SeqCst);
        let _guard = PullGuard(self.pulling.clone());

        info!("Downloading model {} (this can take a while)...", self.model);
        let start = Instant::now();

        let mut resp = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&PullRequest {
                model: &self.model,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| format!("pull request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Model server HTTP {status}: {text}"));
        }

        let mut buffer = String::new();
        let mut last_status = String::new();
        let mut last_percent = None;
        let mut succeeded = false;

        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| format!("failed to read pull progress: {e}"))?
        {
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline_pos).collect();
                let Some(progress) = parse_pull_line(&line) else {
                    continue;
                };
                if let Some(error) = progress.error {
                    return Err(format!("model download failed: {error}"));
                }
                if progress.status == "success" {
                    succeeded = true;
                }

                let percent = progress.percent().map(|p| p / 10 * 10);
                if progress.status != last_status || (percent.is_some() && percent != last_percent)
                {
                    match percent {
                        Some(p) => info!("Model download: {} ({p}%)", progress.status),
                        None => info!("Model download: {}", progress.status),
                    }
                    last_status = progress.status;
                    last_percent = percent;
                }
            }
        }

        if let Some(progress) = parse_pull_line(&buffer) {
            if let Some(error) = progress.error {
                return Err(format!("model download failed: {error}"));
            }
            succeeded |= progress.status == "success";
        }

        if !succeeded {
            return Err("model download ended without success".to_string());
        }
        info!(
            "Model {} downloaded in {:.0}s",
            self.model,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

impl SummarizerCapability for LocalModel {
    fn availability(&self) -> CapabilityFuture<'_, String> {
        Box::pin(async move {
            if self.pulling.load(Ordering::SeqCst) {
                return Ok(platform::DOWNLOADING.to_string());
            }
            let value = if self.installed().await? {
                platform::AVAILABLE
            } else {
                platform::DOWNLOADABLE
            };
            Ok(value.to_string())
        })
    }

    fn create_session<'a>(
        &'a self,
        config: &'a SessionConfig,
    ) -> CapabilityFuture<'a, Box<dyn SummarizerSession>> {
        Box::pin(async move {
            if !self.installed().await? {
                self.pull().await?;
            }
            Ok(Box::new(LocalSession {
                client: self.client.clone(),
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                config: config.clone(),
            }) as Box<dyn SummarizerSession>)
        })
    }
}

// ── Session ────────────────────────────────────────────────────────

struct LocalSession {
    client: reqwest::Client,
    base_url: String,
    model: String,
    config: SessionConfig,
}

impl SummarizerSession for LocalSession {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        context: Option<&'a str>,
    ) -> CapabilityFuture<'a, String> {
        Box::pin(async move {
            let system = build_system_prompt(&self.config, context);
            let body = GenerateRequest {
                model: &self.model,
                prompt: text,
                system: &system,
                stream: false,
                options: GenerateOptions {
                    temperature: SUMMARY_TEMPERATURE,
                },
            };
            debug!(
                "Generate request: model={}, input={} chars",
                self.model,
                text.chars().count()
            );

            let start = Instant::now();
            let resp = self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&body)
                .send()
                .await
                .map_err(|e| format!("request failed: {e}"))?;

            let status = resp.status();
            let raw = resp
                .text()
                .await
                .map_err(|e| format!("failed to read response: {e}"))?;
            debug!(
                "Generate response: HTTP {} in {:.1}s ({} bytes)",
                status,
                start.elapsed().as_secs_f64(),
                raw.len()
            );
            if !status.is_success() {
                return Err(format!("Model server HTTP {status}: {raw}"));
            }

            let parsed: GenerateResponse =
                serde_json::from_str(&raw).map_err(|e| format!("failed to parse response: {e}"))?;
            if let Some(error) = parsed.error {
                return Err(format!("Model error: {error}"));
            }
            parsed
                .response
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or_else(|| "Empty model response".to_string())
        })
    }

    fn destroy(&self) -> CapabilityFuture<'_, ()> {
        Box::pin(async move {
            // keep_alive 0 asks the server to unload the model now.
            let resp = self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&serde_json::json!({ "model": self.model, "keep_alive": 0 }))
                .send()
                .await
                .map_err(|e| format!("unload request failed: {e}"))?;
            if !resp.status().is_success() {
                return Err(format!("Model server HTTP {} on unload", resp.status()));
            }
            Ok(())
        })
    }
}
