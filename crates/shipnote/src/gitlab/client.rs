//! Async client for the handful of GitLab REST v4 endpoints an announcement needs.

use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::slug::RepoSlug;

/// Default GitLab instance.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Commits whose title starts with this are dropped from comparisons.
pub const MERGE_COMMIT_PREFIX: &str = "Merge branch";

const PER_PAGE: u32 = 100;

// ── Response types ─────────────────────────────────────────────────

/// Display name and URL of a project.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub web_url: String,
}

/// A pipeline that ran for a tag.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub id: u64,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub web_url: String,
}

impl Pipeline {
    /// `#1234 (v1.2.0)`
    pub fn label(&self) -> String {
        format!("#{} ({})", self.id, self.ref_name)
    }
}

/// Tags (newest first) and tag pipelines of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectRefs {
    pub tags: Vec<String>,
    pub pipelines: Vec<Pipeline>,
}

#[derive(Deserialize, Debug)]
struct RawTag {
    name: String,
    #[serde(default)]
    commit: Option<RawTagCommit>,
}

#[derive(Deserialize, Debug)]
struct RawTagCommit {
    created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize, Debug)]
struct RawComparison {
    #[serde(default)]
    commits: Vec<RawCommit>,
}

#[derive(Deserialize, Debug)]
struct RawCommit {
    title: String,
}

#[derive(Serialize, Debug)]
struct ReleaseBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_name: Option<&'a str>,
    description: &'a str,
}

/// Sort tags by commit date, newest first. Undated tags go last.
fn sort_tags(mut tags: Vec<RawTag>) -> Vec<String> {
    tags.sort_by(|a, b| {
        let date = |t: &RawTag| t.commit.as_ref().and_then(|c| c.created_at);
        date(b).cmp(&date(a))
    });
    tags.into_iter().map(|t| t.name).collect()
}

fn commit_titles(comparison: RawComparison) -> Vec<String> {
    comparison
        .commits
        .into_iter()
        .map(|c| c.title)
        .filter(|title| !title.starts_with(MERGE_COMMIT_PREFIX))
        .collect()
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for one GitLab instance.
pub struct GitLabClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitLabClient {
    /// Create a client for `base_url` (e.g. `https://gitlab.com`).
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shipnote/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host name used to recognise project URLs on this instance.
    pub fn host(&self) -> Option<String> {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Browser URL of a project on this instance.
    pub fn project_url(&self, slug: &RepoSlug) -> String {
        format!("{}/{}", self.base_url, slug.path())
    }

    fn api_url(&self, slug: &RepoSlug, rest: &str) -> String {
        format!("{}/api/v4/projects/{}{rest}", self.base_url, slug.encoded())
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, String> {
        debug!("GitLab request: GET {url}");
        let start = Instant::now();

        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {what}: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "GitLab response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );
        trace!("GitLab body: {text}");

        if !status.is_success() {
            return Err(format!("Failed to fetch {what}: HTTP {status}: {text}"));
        }
        serde_json::from_str(&text).map_err(|e| format!("failed to parse {what}: {e}"))
    }

    /// Name and URL of the project.
    pub async fn fetch_project(&self, slug: &RepoSlug) -> Result<ProjectInfo, String> {
        self.get_json(&self.api_url(slug, ""), "project info").await
    }

    /// Tag names, newest commit first.
    pub async fn fetch_tags(&self, slug: &RepoSlug) -> Result<Vec<String>, String> {
        let url = self.api_url(slug, &format!("/repository/tags?per_page={PER_PAGE}"));
        let tags: Vec<RawTag> = self.get_json(&url, "tags").await?;
        Ok(sort_tags(tags))
    }

    /// Pipelines that ran for tags.
    pub async fn fetch_pipelines(&self, slug: &RepoSlug) -> Result<Vec<Pipeline>, String> {
        let url = self.api_url(slug, &format!("/pipelines?scope=tags&per_page={PER_PAGE}"));
        self.get_json(&url, "pipelines").await
    }

    /// Tags and pipelines, fetched concurrently.
    pub async fn fetch_refs(&self, slug: &RepoSlug) -> Result<ProjectRefs, String> {
        let (tags, pipelines) =
            tokio::try_join!(self.fetch_tags(slug), self.fetch_pipelines(slug))?;
        Ok(ProjectRefs { tags, pipelines })
    }

    /// Titles of the commits between two refs, merge commits excluded.
    pub async fn fetch_comparison(
        &self,
        slug: &RepoSlug,
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, String> {
        if from.is_empty() || to.is_empty() {
            return Err("From and to tag is not defined".to_string());
        }
        let url = self.api_url(
            slug,
            &format!(
                "/repository/compare?from={}&to={}",
                urlencoding::encode(from),
                urlencoding::encode(to)
            ),
        );
        let comparison: RawComparison = self.get_json(&url, "comparisons").await?;
        Ok(commit_titles(comparison))
    }

    /// Set the release notes of `tag`, creating the release if needed.
    pub async fn publish_release_notes(
        &self,
        slug: &RepoSlug,
        tag: &str,
        description: &str,
    ) -> Result<(), String> {
        if tag.is_empty() {
            return Err("Release tag is not defined".to_string());
        }

        let update_url = self.api_url(slug, &format!("/releases/{}", urlencoding::encode(tag)));
        debug!("GitLab request: PUT {update_url}");
        let resp = self
            .authorize(self.client.put(&update_url))
            .json(&ReleaseBody {
                tag_name: None,
                description,
            })
            .send()
            .await
            .map_err(|e| format!("Failed to update release: {e}"))?;

        let status = resp.status();
        if status.is_success() {
            info!("Updated release notes for {slug} {tag}");
            return Ok(());
        }
        if status != reqwest::StatusCode::NOT_FOUND {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Failed to update release: HTTP {status}: {text}"));
        }

        let create_url = self.api_url(slug, "/releases");
        debug!("GitLab request: POST {create_url}");
        let resp = self
            .authorize(self.client.post(&create_url))
            .json(&ReleaseBody {
                tag_name: Some(tag),
                description,
            })
            .send()
            .await
            .map_err(|e| format!("Failed to create release: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Failed to create release: HTTP {status}: {text}"));
        }
        info!("Created release for {slug} {tag}");
        Ok(())
    }
}
