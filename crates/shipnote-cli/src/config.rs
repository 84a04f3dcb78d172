//! Command-line configuration with sensible defaults.
//!
//! [`CliConfig`] gathers the settings every subcommand shares and turns them
//! into shipnote types via the `build_*` methods.

use std::path::PathBuf;
use std::sync::Arc;

use shipnote::ai::local::{DEFAULT_MODEL, DEFAULT_MODEL_URL};
use shipnote::ai::{LocalModel, SummarizationWorkflow, SummarizerCapability, UnsupportedCapability};
use shipnote::format::DEFAULT_ISSUE_BASE_URL;
use shipnote::gitlab::{DEFAULT_GITLAB_URL, GitLabClient, RepoSlug};
use shipnote::store::{FileStore, GITLAB_TOKEN_KEY, KvStore};
use tracing::debug;

/// Name of the data directory created under `$HOME`.
pub const DATA_DIR_NAME: &str = ".shipnote";

/// Settings shared by all subcommands.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// GitLab instance. Default: `https://gitlab.com`.
    pub gitlab_url: String,
    /// Token given on the command line or in the environment. Takes
    /// precedence over a stored token.
    pub token: Option<String>,
    /// Directory holding the store file. Default: `~/.shipnote`.
    pub data_dir: PathBuf,
    /// Local model name. Default: `gemma3:1b`.
    pub model: String,
    /// Local model server. Default: `http://localhost:11434`.
    pub model_url: String,
    /// Issue tracker used for key links.
    pub issue_base_url: String,
    /// When false, summarization reports itself unsupported. Default: `true`.
    pub ai_enabled: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            gitlab_url: DEFAULT_GITLAB_URL.to_string(),
            token: None,
            data_dir: default_data_dir(),
            model: DEFAULT_MODEL.to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            issue_base_url: DEFAULT_ISSUE_BASE_URL.to_string(),
            ai_enabled: true,
        }
    }
}

/// `$HOME/.shipnote`, or `./.shipnote` when no home is set.
pub fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

/// Show only the first and last four characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

impl CliConfig {
    /// Open the file-backed store in [`data_dir`](Self::data_dir).
    pub fn build_store(&self) -> Result<Arc<dyn KvStore>, String> {
        let store = FileStore::open_in(&self.data_dir)?;
        debug!("Using store at {}", store.path().display());
        Ok(Arc::new(store))
    }

    /// The explicit token, else the stored one.
    pub fn resolve_token(&self, store: &dyn KvStore) -> Result<Option<String>, String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Some(token.clone()));
        }
        store.get(GITLAB_TOKEN_KEY)
    }

    pub fn build_gitlab_client(&self, store: &dyn KvStore) -> Result<GitLabClient, String> {
        GitLabClient::new(&self.gitlab_url, self.resolve_token(store)?)
    }

    pub fn build_capability(&self) -> Result<Arc<dyn SummarizerCapability>, String> {
        if !self.ai_enabled {
            return Ok(Arc::new(UnsupportedCapability));
        }
        Ok(Arc::new(LocalModel::new(&self.model_url, &self.model)?))
    }

    /// Workflow over the local model, caching into `store`.
    pub fn build_workflow(&self, store: Arc<dyn KvStore>) -> Result<SummarizationWorkflow, String> {
        Ok(SummarizationWorkflow::with_capability(
            store,
            self.build_capability()?,
        ))
    }
}

/// Accept either a project URL on `gitlab`'s instance or a
/// `namespace/project` path.
pub fn resolve_project(input: &str, gitlab: &GitLabClient) -> Result<RepoSlug, String> {
    let slug = if input.contains("://") {
        let host = gitlab
            .host()
            .ok_or_else(|| format!("invalid GitLab URL: {}", gitlab.base_url()))?;
        RepoSlug::from_url(input, &host)
    } else {
        RepoSlug::from_path(input)
    };
    slug.ok_or_else(|| format!("Not a valid GitLab repo: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipnote::store::MemoryStore;

    fn config_in(dir: &std::path::Path) -> CliConfig {
        CliConfig {
            data_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_point_at_public_services() {
        let config = CliConfig::default();
        assert_eq!(config.gitlab_url, "https://gitlab.com");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.model_url, "http://localhost:11434");
        assert!(config.ai_enabled);
        assert!(config.data_dir.ends_with(DATA_DIR_NAME));
    }

    #[test]
    fn explicit_token_wins_over_stored() {
        let store = MemoryStore::new();
        store.set(GITLAB_TOKEN_KEY, "stored-token").unwrap();

        let mut config = CliConfig::default();
        assert_eq!(
            config.resolve_token(&store).unwrap().as_deref(),
            Some("stored-token")
        );

        config.token = Some("flag-token".into());
        assert_eq!(
            config.resolve_token(&store).unwrap().as_deref(),
            Some("flag-token")
        );

        config.token = Some(String::new());
        assert_eq!(
            config.resolve_token(&store).unwrap().as_deref(),
            Some("stored-token")
        );
    }

    #[test]
    fn resolves_project_urls_and_paths() {
        let gitlab = GitLabClient::new("https://gitlab.example.com", None).unwrap();
        let from_url =
            resolve_project("https://gitlab.example.com/acme/web/app/-/tags", &gitlab).unwrap();
        assert_eq!(from_url.path(), "acme/web/app");
        assert_eq!(resolve_project("acme/app", &gitlab).unwrap().project, "app");

        let err = resolve_project("https://gitlab.com/acme/app", &gitlab).unwrap_err();
        assert!(err.contains("Not a valid GitLab repo"));
    }

    #[test]
    fn store_is_created_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir.path().join("nested"));
        let store = config.build_store().unwrap();
        store.set("k", "v").unwrap();
        assert!(dir.path().join("nested").join("store.json").exists());
    }

    #[test]
    fn disabled_ai_is_unsupported() {
        let config = CliConfig {
            ai_enabled: false,
            ..Default::default()
        };
        assert!(!config.build_capability().unwrap().is_supported());
    }

    #[test]
    fn tokens_are_masked() {
        assert_eq!(mask_token("glpat-abcdef123456"), "glpa**********3456");
        assert_eq!(mask_token("short"), "*****");
    }
}
