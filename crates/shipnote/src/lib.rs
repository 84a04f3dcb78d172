//! Deployment announcements for GitLab projects, with optional on-device
//! summaries of the changes being shipped.
//!
//! `shipnote` fetches the tags, tag pipelines and commit range of a GitLab
//! project, renders them into the announcement formats a release process
//! needs (chat message, changelog, wiki table, release notes), and can
//! prepend a short AI-written summary produced by a model running on the
//! same machine.
//!
//! # Getting started
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use shipnote::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let gitlab = GitLabClient::new("https://gitlab.com", std::env::var("GITLAB_TOKEN").ok())?;
//!     let slug = RepoSlug::from_path("acme/web-app").ok_or("bad project path")?;
//!
//!     let commits = gitlab.fetch_comparison(&slug, "v2.3.0", "v2.4.0").await?;
//!
//!     let store: Arc<dyn KvStore> = Arc::new(FileStore::open_in(Path::new(".shipnote"))?);
//!     let model = Arc::new(LocalModel::new("http://localhost:11434", "gemma3:1b")?);
//!     let workflow = SummarizationWorkflow::with_capability(store, model);
//!
//!     let key = SummaryKey::new(slug.path(), "v2.3.0", "v2.4.0");
//!     match workflow.summarize(&commits, &key, true).await {
//!         Ok(SummarizationResult::Success { text, .. }) => println!("{text}"),
//!         Ok(SummarizationResult::NeedsConfirmation(status)) => println!("needs consent: {status}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//!     workflow.cleanup().await;
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Summarize commits:** [`SummarizationWorkflow`](ai::SummarizationWorkflow).
//!   The first call without consent returns
//!   [`NeedsConfirmation`](ai::SummarizationResult::NeedsConfirmation) when the
//!   model must be downloaded; call again with `user_confirmed = true`.
//!   Results are cached per project and tag range for 30 days.
//!
//! - **Plug in another model backend:** implement
//!   [`SummarizerCapability`](ai::SummarizerCapability) and
//!   [`SummarizerSession`](ai::SummarizerSession). [`LocalModel`](ai::LocalModel)
//!   talks to an Ollama-compatible server.
//!
//! - **Render announcements:** fill an [`Announcement`](format::Announcement)
//!   and call one of its renderers.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`ai`] | Summary cache, availability probing, session reuse, chunking, the confirmation workflow, local model backend |
//! | [`gitlab`] | [`RepoSlug`](gitlab::RepoSlug) parsing and the [`GitLabClient`](gitlab::GitLabClient) |
//! | [`format`] | Commit emoji, issue-key links, deploy time suggestions, announcement renderers |
//! | [`store`] | [`KvStore`](store::KvStore) with file and in-memory backends |

pub mod ai;
pub mod format;
pub mod gitlab;
pub mod prelude;
pub mod store;
