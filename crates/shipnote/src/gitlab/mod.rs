//! GitLab access: project identification and the REST client.

pub mod client;
pub mod slug;

pub use client::{DEFAULT_GITLAB_URL, GitLabClient, Pipeline, ProjectInfo, ProjectRefs};
pub use slug::RepoSlug;
