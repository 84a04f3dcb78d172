//! Project identification from GitLab page URLs and `group/project` paths.

use std::fmt;

/// A GitLab project addressed by namespace and project name.
///
/// The namespace may contain nested groups (`group/subgroup`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub namespace: String,
    pub project: String,
}

impl RepoSlug {
    pub fn new(namespace: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            project: project.into(),
        }
    }

    /// Parse any page URL inside a project, e.g.
    /// `https://gitlab.com/group/sub/app/-/merge_requests/4`.
    ///
    /// Returns `None` when the URL is on another host or names fewer than
    /// two path segments before the `-` separator.
    pub fn from_url(url: &str, host: &str) -> Option<Self> {
        let parsed = reqwest::Url::parse(url).ok()?;
        if !parsed.host_str()?.eq_ignore_ascii_case(host) {
            return None;
        }
        Self::from_segments(parsed.path().trim_matches('/').split('/'))
    }

    /// Parse a `namespace/project` path.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::from_segments(path.trim_matches('/').split('/'))
    }

    fn from_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Option<Self> {
        let parts: Vec<&str> = segments
            .take_while(|s| *s != "-")
            .filter(|s| !s.is_empty())
            .collect();
        let (project, namespace) = parts.split_last()?;
        if namespace.is_empty() {
            return None;
        }
        Some(Self::new(namespace.join("/"), *project))
    }

    /// `namespace/project`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.project)
    }

    /// The path percent-encoded as a single API id segment.
    pub fn encoded(&self) -> String {
        urlencoding::encode(&self.path()).into_owned()
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.project)
    }
}
