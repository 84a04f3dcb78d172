//! Command-line deployment announcements powered by shipnote.
//!
//! The `shipnote` binary resolves a GitLab project, picks a tag range and
//! pipeline, and prints the announcement in the requested formats,
//! optionally with an on-device summary of the changes.
//!
//! ```sh
//! # Latest two tags, Slack message with an AI summary
//! shipnote announce acme/web-app --summarize
//!
//! # Explicit range, every format, publish release notes
//! shipnote announce https://gitlab.com/acme/web-app --from v2.3.0 --to v2.4.0 --format all --publish
//! ```

pub mod config;
pub mod confirm;
pub mod select;

pub use config::CliConfig;
pub use confirm::{ConsentOutcome, summarize_with_consent};
