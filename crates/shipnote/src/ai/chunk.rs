//! Fitting commit titles into the model's input window.
//!
//! Two policies, both order-preserving and pure:
//!
//! - [`truncate_commits`] shortens each title and keeps the longest prefix
//!   of the list that fits a character budget. Commits past the budget are
//!   dropped, not summarized.
//! - [`chunk_commits`] splits the list into fixed-size groups so each group
//!   can be summarized separately and the partial summaries combined.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte titles are
//! never split mid-character.

/// Per-commit ceiling applied by [`truncate_commits`].
pub const MAX_COMMIT_CHARS: usize = 200;

/// Marker appended to shortened text.
pub const ELLIPSIS: &str = "...";

/// Default total budget for a single summarization input.
pub const DEFAULT_MAX_CHARS: usize = 3000;

/// Default number of commits per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 15;

/// Cut `text` to `max_chars` characters, appending [`ELLIPSIS`] when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + ELLIPSIS.len());
            out.extend(text.chars().take(max_chars));
            out.push_str(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}

/// Shorten each commit to [`MAX_COMMIT_CHARS`] and keep the prefix that fits
/// within `max_chars` in total.
///
/// Walking stops at the first commit that would push the running total past
/// the budget, even if a later, shorter commit would still fit.
pub fn truncate_commits(commits: &[String], max_chars: usize) -> Vec<String> {
    let mut truncated = Vec::new();
    let mut total = 0;

    for commit in commits {
        let short = truncate_text(commit, MAX_COMMIT_CHARS);
        let len = short.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        truncated.push(short);
    }

    truncated
}

/// Split `commits` into contiguous groups of at most `chunk_size`.
///
/// A `chunk_size` of zero is treated as one.
pub fn chunk_commits(commits: &[String], chunk_size: usize) -> Vec<Vec<String>> {
    commits
        .chunks(chunk_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}
