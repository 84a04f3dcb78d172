//! Default choices for the release range and its pipeline.

use shipnote::gitlab::Pipeline;

/// Resolve the tag range, defaulting `to` to the newest tag and `from` to
/// the tag right after it in the newest-first list.
pub fn pick_range(
    tags: &[String],
    from: Option<String>,
    to: Option<String>,
) -> Result<(String, String), String> {
    let to = match to {
        Some(to) => to,
        None => tags
            .first()
            .cloned()
            .ok_or("project has no tags; pass --from and --to")?,
    };
    let from = match from {
        Some(from) => from,
        None => tags
            .iter()
            .position(|t| *t == to)
            .and_then(|i| tags.get(i + 1))
            .cloned()
            .ok_or_else(|| format!("no tag before {to}; pass --from"))?,
    };
    Ok((from, to))
}

/// The pipeline named by `id`, or else the one built for the `to` tag.
pub fn pick_pipeline(
    pipelines: &[Pipeline],
    id: Option<u64>,
    to: &str,
) -> Result<Option<Pipeline>, String> {
    match id {
        Some(id) => pipelines
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(Some)
            .ok_or_else(|| format!("pipeline #{id} not found among tag pipelines")),
        None => Ok(pipelines.iter().find(|p| p.ref_name == to).cloned()),
    }
}
