//! Terminal side of the download consent flow.
//!
//! The workflow never downloads a model on its own: it returns
//! `NeedsConfirmation`, the user is asked here, and only an explicit "yes"
//! re-runs it with consent.

use std::io::{BufRead, Write};

use shipnote::ai::{
    ConfirmationPrompt, SummarizationResult, SummarizationWorkflow, SummarizeError, SummaryKey,
};
use tracing::{debug, warn};

/// Render a prompt for the terminal.
pub fn render_prompt(prompt: &ConfirmationPrompt) -> String {
    format!(
        "\n== {} ==\n{}\n\n{}? [y/N] ",
        prompt.title, prompt.body, prompt.confirm_label
    )
}

/// Ask the question on `output` and read a y/N answer from `input`.
/// End of input or an I/O error counts as "no".
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &ConfirmationPrompt,
) -> bool {
    if let Err(e) = output
        .write_all(render_prompt(prompt).as_bytes())
        .and_then(|()| output.flush())
    {
        warn!("Failed to show confirmation prompt: {e}");
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) => false,
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            warn!("Failed to read confirmation: {e}");
            false
        }
    }
}

/// Outcome of [`summarize_with_consent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Summary { text: String, from_cache: bool },
    Declined,
}

/// Run the workflow, asking for consent when it needs a download.
///
/// With `pre_confirmed` the first call already carries consent, so no
/// question is asked.
pub async fn summarize_with_consent<R: BufRead, W: Write>(
    workflow: &SummarizationWorkflow,
    commits: &[String],
    key: &SummaryKey,
    model: &str,
    pre_confirmed: bool,
    input: &mut R,
    output: &mut W,
) -> Result<ConsentOutcome, SummarizeError> {
    let status = match workflow.summarize(commits, key, pre_confirmed).await? {
        SummarizationResult::Success { text, from_cache } => {
            return Ok(ConsentOutcome::Summary { text, from_cache });
        }
        SummarizationResult::NeedsConfirmation(status) => status,
    };

    debug!("Workflow needs confirmation: {status}");
    let prompt = ConfirmationPrompt::for_status(status, model);
    if !ask(input, output, &prompt) {
        return Ok(ConsentOutcome::Declined);
    }

    match workflow.summarize(commits, key, true).await? {
        SummarizationResult::Success { text, from_cache } => {
            Ok(ConsentOutcome::Summary { text, from_cache })
        }
        // Consent was given; the workflow does not ask twice.
        SummarizationResult::NeedsConfirmation(_) => Ok(ConsentOutcome::Declined),
    }
}
