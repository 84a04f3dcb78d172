//! User-facing text for the download confirmation step.

use super::workflow::ConfirmationStatus;

/// Content a frontend shows before re-invoking the workflow with consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
    pub status: ConfirmationStatus,
}

impl ConfirmationPrompt {
    /// Build the prompt for `status`, naming the model being fetched.
    pub fn for_status(status: ConfirmationStatus, model: &str) -> Self {
        match status {
            ConfirmationStatus::BeforeDownload => Self {
                title: "AI Model - First Time Setup".to_string(),
                body: format!(
                    "The summarization model `{model}` needs to be downloaded to this machine.\n\
                     \n\
                     - Download size: several GB depending on the model\n\
                     - Estimated time: 10-30 minutes\n\
                     - Privacy: summaries are generated locally; commit titles never leave the machine\n\
                     - One-time setup: the model is reused for all future summaries\n\
                     \n\
                     Would you like to start downloading the AI model now?"
                ),
                confirm_label: "Start Download".to_string(),
                status,
            },
            ConfirmationStatus::AfterDownload => Self {
                title: "AI Model Download In Progress".to_string(),
                body: format!(
                    "The summarization model `{model}` is currently being downloaded.\n\
                     \n\
                     Please wait a few more minutes for the download to complete.\n\
                     \n\
                     Do you want to try anyway? (This may fail if the download is not complete.)"
                ),
                confirm_label: "Try Anyway".to_string(),
                status,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_download_prompt_offers_download() {
        let prompt =
            ConfirmationPrompt::for_status(ConfirmationStatus::BeforeDownload, "gemma3:1b");
        assert_eq!(prompt.confirm_label, "Start Download");
        assert!(prompt.body.contains("gemma3:1b"));
        assert_eq!(prompt.status, ConfirmationStatus::BeforeDownload);
    }

    #[test]
    fn after_download_prompt_warns_about_failure() {
        let prompt = ConfirmationPrompt::for_status(ConfirmationStatus::AfterDownload, "m");
        assert_eq!(prompt.confirm_label, "Try Anyway");
        assert!(prompt.body.contains("may fail"));
    }
}
