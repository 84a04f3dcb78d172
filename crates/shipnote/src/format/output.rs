//! Renderers for the deployment announcement in its four destinations.

use chrono::NaiveDateTime;

use super::{LinkStyle, commit_emoji, escape_html, format_deploy_time, link_issue_keys};
use crate::gitlab::Pipeline;

const RULE: &str = "―――";
const INDENT: &str = "       ";

/// Everything needed to announce one deployment.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub project_name: String,
    /// Browser URL of the project, without a trailing slash.
    pub project_url: String,
    pub pipeline: Option<Pipeline>,
    pub from_tag: String,
    pub to_tag: String,
    pub commits: Vec<String>,
    pub deploy_time: NaiveDateTime,
    pub summary: Option<String>,
    /// Issue tracker base for linking keys like `MIL-123`.
    pub issue_base_url: String,
}

impl Announcement {
    /// `{project}/-/compare/{from}...{to}`
    pub fn compare_url(&self) -> String {
        format!(
            "{}/-/compare/{}...{}",
            self.project_url, self.from_tag, self.to_tag
        )
    }

    /// `{project}/-/tags/{ref}`
    pub fn tag_url(&self, tag: &str) -> String {
        format!("{}/-/tags/{tag}", self.project_url)
    }

    fn summary(&self) -> Option<&str> {
        self.summary.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn markdown_commit(&self, commit: &str) -> String {
        format!(
            "{} {}",
            commit_emoji(commit),
            link_issue_keys(commit, &self.issue_base_url, LinkStyle::Markdown)
        )
    }

    /// Chat message for the release channel.
    pub fn slack_message(&self) -> String {
        let mut out = format!(
            "*🚀Production Release〘[{}]({})〙🚀*\n\
             Hi everyone! we are going to have a production deployment with these details:\n\
             {RULE}\n\
             *⏰ Deployment Time:*\n{INDENT}{}\n",
            self.project_name,
            self.project_url,
            format_deploy_time(&self.deploy_time),
        );
        if let Some(p) = &self.pipeline {
            out.push_str(&format!(
                "*🔗 Pipeline*\n{INDENT}[#{} ({})]({})\n",
                p.id, p.ref_name, p.web_url
            ));
        }
        out.push_str(&format!(
            "*🔍 Comparison*\n{INDENT}[{} ⮕ {}]({})\n",
            self.from_tag,
            self.to_tag,
            self.compare_url()
        ));
        if let Some(summary) = self.summary() {
            out.push_str(&format!("*🤖 Summary*\n{INDENT}{summary}\n"));
        }
        out.push_str("*📝 Changes included:*\n");
        for commit in &self.commits {
            out.push_str(&format!("{INDENT}‣ {}\n", self.markdown_commit(commit)));
        }
        out.push_str(RULE);
        out.push('\n');
        out
    }

    /// One emoji-prefixed line per commit.
    pub fn changelog(&self) -> String {
        let mut out = String::new();
        for commit in &self.commits {
            out.push_str(&format!("{} {commit}\n", commit_emoji(commit)));
        }
        out
    }

    /// Markdown table for the deployment wiki page.
    pub fn wiki_markdown(&self) -> String {
        let mut out = String::from(
            "### **💡 Deployment Summary**\n\
             | Information | Details |\n\
             |--------------------|---------|\n",
        );
        out.push_str(&format!(
            "| 🏡 **Project** | [{}]({}) |\n",
            self.project_name, self.project_url
        ));
        out.push_str(&format!(
            "| ⏰ **Deployment Time** | {} |\n",
            format_deploy_time(&self.deploy_time)
        ));
        if let Some(p) = &self.pipeline {
            out.push_str(&format!(
                "| 🏷️ **Tag** | [{}]({}) |\n",
                p.ref_name,
                self.tag_url(&p.ref_name)
            ));
            out.push_str(&format!("| 🔗 **Pipeline** | [#{}]({}) |\n", p.id, p.web_url));
        }
        out.push_str(&format!(
            "| 🔍 **Comparison** | [{} ⮕ {}]({}) |\n",
            self.from_tag,
            self.to_tag,
            self.compare_url()
        ));
        if let Some(summary) = self.summary() {
            out.push_str(&format!("\n### **🤖 Summary**\n{summary}\n"));
        }
        out.push_str("\n### **📝 Change Logs**:\n");
        for commit in &self.commits {
            out.push_str(&format!("- {}\n", self.markdown_commit(commit)));
        }
        out
    }

    /// HTML list for the release-notes field.
    pub fn html_release_notes(&self) -> String {
        let mut items = vec![
            format!(
                r#"<li>Project: <a href="{}">{}</a></li>"#,
                self.project_url,
                escape_html(&self.project_name)
            ),
            format!(
                "<li>Deploy At: {}</li>",
                format_deploy_time(&self.deploy_time)
            ),
        ];
        if let Some(p) = &self.pipeline {
            items.push(format!(
                r#"<li>Pipeline: <a href="{}">#{}</a></li>"#,
                p.web_url, p.id
            ));
            items.push(format!(
                r#"<li>Tag: <a href="{}">{}</a></li>"#,
                self.tag_url(&p.ref_name),
                escape_html(&p.ref_name)
            ));
        }
        items.push(format!(
            r#"<li>Comparison: <a href="{}">View comparison</a></li>"#,
            self.compare_url()
        ));
        if let Some(summary) = self.summary() {
            items.push(format!("<li>Summary: {}</li>", escape_html(summary)));
        }
        let changes: Vec<String> = self
            .commits
            .iter()
            .map(|c| {
                format!(
                    "<li>{}</li>",
                    link_issue_keys(&escape_html(c), &self.issue_base_url, LinkStyle::Html)
                )
            })
            .collect();
        items.push(format!(
            "<li>Changes: <ul>{}</ul></li>",
            changes.join("\n")
        ));

        format!("<ul>\n  {}\n</ul>\n", items.join("\n  "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn announcement() -> Announcement {
        Announcement {
            project_name: "web-app".into(),
            project_url: "https://gitlab.com/acme/web-app".into(),
            pipeline: Some(Pipeline {
                id: 981,
                ref_name: "v2.4.0".into(),
                web_url: "https://gitlab.com/acme/web-app/-/pipelines/981".into(),
            }),
            from_tag: "v2.3.0".into(),
            to_tag: "v2.4.0".into(),
            commits: vec![
                "feat: add CSV export MIL-42".into(),
                "fix: <script> in title".into(),
            ],
            deploy_time: NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            summary: None,
            issue_base_url: "https://jira.example".into(),
        }
    }

    #[test]
    fn urls_point_at_project() {
        let a = announcement();
        assert_eq!(
            a.compare_url(),
            "https://gitlab.com/acme/web-app/-/compare/v2.3.0...v2.4.0"
        );
        assert_eq!(a.tag_url("v2.4.0"), "https://gitlab.com/acme/web-app/-/tags/v2.4.0");
    }

    #[test]
    fn slack_message_lists_details_and_changes() {
        let msg = announcement().slack_message();
        assert!(msg.starts_with("*🚀Production Release〘[web-app](https://gitlab.com/acme/web-app)〙🚀*"));
        assert!(msg.contains("19 Oct 2026, 14:30"));
        assert!(msg.contains("[#981 (v2.4.0)](https://gitlab.com/acme/web-app/-/pipelines/981)"));
        assert!(msg.contains("[v2.3.0 ⮕ v2.4.0]"));
        assert!(msg.contains("‣ ✨ feat: add CSV export [MIL-42](https://jira.example/browse/MIL-42)"));
        assert!(!msg.contains("Summary"));
        assert!(msg.ends_with("―――\n"));
    }

    #[test]
    fn summary_section_appears_when_present() {
        let mut a = announcement();
        a.summary = Some("Adds CSV export and fixes a rendering bug.".into());
        assert!(a.slack_message().contains("*🤖 Summary*"));
        assert!(a.wiki_markdown().contains("### **🤖 Summary**\nAdds CSV export"));
        assert!(a.html_release_notes().contains("<li>Summary: Adds CSV export"));

        a.summary = Some("   ".into());
        assert!(!a.wiki_markdown().contains("🤖"));
    }

    #[test]
    fn changelog_is_plain() {
        assert_eq!(
            announcement().changelog(),
            "✨ feat: add CSV export MIL-42\n🐞 fix: <script> in title\n"
        );
    }

    #[test]
    fn wiki_table_has_tag_and_pipeline_rows() {
        let md = announcement().wiki_markdown();
        assert!(md.contains("| 🏷️ **Tag** | [v2.4.0](https://gitlab.com/acme/web-app/-/tags/v2.4.0) |"));
        assert!(md.contains("| 🔗 **Pipeline** | [#981]("));
        assert!(md.contains("- 🐞 fix: <script> in title"));

        let mut a = announcement();
        a.pipeline = None;
        let md = a.wiki_markdown();
        assert!(!md.contains("**Pipeline**"));
        assert!(md.contains("**Comparison**"));
    }

    #[test]
    fn html_escapes_titles_but_links_keys() {
        let html = announcement().html_release_notes();
        assert!(html.contains("fix: &lt;script&gt; in title"));
        assert!(html.contains(r#"<a href="https://jira.example/browse/MIL-42">MIL-42</a>"#));
        assert!(html.contains(r#"<li>Tag: <a href="https://gitlab.com/acme/web-app/-/tags/v2.4.0">v2.4.0</a></li>"#));
        assert!(html.starts_with("<ul>"));
    }
}
