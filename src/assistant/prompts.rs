use serde::Serialize;

use crate::tracker::{ApplicationDigest, StuckApplication};

/// Summary prompt template. `{data}` is replaced with the JSON-encoded
/// application list.
pub const SUMMARY_PROMPT_TEMPLATE: &str = "You are a career assistant.

Summarize the user's job search progress based on the data below.
Highlight patterns, progress, and concerns.

Data:
{data}

Keep the response concise and practical.
";

/// Follow-up prompt template. `{data}` is replaced with the JSON-encoded
/// stuck applications.
pub const FOLLOWUP_PROMPT_TEMPLATE: &str = "You are a career coach.

Based on the following stuck job applications,
suggest clear and actionable follow-up steps.

Data:
{data}

Keep it short and practical.
";

pub fn summary_prompt(applications: &[ApplicationDigest]) -> serde_json::Result<String> {
    render(SUMMARY_PROMPT_TEMPLATE, applications)
}

pub fn followup_prompt(stuck: &[StuckApplication]) -> serde_json::Result<String> {
    render(FOLLOWUP_PROMPT_TEMPLATE, stuck)
}

fn render<T: Serialize + ?Sized>(template: &str, data: &T) -> serde_json::Result<String> {
    let encoded = serde_json::to_string_pretty(data)?;
    Ok(template.replace("{data}", &encoded))
}
