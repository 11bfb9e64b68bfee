//! Structured update notification for presentation layers

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a console or dialog needs to tell the user about an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInfo {
    pub available: bool,
    pub current_version: String,
    pub latest_version: String,
    pub release_notes: String,
    /// Short bullet/section digest of the release notes
    pub summary: Vec<String>,
    pub release_url: String,
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Extract up to `max_lines` headings and bullets from markdown release notes.
///
/// Headings (`#` lines containing a space) become `📋 <title>`, bullets
/// (`-` or `*`) become `• <item>`. Everything else is dropped.
pub fn summarize_notes(body: &str, max_lines: usize) -> Vec<String> {
    let mut summary = Vec::new();

    for line in body.lines().map(str::trim) {
        if summary.len() >= max_lines {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') && line.contains(' ') {
            let heading = line.trim_start_matches(['#', ' ']);
            if !heading.is_empty() {
                summary.push(format!("📋 {}", heading));
            }
        } else if line.starts_with('-') || line.starts_with('*') {
            let item = line.trim_start_matches(['-', '*', ' ']);
            if !item.is_empty() {
                summary.push(format!("• {}", item));
            }
        }
    }

    summary
}
