//! Self-contained HTML report
//!
//! Failure screenshots are embedded as base64 data URIs so the report can be
//! archived or mailed as a single file.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::E2eResult;
use crate::runner::{ScenarioResult, SuiteResult};

pub const REPORT_FILE: &str = "report.html";

const REPORT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 2rem; color: #222; }
        h1 { margin-bottom: 0.25rem; }
        .meta { color: #666; margin-bottom: 1.5rem; }
        table { border-collapse: collapse; width: 100%; }
        th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #ddd; vertical-align: top; }
        .pass { color: #1a7f37; font-weight: 600; }
        .fail { color: #cf222e; font-weight: 600; }
        .error { font-family: monospace; white-space: pre-wrap; }
        img { max-width: 480px; border: 1px solid #ccc; margin-top: 6px; }
    </style>
</head>
<body>
"#;

const REPORT_TAIL: &str = "</body>\n</html>\n";

/// Escape text for use in HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_html(title: &str, suite: &SuiteResult) -> String {
    let mut html = REPORT_HEAD.replace("{title}", &escape_html(title));

    html.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
    html.push_str(&format!(
        r#"<p class="meta">Started {} &middot; {} scenario(s) &middot; <span class="pass">{} passed</span> &middot; <span class="fail">{} failed</span> &middot; {} ms</p>
"#,
        suite.started_at.to_rfc3339(),
        suite.total,
        suite.passed,
        suite.failed,
        suite.duration_ms
    ));

    html.push_str("<table>\n<tr><th>Scenario</th><th>Tags</th><th>Status</th><th>Duration</th><th>Details</th></tr>\n");
    for result in &suite.results {
        html.push_str(&render_row(result));
    }
    html.push_str("</table>\n");
    html.push_str(REPORT_TAIL);
    html
}

fn render_row(result: &ScenarioResult) -> String {
    let status = if result.success {
        r#"<span class="pass">PASS</span>"#
    } else {
        r#"<span class="fail">FAIL</span>"#
    };

    let mut details = String::new();
    if let Some(error) = &result.error {
        details.push_str(&format!(
            r#"<div class="error">[{}] {}</div>"#,
            escape_html(result.error_kind.as_deref().unwrap_or("error")),
            escape_html(error)
        ));
    }
    if let Some(path) = &result.screenshot_path {
        match std::fs::read(path) {
            Ok(bytes) => details.push_str(&format!(
                r#"<img alt="{}" src="data:image/png;base64,{}">"#,
                escape_html(&result.name),
                STANDARD.encode(bytes)
            )),
            Err(e) => warn!("Cannot embed screenshot {}: {}", path.display(), e),
        }
    }

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{} ms</td><td>{}</td></tr>\n",
        escape_html(&result.name),
        escape_html(&result.tags.join(", ")),
        status,
        result.duration_ms,
        details
    )
}

/// Write `report.html` into `output_dir`
pub fn write_html_report(output_dir: &Path, title: &str, suite: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(REPORT_FILE);
    std::fs::write(&path, render_html(title, suite))?;
    info!("Report written to: {}", path.display());
    Ok(path)
}
