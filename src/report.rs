use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ReportError;
use crate::types::{now_rfc3339, PortResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
}

/// JSON report document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JsonReport {
    pub target: String,
    pub scan_date: String,
    pub total_open_ports: usize,
    pub scan_results: Vec<JsonPortEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JsonPortEntry {
    pub port: u16,
    pub service_banner: String,
}

impl JsonReport {
    pub fn new(target: &str, results: &[PortResult]) -> Self {
        Self {
            target: target.to_string(),
            scan_date: now_rfc3339(),
            total_open_ports: results.len(),
            scan_results: results
                .iter()
                .map(|r| JsonPortEntry {
                    port: r.port,
                    service_banner: r.banner.clone(),
                })
                .collect(),
        }
    }
}

/// Pick the report format from the extension. Anything that is not `.json` or
/// `.html` becomes JSON with `.json` appended.
pub fn resolve_output(path: &Path) -> (PathBuf, ReportFormat) {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => (path.to_path_buf(), ReportFormat::Json),
        Some("html") => (path.to_path_buf(), ReportFormat::Html),
        _ => {
            let mut s = path.as_os_str().to_owned();
            s.push(".json");
            (PathBuf::from(s), ReportFormat::Json)
        }
    }
}

/// Write a report to `path` in the format its extension selects. Returns the
/// path actually written.
pub fn write_report(
    target: &str,
    results: &[PortResult],
    path: &Path,
) -> Result<PathBuf, ReportError> {
    let (path, format) = resolve_output(path);
    match format {
        ReportFormat::Json => write_json(target, results, &path)?,
        ReportFormat::Html => write_html(target, results, &path)?,
    }
    Ok(path)
}

pub fn write_json(target: &str, results: &[PortResult], path: &Path) -> Result<(), ReportError> {
    let report = JsonReport::new(target, results);
    let body = serde_json::to_string_pretty(&report)?;
    write_file(path, &body)?;
    info!(path = %path.display(), "json report written");
    Ok(())
}

pub fn write_html(target: &str, results: &[PortResult], path: &Path) -> Result<(), ReportError> {
    let body = render_html(target, &now_rfc3339(), results);
    write_file(path, &body)?;
    info!(path = %path.display(), "html report written");
    Ok(())
}

/// Read back a JSON report.
pub fn read_json(path: &Path) -> Result<JsonReport, ReportError> {
    let body = fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&body)?)
}

fn write_file(path: &Path, body: &str) -> Result<(), ReportError> {
    fs::write(path, body).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

const HTML_STYLE: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background-color: #1e1e1e; color: #e0e0e0; margin: 40px; }
        h1 { color: #00ff9d; border-bottom: 2px solid #00ff9d; padding-bottom: 10px; }
        .summary { background-color: #2d2d2d; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; background-color: #252526; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #333; }
        th { background-color: #333; color: #00ff9d; }
        tr:hover { background-color: #2d2d2d; }
        .open { color: #00ff9d; font-weight: bold; }
"#;

fn render_html(target: &str, scan_date: &str, results: &[PortResult]) -> String {
    let target = escape_html(target);
    let mut rows = String::new();
    for r in results {
        rows.push_str(&format!(
            "            <tr>\n                <td>{}</td>\n                <td class=\"open\">OPEN</td>\n                <td>{}</td>\n                <td>{}</td>\n            </tr>\n",
            r.port,
            escape_html(&r.banner),
            escape_html(&r.os_guess),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>ViperScan Report - {target}</title>
    <style>{HTML_STYLE}    </style>
</head>
<body>
    <h1>ViperScan Report</h1>
    <div class="summary">
        <p><strong>Target:</strong> {target}</p>
        <p><strong>Date:</strong> {scan_date}</p>
        <p><strong>Open Ports Found:</strong> {count}</p>
    </div>
    <table>
        <thead>
            <tr>
                <th>Port</th>
                <th>Status</th>
                <th>Service Banner</th>
                <th>OS Guess</th>
            </tr>
        </thead>
        <tbody>
{rows}        </tbody>
    </table>
</body>
</html>
"#,
        count = results.len(),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
