use std::collections::BTreeMap;

use anyhow::{Context, Result};
use predeval_types::{EvaluationReport, MetricRecord, MetricScope};

/// Pretty JSON of the whole report, the format the CLI writes with `--json-out`.
pub fn generate_json_report(report: &EvaluationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize evaluation report")
}

/// Renders a standalone HTML page: one table for the global scores, one
/// row per partition for the per-partition scores.
pub fn generate_html_report(report: &EvaluationReport) -> String {
    let global_rows: String = report
        .global()
        .map(|record| {
            format!(
                "<tr><td>{}</td><td class=\"value\">{}</td><td>{}</td></tr>\n",
                html_escape(&record.name),
                html_escape(&record.value),
                html_escape(record.array.as_deref().unwrap_or(""))
            )
        })
        .collect();

    // partition -> metric -> value
    let mut partitions: BTreeMap<String, BTreeMap<&str, &str>> = BTreeMap::new();
    let mut metric_names: Vec<&str> = Vec::new();
    for record in report.records.iter().filter(|r| !r.scope.is_global()) {
        if !metric_names.contains(&record.name.as_str()) {
            metric_names.push(&record.name);
        }
        partitions
            .entry(scope_label(record))
            .or_default()
            .insert(&record.name, &record.value);
    }

    let header: String = metric_names
        .iter()
        .map(|name| format!("<th>{}</th>", html_escape(name)))
        .collect();
    let partition_rows: String = partitions
        .iter()
        .map(|(label, values)| {
            let cells: String = metric_names
                .iter()
                .map(|name| format!("<td class=\"value\">{}</td>", html_escape(values.get(name).copied().unwrap_or("-"))))
                .collect();
            format!("<tr><td>{}</td>{}</tr>\n", html_escape(label), cells)
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Prediction Evaluation Report</title>
    <style>
        body {{ font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; margin: 20px; background: #f5f5f5; }}
        .container {{ max-width: 1400px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }}
        .summary {{ display: flex; gap: 20px; padding: 20px; background: #f8f9fa; border-radius: 6px; }}
        .summary-label {{ font-size: 12px; color: #666; text-transform: uppercase; }}
        .summary-value {{ font-size: 24px; font-weight: 600; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th {{ background: #343a40; color: white; padding: 10px; text-align: left; font-size: 12px; }}
        td {{ padding: 8px 10px; border-bottom: 1px solid #dee2e6; font-size: 13px; }}
        td.value {{ font-family: monospace; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Prediction Evaluation Report</h1>
        <div class="summary">
            <div><div class="summary-label">Task</div><div class="summary-value">{}</div></div>
            <div><div class="summary-label">Classes</div><div class="summary-value">{}</div></div>
            <div><div class="summary-label">Partitions</div><div class="summary-value">{}</div></div>
            <div><div class="summary-label">Records</div><div class="summary-value">{}</div></div>
        </div>
        <h2>Global</h2>
        <table>
            <thead><tr><th>Metric</th><th>Value</th><th>Per class</th></tr></thead>
            <tbody>
{}            </tbody>
        </table>
        <h2>Partitions</h2>
        <table>
            <thead><tr><th>Partition</th>{}</tr></thead>
            <tbody>
{}            </tbody>
        </table>
    </div>
</body>
</html>"#,
        report.task_kind,
        report.number_of_classes,
        partitions.len(),
        report.records.len(),
        global_rows,
        header,
        partition_rows
    )
}

fn scope_label(record: &MetricRecord) -> String {
    match record.scope {
        MetricScope::Global => "global".to_string(),
        // zero-padded so the BTreeMap orders partitions numerically
        MetricScope::Fold { repeat, fold } => format!("r{:04} f{:04}", repeat, fold),
        MetricScope::Sample { repeat, fold, sample, sample_size } => {
            format!("r{:04} f{:04} s{:04} (n={})", repeat, fold, sample, sample_size)
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
