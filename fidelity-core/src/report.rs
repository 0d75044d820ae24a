// Rendering of fidelity reports for people and machines

use crate::aggregate::FidelityReport;
use crate::result::{ComparisonResult, Modality};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEAVY_RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn render(&self, report: &FidelityReport) -> Result<String, serde_json::Error> {
        match self {
            ReportFormat::Text => Ok(generate_text_report(report)),
            ReportFormat::Json => generate_json_report(report),
        }
    }
}

pub fn generate_text_report(report: &FidelityReport) -> String {
    let mut out = String::new();

    out.push_str(HEAVY_RULE);
    out.push_str("                        FIDELITY MIGRATION REPORT\n");
    out.push_str(HEAVY_RULE);
    out.push('\n');

    out.push_str(&format!(
        "Generated:      {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Overall Score:  {}\n",
        percent(report.overall_score())
    ));
    out.push_str(&format!(
        "Target:         {}\n",
        percent(report.target_threshold())
    ));
    out.push_str(&format!(
        "Result:         {}\n\n",
        if report.meets_target() {
            "TARGET MET"
        } else {
            "BELOW TARGET"
        }
    ));

    out.push_str(HEAVY_RULE);
    out.push_str("SUB-SCORES\n");
    out.push_str(HEAVY_RULE);
    out.push('\n');

    for (modality, result) in report.sub_scores() {
        out.push_str(&format!(
            "  {:<12} {:>8}{}\n",
            modality.label(),
            percent(result.score()),
            if result.error().is_some() { "  (degraded)" } else { "" }
        ));
    }
    out.push('\n');

    let noted: Vec<(&Modality, &ComparisonResult)> = report
        .sub_scores()
        .iter()
        .filter(|(_, r)| r.error().is_some() || has_differences(r))
        .collect();

    if !noted.is_empty() {
        out.push_str(HEAVY_RULE);
        out.push_str("NOTES\n");
        out.push_str(HEAVY_RULE);
        out.push('\n');

        for (modality, result) in noted {
            out.push_str(&format!("{}:\n", modality.label()));
            if let Some(error) = result.error() {
                out.push_str(&wrap_text(&format!("Error: {}", error), 80, "  "));
                out.push('\n');
            }
            if let Some(Value::Array(items)) = result.detail("notable_differences") {
                for item in items.iter().filter_map(Value::as_str) {
                    out.push_str(&wrap_text(&format!("- {}", item), 80, "  "));
                    out.push('\n');
                }
            }
            out.push('\n');
            out.push_str(LIGHT_RULE);
            out.push('\n');
        }
    }

    out.push_str(HEAVY_RULE);
    out.push_str("RECOMMENDATIONS\n");
    out.push_str(HEAVY_RULE);
    out.push('\n');
    for line in report.recommendations() {
        out.push_str(&format!("  {}\n", line));
    }
    out.push('\n');

    out.push_str(HEAVY_RULE);
    out.push_str("                          End of Report\n");
    out.push_str(HEAVY_RULE);
    out.push_str("\nGenerated by Fidelity - website migration fidelity scorer\n\n");

    out
}

pub fn generate_json_report(report: &FidelityReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "metadata": {
            "generator": "Fidelity",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "format": "json"
        },
        "report": report
    });

    serde_json::to_string_pretty(&json_report)
}

/// Read a report back from [`generate_json_report`] output.
pub fn parse_json_report(json: &str) -> Result<FidelityReport, serde_json::Error> {
    #[derive(Deserialize)]
    struct Envelope {
        report: FidelityReport,
    }
    serde_json::from_str::<Envelope>(json).map(|envelope| envelope.report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn has_differences(result: &ComparisonResult) -> bool {
    matches!(result.detail("notable_differences"), Some(Value::Array(items)) if !items.is_empty())
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    let limit = width.saturating_sub(indent.len());

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > limit {
            lines.push(format!("{}{}", indent, current));
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(format!("{}{}", indent, current));
    }

    lines.join("\n")
}
