use std::path::Path;

use anyhow::Result;
use binprep_core::report::{cross_reference_report, targeted_report};
use binprep_core::results::{load_analysis_results, AnalysisResults};

use crate::commands::util::{load_config, resolve_executable};

/// Print the string-argument report for a prepared executable.
pub fn report_stringargs_command(
    config_path: Option<&Path>,
    file: &str,
    format: &str,
    target: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let record = resolve_executable(&config, file, format)?;
    let results = load_analysis_results(&record)?;
    print!("{}", render_stringargs(&results, target, json)?);
    Ok(())
}

/// Render the report as text or JSON. Exposed for tests.
pub fn render_stringargs(
    results: &dyn AnalysisResults,
    target: Option<&str>,
    json: bool,
) -> Result<String> {
    let rendered = match target {
        Some(target) => {
            let report = targeted_report(results, target);
            if json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else if report.is_empty() {
                format!("No string-argument calls to {target}\n")
            } else {
                report.render_text()
            }
        }
        None => {
            let report = cross_reference_report(results);
            if json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else {
                report.render_text()
            }
        }
    };
    Ok(rendered)
}
