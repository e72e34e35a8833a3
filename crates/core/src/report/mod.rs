//! String-argument cross-reference reports.
//!
//! Two views over the same filtered set of call instructions (those passing at
//! least one string literal):
//!
//! - `targeted_report`: calls to one target, grouped by caller.
//! - `cross_reference_report`: every call, grouped by caller and by callee.
//!   The caller view also lists functions whose calls pass no strings.
//!
//! Both are pure functions of an `AnalysisResults` value. Text rendering lives
//! on the report types; JSON output goes through `serde`.

use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{format_address, CallInstruction};
use crate::results::AnalysisResults;

const SECTION_RULE_WIDTH: usize = 80;

/// One string-argument call as shown in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub function_address: String,
    pub address: String,
    pub target: String,
    pub annotation: String,
}

impl CallSite {
    fn from_instruction(call: &CallInstruction) -> Self {
        Self {
            function_address: format_address(call.function_address),
            address: format_address(call.address),
            target: call.target.render(),
            annotation: call.annotation.clone(),
        }
    }
}

/// The string-argument calls made by one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerSection {
    pub address: String,
    pub display_name: String,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetedReport {
    pub target: String,
    pub callers: Vec<CallerSection>,
}

/// String-argument calls sharing one call target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalleeGroup {
    pub target: String,
    pub calls: Vec<CallSite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReferenceReport {
    pub callers: Vec<CallerSection>,
    pub callees: Vec<CalleeGroup>,
}

/// Collect string-argument calls per caller, callers ascending, keeping only
/// calls accepted by `keep`. Callers with no surviving calls are omitted
/// unless `keep_empty` is set.
fn caller_sections(
    results: &dyn AnalysisResults,
    keep: impl Fn(&CallInstruction) -> bool,
    keep_empty: bool,
) -> Vec<CallerSection> {
    results
        .calls_by_function()
        .iter()
        .filter_map(|(&address, calls)| {
            let calls: Vec<CallSite> = calls
                .iter()
                .filter(|call| call.has_string_args && keep(call))
                .map(CallSite::from_instruction)
                .collect();
            if calls.is_empty() && !keep_empty {
                return None;
            }
            Some(CallerSection {
                address: format_address(address),
                display_name: results.function_display_name(address),
                calls,
            })
        })
        .collect()
}

/// All string-argument calls whose target renders exactly as `target`.
pub fn targeted_report(results: &dyn AnalysisResults, target: &str) -> TargetedReport {
    TargetedReport {
        target: target.to_string(),
        callers: caller_sections(results, |call| call.target.render() == target, false),
    }
}

/// All string-argument calls, by caller and grouped by callee.
///
/// Every function that makes calls gets a caller section, even when none of
/// its calls pass a string. Groups are ordered by target text; entries inside a group by annotation
/// text, ties keeping their scan order.
pub fn cross_reference_report(results: &dyn AnalysisResults) -> CrossReferenceReport {
    let mut groups: IndexMap<String, Vec<CallSite>> = IndexMap::new();
    for calls in results.calls_by_function().values() {
        for call in calls.iter().filter(|call| call.has_string_args) {
            groups.entry(call.target.render()).or_default().push(CallSite::from_instruction(call));
        }
    }

    groups.sort_keys();
    let callees = groups
        .into_iter()
        .map(|(target, mut calls)| {
            calls.sort_by(|a, b| a.annotation.cmp(&b.annotation));
            CalleeGroup { target, calls }
        })
        .collect();

    CrossReferenceReport { callers: caller_sections(results, |_| true, true), callees }
}

fn rule(ch: char) -> String {
    std::iter::repeat(ch).take(SECTION_RULE_WIDTH).collect()
}

fn render_callers(out: &mut String, callers: &[CallerSection]) {
    for caller in callers {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", caller.display_name);
        let _ = writeln!(out, "{}", rule('-'));
        for call in &caller.calls {
            let _ = writeln!(out, "  {}  {}", call.address, call.annotation);
        }
    }
}

impl TargetedReport {
    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        render_callers(&mut out, &self.callers);
        out
    }
}

impl CrossReferenceReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        render_callers(&mut out, &self.callers);

        let _ = writeln!(out);
        let _ = writeln!(out, "Callees");
        let _ = writeln!(out, "{}", rule('='));
        for group in &self.callees {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", group.target);
            let _ = writeln!(out, "{}", rule('-'));
            for call in &group.calls {
                let _ = writeln!(
                    out,
                    "  ({},{})   {}",
                    call.function_address, call.address, call.annotation
                );
            }
        }
        out
    }
}
