//! Read-only access to persisted analysis results.
//!
//! `AnalysisResults` is the facade reports consume. `AnalysisSnapshot` is the
//! in-memory implementation, loaded from a `ResultsDb` or built directly.

mod db;

use std::collections::BTreeMap;

pub use db::{ResultsDb, ResultsError, ResultsResult, CURRENT_SCHEMA_VERSION};

use crate::model::{format_address, CallInstruction, ExecutableRecord, Function};
use crate::pipeline::{PipelineError, PipelineResult};

/// Query facade over one executable's analysis results.
pub trait AnalysisResults {
    /// Call instructions keyed by containing function address, ascending;
    /// each list is in instruction order.
    fn calls_by_function(&self) -> &BTreeMap<u64, Vec<CallInstruction>>;

    fn function(&self, address: u64) -> Option<&Function>;

    /// Display name of a function, falling back to its address.
    fn function_display_name(&self, address: u64) -> String {
        match self.function(address) {
            Some(function) => function.display_name(),
            None => format_address(address),
        }
    }
}

/// Fully loaded analysis results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    functions: BTreeMap<u64, Function>,
    calls: BTreeMap<u64, Vec<CallInstruction>>,
}

impl AnalysisSnapshot {
    /// Build a snapshot, rejecting call instructions whose containing
    /// function is unknown. Calls keep their relative order per function.
    pub fn new(functions: Vec<Function>, calls: Vec<CallInstruction>) -> ResultsResult<Self> {
        let functions: BTreeMap<u64, Function> =
            functions.into_iter().map(|f| (f.address, f)).collect();

        let mut by_function: BTreeMap<u64, Vec<CallInstruction>> = BTreeMap::new();
        for call in calls {
            if !functions.contains_key(&call.function_address) {
                return Err(ResultsError::Malformed(format!(
                    "call at {} references unknown function {}",
                    format_address(call.address),
                    format_address(call.function_address)
                )));
            }
            by_function.entry(call.function_address).or_default().push(call);
        }

        Ok(Self { functions, calls: by_function })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn call_count(&self) -> usize {
        self.calls.values().map(Vec::len).sum()
    }
}

impl AnalysisResults for AnalysisSnapshot {
    fn calls_by_function(&self) -> &BTreeMap<u64, Vec<CallInstruction>> {
        &self.calls
    }

    fn function(&self, address: u64) -> Option<&Function> {
        self.functions.get(&address)
    }
}

/// Load the results for a prepared executable.
///
/// Fails with `AnalysisNotFound` when no results database exists yet.
pub fn load_analysis_results(record: &ExecutableRecord) -> PipelineResult<AnalysisSnapshot> {
    let layout = record.layout();
    if !layout.results_db_path.is_file() {
        return Err(PipelineError::AnalysisNotFound(layout.results_db_path));
    }
    let db = ResultsDb::open_read_only(&layout.results_db_path)?;
    Ok(db.load_snapshot()?)
}
