//! Run results: what one worker invocation produced.
//!
//! `ParsedOutput` is the lossy extraction from the worker's log; `RunResult` merges it
//! with the exit status and the failure classification. Neither is ever mutated after
//! construction.

use serde::Serialize;

use super::errors::RunErrorKind;
use super::ids::RunId;
use super::mode::RunMode;

/// Structured fields scraped from the worker output.
///
/// The zero value (`Default`) is what an output with no recognized markers yields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedOutput {
    #[serde(rename = "positions")]
    pub positions_found: u32,
    pub total_value: f64,
    #[serde(rename = "redeemed")]
    pub redeemed_count: u32,
    #[serde(rename = "transactions")]
    pub transaction_hashes: Vec<String>,
}

/// The outcome of one run.
///
/// Serialized as the payload of the `result` event. The raw output and the failure
/// classification stay out of the success event; failures are reported through
/// [`RunError`](super::events::RunError) instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub mode: RunMode,
    #[serde(rename = "success")]
    pub succeeded: bool,
    #[serde(flatten)]
    pub parsed: ParsedOutput,
    pub exit_code: i32,
    #[serde(skip)]
    pub raw_output: String,
    #[serde(skip)]
    pub failure: Option<RunErrorKind>,
}

impl RunResult {
    /// A run where the worker finished on its own.
    ///
    /// `succeeded` follows the exit code alone: `0` is success, anything else is a
    /// [`RunErrorKind::WorkerFailure`].
    pub fn completed(
        run_id: RunId,
        mode: RunMode,
        exit_code: i32,
        parsed: ParsedOutput,
        raw_output: String,
    ) -> Self {
        let succeeded = exit_code == 0;
        Self {
            run_id,
            mode,
            succeeded,
            parsed,
            exit_code,
            raw_output,
            failure: (!succeeded).then_some(RunErrorKind::WorkerFailure),
        }
    }

    /// A run that failed with the given classification.
    ///
    /// Such a run never counts as succeeded, even if partial output was parsed.
    pub fn failed(
        run_id: RunId,
        mode: RunMode,
        kind: RunErrorKind,
        parsed: ParsedOutput,
        raw_output: String,
    ) -> Self {
        Self {
            run_id,
            mode,
            succeeded: false,
            parsed,
            exit_code: -1,
            raw_output,
            failure: Some(kind),
        }
    }

    pub fn positions_found(&self) -> u32 {
        self.parsed.positions_found
    }

    pub fn total_value(&self) -> f64 {
        self.parsed.total_value
    }

    pub fn redeemed_count(&self) -> u32 {
        self.parsed.redeemed_count
    }

    pub fn transaction_hashes(&self) -> &[String] {
        &self.parsed.transaction_hashes
    }
}
