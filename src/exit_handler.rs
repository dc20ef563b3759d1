//! Exit code logic for the stream-relay process.
//!
//! Single responsibility: map transfer results to the process exit outcome.

use std::process::ExitCode;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every transfer succeeded.
    Success,
    /// At least one transfer failed and was reported as a record.
    Partial,
    /// Every transfer failed, or a failure stopped the run.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
        }
    }
}

/// Determines the process exit outcome from succeeded and failed transfer counts.
pub(crate) fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
