//! Run results and the per-step execution trace.

use serde::Serialize;
use std::collections::VecDeque;

use super::error::StepError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every outer iteration ran to the end of the program.
    Completed,
    /// Safety abort or cancellation stopped the run.
    Aborted,
    /// The run could not start (load failure) or panicked.
    Faulted,
}

/// What happened when one step executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    /// Unconditional jump to a 1-indexed step.
    Jumped { to_step: usize },
    /// A condition was evaluated; `to_step` is set when a branch was taken.
    Branched {
        holds: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        to_step: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        waited_ms: Option<u64>,
    },
    /// A wait action gave up. Not an error.
    TimedOut { waited_ms: u64 },
    /// Reported no-op: the step could not apply (bad reference, bad params...).
    Skipped { error: StepError },
    /// The backend failed while the step ran.
    Failed { error: StepError },
    Aborted,
}

impl StepOutcome {
    /// Program counter to continue at, if this outcome moves it.
    pub fn jump_pc(&self) -> Option<usize> {
        match self {
            StepOutcome::Jumped { to_step }
            | StepOutcome::Branched {
                to_step: Some(to_step),
                ..
            } => Some(to_step - 1),
            _ => None,
        }
    }

    pub(crate) fn from_error(error: StepError) -> Self {
        match error {
            StepError::SafetyAbort => StepOutcome::Aborted,
            e if e.is_probe_failure() => StepOutcome::Failed { error: e },
            e => StepOutcome::Skipped { error: e },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepLogEntry {
    /// Outer iteration, starting at 1.
    pub iteration: u32,
    /// 1-indexed step number.
    pub step: usize,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub trace: Vec<StepLogEntry>,
    pub loops_completed: u32,
    /// Entries evicted from the front of `trace` once it hit capacity.
    pub trace_dropped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl RunResult {
    pub fn faulted(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Faulted,
            trace: Vec::new(),
            loops_completed: 0,
            trace_dropped: 0,
            fault: Some(reason.into()),
        }
    }

    pub fn aborted() -> Self {
        Self {
            status: RunStatus::Aborted,
            trace: Vec::new(),
            loops_completed: 0,
            trace_dropped: 0,
            fault: None,
        }
    }

    /// Steps the run executed, counting dropped entries.
    pub fn steps_executed(&self) -> u64 {
        self.trace.len() as u64 + self.trace_dropped
    }
}

/// Ring buffer of trace entries; the oldest go first.
#[derive(Debug)]
pub(crate) struct ExecutionTrace {
    entries: VecDeque<StepLogEntry>,
    capacity: usize,
    dropped: u64,
}

impl ExecutionTrace {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, entry: StepLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn finish(self, status: RunStatus, loops_completed: u32) -> RunResult {
        RunResult {
            status,
            trace: self.entries.into(),
            loops_completed,
            trace_dropped: self.dropped,
            fault: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step: usize) -> StepLogEntry {
        StepLogEntry {
            iteration: 1,
            step,
            action: "Wait",
            target: None,
            outcome: StepOutcome::Done,
        }
    }

    #[test]
    fn trace_drops_oldest_entries() {
        let mut trace = ExecutionTrace::with_capacity(3);
        for step in 1..=5 {
            trace.push(entry(step));
        }
        let result = trace.finish(RunStatus::Completed, 1);
        let steps: Vec<_> = result.trace.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![3, 4, 5]);
        assert_eq!(result.trace_dropped, 2);
        assert_eq!(result.steps_executed(), 5);
    }

    #[test]
    fn jump_pc_is_zero_indexed() {
        assert_eq!(StepOutcome::Jumped { to_step: 4 }.jump_pc(), Some(3));
        let fall_through = StepOutcome::Branched {
            holds: false,
            to_step: None,
            waited_ms: None,
        };
        assert_eq!(fall_through.jump_pc(), None);
        assert_eq!(StepOutcome::Done.jump_pc(), None);
    }

    #[test]
    fn entries_serialize_flat() {
        let mut e = entry(2);
        e.outcome = StepOutcome::Skipped {
            error: StepError::UnresolvedObject { object: None },
        };
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(value["step"], 2);
        assert_eq!(value["outcome"], "skipped");
        assert_eq!(value["error"]["kind"], "unresolved_object");
    }
}
