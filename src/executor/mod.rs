#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Sequence execution engine.

This module wires together:
- `runtime`: the interpreter (`SequenceRunner`), program counter and loop handling
- `conditions`: If Image Found / If Pixel Color evaluation
- `polling`: retry-with-deadline and cancellable sleeps
- `context`: execution contexts, nested runs and batches (`Session`)
- `trace`: run status and the per-step trace
- `error`: per-step failures

Typical usage:
- Load an `ExecutionContext` from a sequence file.
- Build a `Session` with a probe, settings and a cancellation token.
- Call `Session::run`, `run_nested` or `run_many`.

Example:
```no_run
use autoseq::config::RunnerSettings;
use autoseq::executor::{ExecutionContext, RunStatus, Session};
use autoseq::probe::DesktopProbe;
use tokio_util::sync::CancellationToken;

let ctx = ExecutionContext::load("projects/login/login.json")?;
let probe = DesktopProbe::new(true, true); // dry-run
let mut session = Session::new(probe, RunnerSettings::default(), CancellationToken::new())
    .with_context(ctx);
let result = session.run();
assert_ne!(result.status, RunStatus::Faulted);
# Ok::<(), anyhow::Error>(())
```
*/

pub mod conditions;
pub mod context;
pub mod error;
pub mod polling;
pub mod runtime;
pub mod trace;

// Re-exports for convenient access from `autoseq::executor::*`
pub use context::{
    BatchItemResult, BatchPolicy, ExecutionContext, Program, ProgramSource, Session,
    SourceIdentity,
};
pub use error::StepError;
pub use runtime::SequenceRunner;
pub use trace::{RunResult, RunStatus, StepLogEntry, StepOutcome};
