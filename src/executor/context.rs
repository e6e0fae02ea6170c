//! Execution contexts and the session that owns the current one.
//!
//! A [`Session`] holds the probe, the runner settings, the cancellation token
//! and the *current* [`ExecutionContext`]. Nested runs swap a different context
//! in for their duration and always put the caller's back, including when the
//! nested run panics.

use anyhow::{Context as _, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::polling::sleep_cancellable;
use super::runtime::SequenceRunner;
use super::trace::{RunResult, RunStatus};
use crate::config::{ObjectRegistry, RunnerSettings, SequenceDocument, Step, loader};
use crate::probe::ScreenProbe;

/// Where a program came from: its sequence name and, for file-backed
/// sequences, the directory image paths were resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIdentity {
    pub name: String,
    pub project_root: Option<PathBuf>,
}

/// Ordered, 1-indexed (for users) list of steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    steps: Vec<Step>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step at the end.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Insert at a 0-indexed position; out-of-range positions append.
    pub fn insert(&mut self, index: usize, step: Step) {
        let index = index.min(self.steps.len());
        self.steps.insert(index, step);
    }

    /// Remove the step at a 0-indexed position, if there is one.
    pub fn remove(&mut self, index: usize) -> Option<Step> {
        (index < self.steps.len()).then(|| self.steps.remove(index))
    }

    /// Step at a 0-indexed program counter.
    pub fn get(&self, pc: usize) -> Option<&Step> {
        self.steps.get(pc)
    }

    /// Number of steps; also the highest valid 1-indexed jump target.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }
}

impl From<Vec<Step>> for Program {
    fn from(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

impl FromIterator<Step> for Program {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

/// Everything one run needs: objects, program, repeat count and identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub registry: ObjectRegistry,
    pub program: Program,
    /// Outer repetitions; `0` repeats until aborted.
    pub loop_count: u32,
    pub source: SourceIdentity,
}

impl ExecutionContext {
    pub fn from_document(doc: SequenceDocument, project_root: Option<PathBuf>) -> Self {
        Self {
            registry: doc.objects,
            program: Program::from(doc.steps),
            loop_count: doc.loop_count,
            source: SourceIdentity {
                name: doc.sequence_name,
                project_root,
            },
        }
    }

    /// Load and validate a sequence file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = loader::load_from_path(path)
            .with_context(|| format!("Failed to load sequence {}", path.display()))?;
        let root = loader::project_root(path).to_path_buf();
        Ok(Self::from_document(doc, Some(root)))
    }

    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }
}

/// One entry of a batch.
#[derive(Debug, Clone)]
pub enum ProgramSource {
    File(PathBuf),
    Context(Box<ExecutionContext>),
}

impl ProgramSource {
    fn label(&self) -> String {
        match self {
            ProgramSource::File(path) => path.display().to_string(),
            ProgramSource::Context(ctx) => ctx.source.name.clone(),
        }
    }

    fn load(&self) -> Result<ExecutionContext> {
        match self {
            ProgramSource::File(path) => ExecutionContext::load(path),
            ProgramSource::Context(ctx) => Ok((**ctx).clone()),
        }
    }
}

impl From<ExecutionContext> for ProgramSource {
    fn from(ctx: ExecutionContext) -> Self {
        ProgramSource::Context(Box::new(ctx))
    }
}

/// How many times a batch walks its source list. `None` repeats until aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub cycles: Option<u32>,
}

impl BatchPolicy {
    pub fn cycles(cycles: u32) -> Self {
        Self {
            cycles: Some(cycles),
        }
    }

    pub fn forever() -> Self {
        Self { cycles: None }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::cycles(1)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchItemResult {
    /// Batch cycle, starting at 1.
    pub cycle: u32,
    /// Position in the source list.
    pub index: usize,
    pub name: String,
    pub result: RunResult,
}

/// Puts the saved context back into its slot when dropped.
struct ContextGuard<'s> {
    slot: &'s mut ExecutionContext,
    saved: Option<ExecutionContext>,
}

impl<'s> ContextGuard<'s> {
    fn swap_in(slot: &'s mut ExecutionContext, next: ExecutionContext) -> Self {
        let saved = std::mem::replace(slot, next);
        Self {
            slot,
            saved: Some(saved),
        }
    }

    fn active(&self) -> &ExecutionContext {
        &*self.slot
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.slot = saved;
            debug!(target: "autoseq::session", sequence = %self.slot.source.name, "Restored caller context");
        }
    }
}

pub struct Session<P: ScreenProbe> {
    current: ExecutionContext,
    probe: P,
    settings: RunnerSettings,
    cancel: CancellationToken,
}

impl<P: ScreenProbe> Session<P> {
    /// Create a session with an empty current context.
    ///
    /// `cancel` is shared with whoever may stop the run (e.g. a Ctrl+C handler).
    pub fn new(probe: P, settings: RunnerSettings, cancel: CancellationToken) -> Self {
        Self {
            current: ExecutionContext::default(),
            probe,
            settings,
            cancel,
        }
    }

    /// Builder-style variant of [`Session::set_current`].
    pub fn with_context(mut self, ctx: ExecutionContext) -> Self {
        self.current = ctx;
        self
    }

    /// The context [`Session::run`] executes.
    pub fn current(&self) -> &ExecutionContext {
        &self.current
    }

    /// Replace the current context.
    pub fn set_current(&mut self, ctx: ExecutionContext) {
        self.current = ctx;
    }

    /// Runner settings used by every run of this session.
    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Access the probe (e.g. to inspect a test double after a run).
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    /// The token that stops runs. A safety abort cancels it.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Swap a cancelled token for a fresh one so the session can run again.
    ///
    /// Returns the token now in use; hand it to whatever should be able to stop
    /// the next run. A token that is not cancelled is kept.
    pub fn rearm(&mut self) -> CancellationToken {
        if self.cancel.is_cancelled() {
            debug!(target: "autoseq::session", "Re-arming cancellation token");
            self.cancel = CancellationToken::new();
        }
        self.cancel.clone()
    }

    /// Run the current context after the configured start delay.
    pub fn run(&mut self) -> RunResult {
        if sleep_cancellable(self.settings.start_delay(), &self.cancel).is_err() {
            return RunResult::aborted();
        }
        execute_guarded(&mut self.probe, &self.settings, &self.cancel, &self.current)
    }

    /// Run `ctx` in place of the current context, then restore the current one.
    ///
    /// A panic inside the run is caught and reported as [`RunStatus::Faulted`].
    pub fn run_nested(&mut self, ctx: ExecutionContext) -> RunResult {
        let guard = ContextGuard::swap_in(&mut self.current, ctx);
        debug!(target: "autoseq::session", sequence = %guard.active().source.name, "Entering nested run");
        execute_guarded(&mut self.probe, &self.settings, &self.cancel, guard.active())
    }

    /// Run each source in turn, `policy` times over.
    ///
    /// A source that fails to load is reported as `Faulted` and the batch moves
    /// on; an `Aborted` run stops the whole batch.
    pub fn run_many(&mut self, sources: &[ProgramSource], policy: BatchPolicy) -> Vec<BatchItemResult> {
        let mut results = Vec::new();
        if sources.is_empty() {
            warn!(target: "autoseq::session", "Batch has no sequences");
            return results;
        }
        if sleep_cancellable(self.settings.start_delay(), &self.cancel).is_err() {
            return results;
        }

        let mut cycle = 1u32;
        while policy.cycles.is_none_or(|c| cycle <= c) {
            info!(target: "autoseq::session", cycle, cycles = ?policy.cycles, "Starting batch cycle");
            for (index, source) in sources.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    info!(target: "autoseq::session", cycle, index, "Batch cancelled");
                    return results;
                }
                let name = source.label();
                let result = match source.load() {
                    Ok(ctx) => self.run_nested(ctx),
                    Err(err) => {
                        error!(target: "autoseq::session", sequence = %name, error = %format!("{err:#}"), "Skipping sequence");
                        RunResult::faulted(format!("{err:#}"))
                    }
                };
                let aborted = result.status == RunStatus::Aborted;
                results.push(BatchItemResult {
                    cycle,
                    index,
                    name,
                    result,
                });
                if aborted {
                    warn!(target: "autoseq::session", cycle, index, "Sequence aborted; stopping batch");
                    return results;
                }
            }
            cycle = cycle.saturating_add(1);
        }
        results
    }
}

fn execute_guarded<P: ScreenProbe + ?Sized>(
    probe: &mut P,
    settings: &RunnerSettings,
    cancel: &CancellationToken,
    ctx: &ExecutionContext,
) -> RunResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        SequenceRunner::new(probe, settings, cancel).run(ctx)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(target: "autoseq::session", sequence = %ctx.source.name, %reason, "Run panicked");
            RunResult::faulted(reason)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Action, ClickParams, ObjectDef, Point, Rect, RegionObject};
    use crate::probe::mock::MockProbe;
    use std::io::Write as _;

    fn settings() -> RunnerSettings {
        RunnerSettings {
            poll_interval_ms: 1,
            ..RunnerSettings::default()
        }
    }

    fn named(name: &str, steps: Vec<Step>) -> ExecutionContext {
        let registry = ObjectRegistry::new()
            .with(
                "R",
                ObjectDef::Region(RegionObject {
                    coords: Rect::new(0, 0, 10, 10),
                    mode: None,
                }),
            )
            .unwrap();
        ExecutionContext {
            registry,
            program: Program::from(steps),
            loop_count: 1,
            source: SourceIdentity {
                name: name.into(),
                project_root: None,
            },
        }
    }

    fn click_r() -> Step {
        Step::on("R", Action::Click(ClickParams::default()))
    }

    #[test]
    fn program_editing() {
        let mut program = Program::new();
        program.push(Step::global(Action::wait_secs(1.0)));
        program.insert(0, click_r());
        program.insert(99, Step::global(Action::goto(1)));
        assert_eq!(program.len(), 3);
        assert_eq!(program.get(0).unwrap().action.name(), "Click");
        assert_eq!(program.remove(2).unwrap().action.name(), "Goto Step");
        assert!(program.remove(5).is_none());
        assert_eq!(program.iter().count(), 2);
    }

    #[test]
    fn nested_run_restores_caller_context() {
        let caller = named("caller", vec![Step::global(Action::wait_secs(0.0))]);
        let snapshot = caller.clone();
        let mut session = Session::new(MockProbe::new(), settings(), CancellationToken::new())
            .with_context(caller);

        let result = session.run_nested(named("inner", vec![click_r()]));
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(session.current(), &snapshot);
        assert_eq!(session.probe_mut().clicks(), vec![Point(5, 5)]);
    }

    #[test]
    fn nested_panic_is_faulted_and_context_restored() {
        let caller = named("caller", vec![]);
        let snapshot = caller.clone();
        let probe = MockProbe::new().panicking("click");
        let mut session =
            Session::new(probe, settings(), CancellationToken::new()).with_context(caller);

        let result = session.run_nested(named("inner", vec![click_r()]));
        assert_eq!(result.status, RunStatus::Faulted);
        assert!(result.fault.unwrap().contains("mock probe panicked"));
        assert_eq!(session.current(), &snapshot);
    }

    #[test]
    fn nested_safety_abort_restores_caller_context() {
        let caller = named("caller", vec![Step::global(Action::wait_secs(0.0))]);
        let snapshot = caller.clone();
        let probe = MockProbe::new().aborting("click");
        let mut session =
            Session::new(probe, settings(), CancellationToken::new()).with_context(caller);

        let result = session.run_nested(named("inner", vec![click_r()]));
        assert_eq!(result.status, RunStatus::Aborted);
        assert_eq!(session.current(), &snapshot);
        assert!(session.cancel_token().is_cancelled());
    }

    #[test]
    fn rearm_lets_the_session_run_after_an_abort() {
        let probe = MockProbe::new().aborting("click");
        let mut session = Session::new(probe, settings(), CancellationToken::new())
            .with_context(named("again", vec![Step::global(Action::wait_secs(0.0))]));

        session.run_nested(named("inner", vec![click_r()]));
        assert_eq!(session.run().status, RunStatus::Aborted);

        let token = session.rearm();
        assert!(!token.is_cancelled());
        assert_eq!(session.run().status, RunStatus::Completed);

        // An armed token is left alone.
        let same = session.rearm();
        token.cancel();
        assert!(same.is_cancelled());
    }

    #[test]
    fn guard_restores_while_unwinding() {
        let mut slot = named("caller", vec![]);
        let snapshot = slot.clone();
        let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
            let guard = ContextGuard::swap_in(&mut slot, named("inner", vec![click_r()]));
            assert_eq!(guard.active().source.name, "inner");
            panic!("boom");
        }));
        assert!(unwound.is_err());
        assert_eq!(slot, snapshot);
    }

    #[test]
    fn batch_runs_every_source_each_cycle() {
        let sources = vec![
            ProgramSource::from(named("a", vec![click_r()])),
            ProgramSource::from(named("b", vec![Step::global(Action::wait_secs(0.0))])),
        ];
        let mut session = Session::new(MockProbe::new(), settings(), CancellationToken::new());
        let results = session.run_many(&sources, BatchPolicy::cycles(2));
        let order: Vec<_> = results
            .iter()
            .map(|r| (r.cycle, r.name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "a"), (1, "b"), (2, "a"), (2, "b")]);
        assert!(results.iter().all(|r| r.result.status == RunStatus::Completed));
        assert_eq!(session.current(), &ExecutionContext::default());
    }

    #[test]
    fn batch_continues_past_load_failures_and_stops_on_abort() {
        let sources = vec![
            ProgramSource::File(PathBuf::from("/no/such/sequence.json")),
            ProgramSource::from(named("clicker", vec![click_r()])),
            ProgramSource::from(named("never", vec![Step::global(Action::wait_secs(0.0))])),
        ];
        let probe = MockProbe::new().aborting("click");
        let mut session = Session::new(probe, settings(), CancellationToken::new());
        let results = session.run_many(&sources, BatchPolicy::forever());
        let statuses: Vec<_> = results.iter().map(|r| r.result.status).collect();
        assert_eq!(statuses, vec![RunStatus::Faulted, RunStatus::Aborted]);
        assert!(session.cancel_token().is_cancelled());
    }

    #[test]
    fn loads_file_sources_with_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "loop_count": 2,
                "objects": {{ "R": {{ "type": "region", "coords": [0, 0, 4, 4] }} }},
                "steps": [{{ "object_name": "R", "action": "Click", "params": {{}} }}]
            }}"#
        )
        .unwrap();

        let ctx = ExecutionContext::load(&path).unwrap();
        assert_eq!(ctx.source.name, "login");
        assert_eq!(ctx.source.project_root.as_deref(), Some(dir.path()));
        assert_eq!(ctx.loop_count, 2);

        let mut session = Session::new(MockProbe::new(), settings(), CancellationToken::new());
        let results = session.run_many(&[ProgramSource::File(path)], BatchPolicy::default());
        assert_eq!(results[0].result.loops_completed, 2);
        assert_eq!(session.probe_mut().clicks().len(), 2);
    }
}
