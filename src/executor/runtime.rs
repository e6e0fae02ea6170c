use rand::random_range;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::conditions::{self, ConditionOutcome, PollBudget};
use super::context::ExecutionContext;
use super::error::StepError;
use super::polling::{PollOutcome, poll_until, sleep_cancellable};
use super::trace::{ExecutionTrace, RunResult, RunStatus, StepLogEntry, StepOutcome};
use crate::config::hotkeys;
use crate::config::settings::secs;
use crate::config::{
    Action, ClickParams, GotoParams, IfImageParams, IfPixelParams, ImageObject,
    KeyboardInputParams, ObjectDef, ObjectKind, PixelObject, Resolved, RunnerSettings,
    ScrollParams, Step, StepTarget, WaitForImageParams, WaitForPixelParams, WaitParams, WaitSpec,
};
use crate::probe::ScreenProbe;

/// Interpreter for one execution context.
///
/// The runner:
/// - walks the program with a 0-indexed program counter, repeating it
///   `loop_count` times (`0` = until aborted)
/// - dispatches each step's action against the probe
/// - applies jumps from Goto Step and the If* branches
/// - records every executed step in a bounded trace
///
/// Step failures are logged and execution moves on. A safety abort, or a
/// cancelled token, ends the whole run.
pub struct SequenceRunner<'a, P: ScreenProbe + ?Sized> {
    probe: &'a mut P,
    settings: &'a RunnerSettings,
    cancel: &'a CancellationToken,
}

impl<'a, P: ScreenProbe + ?Sized> SequenceRunner<'a, P> {
    pub fn new(probe: &'a mut P, settings: &'a RunnerSettings, cancel: &'a CancellationToken) -> Self {
        Self {
            probe,
            settings,
            cancel,
        }
    }

    /// Run `ctx` to completion or abort. Blocks the calling thread.
    pub fn run(&mut self, ctx: &ExecutionContext) -> RunResult {
        let steps = ctx.program.len();
        let mut trace = ExecutionTrace::with_capacity(self.settings.trace_capacity);

        info!(
            target: "autoseq::runtime",
            sequence = %ctx.source.name,
            steps,
            loop_count = ctx.loop_count,
            "Starting sequence"
        );

        if steps == 0 {
            info!(target: "autoseq::runtime", sequence = %ctx.source.name, "Program is empty; nothing to run");
            return trace.finish(RunStatus::Completed, 0);
        }

        let mut loops_completed = 0u32;
        while ctx.loop_count == 0 || loops_completed < ctx.loop_count {
            let iteration = loops_completed.saturating_add(1);
            debug!(target: "autoseq::runtime", iteration, "Starting iteration");

            let mut pc = 0usize;
            while let Some(step) = ctx.program.get(pc) {
                if self.cancel.is_cancelled() {
                    info!(target: "autoseq::runtime", iteration, step = pc + 1, "Run cancelled");
                    return trace.finish(RunStatus::Aborted, loops_completed);
                }

                let outcome = match self.execute_step(ctx, step) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        if err != StepError::SafetyAbort {
                            warn!(
                                target: "autoseq::runtime",
                                iteration, step = pc + 1, action = step.action.name(),
                                object = step.object.as_deref().unwrap_or(""),
                                error = %err,
                                "Step failed; continuing"
                            );
                        }
                        StepOutcome::from_error(err)
                    }
                };
                let next = outcome.jump_pc().unwrap_or(pc + 1);
                let aborted = outcome == StepOutcome::Aborted;

                trace.push(StepLogEntry {
                    iteration,
                    step: pc + 1,
                    action: step.action.name(),
                    target: step.object.clone(),
                    outcome,
                });

                if aborted {
                    warn!(target: "autoseq::runtime", iteration, step = pc + 1, "Safety abort; stopping run");
                    self.cancel.cancel();
                    return trace.finish(RunStatus::Aborted, loops_completed);
                }
                pc = next;
            }

            loops_completed = iteration;
            debug!(target: "autoseq::runtime", iteration, "Iteration finished");
        }

        info!(
            target: "autoseq::runtime",
            sequence = %ctx.source.name,
            loops_completed,
            "Sequence completed"
        );
        trace.finish(RunStatus::Completed, loops_completed)
    }

    fn execute_step(
        &mut self,
        ctx: &ExecutionContext,
        step: &Step,
    ) -> Result<StepOutcome, StepError> {
        trace!(
            target: "autoseq::runtime",
            action = step.action.name(),
            object = step.object.as_deref().unwrap_or(""),
            "Executing step"
        );
        let steps = ctx.program.len();

        match &step.action {
            // Object-scoped
            Action::Click(p) => {
                let (name, def) = bound_object(ctx, step)?;
                self.click(name, def, p)
            }
            Action::WaitForImage(p) => {
                let (name, def) = bound_object(ctx, step)?;
                self.wait_for_image(name, expect_image(name, def)?, p)
            }
            Action::WaitForPixelColor(p) => {
                let (name, def) = bound_object(ctx, step)?;
                self.wait_for_pixel(name, expect_pixel(name, def)?, p)
            }

            // Global
            Action::Wait(p) => self.wait(p),
            Action::KeyboardInput(p) => self.type_text(p),
            Action::PressKey(p) => {
                let key = p
                    .key_to_press
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| StepError::invalid("key_to_press is not set"))?;
                self.probe.press_key(key)?;
                Ok(StepOutcome::Done)
            }
            Action::HotkeyCombo(p) => {
                let name = p
                    .selected_hotkey_name
                    .as_deref()
                    .ok_or_else(|| StepError::invalid("selected_hotkey_name is not set"))?;
                let keys = hotkeys::resolve(name)
                    .ok_or_else(|| StepError::invalid(format!("unknown hotkey '{name}'")))?;
                self.probe.hotkey(keys)?;
                Ok(StepOutcome::Done)
            }
            Action::Scroll(p) => self.scroll(p),

            // Control
            Action::GotoStep(p) => goto(p, steps),
            Action::IfImageFound(p) => {
                let (name, def) = condition_object(ctx, &p.condition_object_name)?;
                let outcome = self.if_image(name, expect_image(name, def)?, p)?;
                branch(outcome, &p.then_step, &p.else_step, steps)
            }
            Action::IfPixelColor(p) => {
                let (name, def) = condition_object(ctx, &p.condition_object_name)?;
                let outcome = self.if_pixel(expect_pixel(name, def)?, p)?;
                branch(outcome, &p.then_step, &p.else_step, steps)
            }
        }
    }

    fn click(
        &mut self,
        name: &str,
        def: &ObjectDef,
        p: &ClickParams,
    ) -> Result<StepOutcome, StepError> {
        let at = match def {
            ObjectDef::Region(region) => region.coords.center(),
            ObjectDef::Pixel(pixel) => pixel.coords,
            ObjectDef::Image(image) => {
                let confidence = p.confidence()?.unwrap_or(image.confidence);
                let area = self
                    .probe
                    .locate_image(image.asset_path(), confidence)?
                    .ok_or_else(|| StepError::NotFoundOnScreen {
                        object: name.to_string(),
                    })?;
                area.center()
            }
        };
        let interval = secs(p.interval_secs()?);
        debug!(target: "autoseq::runtime", object = %name, %at, button = ?p.button, clicks = p.clicks, "Click");
        self.probe.click(at, p.button, p.clicks, interval)?;
        Ok(StepOutcome::Done)
    }

    fn wait_for_image(
        &mut self,
        name: &str,
        image: &ImageObject,
        p: &WaitForImageParams,
    ) -> Result<StepOutcome, StepError> {
        let timeout = p
            .timeout_secs()?
            .map(secs)
            .unwrap_or_else(|| self.settings.default_timeout());
        let confidence = p.confidence()?.unwrap_or(image.confidence);
        let probe = &mut *self.probe;
        let outcome = poll_until(timeout, self.settings.poll_interval(), self.cancel, || {
            Ok(probe.locate_image(image.asset_path(), confidence)?)
        })?;
        Ok(match outcome {
            PollOutcome::Ready { value, waited } => {
                info!(target: "autoseq::runtime", object = %name, area = %value, waited_ms = millis(waited), "Image found");
                StepOutcome::Done
            }
            PollOutcome::TimedOut { waited } => {
                warn!(target: "autoseq::runtime", object = %name, timeout_s = timeout.as_secs_f64(), "Timed out waiting for image");
                StepOutcome::TimedOut {
                    waited_ms: millis(waited),
                }
            }
        })
    }

    fn wait_for_pixel(
        &mut self,
        name: &str,
        pixel: &PixelObject,
        p: &WaitForPixelParams,
    ) -> Result<StepOutcome, StepError> {
        let timeout = p
            .timeout_secs()?
            .map(secs)
            .unwrap_or_else(|| self.settings.default_timeout());
        let expected = p.expected_rgb.unwrap_or(pixel.rgb);
        let probe = &mut *self.probe;
        let outcome = poll_until(timeout, self.settings.poll_interval(), self.cancel, || {
            let actual = probe.pixel_color(pixel.coords)?;
            Ok((actual == expected).then_some(actual))
        })?;
        Ok(match outcome {
            PollOutcome::Ready { waited, .. } => {
                info!(target: "autoseq::runtime", object = %name, rgb = %expected, waited_ms = millis(waited), "Pixel color matched");
                StepOutcome::Done
            }
            PollOutcome::TimedOut { waited } => {
                warn!(target: "autoseq::runtime", object = %name, rgb = %expected, "Timed out waiting for pixel color");
                StepOutcome::TimedOut {
                    waited_ms: millis(waited),
                }
            }
        })
    }

    fn wait(&mut self, p: &WaitParams) -> Result<StepOutcome, StepError> {
        let seconds = match p.spec()? {
            WaitSpec::Fixed(s) => s,
            WaitSpec::Uniform { min_s, max_s } if min_s < max_s => random_range(min_s..=max_s),
            WaitSpec::Uniform { min_s, .. } => min_s,
        };
        trace!(target: "autoseq::runtime", seconds, "Wait");
        sleep_cancellable(secs(seconds), self.cancel)?;
        Ok(StepOutcome::Done)
    }

    fn type_text(&mut self, p: &KeyboardInputParams) -> Result<StepOutcome, StepError> {
        if p.text_to_type.is_empty() {
            return Err(StepError::invalid("text_to_type is empty"));
        }
        self.probe.type_text(&p.text_to_type, secs(p.interval_secs()?))?;
        Ok(StepOutcome::Done)
    }

    fn scroll(&mut self, p: &ScrollParams) -> Result<StepOutcome, StepError> {
        self.probe.scroll(p.direction, p.amount()?, p.position())?;
        Ok(StepOutcome::Done)
    }

    fn if_image(
        &mut self,
        name: &str,
        image: &ImageObject,
        p: &IfImageParams,
    ) -> Result<ConditionOutcome, StepError> {
        let confidence = p.confidence()?.unwrap_or(image.confidence);
        let budget = self.budget(p.timeout_secs()?);
        let outcome =
            conditions::image_found(&mut *self.probe, image.asset_path(), confidence, budget)?;
        debug!(target: "autoseq::runtime", object = %name, holds = outcome.holds, "If Image Found");
        Ok(outcome)
    }

    fn if_pixel(
        &mut self,
        pixel: &PixelObject,
        p: &IfPixelParams,
    ) -> Result<ConditionOutcome, StepError> {
        let expected = p.expected_rgb.unwrap_or(pixel.rgb);
        let budget = self.budget(p.timeout_secs()?);
        let outcome = conditions::pixel_matches(&mut *self.probe, pixel.coords, expected, budget)?;
        debug!(target: "autoseq::runtime", at = %pixel.coords, rgb = %expected, holds = outcome.holds, "If Pixel Color");
        Ok(outcome)
    }

    fn budget(&self, timeout_s: Option<f64>) -> PollBudget<'a> {
        PollBudget {
            timeout: timeout_s.map(secs),
            interval: self.settings.poll_interval(),
            cancel: self.cancel,
        }
    }
}

fn bound_object<'c>(
    ctx: &'c ExecutionContext,
    step: &'c Step,
) -> Result<(&'c str, &'c ObjectDef), StepError> {
    match ctx.registry.resolve(step.object.as_deref()) {
        Resolved::Bound(name, def) => Ok((name, def)),
        Resolved::Unbound => Err(StepError::UnresolvedObject { object: None }),
        Resolved::Unknown(name) => Err(StepError::UnresolvedObject {
            object: Some(name.to_string()),
        }),
    }
}

fn condition_object<'c>(
    ctx: &'c ExecutionContext,
    name: &'c str,
) -> Result<(&'c str, &'c ObjectDef), StepError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StepError::UnresolvedObject { object: None });
    }
    ctx.registry
        .get(name)
        .map(|def| (name, def))
        .ok_or_else(|| StepError::UnresolvedObject {
            object: Some(name.to_string()),
        })
}

fn expect_image<'c>(name: &str, def: &'c ObjectDef) -> Result<&'c ImageObject, StepError> {
    def.as_image().ok_or_else(|| StepError::TypeMismatch {
        object: name.to_string(),
        expected: ObjectKind::Image,
        found: def.kind(),
    })
}

fn expect_pixel<'c>(name: &str, def: &'c ObjectDef) -> Result<&'c PixelObject, StepError> {
    def.as_pixel().ok_or_else(|| StepError::TypeMismatch {
        object: name.to_string(),
        expected: ObjectKind::Pixel,
        found: def.kind(),
    })
}

/// Validate a 1-indexed target against the program length.
fn checked_target(target: &StepTarget, steps: usize) -> Result<usize, StepError> {
    target
        .to_pc(steps)
        .map(|pc| pc + 1)
        .ok_or_else(|| StepError::InvalidJumpTarget {
            target: target.to_string(),
            steps,
        })
}

fn goto(p: &GotoParams, steps: usize) -> Result<StepOutcome, StepError> {
    let target = p
        .target_step
        .as_ref()
        .ok_or_else(|| StepError::InvalidJumpTarget {
            target: "<unset>".to_string(),
            steps,
        })?;
    let to_step = checked_target(target, steps)?;
    Ok(StepOutcome::Jumped { to_step })
}

fn branch(
    outcome: ConditionOutcome,
    then_step: &Option<StepTarget>,
    else_step: &Option<StepTarget>,
    steps: usize,
) -> Result<StepOutcome, StepError> {
    let chosen = if outcome.holds { then_step } else { else_step };
    let to_step = chosen
        .as_ref()
        .map(|t| checked_target(t, steps))
        .transpose()?;
    Ok(StepOutcome::Branched {
        holds: outcome.holds,
        to_step,
        waited_ms: outcome.waited.map(millis),
    })
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
