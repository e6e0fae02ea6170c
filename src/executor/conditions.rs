use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::StepError;
use super::polling::{PollOutcome, poll_until};
use crate::config::{Point, Rgb};
use crate::probe::ScreenProbe;

/// Result of evaluating an If* condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionOutcome {
    pub holds: bool,
    /// Time spent polling, when the condition carried a timeout.
    pub waited: Option<Duration>,
}

/// Shared polling parameters for timed conditions.
#[derive(Debug, Clone, Copy)]
pub struct PollBudget<'a> {
    pub timeout: Option<Duration>,
    pub interval: Duration,
    pub cancel: &'a CancellationToken,
}

pub fn image_found<P: ScreenProbe + ?Sized>(
    probe: &mut P,
    template: &Path,
    confidence: f64,
    budget: PollBudget<'_>,
) -> Result<ConditionOutcome, StepError> {
    evaluate(budget, || {
        Ok(probe
            .locate_image(template, confidence)?
            .map(|_| ()))
    })
}

pub fn pixel_matches<P: ScreenProbe + ?Sized>(
    probe: &mut P,
    at: Point,
    expected: Rgb,
    budget: PollBudget<'_>,
) -> Result<ConditionOutcome, StepError> {
    evaluate(budget, || {
        let actual = probe.pixel_color(at)?;
        Ok((actual == expected).then_some(()))
    })
}

fn evaluate(
    budget: PollBudget<'_>,
    mut check: impl FnMut() -> Result<Option<()>, StepError>,
) -> Result<ConditionOutcome, StepError> {
    let Some(timeout) = budget.timeout else {
        if budget.cancel.is_cancelled() {
            return Err(StepError::SafetyAbort);
        }
        return Ok(ConditionOutcome {
            holds: check()?.is_some(),
            waited: None,
        });
    };
    let outcome = match poll_until(timeout, budget.interval, budget.cancel, check)? {
        PollOutcome::Ready { waited, .. } => ConditionOutcome {
            holds: true,
            waited: Some(waited),
        },
        PollOutcome::TimedOut { waited } => ConditionOutcome {
            holds: false,
            waited: Some(waited),
        },
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rect;
    use crate::probe::mock::MockProbe;

    fn once(cancel: &CancellationToken) -> PollBudget<'_> {
        PollBudget {
            timeout: None,
            interval: Duration::from_millis(1),
            cancel,
        }
    }

    #[test]
    fn pixel_condition_compares_exactly() {
        let cancel = CancellationToken::new();
        let mut probe = MockProbe::new().with_pixel(Point(5, 5), Rgb(10, 20, 30));
        let hit = pixel_matches(&mut probe, Point(5, 5), Rgb(10, 20, 30), once(&cancel)).unwrap();
        assert!(hit.holds);
        assert_eq!(hit.waited, None);
        let miss = pixel_matches(&mut probe, Point(5, 5), Rgb(10, 20, 31), once(&cancel)).unwrap();
        assert!(!miss.holds);
    }

    #[test]
    fn timed_image_condition_waits_for_match() {
        let cancel = CancellationToken::new();
        let mut probe =
            MockProbe::new().with_image_after("btn.png", Rect::new(0, 0, 4, 4), 2);
        let budget = PollBudget {
            timeout: Some(Duration::from_secs(2)),
            interval: Duration::from_millis(1),
            cancel: &cancel,
        };
        let out = image_found(&mut probe, Path::new("btn.png"), 0.8, budget).unwrap();
        assert!(out.holds);
        assert!(out.waited.is_some());
        assert_eq!(probe.calls.len(), 3);
    }

    #[test]
    fn missing_asset_is_an_error() {
        let cancel = CancellationToken::new();
        let mut probe = MockProbe::new().with_missing_asset("gone.png");
        let err = image_found(&mut probe, Path::new("gone.png"), 0.8, once(&cancel)).unwrap_err();
        assert!(matches!(err, StepError::AssetMissing { .. }));
    }
}
