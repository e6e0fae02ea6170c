/*!
Screen probe: the only way the runner touches the desktop.

The runner never talks to the OS directly. Template search, pixel reads and
all simulated input go through the [`ScreenProbe`] trait. Implementations:

- `desktop.rs` -> `DesktopProbe` (Enigo for input, xcap for screen capture)
- `matcher.rs` -> template matching on captured frames
- `keys.rs`    -> key-name vocabulary mapped onto Enigo keys

Probe errors are split in two: [`ProbeError::SafetyAbort`] ends the whole run,
everything else fails only the current step.
*/

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::{MouseButton, Point, Rect, Rgb, ScrollDirection};

pub mod desktop;
pub mod keys;
pub mod matcher;
#[cfg(test)]
pub(crate) mod mock;

pub use desktop::DesktopProbe;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The safety trip fired (cursor parked in a screen corner, or the run was cancelled).
    #[error("safety abort triggered")]
    SafetyAbort,

    #[error("image asset not found: {}", .0.display())]
    AssetMissing(PathBuf),

    #[error("failed to load image {}: {message}", .path.display())]
    ImageDecode { path: PathBuf, message: String },

    #[error("unknown key name '{0}'")]
    UnknownKey(String),

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl ProbeError {
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        ProbeError::Backend {
            operation,
            message: err.to_string(),
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Capability set the runner needs from a screen/input backend.
pub trait ScreenProbe {
    /// Find `template` on screen. Returns the matched area, or `None` when no
    /// location scores at least `confidence` (0..=1).
    fn locate_image(&mut self, template: &Path, confidence: f64) -> ProbeResult<Option<Rect>>;

    /// Live color of the pixel at `at`.
    fn pixel_color(&mut self, at: Point) -> ProbeResult<Rgb>;

    /// Move to `at` and click `clicks` times, pausing `interval` between clicks.
    fn click(
        &mut self,
        at: Point,
        button: MouseButton,
        clicks: u8,
        interval: Duration,
    ) -> ProbeResult<()>;

    /// Type literal text, pausing `interval` between characters.
    fn type_text(&mut self, text: &str, interval: Duration) -> ProbeResult<()>;

    /// Press and release one named key (e.g. "enter", "f5", "a").
    fn press_key(&mut self, key: &str) -> ProbeResult<()>;

    /// Hold `keys` in order, then release them in reverse.
    fn hotkey(&mut self, keys: &[&str]) -> ProbeResult<()>;

    /// Scroll `amount` units, at `at` if given, else at the current cursor.
    fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: i32,
        at: Option<Point>,
    ) -> ProbeResult<()>;

    fn cursor_position(&mut self) -> ProbeResult<Point>;

    /// Capture the screen, or only `region` of it.
    fn screenshot(&mut self, region: Option<Rect>) -> ProbeResult<RgbImage>;
}

impl<P: ScreenProbe + ?Sized> ScreenProbe for Box<P> {
    fn locate_image(&mut self, template: &Path, confidence: f64) -> ProbeResult<Option<Rect>> {
        (**self).locate_image(template, confidence)
    }

    fn pixel_color(&mut self, at: Point) -> ProbeResult<Rgb> {
        (**self).pixel_color(at)
    }

    fn click(
        &mut self,
        at: Point,
        button: MouseButton,
        clicks: u8,
        interval: Duration,
    ) -> ProbeResult<()> {
        (**self).click(at, button, clicks, interval)
    }

    fn type_text(&mut self, text: &str, interval: Duration) -> ProbeResult<()> {
        (**self).type_text(text, interval)
    }

    fn press_key(&mut self, key: &str) -> ProbeResult<()> {
        (**self).press_key(key)
    }

    fn hotkey(&mut self, keys: &[&str]) -> ProbeResult<()> {
        (**self).hotkey(keys)
    }

    fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: i32,
        at: Option<Point>,
    ) -> ProbeResult<()> {
        (**self).scroll(direction, amount, at)
    }

    fn cursor_position(&mut self) -> ProbeResult<Point> {
        (**self).cursor_position()
    }

    fn screenshot(&mut self, region: Option<Rect>) -> ProbeResult<RgbImage> {
        (**self).screenshot(region)
    }
}
