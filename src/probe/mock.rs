//! Scripted in-memory probe for runner tests.

use image::RgbImage;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ProbeError, ProbeResult, ScreenProbe};
use crate::config::{MouseButton, Point, Rect, Rgb, ScrollDirection};

/// Every call the runner made, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProbeCall {
    Locate(PathBuf),
    Pixel(Point),
    Click {
        at: Point,
        button: MouseButton,
        clicks: u8,
    },
    Type(String),
    Press(String),
    Hotkey(Vec<String>),
    Scroll {
        direction: ScrollDirection,
        amount: i32,
        at: Option<Point>,
    },
    Cursor,
    Screenshot(Option<Rect>),
}

#[derive(Debug, Default)]
pub(crate) struct MockProbe {
    pixels: HashMap<Point, Rgb>,
    default_pixel: Rgb,
    /// Template path -> (match area, number of misses before it shows up).
    images: HashMap<PathBuf, (Rect, u32)>,
    locate_attempts: HashMap<PathBuf, u32>,
    missing: HashSet<PathBuf>,
    fail_on: HashSet<&'static str>,
    abort_on: HashSet<&'static str>,
    panic_on: HashSet<&'static str>,
    pub calls: Vec<ProbeCall>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pixel(mut self, at: Point, rgb: Rgb) -> Self {
        self.pixels.insert(at, rgb);
        self
    }

    pub fn with_image(self, path: impl Into<PathBuf>, area: Rect) -> Self {
        self.with_image_after(path, area, 0)
    }

    /// The template is reported missing for the first `misses` lookups.
    pub fn with_image_after(mut self, path: impl Into<PathBuf>, area: Rect, misses: u32) -> Self {
        self.images.insert(path.into(), (area, misses));
        self
    }

    pub fn with_missing_asset(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing.insert(path.into());
        self
    }

    /// Make `operation` (a trait method name) return a backend error.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.fail_on.insert(operation);
        self
    }

    /// Make `operation` trip the safety abort.
    pub fn aborting(mut self, operation: &'static str) -> Self {
        self.abort_on.insert(operation);
        self
    }

    pub fn panicking(mut self, operation: &'static str) -> Self {
        self.panic_on.insert(operation);
        self
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ProbeCall::Click { at, .. } => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn enter(&self, operation: &'static str) -> ProbeResult<()> {
        if self.panic_on.contains(operation) {
            panic!("mock probe panicked in {operation}");
        }
        if self.abort_on.contains(operation) {
            return Err(ProbeError::SafetyAbort);
        }
        if self.fail_on.contains(operation) {
            return Err(ProbeError::backend(operation, "scripted failure"));
        }
        Ok(())
    }
}

impl ScreenProbe for MockProbe {
    fn locate_image(&mut self, template: &Path, _confidence: f64) -> ProbeResult<Option<Rect>> {
        self.calls.push(ProbeCall::Locate(template.to_path_buf()));
        self.enter("locate_image")?;
        if self.missing.contains(template) {
            return Err(ProbeError::AssetMissing(template.to_path_buf()));
        }
        let Some(&(area, misses)) = self.images.get(template) else {
            return Ok(None);
        };
        let attempts = self
            .locate_attempts
            .entry(template.to_path_buf())
            .or_insert(0);
        *attempts += 1;
        Ok((*attempts > misses).then_some(area))
    }

    fn pixel_color(&mut self, at: Point) -> ProbeResult<Rgb> {
        self.calls.push(ProbeCall::Pixel(at));
        self.enter("pixel_color")?;
        Ok(self.pixels.get(&at).copied().unwrap_or(self.default_pixel))
    }

    fn click(
        &mut self,
        at: Point,
        button: MouseButton,
        clicks: u8,
        _interval: Duration,
    ) -> ProbeResult<()> {
        self.calls.push(ProbeCall::Click { at, button, clicks });
        self.enter("click")
    }

    fn type_text(&mut self, text: &str, _interval: Duration) -> ProbeResult<()> {
        self.calls.push(ProbeCall::Type(text.to_string()));
        self.enter("type_text")
    }

    fn press_key(&mut self, key: &str) -> ProbeResult<()> {
        self.calls.push(ProbeCall::Press(key.to_string()));
        self.enter("press_key")
    }

    fn hotkey(&mut self, keys: &[&str]) -> ProbeResult<()> {
        self.calls
            .push(ProbeCall::Hotkey(keys.iter().map(|k| k.to_string()).collect()));
        self.enter("hotkey")
    }

    fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: i32,
        at: Option<Point>,
    ) -> ProbeResult<()> {
        self.calls.push(ProbeCall::Scroll {
            direction,
            amount,
            at,
        });
        self.enter("scroll")
    }

    fn cursor_position(&mut self) -> ProbeResult<Point> {
        self.calls.push(ProbeCall::Cursor);
        self.enter("cursor_position")?;
        Ok(Point(0, 0))
    }

    fn screenshot(&mut self, region: Option<Rect>) -> ProbeResult<RgbImage> {
        self.calls.push(ProbeCall::Screenshot(region));
        self.enter("screenshot")?;
        let (w, h) = region.map_or((8, 8), |r| (r.width().max(0) as u32, r.height().max(0) as u32));
        Ok(RgbImage::new(w, h))
    }
}
