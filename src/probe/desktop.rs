use enigo::Keyboard as _;
use enigo::Mouse as _;
use enigo::{Axis, Button as EButton, Coordinate, Direction, Enigo, Key, Settings};
use image::{RgbImage, RgbaImage, imageops};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use xcap::Monitor;

use super::{ProbeError, ProbeResult, ScreenProbe, keys, matcher};
use crate::config::{MouseButton, Point, Rect, Rgb, ScrollDirection};

/// Live desktop backend: Enigo simulates input, xcap captures the primary screen.
///
/// In dry-run mode input is only logged; screen reads still hit the real screen
/// since they have no side effects.
///
/// With the failsafe enabled, every input call first checks the cursor: if it
/// sits in any corner of the main display the call fails with
/// [`ProbeError::SafetyAbort`].
pub struct DesktopProbe {
    dry_run: bool,
    failsafe: bool,
    enigo: Option<Enigo>,
    templates: HashMap<PathBuf, RgbImage>,
}

impl DesktopProbe {
    pub fn new(dry_run: bool, failsafe: bool) -> Self {
        Self {
            dry_run,
            failsafe,
            enigo: None,
            templates: HashMap::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn ensure_enigo(&mut self) -> ProbeResult<&mut Enigo> {
        let enigo = match self.enigo.take() {
            Some(enigo) => enigo,
            None => {
                trace!(target: "autoseq::probe", "Initializing Enigo");
                Enigo::new(&Settings::default()).map_err(|e| ProbeError::backend("init", e))?
            }
        };
        Ok(self.enigo.insert(enigo))
    }

    /// Trip the safety abort when the cursor is parked in a screen corner.
    fn failsafe_check(&mut self) -> ProbeResult<()> {
        if self.dry_run || !self.failsafe {
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        let (x, y) = enigo
            .location()
            .map_err(|e| ProbeError::backend("cursor_position", e))?;
        let (w, h) = enigo
            .main_display()
            .map_err(|e| ProbeError::backend("main_display", e))?;
        if is_corner(x, y, w, h) {
            warn!(target: "autoseq::probe", x, y, "Failsafe: cursor in screen corner");
            return Err(ProbeError::SafetyAbort);
        }
        Ok(())
    }

    fn template(&mut self, path: &Path) -> ProbeResult<&RgbImage> {
        if !self.templates.contains_key(path) {
            if !path.exists() {
                return Err(ProbeError::AssetMissing(path.to_path_buf()));
            }
            let decoded = image::open(path)
                .map_err(|e| ProbeError::ImageDecode {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
                .into_rgb8();
            debug!(
                target: "autoseq::probe",
                path = %path.display(), width = decoded.width(), height = decoded.height(),
                "Loaded template"
            );
            self.templates.insert(path.to_path_buf(), decoded);
        }
        self.templates
            .get(path)
            .ok_or_else(|| ProbeError::AssetMissing(path.to_path_buf()))
    }
}

impl ScreenProbe for DesktopProbe {
    fn locate_image(&mut self, template: &Path, confidence: f64) -> ProbeResult<Option<Rect>> {
        // Load first so a missing asset is reported even when capture would fail.
        self.template(template)?;
        let (screen, origin) = capture_primary()?;
        let needle = self.template(template)?;
        let found = matcher::locate(&screen, needle, confidence);
        trace!(
            target: "autoseq::probe",
            path = %template.display(), confidence, found = found.is_some(),
            "locate_image"
        );
        Ok(found.map(|m| {
            Rect::new(
                origin.0 + m.x as i32,
                origin.1 + m.y as i32,
                m.width as i32,
                m.height as i32,
            )
        }))
    }

    fn pixel_color(&mut self, at: Point) -> ProbeResult<Rgb> {
        let (screen, origin) = capture_primary()?;
        let (lx, ly) = (at.0 - origin.0, at.1 - origin.1);
        if lx < 0 || ly < 0 || lx as u32 >= screen.width() || ly as u32 >= screen.height() {
            return Err(ProbeError::backend(
                "pixel_color",
                format!("{at} is outside the primary screen"),
            ));
        }
        let [r, g, b] = screen.get_pixel(lx as u32, ly as u32).0;
        Ok(Rgb(r, g, b))
    }

    fn click(
        &mut self,
        at: Point,
        button: MouseButton,
        clicks: u8,
        interval: Duration,
    ) -> ProbeResult<()> {
        let clicks = clicks.max(1);
        if self.dry_run {
            info!(target: "autoseq::probe", x = at.0, y = at.1, ?button, clicks, "DRY-RUN click");
            return Ok(());
        }
        self.failsafe_check()?;
        let enigo = self.ensure_enigo()?;
        trace!(target: "autoseq::probe", x = at.0, y = at.1, ?button, clicks, "click");
        enigo
            .move_mouse(at.0, at.1, Coordinate::Abs)
            .map_err(|e| ProbeError::backend("move_mouse", e))?;
        let btn = map_mouse_button(button);
        for i in 0..clicks {
            enigo
                .button(btn, Direction::Click)
                .map_err(|e| ProbeError::backend("click", e))?;
            if i + 1 < clicks && !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Ok(())
    }

    fn type_text(&mut self, text: &str, interval: Duration) -> ProbeResult<()> {
        if self.dry_run {
            info!(target: "autoseq::probe", %text, "DRY-RUN type_text");
            return Ok(());
        }
        self.failsafe_check()?;
        let enigo = self.ensure_enigo()?;
        trace!(target: "autoseq::probe", %text, "type_text");
        if interval.is_zero() {
            return enigo
                .text(text)
                .map_err(|e| ProbeError::backend("type_text", e));
        }
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            enigo
                .text(ch.encode_utf8(&mut buf))
                .map_err(|e| ProbeError::backend("type_text", e))?;
            thread::sleep(interval);
        }
        Ok(())
    }

    fn press_key(&mut self, key: &str) -> ProbeResult<()> {
        let parsed = keys::parse_key(key).ok_or_else(|| ProbeError::UnknownKey(key.to_string()))?;
        if self.dry_run {
            info!(target: "autoseq::probe", %key, "DRY-RUN press_key");
            return Ok(());
        }
        self.failsafe_check()?;
        let enigo = self.ensure_enigo()?;
        trace!(target: "autoseq::probe", %key, "press_key");
        enigo
            .key(parsed, Direction::Click)
            .map_err(|e| ProbeError::backend("press_key", e))
    }

    fn hotkey(&mut self, combo: &[&str]) -> ProbeResult<()> {
        let parsed = combo
            .iter()
            .map(|k| keys::parse_key(k).ok_or_else(|| ProbeError::UnknownKey((*k).to_string())))
            .collect::<ProbeResult<Vec<Key>>>()?;
        if self.dry_run {
            info!(target: "autoseq::probe", ?combo, "DRY-RUN hotkey");
            return Ok(());
        }
        self.failsafe_check()?;
        let enigo = self.ensure_enigo()?;
        trace!(target: "autoseq::probe", ?combo, "hotkey");

        let mut pressed = Vec::with_capacity(parsed.len());
        let mut outcome = Ok(());
        for key in parsed {
            if let Err(e) = enigo.key(key, Direction::Press) {
                outcome = Err(ProbeError::backend("hotkey", e));
                break;
            }
            pressed.push(key);
        }
        // Always release what was pressed, even after a failure.
        for key in pressed.into_iter().rev() {
            if let Err(e) = enigo.key(key, Direction::Release) {
                warn!(target: "autoseq::probe", error = %e, ?key, "Failed to release key");
            }
        }
        outcome
    }

    fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: i32,
        at: Option<Point>,
    ) -> ProbeResult<()> {
        if self.dry_run {
            info!(target: "autoseq::probe", ?direction, amount, ?at, "DRY-RUN scroll");
            return Ok(());
        }
        self.failsafe_check()?;
        let enigo = self.ensure_enigo()?;
        trace!(target: "autoseq::probe", ?direction, amount, ?at, "scroll");
        if let Some(p) = at {
            enigo
                .move_mouse(p.0, p.1, Coordinate::Abs)
                .map_err(|e| ProbeError::backend("move_mouse", e))?;
        }
        // Enigo scrolls down/right for positive lengths.
        let (length, axis) = match direction {
            ScrollDirection::Up => (-amount, Axis::Vertical),
            ScrollDirection::Down => (amount, Axis::Vertical),
            ScrollDirection::Left => (-amount, Axis::Horizontal),
            ScrollDirection::Right => (amount, Axis::Horizontal),
        };
        enigo
            .scroll(length, axis)
            .map_err(|e| ProbeError::backend("scroll", e))
    }

    fn cursor_position(&mut self) -> ProbeResult<Point> {
        if self.dry_run {
            debug!(target: "autoseq::probe", "DRY-RUN cursor_position");
            return Ok(Point(0, 0));
        }
        let enigo = self.ensure_enigo()?;
        let (x, y) = enigo
            .location()
            .map_err(|e| ProbeError::backend("cursor_position", e))?;
        Ok(Point(x, y))
    }

    fn screenshot(&mut self, region: Option<Rect>) -> ProbeResult<RgbImage> {
        let (screen, origin) = capture_primary()?;
        let Some(r) = region else {
            return Ok(screen);
        };
        let x = (r.x() - origin.0).max(0) as u32;
        let y = (r.y() - origin.1).max(0) as u32;
        let w = (r.width().max(0) as u32).min(screen.width().saturating_sub(x));
        let h = (r.height().max(0) as u32).min(screen.height().saturating_sub(y));
        Ok(imageops::crop_imm(&screen, x, y, w, h).to_image())
    }
}

/// Capture the primary monitor as RGB, with the monitor's top-left in
/// virtual-desktop coordinates.
fn capture_primary() -> ProbeResult<(RgbImage, Point)> {
    let monitors = Monitor::all().map_err(|e| ProbeError::backend("screenshot", e))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| monitors.first())
        .ok_or_else(|| ProbeError::backend("screenshot", "no monitor found"))?;
    let origin = Point(
        monitor.x().map_err(|e| ProbeError::backend("screenshot", e))?,
        monitor.y().map_err(|e| ProbeError::backend("screenshot", e))?,
    );
    let shot = monitor
        .capture_image()
        .map_err(|e| ProbeError::backend("screenshot", e))?;
    let (w, h) = (shot.width(), shot.height());
    let rgba = RgbaImage::from_raw(w, h, shot.into_raw())
        .ok_or_else(|| ProbeError::backend("screenshot", "capture buffer has unexpected size"))?;
    Ok((image::DynamicImage::ImageRgba8(rgba).into_rgb8(), origin))
}

fn is_corner(x: i32, y: i32, width: i32, height: i32) -> bool {
    let on_x_edge = x <= 0 || x >= width - 1;
    let on_y_edge = y <= 0 || y >= height - 1;
    on_x_edge && on_y_edge
}

fn map_mouse_button(btn: MouseButton) -> EButton {
    match btn {
        MouseButton::Left => EButton::Left,
        MouseButton::Middle => EButton::Middle,
        MouseButton::Right => EButton::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_trip_failsafe() {
        assert!(is_corner(0, 0, 1920, 1080));
        assert!(is_corner(1919, 0, 1920, 1080));
        assert!(is_corner(0, 1079, 1920, 1080));
        assert!(is_corner(1919, 1079, 1920, 1080));
        assert!(!is_corner(0, 500, 1920, 1080));
        assert!(!is_corner(960, 540, 1920, 1080));
    }

    #[test]
    fn dry_run_input_never_touches_enigo() {
        let mut probe = DesktopProbe::new(true, true);
        probe
            .click(Point(10, 10), MouseButton::Left, 2, Duration::ZERO)
            .unwrap();
        probe.type_text("hello", Duration::ZERO).unwrap();
        probe.press_key("enter").unwrap();
        probe.hotkey(&["ctrl", "c"]).unwrap();
        probe.scroll(ScrollDirection::Up, 3, None).unwrap();
        assert_eq!(probe.cursor_position().unwrap(), Point(0, 0));
        assert!(probe.enigo.is_none());
    }

    #[test]
    fn unknown_keys_fail_even_in_dry_run() {
        let mut probe = DesktopProbe::new(true, false);
        assert!(matches!(
            probe.press_key("not-a-key"),
            Err(ProbeError::UnknownKey(_))
        ));
        assert!(matches!(
            probe.hotkey(&["ctrl", "bogus"]),
            Err(ProbeError::UnknownKey(k)) if k == "bogus"
        ));
    }

    #[test]
    fn missing_template_reports_asset() {
        let mut probe = DesktopProbe::new(true, false);
        let err = probe
            .locate_image(Path::new("/definitely/not/here.png"), 0.8)
            .unwrap_err();
        assert!(matches!(err, ProbeError::AssetMissing(_)));
    }
}
