use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_valid::{MaximumError, MinimumError, Validate, ValidateMaximum, ValidateMinimum};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::registry::ObjectRegistry;

/// Match confidence used when neither the step nor the image object sets one.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Name given to documents that do not carry a `sequence_name`.
pub const DEFAULT_SEQUENCE_NAME: &str = "UntitledSequence";

/// Root document for a saved sequence.
///
/// This is the on-disk shape produced by the project editor:
/// - `sequence_name`: display name of the sequence
/// - `loop_count`: how many times the whole program repeats (`0` = forever)
/// - `objects`: named screen objects the steps refer to
/// - `steps`: the ordered program
///
/// Image paths inside `objects` are stored relative to the document's directory
/// (the project root); the loader resolves them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SequenceDocument {
    #[serde(default = "default_sequence_name")]
    pub sequence_name: String,

    /// Number of outer repetitions. `0` repeats until aborted.
    #[serde(default = "default_loop_count")]
    pub loop_count: u32,

    #[serde(default)]
    pub objects: ObjectRegistry,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Default for SequenceDocument {
    fn default() -> Self {
        Self {
            sequence_name: default_sequence_name(),
            loop_count: default_loop_count(),
            objects: ObjectRegistry::default(),
            steps: Vec::new(),
        }
    }
}

fn default_sequence_name() -> String {
    DEFAULT_SEQUENCE_NAME.to_string()
}

fn default_loop_count() -> u32 {
    1
}

/// A rectangle on screen, serialized as `[x, y, width, height]`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct Rect(pub i32, pub i32, pub i32, pub i32);

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self(x, y, width, height)
    }

    pub const fn x(&self) -> i32 {
        self.0
    }

    pub const fn y(&self) -> i32 {
        self.1
    }

    pub const fn width(&self) -> i32 {
        self.2
    }

    pub const fn height(&self) -> i32 {
        self.3
    }

    /// Center point, rounded toward the top-left. Saturates at the `i32` range.
    pub const fn center(&self) -> Point {
        Point(
            self.0.saturating_add(self.2 / 2),
            self.1.saturating_add(self.3 / 2),
        )
    }

    /// A 1x1 rectangle encodes a single point.
    pub const fn is_point(&self) -> bool {
        self.2 == 1 && self.3 == 1
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.0, self.1, self.2, self.3)
    }
}

/// A screen coordinate, serialized as `[x, y]`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct Point(pub i32, pub i32);

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// An RGB color, serialized as `[r, g, b]`.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}

/// How an object was captured in the editor. Informational only.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Grid,
    Drag,
    Point,
}

/// Object kind discriminant, used for type checks and registry filtering.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Region,
    Image,
    Pixel,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Region => "region",
            ObjectKind::Image => "image",
            ObjectKind::Pixel => "pixel",
        })
    }
}

/// A named screen object. Selected with `type`:
/// - "region": a rectangular area (clicked at its center)
/// - "image": a template image plus the area it was captured from
/// - "pixel": a point and its expected color
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDef {
    Region(RegionObject),
    Image(ImageObject),
    Pixel(PixelObject),
}

impl ObjectDef {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectDef::Region(_) => ObjectKind::Region,
            ObjectDef::Image(_) => ObjectKind::Image,
            ObjectDef::Pixel(_) => ObjectKind::Pixel,
        }
    }

    pub fn as_image(&self) -> Option<&ImageObject> {
        match self {
            ObjectDef::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_pixel(&self) -> Option<&PixelObject> {
        match self {
            ObjectDef::Pixel(pixel) => Some(pixel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RegionObject {
    pub coords: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CaptureMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate)]
pub struct ImageObject {
    /// Template file. Relative paths are resolved against the project root on load.
    #[serde(rename = "image_path")]
    pub asset: PathBuf,

    /// Area the template was cropped from.
    #[serde(
        default,
        rename = "capture_coords",
        alias = "coords",
        skip_serializing_if = "Option::is_none"
    )]
    pub coords: Option<Rect>,

    /// Default match confidence for steps that do not override it.
    #[serde(default = "default_confidence")]
    #[validate(minimum = 0.0)]
    #[validate(maximum = 1.0)]
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CaptureMode>,
}

impl ImageObject {
    pub fn asset_path(&self) -> &Path {
        &self.asset
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PixelObject {
    pub coords: Point,
    pub rgb: Rgb,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// One instruction of a program.
///
/// Serialized as `{ "object_name": ..., "action": "...", "params": {...}, "note": "..." }`.
/// A missing, `null` or empty `object_name` marks a global or control step.
/// A missing or `null` `params` reads as `{}`.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq)]
pub struct Step {
    #[serde(
        default,
        rename = "object_name",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub object: Option<String>,

    #[serde(flatten)]
    pub action: Action,

    #[serde(default)]
    pub note: String,
}

impl Step {
    /// A step that is not bound to any object.
    pub fn global(action: Action) -> Self {
        Self {
            object: None,
            action,
            note: String::new(),
        }
    }

    /// A step bound to the named object.
    pub fn on(object: impl Into<String>, action: Action) -> Self {
        Self {
            object: Some(object.into()),
            action,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

fn de_object_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|name| !name.trim().is_empty()))
}

/// Document shape of a step before its action is typed.
#[derive(Deserialize)]
struct RawStep {
    #[serde(default, deserialize_with = "de_object_name")]
    object_name: Option<String>,
    action: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    note: Option<String>,
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawStep::deserialize(deserializer)?;
        let params = match raw.params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let tagged = serde_json::json!({ "action": raw.action, "params": params });
        let action = Action::deserialize(tagged).map_err(D::Error::custom)?;
        Ok(Step {
            object: raw.object_name,
            action,
            note: raw.note.unwrap_or_default(),
        })
    }
}

/// Which part of the dispatch table an action belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActionScope {
    /// Needs a bound object (Click, Wait for Image, Wait for Pixel Color).
    Object,
    /// Runs without an object (Wait, keyboard, scroll).
    Global,
    /// May move the program counter (Goto Step, If Image Found, If Pixel Color).
    Control,
}

/// Step action together with its typed parameters (`params` in the document).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "action", content = "params")]
pub enum Action {
    #[serde(rename = "Click")]
    Click(ClickParams),

    #[serde(rename = "Wait for Image")]
    WaitForImage(WaitForImageParams),

    #[serde(rename = "Wait for Pixel Color")]
    WaitForPixelColor(WaitForPixelParams),

    #[serde(rename = "Wait")]
    Wait(WaitParams),

    #[serde(rename = "Keyboard Input")]
    KeyboardInput(KeyboardInputParams),

    #[serde(rename = "Press Key")]
    PressKey(PressKeyParams),

    #[serde(rename = "Hotkey Combo")]
    HotkeyCombo(HotkeyParams),

    #[serde(rename = "Scroll")]
    Scroll(ScrollParams),

    #[serde(rename = "Goto Step")]
    GotoStep(GotoParams),

    #[serde(rename = "If Image Found")]
    IfImageFound(IfImageParams),

    #[serde(rename = "If Pixel Color")]
    IfPixelColor(IfPixelParams),
}

impl Action {
    /// Display name, identical to the `action` key in documents.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click(_) => "Click",
            Action::WaitForImage(_) => "Wait for Image",
            Action::WaitForPixelColor(_) => "Wait for Pixel Color",
            Action::Wait(_) => "Wait",
            Action::KeyboardInput(_) => "Keyboard Input",
            Action::PressKey(_) => "Press Key",
            Action::HotkeyCombo(_) => "Hotkey Combo",
            Action::Scroll(_) => "Scroll",
            Action::GotoStep(_) => "Goto Step",
            Action::IfImageFound(_) => "If Image Found",
            Action::IfPixelColor(_) => "If Pixel Color",
        }
    }

    pub fn scope(&self) -> ActionScope {
        match self {
            Action::Click(_) | Action::WaitForImage(_) | Action::WaitForPixelColor(_) => {
                ActionScope::Object
            }
            Action::Wait(_)
            | Action::KeyboardInput(_)
            | Action::PressKey(_)
            | Action::HotkeyCombo(_)
            | Action::Scroll(_) => ActionScope::Global,
            Action::GotoStep(_) | Action::IfImageFound(_) | Action::IfPixelColor(_) => {
                ActionScope::Control
            }
        }
    }

    /// Shorthand for a fixed wait, handy when building programs in code.
    pub fn wait_secs(duration_s: f64) -> Self {
        Action::Wait(WaitParams {
            duration_s: Some(duration_s.into()),
            ..WaitParams::default()
        })
    }

    /// Shorthand for an unconditional jump to a 1-indexed step.
    pub fn goto(target_step: i64) -> Self {
        Action::GotoStep(GotoParams {
            target_step: Some(StepTarget::Step(target_step)),
        })
    }
}

/// A numeric parameter as saved by the editor.
///
/// The editor keeps text it could not parse (`"1.5s"`, `"abc"`) instead of a
/// number. Such values load fine and fail only their own step, with
/// [`InvalidNumber`]. Numeric text such as `"2"` reads as the number.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum Number {
    Value(f64),
    Raw(Value),
}

impl Number {
    /// The value when it is a finite number or numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Number::Value(v) => *v,
            Number::Raw(Value::String(text)) => text.trim().parse().ok()?,
            Number::Raw(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// The value when it is a whole number that fits an `i32`.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
            .map(|v| v as i32)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Value(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Value(v) => write!(f, "{v}"),
            Number::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

// Range checks apply to readable values; unreadable ones are reported per step.
impl ValidateMinimum<f64> for Number {
    fn validate_minimum(&self, minimum: f64) -> Result<(), MinimumError> {
        self.as_f64().map_or(Ok(()), |v| v.validate_minimum(minimum))
    }
}

impl ValidateMaximum<f64> for Number {
    fn validate_maximum(&self, maximum: f64) -> Result<(), MaximumError> {
        self.as_f64().map_or(Ok(()), |v| v.validate_maximum(maximum))
    }
}

/// A step parameter that does not hold a usable number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is not a valid number: {raw}")]
pub struct InvalidNumber {
    pub field: &'static str,
    pub raw: String,
}

fn read_f64(field: &'static str, value: Option<&Number>) -> Result<Option<f64>, InvalidNumber> {
    value
        .map(|n| {
            n.as_f64().ok_or_else(|| InvalidNumber {
                field,
                raw: n.to_string(),
            })
        })
        .transpose()
}

/// Mouse button enumeration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate)]
#[serde(default)]
pub struct ClickParams {
    pub button: MouseButton,

    #[validate(minimum = 1)]
    #[validate(maximum = 3)]
    pub clicks: u8,

    /// Seconds between repeated clicks. Defaults to 0.1 for multi-clicks, 0 otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub interval: Option<Number>,

    /// Overrides the image object's confidence when clicking an image.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    #[validate(maximum = 1.0)]
    pub confidence: Option<Number>,
}

impl Default for ClickParams {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            clicks: 1,
            interval: None,
            confidence: None,
        }
    }
}

impl ClickParams {
    pub fn interval_secs(&self) -> Result<f64, InvalidNumber> {
        let interval = read_f64("interval", self.interval.as_ref())?;
        Ok(interval
            .unwrap_or(if self.clicks > 1 { 0.1 } else { 0.0 })
            .max(0.0))
    }

    pub fn confidence(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("confidence", self.confidence.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct WaitForImageParams {
    /// Give up after this many seconds (default: runner setting, 10s).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub timeout_s: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    #[validate(maximum = 1.0)]
    pub confidence: Option<Number>,
}

impl WaitForImageParams {
    pub fn timeout_secs(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("timeout_s", self.timeout_s.as_ref())
    }

    pub fn confidence(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("confidence", self.confidence.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct WaitForPixelParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub timeout_s: Option<Number>,

    /// Color to wait for. Falls back to the pixel object's recorded color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_rgb: Option<Rgb>,
}

impl WaitForPixelParams {
    pub fn timeout_secs(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("timeout_s", self.timeout_s.as_ref())
    }
}

/// Either a fixed `duration_s`, or a random duration between `min_s` and `max_s`
/// when both are present.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct WaitParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub duration_s: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub min_s: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub max_s: Option<Number>,
}

/// Resolved form of [`WaitParams`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WaitSpec {
    Fixed(f64),
    Uniform { min_s: f64, max_s: f64 },
}

impl WaitParams {
    pub fn spec(&self) -> Result<WaitSpec, InvalidNumber> {
        let min_s = read_f64("min_s", self.min_s.as_ref())?;
        let max_s = read_f64("max_s", self.max_s.as_ref())?;
        Ok(match (min_s, max_s) {
            (Some(a), Some(b)) => {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                WaitSpec::Uniform {
                    min_s: lo.max(0.0),
                    max_s: hi.max(0.0),
                }
            }
            _ => {
                let duration = read_f64("duration_s", self.duration_s.as_ref())?;
                WaitSpec::Fixed(duration.unwrap_or(1.0).max(0.0))
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct KeyboardInputParams {
    pub text_to_type: String,

    /// Seconds between characters (default 0.01).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub interval: Option<Number>,
}

impl KeyboardInputParams {
    pub fn interval_secs(&self) -> Result<f64, InvalidNumber> {
        Ok(read_f64("interval", self.interval.as_ref())?
            .unwrap_or(0.01)
            .max(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct PressKeyParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_to_press: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct HotkeyParams {
    /// Name from the predefined hotkey table, e.g. "Copy (Ctrl+C)".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_hotkey_name: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn is_vertical(&self) -> bool {
        matches!(self, ScrollDirection::Up | ScrollDirection::Down)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ScrollParams {
    pub direction: ScrollDirection,
    /// Scroll units (wheel clicks).
    pub amount: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for ScrollParams {
    fn default() -> Self {
        Self {
            direction: ScrollDirection::Down,
            amount: Number::Value(10.0),
            x: None,
            y: None,
        }
    }
}

impl ScrollParams {
    /// Wheel clicks; must be a whole number.
    pub fn amount(&self) -> Result<i32, InvalidNumber> {
        self.amount.as_i32().ok_or_else(|| InvalidNumber {
            field: "amount",
            raw: self.amount.to_string(),
        })
    }

    /// Explicit scroll position; only used when both coordinates are given.
    pub fn position(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point(x, y)),
            _ => None,
        }
    }
}

/// A 1-indexed branch or jump target as written in a document.
///
/// Integers are step numbers (validated against the program length at run time);
/// anything else that is not the "Next" sentinel is kept so it can be reported.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum StepTarget {
    Step(i64),
    Fractional(f64),
    Malformed(String),
}

impl StepTarget {
    /// Convert to a 0-indexed program counter if the target lies in `[1, steps]`.
    pub fn to_pc(&self, steps: usize) -> Option<usize> {
        match self {
            StepTarget::Step(n) if *n >= 1 && (*n as u64) <= steps as u64 => Some(*n as usize - 1),
            _ => None,
        }
    }

    fn is_next_sentinel(&self) -> bool {
        matches!(self, StepTarget::Malformed(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("next"))
    }
}

impl fmt::Display for StepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepTarget::Step(n) => write!(f, "{n}"),
            StepTarget::Fractional(v) => write!(f, "{v}"),
            StepTarget::Malformed(s) => write!(f, "{s:?}"),
        }
    }
}

/// `null`, `""` and `"Next"` all mean "continue with the next step".
fn de_branch_target<'de, D>(deserializer: D) -> Result<Option<StepTarget>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StepTarget>::deserialize(deserializer)?;
    Ok(raw.filter(|t| !t.is_next_sentinel()))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct GotoParams {
    #[serde(deserialize_with = "de_branch_target")]
    #[schemars(with = "Option<StepTarget>")]
    pub target_step: Option<StepTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct IfImageParams {
    pub condition_object_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    #[validate(maximum = 1.0)]
    pub confidence: Option<Number>,

    /// Keep probing up to this many seconds before deciding (default: probe once).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub timeout_s: Option<Number>,

    #[serde(deserialize_with = "de_branch_target")]
    #[schemars(with = "Option<StepTarget>")]
    pub then_step: Option<StepTarget>,

    #[serde(deserialize_with = "de_branch_target")]
    #[schemars(with = "Option<StepTarget>")]
    pub else_step: Option<StepTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Validate, Default)]
#[serde(default)]
pub struct IfPixelParams {
    pub condition_object_name: String,

    /// Color to compare against. Falls back to the pixel object's recorded color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_rgb: Option<Rgb>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 0.0)]
    pub timeout_s: Option<Number>,

    #[serde(deserialize_with = "de_branch_target")]
    #[schemars(with = "Option<StepTarget>")]
    pub then_step: Option<StepTarget>,

    #[serde(deserialize_with = "de_branch_target")]
    #[schemars(with = "Option<StepTarget>")]
    pub else_step: Option<StepTarget>,
}

impl IfImageParams {
    pub fn timeout_secs(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("timeout_s", self.timeout_s.as_ref())
    }

    pub fn confidence(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("confidence", self.confidence.as_ref())
    }
}

impl IfPixelParams {
    pub fn timeout_secs(&self) -> Result<Option<f64>, InvalidNumber> {
        read_f64("timeout_s", self.timeout_s.as_ref())
    }
}
