//! Sequence documents and the data model the runner executes.
//!
//! This module wires together the object/step models, the object registry, the
//! predefined hotkey table, runner settings and the document loader.
//!
//! Example:
//! use autoseq::config::load_from_path;
//!
//! let doc = load_from_path("projects/login/login.json")?;

pub mod hotkeys;
pub mod loader;
pub mod models;
pub mod registry;
pub mod settings;

// Re-export core data models
pub use models::{
    Action, ActionScope, CaptureMode, ClickParams, GotoParams, HotkeyParams, IfImageParams,
    IfPixelParams, ImageObject, InvalidNumber, KeyboardInputParams, MouseButton, Number,
    ObjectDef, ObjectKind, PixelObject, Point, PressKeyParams, Rect, RegionObject, Rgb, ScrollDirection, ScrollParams,
    SequenceDocument, Step, StepTarget, WaitForImageParams, WaitForPixelParams, WaitParams,
    WaitSpec,
};
pub use registry::{ObjectRegistry, RegistryError, Resolved};
pub use settings::RunnerSettings;

// Re-export loader utilities
pub use loader::{
    generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    validate_document, write_schema_to_writer,
};
