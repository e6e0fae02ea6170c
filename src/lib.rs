#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Autoseq: run recorded screen-object sequences against a live desktop.
//!
//! A sequence is a set of named screen objects (regions, image templates and
//! pixels) plus an ordered list of steps that click, type, wait and branch on
//! what is on screen. The codebase is organized as:
//! - `config`: Sequence document models, object registry, loader and schema helpers.
//! - `executor`: The interpreter, nested/batch sessions and the execution trace.
//! - `probe`: The screen/input backend trait and its Enigo + xcap implementation.
//!
//! Use `autoseq::prelude::*` to bring commonly used items into scope quickly.

/// Public module: sequence documents (models, registry, loader, schema helpers).
pub mod config;
/// Public module: execution engine (runner, session, trace).
pub mod executor;
/// Public module: screen probe trait and desktop backend.
pub mod probe;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a plain level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging).
/// - `level` wins when given.
/// - Otherwise honors the `RUST_LOG` environment variable as a plain level.
/// - Falls back to `info`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    let level = level
        .and_then(parse_level)
        .or_else(|| std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use autoseq::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use std::time::Duration;
    pub use tokio_util::sync::CancellationToken;

    pub use crate as autoseq;
    pub use crate::config::{
        Action, ObjectDef, ObjectRegistry, RunnerSettings, SequenceDocument, Step,
    };
    pub use crate::executor::{
        BatchPolicy, ExecutionContext, ProgramSource, RunResult, RunStatus, Session,
    };
    pub use crate::probe::{DesktopProbe, ScreenProbe};

    // Frequently used internal modules
    pub use crate::{config, executor, probe};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level(" debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("loud"), None);
        assert!(!version().is_empty());
    }
}
