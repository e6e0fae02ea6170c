use anyhow::{Context, Result, anyhow, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::models::{Action, DEFAULT_SEQUENCE_NAME, ObjectDef, SequenceDocument};

/// Load a sequence document from a string slice.
///
/// Image paths are left as written; use [`load_from_path`] to resolve them
/// against a project root.
pub fn load_from_str(s: &str) -> Result<SequenceDocument> {
    let doc: SequenceDocument =
        serde_json::from_str(s).context("Failed to parse JSON sequence string")?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Load a sequence document from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<SequenceDocument> {
    let doc: SequenceDocument =
        serde_json::from_reader(reader).context("Failed to parse JSON sequence from reader")?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Load a sequence file synchronously and resolve its image paths against the
/// file's directory.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<SequenceDocument> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open sequence file {}", path_ref.display()))?;
    let mut doc = load_from_reader(file)
        .with_context(|| format!("Invalid sequence file {}", path_ref.display()))?;
    fill_sequence_name(&mut doc, path_ref);
    resolve_asset_paths(&mut doc, project_root(path_ref));
    debug!(target: "autoseq::loader", "Loaded sequence from {}", path_ref.display());
    Ok(doc)
}

/// Load a sequence file asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<SequenceDocument> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read sequence file {}", path_ref.display()))?;
    let mut doc: SequenceDocument = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON sequence from {}", path_ref.display()))?;
    validate_document(&doc)
        .with_context(|| format!("Invalid sequence file {}", path_ref.display()))?;
    fill_sequence_name(&mut doc, path_ref);
    resolve_asset_paths(&mut doc, project_root(path_ref));
    debug!(target: "autoseq::loader", "Loaded sequence from {}", path_ref.display());
    Ok(doc)
}

/// Directory a sequence file lives in; image paths are relative to it.
pub fn project_root(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Make relative image paths absolute against `root`. Missing files only warn:
/// the step using them is skipped at run time.
pub fn resolve_asset_paths(doc: &mut SequenceDocument, root: &Path) {
    for (name, def) in doc.objects.iter_mut() {
        let ObjectDef::Image(image) = def else {
            continue;
        };
        if image.asset.is_relative() {
            image.asset = root.join(&image.asset);
        }
        if !image.asset.exists() {
            warn!(
                target: "autoseq::loader",
                object = %name, path = %image.asset.display(),
                "Image asset not found"
            );
        }
    }
}

/// Unnamed documents take the file stem as their name.
fn fill_sequence_name(doc: &mut SequenceDocument, path: &Path) {
    let unnamed =
        doc.sequence_name.trim().is_empty() || doc.sequence_name == DEFAULT_SEQUENCE_NAME;
    if let (true, Some(stem)) = (unnamed, path.file_stem()) {
        doc.sequence_name = stem.to_string_lossy().into_owned();
    }
}

/// Generate the JSON Schema for sequence documents.
pub fn generate_schema() -> Schema {
    schema_for!(SequenceDocument)
}

/// Write the JSON Schema for sequence documents to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Sanity checks beyond what deserialization enforces:
/// - object names are non-empty
/// - numeric parameters are in range (confidence, click count, durations)
///
/// References to unknown objects and out-of-range jump targets are not errors
/// here; the runner reports and skips them.
pub fn validate_document(doc: &SequenceDocument) -> Result<()> {
    for (name, def) in doc.objects.iter() {
        if name.trim().is_empty() {
            bail!("Object names cannot be empty");
        }
        if let ObjectDef::Image(image) = def {
            image
                .validate()
                .map_err(|e| anyhow!("{e}"))
                .with_context(|| format!("Invalid image object '{}'", name))?;
        }
    }

    for (idx, step) in doc.steps.iter().enumerate() {
        validate_action(&step.action).with_context(|| {
            format!(
                "Invalid parameters for '{}' at step {}",
                step.action.name(),
                idx + 1
            )
        })?;
    }

    Ok(())
}

fn validate_action(action: &Action) -> Result<()> {
    let checked = match action {
        Action::Click(p) => p.validate(),
        Action::WaitForImage(p) => p.validate(),
        Action::WaitForPixelColor(p) => p.validate(),
        Action::Wait(p) => p.validate(),
        Action::KeyboardInput(p) => p.validate(),
        Action::IfImageFound(p) => p.validate(),
        Action::IfPixelColor(p) => p.validate(),
        // Nothing numeric to range-check
        Action::PressKey(_) | Action::HotkeyCombo(_) | Action::Scroll(_) | Action::GotoStep(_) => {
            Ok(())
        }
    };
    checked.map_err(|e| anyhow!("{e}"))
}
