//! Saving and loading signaling documents as files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use handoff_common::{now_ms, snapshot_file_name};

/// Write `text` to `<dir>/<type>_<millis>.json`.
///
/// Only the JSON syntax is checked; the `type` field picks the file name.
pub fn save_snapshot(dir: &Path, text: &str) -> Result<PathBuf> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|_| anyhow!("Save failed: the content is not valid JSON."))?;
    let kind = value.get("type").and_then(Value::as_str);

    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(snapshot_file_name(kind, now_ms()));
    fs::write(&path, text.trim()).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Read a saved document, accepting it only if it is JSON.
pub fn load_snapshot(path: &Path) -> Result<String> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str::<Value>(&text)
        .map_err(|_| anyhow!("Load failed: {} does not contain valid JSON.", path.display()))?;
    Ok(text)
}
