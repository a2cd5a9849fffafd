use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes `value` as pretty JSON next to `path` and renames it into place.
///
/// Readers observe either the previous file or the complete new one. When any
/// step fails the temp file is removed and `path` is left untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
    }

    let temp_path = temp_path_for(path);
    let result = write_then_rename(&temp_path, path, value);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename<T: Serialize>(temp_path: &Path, path: &Path, value: &T) -> Result<()> {
    let file = File::create(temp_path)
        .with_context(|| format!("Unable to create temp file {}", temp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize JSON for {}", path.display()))?;
    writer.write_all(b"\n")?;
    let file = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("Failed to flush {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", temp_path.display()))?;
    drop(file);

    fs::rename(temp_path, path).with_context(|| {
        format!(
            "Failed to move {} into place at {}",
            temp_path.display(),
            path.display()
        )
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data.json".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
}
