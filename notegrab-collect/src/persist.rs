use notegrab_common::Result;
use notegrab_social::misskey::Note;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `notes` as a single JSON array, replacing whatever is at `path`.
///
/// Missing parent directories are created. The write is not atomic: a crash
/// mid-write leaves a truncated file behind.
pub fn write_notes(path: &Path, notes: &[Note]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, notes)?;
    out.flush()?;
    tracing::info!(
        target: "collect",
        path = %path.display(),
        notes = notes.len(),
        "collect.persisted"
    );
    Ok(())
}
