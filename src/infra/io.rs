use anyhow::{Context, Result, bail};
use std::path::Path;

/// A source file read from disk.
#[derive(Debug, Clone)]
pub struct SourceText {
    /// File content; invalid UTF-8 sequences are replaced.
    pub text: String,
    /// Size on disk in bytes.
    pub size: u64,
}

/// Size of a regular file, or an error for missing paths and directories.
pub fn regular_file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if !metadata.is_file() {
        bail!("not a regular file: {}", path.display());
    }

    Ok(metadata.len())
}

/// Read a regular file as text.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<SourceText> {
    let path = path.as_ref();
    let size = regular_file_size(path)?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;

    // Lossy decode keeps odd encodings indexable
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };

    Ok(SourceText { text, size })
}
