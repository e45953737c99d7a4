use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::common::error::{MaloneyError, Result};

/// Replace the contents of `path` with the concatenation of `parts`.
///
/// The new contents are written to a temporary file in the same directory and
/// renamed over the original, so readers see either the old or the new file.
pub fn replace_atomically(path: &Path, parts: &[&[u8]]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    for part in parts {
        tmp.write_all(part)?;
    }
    tmp.as_file_mut().flush()?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }

    tmp.persist(path).map_err(|e| MaloneyError::Io(e.error))?;
    Ok(())
}

/// Read a whole file into memory.
pub fn read_all(path: &Path) -> Result<Vec<u8>> {
    let mut file = open_ro(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// Open a file for read-only access.
pub fn open_ro(path: &Path) -> Result<File> {
    Ok(File::open(path)?)
}

/// Compatibility decomposition (NFKD), applied to catalog text, remote text
/// and file stems so that all three compare equal.
pub fn nfkd(text: &str) -> String {
    text.nfkd().collect()
}
