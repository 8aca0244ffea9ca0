//! Import and export service implementations.
//!
//! Both services write and read one data file per collection, named
//! `<collection name>.<codec extension>`, directly inside a single directory.

pub mod export;
pub mod import;

pub use export::{
    ExportCollectionsOptions, ExportOutcome, ExportRecordsOptions, ExportReport, ExportService,
};
pub use import::{
    ImportCollectionsOptions, ImportOutcome, ImportRecordsOptions, ImportReport, ImportService,
};

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Quotes a path for operator-facing messages.
pub(crate) fn quoted(path: &Path) -> String {
    format!("{:?}", path.display().to_string())
}

/// Prefixes codec errors with the file they concern.
fn with_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Codec { format, cause } => Error::Codec {
            format,
            cause: format!("{}: {cause}", path.display()),
        },
        other => other,
    }
}

/// Removes `dir` with all its contents, if present.
pub(crate) fn wipe_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io("remove_dir", dir, e)),
    }
}

/// Creates `dir` and its parents.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io("create_dir", dir, e))
}

/// Creates `path` and hands a buffered writer to `encode`.
pub(crate) fn write_data_file<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let file = File::create(path).map_err(|e| Error::io("create_file", path, e))?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer).map_err(|e| with_path(e, path))?;
    writer
        .flush()
        .map_err(|e| Error::io("write_file", path, e))
}

/// Opens `path` and hands a buffered reader to `decode`.
pub(crate) fn read_data_file<T, F>(path: &Path, decode: F) -> Result<T>
where
    F: FnOnce(&mut dyn std::io::Read) -> Result<T>,
{
    let file = File::open(path).map_err(|e| Error::io("open_file", path, e))?;
    let mut reader = BufReader::new(file);
    decode(&mut reader).map_err(|e| with_path(e, path))
}

/// Lists the regular files directly inside `dir` whose extension is
/// `extension`, sorted by file name.
pub(crate) fn data_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io("read_dir", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read_dir", dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping file with other extension");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Collection name a data file belongs to: the file name without extension.
pub(crate) fn collection_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.csv", "a.csv", "c.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = data_files(dir.path(), "csv").unwrap();
        let names: Vec<_> = files.iter().filter_map(|p| collection_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_wipe_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        wipe_dir(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_codec_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(&path, "oops").unwrap();

        let err = read_data_file(&path, |_| -> Result<()> { Err(Error::codec("json", "bad")) })
            .unwrap_err();
        assert!(err.to_string().contains("posts.json: bad"), "{err}");
    }
}
