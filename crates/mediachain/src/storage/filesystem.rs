use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Move a file from `src` to `dst`. Tries `rename` first and falls back to
/// copy + delete when the two paths live on different filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Writes `content` next to `path` and renames it into place, so readers
/// never observe a partially written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_directory(parent)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let write = || -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()
    };
    if let Err(e) = write() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(StorageError::WriteFile {
            path: tmp_path,
            source: e,
        });
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        StorageError::MoveFile {
            from: tmp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        }
    })
}

/// A directory that owns the files placed into it.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Moves `source` into the root under `filename`, creating the root first.
    pub fn adopt(&self, source: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        ensure_directory(&self.root)?;
        let target = self.root.join(filename);
        move_file(source, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_adopt_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let staged = temp_dir.path().join("staged.bin");
        std::fs::write(&staged, b"frames").unwrap();

        let storage = FileStorage::new(temp_dir.path().join("uploads"));
        let stored = storage.adopt(&staged, "abc_clip.mov").unwrap();

        assert!(!staged.exists());
        assert_eq!(std::fs::read(&stored).unwrap(), b"frames");
        assert!(stored.ends_with("uploads/abc_clip.mov"));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("run.json");

        write_atomic(&path, b"{\"v\":1}").unwrap();
        write_atomic(&path, b"{\"v\":2}").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"v\":2}");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_move_file_to_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("a.bin");
        std::fs::write(&src, b"x").unwrap();

        let result = move_file(&src, &temp_dir.path().join("missing").join("b.bin"));
        assert!(matches!(result, Err(StorageError::MoveFile { .. })));
        assert!(src.exists());
    }
}
