//! Screenshot partitions
//!
//! `<root>/<mode>/step-<n>.png`, with `n` counting from 1. Preparing a
//! partition removes the step screenshots of any earlier run, so a partition
//! only ever holds one run's captures.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::RunMode;
use crate::error::{RetraceError, Result};

#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
    mode: RunMode,
}

impl ScreenshotStore {
    pub fn new(root: impl AsRef<Path>, mode: RunMode) -> Self {
        Self {
            dir: root.as_ref().join(mode.dir_name()),
            mode,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Create the partition directory and clear earlier step screenshots
    ///
    /// Files that are not named like a step screenshot are left alone.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| RetraceError::IoError {
            message: format!("Failed to create {}: {}", self.dir.display(), e),
        })?;

        let mut removed = 0usize;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_step = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(parse_step)
                .is_some();
            if is_step && path.is_file() {
                std::fs::remove_file(&path).map_err(|e| RetraceError::IoError {
                    message: format!("Failed to remove {}: {}", path.display(), e),
                })?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(dir = %self.dir.display(), removed, "Cleared earlier screenshots");
        }
        Ok(())
    }

    pub fn path_for(&self, step: usize) -> PathBuf {
        self.dir.join(file_name(step))
    }

    pub fn save(&self, step: usize, png: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(step);
        std::fs::write(&path, png).map_err(|e| RetraceError::IoError {
            message: format!("Failed to write {}: {}", path.display(), e),
        })?;
        Ok(path)
    }
}

/// `step-<n>.png`
pub fn file_name(step: usize) -> String {
    format!("step-{}.png", step)
}

/// Inverse of [`file_name`]
pub fn parse_step(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("step-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
        .filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let store = ScreenshotStore::new("screenshots", RunMode::Baseline);
        assert_eq!(store.path_for(3), PathBuf::from("screenshots/baseline/step-3.png"));
    }

    #[test]
    fn test_prepare_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path().join("shots"), RunMode::Current);
        store.prepare().unwrap();
        store.prepare().unwrap();

        let path = store.save(1, b"png").unwrap();
        store.save(1, b"png2").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"png2");
    }

    #[test]
    fn test_prepare_clears_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path(), RunMode::Current);
        store.prepare().unwrap();
        for step in 1..=4 {
            store.save(step, b"old").unwrap();
        }
        std::fs::write(store.dir().join("notes.txt"), "keep").unwrap();

        store.prepare().unwrap();
        store.save(1, b"new").unwrap();
        store.save(2, b"new").unwrap();

        let mut names: Vec<String> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["notes.txt", "step-1.png", "step-2.png"]);
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(parse_step("step-12.png"), Some(12));
        assert_eq!(parse_step("step-0.png"), None);
        assert_eq!(parse_step("step-x.png"), None);
        assert_eq!(parse_step("diff-1.png"), None);
    }
}
