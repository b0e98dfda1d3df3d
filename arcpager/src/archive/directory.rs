//! Filesystem backend: the parent directory of an opened file, viewed as an
//! archive of its sibling files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub(crate) struct DirectoryBackend {
    dir: PathBuf,
}

impl DirectoryBackend {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Absolute paths of regular files in the directory, unsorted.
    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.path());
            }
        }
        Ok(names)
    }

    pub(crate) fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }
}
