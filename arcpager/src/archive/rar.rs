//! RAR/CBR backend.
//!
//! The unrar library only accepts on-disk paths, so an archive opened from
//! in-memory bytes (a nested container) is spilled to a named temp file that
//! lives as long as the backend.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub(crate) struct RarBackend {
    path: PathBuf,
    _spill: Option<NamedTempFile>,
}

impl RarBackend {
    pub(crate) fn new(path: PathBuf, data: Option<Arc<Vec<u8>>>) -> Result<Self> {
        match data {
            Some(bytes) => {
                let mut spill = NamedTempFile::new()?;
                spill.write_all(&bytes)?;
                spill.flush()?;
                Ok(Self {
                    path: spill.path().to_path_buf(),
                    _spill: Some(spill),
                })
            }
            None => Ok(Self { path, _spill: None }),
        }
    }

    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let archive = unrar::Archive::new(&self.path)
            .open_for_listing()
            .map_err(|e| {
                Error::Archive(format!("failed to open rar {}: {e}", self.path.display()))
            })?;

        let mut names = Vec::new();
        for entry in archive {
            let header = entry
                .map_err(|e| Error::Archive(format!("failed to read rar header: {e}")))?;
            if !header.is_directory() {
                names.push(header.filename.clone());
            }
        }
        Ok(names)
    }

    pub(crate) fn extract(&self, name: &Path) -> Result<Vec<u8>> {
        let mut cursor = unrar::Archive::new(&self.path)
            .open_for_processing()
            .map_err(|e| {
                Error::Extraction(format!("failed to open rar {}: {e}", self.path.display()))
            })?;

        loop {
            match cursor.read_header() {
                Ok(Some(header)) => {
                    if header.entry().filename.as_path() == name {
                        let (data, _rest) = header.read().map_err(|e| {
                            Error::Extraction(format!(
                                "failed to extract {}: {e}",
                                name.display()
                            ))
                        })?;
                        return Ok(data);
                    }
                    cursor = header.skip().map_err(|e| {
                        Error::Extraction(format!("failed to skip rar entry: {e}"))
                    })?;
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::Extraction(format!("failed to read rar header: {e}")));
                }
            }
        }

        Err(Error::Extraction(format!(
            "{} not in rar archive",
            name.display()
        )))
    }
}
