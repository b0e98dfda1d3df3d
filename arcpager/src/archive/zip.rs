//! ZIP/CBZ backend.

use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::archive::{ContainerSource, SourceReader};
use crate::error::{Error, Result};

pub(crate) struct ZipBackend {
    source: ContainerSource,
}

impl ZipBackend {
    pub(crate) fn new(source: ContainerSource) -> Self {
        Self { source }
    }

    fn open_reader(&self) -> Result<ZipArchive<SourceReader>> {
        ZipArchive::new(self.source.open()?).map_err(|e| {
            Error::Archive(format!(
                "failed to open zip {}: {e}",
                self.source.path().display()
            ))
        })
    }

    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let archive = self.open_reader()?;
        Ok(archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(PathBuf::from)
            .collect())
    }

    pub(crate) fn extract(&self, name: &Path) -> Result<Vec<u8>> {
        let wanted = name.to_string_lossy().into_owned();
        let mut archive = self.open_reader()?;
        let mut file = archive
            .by_name(&wanted)
            .map_err(|e| Error::Extraction(format!("{wanted} not in zip archive: {e}")))?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
