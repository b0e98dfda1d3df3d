//! 7z/CB7 backend.
//!
//! 7z is the one format where bulk extraction pays off: solid archives
//! decompress sequentially, so realizing a whole index range in one
//! container open avoids re-walking the stream per entry.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use sevenz_rust::{Password, SevenZReader};

use crate::archive::{ContainerSource, SourceReader};
use crate::error::{Error, Result};

pub(crate) struct SevenZBackend {
    source: ContainerSource,
}

impl SevenZBackend {
    pub(crate) fn new(source: ContainerSource) -> Self {
        Self { source }
    }

    fn open_reader(&self) -> Result<SevenZReader<SourceReader>> {
        SevenZReader::new(self.source.open()?, self.source.byte_len()?, Password::empty()).map_err(
            |e| {
                Error::Archive(format!(
                    "failed to open 7z {}: {e}",
                    self.source.path().display()
                ))
            },
        )
    }

    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let reader = self.open_reader()?;
        Ok(reader
            .archive()
            .files
            .iter()
            .filter(|f| !f.is_directory())
            .map(|f| PathBuf::from(f.name()))
            .collect())
    }

    /// Extract every wanted member in one pass, preserving slot order.
    pub(crate) fn extract_many(&self, wanted: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        for (i, name) in wanted.iter().enumerate() {
            slots.insert(name.to_string_lossy().into_owned(), i);
        }

        let mut out: Vec<Option<Vec<u8>>> = vec![None; wanted.len()];
        let mut remaining = slots.len();

        let mut reader = self.open_reader()?;
        reader
            .for_each_entries(|entry, rd| {
                if let Some(&slot) = slots.get(entry.name()) {
                    let mut buf = Vec::new();
                    rd.read_to_end(&mut buf).map_err(|e| {
                        sevenz_rust::Error::other(format!(
                            "failed to read {}: {e}",
                            entry.name()
                        ))
                    })?;
                    out[slot] = Some(buf);
                    remaining -= 1;
                }
                Ok(remaining > 0)
            })
            .map_err(|e| {
                Error::Extraction(format!(
                    "7z {}: {e}",
                    self.source.path().display()
                ))
            })?;

        out.into_iter()
            .zip(wanted)
            .map(|(bytes, name)| {
                bytes.ok_or_else(|| {
                    Error::Extraction(format!("{} not in 7z archive", name.display()))
                })
            })
            .collect()
    }
}
