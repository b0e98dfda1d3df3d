//! tar backend, covering `.tar`, `.tar.gz`, `.tgz`, and bare `.gz`.
//!
//! tar has no random access, so both paths walk the stream once; bulk
//! extraction (`is_multi_read`) amortizes that walk over a whole index
//! range.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::archive::ContainerSource;
use crate::error::{Error, Result};

pub(crate) struct TarBackend {
    source: ContainerSource,
    gzipped: bool,
}

impl TarBackend {
    pub(crate) fn new(source: ContainerSource) -> Self {
        let gzipped = is_gzipped(source.path(), source.data());
        Self { source, gzipped }
    }

    pub(crate) fn list(&self) -> Result<Vec<PathBuf>> {
        let reader = self.source.open()?;
        if self.gzipped {
            list_entries(tar::Archive::new(GzDecoder::new(reader)))
        } else {
            list_entries(tar::Archive::new(reader))
        }
    }

    pub(crate) fn extract(&self, name: &Path) -> Result<Vec<u8>> {
        let wanted = [name.to_path_buf()];
        let mut out = self.extract_many(&wanted)?;
        Ok(out.remove(0))
    }

    pub(crate) fn extract_many(&self, wanted: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
        let reader = self.source.open()?;
        if self.gzipped {
            extract_entries(tar::Archive::new(GzDecoder::new(reader)), wanted)
        } else {
            extract_entries(tar::Archive::new(reader), wanted)
        }
    }
}

fn is_gzipped(path: &Path, data: Option<&[u8]>) -> bool {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "gz" || ext == "tgz" => true,
        Some(ext) if ext == "tar" => false,
        _ => data.map_or(false, |d| d.len() >= 2 && d[0..2] == [0x1F, 0x8B]),
    }
}

fn list_entries<R: Read>(mut archive: tar::Archive<R>) -> Result<Vec<PathBuf>> {
    let mut names = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| Error::Archive(format!("failed to read tar: {e}")))?
    {
        let entry = entry.map_err(|e| Error::Archive(format!("failed to read tar entry: {e}")))?;
        if entry.header().entry_type().is_file() {
            let path = entry
                .path()
                .map_err(|e| Error::Archive(format!("bad tar entry path: {e}")))?;
            names.push(path.into_owned());
        }
    }
    Ok(names)
}

fn extract_entries<R: Read>(
    mut archive: tar::Archive<R>,
    wanted: &[PathBuf],
) -> Result<Vec<Vec<u8>>> {
    let mut out: Vec<Option<Vec<u8>>> = vec![None; wanted.len()];
    let mut remaining = wanted.len();

    for entry in archive
        .entries()
        .map_err(|e| Error::Extraction(format!("failed to read tar: {e}")))?
    {
        if remaining == 0 {
            break;
        }
        let mut entry =
            entry.map_err(|e| Error::Extraction(format!("failed to read tar entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| Error::Extraction(format!("bad tar entry path: {e}")))?
            .into_owned();
        if let Some(slot) = wanted.iter().position(|w| *w == path) {
            if out[slot].is_none() {
                let mut buf = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut buf)?;
                out[slot] = Some(buf);
                remaining -= 1;
            }
        }
    }

    out.into_iter()
        .zip(wanted)
        .map(|(bytes, name)| {
            bytes.ok_or_else(|| Error::Extraction(format!("{} not in tar archive", name.display())))
        })
        .collect()
}
