//! Polymorphic container archives: an ordered, filtered member listing with
//! a clamped cursor, random and relative seeking, and a prefetched page
//! cache kept warm by a background worker.

pub mod utils;

mod directory;
mod pdf;
mod rar;
mod sevenz;
mod tar;
mod zip;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::{debug, trace, warn};

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::prefetch::{self, PrefetchConfig, Shared};

use self::directory::DirectoryBackend;
use self::pdf::PdfBackend;
use self::rar::RarBackend;
use self::sevenz::SevenZBackend;
use self::tar::TarBackend;
use self::zip::ZipBackend;

/// Container format, selected once at construction by extension sniffing
/// (with a magic-byte fallback for in-memory nested archives).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Directory,
    Zip,
    Rar,
    SevenZip,
    Tar,
    Pdf,
}

impl ArchiveKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "zip" | "cbz" => Some(Self::Zip),
            "rar" | "cbr" => Some(Self::Rar),
            "7z" | "cb7" => Some(Self::SevenZip),
            "tar" | "gz" | "tgz" => Some(Self::Tar),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
            Self::Tar => "tar",
            Self::Pdf => "pdf",
        }
    }
}

/// Cheaply cloneable byte payload usable as a `Cursor` backing store.
pub(crate) struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A freshly opened handle on a container, file- or memory-backed.
pub(crate) enum SourceReader {
    File(File),
    Memory(Cursor<SharedBytes>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.read(buf),
            Self::Memory(c) => c.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(f) => f.seek(pos),
            Self::Memory(c) => c.seek(pos),
        }
    }
}

/// Container identity plus optional in-memory payload.
///
/// Every extraction call opens a fresh handle; nothing is held across
/// calls, so the foreground path and the prefetch worker never contend on
/// one descriptor.
pub(crate) struct ContainerSource {
    path: PathBuf,
    data: Option<Arc<Vec<u8>>>,
}

impl ContainerSource {
    fn new(path: PathBuf, data: Option<Arc<Vec<u8>>>) -> Self {
        Self { path, data }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn data(&self) -> Option<&[u8]> {
        self.data.as_deref().map(|v| v.as_slice())
    }

    pub(crate) fn open(&self) -> io::Result<SourceReader> {
        match &self.data {
            Some(bytes) => Ok(SourceReader::Memory(Cursor::new(SharedBytes(Arc::clone(
                bytes,
            ))))),
            None => Ok(SourceReader::File(File::open(&self.path)?)),
        }
    }

    pub(crate) fn byte_len(&self) -> io::Result<u64> {
        match &self.data {
            Some(bytes) => Ok(bytes.len() as u64),
            None => Ok(std::fs::metadata(&self.path)?.len()),
        }
    }
}

/// Per-format listing and extraction capabilities behind one tagged union,
/// so dispatch stays exhaustiveness-checked.
pub(crate) enum Backend {
    Directory(DirectoryBackend),
    Zip(ZipBackend),
    Rar(RarBackend),
    SevenZip(SevenZBackend),
    Tar(TarBackend),
    Pdf(PdfBackend),
}

impl Backend {
    fn list(&self) -> Result<Vec<PathBuf>> {
        match self {
            Self::Directory(b) => b.list(),
            Self::Zip(b) => b.list(),
            Self::Rar(b) => b.list(),
            Self::SevenZip(b) => b.list(),
            Self::Tar(b) => b.list(),
            Self::Pdf(b) => b.list(),
        }
    }

    /// Whether a batched extraction beats one-by-one calls for this format.
    pub(crate) fn is_multi_read(&self) -> bool {
        matches!(self, Self::SevenZip(_) | Self::Tar(_) | Self::Pdf(_))
    }

    pub(crate) fn extract_one(&self, name: &Path, index: usize) -> Result<Vec<u8>> {
        match self {
            Self::Directory(b) => b.read(name),
            Self::Zip(b) => b.extract(name),
            Self::Rar(b) => b.extract(name),
            Self::SevenZip(b) => {
                let wanted = [name.to_path_buf()];
                let mut out = b.extract_many(&wanted)?;
                Ok(out.remove(0))
            }
            Self::Tar(b) => b.extract(name),
            Self::Pdf(b) => b.extract_page(index),
        }
    }

    pub(crate) fn extract_range(
        &self,
        names: &[PathBuf],
        start_index: usize,
    ) -> Result<Vec<Vec<u8>>> {
        match self {
            Self::SevenZip(b) => b.extract_many(names),
            Self::Tar(b) => b.extract_many(names),
            Self::Pdf(b) => b.extract_pages(start_index, names.len()),
            _ => names
                .iter()
                .enumerate()
                .map(|(offset, name)| self.extract_one(name, start_index + offset))
                .collect(),
        }
    }
}

/// Result of a directory random draw; `reshuffled` flags that the
/// no-repeat permutation was exhausted and regenerated.
#[derive(Debug)]
pub struct RandomPick {
    pub entry: Entry,
    pub reshuffled: bool,
}

/// One open container: ordered entries, a clamped cursor, and a bounded
/// cache of realized payloads populated by a background worker.
///
/// Navigation methods return the entry at the *new* cursor position; at a
/// boundary the cursor clamps, so repeated calls return the same entry.
/// Callers use that to detect "end of container".
pub struct Archive {
    kind: ArchiveKind,
    container: PathBuf,
    backend: Arc<Backend>,
    entries: Arc<Vec<PathBuf>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    random_list: Vec<usize>,
}

impl Archive {
    /// Open a container from disk. Paths whose extension is not a known
    /// container format open as a directory view of the parent folder,
    /// positioned on the given member.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_inner(path.into(), None, PrefetchConfig::default())
    }

    /// Open a container from already-read bytes (a nested archive extracted
    /// from a parent container). `path` is the logical member name and is
    /// used for format sniffing and identity only.
    pub fn open_from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Self> {
        Self::open_inner(path.into(), Some(Arc::new(data)), PrefetchConfig::default())
    }

    /// Open a realized entry as a nested container without copying its
    /// payload.
    pub fn open_nested(entry: &Entry) -> Result<Self> {
        let bytes = entry.shared_bytes().ok_or_else(|| {
            Error::Extraction(format!("{} carries no payload", entry.name().display()))
        })?;
        Self::open_inner(
            entry.name().to_path_buf(),
            Some(bytes),
            PrefetchConfig::default(),
        )
    }

    pub fn open_with_config(
        path: impl Into<PathBuf>,
        data: Option<Vec<u8>>,
        config: PrefetchConfig,
    ) -> Result<Self> {
        Self::open_inner(path.into(), data.map(Arc::new), config)
    }

    fn open_inner(
        path: PathBuf,
        data: Option<Arc<Vec<u8>>>,
        config: PrefetchConfig,
    ) -> Result<Self> {
        let kind = match ArchiveKind::from_path(&path) {
            Some(kind) => kind,
            None => match &data {
                Some(bytes) => utils::detect_kind_from_bytes(bytes)
                    .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?,
                None => ArchiveKind::Directory,
            },
        };

        let container = match kind {
            ArchiveKind::Directory => {
                if path.is_dir() {
                    path.clone()
                } else {
                    path.parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."))
                }
            }
            _ => path.clone(),
        };

        debug!(path = %path.display(), kind = kind.as_str(), "opening archive");

        let backend = Arc::new(match kind {
            ArchiveKind::Directory => Backend::Directory(DirectoryBackend::new(container.clone())),
            ArchiveKind::Zip => {
                Backend::Zip(ZipBackend::new(ContainerSource::new(path.clone(), data)))
            }
            ArchiveKind::Rar => Backend::Rar(RarBackend::new(path.clone(), data)?),
            ArchiveKind::SevenZip => Backend::SevenZip(SevenZBackend::new(ContainerSource::new(
                path.clone(),
                data,
            ))),
            ArchiveKind::Tar => {
                Backend::Tar(TarBackend::new(ContainerSource::new(path.clone(), data)))
            }
            ArchiveKind::Pdf => {
                Backend::Pdf(PdfBackend::new(ContainerSource::new(path.clone(), data)))
            }
        });

        // The one-time expensive pass: list, order, filter, dedupe. PDF page
        // names are synthetic and already canonical.
        let mut names = backend.list()?;
        if kind != ArchiveKind::Pdf {
            names.sort_by(|a, b| utils::natural_cmp(a, b));
            names.retain(|p| utils::is_supported(p));
            names.dedup();
        }

        let cursor = if kind == ArchiveKind::Directory && path != container {
            match names.iter().position(|p| p == &path) {
                Some(i) => i,
                None => {
                    warn!(
                        path = %path.display(),
                        "opened member missing after listing, starting at head"
                    );
                    0
                }
            }
        } else {
            0
        };

        let entries = Arc::new(names);
        let shared = Arc::new(Shared::new(cursor));

        let random_list = if kind == ArchiveKind::Directory {
            shuffled_indices(entries.len())
        } else {
            Vec::new()
        };

        let worker = if kind != ArchiveKind::Directory && !entries.is_empty() {
            Some(prefetch::spawn(
                Arc::clone(&shared),
                Arc::clone(&backend),
                Arc::clone(&entries),
                container.clone(),
                config,
            ))
        } else {
            None
        };

        Ok(Self {
            kind,
            container,
            backend,
            entries,
            shared,
            worker,
            random_list,
        })
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ArchiveKind::Directory
    }

    pub fn is_multi_read(&self) -> bool {
        self.backend.is_multi_read()
    }

    /// Identity of the backing file or directory.
    pub fn container_path(&self) -> &Path {
        &self.container
    }

    /// Lowercased extension of the container path, if any.
    pub fn suffix(&self) -> Option<String> {
        self.container
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted, filtered member names.
    pub fn names(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.shared.cursor.load(Ordering::Acquire)
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.shared.cache.lock().pages.contains_key(&index)
    }

    /// Realize the entry at `index`. Out-of-range indices (and an empty
    /// container) yield the sentinel entry. A cache miss falls back to a
    /// synchronous extraction so navigation stays correct even when the
    /// worker has not caught up.
    pub fn get(&self, index: usize) -> Result<Entry> {
        if index >= self.entries.len() {
            return Ok(Entry::empty());
        }

        if self.kind == ArchiveKind::Directory {
            // Live filesystem backing store: only the path travels, and
            // nothing is cached since siblings can vanish at any time.
            return Ok(Entry::path_only(
                self.entries[index].clone(),
                self.container.clone(),
            ));
        }

        if let Some(entry) = self.shared.cache.lock().pages.get(&index) {
            trace!(index, "cache hit");
            return Ok(entry.clone());
        }

        debug!(index, "cache miss, extracting synchronously");
        let name = &self.entries[index];
        let bytes = self.backend.extract_one(name, index)?;
        let entry = Entry::with_bytes(name.clone(), self.container.clone(), Arc::new(bytes));
        self.shared.cache.lock().pages.insert(index, entry.clone());
        Ok(entry)
    }

    pub fn current(&self) -> Result<Entry> {
        self.get(self.cursor())
    }

    /// Advance by `max(1, count)`, clamped to the last page.
    pub fn next(&mut self, count: usize) -> Result<Entry> {
        let len = self.entries.len();
        if len == 0 {
            return Ok(Entry::empty());
        }
        let target = self.cursor().saturating_add(count.max(1)).min(len - 1);
        self.shared.cursor.store(target, Ordering::Release);
        self.get(target)
    }

    /// Step back by `max(1, count)`, clamped to the first page.
    pub fn prev(&mut self, count: usize) -> Result<Entry> {
        if self.entries.is_empty() {
            return Ok(Entry::empty());
        }
        let target = self.cursor().saturating_sub(count.max(1));
        self.shared.cursor.store(target, Ordering::Release);
        self.get(target)
    }

    pub fn head(&mut self) -> Result<Entry> {
        if self.entries.is_empty() {
            return Ok(Entry::empty());
        }
        self.shared.cursor.store(0, Ordering::Release);
        self.get(0)
    }

    pub fn tail(&mut self) -> Result<Entry> {
        let len = self.entries.len();
        if len == 0 {
            return Ok(Entry::empty());
        }
        self.shared.cursor.store(len - 1, Ordering::Release);
        self.get(len - 1)
    }

    /// Locate a member by exact path, reposition the cursor on it, and
    /// invalidate the cache (the window must recompute from the new index).
    /// Directory archives only.
    pub fn search(&mut self, target: &Path) -> Result<usize> {
        self.require_directory()?;
        let index = self
            .entries
            .iter()
            .position(|p| p == target)
            .ok_or_else(|| Error::NotFound(target.to_path_buf()))?;
        self.shared.cursor.store(index, Ordering::Release);
        self.shared.invalidate();
        Ok(index)
    }

    /// Drop a member after an out-of-band delete/move/rename. Indices after
    /// the removal point shift left, so the whole cache is invalidated, and
    /// the random permutation is repaired in place. Directory archives only.
    pub fn remove(&mut self, target: &Path) -> Result<usize> {
        let index = self.search(target)?;
        debug!(index, path = %target.display(), "removing entry");

        Arc::make_mut(&mut self.entries).remove(index);

        self.random_list.retain(|&n| n != index);
        for n in self.random_list.iter_mut() {
            if *n > index {
                *n -= 1;
            }
        }

        let len = self.entries.len();
        if len > 0 && self.cursor() >= len {
            self.shared.cursor.store(len - 1, Ordering::Release);
        }
        Ok(index)
    }

    /// Draw the next member of a shuffled no-repeat permutation, moving the
    /// cursor to it. Once the permutation is exhausted it is regenerated and
    /// the pick is flagged `reshuffled`. Directory archives only.
    pub fn random_select(&mut self) -> Result<RandomPick> {
        self.require_directory()?;
        if self.entries.is_empty() {
            return Ok(RandomPick {
                entry: Entry::empty(),
                reshuffled: false,
            });
        }

        let mut reshuffled = false;
        if self.random_list.is_empty() {
            warn!("random selection list exhausted, reshuffling");
            self.random_list = shuffled_indices(self.entries.len());
            reshuffled = true;
        }

        let index = match self.random_list.pop() {
            Some(index) => index,
            None => {
                return Ok(RandomPick {
                    entry: Entry::empty(),
                    reshuffled,
                })
            }
        };
        self.shared.cursor.store(index, Ordering::Release);
        Ok(RandomPick {
            entry: self.get(index)?,
            reshuffled,
        })
    }

    /// Stop the background worker but keep entries and cache intact. Used
    /// when the archive is parked in an [`ArchiveTree`](crate::tree::ArchiveTree).
    pub fn stop_prefetch(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(container = %self.container.display(), "prefetch worker panicked");
            }
        }
    }

    /// Stop the worker and drop entries and cache. Navigation afterwards
    /// returns the sentinel entry.
    pub fn close(&mut self) {
        self.stop_prefetch();
        self.shared.invalidate();
        Arc::make_mut(&mut self.entries).clear();
        self.random_list.clear();
        self.shared.cursor.store(0, Ordering::Release);
    }

    fn require_directory(&self) -> Result<()> {
        if self.kind == ArchiveKind::Directory {
            Ok(())
        } else {
            Err(Error::NotADirectory(self.container.clone()))
        }
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        self.stop_prefetch();
    }
}

fn shuffled_indices(len: usize) -> Vec<usize> {
    let mut list: Vec<usize> = (0..len).collect();
    list.shuffle(&mut thread_rng());
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(ArchiveKind::from_extension("zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("CBZ"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("rar"), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_extension("cbr"), Some(ArchiveKind::Rar));
        assert_eq!(
            ArchiveKind::from_extension("7z"),
            Some(ArchiveKind::SevenZip)
        );
        assert_eq!(ArchiveKind::from_extension("tar"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_extension("gz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_extension("tgz"), Some(ArchiveKind::Tar));
        assert_eq!(ArchiveKind::from_extension("pdf"), Some(ArchiveKind::Pdf));
        assert_eq!(ArchiveKind::from_extension("png"), None);
    }

    #[test]
    fn kind_from_path() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("/books/vol1.cbz")),
            Some(ArchiveKind::Zip)
        );
        assert_eq!(ArchiveKind::from_path(Path::new("/books/page.png")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("/books/folder")), None);
    }

    #[test]
    fn shuffled_indices_is_a_permutation() {
        let mut list = shuffled_indices(16);
        list.sort_unstable();
        assert_eq!(list, (0..16).collect::<Vec<_>>());
    }
}
