//! Navigation stack for nested archives.
//!
//! Tracks the chain of container archives an image was reached through
//! (zip, zip-inside-zip, ...), outermost first. When the innermost
//! container is exhausted, navigation rolls over into the next-outer one
//! like an odometer, except that an exhausted level is closed and popped,
//! not reset; a container is only re-entered fresh via the root directory
//! scan.
//!
//! Directory archives are never pushed: the filesystem view is the implicit
//! bottom of every chain and is owned by the viewer.

use tracing::debug;

use crate::archive::Archive;
use crate::entry::Entry;
use crate::error::Result;

#[derive(Default)]
pub struct ArchiveTree {
    root: Vec<Archive>,
}

impl ArchiveTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Park a container on the stack. Directories are closed and dropped,
    /// as is a container that is already on top (paging within a container
    /// must not re-push it). Parked archives stop prefetching; their pages
    /// are rarely revisited and realize synchronously when they are.
    pub fn append(&mut self, mut archive: Archive) {
        if archive.is_directory() {
            archive.close();
            return;
        }
        if let Some(top) = self.root.last() {
            if top.container_path() == archive.container_path() {
                debug!(
                    container = %archive.container_path().display(),
                    "same container already on stack, skipping"
                );
                return;
            }
        }
        archive.stop_prefetch();
        self.root.push(archive);
    }

    /// The outermost (root-most) container, i.e. the real on-disk file that
    /// delete/rename/move operations must act on.
    pub fn top(&self) -> Option<&Archive> {
        self.root.first()
    }

    /// Advance the innermost container; on exhaustion, pop and close it and
    /// carry into the next level out. Returns the sentinel entry once every
    /// level is exhausted, signaling the caller to fall back to the root
    /// directory archive.
    pub fn next_archive(&mut self) -> Result<Entry> {
        self.roll(|archive| archive.next(1))
    }

    /// Mirror of [`next_archive`](Self::next_archive), walking backwards.
    pub fn prev_archive(&mut self) -> Result<Entry> {
        self.roll(|archive| archive.prev(1))
    }

    fn roll(&mut self, mut advance: impl FnMut(&mut Archive) -> Result<Entry>) -> Result<Entry> {
        while let Some(archive) = self.root.last_mut() {
            let before = archive.cursor();
            let entry = advance(archive)?;
            // An unchanged cursor is the clamp signal: this level is done.
            if entry.is_empty() || archive.cursor() == before {
                debug!(
                    container = %archive.container_path().display(),
                    "container exhausted, ascending"
                );
                if let Some(mut exhausted) = self.root.pop() {
                    exhausted.close();
                }
                continue;
            }
            return Ok(entry);
        }
        debug!("archive stack exhausted");
        Ok(Entry::empty())
    }

    /// Close and drop every parked container.
    pub fn reset(&mut self) {
        for mut archive in self.root.drain(..) {
            archive.close();
        }
    }
}

impl Drop for ArchiveTree {
    fn drop(&mut self) {
        self.reset();
    }
}
