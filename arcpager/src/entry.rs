//! A single addressable unit within a container.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::utils;

/// Payload source for an entry. Directory members travel as bare paths
/// (`None`); members extracted from a container carry their bytes.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Bytes(Arc<Vec<u8>>),
}

/// What the viewer should do with a realized entry: display it, or descend
/// into it as a nested container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Image,
    Archive,
    Other,
}

/// One member of a container: a logical name plus its payload source.
///
/// Two entries are equal when both the name and the origin container match;
/// payloads are deliberately ignored. Navigation callers rely on this to
/// detect the "no movement" clamp at container boundaries.
#[derive(Debug, Clone)]
pub struct Entry {
    name: PathBuf,
    container: PathBuf,
    payload: Payload,
}

impl Entry {
    pub(crate) fn path_only(name: PathBuf, container: PathBuf) -> Self {
        Self {
            name,
            container,
            payload: Payload::None,
        }
    }

    pub(crate) fn with_bytes(name: PathBuf, container: PathBuf, bytes: Arc<Vec<u8>>) -> Self {
        Self {
            name,
            container,
            payload: Payload::Bytes(bytes),
        }
    }

    /// The universal "no such page" sentinel.
    pub fn empty() -> Self {
        Self {
            name: PathBuf::new(),
            container: PathBuf::new(),
            payload: Payload::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.as_os_str().is_empty()
    }

    /// Member name within the container (a full path for directory members).
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Identity of the container this entry was listed from.
    pub fn container(&self) -> &Path {
        &self.container
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Realized payload bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            Payload::None => None,
        }
    }

    pub(crate) fn shared_bytes(&self) -> Option<Arc<Vec<u8>>> {
        match &self.payload {
            Payload::Bytes(b) => Some(Arc::clone(b)),
            Payload::None => None,
        }
    }

    /// Classify by suffix: a displayable image, a nested container, or
    /// something the caller must reject.
    pub fn kind(&self) -> EntryKind {
        if utils::is_image_path(&self.name) {
            EntryKind::Image
        } else if utils::is_archive_path(&self.name) {
            EntryKind::Archive
        } else {
            EntryKind::Other
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.container == other.container
    }
}

impl Eq for Entry {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_empty() {
        assert!(Entry::empty().is_empty());
        assert!(!Entry::path_only("a.png".into(), "/tmp".into()).is_empty());
    }

    #[test]
    fn equality_ignores_payload() {
        let plain = Entry::path_only("a.png".into(), "book.zip".into());
        let loaded = Entry::with_bytes("a.png".into(), "book.zip".into(), Arc::new(vec![1, 2, 3]));
        assert_eq!(plain, loaded);
    }

    #[test]
    fn equality_requires_same_container() {
        let a = Entry::path_only("a.png".into(), "book1.zip".into());
        let b = Entry::path_only("a.png".into(), "book2.zip".into());
        assert_ne!(a, b);
    }

    #[test]
    fn classification_by_suffix() {
        assert_eq!(
            Entry::path_only("page1.png".into(), "x".into()).kind(),
            EntryKind::Image
        );
        assert_eq!(
            Entry::path_only("inner.cbz".into(), "x".into()).kind(),
            EntryKind::Archive
        );
        assert_eq!(
            Entry::path_only("readme.txt".into(), "x".into()).kind(),
            EntryKind::Other
        );
    }
}
