//! Paginated archive reading with a background prefetch cache.
//!
//! A viewer that pages through images stored in containers (directories,
//! zip/rar/7z/tar archives, PDFs, nested combinations of these) needs page
//! flips to return instantly even when the backing store is a multi-gigabyte
//! solid archive. This crate provides the core that makes that work:
//!
//! - [`Archive`]: one open container behind a uniform capability set
//!   (ordered listing, clamped cursor navigation, random access), with a
//!   background worker keeping a sliding window of realized payloads warm
//!   around the cursor and a synchronous fallback for cold jumps.
//! - [`ArchiveTree`]: the stack of parent containers behind the current
//!   view, with odometer-style rollover when the innermost one is exhausted.
//! - [`Entry`]: a member name plus its opaque payload; [`decode`] is the
//!   single boundary where payloads become pixels.
//!
//! Containers are read-only here. The filesystem-backed variant additionally
//! supports member removal bookkeeping and no-repeat random selection for
//! the viewer's delete/shuffle flows.

pub mod archive;
pub mod decode;
pub mod entry;
pub mod error;
pub mod prefetch;
pub mod tree;

pub use archive::{Archive, ArchiveKind, RandomPick};
pub use entry::{Entry, EntryKind, Payload};
pub use error::{Error, Result};
pub use prefetch::PrefetchConfig;
pub use tree::ArchiveTree;
