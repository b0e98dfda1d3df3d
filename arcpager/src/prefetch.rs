//! Background cache population.
//!
//! One worker thread per open (non-directory) archive keeps a sliding window
//! of realized payloads resident around the cursor, so sequential paging
//! never waits on extraction. The foreground and the worker share state only
//! through [`Shared`]: a mutex-guarded page map plus atomic cursor, stop
//! flag, and cache generation. The generation is bumped on every structural
//! invalidation; worker results carrying a stale generation are discarded
//! rather than stored, since indices may have shifted underneath them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::archive::Backend;
use crate::entry::Entry;

/// Tuning for the prefetch window and worker cadence.
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Pages kept behind the cursor.
    pub prev_cache: usize,
    /// Pages kept ahead of the cursor.
    pub next_cache: usize,
    /// Idle sleep between polls once the window is full.
    pub poll_interval: Duration,
    /// Background attempts per index before it is skipped for good.
    pub max_attempts: u32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            prev_cache: 2,
            next_cache: 10,
            poll_interval: Duration::from_millis(100),
            max_attempts: 3,
        }
    }
}

#[derive(Default)]
pub(crate) struct CacheState {
    pub(crate) pages: HashMap<usize, Entry>,
    pub(crate) failures: HashMap<usize, u32>,
}

pub(crate) struct Shared {
    pub(crate) cursor: AtomicUsize,
    pub(crate) stop: AtomicBool,
    pub(crate) generation: AtomicU64,
    pub(crate) cache: Mutex<CacheState>,
}

impl Shared {
    pub(crate) fn new(cursor: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(cursor),
            stop: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// Clear everything and invalidate in-flight worker results.
    pub(crate) fn invalidate(&self) {
        let mut state = self.cache.lock();
        state.pages.clear();
        state.failures.clear();
        drop(state);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Window `[cursor - prev, cursor + next)` clamped to `[0, len)`.
pub(crate) fn window_bounds(cursor: usize, len: usize, cfg: &PrefetchConfig) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let start = cursor.saturating_sub(cfg.prev_cache).min(len);
    let end = cursor.saturating_add(cfg.next_cache).min(len);
    (start, end)
}

pub(crate) fn spawn(
    shared: Arc<Shared>,
    backend: Arc<Backend>,
    names: Arc<Vec<PathBuf>>,
    container: PathBuf,
    cfg: PrefetchConfig,
) -> JoinHandle<()> {
    thread::spawn(move || run(&shared, &backend, names.as_slice(), &container, &cfg))
}

fn run(
    shared: &Shared,
    backend: &Backend,
    names: &[PathBuf],
    container: &Path,
    cfg: &PrefetchConfig,
) {
    let len = names.len();
    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let cursor = shared.cursor.load(Ordering::Acquire);
        let generation = shared.generation.load(Ordering::Acquire);
        let (start, end) = window_bounds(cursor, len, cfg);

        // Rebuild the cache around the window, then collect what is missing.
        let yet: Vec<usize> = {
            let mut state = shared.cache.lock();
            state.pages.retain(|i, _| (start..end).contains(i));
            state.failures.retain(|i, _| (start..end).contains(i));
            (start..end)
                .filter(|i| {
                    !state.pages.contains_key(i)
                        && state.failures.get(i).map_or(true, |&n| n < cfg.max_attempts)
                })
                .collect()
        };

        if yet.is_empty() {
            trace!(cursor, start, end, "window cached, idling");
            thread::sleep(cfg.poll_interval);
            continue;
        }

        if backend.is_multi_read() {
            // Bulk path: one container open realizes a run of entries. The
            // cursor may move while we extract; overshoot is pruned later.
            let lo = yet[0];
            let hi = (lo + (cfg.next_cache / 2).max(1)).min(len);
            debug!(lo, hi, "bulk prefetch");
            match backend.extract_range(&names[lo..hi], lo) {
                Ok(payloads) => {
                    let mut state = shared.cache.lock();
                    if shared.generation.load(Ordering::Acquire) == generation {
                        for (offset, bytes) in payloads.into_iter().enumerate() {
                            let i = lo + offset;
                            let entry =
                                Entry::with_bytes(names[i].clone(), container.to_path_buf(), Arc::new(bytes));
                            state.pages.insert(i, entry);
                        }
                    }
                }
                Err(err) => {
                    warn!(lo, hi, %err, "bulk prefetch failed");
                    let mut state = shared.cache.lock();
                    for i in lo..hi {
                        *state.failures.entry(i).or_insert(0) += 1;
                    }
                }
            }
        } else {
            for &i in &yet {
                if shared.stop.load(Ordering::Acquire) {
                    return;
                }
                match backend.extract_one(&names[i], i) {
                    Ok(bytes) => {
                        let mut state = shared.cache.lock();
                        if shared.generation.load(Ordering::Acquire) != generation {
                            // Indices shifted while we were extracting.
                            break;
                        }
                        let entry =
                            Entry::with_bytes(names[i].clone(), container.to_path_buf(), Arc::new(bytes));
                        state.pages.insert(i, entry);
                    }
                    Err(err) => {
                        warn!(index = i, %err, "prefetch failed");
                        let mut state = shared.cache.lock();
                        *state.failures.entry(i).or_insert(0) += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_centered_on_cursor() {
        let cfg = PrefetchConfig::default();
        assert_eq!(window_bounds(5, 20, &cfg), (3, 15));
    }

    #[test]
    fn window_clamps_at_head() {
        let cfg = PrefetchConfig::default();
        assert_eq!(window_bounds(0, 20, &cfg), (0, 10));
        assert_eq!(window_bounds(1, 20, &cfg), (0, 11));
    }

    #[test]
    fn window_clamps_at_tail() {
        let cfg = PrefetchConfig::default();
        assert_eq!(window_bounds(19, 20, &cfg), (17, 20));
    }

    #[test]
    fn window_of_empty_archive() {
        let cfg = PrefetchConfig::default();
        assert_eq!(window_bounds(0, 0, &cfg), (0, 0));
    }

    #[test]
    fn window_smaller_than_archive() {
        let cfg = PrefetchConfig::default();
        assert_eq!(window_bounds(2, 4, &cfg), (0, 4));
    }
}
