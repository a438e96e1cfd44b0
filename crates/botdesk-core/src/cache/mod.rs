// ── Per-entity query cache ──
//
// Holds list pages (keyed by `ListParams`) and detail records (keyed by id)
// for one entity kind. Every write bumps a `watch` version counter so
// observers can re-read. Reads in flight register a cancellation token per
// key; optimistic writes cancel them first so a late response can never
// overwrite speculative state. List pages are capped; the least recently
// written page goes first.

mod key;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use botdesk_api::{EntityId, ListParams, Page};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::trace;

pub use key::{QueryKey, QueryScope};

/// Default cap on cached list pages per entity kind.
pub const MAX_LIST_PAGES: usize = 50;

/// One cached read result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub updated_at: Instant,
    /// Set by invalidation; the next read refetches regardless of age.
    pub invalidated: bool,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

/// Copy of the entries a mutation may touch.
///
/// Captures every list page plus the named detail entries, including their
/// absence.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
    lists: Vec<(ListParams, CacheEntry<Page<T>>)>,
    details: Vec<(EntityId, Option<CacheEntry<T>>)>,
}

impl<T> CacheSnapshot<T> {
    pub fn list_count(&self) -> usize {
        self.lists.len()
    }
}

// Compares cached data only. List order follows map iteration, so lists
// compare as sets.
impl<T: PartialEq> PartialEq for CacheSnapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.lists.len() == other.lists.len()
            && self.lists.iter().all(|(params, entry)| {
                other
                    .lists
                    .iter()
                    .any(|(p, e)| p == params && e.data == entry.data)
            })
            && self.details.len() == other.details.len()
            && self
                .details
                .iter()
                .zip(&other.details)
                .all(|((a, x), (b, y))| {
                    a == b && x.as_ref().map(|e| &e.data) == y.as_ref().map(|e| &e.data)
                })
    }
}

struct Inflight {
    token: CancellationToken,
    readers: usize,
    generation: u64,
}

/// Registration of one in-flight read. Dropping the last guard for a key
/// unregisters it.
pub struct ReadGuard<'a, T: Clone + Send + Sync + 'static> {
    cache: &'a QueryCache<T>,
    key: QueryKey,
    generation: u64,
    token: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> ReadGuard<'_, T> {
    /// Resolves once a mutation supersedes this read.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let inflight = &self.cache.inflight;
        let last = match inflight.get_mut(&self.key) {
            Some(mut entry) if entry.generation == self.generation => {
                entry.readers = entry.readers.saturating_sub(1);
                entry.readers == 0
            }
            _ => false,
        };
        if last {
            inflight.remove_if(&self.key, |_, entry| {
                entry.generation == self.generation && entry.readers == 0
            });
        }
    }
}

/// Cache for a single entity kind.
pub struct QueryCache<T: Clone + Send + Sync + 'static> {
    entity: &'static str,
    lists: DashMap<ListParams, CacheEntry<Page<T>>>,
    details: DashMap<EntityId, CacheEntry<T>>,
    inflight: DashMap<QueryKey, Inflight>,
    generations: AtomicU64,
    max_lists: usize,
    version: watch::Sender<u64>,
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    pub fn new(entity: &'static str) -> Self {
        Self::with_max_lists(entity, MAX_LIST_PAGES)
    }

    /// Keep at most `max_lists` list pages (at least one).
    pub fn with_max_lists(entity: &'static str, max_lists: usize) -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            entity,
            lists: DashMap::new(),
            details: DashMap::new(),
            inflight: DashMap::new(),
            generations: AtomicU64::new(0),
            max_lists: max_lists.max(1),
            version,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn list(&self, params: &ListParams) -> Option<CacheEntry<Page<T>>> {
        self.lists.get(params).map(|e| e.value().clone())
    }

    pub fn detail(&self, id: &EntityId) -> Option<CacheEntry<T>> {
        self.details.get(id).map(|e| e.value().clone())
    }

    /// Every cached list page, in no particular order.
    pub fn lists(&self) -> Vec<(ListParams, CacheEntry<Page<T>>)> {
        self.lists
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub fn put_list(&self, params: ListParams, page: Page<T>) {
        self.lists.insert(params.clone(), CacheEntry::new(page));
        self.evict_lists(&params);
        self.bump_version();
    }

    pub fn put_detail(&self, id: EntityId, data: T) {
        self.details.insert(id, CacheEntry::new(data));
        self.bump_version();
    }

    pub fn remove_detail(&self, id: &EntityId) -> Option<T> {
        let removed = self.details.remove(id).map(|(_, e)| e.data);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Apply `f` to every cached page. `f` returns whether it changed the page.
    pub fn update_lists(&self, mut f: impl FnMut(&ListParams, &mut Page<T>) -> bool) -> usize {
        let mut changed = 0;
        for mut entry in self.lists.iter_mut() {
            let (params, cached) = entry.pair_mut();
            if f(params, &mut cached.data) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.bump_version();
        }
        changed
    }

    /// Apply `f` to a cached detail entry. Returns `false` if none is cached.
    pub fn update_detail(&self, id: &EntityId, f: impl FnOnce(&mut T)) -> bool {
        let updated = self.details.get_mut(id).map(|mut e| f(&mut e.data)).is_some();
        if updated {
            self.bump_version();
        }
        updated
    }

    /// Mark every list page stale so the next read refetches.
    pub fn invalidate_lists(&self) {
        for mut entry in self.lists.iter_mut() {
            entry.invalidated = true;
        }
        self.bump_version();
    }

    pub fn invalidate_detail(&self, id: &EntityId) {
        if let Some(mut entry) = self.details.get_mut(id) {
            entry.invalidated = true;
        }
        self.bump_version();
    }

    /// Drop everything (logout).
    pub fn clear(&self) {
        self.cancel_reads(|_| true);
        self.lists.clear();
        self.details.clear();
        self.bump_version();
    }

    /// Drop the least recently written pages beyond the cap, never `keep`.
    fn evict_lists(&self, keep: &ListParams) {
        while self.lists.len() > self.max_lists {
            let oldest = self
                .lists
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.updated_at)
                .map(|e| e.key().clone());
            let Some(oldest) = oldest else { break };
            trace!(entity = self.entity, page = oldest.page, "evicting list page");
            self.lists.remove(&oldest);
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn snapshot(&self, detail_ids: &[EntityId]) -> CacheSnapshot<T> {
        CacheSnapshot {
            lists: self.lists(),
            details: detail_ids
                .iter()
                .map(|id| (id.clone(), self.detail(id)))
                .collect(),
        }
    }

    /// Put the captured data back and mark it stale.
    ///
    /// Pages written since the snapshot stay, also marked stale. Other
    /// mutations may have settled in between, so nothing restored here is
    /// served without a refetch.
    pub fn restore(&self, snapshot: CacheSnapshot<T>) {
        for mut entry in self.lists.iter_mut() {
            entry.invalidated = true;
        }
        for (params, mut entry) in snapshot.lists {
            entry.invalidated = true;
            self.lists.insert(params, entry);
        }
        for (id, entry) in snapshot.details {
            match entry {
                Some(mut entry) => {
                    entry.invalidated = true;
                    self.details.insert(id, entry);
                }
                None => {
                    self.details.remove(&id);
                }
            }
        }
        self.bump_version();
    }

    // ── In-flight reads ──────────────────────────────────────────────

    /// Register a read for `key`. The guard fires if a mutation supersedes it.
    pub fn begin_read(&self, key: &QueryKey) -> ReadGuard<'_, T> {
        let mut entry = self.inflight.entry(key.clone()).or_insert_with(|| Inflight {
            token: CancellationToken::new(),
            readers: 0,
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
        });
        entry.readers += 1;
        ReadGuard {
            cache: self,
            key: key.clone(),
            generation: entry.generation,
            token: entry.token.child_token(),
        }
    }

    /// Keys with a read in flight.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Cancel every in-flight read whose key matches. Returns how many keys fired.
    pub fn cancel_reads(&self, mut matches: impl FnMut(&QueryKey) -> bool) -> usize {
        let keys: Vec<QueryKey> = self
            .inflight
            .iter()
            .filter(|e| matches(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for key in &keys {
            if let Some((_, read)) = self.inflight.remove(key) {
                trace!(key = %key, "cancelling in-flight read");
                read.token.cancel();
            }
        }
        keys.len()
    }

    // ── Change notification ──────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}
