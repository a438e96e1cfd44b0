// ── Entity CRUD hook ──
//
// Cached reads and optimistic mutations for one resource kind. Reads are
// served from the cache while fresh and retried on network-class failures.
// Mutations validate, cancel overlapping reads, snapshot, apply their effect
// locally, then call the service: success invalidates lists, failure puts
// the snapshot back. Both outcomes raise a notification.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use botdesk_api::{EntityId, ListParams, Page, SortOrder};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheSnapshot, QueryCache, QueryKey};
use crate::error::{CoreError, ErrorNotice};
use crate::notifications::NotificationCenter;
use crate::resource::{Resource, ResourceService};
use crate::retry::RetryPolicy;

// ── ListObserver ─────────────────────────────────────────────────────

/// What a list view renders.
#[derive(Debug, Clone)]
pub struct ListState<R> {
    pub params: ListParams,
    pub page: Option<Page<R>>,
    /// `page` belongs to the previous params and is shown until the new page lands.
    pub is_placeholder: bool,
    pub is_fetching: bool,
    pub error: Option<ErrorNotice>,
}

impl<R> Default for ListState<R> {
    fn default() -> Self {
        Self {
            params: ListParams::default(),
            page: None,
            is_placeholder: false,
            is_fetching: false,
            error: None,
        }
    }
}

/// Observable list state driven by [`EntityQueries::observe_list`].
pub struct ListObserver<R> {
    state: watch::Sender<ListState<R>>,
}

impl<R: Clone> Default for ListObserver<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> ListObserver<R> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self { state }
    }

    pub fn current(&self) -> ListState<R> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<R>> {
        self.state.subscribe()
    }
}

/// Search and sort: what pages sharing a total have in common.
type ListFilter = (Option<String>, Option<String>, SortOrder);

fn list_filter(params: &ListParams) -> ListFilter {
    (
        params.search.clone(),
        params.sort_by.clone(),
        params.sort_order,
    )
}

// ── EntityQueries ────────────────────────────────────────────────────

/// Cached CRUD access to one resource kind.
///
/// Cheaply cloneable; clones share the cache.
pub struct EntityQueries<R: Resource, S: ResourceService<R>> {
    inner: Arc<QueriesInner<R, S>>,
}

struct QueriesInner<R: Resource, S> {
    service: Arc<S>,
    cache: QueryCache<R>,
    notifications: NotificationCenter,
    retry: RetryPolicy,
    stale_time: Duration,
}

impl<R: Resource, S: ResourceService<R>> Clone for EntityQueries<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Resource, S: ResourceService<R>> EntityQueries<R, S> {
    pub fn new(
        service: Arc<S>,
        notifications: NotificationCenter,
        retry: RetryPolicy,
        stale_time: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueriesInner {
                service,
                cache: QueryCache::new(R::KIND),
                notifications,
                retry,
                stale_time,
            }),
        }
    }

    pub fn cache(&self) -> &QueryCache<R> {
        &self.inner.cache
    }

    pub fn service(&self) -> &Arc<S> {
        &self.inner.service
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Cached page if fresh, otherwise fetched.
    pub async fn list(&self, params: &ListParams) -> Result<Page<R>, CoreError> {
        let cached = self
            .inner
            .cache
            .list(params)
            .filter(|e| e.is_fresh(self.inner.stale_time));
        if let Some(entry) = cached {
            return Ok(entry.data);
        }
        self.fetch_list(params).await
    }

    /// Always hit the service and store the result.
    pub async fn fetch_list(&self, params: &ListParams) -> Result<Page<R>, CoreError> {
        let key = QueryKey::list(R::KIND, params.clone());
        let read = self.inner.cache.begin_read(&key);
        debug!(key = %key, "fetching");

        let page = tokio::select! {
            biased;
            () = read.cancelled() => return Err(CoreError::Cancelled),
            result = self.inner.retry.run(|| self.inner.service.list(params)) => result?,
        };
        if read.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.inner.cache.put_list(params.clone(), page.clone());
        Ok(page)
    }

    /// Cached record if fresh, otherwise fetched.
    pub async fn get(&self, id: &EntityId) -> Result<R, CoreError> {
        let cached = self
            .inner
            .cache
            .detail(id)
            .filter(|e| e.is_fresh(self.inner.stale_time));
        if let Some(entry) = cached {
            return Ok(entry.data);
        }

        let key = QueryKey::detail(R::KIND, id.clone());
        let read = self.inner.cache.begin_read(&key);
        debug!(key = %key, "fetching");

        let item = tokio::select! {
            biased;
            () = read.cancelled() => return Err(CoreError::Cancelled),
            result = self.inner.retry.run(|| self.inner.service.get(id)) => result?,
        };
        if read.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.inner.cache.put_detail(id.clone(), item.clone());
        Ok(item)
    }

    /// Load `params` into `observer`, keeping the previous page visible
    /// as a placeholder until the new one arrives.
    pub async fn observe_list(
        &self,
        observer: &ListObserver<R>,
        params: ListParams,
    ) -> Result<Page<R>, CoreError> {
        let cached = self.inner.cache.list(&params);
        let fresh = cached
            .as_ref()
            .filter(|e| e.is_fresh(self.inner.stale_time))
            .map(|e| e.data.clone());

        observer.state.send_modify(|state| {
            state.params = params.clone();
            state.error = None;
            state.is_fetching = fresh.is_none();
            match cached {
                Some(entry) => {
                    state.page = Some(entry.data);
                    state.is_placeholder = false;
                }
                None => state.is_placeholder = state.page.is_some(),
            }
        });
        if let Some(page) = fresh {
            return Ok(page);
        }

        let result = self.fetch_list(&params).await;
        observer.state.send_if_modified(|state| {
            // A newer observe_list call owns the state now.
            if state.params != params {
                return false;
            }
            state.is_fetching = false;
            match &result {
                Ok(page) => {
                    state.page = Some(page.clone());
                    state.is_placeholder = false;
                }
                Err(CoreError::Cancelled) => {}
                Err(err) => state.error = Some(err.notice()),
            }
            true
        });
        result
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn create(&self, input: &R::Create) -> Result<R, CoreError> {
        R::validate_create(input)?;
        let cache = &self.inner.cache;

        cache.cancel_reads(QueryKey::is_list);
        let snapshot = cache.snapshot(&[]);
        let draft = R::draft(input, EntityId::temporary(), Utc::now());
        debug!(id = %draft.id(), "inserting optimistic draft");
        cache.update_lists(|_, page| {
            page.data.insert(0, draft.clone());
            page.total += 1;
            true
        });

        match self.inner.service.create(input).await {
            Ok(created) => {
                info!(kind = R::KIND, id = %created.id(), "created");
                cache.put_detail(created.id().clone(), created.clone());
                cache.invalidate_lists();
                self.inner
                    .notifications
                    .success(format!("{} created", R::LABEL), created.title());
                Ok(created)
            }
            Err(err) => {
                self.rollback(snapshot, "create", &err);
                Err(err)
            }
        }
    }

    pub async fn update(&self, id: &EntityId, input: &R::Update) -> Result<R, CoreError> {
        R::validate_update(input)?;
        let cache = &self.inner.cache;

        cache.cancel_reads(|key| key.is_list() || key.is_detail_of(id));
        let snapshot = cache.snapshot(std::slice::from_ref(id));
        let now = Utc::now();
        cache.update_detail(id, |item| *item = item.patched(input, now));
        cache.update_lists(|_, page| {
            let mut hit = false;
            for item in page.data.iter_mut().filter(|item| item.id() == id) {
                *item = item.patched(input, now);
                hit = true;
            }
            hit
        });

        match self.inner.service.update(id, input).await {
            Ok(updated) => {
                info!(kind = R::KIND, %id, "updated");
                cache.put_detail(id.clone(), updated.clone());
                cache.invalidate_lists();
                self.inner
                    .notifications
                    .success(format!("{} updated", R::LABEL), updated.title());
                Ok(updated)
            }
            Err(err) => {
                self.rollback(snapshot, "update", &err);
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        let ids = std::slice::from_ref(id);
        let name = self.cached_title(id).unwrap_or_else(|| id.to_string());
        let snapshot = self.remove_optimistically(ids);

        match self.inner.service.delete(id).await {
            Ok(()) => {
                info!(kind = R::KIND, %id, "deleted");
                self.finish_removal(ids);
                self.inner
                    .notifications
                    .success(format!("{} deleted", R::LABEL), name);
                Ok(())
            }
            Err(err) => {
                self.rollback(snapshot, "delete", &err);
                Err(err)
            }
        }
    }

    /// Returns the backend's count of removed records.
    pub async fn bulk_delete(&self, ids: &[EntityId]) -> Result<u64, CoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let snapshot = self.remove_optimistically(ids);

        match self.inner.service.bulk_delete(ids).await {
            Ok(deleted) => {
                info!(kind = R::KIND, requested = ids.len(), deleted, "bulk deleted");
                self.finish_removal(ids);
                self.inner.notifications.success(
                    format!("{}s deleted", R::LABEL),
                    format!("{deleted} removed"),
                );
                Ok(deleted)
            }
            Err(err) => {
                self.rollback(snapshot, "delete", &err);
                Err(err)
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn remove_optimistically(&self, ids: &[EntityId]) -> CacheSnapshot<R> {
        let cache = &self.inner.cache;
        cache.cancel_reads(|key| key.is_list() || ids.iter().any(|id| key.is_detail_of(id)));
        let snapshot = cache.snapshot(ids);

        // Pages of one filter share a total, so every page of a filter
        // that held an id is decremented, not just the page holding it.
        let mut removed: HashMap<ListFilter, HashSet<EntityId>> = HashMap::new();
        cache.update_lists(|params, page| {
            let before = page.data.len();
            page.data.retain(|item| {
                let hit = ids.contains(item.id());
                if hit {
                    removed
                        .entry(list_filter(params))
                        .or_default()
                        .insert(item.id().clone());
                }
                !hit
            });
            page.data.len() != before
        });
        cache.update_lists(|params, page| {
            let Some(gone) = removed.get(&list_filter(params)) else {
                return false;
            };
            page.total = page
                .total
                .saturating_sub(u64::try_from(gone.len()).unwrap_or(u64::MAX));
            true
        });
        snapshot
    }

    fn finish_removal(&self, ids: &[EntityId]) {
        for id in ids {
            self.inner.cache.remove_detail(id);
        }
        self.inner.cache.invalidate_lists();
    }

    fn cached_title(&self, id: &EntityId) -> Option<String> {
        if let Some(entry) = self.inner.cache.detail(id) {
            return Some(entry.data.title().to_owned());
        }
        self.inner.cache.lists().into_iter().find_map(|(_, entry)| {
            entry
                .data
                .data
                .iter()
                .find(|item| item.id() == id)
                .map(|item| item.title().to_owned())
        })
    }

    fn rollback(&self, snapshot: CacheSnapshot<R>, action: &str, err: &CoreError) {
        warn!(kind = R::KIND, action, error = %err, "mutation failed, restoring cache");
        self.inner.cache.restore(snapshot);
        if !err.requires_login() {
            self.inner.notifications.error(
                format!("Failed to {action} {}", R::LABEL.to_lowercase()),
                err,
            );
        }
    }
}
