// ── Pagination and debounced search ──
//
// `Pagination` is plain state: page, page size, search term and sort.
// `DebouncedSearch` wraps it in a background task that only commits a
// search term once typing has paused for the configured delay, so a burst
// of keystrokes produces one query-key change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use botdesk_api::{ListParams, SortOrder};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Page, size, search and sort for one list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
    search: String,
    sort_by: Option<String>,
    sort_order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(ListParams::default().page_size)
    }
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search: String::new(),
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Advance unless already on the last page.
    pub fn next_page(&mut self, total_pages: u64) -> bool {
        if u64::from(self.page) >= total_pages {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Changing the page size returns to page 1.
    pub fn set_page_size(&mut self, page_size: u32) {
        let page_size = page_size.max(1);
        if page_size != self.page_size {
            self.page_size = page_size;
            self.page = 1;
        }
    }

    /// Changing the search term returns to page 1. Returns whether it changed.
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if search == self.search {
            return false;
        }
        self.search = search;
        self.page = 1;
        true
    }

    pub fn set_sort(&mut self, sort_by: impl Into<String>, order: SortOrder) {
        self.sort_by = Some(sort_by.into());
        self.sort_order = order;
    }

    pub fn params(&self) -> ListParams {
        let mut params = ListParams::new(self.page, self.page_size).with_search(self.search.clone());
        if let Some(ref sort_by) = self.sort_by {
            params = params.with_sort(sort_by.clone(), self.sort_order);
        }
        params
    }
}

// ── DebouncedSearch ──────────────────────────────────────────────────

struct SearchState {
    pagination: Mutex<Pagination>,
    params: watch::Sender<ListParams>,
    revisions: AtomicU64,
}

impl SearchState {
    fn lock(&self) -> MutexGuard<'_, Pagination> {
        self.pagination.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` and publish the new query key if it changed.
    fn update(&self, f: impl FnOnce(&mut Pagination)) {
        let mut pagination = self.lock();
        f(&mut pagination);
        let next = pagination.params();
        let changed = self.params.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            self.revisions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Pagination whose search term is committed after a quiet period.
///
/// Page and size changes publish immediately. Stops when dropped or when
/// the parent cancellation token fires.
pub struct DebouncedSearch {
    state: Arc<SearchState>,
    raw: watch::Sender<String>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DebouncedSearch {
    pub fn spawn(pagination: Pagination, delay: Duration, parent: &CancellationToken) -> Self {
        let cancel = parent.child_token();
        let (params, _) = watch::channel(pagination.params());
        let (raw, raw_rx) = watch::channel(pagination.search().to_owned());
        let state = Arc::new(SearchState {
            pagination: Mutex::new(pagination),
            params,
            revisions: AtomicU64::new(0),
        });
        let handle = tokio::spawn(debounce_task(
            raw_rx,
            delay,
            Arc::clone(&state),
            cancel.clone(),
        ));
        Self {
            state,
            raw,
            cancel,
            handle,
        }
    }

    /// Record a keystroke. Committed after `delay` of silence.
    pub fn set_search(&self, term: impl Into<String>) {
        self.raw.send_replace(term.into());
    }

    /// The term as typed, committed or not.
    pub fn raw_search(&self) -> String {
        self.raw.borrow().clone()
    }

    pub fn set_page(&self, page: u32) {
        self.state.update(|p| p.set_page(page));
    }

    pub fn next_page(&self, total_pages: u64) {
        self.state.update(|p| {
            p.next_page(total_pages);
        });
    }

    pub fn prev_page(&self) {
        self.state.update(|p| {
            p.prev_page();
        });
    }

    pub fn set_page_size(&self, page_size: u32) {
        self.state.update(|p| p.set_page_size(page_size));
    }

    pub fn set_sort(&self, sort_by: &str, order: SortOrder) {
        self.state.update(|p| p.set_sort(sort_by, order));
    }

    /// Current query key.
    pub fn params(&self) -> ListParams {
        self.state.params.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListParams> {
        self.state.params.subscribe()
    }

    /// How many times the query key has changed.
    pub fn revision(&self) -> u64 {
        self.state.revisions.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn debounce_task(
    mut raw: watch::Receiver<String>,
    delay: Duration,
    state: Arc<SearchState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            changed = raw.changed() => if changed.is_err() { return },
        }

        // Every further change restarts the quiet period.
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                changed = raw.changed() => if changed.is_err() { return },
                () = tokio::time::sleep(delay) => break,
            }
        }

        let term = raw.borrow_and_update().clone();
        trace!(term = %term, "search settled");
        state.update(|p| {
            p.set_search(term);
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn search_and_size_changes_reset_page() {
        let mut p = Pagination::new(10);
        p.set_page(4);
        assert!(p.set_search("sup"));
        assert_eq!(p.page(), 1);

        p.set_page(3);
        assert!(!p.set_search("sup"));
        assert_eq!(p.page(), 3);

        p.set_page_size(25);
        assert_eq!(p.page(), 1);
        assert_eq!(p.params(), ListParams::new(1, 25).with_search("sup"));
    }

    #[test]
    fn page_navigation_stays_in_bounds() {
        let mut p = Pagination::new(10);
        assert!(!p.prev_page());
        assert!(p.next_page(2));
        assert!(!p.next_page(2));
        assert_eq!(p.page(), 2);
        assert!(p.prev_page());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_commits_once_with_last_value() {
        let search = DebouncedSearch::spawn(
            Pagination::new(10),
            Duration::from_millis(300),
            &CancellationToken::new(),
        );
        search.set_page(3);
        assert_eq!(search.revision(), 1);

        for term in ["s", "su", "sup", "supp"] {
            search.set_search(term);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(search.params().search, None);
        assert_eq!(search.revision(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let params = search.params();
        assert_eq!(params.search.as_deref(), Some("supp"));
        assert_eq!(params.page, 1);
        assert_eq!(search.revision(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn page_changes_publish_immediately() {
        let search = DebouncedSearch::spawn(
            Pagination::new(10),
            Duration::from_millis(300),
            &CancellationToken::new(),
        );
        let mut rx = search.subscribe();
        search.next_page(5);
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().page, 2);

        search.set_page_size(10);
        assert_eq!(search.revision(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let search = DebouncedSearch::spawn(
            Pagination::default(),
            Duration::from_millis(300),
            &CancellationToken::new(),
        );
        search.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(search.is_finished());
    }
}
