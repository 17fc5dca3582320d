//! Pagination controller
//!
//! [`Paginator`] drives one paged collection in either of two modes:
//!
//! - discrete pages: [`Paginator::go_to_page`] replaces the rows
//! - infinite scroll: [`Paginator::load_more`] appends the next page
//!
//! # State machine
//!
//! ```text
//! Idle --fetch--> Loading --ok--> Loaded
//!                    |
//!                    +--err--> Errored (rows kept, next fetch allowed)
//! ```
//!
//! Every fetch carries its own [`CancellationToken`]. Starting a fetch cancels
//! the previous one, and a result is only applied while its token is still
//! the current one, so the latest request always wins.

use crate::executor::{QueryExecutor, QueryOptions};
use crate::filter::FilterDescriptor;
use crate::types::Row;
use parking_lot::Mutex;
use std::sync::Arc;
use taskora_config::PaginationConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Page size used when zero is requested
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Settled or in-flight state of the paginator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    /// Last fetch failed; accumulated rows are kept
    Errored(String),
}

/// What happened to one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Result applied to the paginator state
    Applied,
    /// A newer fetch started first; the result was discarded
    Superseded,
    /// Nothing to do (same page, no more rows, or a fetch already in flight)
    Skipped,
    Failed(String),
}

/// Point-in-time copy of the paginator state
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub page: usize,
    pub page_size: usize,
    pub rows: Vec<Row>,
    /// Known only after a fetch with `want_count`
    pub total: Option<u64>,
    pub has_more: bool,
    pub state: LoadState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Replace,
    Append,
}

struct PagerState {
    table: String,
    base: QueryOptions,
    page_size: usize,
    /// Requested page
    page: usize,
    /// Last page whose rows were applied since the last reset
    loaded: Option<usize>,
    rows: Vec<Row>,
    total: Option<u64>,
    has_more: bool,
    settled: LoadState,
    in_flight: Option<CancellationToken>,
    generation: u64,
}

impl PagerState {
    fn reset(&mut self) {
        self.page = 1;
        self.loaded = None;
        self.rows.clear();
        self.total = None;
        self.has_more = true;
    }

    fn abandon(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.generation += 1;
    }

    /// Cancel the in-flight fetch and register a new one
    fn begin(&mut self) -> (CancellationToken, u64) {
        self.abandon();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        (token, self.generation)
    }

    fn options_for(&self, page: usize) -> QueryOptions {
        QueryOptions {
            limit: Some(self.page_size),
            offset: (page - 1) * self.page_size,
            ..self.base.clone()
        }
    }
}

/// Paged view over one table
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct Paginator {
    executor: Arc<QueryExecutor>,
    state: Arc<Mutex<PagerState>>,
}

impl Paginator {
    /// `base` supplies columns, filters, ordering and cache policy; its limit
    /// and offset are managed by the paginator
    pub fn new(
        executor: Arc<QueryExecutor>,
        table: impl Into<String>,
        base: QueryOptions,
        page_size: usize,
    ) -> Self {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };

        Self {
            executor,
            state: Arc::new(Mutex::new(PagerState {
                table: table.into(),
                base,
                page_size,
                page: 1,
                loaded: None,
                rows: Vec::new(),
                total: None,
                has_more: true,
                settled: LoadState::Idle,
                in_flight: None,
                generation: 0,
            })),
        }
    }

    pub fn from_config(
        executor: Arc<QueryExecutor>,
        table: impl Into<String>,
        base: QueryOptions,
        config: &PaginationConfig,
    ) -> Self {
        Self::new(executor, table, base, config.default_page_size)
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let state = self.state.lock();
        PageSnapshot {
            page: state.page,
            page_size: state.page_size,
            rows: state.rows.clone(),
            total: state.total,
            has_more: state.has_more,
            state: if state.in_flight.is_some() {
                LoadState::Loading
            } else {
                state.settled.clone()
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Fetch the current page, replacing rows
    pub async fn load(&self) -> PageOutcome {
        let page = self.state.lock().page;
        self.run(page, Mode::Replace).await
    }

    /// Jump to page `n` (1-based), replacing rows
    ///
    /// Skipped when `n` is zero or already the current page, unless the last
    /// fetch failed. A fetch still in flight is cancelled in favour of this one.
    pub async fn go_to_page(&self, n: usize) -> PageOutcome {
        {
            let mut state = self.state.lock();
            let errored = matches!(state.settled, LoadState::Errored(_));
            if n < 1 || (n == state.page && !errored) {
                return PageOutcome::Skipped;
            }
            state.page = n;
        }
        self.run(n, Mode::Replace).await
    }

    /// Append the next page
    ///
    /// Skipped when there are no more rows or a fetch is in flight. The next
    /// page follows the last one applied, so a failed fetch is retried rather
    /// than skipped over.
    pub async fn load_more(&self) -> PageOutcome {
        let next = {
            let state = self.state.lock();
            if !state.has_more || state.in_flight.is_some() {
                return PageOutcome::Skipped;
            }
            state.loaded.map_or(1, |page| page + 1)
        };
        self.run(next, Mode::Append).await
    }

    /// Back to page 1, discarding rows
    pub async fn refresh(&self) -> PageOutcome {
        self.state.lock().reset();
        self.run(1, Mode::Replace).await
    }

    /// Replace the filters and restart from page 1
    pub async fn set_filters(&self, filters: FilterDescriptor) -> PageOutcome {
        {
            let mut state = self.state.lock();
            state.base.filters = filters;
            state.reset();
        }
        self.run(1, Mode::Replace).await
    }

    /// Point at another table and restart from page 1
    pub async fn set_table(&self, table: impl Into<String>) -> PageOutcome {
        {
            let mut state = self.state.lock();
            state.table = table.into();
            state.reset();
        }
        self.run(1, Mode::Replace).await
    }

    /// Abandon the in-flight fetch, if any
    pub fn cancel(&self) {
        self.state.lock().abandon();
    }

    async fn run(&self, page: usize, mode: Mode) -> PageOutcome {
        let (table, options, token, generation) = {
            let mut state = self.state.lock();
            let (token, generation) = state.begin();
            (state.table.clone(), state.options_for(page), token, generation)
        };
        let offset = options.offset;

        let result = self
            .executor
            .fetch_cancellable(&table, options, &token)
            .await;

        let mut state = self.state.lock();
        if state.generation != generation || token.is_cancelled() {
            debug!(table, page, "Discarding superseded page");
            return PageOutcome::Superseded;
        }
        state.in_flight = None;

        if let Some(error) = result.error {
            let message = error.to_string();
            state.settled = LoadState::Errored(message.clone());
            return PageOutcome::Failed(message);
        }

        let fetched = result.payload.rows.len();
        match mode {
            Mode::Replace => state.rows = result.payload.rows.clone(),
            Mode::Append => state.rows.extend(result.payload.rows.iter().cloned()),
        }
        state.page = page;
        state.loaded = Some(page);
        state.has_more = match result.payload.count {
            Some(total) => ((offset + fetched) as u64) < total,
            None => fetched == state.page_size,
        };
        if result.payload.count.is_some() {
            state.total = result.payload.count;
        }
        state.settled = LoadState::Loaded;
        PageOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::test_support::MemoryBackend;

    fn paginator(page_size: usize) -> Paginator {
        let executor = QueryExecutor::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(QueryCache::default()),
        );
        Paginator::new(Arc::new(executor), "briefs", QueryOptions::default(), page_size)
    }

    #[test]
    fn test_zero_page_size_falls_back() {
        assert_eq!(paginator(0).snapshot().page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_page_window() {
        let pager = paginator(10);
        let state = pager.state.lock();
        let options = state.options_for(3);
        assert_eq!(options.offset, 20);
        assert_eq!(options.limit, Some(10));
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = paginator(10).snapshot();
        assert_eq!(snapshot.page, 1);
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.has_more);
        assert_eq!(snapshot.total, None);
        assert_eq!(snapshot.state, LoadState::Idle);
    }

    #[tokio::test]
    async fn test_go_to_page_guards() {
        let pager = paginator(10);
        assert_eq!(pager.go_to_page(0).await, PageOutcome::Skipped);
        assert_eq!(pager.go_to_page(1).await, PageOutcome::Skipped);
        assert_eq!(pager.go_to_page(2).await, PageOutcome::Applied);
        assert_eq!(pager.snapshot().page, 2);
    }

    #[tokio::test]
    async fn test_loaded_page_tracks_applied_fetches() {
        let pager = paginator(10);
        assert_eq!(pager.go_to_page(3).await, PageOutcome::Applied);
        assert_eq!(pager.state.lock().loaded, Some(3));

        pager.state.lock().reset();
        assert_eq!(pager.state.lock().loaded, None);
    }
}
