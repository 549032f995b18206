//! Paging and scrolling state machine shared by every list view.
//!
//! A controller owns one list's state and drives it through
//! `Idle → Loading → Ready`, then either `LoadMore` (infinite mode) or
//! `ChangePage` (paginated mode). A query or mode change re-enters the
//! initial load from any state.
//!
//! The state lock is never held across a fetch. Each fetch is tagged with
//! the generation current when it started, and a response whose generation
//! has since moved on is dropped, so the most recently requested data wins
//! regardless of the order responses arrive in.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::merge::merge_unique;
use super::mode::ViewMode;
use super::source::PageSource;
use crate::catalog::Item;

pub const DEFAULT_NEAR_BOTTOM_PX: f64 = 300.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ListError {
    #[error("page {page} is outside 1..={total_pages}")]
    PageOutOfRange { page: u32, total_pages: u32 },
    #[error("operation requires {expected} mode")]
    WrongMode { expected: ViewMode },
}

/// What a transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New data was applied. `scroll_to_top` asks the client to jump back up.
    Applied { scroll_to_top: bool },
    /// A guard held (same mode, already loading, no more pages ...).
    Skipped,
    /// A newer transition started while this one was fetching.
    Superseded,
}

/// Where the client's viewport is, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub inner_height: f64,
    pub scroll_y: f64,
    pub document_height: f64,
}

impl Viewport {
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.inner_height + self.scroll_y >= self.document_height - threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub mode: ViewMode,
    pub items: Vec<Item>,
    pub current_page: u32,
    pub total_pages: u32,
    pub is_loading: bool,
    pub is_loading_more: bool,
    generation: u64,
}

impl ListState {
    fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            is_loading: false,
            is_loading_more: false,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new fetch: every older in-flight fetch becomes stale.
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn reset(&mut self) -> u64 {
        self.items.clear();
        self.current_page = 1;
        self.total_pages = 1;
        self.is_loading = true;
        self.is_loading_more = false;
        self.next_generation()
    }
}

/// What clients render: the state plus paginator bounds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub mode: ViewMode,
    pub items: Vec<Item>,
    pub current_page: u32,
    pub total_pages: u32,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

impl From<&ListState> for Snapshot {
    fn from(state: &ListState) -> Self {
        Self {
            mode: state.mode,
            items: state.items.clone(),
            current_page: state.current_page,
            total_pages: state.total_pages,
            is_loading: state.is_loading,
            is_loading_more: state.is_loading_more,
            can_go_prev: state.current_page > 1,
            can_go_next: state.current_page < state.total_pages,
        }
    }
}

struct Shared {
    state: ListState,
    source: Arc<dyn PageSource>,
}

pub struct ListController {
    shared: RwLock<Shared>,
    page_size: usize,
    near_bottom_px: f64,
}

impl ListController {
    pub fn new(source: Arc<dyn PageSource>, mode: ViewMode, page_size: usize) -> Self {
        Self {
            shared: RwLock::new(Shared {
                state: ListState::new(mode),
                source,
            }),
            page_size: page_size.max(1),
            near_bottom_px: DEFAULT_NEAR_BOTTOM_PX,
        }
    }

    pub fn with_near_bottom_px(mut self, px: f64) -> Self {
        self.near_bottom_px = px;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn state(&self) -> ListState {
        self.shared.read().await.state.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::from(&self.shared.read().await.state)
    }

    /// Fetch page 1 of the current source in the current mode.
    pub async fn load_initial(&self) -> Outcome {
        let (generation, source) = {
            let mut shared = self.shared.write().await;
            let generation = shared.state.reset();
            (generation, shared.source.clone())
        };
        self.load_first_page(generation, source).await
    }

    /// Swap the source (a new query or endpoint) and start over.
    pub async fn replace_source(&self, source: Arc<dyn PageSource>) -> Outcome {
        let generation = {
            let mut shared = self.shared.write().await;
            debug!(from = %shared.source.describe(), to = %source.describe(), "replacing list source");
            shared.source = source.clone();
            shared.state.reset()
        };
        self.load_first_page(generation, source).await
    }

    /// Switch between infinite and paginated presentation.
    pub async fn set_mode(&self, mode: ViewMode) -> Outcome {
        let (generation, source) = {
            let mut shared = self.shared.write().await;
            if shared.state.mode == mode {
                return Outcome::Skipped;
            }
            shared.state.mode = mode;
            let generation = shared.state.reset();
            (generation, shared.source.clone())
        };
        self.load_first_page(generation, source).await
    }

    async fn load_first_page(&self, generation: u64, source: Arc<dyn PageSource>) -> Outcome {
        let page = source.fetch_page(1).await;

        let mut shared = self.shared.write().await;
        let state = &mut shared.state;
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding stale first page");
            return Outcome::Superseded;
        }

        state.items = match state.mode {
            ViewMode::Infinite => page.items,
            ViewMode::Paginated => self.slice(page.items),
        };
        state.total_pages = page.total_pages.max(1);
        state.current_page = 1;
        state.is_loading = false;

        Outcome::Applied { scroll_to_top: false }
    }

    /// Append the next page (infinite mode only).
    pub async fn load_more(&self) -> Outcome {
        let (generation, source, next) = {
            let mut guard = self.shared.write().await;
            let shared = &mut *guard;
            let state = &mut shared.state;
            if state.mode != ViewMode::Infinite
                || state.is_loading
                || state.is_loading_more
                || state.current_page >= state.total_pages
            {
                return Outcome::Skipped;
            }
            state.is_loading_more = true;
            let next = state.current_page + 1;
            (state.next_generation(), shared.source.clone(), next)
        };

        let page = source.fetch_page(next).await;

        let mut shared = self.shared.write().await;
        let state = &mut shared.state;
        if state.generation != generation {
            debug!(generation, current = state.generation, page = next, "discarding stale page");
            return Outcome::Superseded;
        }

        let existing = std::mem::take(&mut state.items);
        state.items = merge_unique(existing, page.items);
        state.current_page = next;
        state.is_loading_more = false;

        Outcome::Applied { scroll_to_top: false }
    }

    /// Show page `page` on its own (paginated mode only).
    pub async fn change_page(&self, page: u32) -> Result<Outcome, ListError> {
        let (generation, source) = {
            let mut guard = self.shared.write().await;
            let shared = &mut *guard;
            let state = &mut shared.state;
            if state.mode != ViewMode::Paginated {
                return Err(ListError::WrongMode {
                    expected: ViewMode::Paginated,
                });
            }
            // Page bounds are unknown until the first page of a new query lands.
            if state.is_loading {
                return Ok(Outcome::Skipped);
            }
            if page < 1 || page > state.total_pages {
                return Err(ListError::PageOutOfRange {
                    page,
                    total_pages: state.total_pages,
                });
            }
            state.is_loading_more = true;
            (state.next_generation(), shared.source.clone())
        };

        let fetched = source.fetch_page(page).await;

        let mut shared = self.shared.write().await;
        let state = &mut shared.state;
        if state.generation != generation {
            debug!(generation, current = state.generation, page, "discarding stale page");
            return Ok(Outcome::Superseded);
        }

        state.items = self.slice(fetched.items);
        state.current_page = page;
        state.is_loading_more = false;

        Ok(Outcome::Applied { scroll_to_top: true })
    }

    /// React to a scroll event: near the bottom in infinite mode loads more.
    pub async fn on_scroll(&self, viewport: Viewport) -> Outcome {
        {
            let shared = self.shared.read().await;
            if shared.state.mode != ViewMode::Infinite || !viewport.near_bottom(self.near_bottom_px) {
                return Outcome::Skipped;
            }
        }
        self.load_more().await
    }

    fn slice(&self, mut items: Vec<Item>) -> Vec<Item> {
        items.truncate(self.page_size);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListPage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned pages, optionally slowly, and records what was asked for.
    struct MockSource {
        pages: HashMap<u32, ListPage>,
        delay: Option<Duration>,
        page_delays: HashMap<u32, Duration>,
        calls: Mutex<Vec<u32>>,
        fetches: AtomicUsize,
    }

    impl MockSource {
        fn new(pages: Vec<(u32, Vec<i64>, u32)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(n, ids, total)| {
                    let items = ids.into_iter().map(|id| Item::new(id, format!("movie {}", id))).collect();
                    (n, ListPage::new(items, total))
                })
                .collect();
            Self {
                pages,
                delay: None,
                page_delays: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn with_page_delay(mut self, page: u32, delay: Duration) -> Self {
            self.page_delays.insert(page, delay);
            self
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for MockSource {
        async fn fetch_page(&self, page: u32) -> ListPage {
            self.calls.lock().unwrap().push(page);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.page_delays.get(&page).copied().or(self.delay) {
                tokio::time::sleep(delay).await;
            }
            // Unknown pages behave like a failed fetch.
            self.pages.get(&page).cloned().unwrap_or_else(ListPage::empty)
        }

        fn describe(&self) -> String {
            "mock".to_string()
        }
    }

    fn ids(state: &ListState) -> Vec<i64> {
        state.items.iter().map(|i| i.id).collect()
    }

    fn twelve_per_page() -> MockSource {
        MockSource::new(vec![
            (1, (1..=12).collect(), 3),
            (2, (13..=24).collect(), 3),
            (3, (25..=36).collect(), 3),
        ])
    }

    #[tokio::test]
    async fn test_initial_load() {
        let source = Arc::new(MockSource::new(vec![(1, vec![1, 2], 3)]));
        let controller = ListController::new(source, ViewMode::Infinite, 6);

        assert_eq!(controller.load_initial().await, Outcome::Applied { scroll_to_top: false });
        let state = controller.state().await;
        assert_eq!(ids(&state), vec![1, 2]);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 3);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_load_more_dedupes_by_id() {
        let source = Arc::new(MockSource::new(vec![(1, vec![1, 2], 3), (2, vec![2, 3], 3)]));
        let controller = ListController::new(source.clone(), ViewMode::Infinite, 6);
        controller.load_initial().await;

        assert_eq!(controller.load_more().await, Outcome::Applied { scroll_to_top: false });
        let state = controller.state().await;
        assert_eq!(ids(&state), vec![1, 2, 3]);
        assert_eq!(state.current_page, 2);
        assert_eq!(source.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_overlapping_pages_never_duplicate() {
        let source = Arc::new(MockSource::new(vec![
            (1, vec![1, 2, 3], 4),
            (2, vec![3, 4, 5], 4),
            (3, vec![1, 5, 6], 4),
            (4, vec![6, 6, 7], 4),
        ]));
        let controller = ListController::new(source, ViewMode::Infinite, 6);
        controller.load_initial().await;
        while controller.load_more().await != Outcome::Skipped {}

        let state = controller.state().await;
        assert_eq!(ids(&state), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(state.current_page, 4);
    }

    #[tokio::test]
    async fn test_load_more_noop_on_last_page() {
        let source = Arc::new(MockSource::new(vec![(1, vec![1, 2], 1)]));
        let controller = ListController::new(source.clone(), ViewMode::Infinite, 6);
        controller.load_initial().await;

        assert_eq!(controller.load_more().await, Outcome::Skipped);
        let state = controller.state().await;
        assert_eq!(state.items.len(), 2);
        assert_eq!(source.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_load_more_noop_in_paginated_mode() {
        let controller = ListController::new(Arc::new(twelve_per_page()), ViewMode::Paginated, 6);
        controller.load_initial().await;
        assert_eq!(controller.load_more().await, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_concurrent_load_more_fetches_once() {
        let source = Arc::new(twelve_per_page().with_delay(Duration::from_millis(50)));
        let controller = Arc::new(ListController::new(source.clone(), ViewMode::Infinite, 6));
        controller.load_initial().await;

        let (a, b) = tokio::join!(controller.load_more(), controller.load_more());
        let outcomes = [a, b];
        assert!(outcomes.contains(&Outcome::Skipped));
        assert!(outcomes.contains(&Outcome::Applied { scroll_to_top: false }));
        assert_eq!(source.calls(), vec![1, 2]);
        assert_eq!(controller.state().await.items.len(), 24);
    }

    #[tokio::test]
    async fn test_change_page_yields_bounded_slice() {
        let source = Arc::new(twelve_per_page());
        let controller = ListController::new(source, ViewMode::Paginated, 6);
        controller.load_initial().await;
        assert_eq!(ids(&controller.state().await), (1..=6).collect::<Vec<_>>());

        for page in 1..=3u32 {
            let outcome = controller.change_page(page).await.unwrap();
            assert_eq!(outcome, Outcome::Applied { scroll_to_top: true });
            let state = controller.state().await;
            let first = (page as i64 - 1) * 12 + 1;
            assert_eq!(ids(&state), (first..first + 6).collect::<Vec<_>>());
            assert_eq!(state.current_page, page);
        }
    }

    #[tokio::test]
    async fn test_change_page_out_of_range() {
        let controller = ListController::new(Arc::new(twelve_per_page()), ViewMode::Paginated, 6);
        controller.load_initial().await;

        assert_eq!(
            controller.change_page(0).await,
            Err(ListError::PageOutOfRange { page: 0, total_pages: 3 })
        );
        assert_eq!(
            controller.change_page(4).await,
            Err(ListError::PageOutOfRange { page: 4, total_pages: 3 })
        );
        assert_eq!(controller.state().await.current_page, 1);
    }

    #[tokio::test]
    async fn test_change_page_requires_paginated_mode() {
        let controller = ListController::new(Arc::new(twelve_per_page()), ViewMode::Infinite, 6);
        controller.load_initial().await;
        assert_eq!(
            controller.change_page(2).await,
            Err(ListError::WrongMode { expected: ViewMode::Paginated })
        );
    }

    #[tokio::test]
    async fn test_switch_to_paginated_truncates_fresh_page_one() {
        let source = Arc::new(twelve_per_page());
        let controller = ListController::new(source.clone(), ViewMode::Infinite, 6);
        controller.load_initial().await;
        controller.load_more().await;
        assert_eq!(controller.state().await.items.len(), 24);

        controller.set_mode(ViewMode::Paginated).await;
        let state = controller.state().await;
        assert_eq!(ids(&state), (1..=6).collect::<Vec<_>>());
        assert_eq!(state.current_page, 1);
        assert_eq!(source.calls(), vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_switch_to_infinite_is_unsliced() {
        let controller = ListController::new(Arc::new(twelve_per_page()), ViewMode::Paginated, 6);
        controller.load_initial().await;
        controller.change_page(3).await.unwrap();

        controller.set_mode(ViewMode::Infinite).await;
        let state = controller.state().await;
        assert_eq!(state.items.len(), 12);
        assert_eq!(state.current_page, 1);
    }

    #[tokio::test]
    async fn test_same_mode_is_noop() {
        let source = Arc::new(twelve_per_page());
        let controller = ListController::new(source.clone(), ViewMode::Paginated, 6);
        controller.load_initial().await;

        assert_eq!(controller.set_mode(ViewMode::Paginated).await, Outcome::Skipped);
        assert_eq!(source.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_empty() {
        let controller = ListController::new(Arc::new(MockSource::new(vec![])), ViewMode::Infinite, 6);

        assert_eq!(controller.load_initial().await, Outcome::Applied { scroll_to_top: false });
        let state = controller.state().await;
        assert!(state.items.is_empty());
        assert_eq!(state.total_pages, 1);
        assert_eq!(controller.load_more().await, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_latest_query_wins() {
        let slow = Arc::new(MockSource::new(vec![(1, vec![100], 5)]).with_delay(Duration::from_millis(200)));
        let fast = Arc::new(MockSource::new(vec![(1, vec![1, 2], 2)]));
        let controller = Arc::new(ListController::new(slow, ViewMode::Infinite, 6));

        let stale = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.load_initial().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            controller.replace_source(fast).await,
            Outcome::Applied { scroll_to_top: false }
        );
        assert_eq!(stale.await.unwrap(), Outcome::Superseded);

        let state = controller.state().await;
        assert_eq!(ids(&state), vec![1, 2]);
        assert_eq!(state.total_pages, 2);
    }

    #[tokio::test]
    async fn test_mode_switch_supersedes_in_flight_load_more() {
        let source = Arc::new(twelve_per_page().with_delay(Duration::from_millis(100)));
        let controller = Arc::new(ListController::new(source, ViewMode::Infinite, 6));
        controller.load_initial().await;

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.load_more().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.set_mode(ViewMode::Paginated).await;

        assert_eq!(pending.await.unwrap(), Outcome::Superseded);
        let state = controller.state().await;
        assert_eq!(state.items.len(), 6);
        assert_eq!(state.current_page, 1);
        assert!(!state.is_loading_more);
    }

    #[tokio::test]
    async fn test_on_scroll_near_bottom() {
        let source = Arc::new(twelve_per_page());
        let controller = ListController::new(source.clone(), ViewMode::Infinite, 6);
        controller.load_initial().await;

        let far = Viewport { inner_height: 800.0, scroll_y: 0.0, document_height: 4000.0 };
        assert_eq!(controller.on_scroll(far).await, Outcome::Skipped);

        let near = Viewport { inner_height: 800.0, scroll_y: 2950.0, document_height: 4000.0 };
        assert_eq!(controller.on_scroll(near).await, Outcome::Applied { scroll_to_top: false });
        assert_eq!(controller.state().await.current_page, 2);
    }

    #[tokio::test]
    async fn test_snapshot_bounds() {
        let controller = ListController::new(Arc::new(twelve_per_page()), ViewMode::Paginated, 6);
        controller.load_initial().await;

        let snapshot = controller.snapshot().await;
        assert!(!snapshot.can_go_prev);
        assert!(snapshot.can_go_next);

        controller.change_page(3).await.unwrap();
        let snapshot = controller.snapshot().await;
        assert!(snapshot.can_go_prev);
        assert!(!snapshot.can_go_next);
    }

    #[tokio::test]
    async fn test_change_page_skipped_while_query_reloads() {
        let old = Arc::new(MockSource::new(vec![(1, (1..=6).collect(), 5), (4, vec![40], 5)]));
        let new = Arc::new(MockSource::new(vec![(1, vec![999], 1)]).with_delay(Duration::from_millis(100)));
        let controller = Arc::new(ListController::new(old.clone(), ViewMode::Paginated, 6));
        controller.load_initial().await;

        let reload = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.replace_source(new).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let loading = controller.state().await;
        assert!(loading.is_loading);
        assert!(loading.items.is_empty());
        assert_eq!(loading.total_pages, 1);

        assert_eq!(controller.change_page(4).await, Ok(Outcome::Skipped));
        assert_eq!(reload.await.unwrap(), Outcome::Applied { scroll_to_top: false });

        let state = controller.state().await;
        assert_eq!(ids(&state), vec![999]);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 1);
        assert!(!state.is_loading);
        assert_eq!(old.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_change_page_skipped_during_mode_switch() {
        let source = Arc::new(twelve_per_page().with_delay(Duration::from_millis(100)));
        let controller = Arc::new(ListController::new(source.clone(), ViewMode::Infinite, 6));
        controller.load_initial().await;

        let switch = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_mode(ViewMode::Paginated).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(controller.change_page(2).await, Ok(Outcome::Skipped));
        assert_eq!(switch.await.unwrap(), Outcome::Applied { scroll_to_top: false });

        let state = controller.state().await;
        assert_eq!(ids(&state), (1..=6).collect::<Vec<_>>());
        assert_eq!(state.current_page, 1);
        assert!(!state.is_loading);
        assert_eq!(source.calls(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_later_change_page_wins() {
        let source = Arc::new(twelve_per_page().with_page_delay(2, Duration::from_millis(150)));
        let controller = Arc::new(ListController::new(source, ViewMode::Paginated, 6));
        controller.load_initial().await;

        let earlier = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.change_page(2).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(controller.change_page(3).await, Ok(Outcome::Applied { scroll_to_top: true }));
        assert_eq!(earlier.await.unwrap(), Ok(Outcome::Superseded));

        let state = controller.state().await;
        assert_eq!(ids(&state), (25..=30).collect::<Vec<_>>());
        assert_eq!(state.current_page, 3);
        assert!(!state.is_loading_more);
    }
}
