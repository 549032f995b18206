use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tracing::warn;

use crate::catalog::{ListPage, MovieList, TmdbClient};
use crate::db::{Repository, WatchlistRepo};

const DETAIL_CONCURRENCY: usize = 6;

/// Something that can produce page `n` of a list.
///
/// Implementations never fail: an unreachable source yields
/// [`ListPage::empty`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> ListPage;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// One of the fixed TMDB endpoint lists.
pub struct EndpointSource {
    tmdb: Arc<TmdbClient>,
    list: MovieList,
}

impl EndpointSource {
    pub fn new(tmdb: Arc<TmdbClient>, list: MovieList) -> Self {
        Self { tmdb, list }
    }
}

#[async_trait]
impl PageSource for EndpointSource {
    async fn fetch_page(&self, page: u32) -> ListPage {
        // Rebuilt per call: the latest list's date window moves with the clock.
        let base_url = self.tmdb.list_url(self.list);
        self.tmdb.fetch_list(&base_url, page).await
    }

    fn describe(&self) -> String {
        format!("{:?}", self.list)
    }
}

/// A user's watchlist, resolved to full movie records and paged locally.
pub struct WatchlistSource {
    tmdb: Arc<TmdbClient>,
    store: Arc<dyn Repository>,
    username: String,
    per_page: usize,
}

impl WatchlistSource {
    pub fn new(
        tmdb: Arc<TmdbClient>,
        store: Arc<dyn Repository>,
        username: impl Into<String>,
        per_page: usize,
    ) -> Self {
        Self {
            tmdb,
            store,
            username: username.into(),
            per_page: per_page.max(1),
        }
    }
}

#[async_trait]
impl PageSource for WatchlistSource {
    async fn fetch_page(&self, page: u32) -> ListPage {
        let ids = match self.store.get_watchlist(&self.username).await {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                warn!(user = %self.username, error = %e, "failed to read watchlist");
                return ListPage::empty();
            }
        };

        let total_pages = ids.len().div_ceil(self.per_page).max(1) as u32;
        let start = (page.max(1) as usize - 1) * self.per_page;

        let wanted: Vec<i64> = ids.into_iter().skip(start).take(self.per_page).collect();
        let items = stream::iter(wanted)
            .map(|id| {
                let tmdb = self.tmdb.clone();
                async move {
                    match tmdb.movie(id).await {
                        Ok(item) => Some(item),
                        Err(e) => {
                            warn!(movie_id = id, error = %e, "skipping unresolvable watchlist entry");
                            None
                        }
                    }
                }
            })
            .buffered(DETAIL_CONCURRENCY)
            .filter_map(|item| async move { item })
            .collect::<Vec<_>>()
            .await;

        ListPage::new(items, total_pages)
    }

    fn describe(&self) -> String {
        format!("Watchlist({})", self.username)
    }
}
