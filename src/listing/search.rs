use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use super::merge::dedupe_keep_first;
use super::source::PageSource;
use crate::catalog::{ListPage, TmdbClient};
use crate::spell::Suggester;

/// Title search, widened on its first page by spelling alternates.
pub struct SearchSource {
    tmdb: Arc<TmdbClient>,
    query: String,
    suggester: Option<Arc<dyn Suggester>>,
    concurrency: usize,
    dedupe: bool,
}

impl SearchSource {
    pub fn new(tmdb: Arc<TmdbClient>, query: impl Into<String>) -> Self {
        Self {
            tmdb,
            query: query.into(),
            suggester: None,
            concurrency: 1,
            dedupe: true,
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn Suggester>, concurrency: usize) -> Self {
        self.suggester = Some(suggester);
        self.concurrency = concurrency.max(1);
        self
    }

    /// Whether alternate results that repeat a primary result are dropped.
    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    async fn search(&self, query: &str, page: u32) -> ListPage {
        self.tmdb.fetch_list(&self.tmdb.search_url(query), page).await
    }
}

#[async_trait]
impl PageSource for SearchSource {
    async fn fetch_page(&self, page: u32) -> ListPage {
        let query = self.query.trim();
        if query.is_empty() {
            return ListPage::empty();
        }

        let mut results = self.search(query, page).await;

        let suggester = match (&self.suggester, page) {
            (Some(suggester), 1) => suggester,
            _ => return results,
        };

        let alternates = suggester.suggest(query);
        if alternates.is_empty() {
            return results;
        }
        debug!(query, ?alternates, "searching spelling alternates");

        // `buffered` keeps suggestion order while running up to `concurrency` at once.
        let extra: Vec<ListPage> = stream::iter(alternates)
            .map(|alternate| async move { self.search(&alternate, 1).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        for alternate in extra {
            if !alternate.items.is_empty() {
                results.items.extend(alternate.items);
            }
        }

        if self.dedupe {
            results.items = dedupe_keep_first(results.items);
        }

        results
    }

    fn describe(&self) -> String {
        format!("Search({:?})", self.query)
    }
}
