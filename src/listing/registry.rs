use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::controller::ListController;
use crate::catalog::MovieList;

/// Which list a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListKind {
    Latest,
    NowPlaying,
    TopRated,
    Search,
    Watchlist,
}

impl ListKind {
    pub fn endpoint(&self) -> Option<MovieList> {
        match self {
            ListKind::Latest => Some(MovieList::Latest),
            ListKind::NowPlaying => Some(MovieList::NowPlaying),
            ListKind::TopRated => Some(MovieList::TopRated),
            ListKind::Search | ListKind::Watchlist => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Latest => "latest",
            ListKind::NowPlaying => "now-playing",
            ListKind::TopRated => "top-rated",
            ListKind::Search => "search",
            ListKind::Watchlist => "watchlist",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(ListKind::Latest),
            "now-playing" => Ok(ListKind::NowPlaying),
            "top-rated" => Ok(ListKind::TopRated),
            "search" => Ok(ListKind::Search),
            "watchlist" => Ok(ListKind::Watchlist),
            other => Err(format!("unknown list: {}", other)),
        }
    }
}

/// One open list view: a controller plus what it was opened for.
pub struct View {
    pub id: Uuid,
    pub kind: ListKind,
    pub owner: Option<String>,
    pub controller: ListController,
    /// Unix milliseconds of the last lookup.
    last_seen: AtomicI64,
}

impl View {
    pub fn new(kind: ListKind, owner: Option<String>, controller: ListController) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            owner,
            controller,
            last_seen: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn touch(&self) {
        self.last_seen.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_seen.load(Ordering::Relaxed))
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// The open views, keyed by id. A view lives until its client closes it or
/// it sits idle past the configured TTL.
#[derive(Default)]
pub struct ViewRegistry {
    views: RwLock<HashMap<Uuid, Arc<View>>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, view: View) -> Arc<View> {
        let view = Arc::new(view);
        self.views.write().await.insert(view.id, view.clone());
        info!(id = %view.id, kind = %view.kind, "opened list view");
        view
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<View>> {
        let view = self.views.read().await.get(id).cloned()?;
        view.touch();
        Some(view)
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.views.write().await.remove(id);
        if let Some(ref view) = removed {
            info!(id = %view.id, kind = %view.kind, "closed list view");
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.read().await.is_empty()
    }

    /// Drop views not looked up within `ttl` of `now`; returns how many went.
    pub async fn sweep_idle_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> usize {
        let cutoff = now - ttl;
        let mut views = self.views.write().await;
        let before = views.len();
        views.retain(|_, view| view.last_seen() > cutoff);
        before - views.len()
    }

    pub async fn sweep_idle(&self, ttl: chrono::Duration) -> usize {
        self.sweep_idle_at(Utc::now(), ttl).await
    }

    pub fn start_sweeper(self: Arc<Self>, ttl_secs: u64) {
        let ttl = chrono::Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64);
        let period = (ttl_secs / 4).max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
            loop {
                interval.tick().await;
                let dropped = self.sweep_idle(ttl).await;
                if dropped > 0 {
                    info!("Dropped {} idle list views", dropped);
                } else {
                    debug!("No idle list views to drop");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListPage;
    use crate::listing::{PageSource, ViewMode};
    use async_trait::async_trait;

    struct Empty;

    #[async_trait]
    impl PageSource for Empty {
        async fn fetch_page(&self, _page: u32) -> ListPage {
            ListPage::empty()
        }

        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = ViewRegistry::new();
        let controller = ListController::new(Arc::new(Empty), ViewMode::Infinite, 6);
        let view = registry.insert(View::new(ListKind::TopRated, None, controller)).await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&view.id).await.is_some());
        assert!(registry.remove(&view.id).await);
        assert!(!registry.remove(&view.id).await);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn test_list_kind_names() {
        assert_eq!("now-playing".parse::<ListKind>().unwrap(), ListKind::NowPlaying);
        assert_eq!(
            serde_json::to_string(&ListKind::TopRated).unwrap(),
            "\"top-rated\""
        );
        assert_eq!(ListKind::Search.endpoint(), None);
        assert_eq!(ListKind::Latest.endpoint(), Some(MovieList::Latest));
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_views() {
        let registry = ViewRegistry::new();
        let ttl = chrono::Duration::seconds(60);
        let idle = registry
            .insert(View::new(ListKind::Latest, None, ListController::new(Arc::new(Empty), ViewMode::Infinite, 6)))
            .await;
        let busy = registry
            .insert(View::new(ListKind::TopRated, None, ListController::new(Arc::new(Empty), ViewMode::Infinite, 6)))
            .await;

        assert_eq!(registry.sweep_idle(ttl).await, 0);
        assert_eq!(registry.len().await, 2);

        // An hour from now only the view looked up in the meantime survives.
        let later = Utc::now() + chrono::Duration::hours(1);
        busy.last_seen.store(later.timestamp_millis(), Ordering::Relaxed);
        assert_eq!(registry.sweep_idle_at(later, ttl).await, 1);

        assert!(registry.get(&idle.id).await.is_none());
        assert!(registry.get(&busy.id).await.is_some());
    }

    #[tokio::test]
    async fn test_get_refreshes_last_seen() {
        let registry = ViewRegistry::new();
        let view = registry
            .insert(View::new(ListKind::Latest, None, ListController::new(Arc::new(Empty), ViewMode::Infinite, 6)))
            .await;
        view.last_seen.store(0, Ordering::Relaxed);

        registry.get(&view.id).await.unwrap();
        assert!(view.last_seen() > Utc::now() - chrono::Duration::seconds(5));
    }
}
