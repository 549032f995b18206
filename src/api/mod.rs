pub mod auth;
pub mod error;
pub mod movies;
pub mod reviews;
pub mod spellcheck;
pub mod views;
pub mod watchlist;

pub use error::ApiError;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::{Path, Query},
        http::{header, Method, Request, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::catalog::fetcher::tests::spawn_upstream;
    use crate::catalog::TmdbClient;
    use crate::config::Config;
    use crate::db::{JsonStore, User, UserRepo};
    use crate::server::{build_router, AppState};
    use crate::session::SessionKeys;
    use crate::spell::SpellChecker;

    pub(crate) struct TestApp {
        pub router: Router,
        pub state: AppState,
        _dir: TempDir,
    }

    pub(crate) async fn test_app(tmdb_base: &str) -> TestApp {
        test_app_with_speller(tmdb_base, None).await
    }

    pub(crate) async fn test_app_with_speller(tmdb_base: &str, speller: Option<SpellChecker>) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.tmdb.api_key = Some("key".to_string());
        config.tmdb.base_url = tmdb_base.to_string();

        let store = Arc::new(JsonStore::new(dir.path()).await.unwrap());
        let tmdb = Arc::new(TmdbClient::new(&config.tmdb, reqwest::Client::new()));
        let state = AppState::new(
            config,
            store,
            tmdb,
            speller.map(Arc::new),
            Arc::new(SessionKeys::new(b"test-secret", 3600)),
        );

        TestApp {
            router: build_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    /// Create `username` directly in the store and return a session token.
    pub(crate) async fn login(app: &TestApp, username: &str) -> String {
        let user = User {
            id: format!("id-{}", username),
            username: username.to_string(),
            hashed_password: String::new(),
            created: None,
        };
        app.state.store.create_user(&user).await.unwrap();
        app.state.sessions.issue(&user).unwrap().0
    }

    pub(crate) async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn paged(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let page: i64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        Json(json!({
            "results": [{"id": page * 10, "title": format!("page {}", page)}],
            "total_pages": 3
        }))
    }

    /// Titles echo the query; ids are derived from it so distinct queries
    /// yield distinct movies.
    async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let query = params.get("query").cloned().unwrap_or_default();
        let id: i64 = query.bytes().map(i64::from).sum();
        Json(json!({"results": [{"id": id, "title": query}], "total_pages": 1}))
    }

    async fn movie(Path(id): Path<i64>) -> Result<Json<Value>, StatusCode> {
        if id == 404 {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(Json(json!({"id": id, "title": format!("movie {}", id)})))
    }

    /// A small stand-in for the TMDB API; returns its base URL.
    pub(crate) async fn tmdb_upstream() -> String {
        let router = Router::new()
            .route("/discover/movie", get(paged))
            .route("/movie/now_playing", get(paged))
            .route("/movie/top_rated", get(paged))
            .route("/search/movie", get(search))
            .route("/movie/:id", get(movie))
            .route(
                "/movie/:id/credits",
                get(|| async {
                    Json(json!({"cast": [{"id": 1158, "name": "Al Pacino", "character": "Vincent Hanna"}]}))
                }),
            )
            .route("/movie/:id/reviews", get(|| async { Json(json!({"results": []})) }));
        spawn_upstream(router).await
    }
}
