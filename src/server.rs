use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::api;
use crate::catalog::TmdbClient;
use crate::config::Config;
use crate::db::Repository;
use crate::listing::ViewRegistry;
use crate::session::SessionKeys;
use crate::spell::SpellChecker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Repository>,
    pub tmdb: Arc<TmdbClient>,
    pub speller: Option<Arc<SpellChecker>>,
    pub sessions: Arc<SessionKeys>,
    pub views: Arc<ViewRegistry>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Repository>,
        tmdb: Arc<TmdbClient>,
        speller: Option<Arc<SpellChecker>>,
        sessions: Arc<SessionKeys>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            tmdb,
            speller,
            sessions,
            views: Arc::new(ViewRegistry::new()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/signup", post(api::auth::signup))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/session", get(api::auth::session));

    let user_routes = Router::new()
        .route(
            "/api/watchlist",
            get(api::watchlist::get_watchlist)
                .post(api::watchlist::add_to_watchlist)
                .delete(api::watchlist::remove_from_watchlist),
        )
        .route(
            "/api/reviews",
            get(api::reviews::get_review).post(api::reviews::submit_review),
        );

    let catalog_routes = Router::new()
        .route("/api/movies/:id", get(api::movies::get_movie))
        .route("/api/lists/:list", get(api::movies::get_list))
        .route("/api/spellcheck", post(api::spellcheck::spellcheck));

    let view_routes = Router::new()
        .route("/api/views", post(api::views::create_view))
        .route(
            "/api/views/:id",
            get(api::views::get_view).delete(api::views::delete_view),
        )
        .route("/api/views/:id/more", post(api::views::load_more))
        .route("/api/views/:id/scroll", post(api::views::scroll))
        .route("/api/views/:id/page", post(api::views::change_page))
        .route("/api/views/:id/mode", put(api::views::set_mode))
        .route("/api/views/:id/query", put(api::views::set_query));

    let mut router = Router::new()
        .route("/healthz", get(healthz_handler))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(catalog_routes)
        .merge(view_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::session::session_middleware,
        ))
        .layer(axum::middleware::from_fn(crate::middleware::normalize_path))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "store": state.store.backend_name(),
        "views": state.views.len().await,
    }))
}

async fn fallback_handler(req: Request) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
