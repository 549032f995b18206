//! Stateful list views: one [`ListController`] per open browse screen.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{json_body, ApiError};
use crate::listing::{
    EndpointSource, ListController, ListKind, Outcome, PageSource, SearchSource, Snapshot, View,
    ViewMode, Viewport, WatchlistSource,
};
use crate::server::AppState;
use crate::session::SessionUser;
use crate::spell::Suggester;

const INVALID_REQUEST: &str = "Invalid request";

#[derive(Debug, Deserialize)]
pub struct CreateView {
    pub list: ListKind,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub mode: Option<ViewMode>,
}

#[derive(Debug, Serialize)]
pub struct CreatedView {
    pub id: Uuid,
    pub snapshot: Snapshot,
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub snapshot: Snapshot,
    pub scroll_to_top: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: ViewMode,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

fn search_source(state: &AppState, query: &str) -> SearchSource {
    let mut source = SearchSource::new(state.tmdb.clone(), query)
        .dedupe(state.config.search.dedupe_suggestions);
    if let Some(ref speller) = state.speller {
        let suggester: Arc<dyn Suggester> = speller.clone();
        source = source.with_suggester(suggester, state.config.search.suggestion_concurrency);
    }
    source
}

fn build_source(
    state: &AppState,
    kind: ListKind,
    query: &str,
    owner: Option<&str>,
) -> Result<Arc<dyn PageSource>, ApiError> {
    let source: Arc<dyn PageSource> = match kind {
        ListKind::Search => Arc::new(search_source(state, query)),
        ListKind::Watchlist => {
            let owner = owner.ok_or(ApiError::Unauthorized)?;
            Arc::new(WatchlistSource::new(
                state.tmdb.clone(),
                state.store.clone(),
                owner,
                state.config.lists.per_page,
            ))
        }
        endpoint => {
            let list = endpoint
                .endpoint()
                .ok_or_else(|| ApiError::BadRequest(format!("unknown list: {}", endpoint)))?;
            Arc::new(EndpointSource::new(state.tmdb.clone(), list))
        }
    };
    Ok(source)
}

/// Views owned by a user are invisible to everyone else.
async fn lookup(state: &AppState, id: &str, user: Option<&SessionUser>) -> Result<Arc<View>, ApiError> {
    let not_found = || ApiError::NotFound("View not found".to_string());
    let id = Uuid::parse_str(id).map_err(|_| not_found())?;
    let view = state.views.get(&id).await.ok_or_else(not_found)?;
    match view.owner {
        Some(ref owner) if user.map(|u| &u.name) != Some(owner) => Err(not_found()),
        _ => Ok(view),
    }
}

pub async fn create_view(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    body: Result<Json<CreateView>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedView>), ApiError> {
    let req = json_body(body, INVALID_REQUEST)?;
    let owner = match req.list {
        ListKind::Watchlist => Some(user.ok_or(ApiError::Unauthorized)?.name),
        _ => None,
    };

    let source = build_source(&state, req.list, req.query.as_deref().unwrap_or(""), owner.as_deref())?;
    let controller = ListController::new(source, req.mode.unwrap_or_default(), state.config.lists.per_page)
        .with_near_bottom_px(state.config.lists.near_bottom_px);
    let view = state.views.insert(View::new(req.list, owner, controller)).await;

    view.controller.load_initial().await;
    Ok((
        StatusCode::CREATED,
        Json(CreatedView {
            id: view.id,
            snapshot: view.controller.snapshot().await,
        }),
    ))
}

pub async fn get_view(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let view = lookup(&state, &id, user.as_ref()).await?;
    Ok(Json(view.controller.snapshot().await))
}

pub async fn load_more(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let view = lookup(&state, &id, user.as_ref()).await?;
    view.controller.load_more().await;
    Ok(Json(view.controller.snapshot().await))
}

pub async fn scroll(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
    body: Result<Json<Viewport>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let viewport = json_body(body, INVALID_REQUEST)?;
    let view = lookup(&state, &id, user.as_ref()).await?;
    view.controller.on_scroll(viewport).await;
    Ok(Json(view.controller.snapshot().await))
}

pub async fn change_page(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> Result<Json<PageResponse>, ApiError> {
    let req = json_body(body, INVALID_REQUEST)?;
    let view = lookup(&state, &id, user.as_ref()).await?;
    let scroll_to_top = matches!(
        view.controller.change_page(req.page).await?,
        Outcome::Applied { scroll_to_top: true }
    );
    Ok(Json(PageResponse {
        snapshot: view.controller.snapshot().await,
        scroll_to_top,
    }))
}

pub async fn set_mode(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let req = json_body(body, INVALID_REQUEST)?;
    let view = lookup(&state, &id, user.as_ref()).await?;
    view.controller.set_mode(req.mode).await;
    Ok(Json(view.controller.snapshot().await))
}

pub async fn set_query(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let req = json_body(body, INVALID_REQUEST)?;
    let view = lookup(&state, &id, user.as_ref()).await?;
    if view.kind != ListKind::Search {
        return Err(ApiError::BadRequest("Only search views take a query".to_string()));
    }

    view.controller
        .replace_source(Arc::new(search_source(&state, &req.query)))
        .await;
    Ok(Json(view.controller.snapshot().await))
}

pub async fn delete_view(
    State(state): State<AppState>,
    user: Option<SessionUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let view = lookup(&state, &id, user.as_ref()).await?;
    state.views.remove(&view.id).await;
    Ok(StatusCode::NO_CONTENT)
}
