use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use super::error::ApiError;
use crate::catalog::{ListPage, MovieDetail};
use crate::listing::ListKind;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub query: Option<String>,
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MovieDetail>, ApiError> {
    state.tmdb.movie_detail(id).await.map(Json).map_err(|e| {
        warn!(movie_id = id, "movie detail failed: {}", e);
        ApiError::BadGateway("Failed to load movie".to_string())
    })
}

/// One page of a catalog list, fetched without keeping any view state.
pub async fn get_list(
    State(state): State<AppState>,
    Path(list): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListPage>, ApiError> {
    let kind: ListKind = list.parse().map_err(ApiError::NotFound)?;
    let page = params.page.unwrap_or(1).max(1);

    let base_url = match kind {
        ListKind::Search => {
            let query = params.query.unwrap_or_default();
            if query.trim().is_empty() {
                return Ok(Json(ListPage::empty()));
            }
            state.tmdb.search_url(query.trim())
        }
        ListKind::Watchlist => {
            return Err(ApiError::BadRequest(
                "The watchlist is only available through a view".to_string(),
            ))
        }
        endpoint => match endpoint.endpoint() {
            Some(list) => state.tmdb.list_url(list),
            None => return Err(ApiError::NotFound(format!("unknown list: {}", endpoint))),
        },
    };

    Ok(Json(state.tmdb.fetch_list(&base_url, page).await))
}
