use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::fetcher::{FetchError, ListFetcher};
use super::item::{Item, ListPage};
use crate::config::TmdbConfig;

const LATEST_SORT: &str = "primary_release_date.desc";
const DETAIL_CAST_LIMIT: usize = 10;
const DETAIL_REVIEW_LIMIT: usize = 10;

/// The fixed endpoint lists the metadata source offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    Latest,
    NowPlaying,
    TopRated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalReview {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub movie: Item,
    pub cast: Vec<CastMember>,
    pub reviews: Vec<ExternalReview>,
}

#[derive(Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    cast: Vec<CastMember>,
}

#[derive(Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    results: Vec<ExternalReview>,
}

/// Client for the TMDB v3 API.
pub struct TmdbClient {
    base_url: String,
    api_key: String,
    fetcher: ListFetcher,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            fetcher: ListFetcher::new(client),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Base URL (without `page`) for one of the endpoint lists.
    pub fn list_url(&self, list: MovieList) -> String {
        match list {
            MovieList::Latest => self.latest_url(Utc::now().date_naive()),
            MovieList::NowPlaying => self.url("/movie/now_playing"),
            MovieList::TopRated => self.url("/movie/top_rated"),
        }
    }

    /// Movies released this year up to `today`, newest first.
    fn latest_url(&self, today: NaiveDate) -> String {
        format!(
            "{}&sort_by={}&primary_release_date.gte={}-01-01&primary_release_date.lte={}",
            self.url("/discover/movie"),
            LATEST_SORT,
            today.year(),
            today.format("%Y-%m-%d"),
        )
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}&query={}",
            self.url("/search/movie"),
            urlencoding::encode(query)
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?api_key={}", self.base_url, path, self.api_key)
    }

    pub async fn fetch_list(&self, base_url: &str, page: u32) -> ListPage {
        self.fetcher.fetch(base_url, page).await
    }

    pub async fn movie(&self, id: i64) -> Result<Item, FetchError> {
        self.fetcher.get_json(&self.url(&format!("/movie/{}", id))).await
    }

    pub async fn movie_detail(&self, id: i64) -> Result<MovieDetail, FetchError> {
        let credits_url = self.url(&format!("/movie/{}/credits", id));
        let reviews_url = self.url(&format!("/movie/{}/reviews", id));

        let (movie, credits, reviews) = tokio::try_join!(
            self.movie(id),
            self.fetcher.get_json::<CreditsResponse>(&credits_url),
            self.fetcher.get_json::<ReviewsResponse>(&reviews_url),
        )?;

        let mut cast = credits.cast;
        cast.truncate(DETAIL_CAST_LIMIT);
        let mut reviews = reviews.results;
        reviews.truncate(DETAIL_REVIEW_LIMIT);

        Ok(MovieDetail {
            movie,
            cast,
            reviews,
        })
    }
}
