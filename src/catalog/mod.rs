pub mod fetcher;
pub mod item;
pub mod tmdb;
pub mod url;

pub use fetcher::{FetchError, ListFetcher};
pub use item::{Item, ListPage};
pub use tmdb::{CastMember, ExternalReview, MovieDetail, MovieList, TmdbClient};
pub use url::build_paged_url;
