use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::item::ListPage;
use super::url::{build_paged_url, redact_api_key};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
}

/// Fetches page-scoped lists from the metadata source.
///
/// List fetching never fails from the caller's point of view: transport
/// errors, bad statuses and unreadable bodies all come back as
/// [`ListPage::empty`].
#[derive(Clone)]
pub struct ListFetcher {
    client: reqwest::Client,
}

impl ListFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, base_url: &str, page: u32) -> ListPage {
        let url = build_paged_url(base_url, page);

        match self.get_json::<Value>(&url).await {
            Ok(body) => {
                let list = ListPage::from_json(body);
                debug!(
                    url = %redact_api_key(&url),
                    items = list.items.len(),
                    total_pages = list.total_pages,
                    "fetched list page"
                );
                list
            }
            Err(e) => {
                warn!(url = %redact_api_key(&url), error = %e, "list fetch failed, using empty page");
                ListPage::empty()
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}
