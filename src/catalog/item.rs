use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A single movie record as returned by the metadata source.
///
/// Only `id`, `title` and `poster_path` are interpreted; everything else is
/// carried through untouched so clients see the source's full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            extra: Map::new(),
        }
    }
}

/// One page of a list: the items plus the source's page count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(rename = "results")]
    pub items: Vec<Item>,
    pub total_pages: u32,
}

impl Default for ListPage {
    fn default() -> Self {
        Self::empty()
    }
}

impl ListPage {
    /// The shape every failed list fetch degrades to.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_pages: 1,
        }
    }

    pub fn new(items: Vec<Item>, total_pages: u32) -> Self {
        Self {
            items,
            total_pages: total_pages.max(1),
        }
    }

    /// Normalize a raw `{results, total_pages}` document.
    ///
    /// A missing or non-array `results` yields no items, records that can't
    /// be read as an [`Item`] are skipped, and a missing, non-numeric or
    /// non-positive `total_pages` becomes 1.
    pub fn from_json(body: Value) -> Self {
        let items = match body.get("results") {
            Some(Value::Array(results)) => results
                .iter()
                .filter_map(|raw| match serde_json::from_value::<Item>(raw.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        debug!("skipping unreadable list entry: {}", e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        Self::new(items, coerce_total_pages(body.get("total_pages")))
    }
}

fn coerce_total_pages(value: Option<&Value>) -> u32 {
    let pages = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        _ => None,
    };
    pages
        .filter(|p| *p >= 1)
        .map(|p| p.min(u32::MAX as u64) as u32)
        .unwrap_or(1)
}
