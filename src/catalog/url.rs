use regex::Regex;
use std::sync::OnceLock;

static PAGE_PARAM: OnceLock<Regex> = OnceLock::new();
static API_KEY_PARAM: OnceLock<Regex> = OnceLock::new();

fn page_param() -> &'static Regex {
    PAGE_PARAM.get_or_init(|| Regex::new(r"(^|&)page=[^&]*").unwrap())
}

fn api_key_param() -> &'static Regex {
    API_KEY_PARAM.get_or_init(|| Regex::new(r"api_key=[^&]*").unwrap())
}

/// Point `base_url` at `page`, dropping any `page=` it already carries.
pub fn build_paged_url(base_url: &str, page: u32) -> String {
    let (url, fragment) = match base_url.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (base_url, None),
    };
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let cleaned = page_param().replace_all(query, "");
    let cleaned = cleaned.trim_matches('&');

    let mut paged = if cleaned.is_empty() {
        format!("{}?page={}", path, page)
    } else {
        format!("{}?{}&page={}", path, cleaned, page)
    };
    if let Some(fragment) = fragment {
        paged.push('#');
        paged.push_str(fragment);
    }
    paged
}

/// Mask the API key so URLs can be logged.
pub fn redact_api_key(url: &str) -> String {
    api_key_param().replace_all(url, "api_key=***").into_owned()
}
