//! Endpoint construction for the chat backend.
//!
//! Base URLs come from flags, the environment, or the config file, so they
//! arrive with or without trailing slashes and sometimes with a path prefix
//! (e.g. a reverse proxy mounting the backend under `/chat`).

use reqwest::Url;

/// Strip trailing slashes so endpoints can be appended without doubling them.
///
/// ```
/// use chatstream::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:3000/"), "http://localhost:3000");
/// assert_eq!(normalize_base_url("http://host/prefix///"), "http://host/prefix");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a fixed endpoint path onto the base URL.
///
/// ```
/// use chatstream::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:3000/", "/health"),
///     "http://localhost:3000/health"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}

/// Join path segments onto the base URL, percent-encoding each one.
///
/// Session ids are opaque strings chosen by the backend, so they go through
/// this rather than `format!`.
pub fn segment_url(base_url: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url = Url::parse(&normalize_base_url(base_url))
        .map_err(|err| format!("Invalid base URL '{base_url}': {err}"))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| format!("Base URL cannot carry a path: {base_url}"))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}
