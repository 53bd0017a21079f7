//! Request headers for voter lookups.
//!
//! The service fronts a browser-facing form, so each request carries the
//! header set a browser would send, with a User-Agent rotated per request
//! from a pool of current browser/OS combinations.

use rand::seq::SliceRandom;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT,
};
use url::Url;

/// Fallback User-Agent when the pool lookup yields nothing (never in practice).
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Pool of browser User-Agents rotated across requests.
const USER_AGENTS: [&str; 12] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

/// Picks a random User-Agent from the pool.
#[must_use]
pub(crate) fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USER_AGENT)
}

/// Builds the per-request header set for a lookup against `endpoint`.
///
/// Origin and Referer are derived from the endpoint so requests stay coherent
/// when the endpoint is overridden (e.g. pointed at a local test server).
#[must_use]
pub(crate) fn request_headers(endpoint: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/xml, text/xml, */*; q=0.01"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.7"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Sec-GPC", HeaderValue::from_static("1"));
    headers.insert(
        "X-Requested-With",
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let origin = endpoint.origin().ascii_serialization();
    if let Ok(value) = HeaderValue::from_str(&origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
        headers.insert(REFERER, value);
    }
    if let Ok(value) = HeaderValue::from_str(random_user_agent()) {
        headers.insert(USER_AGENT, value);
    }

    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool_yields_browser_strings() {
        for _ in 0..32 {
            let ua = random_user_agent();
            assert!(ua.starts_with("Mozilla/5.0"), "unexpected UA: {ua}");
        }
    }

    #[test]
    fn headers_derive_origin_and_referer_from_endpoint() {
        let endpoint = Url::parse("http://127.0.0.1:9000/ConsultaElectorById").unwrap();
        let headers = request_headers(&endpoint);
        assert_eq!(headers[ORIGIN], "http://127.0.0.1:9000");
        assert_eq!(headers[REFERER], "http://127.0.0.1:9000/");
        assert_eq!(headers["X-Requested-With"], "XMLHttpRequest");
        assert!(headers.contains_key(USER_AGENT));
    }
}
