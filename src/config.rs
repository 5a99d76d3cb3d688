//! Backend endpoint resolution.

use std::env;

/// Environment variable holding the SkyWalking OAP base URL.
pub const SW_URL_ENV: &str = "SW_URL";

/// Fallback OAP address when neither the CLI flag nor `SW_URL` is set.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:12800";

/// Resolve the GraphQL endpoint from an explicit URL, the `SW_URL`
/// environment variable, or the built-in default, in that order.
pub fn resolve_backend_url(url: Option<String>) -> String {
    let base = url
        .filter(|u| !u.is_empty())
        .or_else(|| env::var(SW_URL_ENV).ok().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    finalize_url(&base)
}

/// Ensure the URL targets the `/graphql` endpoint exactly once.
pub fn finalize_url(url: &str) -> String {
    if url.ends_with("/graphql") {
        url.to_string()
    } else {
        format!("{}/graphql", url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_graphql_suffix() {
        assert_eq!(finalize_url("http://oap:12800"), "http://oap:12800/graphql");
    }

    #[test]
    fn keeps_existing_suffix() {
        assert_eq!(
            finalize_url("http://oap:12800/graphql"),
            "http://oap:12800/graphql"
        );
    }

    #[test]
    fn trims_trailing_slashes_before_appending() {
        assert_eq!(
            finalize_url("http://oap:12800//"),
            "http://oap:12800/graphql"
        );
    }

    #[test]
    fn explicit_url_wins() {
        assert_eq!(
            resolve_backend_url(Some("http://explicit:12800".to_string())),
            "http://explicit:12800/graphql"
        );
    }

    #[test]
    fn empty_explicit_url_falls_back_to_default() {
        // Assumes SW_URL is not set in the test environment.
        if env::var(SW_URL_ENV).is_err() {
            assert_eq!(
                resolve_backend_url(Some(String::new())),
                "http://127.0.0.1:12800/graphql"
            );
        }
    }
}
