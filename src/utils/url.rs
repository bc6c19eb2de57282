//! URL helpers for endpoint construction.

/// Normalize a base URL by removing trailing slashes.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without producing double slashes.
///
/// # Examples
///
/// ```
/// use seekchat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:5000", "api/chat"),
///     "http://localhost:5000/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:5000/", "/api/chat_with_search"),
///     "http://localhost:5000/api/chat_with_search"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_any_number_of_trailing_slashes() {
        assert_eq!(normalize_base_url("http://h/v1///"), "http://h/v1");
        assert_eq!(normalize_base_url("http://h/v1"), "http://h/v1");
    }

    #[test]
    fn construct_handles_slash_combinations() {
        for base in ["http://h", "http://h/"] {
            for endpoint in ["api/chat", "/api/chat"] {
                assert_eq!(construct_api_url(base, endpoint), "http://h/api/chat");
            }
        }
    }
}
