//! Local-origin classification for persistence routing.

use url::Url;

/// `true` when `url` is an absolute http(s) URL whose host is one of
/// `local_hosts`.
pub fn is_local_url(url: &str, local_hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    parsed
        .host_str()
        .is_some_and(|host| local_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
}

/// Join an endpoint name onto a base URL, tolerating a trailing slash.
pub fn endpoint(base: &str, name: &str) -> String {
    format!("{}/{name}", base.trim_end_matches('/'))
}
