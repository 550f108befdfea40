// File: src/url.rs
// Purpose: URL normalization, comparison, and hash-fragment preservation

use anyhow::{Context, Result};
use url::Url;

/// Parse a possibly-relative input against the given base location.
///
/// Bare-origin inputs gain a trailing slash (`https://h` becomes
/// `https://h/`), which `url` guarantees for special schemes.
pub fn make_url(input: &str, base: &Url) -> Result<Url> {
    Url::options()
        .base_url(Some(base))
        .parse(input)
        .with_context(|| format!("cannot resolve '{input}' against '{base}'"))
}

/// String form used for equality checks: scheme, host, port, path (trailing
/// slash trimmed), and query. The hash fragment never participates.
fn comparable(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_fragment(None);

    let path = stripped.path();
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match stripped.query() {
        Some(query) => format!(
            "{}://{}{}?{}",
            stripped.scheme(),
            authority(&stripped),
            trimmed,
            query
        ),
        None => format!("{}://{}{}", stripped.scheme(), authority(&stripped), trimmed),
    }
}

fn authority(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}:{}", url.host_str().unwrap_or(""), port),
        None => url.host_str().unwrap_or("").to_string(),
    }
}

/// True iff every given URL has the same normalized form once hash fragments
/// are stripped. Fewer than two URLs degenerates to true.
pub fn same_urls(urls: &[&Url]) -> bool {
    if urls.len() < 2 {
        return true;
    }
    let first = comparable(urls[0]);
    urls[1..].iter().all(|url| comparable(url) == first)
}

/// Carry the current URL's hash onto the target when the target has none and
/// both point at the same page. Keeps in-page anchors alive across same-page
/// navigations that do not set a hash themselves.
pub fn fill_hash(current: &Url, target: &Url) -> Url {
    let mut target = target.clone();

    let target_has_hash = target.fragment().map(|f| !f.is_empty()).unwrap_or(false);
    let current_hash = current.fragment().filter(|f| !f.is_empty());

    if !target_has_hash {
        if let Some(hash) = current_hash {
            if same_urls(&[current, &target]) {
                target.set_fragment(Some(hash));
            }
        }
    }

    target
}
