//! Url normalization shared by the index and the resolver

use url::Url;

/// Normalize a url to the form documents are registered under
///
/// `http://` becomes `https://`, `.html` and a `#top` fragment are removed and
/// one trailing slash is stripped.
pub fn canonicalize(url: &str) -> String {
    let mut url = match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    };
    url = url.replace(".html", "");
    if let Some(stripped) = url.strip_suffix("#top") {
        url = stripped.to_string();
    }
    if url.ends_with('/') {
        url.pop();
    }
    url
}

/// Resolve `href` against `base`, as a browser would
pub fn make_absolute(base: &str, href: &str) -> Result<String, url::ParseError> {
    let base = Url::parse(base)?;
    Ok(base.join(href.trim())?.to_string())
}

/// Split a url into the part before `#` and the fragment
pub fn split_fragment(url: &str) -> (&str, Option<&str>) {
    match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    }
}
