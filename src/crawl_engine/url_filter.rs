//! Enqueue filtering for discovered links.
//!
//! The crawl is a same-origin BFS: only `http(s)` URLs on the seed's host
//! are followed, and binary assets are excluded by extension.

use url::Url;

/// Closed list of blocked URL suffixes: images, video, audio, PDF.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".bmp", ".tiff", ".avif",
    ".mp4", ".webm", ".avi", ".mov", ".mkv", ".m4v",
    ".mp3", ".wav", ".ogg", ".m4a", ".flac", ".aac",
    ".pdf",
];

/// True when the URL path ends in a blocked asset extension.
#[must_use]
pub fn is_blocked_asset(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Decide whether `candidate` may be enqueued from a page on `origin`.
/// Returns the canonical absolute URL on acceptance.
///
/// Rejections: unparseable or empty hrefs, non-http(s) schemes
/// (`javascript:`, `tel:`, `mailto:`), foreign hosts, blocked assets.
#[must_use]
pub fn accept_link(candidate: &str, origin: &Url) -> Option<String> {
    if candidate.trim().is_empty() {
        return None;
    }
    let resolved = origin.join(candidate).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if resolved.host_str()? != origin.host_str()? {
        return None;
    }
    if is_blocked_asset(&resolved) {
        return None;
    }
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://grandpalace.example/rooms/").expect("valid origin")
    }

    #[test]
    fn same_host_links_are_accepted() {
        assert_eq!(
            accept_link("https://grandpalace.example/dining", &origin()),
            Some("https://grandpalace.example/dining".to_string())
        );
        assert_eq!(
            accept_link("suites", &origin()),
            Some("https://grandpalace.example/rooms/suites".to_string())
        );
    }

    #[test]
    fn foreign_hosts_are_rejected() {
        assert_eq!(accept_link("https://booking.example/hotel", &origin()), None);
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert_eq!(accept_link("javascript:void(0)", &origin()), None);
        assert_eq!(accept_link("tel:+1-555-0100", &origin()), None);
        assert_eq!(accept_link("mailto:stay@grandpalace.example", &origin()), None);
    }

    #[test]
    fn empty_href_is_rejected() {
        assert_eq!(accept_link("", &origin()), None);
        assert_eq!(accept_link("   ", &origin()), None);
    }

    #[test]
    fn blocked_assets_are_rejected() {
        for asset in [
            "https://grandpalace.example/hero.jpg",
            "https://grandpalace.example/tour.MP4",
            "https://grandpalace.example/menu.pdf",
        ] {
            assert_eq!(accept_link(asset, &origin()), None, "{asset}");
        }
    }

    #[test]
    fn extension_check_ignores_query_strings() {
        // The extension list applies to the path, not the query.
        assert!(
            accept_link("https://grandpalace.example/page?img=x.jpg", &origin()).is_some()
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let base = origin();
        let once = accept_link("spa", &base).expect("accepted");
        let twice = accept_link(&once, &base).expect("accepted");
        assert_eq!(once, twice);
    }
}
