//! Canonical DOM extraction.
//!
//! The cleanup itself runs inside the browser (see `js_scripts`); this
//! module drives it and applies the final inter-tag whitespace collapse so
//! that two renders of the same content serialize byte-identically.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use regex::Regex;
use std::sync::LazyLock;

use super::js_scripts::cleanup_script;

static INTER_TAG_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r">\s+<").expect("SAFETY: hardcoded regex r\">\\s+<\" is statically valid")
});

/// Run the in-browser cleanup for a page at `depth` and return the
/// canonical HTML string.
pub async fn canonical_html(page: &Page, depth: u32) -> Result<String> {
    let html: String = page
        .evaluate(cleanup_script(depth))
        .await
        .context("cleanup script evaluation failed")?
        .into_value()
        .context("cleanup script returned a non-string value")?;

    Ok(collapse_inter_tag_whitespace(&html))
}

/// Collapse whitespace runs between tags (`>\s+<` → `><`).
#[must_use]
pub fn collapse_inter_tag_whitespace(html: &str) -> String {
    INTER_TAG_WHITESPACE.replace_all(html, "><").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_between_tags() {
        let html = "<div>\n  <p>Rooms</p>\t <p>Spa</p>\n</div>";
        assert_eq!(
            collapse_inter_tag_whitespace(html),
            "<div><p>Rooms</p><p>Spa</p></div>"
        );
    }

    #[test]
    fn preserves_whitespace_inside_text() {
        let html = "<p>Ocean view   rooms</p>";
        assert_eq!(collapse_inter_tag_whitespace(html), html);
    }

    #[test]
    fn idempotent() {
        let once = collapse_inter_tag_whitespace("<a> </a>  <b></b>");
        assert_eq!(collapse_inter_tag_whitespace(&once), once);
    }
}
