//! Deterministic HTML→markdown conversion.
//!
//! The converter pins every stylistic option so that equivalent canonical
//! DOMs always serialize to byte-identical markdown, and replaces the
//! default handlers for anchors, images, and buttons:
//!
//! - anchors render as `content [link]`, or `content [button]` when the
//!   anchor's role or class marks it as a button; URLs are dropped (they
//!   churn per deploy and poison checksums)
//! - images are dropped entirely
//! - buttons render as `content [button]`
//!
//! The converted text is then CRLF-normalized, NFC-normalized, and trimmed.
//! That post-processed form is what the content checksum is computed over.

use anyhow::{Context, Result};
use htmd::{
    Element, HtmlToMarkdown,
    element_handler::{HandlerResult, Handlers},
    options::{
        BulletListMarker, CodeBlockStyle, HeadingStyle, HrStyle, LinkReferenceStyle, LinkStyle,
        Options,
    },
};
use unicode_normalization::UnicodeNormalization;

/// Marker appended to plain link content.
const LINK_MARKER: &str = "[link]";
/// Marker appended to button-like content.
const BUTTON_MARKER: &str = "[button]";

fn get_attr(attrs: &[html5ever::Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
        .filter(|v| !v.trim().is_empty())
}

/// True when the anchor is presented as a button (role or class carries
/// `button`/`btn`).
fn is_button_like(attrs: &[html5ever::Attribute]) -> bool {
    let role = get_attr(attrs, "role").unwrap_or_default().to_lowercase();
    if role.contains("button") {
        return true;
    }
    let class = get_attr(attrs, "class").unwrap_or_default().to_lowercase();
    class.contains("button") || class.contains("btn")
}

fn anchor_handler(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    let content = content.trim();
    if content.is_empty() {
        return Some(HandlerResult::from(String::new()));
    }
    let marker = if is_button_like(element.attrs) {
        BUTTON_MARKER
    } else {
        LINK_MARKER
    };
    Some(HandlerResult::from(format!("{content} {marker}")))
}

fn image_handler(_handlers: &dyn Handlers, _element: Element) -> Option<HandlerResult> {
    Some(HandlerResult::from(String::new()))
}

fn button_handler(handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let content = handlers.walk_children(element.node).content;
    let content = content.trim();
    if content.is_empty() {
        return Some(HandlerResult::from(String::new()));
    }
    Some(HandlerResult::from(format!("{content} {BUTTON_MARKER}")))
}

fn build_converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            hr_style: HrStyle::Dashes,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            link_style: LinkStyle::Inlined,
            link_reference_style: LinkReferenceStyle::Full,
            ..Options::default()
        })
        .skip_tags(vec!["script", "style", "head"])
        .add_handler(vec!["a"], anchor_handler)
        .add_handler(vec!["img"], image_handler)
        .add_handler(vec!["button"], button_handler)
        .build()
}

/// Convert canonical HTML to the checksum-stable markdown form.
pub fn to_markdown(html: &str) -> Result<String> {
    let converter = build_converter();
    let raw = converter
        .convert(html)
        .context("html to markdown conversion failed")?;
    Ok(postprocess(&raw))
}

/// CRLF→LF, NFC-normalize, trim.
#[must_use]
pub fn postprocess(markdown: &str) -> String {
    let unix = markdown.replace("\r\n", "\n");
    let normalized: String = unix.nfc().collect();
    normalized.trim().to_string()
}
