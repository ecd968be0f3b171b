//! JavaScript evaluated inside the browser page.
//!
//! This module contains the scripts used to stabilize, inspect, and
//! canonicalize a loaded document before it is snapshotted.

/// Computes the DOM signature used by the stabilizer:
/// `elementCount|textLength|djb2(normalizedText)`.
///
/// The djb2 hash is local to the page and only ever compared against other
/// signatures from the same page; it is unrelated to the content checksum
/// computed over markdown.
pub const SIGNATURE_SCRIPT: &str = r#"
    (() => {
        const text = (document.body?.innerText || '').replace(/\s+/g, ' ').trim();
        let hash = 5381;
        for (let i = 0; i < text.length; i++) {
            hash = ((hash * 33) + text.charCodeAt(i)) >>> 0;
        }
        const elementCount = document.getElementsByTagName('*').length;
        return elementCount + '|' + text.length + '|' + hash;
    })()
"#;

/// True once the document body exists.
pub const BODY_READY_SCRIPT: &str = "(() => !!document.body)()";

/// One lazy-load iteration: scroll to the bottom and report the new
/// scroll height so the caller can detect growth.
pub const SCROLL_BOTTOM_SCRIPT: &str = r"
    (() => {
        window.scrollTo(0, document.body.scrollHeight);
        return document.body.scrollHeight;
    })()
";

/// Return to the top of the document after lazy-load scrolling.
pub const SCROLL_TOP_SCRIPT: &str = "(() => { window.scrollTo(0, 0); return true; })()";

/// Extracts the raw candidate link set from the live DOM, before cleanup
/// mutates it. Anchors inside ad-scoped containers and anchors pointing at
/// search-engine hosts are dropped here; scheme and extension filtering
/// happens on the Rust side where the crawl configuration lives.
pub const LINKS_SCRIPT: &str = r#"
    (() => {
        const AD_TOKEN = /(^|[^a-z])(ad|ads|advertisement)([^a-z]|$)/i;
        const SEARCH_HOSTS = [
            'google.', 'bing.', 'yahoo.', 'duckduckgo.', 'baidu.', 'yandex.'
        ];

        const isAdScoped = (el) => {
            for (let node = el; node && node.getAttribute; node = node.parentElement) {
                const scope = [
                    node.getAttribute('id') || '',
                    node.getAttribute('class') || '',
                    node.getAttribute('role') || ''
                ].join(' ');
                if (AD_TOKEN.test(scope)) return true;
            }
            return false;
        };

        const links = Array.from(document.querySelectorAll('a[href]'))
            .map(a => {
                const href = a.getAttribute('href');
                if (!href) return null;
                if (isAdScoped(a)) return null;
                try {
                    const abs = new URL(href, window.location.href);
                    const host = abs.hostname.toLowerCase();
                    if (SEARCH_HOSTS.some(s => host === s.slice(0, -1) || host.includes(s))) {
                        return null;
                    }
                    return abs.href;
                } catch (e) {
                    return null;
                }
            })
            .filter(href => href !== null);

        return Array.from(new Set(links));
    })()
"#;

/// Canonicalizes the loaded document in place and returns the cleaned HTML.
///
/// `__DEPTH__` is substituted with the crawl depth before evaluation: the
/// entry page (depth 0) keeps navigational chrome because hero content
/// often sits inside header-classed wrappers; deeper pages shed it.
pub const CLEANUP_SCRIPT_TEMPLATE: &str = r#"
    (() => {
        const depth = __DEPTH__;
        const AD_TOKEN = /(^|[^a-z])(ad|ads|advertisement)([^a-z]|$)/i;
        const CHROME_TOKEN = /(nav|header|footer|breadcrumb)/i;

        const attrScope = (el) => [
            el.getAttribute('id') || '',
            el.getAttribute('class') || '',
            el.getAttribute('role') || ''
        ].join(' ');

        // 1. Volatile and widget nodes.
        document.querySelectorAll('script, style, noscript, iframe, frame, svg, figure')
            .forEach(el => el.remove());
        Array.from(document.querySelectorAll('*')).forEach(el => {
            if (!el.isConnected) return;
            const scope = attrScope(el);
            if (AD_TOKEN.test(scope)) { el.remove(); return; }
            if (/g-recaptcha|grecaptcha/i.test(scope)) { el.remove(); return; }
            // HERE maps leave H_-prefixed residue behind.
            if (/(^|\s)H_[\w-]+/.test(el.getAttribute('class') || '')) { el.remove(); }
        });

        // 2. Navigational chrome on sub-pages only.
        if (depth > 0) {
            Array.from(document.querySelectorAll('*')).forEach(el => {
                if (!el.isConnected) return;
                if (CHROME_TOKEN.test(el.tagName) || CHROME_TOKEN.test(attrScope(el))) {
                    el.remove();
                }
            });
        }

        // 3. Inline styles vary per render and poison checksums.
        document.querySelectorAll('[style]').forEach(el => el.removeAttribute('style'));

        // 4. Absolute URLs so the markdown stage never sees relative refs.
        document.querySelectorAll('[href]').forEach(el => {
            try { el.setAttribute('href', new URL(el.getAttribute('href'), document.baseURI).href); }
            catch (e) {}
        });
        document.querySelectorAll('[src]').forEach(el => {
            try { el.setAttribute('src', new URL(el.getAttribute('src'), document.baseURI).href); }
            catch (e) {}
        });

        // 5. Structurally empty containers.
        let removed = true;
        while (removed) {
            removed = false;
            document.querySelectorAll('p, div, span').forEach(el => {
                if (el.children.length === 0 && (el.textContent || '').trim() === '') {
                    el.remove();
                    removed = true;
                }
            });
        }

        // 6. Merge adjacent text nodes so equivalent DOMs serialize
        //    identically. pre/code subtrees keep their exact node layout.
        const mergeText = (node) => {
            const tag = (node.tagName || '').toLowerCase();
            if (tag === 'pre' || tag === 'code') return;
            let child = node.firstChild;
            while (child) {
                const next = child.nextSibling;
                if (child.nodeType === Node.TEXT_NODE && next && next.nodeType === Node.TEXT_NODE) {
                    child.textContent += next.textContent;
                    next.remove();
                    continue;
                }
                if (child.nodeType === Node.ELEMENT_NODE) mergeText(child);
                child = child.nextSibling;
            }
        };
        mergeText(document.documentElement);

        return document.documentElement.outerHTML;
    })()
"#;

/// Bind the cleanup script to a crawl depth.
#[must_use]
pub fn cleanup_script(depth: u32) -> String {
    CLEANUP_SCRIPT_TEMPLATE.replace("__DEPTH__", &depth.to_string())
}
