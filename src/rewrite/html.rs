//! Streaming HTML rewrite of links, forms and text.
//!
//! Built on `lol_html`: the document is tokenized once, attribute and text
//! handlers mutate it in place, and everything the handlers do not touch is
//! emitted byte-for-byte.

use std::cell::Cell;
use std::rc::Rc;

use lol_html::html_content::{ContentType, Element};
use lol_html::{doc_text, element, end_tag, rewrite_str, RewriteStrSettings};

use crate::rewrite::trademark::add_trademark_raw;

/// The two base URLs link rewriting compares against.
///
/// Both are scheme + host with no trailing slash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteContext<'a> {
    proxy_base: &'a str,
    upstream_base: &'a str,
}

impl<'a> RewriteContext<'a> {
    /// Returns `None` when `proxy_base` is missing, blank, or not an
    /// `http(s)://` URL.
    pub fn new(proxy_base: Option<&'a str>, upstream_base: &'a str) -> Option<Self> {
        let proxy_base = proxy_base?.trim().trim_end_matches('/');
        if !is_http_url(proxy_base) {
            return None;
        }
        Some(Self {
            proxy_base,
            upstream_base: upstream_base.trim().trim_end_matches('/'),
        })
    }

    pub fn proxy_base(&self) -> &'a str {
        self.proxy_base
    }

    /// Where a link or form target should point after rewriting.
    ///
    /// `None` means leave the attribute as it is: empty values, external
    /// hosts, and look-alike hosts such as `upstream.evil.com`.
    pub fn retarget(&self, target: &str) -> Option<String> {
        if target.is_empty() {
            return None;
        }
        if target.starts_with('/') {
            return Some(format!("{}{}", self.proxy_base, target));
        }
        if self.is_upstream(target) {
            return Some(format!("{}{}", self.proxy_base, &target[self.upstream_base.len()..]));
        }
        None
    }

    /// Exact match, or the base followed by `/`.
    fn is_upstream(&self, target: &str) -> bool {
        if self.upstream_base.is_empty() {
            return false;
        }
        match target.strip_prefix(self.upstream_base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty())
}

/// Rewrite an HTML document for serving through the proxy.
///
/// - text outside `<script>`/`<style>` (HTML or SVG) gets ™ after six-letter
///   words, including `<title>`, `<textarea>` and `<noscript>` content
/// - `a[href]` and `form[action]` pointing at the site (relative) or the
///   upstream origin are re-pointed at `proxy_base`
///
/// Never fails. Blank documents and unusable `proxy_base` values return the
/// input unchanged, as does a document the tokenizer rejects.
pub fn rewrite_html(html: &str, proxy_base: Option<&str>, upstream_base: &str) -> String {
    if html.trim().is_empty() {
        return html.to_owned();
    }

    let Some(ctx) = RewriteContext::new(proxy_base, upstream_base) else {
        tracing::warn!(proxy_base = ?proxy_base, "Invalid proxy base URL, skipping rewrite");
        return html.to_owned();
    };

    // A text node can arrive split across several chunks; hold the pieces
    // until the last one so words are never cut in half.
    let mut pending = String::new();
    // Open <script>/<style> elements; their text is code, not prose.
    let code_depth = Rc::new(Cell::new(0usize));
    let depth = Rc::clone(&code_depth);

    let settings = RewriteStrSettings {
        element_content_handlers: vec![
            element!("a[href]", |el| {
                retarget_attribute(el, "href", &ctx);
                Ok(())
            }),
            element!("form[action]", |el| {
                retarget_attribute(el, "action", &ctx);
                Ok(())
            }),
            element!("script, style", |el| {
                if let Some(handlers) = el.end_tag_handlers() {
                    code_depth.set(code_depth.get() + 1);
                    let code_depth = Rc::clone(&code_depth);
                    handlers.push(end_tag!(move |_end| {
                        code_depth.set(code_depth.get().saturating_sub(1));
                        Ok(())
                    }));
                }
                Ok(())
            }),
        ],
        document_content_handlers: vec![doc_text!(move |chunk| {
            if depth.get() > 0 {
                return Ok(());
            }
            pending.push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                let marked = add_trademark_raw(&pending);
                if marked != chunk.as_str() {
                    chunk.replace(&marked, ContentType::Html);
                }
                pending.clear();
            } else {
                chunk.remove();
            }
            Ok(())
        })],
        ..RewriteStrSettings::new()
    };

    match rewrite_str(html, settings) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::error!(error = %e, html_length = html.len(), "Failed to process HTML");
            html.to_owned()
        }
    }
}

/// Re-point one attribute, leaving it untouched if it does not need to move
/// or cannot be written.
fn retarget_attribute(el: &mut Element<'_, '_>, name: &str, ctx: &RewriteContext<'_>) {
    let Some(current) = el.get_attribute(name) else {
        return;
    };
    let Some(rewritten) = ctx.retarget(&current) else {
        return;
    };
    if let Err(e) = el.set_attribute(name, &rewritten) {
        tracing::warn!(
            attribute = name,
            value = %current,
            error = %e,
            "Failed to rewrite link target"
        );
    }
}
