// src/cad/links.rs
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Substring (lowercase) identifying per-incident comment page links.
pub const COMMENTS_LINK_MARKER: &str = "livecadcomments";

static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Incident id → absolute comments page URL, as linked from the dispatch page.
#[derive(Debug, Clone, Default)]
pub struct CommentLinks {
    by_id: HashMap<String, String>,
}

impl CommentLinks {
    pub fn from_html(html: &str, base: &Url) -> Self {
        let doc = Html::parse_document(html);
        let mut by_id = HashMap::new();

        for a in doc.select(&ANCHOR_SEL) {
            let text: String = a.text().map(str::trim).collect();
            let href = a.value().attr("href").unwrap_or_default();
            if text.is_empty() || href.is_empty() {
                continue;
            }
            if !href.to_ascii_lowercase().contains(COMMENTS_LINK_MARKER) {
                continue;
            }
            match base.join(href) {
                // Later anchors overwrite earlier ones for the same id.
                Ok(url) => {
                    by_id.insert(text, url.to_string());
                }
                Err(e) => tracing::debug!(error = %e, %href, "unresolvable comments link"),
            }
        }

        Self { by_id }
    }

    /// Resolved URL for `id`, or an empty string when the page has no link for it.
    pub fn url_for(&self, id: &str) -> String {
        self.by_id.get(id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
