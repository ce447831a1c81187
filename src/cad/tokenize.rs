// src/cad/tokenize.rs
use scraper::{Html, Node};

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Flatten an HTML document into its visible text lines, in document order.
///
/// Every text node is split on line breaks; each piece is trimmed and empty
/// pieces are dropped. Parsing is permissive, so broken markup just yields
/// fewer (possibly zero) lines.
pub fn text_lines(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        for line in text.lines() {
            let t = line.trim();
            if !t.is_empty() {
                out.push(t.to_string());
            }
        }
    }

    out
}
