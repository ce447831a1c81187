// src/cad/units.rs
use metrics::counter;

use crate::cad::tokenize::text_lines;
use crate::cad::types::PageFetcher;

/// Unit ids reported on/at scene, in first-seen order without repeats.
///
/// Comment lines look like `11-29-2025 00:40:31 ENG45> On Scene`; the unit is
/// the last word before the first `>`.
pub fn units_from_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for line in lines {
        let line = line.as_ref().trim();
        if !line.to_lowercase().contains("scene") {
            continue;
        }
        let Some((before, _status)) = line.split_once('>') else {
            continue;
        };
        let Some(unit) = before.split_whitespace().last() else {
            continue;
        };
        if !units.iter().any(|u| u == unit) {
            units.push(unit.to_string());
        }
    }
    units
}

/// Fetch a comments page and pull the on-scene units from it.
/// An empty URL or a failed fetch yields no units.
pub async fn units_on_scene(fetcher: &dyn PageFetcher, comments_url: &str) -> Vec<String> {
    if comments_url.is_empty() {
        return Vec::new();
    }

    let html = match fetcher.fetch(comments_url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = ?e, url = %comments_url, fetcher = fetcher.name(), "comments fetch failed");
            counter!("cad_fetch_errors_total", "page" => "comments").increment(1);
            return Vec::new();
        }
    };

    let lines = text_lines(&html);
    crate::cad::log_head("comments", comments_url, &lines, 20);
    units_from_lines(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_seen_order() {
        let lines = ["ENG45> On Scene", "ENG45> On Scene", "TWR1> At Scene"];
        assert_eq!(units_from_lines(&lines), vec!["ENG45", "TWR1"]);
    }

    #[test]
    fn timestamp_prefix_and_case() {
        let lines = [
            "11-29-2025 00:40:31 ENG45> ON SCENE",
            "11-29-2025 00:41:02 AMB5391> Enroute",
            "11-29-2025 00:44:10 MED93> at scene > transporting",
        ];
        assert_eq!(units_from_lines(&lines), vec!["ENG45", "MED93"]);
    }

    #[test]
    fn lines_without_separator_or_unit_are_skipped() {
        let lines = ["Scene secured", "> On Scene", "   "];
        assert!(units_from_lines(&lines).is_empty());
    }
}
