//! Duplicate and near-duplicate removal.
//!
//! The same story routinely comes back from several providers, sometimes under
//! a slightly different headline. [`dedupe`] drops an article when its link was
//! already accepted during the run, or when its lower-cased title is at least
//! `threshold` similar to any title accepted so far. The first article to
//! arrive wins; later ones are dropped, never merged.
//!
//! Similarity is the Ratcliff/Obershelp "gestalt" ratio: `2·M / (|a| + |b|)`
//! where `M` is the number of characters covered by the longest common block,
//! recursively applied to the unmatched text on each side of it.

use crate::models::Article;
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Links and titles accepted so far in the current run.
#[derive(Debug, Default, Clone)]
pub struct SeenState {
    pub links: HashSet<String>,
    /// Lower-cased titles, in acceptance order.
    pub titles: Vec<String>,
}

impl SeenState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of articles accepted so far.
    pub fn accepted(&self) -> usize {
        self.links.len()
    }

    fn closest_title(&self, title: &str, threshold: f64) -> Option<(&str, f64)> {
        self.titles
            .iter()
            .map(|seen| (seen.as_str(), similarity(title, seen)))
            .find(|(_, ratio)| *ratio >= threshold)
    }
}

/// Filter `items` against (and into) `seen`, preserving input order.
pub fn dedupe(items: Vec<Article>, seen: &mut SeenState, threshold: f64) -> Vec<Article> {
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        if item.link.is_empty() {
            debug!(title = %item.title, "Dropping article without link");
            continue;
        }
        if seen.links.contains(&item.link) {
            debug!(link = %item.link, "Dropping duplicate link");
            continue;
        }

        let title = item.title.to_lowercase();
        if let Some((existing, ratio)) = seen.closest_title(&title, threshold) {
            debug!(%title, %existing, ratio, "Dropping near-duplicate title");
            continue;
        }

        seen.links.insert(item.link.clone());
        seen.titles.push(title);
        kept.push(item);
    }

    kept
}

/// Ratcliff/Obershelp similarity of two strings, compared char by char.
///
/// Symmetric and always in `[0, 1]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    // Block tie-breaking depends on argument order; fix the order.
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    // run[k + 1] = length of the common run ending at a[i - 1], b[blo + k]
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for i in alo..ahi {
        for k in 0..width {
            let j = blo + k;
            cur[k + 1] = if a[i] == b[j] { prev[k] + 1 } else { 0 };
            let run = cur[k + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;

    fn article(title: &str, link: &str) -> Article {
        Article::new("Fonte", title, link, None)
    }

    #[test]
    fn test_similarity_basics() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("petróleo", "petróleo"), 1.0);
        assert_eq!(similarity("abcd", "abce"), 0.75);
        assert_eq!(similarity("abcd", "wxyz"), 0.0);
    }

    #[test]
    fn test_similarity_matches_gestalt_examples() {
        // "WIKIM" + "IA"
        let ratio = similarity("WIKIMEDIA", "WIKIMANIA");
        assert!((ratio - 14.0 / 18.0).abs() < 1e-9);

        let ratio = similarity("abxcd", "abcd");
        assert!((ratio - 8.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("bbc", "caabacba"),
            ("abcab", "bacba"),
            ("leilão de energia", "energia do leilão"),
            ("petróleo sobe", "sobe o petróleo"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_similarity_of_reworded_titles() {
        let a = "petrobras anuncia nova descoberta no pré-sal";
        let b = "petrobras anuncia descoberta no pré-sal da bacia";
        let ratio = similarity(a, b);
        assert!(ratio > 0.7 && ratio < 1.0, "ratio = {ratio}");
    }

    #[test]
    fn test_dedupe_drops_seen_and_empty_links() {
        let mut seen = SeenState::new();
        let kept = dedupe(
            vec![
                article("Usina solar inaugurada", "https://x/a"),
                article("Outra manchete qualquer", ""),
                article("Título completamente diferente", "https://x/a"),
            ],
            &mut seen,
            DEFAULT_THRESHOLD,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Usina solar inaugurada");
        assert!(seen.links.contains("https://x/a"));
        assert_eq!(seen.titles, vec!["usina solar inaugurada".to_string()]);
    }

    #[test]
    fn test_dedupe_drops_near_duplicate_titles_case_insensitively() {
        let mut seen = SeenState::new();
        let kept = dedupe(
            vec![
                article("Governo do Piauí anuncia leilão de energia solar", "https://a/1"),
                article("GOVERNO DO PIAUÍ ANUNCIA LEILÃO DE ENERGIA SOLAR!", "https://b/2"),
                article("Vale amplia produção de minério de ferro", "https://c/3"),
            ],
            &mut seen,
            DEFAULT_THRESHOLD,
        );
        let links: Vec<_> = kept.iter().map(|a| a.link.as_str()).collect();
        assert_eq!(links, vec!["https://a/1", "https://c/3"]);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let items = vec![
            article("Eólica bate recorde no Nordeste", "https://x/1"),
            article("Preço do petróleo recua", "https://x/2"),
            article("Nova jazida de lítio em Minas", "https://x/3"),
        ];
        let mut seen = SeenState::new();
        let first = dedupe(items.clone(), &mut seen, DEFAULT_THRESHOLD);
        assert_eq!(first.len(), 3);
        let second = dedupe(items, &mut seen, DEFAULT_THRESHOLD);
        assert!(second.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let threshold = similarity("abcd", "abce");

        let mut seen = SeenState::new();
        let kept = dedupe(
            vec![article("abcd", "https://x/1"), article("abce", "https://x/2")],
            &mut seen,
            threshold,
        );
        assert_eq!(kept.len(), 1);

        // One more differing character drops the ratio below the threshold.
        let mut seen = SeenState::new();
        let kept = dedupe(
            vec![article("abcd", "https://x/1"), article("abef", "https://x/2")],
            &mut seen,
            threshold,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_seen_state_spans_batches() {
        let mut seen = SeenState::new();
        dedupe(
            vec![article("Leilão de transmissão marcado para dezembro", "https://x/1")],
            &mut seen,
            DEFAULT_THRESHOLD,
        );
        let kept = dedupe(
            vec![article("Leilão de transmissão marcado para dezembro.", "https://y/9")],
            &mut seen,
            DEFAULT_THRESHOLD,
        );
        assert!(kept.is_empty());
        assert_eq!(seen.accepted(), 1);
    }
}
