//! Per-page keep/drop policy.

use crate::keywords::KeywordSet;

/// Number of leading pages that are always kept.
pub const LEAD_PAGES: usize = 2;

/// Decide whether a page survives filtering.
///
/// Lead pages are kept unconditionally. Every other page is kept when its
/// text contains at least one keyword as a case-sensitive substring, so an
/// empty keyword set drops all of them. `_instruction` is accepted for
/// policies that want the raw prompt; this one only needs the keywords.
pub fn keep(page_index: usize, page_text: &str, keywords: &KeywordSet, _instruction: &str) -> bool {
    if page_index < LEAD_PAGES {
        return true;
    }
    keywords
        .iter()
        .any(|keyword| page_text.contains(keyword.as_str()))
}

/// Evaluate every page in order and return the indices to keep, ascending.
///
/// `page_texts` may be shorter than `page_count`; missing pages are treated
/// as having no text.
pub fn select_pages(
    page_count: usize,
    page_texts: &[String],
    keywords: &KeywordSet,
    instruction: &str,
) -> Vec<usize> {
    (0..page_count)
        .filter(|&index| {
            let text = page_texts.get(index).map(String::as_str).unwrap_or("");
            keep(index, text, keywords, instruction)
        })
        .collect()
}
