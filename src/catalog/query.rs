use std::cmp::Ordering;

use crate::core::entry::CatalogEntry;

/// Display order: folders before tools, then ascending name.
///
/// Names compare byte-wise as given (case-sensitive).
#[must_use]
pub fn display_cmp(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name.cmp(&b.name))
}

/// Project a list into display order without touching stored order
#[must_use]
pub fn display_order(entries: &[CatalogEntry]) -> Vec<&CatalogEntry> {
    let mut sorted: Vec<&CatalogEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| display_cmp(a, b));
    sorted
}

/// Entries of one list whose own fields contain `query`, ignoring case.
///
/// A blank query returns the whole list. Results use display order.
#[must_use]
pub fn search<'a>(entries: &'a [CatalogEntry], query: &str) -> Vec<&'a CatalogEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return display_order(entries);
    }

    let mut hits: Vec<&CatalogEntry> = entries.iter().filter(|e| e.matches(&needle)).collect();
    hits.sort_by(|a, b| display_cmp(a, b));
    hits
}
