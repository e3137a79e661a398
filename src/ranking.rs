//! Recency ranking and per-query truncation.

use crate::models::Article;
use std::cmp::Reverse;

/// Newest first, undated articles last, then keep the first `limit`.
///
/// The sort is stable, so articles sharing a date keep their input order.
pub fn rank_and_limit(mut items: Vec<Article>, limit: usize) -> Vec<Article> {
    // None < Some(_) under Ord, so reversing puts unknown dates at the end.
    items.sort_by_key(|a| Reverse(a.published_date));
    items.truncate(limit);
    items
}
