//! Runs every registered source for every configured query and merges the
//! results into one deduplicated, per-query-limited list.

use crate::config::QueryGroup;
use crate::dedup::{SeenState, dedupe};
use crate::models::{Article, Category, Region};
use crate::ranking::rank_and_limit;
use crate::scrapers::SourceAdapter;
use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, info, instrument};

pub struct Collector {
    adapters: Vec<Box<dyn SourceAdapter>>,
    threshold: f64,
}

impl Collector {
    pub fn new(threshold: f64) -> Self {
        Self {
            adapters: Vec::new(),
            threshold,
        }
    }

    /// Add a source. Registration order decides which copy of a story is kept.
    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) -> &mut Self {
        self.adapters.push(adapter);
        self
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Collect every query of every group with a fresh dedup state.
    pub async fn collect(&self, groups: &[QueryGroup], max_per_query: usize) -> Vec<Article> {
        let mut seen = SeenState::new();
        self.collect_into(groups, max_per_query, &mut seen).await
    }

    /// Like [`collect`](Self::collect), sharing `seen` with earlier runs.
    #[instrument(level = "info", skip_all, fields(adapters = self.adapters.len(), max_per_query = max_per_query))]
    pub async fn collect_into(
        &self,
        groups: &[QueryGroup],
        max_per_query: usize,
        seen: &mut SeenState,
    ) -> Vec<Article> {
        let t0 = Instant::now();
        let mut results = Vec::new();

        for group in groups {
            info!(category = %group.category, queries = group.queries.len(), "Collecting category");
            for query in &group.queries {
                let fetched = self.gather(query).await;
                let kept = self.keep_new(fetched, seen, max_per_query, group.category);
                info!(category = %group.category, query = %query, count = kept.len(), "Query done");
                results.extend(kept);
            }
        }

        info!(
            count = results.len(),
            seen = seen.accepted(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Collection finished"
        );
        results
    }

    /// Run every adapter once (the query is empty) and keep the `limit` most
    /// recent new stories. Used for listing sources, which ignore the query.
    #[instrument(level = "info", skip(self))]
    pub async fn collect_listings(&self, category: Category, limit: usize) -> Vec<Article> {
        let mut seen = SeenState::new();
        let fetched = self.gather("").await;
        let kept = self.keep_new(fetched, &mut seen, limit, category);
        info!(count = kept.len(), "Listings collected");
        kept
    }

    /// All adapters concurrently; results concatenated in registration order.
    async fn gather(&self, query: &str) -> Vec<Article> {
        join_all(self.adapters.iter().map(|a| a.fetch(query)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    fn keep_new(
        &self,
        fetched: Vec<Article>,
        seen: &mut SeenState,
        limit: usize,
        category: Category,
    ) -> Vec<Article> {
        let fetched_count = fetched.len();
        let unique = dedupe(fetched, seen, self.threshold);
        debug!(fetched = fetched_count, unique = unique.len(), "Deduplicated");

        let mut kept = rank_and_limit(unique, limit);
        for article in &mut kept {
            article.category = category;
            article.region = Region::World;
        }
        kept
    }
}
