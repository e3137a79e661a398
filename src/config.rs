//! Run configuration loaded from an optional YAML file.
//!
//! Anything missing from the file falls back to the defaults below, which
//! reproduce the query lists and numeric knobs the digest has always run with.
//! Credentials never live here; they come from the CLI / environment (see [`crate::cli`]).
//!
//! ```yaml
//! language: pt
//! max_per_query: 5
//! queries:
//!   - category: Energia
//!     queries: ["energia solar", "hidrelétrica"]
//!   - category: Mineração
//!     queries: ["mineração"]
//! ```

use crate::error::{NewsError, Result};
use crate::classifier::DEFAULT_MAX_ATTEMPTS;
use crate::dedup::DEFAULT_THRESHOLD;
use crate::models::Category;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

/// The queries searched for one category, in the order they are run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryGroup {
    pub category: Category,
    pub queries: Vec<String>,
}

impl QueryGroup {
    pub fn new(category: Category, queries: &[&str]) -> Self {
        Self {
            category,
            queries: queries.iter().map(|q| q.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Language code passed to the search providers.
    pub language: String,
    /// Country code used by the Google News search.
    pub country: String,
    pub queries: Vec<QueryGroup>,
    /// Start of the search window, in days before today.
    pub from_days_ago: i64,
    /// End of the search window, in days before today.
    pub to_days_ago: i64,
    /// How far back the official news listings are read.
    pub listing_lookback_days: i64,
    pub max_per_query: usize,
    pub batch_size: usize,
    pub requests_per_minute: u32,
    pub similarity_threshold: f64,
    pub classifier_max_attempts: u32,
    pub http_timeout_secs: u64,
    pub render_timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
            country: "BR".to_string(),
            queries: vec![
                QueryGroup::new(
                    Category::Energy,
                    &[
                        "energia renovável",
                        "energia elétrica",
                        "energia solar",
                        "energia eólica",
                        "hidrelétrica",
                        "biomassa",
                        "biogás",
                        "biodiesel",
                        "petróleo",
                        "gás natural",
                        "óleo diesel",
                        "carvão mineral",
                        "usina termelétrica",
                        "combustível fóssil",
                        "combustíveis fósseis",
                    ],
                ),
                QueryGroup::new(
                    Category::Mining,
                    &[
                        "mineração",
                        "mineradora",
                        "extração mineral",
                        "lavra",
                        "jazida",
                        "garimpo",
                        "minério de ferro",
                        "ouro mineração",
                        "cobre mineração",
                        "níquel mineração",
                        "lítio mineração",
                        "bauxita mineração",
                        "fosfato",
                        "nióbio",
                        "urânio",
                    ],
                ),
            ],
            from_days_ago: 2,
            to_days_ago: 1,
            listing_lookback_days: 7,
            max_per_query: 5,
            batch_size: 10,
            requests_per_minute: 10,
            similarity_threshold: DEFAULT_THRESHOLD,
            classifier_max_attempts: DEFAULT_MAX_ATTEMPTS,
            http_timeout_secs: 10,
            render_timeout_secs: 15,
        }
    }
}

/// Inclusive date window searched by the dated providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

impl NewsConfig {
    /// Load the configuration from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(Path::new(p))?;
                let config: NewsConfig = serde_yaml::from_str(&raw)?;
                info!(path = p, "Loaded configuration file");
                config
            }
            None => {
                info!("No configuration file given; using defaults");
                NewsConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.requests_per_minute == 0 {
            return Err(NewsError::Config("requests_per_minute must be positive".into()));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(NewsError::Config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_per_query == 0 || self.batch_size == 0 {
            return Err(NewsError::Config(
                "max_per_query and batch_size must be positive".into(),
            ));
        }
        if self.classifier_max_attempts == 0 {
            return Err(NewsError::Config("classifier_max_attempts must be positive".into()));
        }
        if self.from_days_ago < self.to_days_ago {
            return Err(NewsError::Config(
                "from_days_ago must not be more recent than to_days_ago".into(),
            ));
        }
        if let Some(group) = self.queries.iter().find(|g| g.queries.is_empty()) {
            return Err(NewsError::Config(format!(
                "category {} has no queries",
                group.category
            )));
        }
        Ok(())
    }

    /// Search window relative to `today`.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        DateWindow {
            from: today - Duration::days(self.from_days_ago),
            to: today - Duration::days(self.to_days_ago),
        }
    }

    pub fn current_window(&self) -> DateWindow {
        self.window(Local::now().date_naive())
    }
}
