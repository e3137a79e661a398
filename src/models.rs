//! Data models for collected articles and their classification.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: canonical record every source adapter produces
//! - [`Category`] and [`Region`]: the closed enumerations an article is filed under
//! - [`Judgement`]: one per-article verdict returned by the classification model
//! - [`Report`]: the serialized form handed to the report sinks
//!
//! On the wire the enumerations keep the Portuguese labels the reports and the
//! classification prompt use (`Energia`, `Mineração`, `Piauí`, ...). The English
//! names are accepted as aliases when reading configuration or model output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text used in place of a publication date that could not be determined.
pub const UNKNOWN_DATE: &str = "unknown";

/// Topic an article is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Category {
    #[serde(rename = "Energia", alias = "Energy", alias = "energia")]
    Energy,
    #[serde(
        rename = "Mineração",
        alias = "Mining",
        alias = "Mineracao",
        alias = "mineração"
    )]
    Mining,
}

impl Category {
    /// Label used in reports and in the classification prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Energy => "Energia",
            Category::Mining => "Mineração",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Geographic scope of an article, from the most local to the most global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Region {
    #[serde(rename = "Piauí", alias = "Piaui")]
    Piaui,
    #[serde(rename = "Nordeste", alias = "Northeast")]
    Northeast,
    #[serde(rename = "Brasil", alias = "Brazil")]
    Brazil,
    #[serde(rename = "Mundo", alias = "World")]
    World,
}

impl Region {
    /// Order in which region sections appear in a report.
    pub const REPORT_ORDER: [Region; 4] =
        [Region::World, Region::Brazil, Region::Northeast, Region::Piaui];

    pub fn label(&self) -> &'static str {
        match self {
            Region::Piaui => "Piauí",
            Region::Northeast => "Nordeste",
            Region::Brazil => "Brasil",
            Region::World => "Mundo",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A news item in its canonical shape.
///
/// Adapters fill `source`, `title`, `summary`, `link` and `published_date`.
/// The collector assigns `category` and resets `region` to [`Region::World`];
/// the classifier later overwrites `relevant`, `summary`, `category` and `region`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    /// Display name of the outlet or provider.
    pub source: String,
    /// Headline, trimmed with inner whitespace collapsed.
    pub title: String,
    /// Short description; empty when the provider has none.
    #[serde(default)]
    pub summary: String,
    /// Absolute URL, the primary deduplication key.
    pub link: String,
    /// Publication date, `None` when it could not be determined.
    #[serde(with = "canonical_date", default)]
    pub published_date: Option<NaiveDate>,
    pub category: Category,
    pub region: Region,
    #[serde(default)]
    pub relevant: bool,
}

impl Article {
    pub fn new(
        source: impl Into<String>,
        title: &str,
        link: impl Into<String>,
        published_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            source: source.into(),
            title: normalize_text(title),
            summary: String::new(),
            link: link.into(),
            published_date,
            category: Category::Energy,
            region: Region::World,
            relevant: false,
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = normalize_text(summary);
        self
    }

    /// Publication date in its canonical `YYYY-MM-DD` form, or [`UNKNOWN_DATE`].
    pub fn date_label(&self) -> String {
        match self.published_date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => UNKNOWN_DATE.to_string(),
        }
    }
}

/// Trim a scraped string and collapse runs of whitespace into single spaces.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The model's verdict for one article of a batch.
///
/// Field names follow the JSON schema sent with the classification request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Judgement {
    /// Position of the article inside its batch (0-based).
    pub id_original: usize,
    pub relevante: bool,
    pub resumo: String,
    pub categoria: Category,
    pub regiao: Region,
}

impl Judgement {
    /// Fail-closed verdict used when the model gave no usable answer.
    pub fn not_relevant(index: usize, article: &Article) -> Self {
        Self {
            id_original: index,
            relevante: false,
            resumo: String::new(),
            categoria: article.category,
            regiao: article.region,
        }
    }

    pub fn apply_to(&self, article: &mut Article) {
        article.relevant = self.relevante;
        article.summary = self.resumo.trim().to_string();
        article.category = self.categoria;
        article.region = self.regiao;
    }
}

/// A rendered report: the articles plus when and under which label it was produced.
#[derive(Debug, Deserialize, Serialize)]
pub struct Report {
    /// Local generation timestamp, `dd/mm/YYYY HH:MM`.
    pub generated_at: String,
    /// Category label shown in the report title (e.g. "Energia", "Todas").
    pub category_label: String,
    pub articles: Vec<Article>,
}

/// Serializes `Option<NaiveDate>` as `YYYY-MM-DD` or the [`UNKNOWN_DATE`] sentinel.
mod canonical_date {
    use super::UNKNOWN_DATE;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => s.serialize_str(UNKNOWN_DATE),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
    }
}
