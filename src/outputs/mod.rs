//! Report generation for collected and classified articles.
//!
//! # Submodules
//!
//! - [`json`]: the report as a JSON document for other tools
//! - [`markdown`]: a readable report with one section per region or per source
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── noticias_brutas.json / .md                 # everything collected
//! ├── Energia_relevantes_13-10-2025.json / .md   # relevant energy news
//! ├── Mineracao_relevantes_13-10-2025.json / .md
//! └── Relatorio_Setorial_Completo_13102025.json / .md   # official sources run
//! ```

pub mod json;
pub mod markdown;

use crate::error::Result;
use crate::models::Article;
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info};

/// Destination for a finished list of articles.
pub trait ReportSink {
    /// Write `articles` as `output_name` under the sink's directory and
    /// return the path written.
    async fn render(&self, articles: &[Article], output_name: &str, category_label: &str) -> Result<PathBuf>;
}

/// How a report's sections are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Mundo, Brasil, Nordeste, Piauí.
    ByRegion,
    /// Official bodies in a fixed order, other sources alphabetically after them.
    BySource,
}

/// Local timestamp printed in report headers.
pub fn generated_at() -> String {
    Local::now().format("%d/%m/%Y %H:%M").to_string()
}

/// Writes every report as both JSON and Markdown.
pub struct ReportWriter {
    json: json::JsonReport,
    markdown: markdown::MarkdownReport,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, grouping: Grouping) -> Self {
        let dir = output_dir.into();
        Self {
            json: json::JsonReport::new(dir.clone()),
            markdown: markdown::MarkdownReport::new(dir, grouping),
        }
    }

    /// Write one report in both formats; a failing format is logged and the
    /// other is still written.
    pub async fn write(&self, articles: &[Article], output_name: &str, category_label: &str) -> Vec<PathBuf> {
        let mut written = Vec::new();
        match self.json.render(articles, output_name, category_label).await {
            Ok(path) => written.push(path),
            Err(e) => error!(output_name, error = %e, "Failed to write JSON report"),
        }
        match self.markdown.render(articles, output_name, category_label).await {
            Ok(path) => written.push(path),
            Err(e) => error!(output_name, error = %e, "Failed to write Markdown report"),
        }
        info!(output_name, files = written.len(), articles = articles.len(), "Report written");
        written
    }
}
