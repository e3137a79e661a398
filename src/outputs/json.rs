//! JSON report output.
//!
//! The file is a serialized [`Report`]: generation time, the category label
//! and the articles with their canonical dates (`YYYY-MM-DD` or `unknown`).

use super::{ReportSink, generated_at};
use crate::error::Result;
use crate::models::{Article, Report};
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct JsonReport {
    dir: PathBuf,
}

impl JsonReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSink for JsonReport {
    /// Write `{dir}/{output_name}.json`, creating `dir` if needed.
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display(), output_name = output_name))]
    async fn render(&self, articles: &[Article], output_name: &str, category_label: &str) -> Result<PathBuf> {
        let report = Report {
            generated_at: generated_at(),
            category_label: category_label.to_string(),
            articles: articles.to_vec(),
        };
        let json = serde_json::to_string_pretty(&report)?;

        if let Err(e) = fs::create_dir_all(&self.dir).await {
            error!(error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }

        let path = self.dir.join(format!("{output_name}.json"));
        fs::write(&path, json).await?;
        info!(path = %path.display(), count = articles.len(), "Wrote JSON report");
        Ok(path)
    }
}
