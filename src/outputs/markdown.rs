//! Markdown report output.
//!
//! ```text
//! # Relatório de Notícias - Energia
//!
//! Data de geração: 13/10/2025 09:00
//!
//! ## Mundo
//!
//! 1. [Título](https://link)
//!    - Resumo: ...
//!    - Fonte: ...
//!    - Data: 2025-10-12
//! ```

use super::{Grouping, ReportSink, generated_at};
use crate::error::Result;
use crate::models::{Article, Region};
use crate::scrapers::listings::OfficialSource;
use itertools::Itertools;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Section order of the official-sources report. ANEEL has no adapter but
/// keeps its slot so reports line up with earlier editions.
const SOURCE_ORDER: [&str; 5] = [
    "Ministério de Minas e Energia (MME)",
    "Operador Nacional do Sistema Elétrico (ONS)",
    "Agência Nacional de Energia Elétrica (ANEEL)",
    "Empresa de Pesquisa Energética (EPE)",
    "Agência Petrobras de Notícias",
];

#[derive(Debug, Clone)]
pub struct MarkdownReport {
    dir: PathBuf,
    grouping: Grouping,
}

impl MarkdownReport {
    pub fn new(dir: impl Into<PathBuf>, grouping: Grouping) -> Self {
        Self {
            dir: dir.into(),
            grouping,
        }
    }
}

impl ReportSink for MarkdownReport {
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display(), output_name = output_name))]
    async fn render(&self, articles: &[Article], output_name: &str, category_label: &str) -> Result<PathBuf> {
        let md = report_to_markdown(articles, category_label, &generated_at(), self.grouping);
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{output_name}.md"));
        fs::write(&path, md).await?;
        info!(path = %path.display(), "Wrote Markdown report");
        Ok(path)
    }
}

/// Sections in display order, each with its articles in input order.
fn sections<'a>(articles: &'a [Article], grouping: Grouping) -> Vec<(String, Vec<&'a Article>)> {
    match grouping {
        Grouping::ByRegion => Region::REPORT_ORDER
            .iter()
            .map(|region| {
                let items: Vec<_> = articles.iter().filter(|a| a.region == *region).collect();
                (region.label().to_string(), items)
            })
            .filter(|(_, items)| !items.is_empty())
            .collect(),
        Grouping::BySource => articles
            .iter()
            .into_group_map_by(|a| a.source.clone())
            .into_iter()
            .sorted_by(|(a, _), (b, _)| source_rank(a).cmp(&source_rank(b)).then_with(|| a.cmp(b)))
            .collect(),
    }
}

/// Position in [`SOURCE_ORDER`]; unlisted sources come after all of them.
fn source_rank(source: &str) -> usize {
    SOURCE_ORDER
        .iter()
        .position(|s| *s == source)
        .unwrap_or(SOURCE_ORDER.len())
}

/// Render a full report.
pub fn report_to_markdown(
    articles: &[Article],
    category_label: &str,
    generated_at: &str,
    grouping: Grouping,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Relatório de Notícias - {category_label}\n");
    let _ = writeln!(md, "Data de geração: {generated_at}\n");

    if grouping == Grouping::BySource {
        let bodies = [
            OfficialSource::Mme,
            OfficialSource::Ons,
            OfficialSource::Epe,
            OfficialSource::Petrobras,
        ]
        .iter()
        .map(|s| s.label())
        .join(", ");
        let _ = writeln!(md, "Fontes consultadas: {bodies}\n");
    }

    if articles.is_empty() {
        md.push_str("_Nenhuma notícia encontrada._\n");
        return md;
    }

    for (heading, items) in sections(articles, grouping) {
        let _ = writeln!(md, "## {heading}\n");
        for (i, article) in items.iter().enumerate() {
            let _ = writeln!(md, "{}. [{}]({})", i + 1, escape_link_text(&article.title), article.link);
            if !article.summary.is_empty() {
                let _ = writeln!(md, "   - Resumo: {}", article.summary);
            }
            let _ = writeln!(md, "   - Fonte: {}", article.source);
            let _ = writeln!(md, "   - Data: {}", article.date_label());
        }
        md.push('\n');
    }
    md
}

fn escape_link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article(source: &str, title: &str, region: Region) -> Article {
        let mut a = Article::new(source, title, format!("https://x/{title}"), NaiveDate::from_ymd_opt(2025, 10, 12));
        a.region = region;
        a
    }

    #[test]
    fn test_region_sections_in_fixed_order() {
        let articles = vec![
            article("g1", "Piaui1", Region::Piaui),
            article("g1", "Mundo1", Region::World),
            article("g1", "Brasil1", Region::Brazil),
            article("g1", "Piaui2", Region::Piaui),
        ];
        let md = report_to_markdown(&articles, "Energia", "13/10/2025 09:00", Grouping::ByRegion);

        let mundo = md.find("## Mundo").unwrap();
        let brasil = md.find("## Brasil").unwrap();
        let piaui = md.find("## Piauí").unwrap();
        assert!(mundo < brasil && brasil < piaui);
        assert!(!md.contains("## Nordeste"));
        assert!(md.starts_with("# Relatório de Notícias - Energia"));
        assert!(md.contains("2. [Piaui2](https://x/Piaui2)"));
        assert!(md.contains("   - Data: 2025-10-12"));
    }

    #[test]
    fn test_summary_line_only_when_present() {
        let mut with_summary = article("Valor", "Com", Region::Brazil);
        with_summary.summary = "Resumo curto.".into();
        let without = article("Valor", "Sem", Region::Brazil);
        let md = report_to_markdown(&[with_summary, without], "Todas", "x", Grouping::ByRegion);
        assert_eq!(md.matches("Resumo:").count(), 1);
        assert_eq!(md.matches("Fonte: Valor").count(), 2);
    }

    #[test]
    fn test_source_sections() {
        let articles = vec![
            article("Agência Petrobras de Notícias", "P", Region::World),
            article("Zeta Blog", "Z", Region::World),
            article("Empresa de Pesquisa Energética (EPE)", "E", Region::World),
            article("Ministério de Minas e Energia (MME)", "M", Region::World),
            article("Alfa Notícias", "A", Region::World),
        ];
        let md = report_to_markdown(&articles, "Setor de Energia e Petróleo", "x", Grouping::BySource);
        let order: Vec<usize> = [
            "## Ministério de Minas e Energia (MME)",
            "## Empresa de Pesquisa Energética (EPE)",
            "## Agência Petrobras de Notícias",
            "## Alfa Notícias",
            "## Zeta Blog",
        ]
        .iter()
        .map(|h| md.find(h).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_report() {
        let md = report_to_markdown(&[], "Todas", "x", Grouping::ByRegion);
        assert!(md.contains("Nenhuma notícia"));
    }

    #[test]
    fn test_escape_link_text() {
        assert_eq!(escape_link_text("[Vídeo] Usina"), "\\[Vídeo\\] Usina");
    }

    #[tokio::test]
    async fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownReport::new(dir.path(), Grouping::ByRegion);
        let path = sink
            .render(&[article("g1", "T", Region::World)], "Energia_relevantes_13-10-2025", "Energia")
            .await
            .unwrap();
        let md = std::fs::read_to_string(path).unwrap();
        assert!(md.contains("## Mundo"));
    }
}
