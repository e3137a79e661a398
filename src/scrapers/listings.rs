//! News listings of official energy-sector bodies.
//!
//! Each listing page is read as a whole (the query is ignored) and only items
//! published within the last `lookback_days` days are kept. Items whose date
//! can't be read are dropped.

use super::dates::{day_month_in_past, month_number, parse_dmy};
use super::render::{PageRenderer, render_page};
use super::{SourceAdapter, absolute_link, element_text, get_text, selector};
use crate::error::{NewsError, Result};
use crate::models::Article;
use async_trait::async_trait;
use chrono::{Duration as Days, Local, NaiveDate};
use scraper::{ElementRef, Html};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Official sources with a news listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficialSource {
    Mme,
    Ons,
    Epe,
    Petrobras,
}

impl OfficialSource {
    /// Source name written on every article.
    pub fn label(&self) -> &'static str {
        match self {
            OfficialSource::Mme => "Ministério de Minas e Energia (MME)",
            OfficialSource::Ons => "Operador Nacional do Sistema Elétrico (ONS)",
            OfficialSource::Epe => "Empresa de Pesquisa Energética (EPE)",
            OfficialSource::Petrobras => "Agência Petrobras de Notícias",
        }
    }

    pub fn listing_url(&self) -> &'static str {
        match self {
            OfficialSource::Mme => "https://www.gov.br/mme/pt-br/assuntos/noticias",
            OfficialSource::Ons => "https://www.ons.org.br/paginas/imprensa/noticias",
            OfficialSource::Epe => "https://www.epe.gov.br/pt/imprensa/noticias/area",
            OfficialSource::Petrobras => "https://agencia.petrobras.com.br/mais-recentes",
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            OfficialSource::Mme => "https://www.gov.br/mme",
            OfficialSource::Ons => "https://www.ons.org.br",
            OfficialSource::Epe => "https://www.epe.gov.br",
            OfficialSource::Petrobras => "https://agencia.petrobras.com.br",
        }
    }

    /// Extract every dated item of the listing page.
    pub fn parse(&self, html: &str, today: NaiveDate) -> Result<Vec<Article>> {
        let document = Html::parse_document(html);
        match self {
            OfficialSource::Mme => parse_mme(&document),
            OfficialSource::Ons => parse_ons(&document, today),
            OfficialSource::Epe => parse_epe(&document),
            OfficialSource::Petrobras => parse_petrobras(&document),
        }
    }
}

fn first_text(item: &ElementRef<'_>, sel: &scraper::Selector) -> Option<String> {
    item.select(sel).next().map(|e| element_text(&e))
}

fn listing_article(
    source: OfficialSource,
    title: String,
    href: Option<&str>,
    date: NaiveDate,
    summary: &str,
) -> Option<Article> {
    if title.is_empty() {
        return None;
    }
    let link = absolute_link(source.base_url(), href?)?;
    Some(Article::new(source.label(), &title, link, Some(date)).with_summary(summary))
}

fn parse_mme(document: &Html) -> Result<Vec<Article>> {
    let item_sel = selector("div.conteudo")?;
    let link_sel = selector("h2.titulo a")?;
    let desc_sel = selector("span.descricao")?;
    let date_sel = selector("span.data")?;

    Ok(document
        .select(&item_sel)
        .filter_map(|item| {
            let a = item.select(&link_sel).next()?;
            let date = parse_dmy(&first_text(&item, &date_sel)?)?;
            // The description starts with the date: "26/09/2025 - Texto".
            let summary = first_text(&item, &desc_sel).unwrap_or_default();
            let summary = summary.rsplit('-').next().unwrap_or_default();
            listing_article(OfficialSource::Mme, element_text(&a), a.value().attr("href"), date, summary)
        })
        .collect())
}

fn parse_epe(document: &Html) -> Result<Vec<Article>> {
    let item_sel = selector("div.item")?;
    let link_sel = selector("a")?;
    let date_sel = selector("span.date")?;
    let desc_sel = selector("p.small")?;

    Ok(document
        .select(&item_sel)
        .filter_map(|item| {
            let a = item.select(&link_sel).next()?;
            let raw_date = first_text(&item, &date_sel)?;
            let date = parse_dmy(raw_date.split_whitespace().next()?)?;
            let summary = first_text(&item, &desc_sel)
                .map(|text| epe_summary(&text))
                .unwrap_or_default();
            listing_article(OfficialSource::Epe, element_text(&a), a.value().attr("href"), date, &summary)
        })
        .collect())
}

/// "26/09/2025 - Texto. Leia mais" becomes "Texto."
fn epe_summary(text: &str) -> String {
    let body = text.split_once('-').map(|(_, rest)| rest).unwrap_or(text).trim();
    match body.rsplit_once('.') {
        Some((sentences, _)) => format!("{}.", sentences.trim()),
        None if body.is_empty() => String::new(),
        None => format!("{body}."),
    }
}

fn parse_petrobras(document: &Html) -> Result<Vec<Article>> {
    let item_sel = selector("div.text-container")?;
    let link_sel = selector("a.editorial-news-card-link")?;
    let date_sel = selector("div.date")?;

    let blocks: Vec<_> = document.select(&item_sel).collect();
    if blocks.is_empty() {
        return Err(NewsError::Parse(
            "no div.text-container blocks on the Petrobras listing; the layout may have changed".into(),
        ));
    }

    Ok(blocks
        .into_iter()
        .filter_map(|item| {
            let a = item.select(&link_sel).next()?;
            let raw_date = first_text(&item, &date_sel)?;
            let date = parse_dmy(raw_date.split_whitespace().last()?)?;
            let summary = item
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "p")
                .map(|p| element_text(&p))
                .unwrap_or_default();
            listing_article(OfficialSource::Petrobras, element_text(&a), a.value().attr("href"), date, &summary)
        })
        .collect())
}

fn parse_ons(document: &Html, today: NaiveDate) -> Result<Vec<Article>> {
    let item_sel = selector("div.noticia")?;
    let day_sel = selector("div.data p")?;
    let month_sel = selector("div.data span")?;
    let link_sel = selector("div.info a")?;
    let desc_sel = selector("div.info p")?;

    Ok(document
        .select(&item_sel)
        .filter_map(|item| {
            let day: u32 = first_text(&item, &day_sel)?.parse().ok()?;
            let month = month_number(&first_text(&item, &month_sel)?)?;
            // The listing shows no year.
            let date = day_month_in_past(day, month, today)?;
            let a = item.select(&link_sel).next()?;
            let summary = first_text(&item, &desc_sel).unwrap_or_default();
            listing_article(OfficialSource::Ons, element_text(&a), a.value().attr("href"), date, &summary)
        })
        .collect())
}

/// Keep articles published on or after `today - lookback_days`.
pub fn within_lookback(articles: Vec<Article>, today: NaiveDate, lookback_days: i64) -> Vec<Article> {
    let oldest = today - Days::days(lookback_days);
    articles
        .into_iter()
        .filter(|a| a.published_date.is_some_and(|d| d >= oldest))
        .collect()
}

/// Listing served as plain HTML.
pub struct ListingAdapter {
    client: reqwest::Client,
    source: OfficialSource,
    lookback_days: i64,
}

impl ListingAdapter {
    pub fn new(client: reqwest::Client, source: OfficialSource, lookback_days: i64) -> Self {
        Self {
            client,
            source,
            lookback_days,
        }
    }
}

#[async_trait]
impl SourceAdapter for ListingAdapter {
    fn name(&self) -> &str {
        self.source.label()
    }

    #[instrument(level = "debug", skip(self), fields(source = self.source.label()))]
    async fn try_fetch(&self, _query: &str) -> Result<Vec<Article>> {
        let html = get_text(&self.client, self.source.listing_url()).await?;
        let today = Local::now().date_naive();
        let all = self.source.parse(&html, today)?;
        debug!(listed = all.len(), "Parsed listing");
        Ok(within_lookback(all, today, self.lookback_days))
    }
}

/// ONS listing, which only exists after its JavaScript runs.
pub struct OnsAdapter {
    renderer: Arc<dyn PageRenderer>,
    lookback_days: i64,
    timeout: Duration,
}

impl OnsAdapter {
    /// Marker element the page must show before it is read.
    const READY_SELECTOR: &'static str = ".noticia";

    pub fn new(renderer: Arc<dyn PageRenderer>, lookback_days: i64, timeout: Duration) -> Self {
        Self {
            renderer,
            lookback_days,
            timeout,
        }
    }
}

#[async_trait]
impl SourceAdapter for OnsAdapter {
    fn name(&self) -> &str {
        OfficialSource::Ons.label()
    }

    #[instrument(level = "debug", skip(self))]
    async fn try_fetch(&self, _query: &str) -> Result<Vec<Article>> {
        let renderer = Arc::clone(&self.renderer);
        let timeout = self.timeout;
        let html = tokio::task::spawn_blocking(move || {
            render_page(
                renderer.as_ref(),
                OfficialSource::Ons.listing_url(),
                Self::READY_SELECTOR,
                timeout,
            )
        })
        .await
        .map_err(|e| NewsError::Render(format!("render task failed: {e}")))??;

        let today = Local::now().date_naive();
        let all = OfficialSource::Ons.parse(&html, today)?;
        Ok(within_lookback(all, today, self.lookback_days))
    }
}
