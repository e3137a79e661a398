//! Google News results scraped from the `tbm=nws` search page (last 24 hours).
//!
//! Dates on this page are relative ("há 3 horas", "ontem") or `dd/mm/yyyy`;
//! results whose date can't be resolved are dropped.

use super::dates::parse_human_date;
use super::{SourceAdapter, element_text, get_text, selector, strip_tracking};
use crate::error::Result;
use crate::models::Article;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

const SEARCH_URL: &str = "https://www.google.com/search";

pub struct GoogleNewsAdapter {
    client: reqwest::Client,
    language: String,
    country: String,
}

impl GoogleNewsAdapter {
    pub fn new(client: reqwest::Client, language: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
            country: country.into(),
        }
    }

    fn request_url(&self, query: &str) -> Result<Url> {
        Ok(Url::parse_with_params(
            SEARCH_URL,
            &[
                ("q", query),
                ("tbm", "nws"),
                ("hl", self.language.as_str()),
                ("gl", self.country.as_str()),
                ("tbs", "qdr:d"),
            ],
        )?)
    }
}

/// Target of a result link, unwrapping Google's `/url?q=` redirect.
fn result_link(href: &str) -> Option<String> {
    let target = match href.strip_prefix("/url?") {
        Some(params) => {
            let encoded = params
                .split('&')
                .find_map(|kv| kv.strip_prefix("q=").or_else(|| kv.strip_prefix("url=")))?;
            urlencoding::decode(encoded).ok()?.into_owned()
        }
        None => href.to_string(),
    };
    let target = strip_tracking(&target);
    (target.starts_with("http://") || target.starts_with("https://")).then(|| target.to_string())
}

/// Extract articles from a Google News results page.
pub fn parse_results(html: &str, today: NaiveDate) -> Result<Vec<Article>> {
    let document = Html::parse_document(html);
    let item_sel = selector("div.SoaBEf")?;
    let link_sel = selector("a[href]")?;
    let title_sel = selector(r#"div[role="heading"]"#)?;
    let media_sel = selector(".NUnG9d span, .MgUUmf span, .CEMjEf span")?;
    let date_sel = selector(".OSrXXb span, .LfVVr")?;
    let desc_sel = selector(".GI74Re")?;

    let mut articles = Vec::new();
    for item in document.select(&item_sel) {
        let Some(link) = item
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(result_link)
        else {
            continue;
        };
        let Some(title) = item.select(&title_sel).next().map(|e| element_text(&e)) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let date = item
            .select(&date_sel)
            .map(|e| element_text(&e))
            .find_map(|text| parse_human_date(&text, today));
        let Some(date) = date else {
            debug!(%link, "Dropping Google News result without a readable date");
            continue;
        };
        let media = item
            .select(&media_sel)
            .next()
            .map(|e| element_text(&e))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Google News".to_string());
        let summary = item
            .select(&desc_sel)
            .next()
            .map(|e| element_text(&e))
            .unwrap_or_default();

        articles.push(Article::new(media, &title, link, Some(date)).with_summary(&summary));
    }
    Ok(articles)
}

#[async_trait]
impl SourceAdapter for GoogleNewsAdapter {
    fn name(&self) -> &str {
        "Google News"
    }

    #[instrument(level = "debug", skip(self))]
    async fn try_fetch(&self, query: &str) -> Result<Vec<Article>> {
        let url = self.request_url(query)?;
        let html = get_text(&self.client, url.as_str()).await?;
        parse_results(&html, Local::now().date_naive())
    }
}
