//! News source adapters.
//!
//! Every source, whether a search API or a scraped page, implements
//! [`SourceAdapter`] and hands back canonical [`Article`]s. The collector only
//! ever calls [`SourceAdapter::fetch`], which never fails: a source that is
//! down, slow or has changed its markup is logged and contributes nothing.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Dates |
//! |--------|--------|--------|-------|
//! | NewsAPI | [`newsapi`] | JSON API, exact-phrase search | from the API, required |
//! | GNews | [`gnews`] | JSON API | from the API, required |
//! | Google News | [`google_news`] | search results page | relative ("há 2 horas"), required |
//! | Meio Norte, Cidade Verde, O Dia | [`site_search`] | site search pages | none, kept as unknown |
//! | MME, EPE, Agência Petrobras | [`listings`] | news listing pages | `dd/mm/yyyy`, last N days |
//! | ONS | [`listings`] + [`render`] | JavaScript-rendered listing | day + month abbreviation, last N days |
//!
//! Listing sources ignore the query: they read the same page every time and
//! are meant to be run once per report.

pub mod dates;
pub mod gnews;
pub mod google_news;
pub mod listings;
pub mod newsapi;
pub mod render;
pub mod site_search;

use crate::config::DateWindow;
use crate::error::{NewsError, Result};
use crate::models::Article;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// One request to the provider, mapped to canonical articles.
    async fn try_fetch(&self, query: &str) -> Result<Vec<Article>>;

    /// [`try_fetch`](Self::try_fetch) with failures logged and turned into an empty result.
    async fn fetch(&self, query: &str) -> Vec<Article> {
        match self.try_fetch(query).await {
            Ok(articles) => {
                info!(adapter = self.name(), query, count = articles.len(), "Fetched articles");
                articles
            }
            Err(e) => {
                warn!(adapter = self.name(), query, error = %e, "Source failed; continuing without it");
                Vec::new()
            }
        }
    }
}

/// Shared HTTP client for all adapters.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// GET `url` and return its body, treating non-2xx statuses as errors.
#[instrument(level = "debug", skip(client))]
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(NewsError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().await?;
    debug!(bytes = body.len(), "Downloaded page");
    Ok(body)
}

/// Resolve `href` against the provider's base URL.
///
/// Absolute links are kept, protocol-relative ones get `https:`, and anything
/// else is appended to `base`. Returns `None` for links that still don't parse
/// as http(s) URLs.
pub fn absolute_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let candidate = if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/'))
    };
    web_link(&candidate)
}

/// `raw` as an absolute http(s) URL, or `None` for relative or malformed links.
pub fn web_link(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// Drop articles published outside `window`.
pub(crate) fn in_window(articles: Vec<Article>, window: &DateWindow) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| a.published_date.is_some_and(|d| window.contains(d)))
        .collect()
}

/// Drop tracking parameters appended after the first `&` (`&ved=`, `&usg=`, ...).
pub fn strip_tracking(link: &str) -> &str {
    link.split('&').next().unwrap_or(link)
}

/// Scraped text of an element, whitespace-normalized.
pub(crate) fn element_text(element: &scraper::ElementRef<'_>) -> String {
    crate::models::normalize_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn selector(css: &str) -> Result<scraper::Selector> {
    scraper::Selector::parse(css).map_err(|e| NewsError::Parse(format!("invalid selector {css:?}: {e}")))
}
