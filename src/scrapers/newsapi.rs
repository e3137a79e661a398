//! NewsAPI `/v2/everything` search.

use super::{SourceAdapter, in_window, web_link};
use super::dates::parse_timestamp;
use crate::config::DateWindow;
use crate::error::{NewsError, Result};
use crate::models::Article;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

const ENDPOINT: &str = "https://newsapi.org/v2/everything";

/// Placeholder NewsAPI returns in place of articles that were taken down.
const REMOVED: &str = "[Removed]";

pub struct NewsApiAdapter {
    client: reqwest::Client,
    api_key: String,
    language: String,
    window: DateWindow,
}

impl NewsApiAdapter {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        language: impl Into<String>,
        window: DateWindow,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            language: language.into(),
            window,
        }
    }

    /// Exact-phrase search restricted to the configured window, newest first.
    fn request_url(&self, query: &str) -> Result<Url> {
        let from = self.window.from.format("%Y-%m-%d").to_string();
        let to = self.window.to.format("%Y-%m-%d").to_string();
        Ok(Url::parse_with_params(
            ENDPOINT,
            &[
                ("q", format!("\"{query}\"")),
                ("language", self.language.clone()),
                ("from", from),
                ("to", to),
                ("sortBy", "publishedAt".to_string()),
            ],
        )?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

/// Map a NewsAPI response body to articles.
///
/// Items without a title, link or readable `publishedAt`, and items NewsAPI
/// marks as removed, are skipped.
pub fn parse_response(body: &str) -> Result<Vec<Article>> {
    let response: EverythingResponse = serde_json::from_str(body)?;
    if response.status != "ok" {
        return Err(NewsError::Parse(format!(
            "NewsAPI status {}: {}",
            response.status,
            response.message.unwrap_or_default()
        )));
    }

    let articles = response
        .articles
        .into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.trim().is_empty() && t != REMOVED)?;
            let link = item.url.as_deref().and_then(web_link)?;
            let date = item.published_at.as_deref().and_then(parse_timestamp)?;
            let source = item
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "NewsAPI".to_string());
            Some(
                Article::new(source, &title, link, Some(date))
                    .with_summary(item.description.as_deref().unwrap_or_default()),
            )
        })
        .collect();
    Ok(articles)
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    #[instrument(level = "debug", skip(self))]
    async fn try_fetch(&self, query: &str) -> Result<Vec<Article>> {
        let url = self.request_url(query)?;
        let response = self
            .client
            .get(url.clone())
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "NewsAPI response");
        Ok(in_window(parse_response(&body)?, &self.window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const BODY: &str = r#"{
        "status": "ok",
        "totalResults": 4,
        "articles": [
            {
                "source": {"id": null, "name": "Valor Econômico"},
                "title": "Petrobras  anuncia nova descoberta",
                "description": "Poço no pré-sal.",
                "url": "https://valor.globo.com/a",
                "publishedAt": "2025-10-12T14:03:00Z"
            },
            {
                "source": {"id": null, "name": "[Removed]"},
                "title": "[Removed]",
                "description": "[Removed]",
                "url": "https://removed.com",
                "publishedAt": "1970-01-01T00:00:00Z"
            },
            {
                "source": {"name": "Sem Data"},
                "title": "Notícia sem data",
                "url": "https://x.com/b",
                "publishedAt": null
            },
            {
                "source": {"name": "Reuters"},
                "title": "Lithium prices",
                "description": null,
                "url": "https://reuters.com/c",
                "publishedAt": "2025-10-11T08:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn test_parse_response() {
        let articles = parse_response(BODY).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Valor Econômico");
        assert_eq!(articles[0].title, "Petrobras anuncia nova descoberta");
        assert_eq!(articles[0].summary, "Poço no pré-sal.");
        assert_eq!(articles[0].published_date, NaiveDate::from_ymd_opt(2025, 10, 12));
        assert_eq!(articles[1].summary, "");
    }

    #[test]
    fn test_error_status_is_an_error() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"bad key"}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_relative_links_are_dropped() {
        let body = r#"{
            "status": "ok",
            "articles": [
                {"source": {"name": "A"}, "title": "Relativo", "url": "/relative/path", "publishedAt": "2025-10-12T10:00:00Z"},
                {"source": {"name": "B"}, "title": "Absoluto", "url": "https://b.com/x", "publishedAt": "2025-10-12T10:00:00Z"}
            ]
        }"#;
        let links: Vec<_> = parse_response(body).unwrap().into_iter().map(|a| a.link).collect();
        assert_eq!(links, vec!["https://b.com/x"]);
    }

    #[test]
    fn test_in_window() {
        let window = DateWindow {
            from: NaiveDate::from_ymd_opt(2025, 10, 11).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 10, 12).unwrap(),
        };
        let kept = in_window(parse_response(BODY).unwrap(), &window);
        assert_eq!(kept.len(), 2);
        let narrow = DateWindow { from: window.to, to: window.to };
        let kept = in_window(parse_response(BODY).unwrap(), &narrow);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, "Valor Econômico");
    }

    #[test]
    fn test_request_url_quotes_query() {
        let window = DateWindow {
            from: NaiveDate::from_ymd_opt(2025, 10, 11).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 10, 12).unwrap(),
        };
        let adapter = NewsApiAdapter::new(reqwest::Client::new(), "k", "pt", window);
        let url = adapter.request_url("energia solar").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".into(), "\"energia solar\"".into())));
        assert!(pairs.contains(&("from".into(), "2025-10-11".into())));
        assert!(pairs.contains(&("to".into(), "2025-10-12".into())));
        assert!(pairs.contains(&("sortBy".into(), "publishedAt".into())));
        assert!(!url.as_str().contains("apiKey"));
    }
}
