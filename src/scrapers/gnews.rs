//! GNews `/api/v4/search`.

use super::dates::parse_timestamp;
use super::{SourceAdapter, in_window, web_link};
use crate::config::DateWindow;
use crate::error::{NewsError, Result};
use crate::models::Article;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

const ENDPOINT: &str = "https://gnews.io/api/v4/search";
const MAX_RESULTS: &str = "10";

pub struct GNewsAdapter {
    client: reqwest::Client,
    api_key: String,
    language: String,
    window: DateWindow,
}

impl GNewsAdapter {
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

    fn request_url(&self, query: &str) -> Result<Url> {
        // GNews wants full timestamps; cover the whole last day of the window.
        let from = format!("{}T00:00:00Z", self.window.from.format("%Y-%m-%d"));
        let to = format!("{}T23:59:59Z", self.window.to.format("%Y-%m-%d"));
        Ok(Url::parse_with_params(
            ENDPOINT,
            &[
                ("q", query),
                ("lang", self.language.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("sortby", "publishedAt"),
                ("max", MAX_RESULTS),
                ("apikey", self.api_key.as_str()),
            ],
        )?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

/// Map a GNews response body to articles, skipping undated or link-less items.
pub fn parse_response(body: &str) -> Result<Vec<Article>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    if let Some(errors) = response.errors {
        return Err(NewsError::Parse(format!("GNews errors: {errors}")));
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.trim().is_empty())?;
            let link = item.url.as_deref().and_then(web_link)?;
            let date = item.published_at.as_deref().and_then(parse_timestamp)?;
            let source = item
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "GNews".to_string());
            Some(
                Article::new(source, &title, link, Some(date))
                    .with_summary(item.description.as_deref().unwrap_or_default()),
            )
        })
        .collect())
}

#[async_trait]
impl SourceAdapter for GNewsAdapter {
    fn name(&self) -> &str {
        "GNews"
    }

    #[instrument(level = "debug", skip(self))]
    async fn try_fetch(&self, query: &str) -> Result<Vec<Article>> {
        let url = self.request_url(query)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // The request URL carries the key; report the endpoint only.
            return Err(NewsError::Status {
                url: ENDPOINT.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(in_window(parse_response(&response.text().await?)?, &self.window))
    }
}
