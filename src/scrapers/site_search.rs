//! Search pages of local Piauí outlets.
//!
//! These pages list matching headlines without dates, so the articles carry
//! an unknown date and sort after every dated result.

use super::{SourceAdapter, absolute_link, element_text, get_text, selector};
use crate::error::Result;
use crate::models::Article;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::instrument;

/// One outlet's search page and the selector for its result links.
#[derive(Debug, Clone)]
pub struct SiteSearchAdapter {
    client: reqwest::Client,
    name: String,
    search_url: String,
    base_url: String,
    link_selector: String,
}

impl SiteSearchAdapter {
    pub fn new(
        client: reqwest::Client,
        name: impl Into<String>,
        search_url: impl Into<String>,
        base_url: impl Into<String>,
        link_selector: impl Into<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            search_url: search_url.into(),
            base_url: base_url.into(),
            link_selector: link_selector.into(),
        }
    }

    pub fn meio_norte(client: reqwest::Client) -> Self {
        Self::new(
            client,
            "Meio Norte",
            "https://www.meionorte.com/busca?q=",
            "https://www.meionorte.com",
            ".busca-resultados a",
        )
    }

    pub fn cidade_verde(client: reqwest::Client) -> Self {
        Self::new(
            client,
            "Cidade Verde",
            "https://cidadeverde.com/busca?q=",
            "https://cidadeverde.com",
            ".title a",
        )
    }

    pub fn o_dia(client: reqwest::Client) -> Self {
        Self::new(
            client,
            "O Dia PI",
            "https://odia.com.br/busca?q=",
            "https://odia.com.br",
            ".search-result a",
        )
    }

    /// Search URL with the query form-encoded (spaces as `+`).
    fn request_url(&self, query: &str) -> String {
        format!("{}{}", self.search_url, urlencoding::encode(query).replace("%20", "+"))
    }

    /// Result links of a search page; each link text is the headline.
    pub fn parse_results(&self, html: &str) -> Result<Vec<Article>> {
        let document = scraper::Html::parse_document(html);
        let link_sel = selector(&self.link_selector)?;
        let mut seen = HashSet::new();

        let articles = document
            .select(&link_sel)
            .filter_map(|a| {
                let title = element_text(&a);
                let link = absolute_link(&self.base_url, a.value().attr("href")?)?;
                (!title.is_empty() && seen.insert(link.clone()))
                    .then(|| Article::new(self.name.clone(), &title, link, None))
            })
            .collect();
        Ok(articles)
    }
}

#[async_trait]
impl SourceAdapter for SiteSearchAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip(self), fields(site = %self.name))]
    async fn try_fetch(&self, query: &str) -> Result<Vec<Article>> {
        let html = get_text(&self.client, &self.request_url(query)).await?;
        self.parse_results(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let adapter = SiteSearchAdapter::meio_norte(reqwest::Client::new());
        assert_eq!(
            adapter.request_url("energia solar"),
            "https://www.meionorte.com/busca?q=energia+solar"
        );
        assert_eq!(
            adapter.request_url("mineração"),
            "https://www.meionorte.com/busca?q=minera%C3%A7%C3%A3o"
        );
    }

    #[test]
    fn test_parse_results() {
        let html = r#"
        <div class="busca-resultados">
          <a href="/noticias/piaui/usina-solar-123">Usina solar em  São João do Piauí</a>
          <a href="https://www.meionorte.com/noticias/mineracao-456">Mineração de níquel</a>
          <a href="/noticias/piaui/usina-solar-123">Usina solar (repetida)</a>
          <a href="/noticias/vazia"></a>
          <a>Sem link</a>
        </div>
        <a href="/fora-dos-resultados">Fora</a>
        "#;
        let adapter = SiteSearchAdapter::meio_norte(reqwest::Client::new());
        let articles = adapter.parse_results(html).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Meio Norte");
        assert_eq!(articles[0].title, "Usina solar em São João do Piauí");
        assert_eq!(
            articles[0].link,
            "https://www.meionorte.com/noticias/piaui/usina-solar-123"
        );
        assert_eq!(articles[0].published_date, None);
        assert_eq!(articles[1].link, "https://www.meionorte.com/noticias/mineracao-456");
    }

    #[test]
    fn test_other_outlets_use_their_selectors() {
        let html = r#"<h2 class="title"><a href="/noticia/1">Biogás no Piauí</a></h2>
                      <div class="search-result"><a href="/n/2">Fosfato</a></div>"#;
        let cidade_verde = SiteSearchAdapter::cidade_verde(reqwest::Client::new());
        let o_dia = SiteSearchAdapter::o_dia(reqwest::Client::new());
        let cv = cidade_verde.parse_results(html).unwrap();
        let od = o_dia.parse_results(html).unwrap();
        assert_eq!(cv.len(), 1);
        assert_eq!(cv[0].link, "https://cidadeverde.com/noticia/1");
        assert_eq!(od.len(), 1);
        assert_eq!(od[0].source, "O Dia PI");
    }
}
