//! LLM API interaction.
//!
//! This module provides the seam between the classifier and the language
//! model that judges articles:
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`GeminiClient`]: Google Gemini `generateContent` backend, asking for a
//!   JSON array that matches [`judgement_schema`]
//!
//! Retrying and rate limiting are the caller's job (see [`super::Classifier`]);
//! a client makes exactly one HTTP request per [`AskAsync::ask`].

use crate::error::{NewsError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its raw text answer.
pub trait AskAsync {
    /// Send `text` to the model and return the text of its reply.
    async fn ask(&self, text: &str) -> Result<String>;
}

/// Response schema sent along with every classification request.
///
/// One object per article, keyed back to the batch by `id_original`.
pub fn judgement_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id_original": {
                    "type": "INTEGER",
                    "description": "Índice da notícia no lote, exatamente como recebido."
                },
                "relevante": {
                    "type": "BOOLEAN",
                    "description": "True se a notícia for relevante para o Piauí em energia ou mineração."
                },
                "resumo": {
                    "type": "STRING",
                    "description": "Resumo curto em 1 frase."
                },
                "categoria": {
                    "type": "STRING",
                    "enum": ["Energia", "Mineração"]
                },
                "regiao": {
                    "type": "STRING",
                    "enum": ["Piauí", "Nordeste", "Brasil", "Mundo"]
                }
            },
            "required": ["id_original", "relevante", "resumo", "categoria", "regiao"]
        }
    })
}

/// Google Gemini client forcing structured JSON output.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }

    fn request_body(text: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": judgement_schema()
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

/// Concatenated text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(NewsError::Schema("model returned no text".to_string()));
    }
    Ok(text)
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<String> {
        let t0 = Instant::now();
        let url = self.endpoint();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Gemini call failed"
            );
            return Err(NewsError::Status {
                url: self.endpoint(),
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        if let Some(usage) = &body.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Gemini usage"
            );
        }
        response_text(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_enumerations() {
        let schema = judgement_schema();
        assert_eq!(schema["type"], "ARRAY");
        let props = &schema["items"]["properties"];
        assert_eq!(props["categoria"]["enum"], json!(["Energia", "Mineração"]));
        assert_eq!(
            props["regiao"]["enum"],
            json!(["Piauí", "Nordeste", "Brasil", "Mundo"])
        );
        assert_eq!(schema["items"]["required"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_request_body_forces_json() {
        let body = GeminiClient::request_body("olá");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "olá");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_endpoint_and_debug_redacts_key() {
        let client = GeminiClient::new("secret", "gemini-x", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9999/models/");
        assert_eq!(client.endpoint(), "http://localhost:9999/models/gemini-x:generateContent");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "[{\"a\":"}, {"text": "1}]"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(response).unwrap(), r#"[{"a":1}]"#);
    }

    #[test]
    fn test_response_without_candidates_is_an_error() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(response_text(response), Err(NewsError::Schema(_))));
    }
}
