//! Relevance classification through a language model.
//!
//! Articles are sent in consecutive batches. Each request carries the batch's
//! articles tagged with their position and asks the model for one judgement
//! per article: relevant or not, a one-sentence summary, a category and a
//! region. Judgements are mapped back by position.
//!
//! A batch is never lost. Every attempt waits on the shared [`RateLimiter`];
//! transport errors and malformed answers are retried with exponential
//! backoff, and once the attempts run out every article of the batch is marked
//! not relevant. Articles the model forgot to mention are also marked not
//! relevant.

pub mod api;
pub mod rate_limit;

use crate::error::{NewsError, Result};
use crate::models::{Article, Category, Judgement};
use crate::retry;
use crate::utils::{looks_truncated, strip_code_fences, truncate_for_log};
use api::AskAsync;
use rate_limit::RateLimiter;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Outcome counters of one [`Classifier::classify`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationStats {
    pub batches: usize,
    pub fallback_batches: usize,
    pub missing_judgements: usize,
    pub relevant: usize,
}

pub struct Classifier<S> {
    service: S,
    limiter: Arc<RateLimiter>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl<S: AskAsync> Classifier<S> {
    pub fn new(service: S, limiter: Arc<RateLimiter>) -> Self {
        Self {
            service,
            limiter,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Classify `articles` in place, `batch_size` at a time.
    ///
    /// Order and length of `articles` are untouched; only `relevant`,
    /// `summary`, `category` and `region` change.
    #[instrument(level = "info", skip_all, fields(total = articles.len(), batch_size = batch_size))]
    pub async fn classify(&self, articles: &mut [Article], batch_size: usize) -> ClassificationStats {
        let mut stats = ClassificationStats::default();
        let batch_size = batch_size.max(1);

        for (n, batch) in articles.chunks_mut(batch_size).enumerate() {
            stats.batches += 1;
            let judgements = match self.request_batch(batch).await {
                Ok(judgements) => judgements,
                Err(e) => {
                    warn!(batch = n, size = batch.len(), error = %e, "Batch classification failed; marking batch not relevant");
                    stats.fallback_batches += 1;
                    Vec::new()
                }
            };

            let (resolved, missing) = resolve_judgements(batch, judgements);
            stats.missing_judgements += missing;
            for (article, judgement) in batch.iter_mut().zip(resolved) {
                judgement.apply_to(article);
                if article.relevant {
                    stats.relevant += 1;
                }
            }
            info!(batch = n, size = batch.len(), missing, "Classified batch");
        }

        info!(?stats, "Classification finished");
        stats
    }

    /// One rate-limited, retried request for `batch`.
    async fn request_batch(&self, batch: &[Article]) -> Result<Vec<Judgement>> {
        let prompt = build_prompt(batch);
        let this = self;
        let prompt = prompt.as_str();

        retry::attempt(
            "classify_batch",
            self.max_attempts,
            retry::exponential(self.backoff_base, Duration::from_secs(60)),
            move |_| async move {
                this.limiter.acquire().await;
                let raw = this.service.ask(prompt).await?;
                parse_judgements(&raw)
            },
        )
        .await
    }
}

/// Instruction plus the batch's articles, each tagged with its batch index.
pub fn build_prompt(batch: &[Article]) -> String {
    let items: Vec<_> = batch
        .iter()
        .enumerate()
        .map(|(i, a)| {
            json!({
                "id_original": i,
                "titulo": a.title,
                "fonte": a.source,
                "data": a.date_label(),
                "categoria": a.category.label(),
            })
        })
        .collect();
    let items = serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Você é analista do Governo do Piauí.\n\
         Para cada notícia abaixo, diga se ela é RELEVANTE para o planejamento estadual \
         em energia ou mineração.\n\n\
         Responda SOMENTE com um array JSON contendo um objeto por notícia, no formato:\n\
         {{\"id_original\": <id recebido>, \"relevante\": true/false, \
         \"resumo\": \"Resumo curto em 1 frase\", \"categoria\": \"{}\" ou \"{}\", \
         \"regiao\": \"Piauí\" ou \"Nordeste\" ou \"Brasil\" ou \"Mundo\"}}\n\n\
         Notícias:\n{}",
        Category::Energy.label(),
        Category::Mining.label(),
        items
    )
}

/// Parse the model's answer, rejecting anything that is not an array of judgements.
pub fn parse_judgements(raw: &str) -> Result<Vec<Judgement>> {
    let body = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        if looks_truncated(&e) {
            NewsError::Schema(format!("response looks truncated: {e}"))
        } else {
            NewsError::Schema(format!("invalid JSON ({e}): {}", truncate_for_log(body, 300)))
        }
    })?;

    if !value.is_array() {
        return Err(NewsError::Schema(format!(
            "expected an array, got: {}",
            truncate_for_log(body, 300)
        )));
    }
    serde_json::from_value(value).map_err(|e| NewsError::Schema(e.to_string()))
}

/// Line up judgements with the batch by `id_original`.
///
/// Returns one judgement per article and the number of articles the model
/// left out, which default to not relevant.
fn resolve_judgements(batch: &[Article], judgements: Vec<Judgement>) -> (Vec<Judgement>, usize) {
    let mut slots: Vec<Option<Judgement>> = vec![None; batch.len()];

    for judgement in judgements {
        let index = judgement.id_original;
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(judgement),
            Some(_) => debug!(index, "Ignoring repeated judgement"),
            None => warn!(index, size = batch.len(), "Ignoring judgement for unknown index"),
        }
    }

    let missing = slots.iter().filter(|s| s.is_none()).count();
    let resolved = slots
        .into_iter()
        .zip(batch)
        .enumerate()
        .map(|(i, (slot, article))| slot.unwrap_or_else(|| Judgement::not_relevant(i, article)))
        .collect();
    (resolved, missing)
}

/// Relevant articles split by their (classified) category: `(energy, mining)`.
pub fn split_relevant(articles: &[Article]) -> (Vec<Article>, Vec<Article>) {
    articles
        .iter()
        .filter(|a| a.relevant)
        .cloned()
        .partition(|a| a.category == Category::Energy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays canned answers; fails once they run out.
    struct ScriptedModel {
        answers: RefCell<VecDeque<Result<String>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(answers: Vec<Result<String>>) -> Self {
            Self {
                answers: RefCell::new(answers.into()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl AskAsync for ScriptedModel {
        async fn ask(&self, text: &str) -> Result<String> {
            self.prompts.borrow_mut().push(text.to_string());
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(NewsError::Parse("no more answers".into())))
        }
    }

    struct AlwaysDown {
        calls: Cell<u32>,
    }

    impl AskAsync for AlwaysDown {
        async fn ask(&self, _text: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Err(NewsError::Status { url: "http://model".into(), status: 503 })
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article::new("Fonte", &format!("Notícia {i}"), format!("https://x/{i}"), None))
            .collect()
    }

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::per_minute(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_service_marks_everything_not_relevant() {
        let service = AlwaysDown { calls: Cell::new(0) };
        let classifier = Classifier::new(service, limiter());
        let mut items = articles(5);
        for a in &mut items {
            a.relevant = true;
            a.summary = "old".into();
        }

        let stats = classifier.classify(&mut items, 2).await;

        assert_eq!(items.len(), 5);
        assert!(items.iter().all(|a| !a.relevant && a.summary.is_empty()));
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.fallback_batches, 3);
        assert_eq!(classifier.service.calls.get(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_index_defaults_to_not_relevant() {
        let answer = r#"[
            {"id_original": 0, "relevante": true, "resumo": "Primeira.", "categoria": "Mineração", "regiao": "Piauí"},
            {"id_original": 1, "relevante": true, "resumo": "Segunda.", "categoria": "Energia", "regiao": "Brasil"}
        ]"#;
        let classifier = Classifier::new(ScriptedModel::new(vec![Ok(answer.into())]), limiter());
        let mut items = articles(3);

        let stats = classifier.classify(&mut items, 3).await;

        assert!(items[0].relevant);
        assert_eq!(items[0].category, Category::Mining);
        assert_eq!(items[0].region, Region::Piaui);
        assert_eq!(items[0].summary, "Primeira.");
        assert!(items[1].relevant);
        assert_eq!(items[1].region, Region::Brazil);
        assert!(!items[2].relevant);
        assert_eq!(items[2].summary, "");
        assert_eq!(stats.missing_judgements, 1);
        assert_eq!(stats.fallback_batches, 0);
        assert_eq!(stats.relevant, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_violation_is_retried() {
        let good = r#"```json
[{"id_original": 0, "relevante": true, "resumo": "Ok.", "categoria": "Energia", "regiao": "Nordeste"}]
```"#;
        let model = ScriptedModel::new(vec![
            Ok(r#"{"relevante": true}"#.into()),
            Ok(r#"[{"id_original": 0, "relevante": true, "resumo": "x", "categoria": "Energia", "regiao": "Teresina"}]"#.into()),
            Ok(good.into()),
        ]);
        let classifier = Classifier::new(model, limiter());
        let mut items = articles(1);

        let stats = classifier.classify(&mut items, 10).await;

        assert!(items[0].relevant);
        assert_eq!(items[0].region, Region::Northeast);
        assert_eq!(stats.fallback_batches, 0);
        assert_eq!(classifier.service.prompts.borrow().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_respect_rate_limit_and_backoff() {
        let classifier = Classifier::new(AlwaysDown { calls: Cell::new(0) }, limiter());
        let mut items = articles(1);
        let t0 = Instant::now();

        classifier.classify(&mut items, 1).await;

        // three attempts spaced by the 6s limiter (backoff of 1s and 2s overlaps it)
        assert!(t0.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_repeated_indices_are_ignored() {
        let answer = r#"[
            {"id_original": 7, "relevante": true, "resumo": "?", "categoria": "Energia", "regiao": "Mundo"},
            {"id_original": 0, "relevante": false, "resumo": "Primeira.", "categoria": "Energia", "regiao": "Mundo"},
            {"id_original": 0, "relevante": true, "resumo": "Repetida.", "categoria": "Energia", "regiao": "Mundo"}
        ]"#;
        let classifier = Classifier::new(ScriptedModel::new(vec![Ok(answer.into())]), limiter());
        let mut items = articles(1);

        classifier.classify(&mut items, 5).await;

        assert!(!items[0].relevant);
        assert_eq!(items[0].summary, "Primeira.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_carry_positional_indices() {
        let model = ScriptedModel::new(vec![Ok("[]".into()), Ok("[]".into())]);
        let classifier = Classifier::new(model, limiter());
        let mut items = articles(3);

        let stats = classifier.classify(&mut items, 2).await;

        let prompts = classifier.service.prompts.borrow();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Notícia 1"));
        assert!(prompts[1].contains("Notícia 2"));
        assert!(prompts[1].contains(r#""id_original": 0"#));
        assert!(!prompts[1].contains(r#""id_original": 1"#));
        assert_eq!(stats.missing_judgements, 3);
    }

    #[test]
    fn test_parse_judgements_rejects_non_arrays() {
        assert!(parse_judgements(r#"{"id_original": 0}"#).is_err());
        assert!(parse_judgements("not json").is_err());
        assert!(parse_judgements(r#"[{"id_original": 0, "relevante": true"#).is_err());
        assert_eq!(parse_judgements("[]").unwrap(), vec![]);
    }

    #[test]
    fn test_split_relevant() {
        let mut items = articles(4);
        items[0].relevant = true;
        items[1].relevant = true;
        items[1].category = Category::Mining;
        items[2].category = Category::Mining;
        let (energy, mining) = split_relevant(&items);
        assert_eq!(energy.len(), 1);
        assert_eq!(mining.len(), 1);
        assert_eq!(mining[0].link, "https://x/1");
    }
}
