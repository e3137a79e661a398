//! # Energy News Digest
//!
//! Collects energy and mining news for the state of Piauí, removes duplicate
//! and near-duplicate stories, asks an LLM which of them matter, and writes
//! JSON and Markdown reports.
//!
//! ## Usage
//!
//! ```sh
//! energy_news_digest -o ./relatorios            # search run
//! energy_news_digest -o ./relatorios official   # official sources run
//! ```
//!
//! ## Architecture
//!
//! The search run is a pipeline:
//! 1. **Collection**: every source adapter is queried for every configured query
//! 2. **Deduplication**: repeated links and near-identical titles are dropped
//! 3. **Ranking**: the most recent `max_per_query` stories of each query are kept
//! 4. **Classification**: batches go to Gemini under a requests-per-minute limit
//! 5. **Output**: a raw report plus one report per category of relevant news
//!
//! The official run reads the listings of MME, ONS, EPE and Agência Petrobras
//! and writes one report grouped by source, without classification.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classifier;
mod cli;
mod collector;
mod config;
mod dedup;
mod error;
mod models;
mod outputs;
mod ranking;
mod retry;
mod scrapers;
mod utils;

use classifier::api::GeminiClient;
use classifier::rate_limit::RateLimiter;
use classifier::{Classifier, split_relevant};
use cli::{Cli, Command};
use collector::Collector;
use config::NewsConfig;
use error::NewsError;
use models::Category;
use outputs::{Grouping, ReportWriter};
use scrapers::gnews::GNewsAdapter;
use scrapers::google_news::GoogleNewsAdapter;
use scrapers::listings::{ListingAdapter, OfficialSource};
use scrapers::newsapi::NewsApiAdapter;
use scrapers::site_search::SiteSearchAdapter;
use utils::ensure_writable_dir;

/// A whole batch can take a while to generate.
const GEMINI_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("energy_news_digest starting up");

    let args = Cli::parse();
    debug!(output_dir = %args.output_dir, config = ?args.config, "Parsed CLI arguments");

    let mut config = NewsConfig::load(args.config.as_deref())?;

    // Early check: fail before any network work if reports can't be written
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    match args.command() {
        Command::Search {
            no_classify,
            max_per_query,
        } => {
            if let Some(n) = max_per_query {
                config.max_per_query = n;
                config.validate()?;
            }
            run_search(&args, &config, !no_classify).await?;
        }
        Command::Official => run_official(&args, &config).await?,
    }

    info!(
        elapsed_secs = start_time.elapsed().as_secs(),
        "energy_news_digest finished"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(classify = classify))]
async fn run_search(args: &Cli, config: &NewsConfig, classify: bool) -> error::Result<()> {
    let gemini_key = match (&args.gemini_key, classify) {
        (Some(key), true) => Some(key.clone()),
        (None, true) => {
            return Err(NewsError::Config(
                "GEMINI_API_KEY is required for classification (or pass --no-classify)".into(),
            ));
        }
        (_, false) => None,
    };

    let client = scrapers::http_client(Duration::from_secs(config.http_timeout_secs))?;
    let window = config.current_window();
    info!(from = %window.from, to = %window.to, "Search window");

    let mut collector = Collector::new(config.similarity_threshold);
    match &args.newsapi_key {
        Some(key) => {
            collector.register(Box::new(NewsApiAdapter::new(
                client.clone(),
                key.clone(),
                config.language.clone(),
                window,
            )));
        }
        None => warn!("NEWS_API_KEY not set; skipping NewsAPI"),
    }
    match &args.gnews_key {
        Some(key) => {
            collector.register(Box::new(GNewsAdapter::new(
                client.clone(),
                key.clone(),
                config.language.clone(),
                window,
            )));
        }
        None => warn!("GNEWS_API_KEY not set; skipping GNews"),
    }
    collector
        .register(Box::new(GoogleNewsAdapter::new(
            client.clone(),
            config.language.clone(),
            config.country.clone(),
        )))
        .register(Box::new(SiteSearchAdapter::meio_norte(client.clone())))
        .register(Box::new(SiteSearchAdapter::cidade_verde(client.clone())))
        .register(Box::new(SiteSearchAdapter::o_dia(client)));
    info!(adapters = ?collector.adapter_names(), "Registered sources");

    let mut articles = collector.collect(&config.queries, config.max_per_query).await;
    info!(count = articles.len(), "Collected articles");

    let writer = ReportWriter::new(&args.output_dir, Grouping::ByRegion);
    writer.write(&articles, "noticias_brutas", "Todas").await;

    let Some(gemini_key) = gemini_key else {
        info!("Classification disabled; raw report only");
        return Ok(());
    };

    let service = GeminiClient::new(gemini_key, args.gemini_model.clone(), GEMINI_TIMEOUT)?;
    let limiter = Arc::new(RateLimiter::per_minute(config.requests_per_minute));
    debug!(spacing_ms = limiter.spacing().as_millis() as u64, "Classifier rate limit");
    let classifier =
        Classifier::new(service, limiter).with_max_attempts(config.classifier_max_attempts);
    let stats = classifier.classify(&mut articles, config.batch_size).await;
    if stats.fallback_batches > 0 {
        warn!(
            failed = stats.fallback_batches,
            batches = stats.batches,
            "Some batches could not be classified and were marked not relevant"
        );
    }

    let (energy, mining) = split_relevant(&articles);
    info!(energy = energy.len(), mining = mining.len(), "Relevant articles");

    let date = Local::now().format("%d-%m-%Y");
    if !energy.is_empty() {
        writer
            .write(&energy, &format!("Energia_relevantes_{date}"), Category::Energy.label())
            .await;
    }
    if !mining.is_empty() {
        writer
            .write(&mining, &format!("Mineracao_relevantes_{date}"), Category::Mining.label())
            .await;
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_official(args: &Cli, config: &NewsConfig) -> error::Result<()> {
    let client = scrapers::http_client(Duration::from_secs(config.http_timeout_secs))?;
    let lookback = config.listing_lookback_days;

    let mut collector = Collector::new(config.similarity_threshold);
    collector.register(Box::new(ListingAdapter::new(
        client.clone(),
        OfficialSource::Mme,
        lookback,
    )));
    register_ons(&mut collector, config);
    collector
        .register(Box::new(ListingAdapter::new(
            client.clone(),
            OfficialSource::Epe,
            lookback,
        )))
        .register(Box::new(ListingAdapter::new(
            client,
            OfficialSource::Petrobras,
            lookback,
        )));
    info!(adapters = ?collector.adapter_names(), "Registered official sources");

    let articles = collector.collect_listings(Category::Energy, usize::MAX).await;
    let name = format!("Relatorio_Setorial_Completo_{}", Local::now().format("%d%m%Y"));
    ReportWriter::new(&args.output_dir, Grouping::BySource)
        .write(&articles, &name, "Setor de Energia e Petróleo")
        .await;
    Ok(())
}

#[cfg(feature = "browser")]
fn register_ons(collector: &mut Collector, config: &NewsConfig) {
    use scrapers::listings::OnsAdapter;
    use scrapers::render::ChromeRenderer;

    collector.register(Box::new(OnsAdapter::new(
        Arc::new(ChromeRenderer),
        config.listing_lookback_days,
        Duration::from_secs(config.render_timeout_secs),
    )));
}

#[cfg(not(feature = "browser"))]
fn register_ons(_collector: &mut Collector, _config: &NewsConfig) {
    warn!("Built without the `browser` feature; skipping the ONS listing");
}
