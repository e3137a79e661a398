//! Command-line interface definitions.
//!
//! Credentials and the model name come from flags or environment variables;
//! everything else lives in the optional YAML configuration (see [`crate::config`]).

use clap::{Parser, Subcommand};

/// Command-line arguments for the energy and mining news digest.
///
/// # Examples
///
/// ```sh
/// # Search run with the default queries, classified by Gemini
/// GEMINI_API_KEY=... energy_news_digest -o ./relatorios
///
/// # Collect only, no classification
/// energy_news_digest -o ./relatorios search --no-classify
///
/// # Official sources report
/// energy_news_digest -o ./relatorios official
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory the reports are written to
    #[arg(short, long, default_value = "relatorios")]
    pub output_dir: String,

    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// NewsAPI key; the NewsAPI source is skipped without it
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// GNews key; the GNews source is skipped without it
    #[arg(long, env = "GNEWS_API_KEY", hide_env_values = true)]
    pub gnews_key: Option<String>,

    /// Gemini API key used for classification
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_key: Option<String>,

    /// Gemini model id
    #[arg(long, env = "GEMINI_MODEL", default_value = crate::classifier::api::DEFAULT_MODEL)]
    pub gemini_model: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search every configured query, classify and write the reports (default)
    Search {
        /// Write the raw report only, without calling the model
        #[arg(long)]
        no_classify: bool,

        /// Override the configured number of articles kept per query
        #[arg(long)]
        max_per_query: Option<usize>,
    },
    /// Read the official sector listings and write one report grouped by source
    Official,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Search {
            no_classify: false,
            max_per_query: None,
        })
    }
}
