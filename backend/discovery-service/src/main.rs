//! Slang discovery batch run
//!
//! Reads one text file per source from `SOURCES_DIR`, runs a single
//! discovery pass and writes the `RunReport` as JSON.
//!
//! Environment variables (all optional):
//! - SOURCES_DIR: directory of `*.txt` source files (default: "data/sources")
//! - LEXICON_PATH: lexicon JSON document (default: "data/lexicon.json", built-in when absent)
//! - HISTORY_PATH: prior-run frequency snapshot (default: "data/counts_prev.json")
//! - OUTPUT_PATH: report destination (default: stdout)
//! - DICT_CACHE_PATH: dictionary cache JSONL file (default: "data/dict_cache.jsonl")
//! - CLASSIFIER_ENDPOINT: slang classifier model server; stage skipped when unset
//! - OPENAI_API_KEY: enables the LLM adjudicator unless ADJUDICATOR_ENABLED=false
//!   and meaning generation unless MEANING_ENABLED=false
//! - MANUAL_MEANINGS_PATH: hand-written meanings (default: "data/manual_meanings.json")
//! - MEANING_CACHE_PATH: generated meanings (default: "data/meaning_cache.json")
//! - PROFANITY_PATH: profanity word file replacing the lexicon's terms
//! - RUST_LOG: log filter (default: "info")
//! - LOG_FORMAT: "json" for JSON log lines

use anyhow::{Context, Result};
use discovery_service::services::{
    ClassifierFilter, DictionaryCache, DictionaryOracle, DiscoveryPipeline, FileTextSource,
    HttpSlangClassifier, LlmAdjudicator, LlmMeaningExtractor, ManualMeanings, MeaningCache,
    MeaningResolver, NaverDictionaryClient, PassthroughAdjudicator, ProfanityFilter,
};
use discovery_service::services::{Adjudicator, MeaningExtractor, SlangClassifier};
use discovery_service::{Config, DiscoveryError, Lexicon, RunReport};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().with_target(false)))
        .init();
}

fn write_report(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load config")?;
    let lexicon = Arc::new(Lexicon::load(&config.paths.lexicon)?);

    let transport = Arc::new(NaverDictionaryClient::new(
        &config.dictionary.base_url,
        config.dictionary.timeout,
    )?);
    let cache = DictionaryCache::open(&config.dictionary.cache_path)?;
    info!(
        path = %config.dictionary.cache_path.display(),
        entries = cache.len(),
        "Dictionary cache opened"
    );
    let oracle = Arc::new(DictionaryOracle::new(&config.dictionary, transport, cache));

    let classifier =
        HttpSlangClassifier::from_config(&config.classifier, config.filter.nlp_threshold)?
            .map(|c| Arc::new(c) as Arc<dyn SlangClassifier>);
    let classifier = ClassifierFilter::new(
        classifier,
        config.filter.nlp_threshold,
        config.filter.nlp_analysis_limit,
    );

    let adjudicator: Arc<dyn Adjudicator> =
        match LlmAdjudicator::from_config(&config.adjudicator)? {
            Some(llm) => Arc::new(llm),
            None => Arc::new(PassthroughAdjudicator),
        };

    let profanity = match &config.paths.profanity {
        Some(path) => {
            let filter = ProfanityFilter::from_file(path, lexicon.allow.clone())?;
            info!(path = %path.display(), terms = filter.len(), "Profanity word file loaded");
            filter
        }
        None => ProfanityFilter::from_lexicon(&lexicon),
    };

    let extractor = LlmMeaningExtractor::from_config(&config.adjudicator, &config.meaning)?
        .map(|e| Arc::new(e) as Arc<dyn MeaningExtractor>);
    let meanings = MeaningResolver::new(
        ManualMeanings::load(&config.paths.manual_meanings)?,
        MeaningCache::open(&config.paths.meaning_cache),
        extractor,
    )
    .with_context_chars(config.meaning.context_chars);

    let sources = FileTextSource::discover(&config.paths.sources_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to list sources in {}",
                config.paths.sources_dir.display()
            )
        })?;
    info!(sources = sources.len(), "Starting discovery run");

    let output = config.paths.output.clone();
    let pipeline = DiscoveryPipeline::new(config, lexicon, oracle)
        .with_classifier(classifier)
        .with_profanity(profanity)
        .with_adjudicator(adjudicator)
        .with_meanings(meanings);

    let report = match pipeline.run_from_sources(&sources).await {
        Ok(report) => report,
        Err(DiscoveryError::NoTextCollected) => {
            error!("Every source came back empty, nothing to score");
            return Err(DiscoveryError::NoTextCollected.into());
        }
        Err(e) => return Err(e).context("Discovery run failed"),
    };

    info!(
        final_count = report.final_list.len(),
        candidates = report.candidates.len(),
        adjudication = report.adjudication.as_str(),
        "Discovery run complete"
    );
    write_report(&report, output.as_deref())
}
