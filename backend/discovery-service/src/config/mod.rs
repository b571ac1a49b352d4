use crate::error::{DiscoveryError, Result};
use resilience::presets;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub selection: SelectionConfig,
    pub filter: FilterConfig,
    pub dictionary: DictionaryConfig,
    pub adjudicator: AdjudicatorConfig,
    pub meaning: MeaningConfig,
    pub classifier: ClassifierConfig,
    pub paths: PathsConfig,
    pub collector: CollectorConfig,
}

/// Two-tier selection sizes
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub top_strict_n: usize,
    pub tail_pool_n: usize,
    pub target_count: usize,
    /// Floor applied after adjudication
    pub min_keep: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_strict_n: 30,
            tail_pool_n: 300,
            target_count: 40,
            min_keep: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub min_count: u64,
    pub nlp_threshold: f64,
    pub nlp_analysis_limit: usize,
    pub strict_excludes_alphanumeric: bool,
    pub max_examples: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_count: 3,
            nlp_threshold: 0.46,
            nlp_analysis_limit: 2000,
            strict_excludes_alphanumeric: true,
            max_examples: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DictionaryConfig {
    pub base_url: String,
    pub cache_path: PathBuf,
    pub ttl: Duration,
    pub failure_ttl: Duration,
    pub breaker_open_ttl: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
    pub breaker_threshold: u32,
    pub breaker_window: Duration,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl Default for DictionaryConfig {
    /// Breaker, retry and timeout numbers come from the shared dictionary preset
    fn default() -> Self {
        let preset = presets::dictionary_lookup_config();
        let breaker = preset.circuit_breaker.unwrap_or_default();
        let retry = preset.retry.unwrap_or_default();

        Self {
            base_url: "https://ko.dict.naver.com/api3/koko/search".to_string(),
            cache_path: PathBuf::from("data/dict_cache.jsonl"),
            ttl: Duration::from_secs(86_400),
            failure_ttl: Duration::from_secs(600),
            breaker_open_ttl: Duration::from_secs(60),
            max_attempts: retry.max_attempts,
            base_backoff: retry.base_backoff,
            max_backoff: retry.max_backoff,
            jitter: retry.jitter,
            breaker_threshold: breaker.failure_threshold,
            breaker_window: breaker.cool_down,
            timeout: preset.timeout.duration,
            concurrency: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdjudicatorConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub max_batch: usize,
    pub timeout: Duration,
}

impl Default for AdjudicatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            max_batch: 120,
            timeout: Duration::from_secs(9),
        }
    }
}

/// Meaning generation shares the adjudicator's API key, model and endpoint
#[derive(Debug, Clone)]
pub struct MeaningConfig {
    pub enabled: bool,
    /// Words per LLM request
    pub chunk_size: usize,
    /// Pause between requests, for rate-limited keys
    pub chunk_pause: Duration,
    /// Characters of the first example sent as context
    pub context_chars: usize,
    pub timeout: Duration,
}

impl Default for MeaningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: 5,
            chunk_pause: Duration::from_secs(10),
            context_chars: 50,
            timeout: Duration::from_secs(9),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Model serving endpoint. The classifier stage is skipped when unset.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub lexicon: PathBuf,
    pub history: PathBuf,
    pub sources_dir: PathBuf,
    /// `None` writes the report to stdout
    pub output: Option<PathBuf>,
    pub manual_meanings: PathBuf,
    pub meaning_cache: PathBuf,
    /// Extra profanity word file; the lexicon's terms are used when unset
    pub profanity: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            lexicon: PathBuf::from("data/lexicon.json"),
            history: PathBuf::from("data/counts_prev.json"),
            sources_dir: PathBuf::from("data/sources"),
            output: None,
            manual_meanings: PathBuf::from("data/manual_meanings.json"),
            meaning_cache: PathBuf::from("data/meaning_cache.json"),
            profanity: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub concurrency: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self { concurrency: 6 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            filter: FilterConfig::default(),
            dictionary: DictionaryConfig::default(),
            adjudicator: AdjudicatorConfig::default(),
            meaning: MeaningConfig::default(),
            classifier: ClassifierConfig::default(),
            paths: PathsConfig::default(),
            collector: CollectorConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let selection = SelectionConfig {
            top_strict_n: parse_env_or_default("TOP_STRICT_N", defaults.selection.top_strict_n)?,
            tail_pool_n: parse_env_or_default("TAIL_POOL_N", defaults.selection.tail_pool_n)?,
            target_count: parse_env_or_default("TARGET_COUNT", defaults.selection.target_count)?,
            min_keep: parse_env_or_default("MIN_KEEP", defaults.selection.min_keep)?,
        };

        let filter = FilterConfig {
            min_count: parse_env_or_default("MIN_COUNT", defaults.filter.min_count)?,
            nlp_threshold: parse_env_or_default("NLP_THRESHOLD", defaults.filter.nlp_threshold)?,
            nlp_analysis_limit: parse_env_or_default(
                "NLP_ANALYSIS_LIMIT",
                defaults.filter.nlp_analysis_limit,
            )?,
            strict_excludes_alphanumeric: parse_env_or_default(
                "STRICT_EXCLUDES_ALPHANUMERIC",
                defaults.filter.strict_excludes_alphanumeric,
            )?,
            max_examples: parse_env_or_default("MAX_EXAMPLES", defaults.filter.max_examples)?,
        };

        let d = defaults.dictionary;
        let dictionary = DictionaryConfig {
            base_url: env::var("DICT_BASE_URL").unwrap_or(d.base_url),
            cache_path: env::var("DICT_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.cache_path),
            ttl: secs_env_or_default("DICT_TTL_SECS", d.ttl)?,
            failure_ttl: secs_env_or_default("DICT_FAILURE_TTL_SECS", d.failure_ttl)?,
            breaker_open_ttl: secs_env_or_default("DICT_BREAKER_OPEN_TTL_SECS", d.breaker_open_ttl)?,
            max_attempts: parse_env_or_default("DICT_MAX_ATTEMPTS", d.max_attempts)?,
            base_backoff: millis_env_or_default("DICT_BASE_BACKOFF_MS", d.base_backoff)?,
            max_backoff: millis_env_or_default("DICT_MAX_BACKOFF_MS", d.max_backoff)?,
            jitter: millis_env_or_default("DICT_JITTER_MS", d.jitter)?,
            breaker_threshold: parse_env_or_default("DICT_BREAKER_THRESHOLD", d.breaker_threshold)?,
            breaker_window: secs_env_or_default("DICT_BREAKER_WINDOW_SECS", d.breaker_window)?,
            timeout: secs_env_or_default("DICT_TIMEOUT_SECS", d.timeout)?,
            concurrency: parse_env_or_default("DICT_CONCURRENCY", d.concurrency)?,
        };

        let a = defaults.adjudicator;
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let adjudicator = AdjudicatorConfig {
            enabled: parse_env_or_default("ADJUDICATOR_ENABLED", api_key.is_some())?,
            api_key,
            model: env::var("ADJUDICATOR_MODEL").unwrap_or(a.model),
            endpoint: env::var("ADJUDICATOR_ENDPOINT").unwrap_or(a.endpoint),
            max_batch: parse_env_or_default("ADJUDICATOR_MAX_BATCH", a.max_batch)?,
            timeout: secs_env_or_default("ADJUDICATOR_TIMEOUT_SECS", a.timeout)?,
        };

        let m = defaults.meaning;
        let meaning = MeaningConfig {
            enabled: parse_env_or_default("MEANING_ENABLED", adjudicator.api_key.is_some())?,
            chunk_size: parse_env_or_default("MEANING_CHUNK_SIZE", m.chunk_size)?,
            chunk_pause: secs_env_or_default("MEANING_CHUNK_PAUSE_SECS", m.chunk_pause)?,
            context_chars: parse_env_or_default("MEANING_CONTEXT_CHARS", m.context_chars)?,
            timeout: secs_env_or_default("MEANING_TIMEOUT_SECS", m.timeout)?,
        };

        let classifier = ClassifierConfig {
            endpoint: env::var("CLASSIFIER_ENDPOINT")
                .ok()
                .filter(|e| !e.trim().is_empty()),
            timeout: secs_env_or_default("CLASSIFIER_TIMEOUT_SECS", defaults.classifier.timeout)?,
        };

        let p = defaults.paths;
        let paths = PathsConfig {
            lexicon: env::var("LEXICON_PATH").map(PathBuf::from).unwrap_or(p.lexicon),
            history: env::var("HISTORY_PATH").map(PathBuf::from).unwrap_or(p.history),
            sources_dir: env::var("SOURCES_DIR")
                .map(PathBuf::from)
                .unwrap_or(p.sources_dir),
            output: env::var("OUTPUT_PATH").ok().map(PathBuf::from),
            manual_meanings: env::var("MANUAL_MEANINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(p.manual_meanings),
            meaning_cache: env::var("MEANING_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(p.meaning_cache),
            profanity: env::var("PROFANITY_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        let collector = CollectorConfig {
            concurrency: parse_env_or_default(
                "COLLECTOR_CONCURRENCY",
                defaults.collector.concurrency,
            )?,
        };

        let config = Config {
            selection,
            filter,
            dictionary,
            adjudicator,
            meaning,
            classifier,
            paths,
            collector,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selection.target_count == 0 {
            return Err(DiscoveryError::Config(
                "TARGET_COUNT must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.filter.nlp_threshold) {
            return Err(DiscoveryError::Config(format!(
                "NLP_THRESHOLD must be within [0, 1], got {}",
                self.filter.nlp_threshold
            )));
        }
        if self.dictionary.max_attempts == 0 {
            return Err(DiscoveryError::Config(
                "DICT_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.dictionary.concurrency == 0 || self.collector.concurrency == 0 {
            return Err(DiscoveryError::Config(
                "concurrency settings must be at least 1".to_string(),
            ));
        }
        if self.meaning.chunk_size == 0 {
            return Err(DiscoveryError::Config(
                "MEANING_CHUNK_SIZE must be at least 1".to_string(),
            ));
        }
        if self.adjudicator.enabled && self.adjudicator.api_key.is_none() {
            warn!("ADJUDICATOR_ENABLED is set without OPENAI_API_KEY, adjudication will pass through");
        }
        Ok(())
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| DiscoveryError::Config(format!("Failed to parse {}='{}': {}", key, val, e))),
        Err(_) => Ok(default),
    }
}

fn secs_env_or_default(key: &str, default: Duration) -> Result<Duration> {
    parse_env_or_default(key, default.as_secs()).map(Duration::from_secs)
}

fn millis_env_or_default(key: &str, default: Duration) -> Result<Duration> {
    parse_env_or_default(key, default.as_millis() as u64).map(Duration::from_millis)
}
