//! Short meanings for the words of the final list.
//!
//! A hand-written override wins over the cache of earlier generations, and
//! the cache wins over a fresh LLM batch. When generation fails the word
//! simply has no meaning; the run goes on.

mod store;

pub use store::{ManualMeaning, ManualMeanings, MeaningCache};

use crate::config::{AdjudicatorConfig, MeaningConfig};
use crate::error::{DiscoveryError, Result};
use crate::models::{Meaning, MeaningSource};
use crate::services::adjudicator::{strip_code_fence, LlmProvider, OpenAIProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use resilience::{with_timeout_result, Sleeper, TimeoutError, TokioSleeper};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a Korean slang expert. Respond ONLY with valid JSON.";

/// One word to explain, with a short usage context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeaningRequest {
    pub word: String,
    #[serde(rename = "ctx")]
    pub context: String,
}

#[async_trait]
pub trait MeaningExtractor: Send + Sync {
    /// Meanings for as many of `requests` as the backend produced
    async fn extract(&self, requests: &[MeaningRequest]) -> Result<HashMap<String, String>>;
}

pub fn build_meaning_prompt(requests: &[MeaningRequest]) -> Result<String> {
    let payload = serde_json::to_string(requests)?;
    Ok(format!(
        "다음 신조어들의 의미를 한국어로 매우 간결하게 생성하세요. 각 항목은 30자 이내.\n\
         입력은 JSON 배열이며, 각 객체는 {{word, ctx}}를 가집니다.\n\
         반드시 다음 형식의 JSON으로만 답변하세요: \
         {{\"results\":[{{\"word\":\"...\",\"meaning\":\"...\"}}]}}\n\
         {}",
        payload
    ))
}

#[derive(Deserialize)]
struct MeaningResponse {
    #[serde(default)]
    results: Vec<MeaningItem>,
}

#[derive(Deserialize)]
struct MeaningItem {
    #[serde(default)]
    word: Option<String>,
    #[serde(default)]
    meaning: Option<String>,
}

/// Parse `{"results": [{"word", "meaning"}]}`, skipping incomplete items
pub fn parse_meanings(response: &str) -> Result<Vec<(String, String)>> {
    let parsed: MeaningResponse = serde_json::from_str(strip_code_fence(response).trim())
        .map_err(|e| DiscoveryError::Llm(format!("meaning response is not JSON: {}", e)))?;

    Ok(parsed
        .results
        .into_iter()
        .filter_map(|item| {
            let word = item.word?.trim().to_string();
            let meaning = item.meaning?;
            let meaning = meaning
                .trim()
                .strip_prefix("의미:")
                .unwrap_or(meaning.trim())
                .trim()
                .to_string();
            (!word.is_empty() && !meaning.is_empty()).then_some((word, meaning))
        })
        .collect())
}

/// Chunked LLM meaning generation. A failed chunk ends the batch.
pub struct LlmMeaningExtractor {
    provider: Arc<dyn LlmProvider>,
    sleeper: Arc<dyn Sleeper>,
    chunk_size: usize,
    chunk_pause: Duration,
    timeout: Duration,
}

impl LlmMeaningExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &MeaningConfig) -> Self {
        Self {
            provider,
            sleeper: Arc::new(TokioSleeper),
            chunk_size: config.chunk_size.max(1),
            chunk_pause: config.chunk_pause,
            timeout: config.timeout,
        }
    }

    /// `None` when generation is disabled or no API key is set
    pub fn from_config(
        adjudicator: &AdjudicatorConfig,
        config: &MeaningConfig,
    ) -> Result<Option<Self>> {
        if !config.enabled {
            info!("Meaning generation is disabled");
            return Ok(None);
        }
        let Some(api_key) = adjudicator.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("Meaning generation enabled without an API key, skipping");
            return Ok(None);
        };

        let provider = OpenAIProvider::new(
            api_key,
            &adjudicator.model,
            &adjudicator.endpoint,
            config.timeout,
        )?;
        info!(
            provider = provider.name(),
            chunk_size = config.chunk_size,
            "Meaning generation initialized"
        );
        Ok(Some(Self::new(Arc::new(provider), config)))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn request_chunk(&self, chunk: &[MeaningRequest]) -> Result<Vec<(String, String)>> {
        let prompt = build_meaning_prompt(chunk)?;
        let response =
            match with_timeout_result(self.timeout, self.provider.complete(SYSTEM_PROMPT, &prompt))
                .await
            {
                Ok(text) => text,
                Err(TimeoutError::Elapsed(d)) => {
                    return Err(DiscoveryError::Transport(format!(
                        "meaning request timed out after {:?}",
                        d
                    )))
                }
                Err(TimeoutError::Failed(e)) => return Err(e),
            };

        let members: HashSet<&str> = chunk.iter().map(|r| r.word.as_str()).collect();
        Ok(parse_meanings(&response)?
            .into_iter()
            .filter(|(word, _)| members.contains(word.as_str()))
            .collect())
    }
}

#[async_trait]
impl MeaningExtractor for LlmMeaningExtractor {
    async fn extract(&self, requests: &[MeaningRequest]) -> Result<HashMap<String, String>> {
        let chunks: Vec<&[MeaningRequest]> = requests.chunks(self.chunk_size).collect();
        let mut meanings = HashMap::new();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.chunk_pause).await;
            }
            match self.request_chunk(chunk).await {
                Ok(found) => meanings.extend(found),
                Err(e) if meanings.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        chunk = i + 1,
                        chunks = chunks.len(),
                        error = %e,
                        "Meaning chunk failed, skipping the rest"
                    );
                    break;
                }
            }
        }
        Ok(meanings)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeaningResolution {
    pub meanings: HashMap<String, Meaning>,
    /// Hand-written examples that replace the corpus examples
    pub examples: HashMap<String, Vec<String>>,
}

impl MeaningResolution {
    pub fn meaning(&self, word: &str) -> Option<Meaning> {
        self.meanings.get(word).cloned()
    }
}

pub struct MeaningResolver {
    manual: ManualMeanings,
    cache: Mutex<MeaningCache>,
    extractor: Option<Arc<dyn MeaningExtractor>>,
    context_chars: usize,
}

impl MeaningResolver {
    pub fn new(
        manual: ManualMeanings,
        cache: MeaningCache,
        extractor: Option<Arc<dyn MeaningExtractor>>,
    ) -> Self {
        Self {
            manual,
            cache: Mutex::new(cache),
            extractor,
            context_chars: MeaningConfig::default().context_chars,
        }
    }

    /// No overrides, no cache, no generation
    pub fn disabled() -> Self {
        Self::new(ManualMeanings::empty(), MeaningCache::in_memory(), None)
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub async fn resolve(
        &self,
        words: &[String],
        examples: &BTreeMap<String, Vec<String>>,
    ) -> MeaningResolution {
        let mut resolution = MeaningResolution::default();
        let mut requests = Vec::new();

        {
            let cache = self.cache.lock();
            let mut seen = HashSet::new();
            for word in words.iter().filter(|w| seen.insert(w.as_str())) {
                let manual = self.manual.get(word);
                if let Some(manual) = manual.filter(|m| !m.examples.is_empty()) {
                    resolution
                        .examples
                        .insert(word.clone(), manual.examples.clone());
                }

                if let Some(text) = manual.and_then(|m| m.meaning.clone()) {
                    resolution.insert(word, text, MeaningSource::Manual);
                } else if let Some(text) = cache.get(word) {
                    resolution.insert(word, text.to_string(), MeaningSource::Cached);
                } else {
                    let context = examples
                        .get(word)
                        .and_then(|e| e.first())
                        .map(|e| e.chars().take(self.context_chars).collect())
                        .unwrap_or_default();
                    requests.push(MeaningRequest {
                        word: word.clone(),
                        context,
                    });
                }
            }
        }

        let manual = resolution.count(MeaningSource::Manual);
        let cached = resolution.count(MeaningSource::Cached);
        let generated = match (&self.extractor, requests.is_empty()) {
            (Some(extractor), false) => match extractor.extract(&requests).await {
                Ok(found) => {
                    self.remember(&found).await;
                    for (word, text) in found {
                        resolution.insert(&word, text, MeaningSource::Generated);
                    }
                    resolution.count(MeaningSource::Generated)
                }
                Err(e) => {
                    warn!(requested = requests.len(), error = %e, "Meaning generation failed");
                    0
                }
            },
            _ => 0,
        };

        info!(
            manual,
            cached,
            generated,
            missing = requests.len().saturating_sub(generated),
            "Meanings resolved"
        );
        resolution
    }

    async fn remember(&self, found: &HashMap<String, String>) {
        if found.is_empty() {
            return;
        }
        let snapshot = {
            let mut cache = self.cache.lock();
            for (word, text) in found {
                cache.insert(word.as_str(), text.as_str());
            }
            cache.clone()
        };
        if let Err(e) = snapshot.save().await {
            warn!(error = %e, "Failed to save meaning cache");
        }
    }
}

impl MeaningResolution {
    fn insert(&mut self, word: &str, text: String, source: MeaningSource) {
        self.meanings
            .insert(word.to_string(), Meaning { text, source });
    }

    fn count(&self, source: MeaningSource) -> usize {
        self.meanings.values().filter(|m| m.source == source).count()
    }
}
