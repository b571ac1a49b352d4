//! Optional final adjudication of the selected list by an LLM.
//!
//! The pipeline only sees the [`Adjudicator`] interface. Any failure of the
//! network-backed implementation hands the input back unchanged.

mod provider;

pub use provider::{strip_code_fence, LlmProvider, OpenAIProvider};

use crate::config::AdjudicatorConfig;
use crate::error::{DiscoveryError, Result};
use crate::models::AdjudicationState;
use async_trait::async_trait;
use resilience::{
    presets, with_retry, with_timeout_result, RetryConfig, Sleeper, TimeoutError, TokioSleeper,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SYSTEM_PROMPT: &str = "너는 한국어 신조어 감별기다. 반드시 JSON 배열만 출력하라.";

#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationResult {
    pub words: Vec<String>,
    pub state: AdjudicationState,
}

impl AdjudicationResult {
    fn unchanged(words: &[String], state: AdjudicationState) -> Self {
        Self {
            words: words.to_vec(),
            state,
        }
    }
}

#[async_trait]
pub trait Adjudicator: Send + Sync {
    /// Never fails: on any problem the input comes back as-is
    async fn adjudicate(&self, words: &[String]) -> AdjudicationResult;
}

/// Used when no LLM is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughAdjudicator;

#[async_trait]
impl Adjudicator for PassthroughAdjudicator {
    async fn adjudicate(&self, words: &[String]) -> AdjudicationResult {
        AdjudicationResult::unchanged(words, AdjudicationState::Passthrough)
    }
}

pub fn build_user_prompt(words: &[String]) -> String {
    format!(
        "아래 단어들을 '신조어'|'일반어'|'고유명사'|'노이즈' 중 하나로 분류하되,\n\
         '신조어'와 '애매'만 골라 JSON 배열로 반환해. (배열 외 텍스트 절대 금지)\n\
         예시: [\"단어1\",\"단어2\",...]\n\
         \n\
         판정 가이드(완화):\n\
         - 2020년 이후 유행, 초성체/합성어/영+한 혼종/커뮤니티 은어는 가급적 포함\n\
         - 정치/뉴스 상시어는 제외\n\
         \n\
         단어 목록: {}",
        words.join(", ")
    )
}

/// Parse a JSON array of strings, tolerating a markdown code fence around it
pub fn parse_word_list(response: &str) -> Result<Vec<String>> {
    let json_str = strip_code_fence(response);

    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| DiscoveryError::Llm(format!("response is not JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(DiscoveryError::Llm("response is not an array".to_string()));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(word) => Ok(word),
            other => Err(DiscoveryError::Llm(format!("non-string element: {}", other))),
        })
        .collect()
}

pub struct LlmAdjudicator {
    provider: Arc<dyn LlmProvider>,
    sleeper: Arc<dyn Sleeper>,
    max_batch: usize,
    timeout: Duration,
    retry: RetryConfig,
}

impl LlmAdjudicator {
    pub fn new(provider: Arc<dyn LlmProvider>, max_batch: usize) -> Self {
        let preset = presets::llm_adjudication_config();
        Self {
            provider,
            sleeper: Arc::new(TokioSleeper),
            max_batch,
            timeout: preset.timeout.duration,
            retry: preset.retry.unwrap_or_default(),
        }
    }

    /// `None` when adjudication is disabled or no API key is set
    pub fn from_config(config: &AdjudicatorConfig) -> Result<Option<Self>> {
        if !config.enabled {
            info!("LLM adjudicator is disabled");
            return Ok(None);
        }
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("LLM adjudicator enabled without an API key, using passthrough");
            return Ok(None);
        };

        let provider =
            OpenAIProvider::new(api_key, &config.model, &config.endpoint, config.timeout)?;
        info!(
            provider = provider.name(),
            model = %config.model,
            max_batch = config.max_batch,
            "LLM adjudicator initialized"
        );

        let mut adjudicator = Self::new(Arc::new(provider), config.max_batch);
        adjudicator.timeout = config.timeout;
        Ok(Some(adjudicator))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, user: &str) -> Result<String> {
        with_retry(&self.retry, self.sleeper.as_ref(), || async move {
            match with_timeout_result(self.timeout, self.provider.complete(SYSTEM_PROMPT, user))
                .await
            {
                Ok(text) => Ok(text),
                Err(TimeoutError::Elapsed(d)) => Err(DiscoveryError::Transport(format!(
                    "LLM call timed out after {:?}",
                    d
                ))),
                Err(TimeoutError::Failed(e)) => Err(e),
            }
        })
        .await
        .map_err(|e| e.into_inner())
    }
}

#[async_trait]
impl Adjudicator for LlmAdjudicator {
    async fn adjudicate(&self, words: &[String]) -> AdjudicationResult {
        if words.is_empty() {
            return AdjudicationResult::unchanged(words, AdjudicationState::Passthrough);
        }

        let batch = &words[..words.len().min(self.max_batch)];
        let response = match self.request(&build_user_prompt(batch)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "LLM adjudication failed, keeping rule-based list");
                return AdjudicationResult::unchanged(words, AdjudicationState::TransportFailed);
            }
        };

        let accepted = match parse_word_list(&response) {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, response = %response, "Failed to parse LLM response");
                return AdjudicationResult::unchanged(words, AdjudicationState::ParseFailed);
            }
        };

        let members: HashSet<&str> = batch.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let kept: Vec<String> = accepted
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| members.contains(w.as_str()) && seen.insert(w.clone()))
            .collect();

        info!(
            submitted = batch.len(),
            accepted = kept.len(),
            "LLM adjudication finished"
        );
        AdjudicationResult {
            words: kept,
            state: AdjudicationState::ParsedOk,
        }
    }
}

/// Backfill `adjudicated` from `pre` (in order, skipping duplicates) up to `min_keep`
pub fn apply_min_keep(adjudicated: Vec<String>, pre: &[String], min_keep: usize) -> Vec<String> {
    if adjudicated.is_empty() {
        return pre.iter().take(min_keep).cloned().collect();
    }
    if adjudicated.len() >= min_keep {
        return adjudicated;
    }

    let mut seen: HashSet<String> = adjudicated.iter().cloned().collect();
    let mut out = adjudicated;
    for word in pre {
        if out.len() >= min_keep {
            break;
        }
        if seen.insert(word.clone()) {
            out.push(word.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::*;
    use resilience::RecordingSleeper;

    mock! {
        pub Provider {}

        #[async_trait]
        impl LlmProvider for Provider {
            async fn complete(&self, system: &str, user: &str) -> Result<String>;
            fn name(&self) -> &str;
        }
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn adjudicator(
        provider: MockProvider,
        max_batch: usize,
    ) -> (LlmAdjudicator, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let adjudicator = LlmAdjudicator::new(Arc::new(provider), max_batch)
            .with_sleeper(sleeper.clone())
            .with_retry_config(RetryConfig {
                max_attempts: 2,
                base_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(8),
                jitter: Duration::ZERO,
            });
        (adjudicator, sleeper)
    }

    #[test]
    fn test_parse_word_list_variants() {
        assert_eq!(
            parse_word_list(r#"["갑분싸", "존맛탱"]"#).unwrap(),
            words(&["갑분싸", "존맛탱"])
        );
        assert_eq!(
            parse_word_list("```json\n[\"갓생\"]\n```").unwrap(),
            words(&["갓생"])
        );
        assert!(parse_word_list("").is_err());
        assert!(parse_word_list(r#"{"words": ["갓생"]}"#).is_err());
        assert!(parse_word_list(r#"["갓생", 3]"#).is_err());
    }

    #[test]
    fn test_prompt_lists_words_in_order() {
        let prompt = build_user_prompt(&words(&["갑분싸", "존맛탱"]));
        assert!(prompt.contains("단어 목록: 갑분싸, 존맛탱"));
        assert!(prompt.contains("정치/뉴스 상시어는 제외"));
    }

    #[tokio::test]
    async fn test_accepted_words_restricted_to_batch() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .with(eq(SYSTEM_PROMPT), always())
            .times(1)
            .returning(|_, _| Ok(r#"["존맛탱", "없던말", "갑분싸", "존맛탱"]"#.to_string()));
        let (adjudicator, _) = adjudicator(provider, 120);

        let result = adjudicator
            .adjudicate(&words(&["갑분싸", "존맛탱", "회의록"]))
            .await;
        assert_eq!(result.state, AdjudicationState::ParsedOk);
        assert_eq!(result.words, words(&["존맛탱", "갑분싸"]));
    }

    #[tokio::test]
    async fn test_batch_is_capped() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .withf(|_, user| user.ends_with("단어 목록: 가가, 나나"))
            .times(1)
            .returning(|_, _| Ok(r#"["가가", "다다"]"#.to_string()));
        let (adjudicator, _) = adjudicator(provider, 2);

        let result = adjudicator.adjudicate(&words(&["가가", "나나", "다다"])).await;
        assert_eq!(result.words, words(&["가가"]));
    }

    #[tokio::test]
    async fn test_malformed_output_returns_input_unchanged() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok("신조어는 갑분싸입니다".to_string()));
        let (adjudicator, sleeper) = adjudicator(provider, 120);

        let input = words(&["갑분싸", "존맛탱"]);
        let result = adjudicator.adjudicate(&input).await;
        assert_eq!(result.state, AdjudicationState::ParseFailed);
        assert_eq!(result.words, input);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_retries_then_passes_through() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(2)
            .returning(|_, _| Err(DiscoveryError::Transport("429 Too Many Requests".into())));
        let (adjudicator, sleeper) = adjudicator(provider, 120);

        let input = words(&["갑분싸", "존맛탱"]);
        let result = adjudicator.adjudicate(&input).await;
        assert_eq!(result.state, AdjudicationState::TransportFailed);
        assert_eq!(result.words, input);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_empty_input_skips_the_call() {
        let mut provider = MockProvider::new();
        provider.expect_complete().times(0);
        let (adjudicator, _) = adjudicator(provider, 120);

        let result = adjudicator.adjudicate(&[]).await;
        assert_eq!(result.state, AdjudicationState::Passthrough);
        assert!(result.words.is_empty());
    }

    #[tokio::test]
    async fn test_passthrough() {
        let input = words(&["갑분싸"]);
        let result = PassthroughAdjudicator.adjudicate(&input).await;
        assert_eq!(result.words, input);
        assert_eq!(result.state, AdjudicationState::Passthrough);
    }

    #[test]
    fn test_min_keep_backfill() {
        let pre = words(&["가가", "나나", "다다", "라라"]);

        assert_eq!(apply_min_keep(vec![], &pre, 3), words(&["가가", "나나", "다다"]));
        assert_eq!(
            apply_min_keep(words(&["다다"]), &pre, 3),
            words(&["다다", "가가", "나나"])
        );
        assert_eq!(
            apply_min_keep(words(&["다다", "가가"]), &pre, 1),
            words(&["다다", "가가"])
        );
        assert_eq!(apply_min_keep(pre.clone(), &pre, 30), pre);
    }

    #[test]
    fn test_from_config_disabled_or_keyless() {
        assert!(LlmAdjudicator::from_config(&AdjudicatorConfig::default())
            .unwrap()
            .is_none());

        let keyless = AdjudicatorConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(LlmAdjudicator::from_config(&keyless).unwrap().is_none());
    }
}
