//! ML-probability filter.
//!
//! A [`SlangClassifier`] scores candidates with a slang probability; the
//! stage keeps the ones at or above the threshold. Without a classifier, or
//! when the classifier fails, the stage passes everything through.

use crate::config::ClassifierConfig;
use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use resilience::{presets, with_retry, with_timeout_result, RetryConfig, TimeoutError, TokioSleeper};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierInput {
    pub word: String,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlangPrediction {
    pub word: String,
    pub probability: f64,
    pub is_slang: bool,
    /// Distance from the decision boundary, `|p - 0.5| * 2`
    pub confidence: f64,
}

impl SlangPrediction {
    pub fn new(word: impl Into<String>, probability: f64, threshold: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        Self {
            word: word.into(),
            probability,
            is_slang: probability >= threshold,
            confidence: (probability - 0.5).abs() * 2.0,
        }
    }
}

#[async_trait]
pub trait SlangClassifier: Send + Sync {
    async fn predict_batch(&self, inputs: &[ClassifierInput]) -> Result<Vec<SlangPrediction>>;

    fn name(&self) -> &str;
}

/// Posts `{items:[{word, contexts}]}` to a model server and reads `[{word, probability}]`
pub struct HttpSlangClassifier {
    client: HttpClient,
    endpoint: String,
    threshold: f64,
    timeout: Duration,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    items: &'a [ClassifierInput],
}

#[derive(Deserialize)]
struct PredictItem {
    word: String,
    probability: f64,
}

impl HttpSlangClassifier {
    /// `None` when no endpoint is configured
    pub fn from_config(config: &ClassifierConfig, threshold: f64) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref() else {
            info!("Slang classifier is disabled");
            return Ok(None);
        };

        let preset = presets::classifier_config();
        let client = HttpClient::builder().timeout(config.timeout).build()?;

        info!(endpoint, threshold, "Slang classifier initialized");
        Ok(Some(Self {
            client,
            endpoint: endpoint.to_string(),
            threshold,
            timeout: config.timeout.min(preset.timeout.duration),
            retry: preset.retry.unwrap_or_default(),
        }))
    }

    async fn post_once(&self, inputs: &[ClassifierInput]) -> Result<Vec<PredictItem>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { items: inputs })
            .send()
            .await
            .map_err(|e| DiscoveryError::Classifier(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Classifier(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DiscoveryError::Classifier(format!("Parse error: {}", e)))
    }
}

#[async_trait]
impl SlangClassifier for HttpSlangClassifier {
    async fn predict_batch(&self, inputs: &[ClassifierInput]) -> Result<Vec<SlangPrediction>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let items = with_retry(&self.retry, &TokioSleeper, || async move {
            match with_timeout_result(self.timeout, self.post_once(inputs)).await {
                Ok(items) => Ok(items),
                Err(TimeoutError::Elapsed(d)) => Err(DiscoveryError::Classifier(format!(
                    "timed out after {:?}",
                    d
                ))),
                Err(TimeoutError::Failed(e)) => Err(e),
            }
        })
        .await
        .map_err(|e| e.into_inner())?;

        Ok(items
            .into_iter()
            .map(|item| SlangPrediction::new(item.word, item.probability, self.threshold))
            .collect())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Result of the classifier stage
#[derive(Debug, Clone, Default)]
pub struct ClassifierOutcome {
    /// Surviving words with their probability, `None` when the stage was skipped
    pub kept: BTreeMap<String, Option<f64>>,
    pub skipped: bool,
}

pub struct ClassifierFilter {
    classifier: Option<Arc<dyn SlangClassifier>>,
    threshold: f64,
    analysis_limit: usize,
}

impl ClassifierFilter {
    pub fn new(
        classifier: Option<Arc<dyn SlangClassifier>>,
        threshold: f64,
        analysis_limit: usize,
    ) -> Self {
        Self {
            classifier,
            threshold,
            analysis_limit,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, 0.0, 0)
    }

    /// `candidates` are `(word, frequency)`; `contexts` supplies example texts per word
    pub async fn apply(
        &self,
        candidates: &[(String, u64)],
        contexts: &HashMap<String, Vec<String>>,
    ) -> ClassifierOutcome {
        let passthrough = || ClassifierOutcome {
            kept: candidates.iter().map(|(w, _)| (w.clone(), None)).collect(),
            skipped: true,
        };

        let Some(classifier) = &self.classifier else {
            return passthrough();
        };
        if candidates.is_empty() {
            return passthrough();
        }

        let mut ordered: Vec<&(String, u64)> = candidates.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ordered.truncate(self.analysis_limit);

        let inputs: Vec<ClassifierInput> = ordered
            .iter()
            .map(|(word, _)| ClassifierInput {
                word: word.clone(),
                contexts: contexts.get(word).cloned().unwrap_or_default(),
            })
            .collect();

        let predictions = match classifier.predict_batch(&inputs).await {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(classifier = classifier.name(), error = %e, "Classifier failed, skipping stage");
                return passthrough();
            }
        };

        let probabilities: HashMap<&str, f64> = predictions
            .iter()
            .map(|p| (p.word.as_str(), p.probability))
            .collect();

        let kept: BTreeMap<String, Option<f64>> = inputs
            .iter()
            .filter_map(|input| {
                let p = *probabilities.get(input.word.as_str())?;
                (p >= self.threshold).then(|| (input.word.clone(), Some(p)))
            })
            .collect();

        info!(
            analyzed = inputs.len(),
            kept = kept.len(),
            threshold = self.threshold,
            "Classifier stage finished"
        );
        ClassifierOutcome {
            kept,
            skipped: false,
        }
    }
}
