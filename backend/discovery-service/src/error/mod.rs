use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Source {source_name} failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("No text collected from any source")]
    NoTextCollected,
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
