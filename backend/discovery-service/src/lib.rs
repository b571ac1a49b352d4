pub mod config;
pub mod error;
pub mod lexicon;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{DiscoveryError, Result};
pub use lexicon::Lexicon;
pub use models::{
    AdjudicationState, Candidate, FinalWord, Meaning, MeaningSource, RunReport, SourceIndex,
    StageCounts,
};
pub use services::DiscoveryPipeline;
