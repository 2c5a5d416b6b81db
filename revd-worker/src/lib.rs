//! revd-worker library interface
//!
//! Exposes the classifier seam and worker loop for integration testing.

pub mod classifier;
pub mod db;
pub mod worker;

pub use classifier::{Classifier, LabelKind, OllamaClassifier, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
pub use worker::{EnrichmentWorker, WorkerConfig};
