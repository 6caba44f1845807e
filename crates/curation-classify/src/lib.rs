//! The Phase-1 Classifier (C4): a cached, fast classification pass over
//! extracted content. Never fatal — any LLM failure degrades to a
//! URL-pattern fallback rather than aborting the import.

mod cache;
mod classifier;
mod fallback;
mod prompt;
mod schema;

pub use cache::ClassifierCache;
pub use classifier::Classifier;
pub use fallback::fallback_classification;
