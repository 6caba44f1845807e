//! The Import Orchestrator (C7): the single `import` operation that ties
//! the URL validator, extractor registry, classifier, hierarchy engine,
//! and processing queue into one pipeline (§4.8), plus the bounded
//! batch-import supplement built on top of it.

mod batch;
mod orchestrator;
mod types;

pub use batch::{cancel_batch, get_batch, start_batch, MAX_BATCH_SIZE};
pub use orchestrator::ImportOrchestrator;
pub use types::{HierarchyCodes, ImportOptions, ImportResult};
