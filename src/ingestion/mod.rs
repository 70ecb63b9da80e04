//! Ingestion and enrichment runs.
//!
//! A run walks its sources one at a time, hands every candidate to the merge
//! engine and reports per-source counts. One failing source never stops the
//! others; an unavailable store stops everything.

mod context;
mod enrichment;
mod notifier;
mod orchestrator;

pub use context::RunContext;
pub use enrichment::{EnrichmentReport, EnrichmentRun};
pub use notifier::{LogNotifier, ReleaseNotifier};
pub use orchestrator::{IngestionOrchestrator, RunReport, SourceRun, SourceTally};

use crate::release_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
