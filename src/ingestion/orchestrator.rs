use super::context::RunContext;
use super::notifier::spawn_release_added;
use super::IngestionError;
use crate::merge::{UpsertEngine, UpsertOutcome};
use crate::sources::CandidateFeed;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// One configured source and how many postings to take from it.
pub struct SourceRun {
    pub feed: Box<dyn CandidateFeed>,
    pub limit: usize,
}

impl SourceRun {
    pub fn new(feed: Box<dyn CandidateFeed>, limit: usize) -> Self {
        Self { feed, limit }
    }
}

/// Counts for one source within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    pub source: String,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    /// Candidates handed to the merge engine.
    pub total: usize,
    /// Set when the fetch failed; the counts are then all zero.
    pub error: Option<String>,
}

impl SourceTally {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceTally>,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    pub total: usize,
    pub failed_sources: usize,
    pub cancelled: bool,
}

impl RunReport {
    fn record(&mut self, tally: SourceTally) {
        self.inserted += tally.inserted;
        self.updated += tally.updated;
        self.rejected += tally.rejected;
        self.total += tally.total;
        if tally.error.is_some() {
            self.failed_sources += 1;
        }
        self.sources.push(tally);
    }
}

/// Drives one ingestion run over the configured sources, one source at a time.
pub struct IngestionOrchestrator {
    ctx: RunContext,
    engine: UpsertEngine,
}

impl IngestionOrchestrator {
    pub fn new(ctx: RunContext) -> Self {
        let engine = UpsertEngine::new(ctx.store.clone());
        Self { ctx, engine }
    }

    /// Runs every source in order.
    ///
    /// A source whose fetch fails is recorded in the report and skipped. An
    /// unavailable store aborts the whole run.
    pub async fn run(&self, runs: &[SourceRun]) -> Result<RunReport, IngestionError> {
        let mut report = RunReport::default();

        for run in runs {
            if self.ctx.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let name = run.feed.name();
            let mut tally = SourceTally::new(&name);
            info!("Fetching up to {} postings from {}", run.limit, name);

            let fetched = tokio::select! {
                result = run.feed.fetch_candidates(run.limit) => Some(result),
                _ = self.ctx.cancellation_token.cancelled() => None,
            };
            let Some(fetched) = fetched else {
                info!("Run cancelled while fetching {}", name);
                report.cancelled = true;
                break;
            };

            let candidates = match fetched {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!("Fetching {} failed: {}", name, e);
                    tally.error = Some(e.to_string());
                    report.record(tally);
                    continue;
                }
            };

            for candidate in candidates {
                if self.ctx.is_cancelled() {
                    report.cancelled = true;
                    break;
                }

                match self.engine.upsert(&candidate) {
                    Ok(UpsertOutcome::Inserted(id)) => {
                        tally.inserted += 1;
                        if let Some(notifier) = &self.ctx.notifier {
                            spawn_release_added(
                                &self.ctx.notifications,
                                notifier.clone(),
                                id,
                                candidate,
                            );
                        }
                    }
                    Ok(UpsertOutcome::Updated(_)) => tally.updated += 1,
                    Ok(UpsertOutcome::Rejected(reason)) => {
                        debug!("{}: rejected candidate: {}", name, reason);
                        tally.rejected += 1;
                    }
                    Err(e) => {
                        error!("Store unavailable while ingesting {}: {}", name, e);
                        report.record(tally);
                        warn!(
                            "Aborting run after {} new, {} updated",
                            report.inserted, report.updated
                        );
                        return Err(IngestionError::StoreUnavailable(e));
                    }
                }
                tally.total += 1;
            }

            info!(
                "{}: {} new, {} updated, {} rejected, {} total",
                name, tally.inserted, tally.updated, tally.rejected, tally.total
            );
            report.record(tally);

            if report.cancelled {
                break;
            }
        }

        info!(
            "Ingestion complete: {} new, {} updated, {} rejected, {} total ({} of {} sources failed{})",
            report.inserted,
            report.updated,
            report.rejected,
            report.total,
            report.failed_sources,
            runs.len(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        Ok(report)
    }
}
