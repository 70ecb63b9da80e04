use super::context::RunContext;
use super::IngestionError;
use crate::merge::FillOnlyUpdate;
use crate::sources::discogs::ReleaseLookup;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Rows selected as missing artwork, price or label.
    pub candidates: usize,
    pub enriched: usize,
    pub not_found: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Fills gaps in Reddit rows from a lookup service.
pub struct EnrichmentRun {
    ctx: RunContext,
    lookup: Arc<dyn ReleaseLookup>,
}

impl EnrichmentRun {
    pub fn new(ctx: RunContext, lookup: Arc<dyn ReleaseLookup>) -> Self {
        Self { ctx, lookup }
    }

    pub async fn run(&self, limit: usize) -> Result<EnrichmentReport, IngestionError> {
        let releases = self.ctx.store.releases_needing_enrichment(limit)?;
        let mut report = EnrichmentReport {
            candidates: releases.len(),
            ..Default::default()
        };
        info!("Enriching {} releases", releases.len());

        for release in releases {
            if self.ctx.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let looked_up = tokio::select! {
                result = self.lookup.lookup(&release.artist, &release.album) => Some(result),
                _ = self.ctx.cancellation_token.cancelled() => None,
            };
            let Some(looked_up) = looked_up else {
                report.cancelled = true;
                break;
            };

            let found = match looked_up {
                Ok(Some(found)) => found,
                Ok(None) => {
                    debug!("No match for {} - {}", release.artist, release.album);
                    report.not_found += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Lookup failed for {} - {} (#{}): {}",
                        release.artist, release.album, release.id, e
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let update = FillOnlyUpdate::for_enrichment(&found);
            if update.is_empty() {
                report.not_found += 1;
                continue;
            }

            match self.ctx.store.update_fill_only(release.id, &update) {
                Ok(_) => {
                    debug!("Enriched #{} {} - {}", release.id, release.artist, release.album);
                    report.enriched += 1;
                }
                Err(e) if e.is_fatal() => return Err(IngestionError::StoreUnavailable(e)),
                Err(e) => {
                    warn!("Failed to enrich #{}: {}", release.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Enrichment complete: {} enriched, {} not found, {} failed of {}",
            report.enriched, report.not_found, report.failed, report.candidates
        );
        Ok(report)
    }
}
