//! Merging of fetched sources into one combined guide
//!
//! Channels are deduplicated by identifier with first-seen-wins across the
//! declared source order, which gives earlier sources priority and keeps the
//! output deterministic. Programmes are concatenated per source without any
//! deduplication.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::errors::SourceError;
use crate::ingestor::EpgIngestor;
use crate::models::{CombinedGuide, EpgSource, MergeReport, SkippedSource};
use crate::utils::xmltv_parser::ParsedGuide;

pub struct GuideMerger {
    ingestor: EpgIngestor,
    concurrency: usize,
}

impl GuideMerger {
    pub fn new(ingestor: EpgIngestor, concurrency: usize) -> Self {
        Self {
            ingestor,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every source with bounded concurrency and merge the results.
    ///
    /// Fetches run in parallel but results are accumulated in declared
    /// source order, not completion order.
    pub async fn merge_sources(&self, sources: &[EpgSource]) -> (CombinedGuide, MergeReport) {
        info!(
            "Fetching {} EPG sources (concurrency {})",
            sources.len(),
            self.concurrency
        );

        let results: Vec<(EpgSource, Result<ParsedGuide, SourceError>)> =
            stream::iter(sources.iter().cloned())
                .map(|source| async move {
                    let result = self.ingestor.ingest_source(&source).await;
                    (source, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        Self::accumulate(results)
    }

    /// Pure accumulation step, run single-threaded after all fetches settle
    pub fn accumulate(
        results: Vec<(EpgSource, Result<ParsedGuide, SourceError>)>,
    ) -> (CombinedGuide, MergeReport) {
        let mut guide = CombinedGuide::default();
        let mut report = MergeReport {
            sources_total: results.len(),
            ..Default::default()
        };
        let mut seen_channels: HashSet<String> = HashSet::new();

        for (source, result) in results {
            let parsed = match result {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping EPG source '{}': {}", source.name, e);
                    report.skipped.push(SkippedSource {
                        name: source.name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            report.sources_merged += 1;
            report.malformed_elements += parsed.skipped_elements;

            for channel in parsed.channels {
                if seen_channels.contains(&channel.channel_id) {
                    debug!(
                        "Duplicate channel '{}' from source '{}' dropped",
                        channel.channel_id, source.name
                    );
                    report.duplicate_channels += 1;
                    continue;
                }
                seen_channels.insert(channel.channel_id.clone());
                guide.channels.push(channel);
            }

            guide.programs.extend(parsed.programs);
        }

        info!(
            "Combined guide: {} channels, {} programmes from {}/{} sources ({} duplicate channels dropped)",
            guide.channels.len(),
            guide.programs.len(),
            report.sources_merged,
            report.sources_total,
            report.duplicate_channels
        );

        (guide, report)
    }
}
