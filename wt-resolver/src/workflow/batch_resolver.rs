//! Batch resolution coordinator
//!
//! Fans every reference out to every lookup strategy, runs the lookups on a
//! bounded pool, and collects the successful records sorted by name.
//!
//! # Failure isolation
//! A failing lookup never affects any other lookup. [`BatchResolver::resolve_all`]
//! logs and drops failures; [`BatchResolver::resolve_all_with_report`] also
//! hands them back to the caller.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::services::{DataOneLookup, HttpLookup, IndexQuery, LookupStrategy};
use crate::types::DataMapRecord;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One lookup that failed
#[derive(Debug)]
pub struct LookupFailure {
    pub reference: String,
    pub strategy: &'static str,
    pub error: ResolveError,
}

/// Records plus the failures that produced none
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Sorted by name, then data id, then repository
    pub records: Vec<DataMapRecord>,
    /// Sorted by reference, then strategy
    pub failures: Vec<LookupFailure>,
}

pub struct BatchResolver {
    strategies: Vec<Arc<dyn LookupStrategy>>,
    max_workers: usize,
}

impl BatchResolver {
    pub fn new(strategies: Vec<Arc<dyn LookupStrategy>>, max_workers: usize) -> Self {
        Self {
            strategies,
            max_workers: max_workers.max(1),
        }
    }

    /// DataONE and HTTP strategies sharing one HTTP client
    pub fn from_config(
        config: &ResolverConfig,
        index: Arc<dyn IndexQuery>,
        http_client: reqwest::Client,
    ) -> ResolveResult<Self> {
        let strategies: Vec<Arc<dyn LookupStrategy>> = vec![
            Arc::new(DataOneLookup::new(config, index)?),
            Arc::new(HttpLookup::new(http_client)?),
        ];
        Ok(Self::new(strategies, config.max_workers))
    }

    /// Resolve every reference with every strategy, returning only successes
    pub async fn resolve_all(&self, references: &[String]) -> Vec<DataMapRecord> {
        self.resolve_all_with_report(references).await.records
    }

    /// [`resolve_all`](Self::resolve_all) that also returns the failures
    pub async fn resolve_all_with_report(&self, references: &[String]) -> BatchReport {
        let tasks: Vec<(String, Arc<dyn LookupStrategy>)> = references
            .iter()
            .flat_map(|reference| {
                self.strategies
                    .iter()
                    .map(move |strategy| (reference.clone(), Arc::clone(strategy)))
            })
            .collect();
        let total = tasks.len();

        info!(
            references = references.len(),
            strategies = self.strategies.len(),
            workers = self.max_workers,
            "Starting batch lookup"
        );

        let outcomes: Vec<(String, &'static str, ResolveResult<Option<DataMapRecord>>)> = stream::iter(tasks)
            .map(|(reference, strategy)| async move {
                let outcome = strategy.lookup(&reference).await;
                (reference, strategy.name(), outcome)
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (reference, strategy, outcome) in outcomes {
            match outcome {
                Ok(Some(record)) => {
                    debug!(reference = %reference, strategy, name = %record.name, "Lookup succeeded");
                    report.records.push(record);
                }
                Ok(None) => {
                    debug!(reference = %reference, strategy, "Lookup not applicable");
                }
                Err(error) => {
                    warn!(
                        reference = %reference,
                        strategy,
                        code = error.code(),
                        error = %error,
                        "Lookup failed"
                    );
                    report.failures.push(LookupFailure {
                        reference,
                        strategy,
                        error,
                    });
                }
            }
        }

        report.records.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.data_id.cmp(&b.data_id))
                .then_with(|| a.repository.cmp(&b.repository))
        });
        report
            .failures
            .sort_by(|a, b| a.reference.cmp(&b.reference).then_with(|| a.strategy.cmp(&b.strategy)));

        info!(
            lookups = total,
            records = report.records.len(),
            failed = report.failures.len(),
            "Batch lookup completed"
        );

        report
    }
}
