//! Batch entry points: merge or split every eligible movie or episode.
//!
//! Work units run on a [`JoinSet`] bounded by a semaphore of
//! `merge.concurrency` permits. New units are started only while the
//! cancellation token is untripped; units already started always run to
//! completion. Outcomes and progress are handled in the single collection
//! loop, so progress never goes backwards, and 100 is always reported last.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use vm_core::config::MergeConfig;
use vm_core::{Catalog, ItemId, ItemKind, Result};

use crate::grouping::{build_groups, GroupingKey};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::reader::eligible_items;
use crate::reconcile::{reconcile_group, GroupOutcome, GroupStatus};
use crate::split::{split_item, SplitOutcome};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Summary of a merge run.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub kind: ItemKind,
    pub items_eligible: usize,
    pub groups_total: usize,
    pub groups_merged: usize,
    pub groups_partial: usize,
    pub groups_unchanged: usize,
    pub groups_collapsed: usize,
    /// Groups that could not be read or whose task panicked.
    pub groups_failed: usize,
    /// Groups never started because the run was cancelled.
    pub groups_not_started: usize,
    pub items_linked: usize,
    pub items_flattened: usize,
    pub item_failures: usize,
    pub writes: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl MergeReport {
    fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            items_eligible: 0,
            groups_total: 0,
            groups_merged: 0,
            groups_partial: 0,
            groups_unchanged: 0,
            groups_collapsed: 0,
            groups_failed: 0,
            groups_not_started: 0,
            items_linked: 0,
            items_flattened: 0,
            item_failures: 0,
            writes: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    fn record(&mut self, outcome: &GroupOutcome) {
        match outcome.status {
            GroupStatus::Merged => self.groups_merged += 1,
            GroupStatus::Partial => self.groups_partial += 1,
            GroupStatus::Unchanged => self.groups_unchanged += 1,
            GroupStatus::Collapsed => self.groups_collapsed += 1,
        }
        self.items_linked += outcome.linked.len();
        self.items_flattened += outcome.flattened.len();
        self.item_failures += outcome.failed.len();
        self.writes += outcome.writes;
    }
}

/// Summary of a split run.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub kind: ItemKind,
    pub items_eligible: usize,
    /// Eligible items that carried linkage when listed.
    pub items_linked: usize,
    pub groups_split: usize,
    pub items_released: usize,
    /// Excluded alternates left linked to their primary.
    pub items_retained: usize,
    pub item_failures: usize,
    /// Items whose split could not be read or whose task panicked.
    pub items_errored: usize,
    pub items_not_started: usize,
    pub writes: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl SplitReport {
    fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            items_eligible: 0,
            items_linked: 0,
            groups_split: 0,
            items_released: 0,
            items_retained: 0,
            item_failures: 0,
            items_errored: 0,
            items_not_started: 0,
            writes: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    fn record(&mut self, outcome: &SplitOutcome) {
        if !outcome.released.is_empty() {
            self.groups_split += 1;
        }
        self.items_released += outcome.released.len();
        self.items_retained += outcome.retained.len();
        self.item_failures += outcome.failed.len();
        self.writes += outcome.writes;
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub async fn merge_movies(
    catalog: &Arc<dyn Catalog>,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<MergeReport> {
    merge(catalog, ItemKind::Movie, config, progress, cancel).await
}

pub async fn merge_episodes(
    catalog: &Arc<dyn Catalog>,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<MergeReport> {
    merge(catalog, ItemKind::Episode, config, progress, cancel).await
}

pub async fn split_movies(
    catalog: &Arc<dyn Catalog>,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<SplitReport> {
    split(catalog, ItemKind::Movie, config, progress, cancel).await
}

pub async fn split_episodes(
    catalog: &Arc<dyn Catalog>,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<SplitReport> {
    split(catalog, ItemKind::Episode, config, progress, cancel).await
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

async fn merge(
    catalog: &Arc<dyn Catalog>,
    kind: ItemKind,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<MergeReport> {
    let started = Instant::now();
    let mut report = MergeReport::new(kind);

    if cancel.is_cancelled() {
        report.cancelled = true;
        ProgressTracker::new(progress, 0).finish();
        return Ok(report);
    }

    let items = match eligible_items(catalog.as_ref(), kind, config).await {
        Ok(items) => items,
        Err(e) => {
            ProgressTracker::new(progress, 0).finish();
            return Err(e);
        }
    };
    report.items_eligible = items.len();

    let groups = build_groups(items, config);
    report.groups_total = groups.len();
    tracing::info!(kind = %kind, groups = groups.len(), "Scanning for repeated items");

    let mut tracker = ProgressTracker::new(progress, groups.len());
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut pending = groups.into_iter();
    let mut tasks: JoinSet<(GroupingKey, Result<GroupOutcome>)> = JoinSet::new();

    loop {
        while !cancel.is_cancelled() {
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                break;
            };
            let Some(group) = pending.next() else {
                break;
            };
            if group.is_consolidated() {
                tracing::trace!(group = %group.key, "Already consolidated");
                report.groups_unchanged += 1;
                tracker.advance(1);
                continue;
            }

            let catalog = Arc::clone(catalog);
            tasks.spawn(async move {
                let _permit = permit;
                let ids = group.ids();
                let outcome = reconcile_group(catalog.as_ref(), &ids).await;
                (group.key, outcome)
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        match joined {
            Ok((key, Ok(outcome))) => {
                if outcome.status != GroupStatus::Unchanged {
                    tracing::info!(
                        group = %key,
                        primary = ?outcome.primary,
                        status = ?outcome.status,
                        linked = outcome.linked.len(),
                        flattened = outcome.flattened.len(),
                        "Merged group"
                    );
                }
                report.record(&outcome);
            }
            Ok((key, Err(e))) => {
                tracing::warn!(group = %key, error = %e, "Failed to reconcile group");
                report.groups_failed += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Group task panicked");
                report.groups_failed += 1;
            }
        }
        tracker.advance(1);
    }

    report.groups_not_started = pending.len();
    report.cancelled = cancel.is_cancelled();
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    tracker.finish();

    tracing::info!(
        kind = %kind,
        merged = report.groups_merged,
        partial = report.groups_partial,
        unchanged = report.groups_unchanged,
        failed = report.groups_failed,
        writes = report.writes,
        cancelled = report.cancelled,
        "Merge finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

async fn split(
    catalog: &Arc<dyn Catalog>,
    kind: ItemKind,
    config: &MergeConfig,
    progress: Option<ProgressSink>,
    cancel: CancellationToken,
) -> Result<SplitReport> {
    let started = Instant::now();
    let mut report = SplitReport::new(kind);

    if cancel.is_cancelled() {
        report.cancelled = true;
        ProgressTracker::new(progress, 0).finish();
        return Ok(report);
    }

    let items = match eligible_items(catalog.as_ref(), kind, config).await {
        Ok(items) => items,
        Err(e) => {
            ProgressTracker::new(progress, 0).finish();
            return Err(e);
        }
    };
    report.items_eligible = items.len();
    let mut tracker = ProgressTracker::new(progress, items.len());

    // Items sharing a primary are split together so two of them never
    // race on the same group.
    let mut units: BTreeMap<ItemId, Vec<ItemId>> = BTreeMap::new();
    let mut unlinked = 0;
    for item in &items {
        if item.is_unlinked() {
            unlinked += 1;
            continue;
        }
        let root = match item.primary_version_id {
            Some(primary) if !item.has_alternates() => primary,
            _ => item.id,
        };
        units.entry(root).or_default().push(item.id);
    }
    report.items_linked = items.len() - unlinked;
    tracker.advance(unlinked);
    tracing::info!(kind = %kind, linked = report.items_linked, "Splitting merged items");

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut pending = units.into_values();
    let mut tasks: JoinSet<Vec<(ItemId, Result<SplitOutcome>)>> = JoinSet::new();
    let mut in_flight: usize = 0;

    loop {
        while !cancel.is_cancelled() {
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                break;
            };
            let Some(unit) = pending.next() else {
                break;
            };

            in_flight += unit.len();
            let catalog = Arc::clone(catalog);
            let config = config.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let mut results = Vec::with_capacity(unit.len());
                for id in unit {
                    results.push((id, split_item(catalog.as_ref(), id, &config).await));
                }
                results
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        match joined {
            Ok(results) => {
                in_flight -= results.len();
                let n = results.len();
                for (id, result) in results {
                    match result {
                        Ok(outcome) => report.record(&outcome),
                        Err(e) => {
                            tracing::warn!(item = %id, error = %e, "Failed to split item");
                            report.items_errored += 1;
                        }
                    }
                }
                tracker.advance(n);
            }
            Err(e) => {
                tracing::error!(error = %e, "Split task panicked");
                // The unit's size is unknown here; settle the count once
                // every task has finished.
            }
        }
    }

    // Whatever was in flight but never reported belonged to panicked tasks.
    report.items_errored += in_flight;
    report.items_not_started = pending.map(|unit| unit.len()).sum();
    report.cancelled = cancel.is_cancelled();
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    tracker.finish();

    tracing::info!(
        kind = %kind,
        groups = report.groups_split,
        released = report.items_released,
        failures = report.item_failures,
        writes = report.writes,
        cancelled = report.cancelled,
        "Split finished"
    );
    Ok(report)
}
