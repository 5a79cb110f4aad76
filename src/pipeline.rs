//! Run orchestration: load, clean, reconcile, persist.
//!
//! The orchestrator holds no domain logic. It drives each dataset through its
//! cleaning rule, keeps the cleaned tables in memory, reconciles the declared
//! pairs, and writes every result through a [`TableStore`]. A dataset that
//! cannot be loaded, or a pair that cannot be reconciled, is logged and
//! skipped; nothing short of a configuration error stops a run.

use std::collections::{BTreeMap, BTreeSet};

use clap::ValueEnum;
use log::{debug, error, info, warn};
use serde::Deserialize;

use crate::{
    config::PipelineConfig,
    dataset::{DatasetKind, JOIN_PAIRS, JoinPair},
    error::EtlError,
    reconcile::{self, ReconcileStats},
    store::TableStore,
    table::Table,
};

/// How reconciling one dataset against several partners combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Every pair starts from the cleaned tables; a dataset keeps the result of
    /// the last pair that touched it.
    Independent,
    /// Pairs narrow the tables in turn and repeat until nothing changes, so
    /// every pair's key closure holds at once.
    #[default]
    Cumulative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub kind: DatasetKind,
    pub raw_rows: usize,
    pub cleaned_rows: usize,
    pub final_rows: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub datasets: Vec<DatasetSummary>,
    pub skipped: Vec<DatasetKind>,
    pub failed_writes: Vec<String>,
}

impl RunReport {
    pub fn summary(&self, kind: DatasetKind) -> Option<&DatasetSummary> {
        self.datasets.iter().find(|summary| summary.kind == kind)
    }
}

/// Runs the whole pipeline against `store`.
pub fn run<S: TableStore>(config: &PipelineConfig, store: &mut S) -> RunReport {
    let mut report = RunReport::default();
    let cleaned = clean_datasets(store, &mut report);

    let reconciled = if config.reconcile {
        reconcile_datasets(&cleaned, &JOIN_PAIRS, config.reconcile_mode)
    } else {
        BTreeMap::new()
    };
    for (kind, table) in &reconciled {
        persist(store, *kind, table, &mut report);
    }

    for summary in &mut report.datasets {
        if let Some(table) = reconciled.get(&summary.kind) {
            summary.final_rows = table.height();
        }
    }
    report
}

/// Loads and cleans every declared dataset, writing each cleaned table.
pub fn clean_datasets<S: TableStore>(
    store: &mut S,
    report: &mut RunReport,
) -> BTreeMap<DatasetKind, Table> {
    let mut cleaned = BTreeMap::new();
    for descriptor in DatasetKind::ALL.map(DatasetKind::descriptor) {
        let raw = match store.load_input(descriptor.file_name) {
            Ok(Some(table)) => table,
            Ok(None) => {
                warn!(
                    "Skipping {}: {}",
                    descriptor.kind,
                    EtlError::MissingInput(descriptor.file_name.to_string())
                );
                report.skipped.push(descriptor.kind);
                continue;
            }
            Err(err) => {
                warn!("Skipping {}: {err:#}", descriptor.kind);
                report.skipped.push(descriptor.kind);
                continue;
            }
        };
        info!("Processing {}...", descriptor.file_name);
        let table = (descriptor.rule)(&raw);
        info!(
            "Cleaned {}: {} row(s) in, {} row(s) kept",
            descriptor.file_name,
            raw.height(),
            table.height()
        );
        persist(store, descriptor.kind, &table, report);
        report.datasets.push(DatasetSummary {
            kind: descriptor.kind,
            raw_rows: raw.height(),
            cleaned_rows: table.height(),
            final_rows: table.height(),
        });
        cleaned.insert(descriptor.kind, table);
    }
    cleaned
}

/// Reconciles the declared pairs over `cleaned` and returns the final table
/// of every dataset that took part in at least one reconciliation. Pairs
/// whose datasets are not both present are skipped silently.
pub fn reconcile_datasets(
    cleaned: &BTreeMap<DatasetKind, Table>,
    pairs: &[JoinPair],
    mode: ReconcileMode,
) -> BTreeMap<DatasetKind, Table> {
    match mode {
        ReconcileMode::Independent => reconcile_independent(cleaned, pairs),
        ReconcileMode::Cumulative => reconcile_cumulative(cleaned, pairs),
    }
}

fn reconcile_independent(
    cleaned: &BTreeMap<DatasetKind, Table>,
    pairs: &[JoinPair],
) -> BTreeMap<DatasetKind, Table> {
    let mut outputs = BTreeMap::new();
    for pair in pairs {
        let (Some(left), Some(right)) = (cleaned.get(&pair.left), cleaned.get(&pair.right)) else {
            continue;
        };
        match reconcile::reconcile(left, right, &pair.join) {
            Ok((left_out, right_out)) => {
                log_pair(pair, &reconcile::stats((left, right), (&left_out, &right_out)));
                outputs.insert(pair.left, left_out);
                outputs.insert(pair.right, right_out);
            }
            Err(err) => warn!("Skipping {} / {}: {err}", pair.left, pair.right),
        }
    }
    outputs
}

fn reconcile_cumulative(
    cleaned: &BTreeMap<DatasetKind, Table>,
    pairs: &[JoinPair],
) -> BTreeMap<DatasetKind, Table> {
    let mut current = cleaned.clone();
    let mut touched = BTreeSet::new();
    let mut pass = 0usize;
    loop {
        pass += 1;
        let mut changed = false;
        for pair in pairs {
            let (Some(left), Some(right)) = (current.get(&pair.left), current.get(&pair.right))
            else {
                continue;
            };
            let (left_out, right_out) = match reconcile::reconcile(left, right, &pair.join) {
                Ok(result) => result,
                Err(err) => {
                    if pass == 1 {
                        warn!("Skipping {} / {}: {err}", pair.left, pair.right);
                    }
                    continue;
                }
            };
            let stats = reconcile::stats((left, right), (&left_out, &right_out));
            if pass == 1 || stats.changed() {
                log_pair(pair, &stats);
            }
            changed |= stats.changed();
            touched.insert(pair.left);
            touched.insert(pair.right);
            current.insert(pair.left, left_out);
            current.insert(pair.right, right_out);
        }
        if !changed {
            break;
        }
    }
    debug!("Reconciliation settled after {pass} pass(es)");
    current
        .into_iter()
        .filter(|(kind, _)| touched.contains(kind))
        .collect()
}

fn log_pair(pair: &JoinPair, stats: &ReconcileStats) {
    info!(
        "Reconciled {} and {} on {}/{}: {} removed ({} remaining), {} removed ({} remaining)",
        pair.left,
        pair.right,
        pair.join.left_key,
        pair.join.right_key,
        stats.left_removed(),
        stats.left_after,
        stats.right_removed(),
        stats.right_after
    );
}

fn persist<S: TableStore>(store: &mut S, kind: DatasetKind, table: &Table, report: &mut RunReport) {
    let file_name = kind.cleaned_file_name();
    match store.write_output(&file_name, table) {
        Ok(()) => debug!("Wrote {} row(s) to {file_name}", table.height()),
        Err(err) => {
            error!("Writing {file_name} failed: {err:#}");
            report.failed_writes.push(file_name);
        }
    }
}
