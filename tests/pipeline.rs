mod common;

use std::path::PathBuf;

use common::{MemoryStore, column_text};
use olist_etl::{
    config::PipelineConfig,
    dataset::DatasetKind,
    pipeline::{self, ReconcileMode},
    reconcile::{self, JoinSpec},
};

fn config(reconcile: bool, reconcile_mode: ReconcileMode) -> PipelineConfig {
    PipelineConfig {
        input_dir: PathBuf::from("raw"),
        output_dir: PathBuf::from("out"),
        delimiter: None,
        encoding: encoding_rs::UTF_8,
        reconcile,
        reconcile_mode,
    }
}

fn heights(store: &MemoryStore) -> Vec<(DatasetKind, usize)> {
    DatasetKind::ALL
        .iter()
        .map(|kind| (*kind, store.output(*kind).height()))
        .collect()
}

#[test]
fn cleaning_only_writes_every_cleaned_dataset() {
    let mut store = MemoryStore::with_fixture();
    let report = pipeline::run(&config(false, ReconcileMode::Cumulative), &mut store);

    assert!(report.skipped.is_empty());
    assert_eq!(
        heights(&store),
        vec![
            (DatasetKind::Geolocation, 3),
            (DatasetKind::Customers, 3),
            (DatasetKind::Orders, 3),
            (DatasetKind::OrderReviews, 2),
            (DatasetKind::OrderPayments, 2),
            (DatasetKind::Products, 2),
            (DatasetKind::Sellers, 2),
            (DatasetKind::ProductCategories, 3),
            (DatasetKind::OrderItems, 3),
        ]
    );
    let orders = report.summary(DatasetKind::Orders).unwrap();
    assert_eq!((orders.raw_rows, orders.cleaned_rows, orders.final_rows), (5, 3, 3));
}

#[test]
fn independent_mode_keeps_each_datasets_last_reconciliation() {
    let mut store = MemoryStore::with_fixture();
    pipeline::run(&config(true, ReconcileMode::Independent), &mut store);

    assert_eq!(
        heights(&store),
        vec![
            (DatasetKind::Geolocation, 1),
            (DatasetKind::Customers, 3),
            (DatasetKind::Orders, 2),
            (DatasetKind::OrderReviews, 2),
            (DatasetKind::OrderPayments, 2),
            (DatasetKind::Products, 2),
            (DatasetKind::Sellers, 2),
            (DatasetKind::ProductCategories, 2),
            (DatasetKind::OrderItems, 3),
        ]
    );
    // Customers were last reconciled against orders, which still reference c3.
    assert_eq!(
        column_text(store.output(DatasetKind::Customers), "customer_id"),
        vec!["c1", "c2", "c3"]
    );
}

#[test]
fn cumulative_mode_settles_with_every_pair_closed() {
    let mut store = MemoryStore::with_fixture();
    let report = pipeline::run(&config(true, ReconcileMode::Cumulative), &mut store);

    for (kind, height) in heights(&store) {
        assert_eq!(height, 1, "{kind}");
    }
    assert_eq!(
        column_text(store.output(DatasetKind::OrderItems), "order_id"),
        vec!["o1"]
    );
    let items = report.summary(DatasetKind::OrderItems).unwrap();
    assert_eq!((items.cleaned_rows, items.final_rows), (3, 1));

    for pair in olist_etl::dataset::JOIN_PAIRS {
        let left = store.output(pair.left);
        let right = store.output(pair.right);
        let (left_out, right_out) = reconcile::reconcile(left, right, &pair.join).unwrap();
        assert_eq!(left_out.height(), left.height(), "{} / {}", pair.left, pair.right);
        assert_eq!(right_out.height(), right.height(), "{} / {}", pair.left, pair.right);
    }
}

#[test]
fn missing_dataset_is_skipped_and_its_pairs_ignored() {
    let mut store = MemoryStore::with_fixture();
    store
        .inputs
        .remove(DatasetKind::Geolocation.file_name());
    let report = pipeline::run(&config(true, ReconcileMode::Cumulative), &mut store);

    assert_eq!(report.skipped, vec![DatasetKind::Geolocation]);
    assert!(
        !store
            .outputs
            .contains_key(&DatasetKind::Geolocation.cleaned_file_name())
    );
    assert_eq!(store.output(DatasetKind::Customers).height(), 2);
    assert_eq!(store.output(DatasetKind::Sellers).height(), 2);
    assert_eq!(store.output(DatasetKind::OrderItems).height(), 3);
}

#[test]
fn failed_writes_are_reported_without_stopping_the_run() {
    let mut store = MemoryStore::with_fixture();
    store
        .failing_writes
        .insert(DatasetKind::Orders.cleaned_file_name());
    let report = pipeline::run(&config(false, ReconcileMode::Cumulative), &mut store);

    assert_eq!(report.failed_writes, vec![DatasetKind::Orders.cleaned_file_name()]);
    assert_eq!(store.output(DatasetKind::OrderItems).height(), 3);
}

#[test]
fn reconcile_closure_on_simple_key_sets() {
    let a = common::parse_csv("id,label\n1,one\n2,two\n3,three\n");
    let b = common::parse_csv("id\n2\n3\n4\n");
    let (a_out, b_out) = reconcile::reconcile(&a, &b, &JoinSpec::shared("id")).unwrap();
    assert_eq!(column_text(&a_out, "label"), vec!["two", "three"]);
    assert_eq!(column_text(&b_out, "id"), vec!["2", "3"]);
}
