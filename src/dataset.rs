//! The fixed set of Olist datasets, their files, and how they relate.
//!
//! [`DatasetKind`] is closed: every kind has exactly one source file, one
//! database table name, and one cleaning rule, all resolved by exhaustive
//! matches. [`JOIN_PAIRS`] lists the key relationships reconciled after
//! cleaning, in the order they are applied.

use std::fmt;

use crate::{reconcile::JoinSpec, rules, table::Table};

pub const CLEANED_PREFIX: &str = "cleaned_";

/// A pure table transform. Bad rows are filtered out, never reported as errors.
pub type CleaningRule = fn(&Table) -> Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Geolocation,
    Customers,
    Orders,
    OrderReviews,
    OrderPayments,
    Products,
    Sellers,
    ProductCategories,
    OrderItems,
}

impl DatasetKind {
    /// Processing order for a run.
    pub const ALL: [DatasetKind; 9] = [
        DatasetKind::Geolocation,
        DatasetKind::Customers,
        DatasetKind::Orders,
        DatasetKind::OrderReviews,
        DatasetKind::OrderPayments,
        DatasetKind::Products,
        DatasetKind::Sellers,
        DatasetKind::ProductCategories,
        DatasetKind::OrderItems,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKind::Geolocation => "olist_geolocation_dataset.csv",
            DatasetKind::Customers => "olist_customers_dataset.csv",
            DatasetKind::Orders => "olist_orders_dataset.csv",
            DatasetKind::OrderReviews => "olist_order_reviews_dataset.csv",
            DatasetKind::OrderPayments => "olist_order_payments_dataset.csv",
            DatasetKind::Products => "olist_products_dataset.csv",
            DatasetKind::Sellers => "olist_sellers_dataset.csv",
            DatasetKind::ProductCategories => "product_category_name_translation.csv",
            DatasetKind::OrderItems => "olist_order_items_dataset.csv",
        }
    }

    /// Destination table when uploading the cleaned file.
    pub fn table_name(self) -> &'static str {
        match self {
            DatasetKind::Geolocation => "geolocation",
            DatasetKind::Customers => "customers",
            DatasetKind::Orders => "orders",
            DatasetKind::OrderReviews => "order_reviews",
            DatasetKind::OrderPayments => "order_payments",
            DatasetKind::Products => "products",
            DatasetKind::Sellers => "sellers",
            DatasetKind::ProductCategories => "product_categories",
            DatasetKind::OrderItems => "order_items",
        }
    }

    pub fn cleaned_file_name(self) -> String {
        format!("{CLEANED_PREFIX}{}", self.file_name())
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }

    /// Static mapping from a cleaned artifact name back to its dataset.
    pub fn from_cleaned_file_name(name: &str) -> Option<Self> {
        name.strip_prefix(CLEANED_PREFIX)
            .and_then(Self::from_file_name)
    }

    pub fn rule(self) -> CleaningRule {
        match self {
            DatasetKind::Geolocation => rules::clean_geolocation,
            DatasetKind::Customers => rules::clean_customers,
            DatasetKind::Orders => rules::clean_orders,
            DatasetKind::OrderReviews => rules::clean_order_reviews,
            DatasetKind::OrderPayments => rules::clean_order_payments,
            DatasetKind::Products => rules::clean_products,
            DatasetKind::Sellers => rules::clean_sellers,
            DatasetKind::ProductCategories => rules::clean_product_categories,
            DatasetKind::OrderItems => rules::clean_order_items,
        }
    }

    pub fn clean(self, table: &Table) -> Table {
        (self.rule())(table)
    }

    pub fn descriptor(self) -> DatasetDescriptor {
        DatasetDescriptor {
            file_name: self.file_name(),
            kind: self,
            rule: self.rule(),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Clone, Copy)]
pub struct DatasetDescriptor {
    pub file_name: &'static str,
    pub kind: DatasetKind,
    pub rule: CleaningRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPair {
    pub left: DatasetKind,
    pub right: DatasetKind,
    pub join: JoinSpec,
}

impl JoinPair {
    const fn new(left: DatasetKind, right: DatasetKind, join: JoinSpec) -> Self {
        Self { left, right, join }
    }
}

pub const JOIN_PAIRS: [JoinPair; 9] = [
    JoinPair::new(
        DatasetKind::Customers,
        DatasetKind::Geolocation,
        JoinSpec::pair("customer_zip_code_prefix", "geolocation_zip_code_prefix"),
    ),
    JoinPair::new(
        DatasetKind::Customers,
        DatasetKind::Orders,
        JoinSpec::shared("customer_id"),
    ),
    JoinPair::new(
        DatasetKind::Orders,
        DatasetKind::OrderReviews,
        JoinSpec::shared("order_id"),
    ),
    JoinPair::new(
        DatasetKind::Orders,
        DatasetKind::OrderPayments,
        JoinSpec::shared("order_id"),
    ),
    JoinPair::new(
        DatasetKind::Products,
        DatasetKind::ProductCategories,
        JoinSpec::shared("product_category_name"),
    ),
    JoinPair::new(
        DatasetKind::Sellers,
        DatasetKind::Geolocation,
        JoinSpec::pair("seller_zip_code_prefix", "geolocation_zip_code_prefix"),
    ),
    JoinPair::new(
        DatasetKind::OrderItems,
        DatasetKind::Orders,
        JoinSpec::shared("order_id"),
    ),
    JoinPair::new(
        DatasetKind::OrderItems,
        DatasetKind::Products,
        JoinSpec::shared("product_id"),
    ),
    JoinPair::new(
        DatasetKind::OrderItems,
        DatasetKind::Sellers,
        JoinSpec::shared("seller_id"),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_names_round_trip_through_static_mapping() {
        for kind in DatasetKind::ALL {
            assert_eq!(
                DatasetKind::from_cleaned_file_name(&kind.cleaned_file_name()),
                Some(kind)
            );
        }
        assert_eq!(DatasetKind::from_cleaned_file_name("cleaned_notes.csv"), None);
        assert_eq!(
            DatasetKind::from_cleaned_file_name("olist_orders_dataset.csv"),
            None
        );
    }

    #[test]
    fn file_and_table_names_are_unique() {
        let mut files: Vec<_> = DatasetKind::ALL.iter().map(|k| k.file_name()).collect();
        let mut tables: Vec<_> = DatasetKind::ALL.iter().map(|k| k.table_name()).collect();
        files.sort_unstable();
        files.dedup();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(files.len(), 9);
        assert_eq!(tables.len(), 9);
    }

    #[test]
    fn join_pairs_reference_distinct_datasets() {
        assert!(JOIN_PAIRS.iter().all(|pair| pair.left != pair.right));
    }
}
