#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use olist_etl::{dataset::DatasetKind, io_utils, store::TableStore, table::Table};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` (relative to the workspace), creating parent
    /// directories as needed.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write temp file");
        path
    }

    /// Writes every raw dataset of [`olist_fixture`] under `dir`.
    pub fn write_fixture(&self, dir: &str) -> PathBuf {
        for (kind, contents) in olist_fixture() {
            self.write(&format!("{dir}/{}", kind.file_name()), contents);
        }
        self.path().join(dir)
    }
}

/// In-memory [`TableStore`] for driving the pipeline without touching disk.
#[derive(Default)]
pub struct MemoryStore {
    pub inputs: BTreeMap<String, Table>,
    pub outputs: BTreeMap<String, Table>,
    pub failing_writes: BTreeSet<String>,
}

impl MemoryStore {
    pub fn with_fixture() -> Self {
        let mut store = Self::default();
        for (kind, contents) in olist_fixture() {
            store.inputs.insert(kind.file_name().to_string(), parse_csv(contents));
        }
        store
    }

    pub fn output(&self, kind: DatasetKind) -> &Table {
        self.outputs
            .get(&kind.cleaned_file_name())
            .unwrap_or_else(|| panic!("no output for {kind}"))
    }
}

impl TableStore for MemoryStore {
    fn load_input(&self, file_name: &str) -> Result<Option<Table>> {
        Ok(self.inputs.get(file_name).cloned())
    }

    fn write_output(&mut self, file_name: &str, table: &Table) -> Result<()> {
        if self.failing_writes.contains(file_name) {
            bail!("disk full");
        }
        self.outputs.insert(file_name.to_string(), table.clone());
        Ok(())
    }

    fn list_outputs(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .outputs
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn load_output(&self, file_name: &str) -> Result<Option<Table>> {
        Ok(self.outputs.get(file_name).cloned())
    }
}

pub fn parse_csv(contents: &str) -> Table {
    io_utils::read_table_from(contents.as_bytes(), b',', encoding_rs::UTF_8)
        .expect("fixture parses")
}

/// Rendered text of `column` in every row.
pub fn column_text(table: &Table, column: &str) -> Vec<String> {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("column {column} missing"));
    table
        .column_values(idx)
        .map(|value| value.map(|v| v.as_display()).unwrap_or_default())
        .collect()
}

/// A small but complete set of raw Olist datasets.
///
/// After cleaning: geolocation 3, customers 3, orders 3, reviews 2,
/// payments 2, products 2, sellers 2, categories 3, items 3.
pub fn olist_fixture() -> Vec<(DatasetKind, &'static str)> {
    vec![
        (
            DatasetKind::Geolocation,
            "geolocation_zip_code_prefix,geolocation_lat,geolocation_lng,geolocation_city,geolocation_state
1001,-23.5,-46.6,sao paulo,sp
1001,-23.5,-46.6,sao paulo,sp
2002,-22.9,-43.2,rio de janeiro,rj
3003,95.0,-43.2,nowhere,rj
9999,-10.0,-40.0,salvador,ba
",
        ),
        (
            DatasetKind::Customers,
            "customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state
c1,u1,1001,sao paulo,SP
c2,u2,2002,rio de janeiro,rj
c3,u3,4004,campinas,SP
c1,u1,1001,sao paulo,SP
",
        ),
        (
            DatasetKind::Orders,
            "order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date
o1,c1,delivered,2017-10-02 10:56:33,2017-10-02 11:07:15,2017-10-04 19:55:00,2017-10-10 21:25:13,2017-10-18 00:00:00
o2,c2,delivered,2018-07-24 20:41:37,2018-07-26 03:24:27,2018-07-26 14:31:00,2018-08-07 15:27:45,2018-08-13 00:00:00
o3,c3,delivered,2018-08-08 08:38:49,2018-08-08 08:55:23,2018-08-08 13:50:00,2018-08-17 18:06:29,2018-09-04 00:00:00
o4,c1,delivered,2018-08-08 08:38:49,2018-08-08 08:55:23,2018-08-07 13:50:00,2018-08-17 18:06:29,2018-09-04 00:00:00
o5,c2,canceled,2018-02-13 21:18:39,,,,2018-03-01 00:00:00
",
        ),
        (
            DatasetKind::OrderReviews,
            "review_id,order_id,review_score,review_comment_title,review_comment_message,review_creation_date,review_answer_timestamp
r1,o1,5,,great,2017-10-19 00:00:00,2017-10-20 10:00:00
r2,o2,4,,,2018-08-14 00:00:00,2018-08-14 00:00:00
r3,o3,6,,,2018-09-05 00:00:00,2018-09-06 00:00:00
r4,o2,3,,,2018-08-15 00:00:00,2018-08-14 00:00:00
r1,o1,1,,again,2017-10-21 00:00:00,2017-10-22 00:00:00
",
        ),
        (
            DatasetKind::OrderPayments,
            "order_id,payment_sequential,payment_type,payment_installments,payment_value
o1,1,credit_card,1,18.12
o2,1,boleto,1,141.46
o3,1,voucher,0,10.0
o4,1,credit_card,2,-5.0
",
        ),
        (
            DatasetKind::Products,
            "product_id,product_category_name,product_name_lenght,product_description_lenght,product_photos_qty,product_weight_g,product_length_cm,product_height_cm,product_width_cm
p1,perfumaria,40,287,1,225,16,10,14
p2,artes,44,276,1,1000,30,18,20
p3,esporte_lazer,46,250,1,0,18,9,15
p4,,46,250,1,100,18,9,15
",
        ),
        (
            DatasetKind::Sellers,
            "seller_id,seller_zip_code_prefix,seller_city,seller_state
s1,1001,sao paulo,SP
s2,5005,curitiba,PR
",
        ),
        (
            DatasetKind::ProductCategories,
            "product_category_name,product_category_name_english
perfumaria,perfumery
artes,art
beleza_saude,health_beauty
",
        ),
        (
            DatasetKind::OrderItems,
            "order_id,order_item_id,product_id,seller_id,shipping_limit_date,price,freight_value
o1,1,p1,s1,2017-10-06 11:07:15,58.90,13.29
o2,1,p2,s1,2018-07-30 03:24:27,239.90,0
o2,2,p1,s2,2018-07-30 03:24:27,19.90,8.72
o9,1,p1,s1,2018-01-01 00:00:00,0,5.0
",
        ),
    ]
}
