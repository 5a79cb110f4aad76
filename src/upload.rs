//! Loading cleaned artifacts into PostgreSQL.
//!
//! [`upload_cleaned`] walks the `cleaned_*` files in the output location,
//! maps each to its table through the static dataset mapping, and hands it to
//! a [`TableSink`]. Unmapped files and failed uploads are logged and skipped.
//! [`PostgresSink`] is the production sink: one connection pool for the whole
//! run, driven by a private current-thread runtime.

use anyhow::{Context, Result};
use log::{error, info, warn};
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
};
use tokio::runtime::Runtime;

use crate::{
    config::DatabaseConfig,
    data::Value,
    dataset::{CLEANED_PREFIX, DatasetKind},
    error::EtlError,
    schema::ColumnType,
    store::TableStore,
    table::Table,
};

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

pub trait TableSink {
    /// Replaces `table_name` with the contents of `table`.
    fn replace_table(&mut self, table_name: &str, table: &Table) -> Result<()>;
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
    pub unmapped: Vec<String>,
}

pub fn upload_cleaned<S, K>(store: &S, sink: &mut K) -> Result<UploadReport>
where
    S: TableStore,
    K: TableSink,
{
    let mut report = UploadReport::default();
    for file_name in store.list_outputs(CLEANED_PREFIX)? {
        let Some(kind) = DatasetKind::from_cleaned_file_name(&file_name) else {
            warn!(
                "{}; skipping upload",
                EtlError::UnmappedArtifact(file_name.clone())
            );
            report.unmapped.push(file_name);
            continue;
        };
        let table_name = kind.table_name();
        info!("Uploading {file_name} to table {table_name}...");
        match upload_one(store, sink, &file_name, table_name) {
            Ok(rows) => {
                info!("Upload complete for {table_name} ({rows} row(s))");
                report.uploaded.push(file_name);
            }
            Err(err) => {
                let failure = EtlError::UploadFailure {
                    file: file_name.clone(),
                    table: table_name.to_string(),
                    source: err,
                };
                error!("{failure:#}");
                report.failed.push(file_name);
            }
        }
    }
    Ok(report)
}

fn upload_one<S, K>(store: &S, sink: &mut K, file_name: &str, table_name: &str) -> Result<usize>
where
    S: TableStore,
    K: TableSink,
{
    let table = store
        .load_output(file_name)?
        .with_context(|| format!("{file_name} disappeared before upload"))?;
    sink.replace_table(table_name, &table)?;
    Ok(table.height())
}

// The pool is declared first so it is dropped while the runtime still exists.
pub struct PostgresSink {
    pool: PgPool,
    runtime: Runtime,
}

impl PostgresSink {
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Starting database runtime")?;
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);
        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(1).connect_with(options))
            .with_context(|| format!("Connecting to {config}"))?;
        info!("Connected to {config}");
        Ok(Self { pool, runtime })
    }

    async fn replace(pool: &PgPool, table_name: &str, table: &Table) -> Result<()> {
        let mut tx = pool.begin().await.context("Opening transaction")?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_name)))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Dropping {table_name}"))?;
        sqlx::query(&create_table_sql(table_name, table))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Creating {table_name}"))?;

        if table.width() > 0 && table.height() > 0 {
            let batch = (MAX_BIND_PARAMS / table.width()).max(1);
            let columns = &table.schema().columns;
            for (batch_idx, rows) in table.rows().chunks(batch).enumerate() {
                let mut builder: QueryBuilder<Postgres> =
                    QueryBuilder::new(insert_prefix(table_name, table));
                builder.push_values(rows, |mut tuple, row| {
                    for (cell, column) in row.iter().zip(columns) {
                        let cell = cell.as_ref();
                        match column.datatype {
                            ColumnType::Integer => {
                                tuple.push_bind(cell.and_then(Value::as_i64));
                            }
                            ColumnType::Float => {
                                tuple.push_bind(cell.and_then(Value::as_f64));
                            }
                            ColumnType::DateTime => {
                                tuple.push_bind(cell.and_then(Value::as_datetime));
                            }
                            ColumnType::String => {
                                tuple.push_bind(cell.map(Value::as_display));
                            }
                        }
                    }
                });
                builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Inserting batch {} into {table_name}", batch_idx + 1))?;
            }
        }
        tx.commit().await.context("Committing upload")?;
        Ok(())
    }
}

impl TableSink for PostgresSink {
    fn replace_table(&mut self, table_name: &str, table: &Table) -> Result<()> {
        self.runtime
            .block_on(Self::replace(&self.pool, table_name, table))
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(datatype: ColumnType) -> &'static str {
    match datatype {
        ColumnType::String => "TEXT",
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::DateTime => "TIMESTAMP",
    }
}

pub fn create_table_sql(table_name: &str, table: &Table) -> String {
    let columns = table
        .schema()
        .columns
        .iter()
        .map(|column| format!("{} {}", quote_ident(&column.name), sql_type(column.datatype)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns})", quote_ident(table_name))
}

fn insert_prefix(table_name: &str, table: &Table) -> String {
    let columns = table
        .schema()
        .columns
        .iter()
        .map(|column| quote_ident(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({columns}) ", quote_ident(table_name))
}
