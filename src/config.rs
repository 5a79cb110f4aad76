//! Run configuration.
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags (or their environment variables, including those loaded from a
//! `.env` file), an optional YAML file passed with `--config`, and built-in
//! defaults. The result is an immutable [`PipelineConfig`] and, when a run
//! uploads, a [`DatabaseConfig`].

use std::{fmt, fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::Deserialize;

use crate::{
    cli::{DatabaseArgs, LocationArgs, parse_delimiter},
    error::EtlError,
    io_utils,
    pipeline::ReconcileMode,
    store::CsvStore,
};

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub reconcile_mode: Option<ReconcileMode>,
    pub database: FileDatabaseConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDatabaseConfig {
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))
    }

    /// Loads the file named by `--config`, or an empty layer when none was given.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub reconcile: bool,
    pub reconcile_mode: ReconcileMode,
}

impl PipelineConfig {
    pub fn resolve(
        args: &LocationArgs,
        reconcile_mode: Option<ReconcileMode>,
        file: &FileConfig,
    ) -> Result<Self> {
        Ok(Self {
            input_dir: resolve_input_dir(args, file)?,
            output_dir: resolve_output_dir(args, file)?,
            delimiter: resolve_delimiter(args, file)?,
            encoding: resolve_input_encoding(args, file)?,
            reconcile: true,
            reconcile_mode: reconcile_mode
                .or(file.reconcile_mode)
                .unwrap_or_default(),
        })
    }
}

pub fn resolve_input_dir(args: &LocationArgs, file: &FileConfig) -> Result<PathBuf> {
    args.input
        .clone()
        .or_else(|| file.input_folder.clone())
        .ok_or_else(|| missing("input folder", "--input", "INPUT_FOLDER", "input_folder").into())
}

pub fn resolve_output_dir(args: &LocationArgs, file: &FileConfig) -> Result<PathBuf> {
    args.output
        .clone()
        .or_else(|| file.output_folder.clone())
        .ok_or_else(|| missing("output folder", "--output", "OUTPUT_FOLDER", "output_folder").into())
}

/// `None` leaves the delimiter to the file extension.
pub fn resolve_delimiter(args: &LocationArgs, file: &FileConfig) -> Result<Option<u8>> {
    match (args.delimiter, file.delimiter.as_deref()) {
        (Some(delimiter), _) => Ok(Some(delimiter)),
        (None, Some(raw)) => parse_delimiter(raw)
            .map(Some)
            .map_err(|err| EtlError::Config(format!("delimiter '{raw}': {err}")).into()),
        (None, None) => Ok(None),
    }
}

pub fn resolve_input_encoding(args: &LocationArgs, file: &FileConfig) -> Result<&'static Encoding> {
    io_utils::resolve_encoding(
        args.input_encoding
            .as_deref()
            .or(file.input_encoding.as_deref()),
    )
}

/// Store over the output folder alone, for commands that read cleaned files
/// back. Cleaned files are always UTF-8.
pub fn output_store(args: &LocationArgs, file: &FileConfig) -> Result<CsvStore> {
    let output_dir = resolve_output_dir(args, file)?;
    Ok(CsvStore::new(
        &output_dir,
        &output_dir,
        resolve_delimiter(args, file)?,
        encoding_rs::UTF_8,
    ))
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl DatabaseConfig {
    pub fn resolve(args: &DatabaseArgs, file: &FileConfig) -> Result<Self, EtlError> {
        let db = &file.database;
        let name = args
            .db_name
            .clone()
            .or_else(|| db.name.clone())
            .ok_or_else(|| missing("database name", "--db-name", "DB_NAME", "database.name"))?;
        let user = args
            .db_user
            .clone()
            .or_else(|| db.user.clone())
            .ok_or_else(|| missing("database user", "--db-user", "DB_USER", "database.user"))?;
        Ok(Self {
            name,
            user,
            password: args
                .db_password
                .clone()
                .or_else(|| db.password.clone())
                .unwrap_or_default(),
            host: args
                .db_host
                .clone()
                .or_else(|| db.host.clone())
                .unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: args.db_port.or(db.port).unwrap_or(DEFAULT_DB_PORT),
        })
    }
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.name
        )
    }
}

fn missing(what: &str, flag: &str, env: &str, key: &str) -> EtlError {
    EtlError::Config(format!(
        "{what} not set (use {flag}, the {env} environment variable, or '{key}' in the config file)"
    ))
}
