use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::ReconcileMode;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean, reconcile, and load the Olist e-commerce CSV datasets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean every dataset, reconcile related tables, and optionally upload the results
    Clean(CleanArgs),
    /// Upload previously cleaned files from the output folder to PostgreSQL
    Upload(UploadArgs),
    /// Report null counts, duplicate rows, and unwanted characters in raw CSV files
    Profile(ProfileArgs),
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// YAML configuration file (values here are overridden by flags and environment)
    #[arg(short = 'c', long = "config", env = "ETL_CONFIG")]
    pub config: Option<PathBuf>,
    /// Folder holding the raw dataset CSV files
    #[arg(short = 'i', long = "input", env = "INPUT_FOLDER")]
    pub input: Option<PathBuf>,
    /// Folder receiving the cleaned_*.csv files
    #[arg(short = 'o', long = "output", env = "OUTPUT_FOLDER")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Default, Args)]
pub struct DatabaseArgs {
    /// PostgreSQL database name
    #[arg(long = "db-name", env = "DB_NAME")]
    pub db_name: Option<String>,
    /// PostgreSQL user
    #[arg(long = "db-user", env = "DB_USER")]
    pub db_user: Option<String>,
    /// PostgreSQL password
    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
    /// PostgreSQL host (defaults to localhost)
    #[arg(long = "db-host", env = "DB_HOST")]
    pub db_host: Option<String>,
    /// PostgreSQL port (defaults to 5432)
    #[arg(long = "db-port", env = "DB_PORT")]
    pub db_port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub locations: LocationArgs,
    /// How successive reconciliations of the same dataset combine
    #[arg(long = "reconcile-mode", value_enum)]
    pub reconcile_mode: Option<ReconcileMode>,
    /// Write the single-table cleaned outputs without reconciling related tables
    #[arg(long = "skip-reconcile")]
    pub skip_reconcile: bool,
    /// Upload the cleaned files to PostgreSQL after writing them
    #[arg(long)]
    pub upload: bool,
    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub locations: LocationArgs,
    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub locations: LocationArgs,
    /// Emit the report as JSON instead of text tables
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_delimiter_accepts_named_and_literal_values() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("::").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn clean_accepts_reconcile_mode() {
        let cli = Cli::try_parse_from([
            "olist-etl",
            "clean",
            "-i",
            "raw",
            "-o",
            "out",
            "--reconcile-mode",
            "independent",
        ])
        .expect("valid arguments");
        match cli.command {
            Commands::Clean(args) => {
                assert_eq!(args.reconcile_mode, Some(ReconcileMode::Independent));
                assert!(!args.upload);
            }
            other => panic!("expected clean command, got {other:?}"),
        }
    }
}
