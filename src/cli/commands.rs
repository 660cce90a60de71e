//! CLI command implementations
//!
//! The CLI is a thin administrative front-end: it opens the snapshot
//! named by the config file, runs one metadata mutation (or listing)
//! through the layer, and writes the snapshot back. All validation and
//! safety lives in the engine; the CLI only adds the config-level
//! checks (table under management, column-name syntax) that belong to
//! its surface.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::backend::MemoryBackend;
use crate::layer::{EavConfig, EavLayer};
use crate::registry::{valid_column_name, ColumnSpec};

use super::args::{Cli, Command, SchemaAction};
use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database snapshot file
    pub data_file: String,

    /// Tables managed by the EAV engine
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Parses arguments and runs the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    run_command(cli.command)
}

/// Runs one parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Schema { action } => match action {
            SchemaAction::Add {
                config,
                table,
                column,
                column_type,
                bundle,
                searchable,
                overwrite,
            } => schema_add(
                &config,
                &table,
                &column,
                &column_type,
                bundle.as_deref(),
                searchable,
                overwrite,
            ),
            SchemaAction::Drop {
                config,
                table,
                column,
                bundle,
            } => schema_drop(&config, &table, &column, bundle.as_deref()),
            SchemaAction::List {
                config,
                table,
                bundle,
            } => schema_list(&config, &table, bundle.as_deref()),
        },
    }
}

/// Adds a virtual column
pub fn schema_add(
    config_path: &Path,
    table: &str,
    column: &str,
    column_type: &str,
    bundle: Option<&str>,
    searchable: bool,
    overwrite: bool,
) -> CliResult<()> {
    if !valid_column_name(column) {
        return Err(CliError::invalid_column_name(column));
    }

    let config = load_config(config_path)?;
    let (backend, layer) = open_layer(&config, table)?;

    let mut spec = ColumnSpec::new(column, column_type)
        .with_searchable(searchable)
        .with_overwrite(overwrite);
    if let Some(bundle) = bundle {
        spec = spec.with_bundle(bundle);
    }

    let definition = layer.add_column(&spec).map_err(CliError::engine)?;
    save_snapshot(&backend, &config)?;

    println!(
        "Added column '{}' ({}) to table '{}'",
        definition.name,
        definition.attr_type.type_name(),
        table
    );
    Ok(())
}

/// Drops a virtual column
pub fn schema_drop(
    config_path: &Path,
    table: &str,
    column: &str,
    bundle: Option<&str>,
) -> CliResult<()> {
    if !valid_column_name(column) {
        return Err(CliError::invalid_column_name(column));
    }

    let config = load_config(config_path)?;
    let (backend, layer) = open_layer(&config, table)?;

    let dropped = layer.drop_column(column, bundle).map_err(CliError::engine)?;
    if !dropped {
        return Err(CliError::engine(format!(
            "Column '{}' is not defined on table '{}'",
            column, table
        )));
    }
    save_snapshot(&backend, &config)?;

    println!("Dropped column '{}' from table '{}'", column, table);
    Ok(())
}

/// Lists virtual columns
pub fn schema_list(config_path: &Path, table: &str, bundle: Option<&str>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let (_backend, layer) = open_layer(&config, table)?;

    let columns = layer.list_columns(bundle).map_err(CliError::engine)?;
    for definition in columns.values() {
        let scope = definition.bundle.as_deref().unwrap_or("*");
        println!(
            "{}\t{}\tbundle={}\tsearchable={}",
            definition.name,
            definition.attr_type.type_name(),
            scope,
            definition.searchable
        );
    }
    Ok(())
}

/// Loads and parses the configuration file
fn load_config(path: &Path) -> CliResult<Config> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CliError::config_error(format!("Cannot read config '{}': {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        CliError::config_error(format!("Malformed config '{}': {}", path.display(), e))
    })
}

/// Opens the snapshot and attaches the layer to `table`
fn open_layer(config: &Config, table: &str) -> CliResult<(Arc<MemoryBackend>, EavLayer)> {
    if !config.tables.iter().any(|t| t == table) {
        return Err(CliError::table_not_managed(table));
    }

    let backend = Arc::new(
        MemoryBackend::open(Path::new(&config.data_file)).map_err(CliError::engine)?,
    );
    if !backend.has_table(table) {
        return Err(CliError::engine(format!(
            "Table '{}' does not exist in '{}'",
            table, config.data_file
        )));
    }

    let layer = EavLayer::attach(backend.clone(), table, EavConfig::new());
    Ok((backend, layer))
}

/// Writes the snapshot back to disk
fn save_snapshot(backend: &MemoryBackend, config: &Config) -> CliResult<()> {
    backend
        .save_to(Path::new(&config.data_file))
        .map_err(|e| CliError::io_error(format!("Cannot write '{}': {}", config.data_file, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TableSchema;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
        let data_file = dir.path().join("data.json");
        let backend = MemoryBackend::new();
        backend.create_table(TableSchema::new(
            "users",
            vec!["id".into(), "name".into()],
            vec!["id".into()],
        ));
        backend.save_to(&data_file).unwrap();

        let config_path = dir.path().join("sidecol.json");
        let config = Config {
            data_file: data_file.to_string_lossy().into_owned(),
            tables: vec!["users".into()],
        };
        std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        config_path
    }

    #[test]
    fn test_add_then_list_then_drop() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);

        schema_add(&config, "users", "user-age", "integer", None, true, false).unwrap();
        schema_list(&config, "users", None).unwrap();
        schema_drop(&config, "users", "user-age", None).unwrap();

        // Dropping again fails: the column is gone
        assert!(schema_drop(&config, "users", "user-age", None).is_err());
    }

    #[test]
    fn test_add_persists_across_invocations() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);

        schema_add(&config, "users", "user-age", "int", None, true, false).unwrap();

        // A second invocation sees the column and rejects the duplicate
        let err = schema_add(&config, "users", "user-age", "int", None, true, false).unwrap_err();
        assert!(err.message().contains("already defined"));
    }

    #[test]
    fn test_unmanaged_table_rejected() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);

        let err =
            schema_add(&config, "orders", "note", "string", None, true, false).unwrap_err();
        assert_eq!(err.code(), &super::super::errors::CliErrorCode::TableNotManaged);
    }

    #[test]
    fn test_bad_column_syntax_rejected_before_config_load() {
        let err = schema_add(
            Path::new("/nonexistent/config.json"),
            "users",
            "Bad Name",
            "string",
            None,
            true,
            false,
        )
        .unwrap_err();
        assert_eq!(err.code(), &super::super::errors::CliErrorCode::InvalidColumnName);
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let err = schema_list(Path::new("/nonexistent/config.json"), "users", None).unwrap_err();
        assert_eq!(err.code(), &super::super::errors::CliErrorCode::ConfigError);
    }

    #[test]
    fn test_unknown_type_is_an_engine_error() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);

        let err = schema_add(&config, "users", "payload", "json", None, true, false).unwrap_err();
        assert_eq!(err.code(), &super::super::errors::CliErrorCode::EngineError);
        assert!(err.message().contains("EAV_UNKNOWN_TYPE"));
    }
}
