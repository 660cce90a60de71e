//! CLI argument definitions using clap
//!
//! Commands:
//! - sidecol schema add --config <path> --table <t> <column> --type <ty>
//! - sidecol schema drop --config <path> --table <t> <column>
//! - sidecol schema list --config <path> --table <t>

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// sidecol - a virtual-column (EAV) extension layer for relational tables
#[derive(Parser, Debug)]
#[command(name = "sidecol")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage virtual columns
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaAction {
    /// Add a virtual column to a table
    Add {
        /// Path to configuration file
        #[arg(long, default_value = "./sidecol.json")]
        config: PathBuf,

        /// Target table
        #[arg(long)]
        table: String,

        /// Column name
        column: String,

        /// Column type (string, integer, decimal, boolean, date,
        /// datetime, text, uuid, or a known alias)
        #[arg(long = "type", default_value = "string")]
        column_type: String,

        /// Bundle to scope the column to
        #[arg(long)]
        bundle: Option<String>,

        /// Whether the column may be used in filter and order clauses
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        searchable: bool,

        /// Replace an existing definition
        #[arg(long)]
        overwrite: bool,
    },

    /// Drop a virtual column and its stored values
    Drop {
        /// Path to configuration file
        #[arg(long, default_value = "./sidecol.json")]
        config: PathBuf,

        /// Target table
        #[arg(long)]
        table: String,

        /// Column name
        column: String,

        /// Bundle the column is scoped to
        #[arg(long)]
        bundle: Option<String>,
    },

    /// List the virtual columns of a table
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./sidecol.json")]
        config: PathBuf,

        /// Target table
        #[arg(long)]
        table: String,

        /// Bundle to scope the listing to
        #[arg(long)]
        bundle: Option<String>,
    },
}
