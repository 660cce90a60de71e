//! CLI module
//!
//! Administrative command-line interface for virtual columns:
//! - schema add: define a virtual column
//! - schema drop: remove a virtual column and its values
//! - schema list: show a table's virtual columns

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, SchemaAction};
pub use commands::{run, run_command, schema_add, schema_drop, schema_list, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
