//! # modelquery CLI Module
//!
//! ## Available Commands
//!
//! - `shape` - Shape JSON records against a model registry
//! - `criteria` - Preview the standard criteria of a model
//! - `run` - Resolve, query and shape through the controller
//! - `registry` - Manage the persistent registry store

mod commands;

use clap::{Parser, Subcommand};
use modelquery_core::QueryError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// modelquery - registry-driven query shaping
///
/// Shapes data rows against a model registry and assembles the model's
/// standard filter criteria.
#[derive(Parser, Debug)]
#[command(name = "modelquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the registry database
    #[arg(short = 'D', long, global = true, default_value = "modelquery.redb")]
    pub database: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shape records against a model registry
    Shape {
        /// Model registry (TOML)
        #[arg(short, long)]
        registry: PathBuf,

        /// Records (JSON object or array of objects)
        #[arg(short = 'R', long)]
        records: PathBuf,

        /// Skip custom field groups
        #[arg(long)]
        no_custom: bool,

        /// Coerce values by declared field type
        #[arg(long)]
        typed: bool,
    },

    /// Preview the standard criteria of a model
    Criteria {
        /// Model registry (TOML)
        #[arg(short, long)]
        registry: PathBuf,
    },

    /// Resolve a model, run one operation and shape the rows
    Run {
        /// Model registry (TOML)
        #[arg(short, long)]
        registry: PathBuf,

        /// Rows served by the in-memory database
        #[arg(short = 'R', long)]
        records: Option<PathBuf>,

        /// CRUD type (create, read, update, delete)
        #[arg(short, long, default_value = "read")]
        crud: String,

        /// Explicit SQL; skips the standard criteria
        #[arg(long)]
        sql: Option<String>,

        /// Do not append the standard criteria
        #[arg(long)]
        no_criteria: bool,

        /// Read shape (result, item, list, distinct)
        #[arg(long, default_value = "list")]
        query_object: String,
    },

    /// Manage the persistent registry store
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

/// Registry store actions.
#[derive(Subcommand, Debug)]
pub enum RegistryAction {
    /// Store one entry
    Set {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        key: String,
        /// JSON value; anything that is not JSON is stored as text
        #[arg(short = 'V', long)]
        value: String,
    },

    /// Read one entry
    Get {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        key: String,
    },

    /// List registry names
    List,

    /// Check whether a registry (or one of its keys) exists
    Exists {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Print a registry's entries in key order
    Sort {
        #[arg(short, long)]
        name: String,
    },

    /// Store a model registry document under a name
    Import {
        #[arg(short, long)]
        name: String,
        /// Model registry (TOML)
        #[arg(short, long)]
        registry: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), QueryError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Shape {
            registry,
            records,
            no_custom,
            typed,
        } => cmd_shape(&registry, &records, !no_custom, typed),
        Commands::Criteria { registry } => cmd_criteria(&registry, json_mode),
        Commands::Run {
            registry,
            records,
            crud,
            sql,
            no_criteria,
            query_object,
        } => cmd_run(
            &registry,
            records.as_deref(),
            &RunOptions {
                crud_type: crud,
                sql,
                standard_criteria: !no_criteria,
                query_object,
            },
        ),
        Commands::Registry { action } => cmd_registry(&cli.database, json_mode, action),
    }
}
