//! # modelquery
//!
//! Command-line front end for the modelquery core.
//!
//! ## Usage
//!
//! ```bash
//! # Shape records against a model registry
//! modelquery shape --registry articles.toml --records rows.json
//!
//! # Preview the standard criteria of a model
//! modelquery criteria --registry articles.toml
//!
//! # Resolve, query and shape in one go
//! modelquery run --registry articles.toml --records rows.json --crud read
//!
//! # Persistent named registries
//! modelquery registry set --name articles --key criteria_status --value '"1,2"'
//! modelquery registry sort --name articles
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = modelquery::cli::Cli::parse();

    // MODELQUERY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MODELQUERY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "modelquery=debug,modelquery_core=debug"
    } else {
        "modelquery=info,modelquery_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = modelquery::cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!("modelquery v{} - registry-driven query shaping", env!("CARGO_PKG_VERSION"));
}
