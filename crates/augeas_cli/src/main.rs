//! Augeas CLI
//!
//! Command-line access to an Augeas session over the system `libaugeas`.
//!
//! # Commands
//!
//! - `get`, `match`, `count` - Query the tree
//! - `set`, `setm`, `rm`, `mv`, `insert` - Edit the tree
//! - `srun` - Run a command script from a file or stdin
//! - `errors` - Show files that failed to load
//! - `version` - Show version and library information
//!
//! Edits only touch the in-memory tree unless `--save` is given.

mod commands;
mod error;
mod options;
mod output;

use clap::{Parser, Subcommand};
use commands::Operation;
use error::CliError;
use options::SessionArgs;
use output::Format;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Edit configuration files through Augeas.
#[derive(Parser)]
#[command(name = "augeas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Save changed files after the command
    #[arg(global = true, short, long)]
    save: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Operation(Operation),

    /// Show version information
    Version,
}

fn script_output(err: &CliError) -> Option<&str> {
    match err {
        CliError::Augeas(err) => err.script_output(),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let operation = match cli.command {
        Commands::Operation(operation) => operation,
        Commands::Version => {
            println!("Augeas CLI v{}", env!("CARGO_PKG_VERSION"));
            match augeas_native::NativeApi::shared() {
                Ok(api) => println!("libaugeas: {}", api.path().display()),
                Err(e) => println!("libaugeas: not available ({e})"),
            }
            return Ok(());
        }
    };

    let options = cli.session.init_options()?;
    let mut aug = augeas_native::create(&options)?;
    let outcome = match commands::execute(&mut aug, &operation) {
        Ok(outcome) => outcome,
        Err(e) => {
            // A failed script still shows what it printed.
            if let Some(output) = script_output(&e) {
                print!("{output}");
            }
            return Err(e.into());
        }
    };

    if cli.save {
        aug.save()?;
        info!("Saved changes");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::write(&mut out, cli.format, &outcome)?;
    out.flush()?;

    Ok(())
}
