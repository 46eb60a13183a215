use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scopewise_core::ast::json::{lower_body, raise, JsonNode};
use scopewise_core::ast::{NodeId, SyntaxTree};
use scopewise_core::pipeline::PassConfig;
use scopewise_core::transforms::{check_declarations, default_pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scopewise", about = "Place local variable declarations in decompiled method bodies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the declaration pass over a JSON method body and print the result.
    Declare {
        /// Path to a JSON method body.
        file: PathBuf,
        /// Behaviours to skip (e.g. "fold-initializers", "final-modifiers").
        #[arg(long = "skip-pass")]
        skip_passes: Vec<String>,
        /// Print JSON on a single line.
        #[arg(long)]
        compact: bool,
    },
    /// Check that a JSON method body is valid input for the declaration pass.
    Check {
        /// Path to a JSON method body.
        file: PathBuf,
    },
}

/// Install a stderr subscriber filtered by `SCOPEWISE_LOG`, falling back to
/// `RUST_LOG`. Nothing is installed when neither is set.
fn init_tracing() {
    let filter = match std::env::var("SCOPEWISE_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        Err(_) => return,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_body(file: &Path) -> Result<(SyntaxTree, NodeId)> {
    let f = File::open(file).with_context(|| format!("failed to open method body: {}", file.display()))?;
    let reader = BufReader::new(f);
    let body: JsonNode = serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse method body: {}", file.display()))?;
    Ok(lower_body(&body))
}

fn cmd_declare(file: &Path, skip_passes: &[String], compact: bool) -> Result<()> {
    let (mut tree, root) = load_body(file)?;
    let skip_refs: Vec<&str> = skip_passes.iter().map(|s| s.as_str()).collect();
    let config = PassConfig::from_skip_list(&skip_refs);
    let mut pipeline = default_pipeline(&config);
    info!(passes = ?pipeline.names(), file = %file.display(), "running pipeline");
    pipeline
        .run(&mut tree, root)
        .with_context(|| format!("declaration pass failed on {}", file.display()))?;

    let out = raise(&tree, root);
    let text = if compact {
        serde_json::to_string(&out)?
    } else {
        serde_json::to_string_pretty(&out)?
    };
    println!("{text}");
    Ok(())
}

fn cmd_check(file: &Path) -> Result<()> {
    let (tree, root) = load_body(file)?;
    let count = check_declarations(&tree, root).with_context(|| format!("invalid method body: {}", file.display()))?;
    println!("{}: {count} declaration(s) ready to place", file.display());
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match &cli.command {
        Command::Declare {
            file,
            skip_passes,
            compact,
        } => cmd_declare(file, skip_passes, *compact),
        Command::Check { file } => cmd_check(file),
    }
}
