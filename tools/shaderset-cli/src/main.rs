//! Shader set inspection tool
//!
//! # Commands
//!
//! - `shaderset info <file>` - List shaders, their options and invariance masks
//! - `shaderset variants <file> [--shader NAME]` - List stored variants and program sharing
//! - `shaderset source <file> <shader>` - Print the embedded source of a shader

mod info;
mod source;
mod variants;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shaderset_shared::FileShaderSet;
use std::path::Path;

/// Shader set inspection tool
#[derive(Parser)]
#[command(name = "shaderset")]
#[command(about = "Inspect compiled shader set files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List shaders, options and invariance masks
    Info(info::InfoArgs),

    /// List stored variants with their keys and shared programs
    Variants(variants::VariantsArgs),

    /// Print the embedded source text of a shader
    Source(source::SourceArgs),
}

/// Opens a shader set file with a readable error
fn open_set(path: &Path) -> Result<FileShaderSet> {
    let set = FileShaderSet::open(path)
        .with_context(|| format!("Failed to open shader set: {}", path.display()))?;
    tracing::debug!("Opened {} with {} variant slots", path.display(), set.total_variant_count());
    Ok(set)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info(args) => info::execute(args),
        Commands::Variants(args) => variants::execute(args),
        Commands::Source(args) => source::execute(args),
    }
}
