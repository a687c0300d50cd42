//! Source command - print embedded shader source

use anyhow::{Context, Result};
use clap::Args;
use shaderset_shared::ShaderSet;
use std::path::PathBuf;

/// Arguments for the source command
#[derive(Args)]
pub struct SourceArgs {
    /// Shader set file (.shadercache)
    pub file: PathBuf,

    /// Shader name as given at build time
    pub shader: String,
}

pub fn execute(args: SourceArgs) -> Result<()> {
    let set = crate::open_set(&args.file)?;
    let info = set.get_shader_info(&args.shader)?;
    let source = set
        .get_source(info.source_hash)
        .with_context(|| format!("{} was built without embedded sources", args.file.display()))?;
    print!("{source}");
    if !source.ends_with('\n') {
        println!();
    }
    Ok(())
}
