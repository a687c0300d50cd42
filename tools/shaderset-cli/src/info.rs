//! Info command - list shaders and their options

use anyhow::Result;
use clap::Args;
use shaderset_shared::{FileShaderSet, ShaderSet};
use std::fmt::Write as FmtWrite;
use std::io::{Read, Seek};
use std::path::PathBuf;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Shader set file (.shadercache)
    pub file: PathBuf,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let set = crate::open_set(&args.file)?;
    print!("{}", describe(&set)?);
    Ok(())
}

pub(crate) fn describe<R: Read + Seek>(set: &FileShaderSet<R>) -> Result<String, std::fmt::Error> {
    let mut output = String::new();
    let names: Vec<&str> = set.shader_names().collect();
    writeln!(output, "{} shader(s), {} variant slot(s)", names.len(), set.total_variant_count())?;

    for name in names {
        let Some(info) = set.shader_info_by_name(name) else {
            continue;
        };
        let stored = set.variant_keys(info.source_hash).len();
        writeln!(output)?;
        writeln!(output, "{name}")?;
        writeln!(output, "  hash:       {:08X}", info.source_hash)?;
        writeln!(output, "  variants:   {stored}")?;
        writeln!(output, "  invariance: {:#06x}", info.program_invariance_mask)?;
        writeln!(output, "  source:     {}", if set.source(info.source_hash).is_some() { "embedded" } else { "none" })?;

        for (option, offset) in info.option_fields() {
            let invariant = option.bit_count() > 0
                && info.program_invariance_mask & (1 << offset) != 0;
            let marker = if invariant { " (pipeline only)" } else { "" };
            if option.is_boolean() {
                writeln!(output, "  option {} @ bit {offset}{marker}", option.name)?;
            } else {
                writeln!(
                    output,
                    "  option {} @ bit {offset} = {{ {} }}{marker}",
                    option.name,
                    option.named_values.join(", ")
                )?;
            }
        }
        if !info.vertex_attributes.is_empty() {
            writeln!(output, "  attributes: {}", info.vertex_attributes.join(", "))?;
        }
        if !info.instance_attributes.is_empty() {
            writeln!(output, "  instances:  {}", info.instance_attributes.join(", "))?;
        }
        if !info.bindings.is_empty() {
            writeln!(output, "  bindings:   {}", info.bindings.join(", "))?;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::tests::sample_set;

    #[test]
    fn test_describe_lists_options() {
        let set = sample_set();
        let text = describe(&set).unwrap();
        assert!(text.starts_with("1 shader(s), 4 variant slot(s)\n"));
        assert!(text.contains("lit.shader\n"));
        assert!(text.contains("  hash:       0000BEEF\n"));
        assert!(text.contains("  option Mode @ bit 0 = { Opaque, Cutout }\n"));
        assert!(text.contains("  option Blend @ bit 1 (pipeline only)\n"));
        assert!(text.contains("  source:     embedded\n"));
    }
}
