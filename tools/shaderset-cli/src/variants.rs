//! Variants command - list stored variants and program sharing

use anyhow::{Context, Result};
use clap::Args;
use shaderset_shared::{FileShaderSet, ShaderSet, ShaderVariant, ShaderVariantKey};
use std::fmt::Write as FmtWrite;
use std::io::{Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the variants command
#[derive(Args)]
pub struct VariantsArgs {
    /// Shader set file (.shadercache)
    pub file: PathBuf,

    /// Only list variants of this shader
    #[arg(long)]
    pub shader: Option<String>,
}

pub fn execute(args: VariantsArgs) -> Result<()> {
    let mut set = crate::open_set(&args.file)?;
    let text = list_variants(&mut set, args.shader.as_deref())
        .with_context(|| format!("Failed to read variants from {}", args.file.display()))?;
    print!("{text}");
    Ok(())
}

pub(crate) fn list_variants<R: Read + Seek>(set: &mut FileShaderSet<R>, only: Option<&str>) -> Result<String> {
    let names: Vec<String> = match only {
        Some(name) => {
            set.get_shader_info(name)?;
            vec![name.to_string()]
        }
        None => set.shader_names().map(str::to_string).collect(),
    };

    let mut output = String::new();
    for name in names {
        let Some(info) = set.shader_info_by_name(&name).cloned() else {
            continue;
        };
        let keys = set.variant_keys(info.source_hash);
        writeln!(output, "{name} ({} variants)", keys.len())?;

        // Programs already listed, with the first variant using them
        let mut programs: Vec<(Arc<ShaderVariant>, ShaderVariantKey)> = Vec::new();
        for key in keys {
            let variant = set.get_variant(key)?;
            let variant_name = info.format_variant_name(key.option_bits);
            let variant_name = if variant_name.is_empty() { "<default>" } else { variant_name.as_str() };
            match programs.iter().find(|(other, _)| other.shares_programs_with(&variant)) {
                Some((_, first)) => writeln!(output, "  {key}  {variant_name}  (programs of {first})")?,
                None => {
                    writeln!(
                        output,
                        "  {key}  {variant_name}  [vertex {} B, fragment {} B]",
                        variant.vertex_program.len(),
                        variant.fragment_program.len()
                    )?;
                    programs.push((variant, key));
                }
            }
        }
        writeln!(output, "  {} distinct program pair(s)", programs.len())?;
    }
    Ok(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shaderset_shared::{OptionInfo, PipelineState, ShaderInfo, ShaderSetWriter};
    use std::io::Cursor;

    pub(crate) fn sample_set() -> FileShaderSet<Cursor<Vec<u8>>> {
        let info = ShaderInfo {
            source_hash: 0xBEEF,
            program_invariance_mask: 0b10,
            options: vec![
                OptionInfo::enumerated("Mode", ["Opaque", "Cutout"]),
                OptionInfo::boolean("Blend"),
            ],
            vertex_attributes: vec!["position".into()],
            instance_attributes: Vec::new(),
            bindings: Vec::new(),
        };
        let mut writer = ShaderSetWriter::new(Cursor::new(Vec::new()));
        writer
            .add_shader(info, "lit.shader", Some("lit".to_string()), 4)
            .unwrap();
        for option_bits in 0..4 {
            let program = format!("mode{}", option_bits & 1);
            writer
                .write_variant(&ShaderVariant {
                    key: ShaderVariantKey::new(0xBEEF, option_bits),
                    pipeline_state: PipelineState::default(),
                    vertex_attributes: Vec::new(),
                    binding_set_sizes: Vec::new(),
                    bindings: Vec::new(),
                    vertex_program: Arc::from(program.clone().into_bytes()),
                    fragment_program: Arc::from(program.into_bytes()),
                })
                .unwrap();
        }
        let mut bytes = writer.finish().unwrap();
        bytes.set_position(0);
        FileShaderSet::from_reader(bytes).unwrap()
    }

    #[test]
    fn test_list_variants_groups_programs() {
        let mut set = sample_set();
        let text = list_variants(&mut set, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "lit.shader (4 variants)",
                "  0000BEEF_00000000  <default>  [vertex 5 B, fragment 5 B]",
                "  0000BEEF_00000001  Mode=Cutout  [vertex 5 B, fragment 5 B]",
                "  0000BEEF_00000002  Blend  (programs of 0000BEEF_00000000)",
                "  0000BEEF_00000003  Mode=Cutout, Blend  (programs of 0000BEEF_00000001)",
                "  2 distinct program pair(s)",
            ]
        );
    }

    #[test]
    fn test_unknown_shader_is_an_error() {
        let mut set = sample_set();
        assert!(list_variants(&mut set, Some("missing.shader")).is_err());
        assert!(list_variants(&mut set, Some("lit.shader")).is_ok());
    }
}
