use super::{DownstreamCompiler, DownstreamOutput, Macro};
use crate::ast::ShaderStage;

/// Stores the GLSL text itself, with the option macros defined after `#version`.
///
/// Useful to ship GLSL to a driver directly and to inspect generated code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceDownstreamCompiler;

impl SourceDownstreamCompiler {
    pub fn new() -> Self {
        Self
    }

    /// The source as a driver would see it
    pub fn preprocessed(source: &str, macros: &[Macro]) -> String {
        let (version, body) = match source.split_once('\n') {
            Some((first, rest)) if first.starts_with("#version") => (Some(first), rest),
            _ => (None, source),
        };

        let mut out = String::with_capacity(source.len() + macros.len() * 24);
        if let Some(version) = version {
            out.push_str(version);
            out.push('\n');
        }
        for (name, value) in macros {
            out.push_str("#define ");
            out.push_str(name);
            out.push(' ');
            out.push_str(value);
            out.push('\n');
        }
        out.push_str(body);
        out
    }
}

impl DownstreamCompiler for SourceDownstreamCompiler {
    fn compile(&mut self, source: &str, _stage: ShaderStage, macros: &[Macro]) -> DownstreamOutput {
        DownstreamOutput::success(Self::preprocessed(source, macros).into_bytes())
    }
}
