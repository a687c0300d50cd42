//! GLSL to SPIR-V through naga.

use naga::back::spv;
use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::{DownstreamCompiler, DownstreamOutput, Macro};
use crate::ast::{ShaderStage, Span};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};

/// File name used for diagnostics in generated code
const GENERATED_FILE: &str = "glsl";

#[derive(Default)]
pub struct NagaDownstreamCompiler {
    frontend: glsl::Frontend,
}

impl NagaDownstreamCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn error(message: String, span: Option<Span>) -> Diagnostic {
    let diagnostic = Diagnostic::error(DiagnosticCode::Downstream, message).in_file(GENERATED_FILE);
    match span {
        Some(span) => diagnostic.at(span),
        None => diagnostic,
    }
}

fn span_of(source: &str, span: naga::Span) -> Option<Span> {
    if span == naga::Span::default() {
        return None;
    }
    let location = span.location(source);
    Some(Span::new(location.line_number.saturating_sub(1), location.line_position.saturating_sub(1)))
}

impl DownstreamCompiler for NagaDownstreamCompiler {
    fn compile(&mut self, source: &str, stage: ShaderStage, macros: &[Macro]) -> DownstreamOutput {
        let mut options = glsl::Options::from(naga_stage(stage));
        options.defines.extend(macros.iter().cloned());

        let module = match self.frontend.parse(&options, source) {
            Ok(module) => module,
            Err(errors) => {
                return DownstreamOutput::failure(
                    errors
                        .errors
                        .iter()
                        .map(|e| error(e.kind.to_string(), span_of(source, e.meta)))
                        .collect(),
                );
            }
        };

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        let info = match validator.validate(&module) {
            Ok(info) => info,
            Err(e) => {
                let span = e.spans().next().and_then(|(span, _)| span_of(source, *span));
                return DownstreamOutput::failure(Diagnostics::from_iter([error(
                    format!("validation failed: {}", e.as_inner()),
                    span,
                )]));
            }
        };

        let pipeline_options = spv::PipelineOptions {
            shader_stage: naga_stage(stage),
            entry_point: "main".into(),
        };
        match spv::write_vec(&module, &info, &spv::Options::default(), Some(&pipeline_options)) {
            Ok(words) => DownstreamOutput::success(bytemuck::cast_slice(&words).to_vec()),
            Err(e) => DownstreamOutput::failure(Diagnostics::from_iter([error(
                format!("SPIR-V generation failed: {e}"),
                None,
            )])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_vertex_stage() {
        let source = "#version 450\nlayout(location = 0) in vec3 position;\nvoid main() {\n    gl_Position = vec4(position, Scale);\n}\n";
        let macros = vec![("Scale".to_string(), "1.0".to_string())];
        let output = NagaDownstreamCompiler::new().compile(source, ShaderStage::Vertex, &macros);
        assert!(!output.has_error(), "{:?}", output.diagnostics);
        let bytes = output.bytes.unwrap();
        // SPIR-V magic number, little endian
        assert_eq!(&bytes[..4], &[0x03, 0x02, 0x23, 0x07]);
    }

    #[test]
    fn test_reports_parse_errors() {
        let output = NagaDownstreamCompiler::new().compile(
            "#version 450\nvoid main() { undefined_call(); }\n",
            ShaderStage::Fragment,
            &[],
        );
        assert!(output.has_error());
        assert!(output.diagnostics.contains_code(DiagnosticCode::Downstream));
    }
}
