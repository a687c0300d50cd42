//! Compilers turning generated GLSL into the bytes stored per program.

mod source;
#[cfg(feature = "naga")]
mod spirv;

#[cfg(feature = "naga")]
pub use spirv::NagaDownstreamCompiler;
pub use source::SourceDownstreamCompiler;

use crate::ast::ShaderStage;
use crate::diagnostics::Diagnostics;

/// A preprocessor definition, `name` expands to `value`
pub type Macro = (String, String);

#[derive(Debug, Clone, Default)]
pub struct DownstreamOutput {
    /// `None` when compilation failed
    pub bytes: Option<Vec<u8>>,
    pub diagnostics: Diagnostics,
}

impl DownstreamOutput {
    pub fn success(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn failure(diagnostics: Diagnostics) -> Self {
        Self {
            bytes: None,
            diagnostics,
        }
    }

    pub fn has_error(&self) -> bool {
        self.bytes.is_none() || self.diagnostics.has_error()
    }
}

/// Compiles one stage of generated GLSL.
///
/// Instances are not shared between threads, every parallel task creates its
/// own through the factory given to the batch builder.
pub trait DownstreamCompiler: Send {
    fn compile(&mut self, source: &str, stage: ShaderStage, macros: &[Macro]) -> DownstreamOutput;
}

impl<T: DownstreamCompiler + ?Sized> DownstreamCompiler for Box<T> {
    fn compile(&mut self, source: &str, stage: ShaderStage, macros: &[Macro]) -> DownstreamOutput {
        (**self).compile(source, stage, macros)
    }
}
