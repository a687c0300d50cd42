//! Compilation of single variants.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use shaderset_shared::{PipelineState, ShaderInfo, ShaderVariant, ShaderVariantKey};
use smallvec::SmallVec;

use crate::ast::{Expr, ShaderStage, StageBlock, TranslationUnit, evaluate_condition};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::downstream::{DownstreamCompiler, Macro};
use crate::glsl::{GlslRenderer, GlslWriter, StageInput};
use crate::layout::LayoutAssignor;
use crate::options::{
    BitsOptionValueSet, FilteredOptionValueSet, OptionValueSet, RawOptionValueSet,
    collect_option_bits,
};

/// Compiles variants of one analyzed shader.
///
/// Diagnostics accumulate across calls until [`clear_diagnostics`](Self::clear_diagnostics).
/// Every variant that reports anything is preceded by a `VariantStart` info
/// naming it.
pub struct VariantCompiler<'s> {
    unit: &'s TranslationUnit,
    info: &'s ShaderInfo,
    file: &'s str,
    downstream: Box<dyn DownstreamCompiler + 's>,
    renderer: Box<dyn GlslRenderer + 's>,
    output_generated_source_on_error: bool,
    diagnostics: Diagnostics,
}

impl<'s> VariantCompiler<'s> {
    pub fn new(
        unit: &'s TranslationUnit,
        info: &'s ShaderInfo,
        file: &'s str,
        downstream: Box<dyn DownstreamCompiler + 's>,
    ) -> Self {
        Self {
            unit,
            info,
            file,
            downstream,
            renderer: Box::new(GlslWriter),
            output_generated_source_on_error: false,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn GlslRenderer + 's>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Attach the generated GLSL as an info diagnostic when a stage fails downstream
    pub fn with_output_generated_source_on_error(mut self, enabled: bool) -> Self {
        self.output_generated_source_on_error = enabled;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// Compiles the variant selected by option values given by name.
    /// Missing options default to 0, unknown names are ignored.
    pub fn compile_variant(&mut self, values: &RawOptionValueSet) -> Option<ShaderVariant> {
        self.compile(values, None)
    }

    /// Compiles one variant. With a `base` that only differs in program-invariant
    /// options, the base's programs and layout are reused and only the pipeline
    /// state is recomputed.
    pub fn compile(
        &mut self,
        values: &dyn OptionValueSet,
        base: Option<&ShaderVariant>,
    ) -> Option<ShaderVariant> {
        let options = self.unit.options();
        let option_bits = collect_option_bits(&FilteredOptionValueSet::new(options, Some(values)), options);

        let mut diagnostics = Diagnostics::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.compile_bits(option_bits, base, &mut diagnostics)
        }));
        let variant = match result {
            Ok(variant) => variant,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                diagnostics.push(
                    Diagnostic::internal(format!("variant compilation panicked: {message}"))
                        .in_file(self.file),
                );
                None
            }
        };

        if !diagnostics.is_empty() {
            let name = self.info.format_variant_name(option_bits);
            let name = if name.is_empty() { "<default>" } else { name.as_str() };
            self.diagnostics.push(
                Diagnostic::info(DiagnosticCode::VariantStart, format!("start of variant {name}"))
                    .in_file(self.file),
            );
            if diagnostics.has_error() {
                tracing::debug!(file = self.file, variant = name, errors = diagnostics.error_count(), "variant failed");
            }
        }
        let failed = diagnostics.has_error();
        self.diagnostics.append(&mut diagnostics);
        variant.filter(|_| !failed)
    }

    fn compile_bits(
        &mut self,
        option_bits: u32,
        base: Option<&ShaderVariant>,
        diagnostics: &mut Diagnostics,
    ) -> Option<ShaderVariant> {
        let unit = self.unit;
        let options = unit.options();
        // Decoded bits keep every later decision consistent with the key
        let bits = BitsOptionValueSet::new(options, option_bits);
        let values = FilteredOptionValueSet::new(options, Some(&bits));
        let key = ShaderVariantKey::new(self.info.source_hash, option_bits);
        let pipeline_state = self.compose_pipeline_state(&values, diagnostics);

        if let Some(base) = base {
            if self.info.program_invariant_key(base.key.option_bits) != self.info.program_invariant_key(option_bits) {
                diagnostics.push(
                    Diagnostic::internal(format!(
                        "variant {key} cannot reuse the programs of variant {}",
                        base.key
                    ))
                    .in_file(self.file),
                );
                return None;
            }
            return Some(base.as_program_invariant(key, pipeline_state));
        }

        let vertex = self.find_stage_block(ShaderStage::Vertex, &values, diagnostics);
        let fragment = self.find_stage_block(ShaderStage::Fragment, &values, diagnostics);
        let (vertex, fragment) = (vertex?, fragment?);

        let layout = LayoutAssignor::new(unit, &values, diagnostics)
            .in_file(self.file)
            .assign(fragment);
        let render = |stage: &StageBlock, diagnostics: &mut Diagnostics| {
            let input = StageInput {
                unit,
                stage,
                layout: &layout,
                pipeline: &pipeline_state,
                values: &values,
            };
            self.renderer.render(&input, diagnostics)
        };
        let vertex_source = render(vertex, diagnostics);
        let fragment_source = render(fragment, diagnostics);
        if diagnostics.has_error() {
            return None;
        }
        let (vertex_source, fragment_source) = (vertex_source?, fragment_source?);

        let macros = collect_macros(unit, &values);
        let vertex_program = self.compile_stage(&vertex_source, ShaderStage::Vertex, &macros, diagnostics);
        let fragment_program = self.compile_stage(&fragment_source, ShaderStage::Fragment, &macros, diagnostics);
        if diagnostics.has_error() {
            return None;
        }

        Some(ShaderVariant {
            key,
            pipeline_state,
            vertex_attributes: layout.vertex_attributes,
            binding_set_sizes: layout.binding_set_sizes,
            bindings: layout.bindings,
            vertex_program: Arc::from(vertex_program?),
            fragment_program: Arc::from(fragment_program?),
        })
    }

    fn is_active(&self, condition: Option<&Expr>, values: &dyn OptionValueSet, diagnostics: &mut Diagnostics) -> bool {
        evaluate_condition(condition, values).unwrap_or_else(|| {
            let mut diagnostic =
                Diagnostic::internal("block condition is not evaluable for this variant").in_file(self.file);
            if let Some(condition) = condition {
                diagnostic = diagnostic.at(condition.span);
            }
            diagnostics.push(diagnostic);
            false
        })
    }

    /// Default state with every active pipeline block applied in source order
    fn compose_pipeline_state(&self, values: &dyn OptionValueSet, diagnostics: &mut Diagnostics) -> PipelineState {
        self.unit
            .pipeline_blocks()
            .filter(|block| self.is_active(block.condition.as_ref(), values, diagnostics))
            .fold(PipelineState::default(), |state, block| state.with(&block.state))
    }

    fn find_stage_block(
        &self,
        stage: ShaderStage,
        values: &dyn OptionValueSet,
        diagnostics: &mut Diagnostics,
    ) -> Option<&'s StageBlock> {
        let active: SmallVec<[&'s StageBlock; 2]> = self
            .unit
            .stage_blocks()
            .filter(|block| block.stage == stage)
            .filter(|block| self.is_active(block.condition.as_ref(), values, diagnostics))
            .collect();
        match active.as_slice() {
            [] => {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::NoStageBlock,
                        format!("no {} stage block is active", stage.name()),
                    )
                    .in_file(self.file),
                );
                None
            }
            [single] => Some(*single),
            [first, second, ..] => {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::MultipleStageBlocks,
                        format!("more than one {} stage block is active", stage.name()),
                    )
                    .in_file(self.file)
                    .at(second.span)
                    .related_to(first.span),
                );
                None
            }
        }
    }

    fn compile_stage(
        &mut self,
        source: &str,
        stage: ShaderStage,
        macros: &[Macro],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<u8>> {
        let output = self.downstream.compile(source, stage, macros);
        let failed = output.has_error();
        if failed && self.output_generated_source_on_error {
            diagnostics.push(
                Diagnostic::info(
                    DiagnosticCode::GeneratedSource,
                    format!("generated {} source:\n{source}", stage.name()),
                )
                .in_file(self.file),
            );
        }
        if failed && !output.diagnostics.has_error() {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::Downstream,
                    format!("{} stage failed without a diagnostic", stage.name()),
                )
                .in_file(self.file),
            );
        }
        diagnostics.extend(output.diagnostics);
        output.bytes.filter(|_| !failed)
    }
}

/// One macro per option with its value, and one per named value with its index
pub fn collect_macros(unit: &TranslationUnit, values: &dyn OptionValueSet) -> Vec<Macro> {
    let options = unit.options();
    let option_macros = options.iter().map(|option| {
        let value = values.try_get_value(&option.name).unwrap_or(0);
        (option.name.clone(), value.to_string())
    });
    let value_macros = options.iter().flat_map(|option| {
        option
            .named_values
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index.to_string()))
    });
    option_macros.chain(value_macros).collect()
}
