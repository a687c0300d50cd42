//! Per-shader analysis: option checks, program variance and [`ShaderInfo`].

use hashbrown::HashMap;
use shaderset_shared::ShaderInfo;

use crate::ast::{StorageKind, TranslationUnit, evaluate_condition};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::downstream::DownstreamCompiler;
use crate::options::{
    FilteredOptionValueSet, IS_INSTANCED_OPTION, MAX_VARIANT_BITS, ShaderOption, VariantCollection,
    VariantFilter, program_invariance_mask,
};
use crate::variance::mark_program_invariance;
use crate::variant::VariantCompiler;

/// One parsed shader source, checked and ready to compile variants from
pub struct ShaderCompiler {
    name: String,
    source: String,
    unit: TranslationUnit,
    info: ShaderInfo,
    diagnostics: Diagnostics,
}

impl ShaderCompiler {
    /// Analyzes a parsed unit. `source` is the text the unit was parsed from,
    /// its CRC32 identifies the shader in variant keys.
    pub fn new(name: impl Into<String>, source: impl Into<String>, mut unit: TranslationUnit) -> Self {
        let name = name.into();
        let source = source.into();

        let mut checks = Checks {
            file: &name,
            diagnostics: Diagnostics::new(),
        };
        checks.variant_space(&unit);
        checks.named_values(unit.options());
        checks.conditions(&unit);
        checks.special_options(&unit);
        let diagnostics = checks.diagnostics;

        mark_program_invariance(&mut unit);
        let info = collect_shader_info(&unit, crc32fast::hash(source.as_bytes()));
        tracing::debug!(
            shader = %name,
            hash = format_args!("{:08X}", info.source_hash),
            options = info.options.len(),
            errors = diagnostics.error_count(),
            "analyzed shader"
        );

        Self {
            name,
            source,
            unit,
            info,
            diagnostics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn unit(&self) -> &TranslationUnit {
        &self.unit
    }

    pub fn info(&self) -> &ShaderInfo {
        &self.info
    }

    pub fn source_hash(&self) -> u32 {
        self.info.source_hash
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    pub fn all_variants(&self) -> VariantCollection<'_> {
        VariantCollection::new(self.unit.options(), VariantFilter::All)
    }

    /// One representative per distinct pair of programs, invariant options at 0
    pub fn program_variants(&self) -> VariantCollection<'_> {
        VariantCollection::new(self.unit.options(), VariantFilter::Program)
    }

    /// Every variant sharing programs with `option_bits`, including itself
    pub fn program_invariants_for(&self, option_bits: u32) -> VariantCollection<'_> {
        let base_bits = option_bits & !self.info.program_invariance_mask;
        VariantCollection::with_base(self.unit.options(), VariantFilter::ProgramInvariant, base_bits)
    }

    pub fn format_variant_name(&self, option_bits: u32) -> String {
        self.info.format_variant_name(option_bits)
    }

    /// `None` if analysis reported errors
    pub fn create_variant_compiler<'s>(
        &'s self,
        downstream: Box<dyn DownstreamCompiler + 's>,
    ) -> Option<VariantCompiler<'s>> {
        if self.has_error() {
            return None;
        }
        Some(VariantCompiler::new(&self.unit, &self.info, &self.name, downstream))
    }
}

struct Checks<'a> {
    file: &'a str,
    diagnostics: Diagnostics,
}

impl Checks<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic.in_file(self.file));
    }

    fn variant_space(&mut self, unit: &TranslationUnit) {
        let bits = unit.option_bit_count();
        if bits >= MAX_VARIANT_BITS {
            self.report(Diagnostic::error(
                DiagnosticCode::VariantSpaceTooLarge,
                format!("options need {bits} bits, at most {} are supported", MAX_VARIANT_BITS - 1),
            ));
        }
    }

    fn named_values(&mut self, options: &[ShaderOption]) {
        let mut by_name: HashMap<&str, &ShaderOption> = HashMap::new();
        for option in options {
            if option.named_values.len() == 1 {
                self.report(
                    Diagnostic::error(
                        DiagnosticCode::TooFewOptionValues,
                        format!("option `{}` needs at least two values", option.name),
                    )
                    .at(option.span),
                );
            }
            match by_name.get(option.name.as_str()) {
                Some(previous) => {
                    let diagnostic = Diagnostic::error(
                        DiagnosticCode::DuplicateOptionName,
                        format!("option `{}` is declared more than once", option.name),
                    )
                    .at(option.span)
                    .related_to(previous.span);
                    self.report(diagnostic);
                }
                None => {
                    by_name.insert(&option.name, option);
                }
            }
        }

        let mut values: HashMap<&str, (usize, &ShaderOption)> = HashMap::new();
        for option in options {
            for (index, value) in option.named_values.iter().enumerate() {
                if let Some(other) = by_name.get(value.as_str()) {
                    let diagnostic = Diagnostic::error(
                        DiagnosticCode::OptionNameIsValue,
                        format!("value `{value}` of option `{}` is also the name of an option", option.name),
                    )
                    .at(option.span)
                    .related_to(other.span);
                    self.report(diagnostic);
                }
                match values.get(value.as_str()) {
                    None => {
                        values.insert(value, (index, option));
                    }
                    Some(&(previous_index, previous)) if previous_index != index => {
                        let diagnostic = Diagnostic::error(
                            DiagnosticCode::DuplicateNamedValue,
                            format!(
                                "value `{value}` is {previous_index} in option `{}` but {index} in option `{}`",
                                previous.name, option.name
                            ),
                        )
                        .at(option.span)
                        .related_to(previous.span);
                        self.report(diagnostic);
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Conditions must be decidable from options alone
    fn conditions(&mut self, unit: &TranslationUnit) {
        let values = FilteredOptionValueSet::new(unit.options(), None);
        for condition in unit.block_conditions() {
            values.reset_accessed();
            match evaluate_condition(Some(condition), &values) {
                None => self.report(
                    Diagnostic::error(
                        DiagnosticCode::ConditionNotEvaluable,
                        "condition can only use options, their values and logical operators",
                    )
                    .at(condition.span),
                ),
                Some(value) if !values.accessed_option() => self.report(
                    Diagnostic::warning(
                        DiagnosticCode::ConditionIsConstant,
                        format!("condition does not depend on any option and is always {value}"),
                    )
                    .at(condition.span),
                ),
                Some(_) => {}
            }
        }
    }

    fn special_options(&mut self, unit: &TranslationUnit) {
        match unit.option(IS_INSTANCED_OPTION) {
            Some(option) if !option.is_boolean() => self.report(
                Diagnostic::error(
                    DiagnosticCode::SpecialOptionWithValues,
                    format!("option `{IS_INSTANCED_OPTION}` must be boolean"),
                )
                .at(option.span),
            ),
            Some(_) => {}
            None => {
                if let Some((_, block)) = unit
                    .storage_blocks()
                    .find(|(_, block)| block.kind == StorageKind::Instances)
                {
                    self.report(
                        Diagnostic::error(
                            DiagnosticCode::InstancesBlockWithoutOption,
                            format!("instances blocks need a boolean `{IS_INSTANCED_OPTION}` option"),
                        )
                        .at(block.span),
                    );
                }
            }
        }
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Names are listed once each, in declaration order
fn collect_shader_info(unit: &TranslationUnit, source_hash: u32) -> ShaderInfo {
    let mut vertex_attributes = Vec::new();
    let mut instance_attributes = Vec::new();
    let mut bindings = Vec::new();
    for (_, block) in unit.storage_blocks() {
        let list = match block.kind {
            StorageKind::Attributes => &mut vertex_attributes,
            StorageKind::Instances => &mut instance_attributes,
            StorageKind::Uniform => &mut bindings,
            StorageKind::Varying => continue,
        };
        for declaration in &block.declarations {
            push_unique(list, &declaration.name);
        }
        if block.kind == StorageKind::Instances {
            push_unique(&mut bindings, &block.reflection_name());
        }
    }

    ShaderInfo {
        source_hash,
        program_invariance_mask: program_invariance_mask(unit.options()),
        options: unit.options().iter().map(ShaderOption::info).collect(),
        vertex_attributes,
        instance_attributes,
        bindings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Declaration, Expr, PipelineBlock, ShaderStage, Span, StageBlock, Statement, StorageBlock, Type};
    use crate::downstream::SourceDownstreamCompiler;
    use shaderset_shared::{NumericType, PartialPipelineState, ScalarType};

    const SOURCE: &str = "option Mode { Opaque, Cutout }\noption Blend\n";

    fn float4() -> Type {
        Type::Numeric(NumericType::vector(ScalarType::Float, 4))
    }

    fn unit() -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        unit.add_option("Mode", ["Opaque", "Cutout"]);
        unit.add_option("Blend", Vec::<String>::new());
        unit.add_storage_block(StorageBlock::new(StorageKind::Attributes).with(Declaration::new("position", float4())));
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .with(Declaration::new("tint", float4()))
                .with(Declaration::new("position", float4())),
        );
        unit.add_pipeline_block(PipelineBlock::new(PartialPipelineState::default()).when(Expr::var("Blend")));
        unit.add_stage_block(StageBlock::new(ShaderStage::Vertex));
        unit.add_stage_block(StageBlock::new(ShaderStage::Fragment).with_statements([Statement::if_else(
            Expr::eq(Expr::var("Mode"), Expr::var("Cutout")),
            Statement::Flow(crate::ast::FlowKind::Discard),
            None,
        )]));
        unit
    }

    fn codes(compiler: &ShaderCompiler) -> Vec<DiagnosticCode> {
        compiler.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_shader_info() {
        let compiler = ShaderCompiler::new("lit.shader", SOURCE, unit());
        assert!(compiler.diagnostics().is_empty());
        let info = compiler.info();
        assert_eq!(info.source_hash, crc32fast::hash(SOURCE.as_bytes()));
        assert_eq!(info.program_invariance_mask, 0b10);
        assert_eq!(info.vertex_attributes, ["position"]);
        assert_eq!(info.bindings, ["tint", "position"]);
        assert_eq!(info.options[0].named_values, ["Opaque", "Cutout"]);
        assert!(info.options[1].is_boolean());
    }

    #[test]
    fn test_variant_collections() {
        let compiler = ShaderCompiler::new("lit.shader", SOURCE, unit());
        assert_eq!(compiler.all_variants().len(), 4);
        assert_eq!(compiler.program_variants().iter().collect::<Vec<_>>(), [0b00, 0b01]);
        assert_eq!(compiler.program_invariants_for(0b11).iter().collect::<Vec<_>>(), [0b01, 0b11]);
        assert_eq!(compiler.format_variant_name(0b11), "Mode=Cutout, Blend");
        assert!(compiler.create_variant_compiler(Box::new(SourceDownstreamCompiler)).is_some());
    }

    #[test]
    fn test_option_declaration_errors() {
        let mut unit = TranslationUnit::new();
        unit.add_option("Mode", ["Only"]);
        unit.add_option_at("Quality", ["Low", "High"], Span::new(1, 0));
        unit.add_option_at("Quality", Vec::<String>::new(), Span::new(2, 0));
        unit.add_option("Preset", ["High", "Low", "Mode"]);
        let compiler = ShaderCompiler::new("bad.shader", "", unit);
        let codes = codes(&compiler);
        assert!(codes.contains(&DiagnosticCode::TooFewOptionValues));
        assert!(codes.contains(&DiagnosticCode::DuplicateOptionName));
        assert!(codes.contains(&DiagnosticCode::DuplicateNamedValue));
        assert!(codes.contains(&DiagnosticCode::OptionNameIsValue));
        assert!(compiler.create_variant_compiler(Box::new(SourceDownstreamCompiler)).is_none());

        let duplicate = compiler
            .diagnostics()
            .iter()
            .find(|d| d.code == DiagnosticCode::DuplicateOptionName)
            .unwrap();
        assert_eq!(duplicate.span, Some(Span::new(2, 0)));
        assert_eq!(duplicate.related_span, Some(Span::new(1, 0)));
    }

    #[test]
    fn test_variant_space_limit() {
        let mut unit = TranslationUnit::new();
        for i in 0..15 {
            unit.add_option(format!("Flag{i}"), Vec::<String>::new());
        }
        assert!(!ShaderCompiler::new("ok.shader", "", unit.clone()).has_error());
        unit.add_option("Flag15", Vec::<String>::new());
        let compiler = ShaderCompiler::new("big.shader", "", unit);
        assert_eq!(codes(&compiler), [DiagnosticCode::VariantSpaceTooLarge]);
    }

    #[test]
    fn test_condition_checks() {
        let mut unit = unit();
        unit.add_pipeline_block(PipelineBlock::new(PartialPipelineState::default()).when(Expr::int(1)));
        unit.add_pipeline_block(
            PipelineBlock::new(PartialPipelineState::default())
                .when(Expr::binary(crate::ast::BinaryOp::Add, Expr::var("Blend"), Expr::int(1))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform).when(Expr::var("position")).with(Declaration::new("x", float4())),
        );
        let compiler = ShaderCompiler::new("lit.shader", SOURCE, unit);
        let codes = codes(&compiler);
        assert_eq!(
            codes,
            [
                DiagnosticCode::ConditionIsConstant,
                DiagnosticCode::ConditionNotEvaluable,
                DiagnosticCode::ConditionNotEvaluable,
            ]
        );
        assert_eq!(compiler.diagnostics().error_count(), 2);
    }

    #[test]
    fn test_special_option_checks() {
        let mut unit = unit();
        unit.add_storage_block(StorageBlock::new(StorageKind::Instances).with(Declaration::new("world", float4())));
        let compiler = ShaderCompiler::new("lit.shader", SOURCE, unit.clone());
        assert_eq!(codes(&compiler), [DiagnosticCode::InstancesBlockWithoutOption]);
        assert_eq!(compiler.info().instance_attributes, ["world"]);
        assert_eq!(compiler.info().bindings, ["tint", "position", "world"]);

        unit.add_option(IS_INSTANCED_OPTION, ["No", "Yes"]);
        let compiler = ShaderCompiler::new("lit.shader", SOURCE, unit);
        assert_eq!(codes(&compiler), [DiagnosticCode::SpecialOptionWithValues]);
    }
}
