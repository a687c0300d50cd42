//! Program variance classification.
//!
//! An option is program-invariant when nothing that ends up in a compiled
//! program reads it. Pipeline block conditions are the only place such an
//! option may appear, so toggling it only changes [`PipelineState`].
//!
//! [`PipelineState`]: shaderset_shared::PipelineState

use hashbrown::HashSet;

use crate::ast::{
    GlobalBlock, StorageKind, TranslationUnit, walk_function, walk_stage_block, walk_storage_block,
};
use crate::options::{IS_INSTANCED_OPTION, program_invariance_mask};

/// Names of all options that never influence generated code
pub fn find_program_invariant_options(unit: &TranslationUnit) -> HashSet<&str> {
    let mut remaining: HashSet<&str> = unit.options().iter().map(|o| o.name.as_str()).collect();
    let mut remove_variable = |expr: &crate::ast::Expr| {
        if let Some(name) = expr.as_variable() {
            remaining.remove(name);
        }
    };

    let mut has_instances = false;
    for block in unit.blocks() {
        match block {
            GlobalBlock::Pipeline(_) => {}
            GlobalBlock::Storage(storage) => {
                has_instances |= storage.kind == StorageKind::Instances;
                walk_storage_block(storage, &mut remove_variable);
            }
            GlobalBlock::Stage(stage) => walk_stage_block(stage, &mut remove_variable),
            GlobalBlock::Function(function) => walk_function(function, &mut remove_variable),
        }
    }
    // Instances blocks switch between attributes and uniforms on this option
    if has_instances {
        remaining.remove(IS_INSTANCED_OPTION);
    }
    remaining
}

/// Flags every program-invariant option of the unit and returns their bit mask
pub fn mark_program_invariance(unit: &mut TranslationUnit) -> u32 {
    let invariant: HashSet<String> = find_program_invariant_options(unit)
        .into_iter()
        .map(str::to_string)
        .collect();
    for option in unit.options_mut() {
        option.program_invariant = invariant.contains(&option.name);
    }
    let mask = program_invariance_mask(unit.options());
    tracing::debug!(
        invariant = invariant.len(),
        options = unit.options().len(),
        mask = format_args!("{mask:#x}"),
        "classified program variance"
    );
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Declaration, Expr, Function, PipelineBlock, ShaderStage, StageBlock, Statement,
        StorageBlock, Type,
    };
    use shaderset_shared::{NumericType, PartialPipelineState, ScalarType};

    fn float4() -> Type {
        Type::Numeric(NumericType::vector(ScalarType::Float, 4))
    }

    fn unit() -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        unit.add_option("Blend", Vec::<String>::new());
        unit.add_option("Fog", Vec::<String>::new());
        unit.add_option("Mode", ["Opaque", "Cutout"]);
        unit.add_option("Skinned", Vec::<String>::new());
        unit.add_pipeline_block(PipelineBlock::new(PartialPipelineState::default()).when(Expr::var("Blend")));
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .when(Expr::var("Fog"))
                .with(Declaration::new("fogColor", float4())),
        );
        unit.add_stage_block(StageBlock::new(ShaderStage::Fragment).with_statements([
            Statement::if_else(
                Expr::eq(Expr::var("Mode"), Expr::var("Cutout")),
                Statement::Flow(crate::ast::FlowKind::Discard),
                None,
            ),
        ]));
        unit
    }

    #[test]
    fn test_pipeline_only_options_are_invariant() {
        let unit = unit();
        let invariant = find_program_invariant_options(&unit);
        assert_eq!(invariant, HashSet::from_iter(["Blend", "Skinned"]));
    }

    #[test]
    fn test_free_functions_count_as_usage() {
        let mut unit = unit();
        unit.add_function(
            Function::new("skin", Some(float4()))
                .with_body(vec![Statement::Return(Some(Expr::var("Skinned")))]),
        );
        let invariant = find_program_invariant_options(&unit);
        assert_eq!(invariant, HashSet::from_iter(["Blend"]));
    }

    #[test]
    fn test_instances_block_uses_is_instanced() {
        let mut unit = unit();
        unit.add_option(IS_INSTANCED_OPTION, Vec::<String>::new());
        assert!(find_program_invariant_options(&unit).contains(IS_INSTANCED_OPTION));

        unit.add_storage_block(
            StorageBlock::new(StorageKind::Instances).with(Declaration::new("tint", float4())),
        );
        assert!(!find_program_invariant_options(&unit).contains(IS_INSTANCED_OPTION));
    }

    #[test]
    fn test_mark_sets_flags_and_mask() {
        let mut unit = unit();
        let mask = mark_program_invariance(&mut unit);
        // Blend at bit 0, Skinned at bit 3
        assert_eq!(mask, 0b1001);
        let flags: Vec<_> = unit.options().iter().map(|o| o.program_invariant).collect();
        assert_eq!(flags, [true, false, false, true]);
    }
}
