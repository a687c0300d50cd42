//! Resource layout of one variant.
//!
//! Assigns vertex attribute locations, descriptor bindings and varying
//! locations from declaration order and the storage blocks active for a set
//! of option values. The result is a side table keyed by [`DeclId`]; the tree
//! itself is never touched.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use shaderset_shared::{BindingInfo, BindingType, StructureType, VertexAttributeInfo};

use crate::ast::{
    DeclId, Declaration, Expr, StageBlock, StorageBlock, StorageKind, TranslationUnit, Type,
    evaluate_condition, walk_function, walk_stage_block,
};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::options::{IS_INSTANCED_OPTION, OptionValueSet};

/// Prefix of the vertex outputs that pass instance data on to the fragment stage
pub const INSTANCE_VARYING_PREFIX: &str = "instance_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutInfo {
    pub in_location: Option<u32>,
    pub out_location: Option<u32>,
    pub set: Option<u32>,
    pub binding: Option<u32>,
}

impl LayoutInfo {
    pub fn in_location(location: u32) -> Self {
        Self {
            in_location: Some(location),
            ..Self::default()
        }
    }

    /// Same location on both sides of the stage interface
    pub fn location(location: u32) -> Self {
        Self {
            in_location: Some(location),
            out_location: Some(location),
            ..Self::default()
        }
    }

    pub fn binding(set: u32, binding: u32) -> Self {
        Self {
            set: Some(set),
            binding: Some(binding),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub infos: HashMap<DeclId, LayoutInfo>,
    pub vertex_attributes: Vec<VertexAttributeInfo>,
    /// Binding count per descriptor set
    pub binding_set_sizes: Vec<u32>,
    pub bindings: Vec<BindingInfo>,
    /// Instance declarations the fragment stage reads, in declaration order
    pub transferred: BTreeSet<DeclId>,
}

impl Layout {
    pub fn info(&self, id: DeclId) -> LayoutInfo {
        self.infos.get(&id).copied().unwrap_or_default()
    }

    pub fn is_transferred(&self, id: DeclId) -> bool {
        self.transferred.contains(&id)
    }
}

/// Whether the `IsInstanced` option is set
pub fn is_instanced(values: &dyn OptionValueSet) -> bool {
    values.try_get_value(IS_INSTANCED_OPTION).is_some_and(|v| v != 0)
}

/// Computes the layout of one variant
pub struct LayoutAssignor<'a> {
    unit: &'a TranslationUnit,
    values: &'a dyn OptionValueSet,
    file: Option<&'a str>,
    diagnostics: &'a mut Diagnostics,
    layout: Layout,
}

impl<'a> LayoutAssignor<'a> {
    pub fn new(
        unit: &'a TranslationUnit,
        values: &'a dyn OptionValueSet,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            unit,
            values,
            file: None,
            diagnostics,
            layout: Layout::default(),
        }
    }

    pub fn in_file(mut self, file: &'a str) -> Self {
        self.file = Some(file);
        self
    }

    /// Runs all passes. `fragment_stage` decides which instance data is transferred.
    pub fn assign(mut self, fragment_stage: &StageBlock) -> Layout {
        self.layout.transferred = self.find_transferred_instance_variables(fragment_stage);
        self.layout_vertex_attributes();
        self.layout_bindings();
        self.layout_varyings();
        self.layout
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let diagnostic = match self.file {
            Some(file) => diagnostic.in_file(file),
            None => diagnostic,
        };
        self.diagnostics.push(diagnostic);
    }

    fn is_active(&mut self, condition: Option<&Expr>) -> bool {
        match evaluate_condition(condition, self.values) {
            Some(active) => active,
            None => {
                let mut diagnostic = Diagnostic::internal("block condition is not evaluable for this variant");
                if let Some(condition) = condition {
                    diagnostic = diagnostic.at(condition.span);
                }
                self.report(diagnostic);
                false
            }
        }
    }

    /// Active storage blocks grouped by `kinds` order, each group in source order
    fn active_blocks(&mut self, kinds: &[StorageKind]) -> Vec<(usize, &'a StorageBlock)> {
        let unit = self.unit;
        kinds
            .iter()
            .flat_map(move |&kind| unit.storage_blocks().filter(move |(_, block)| block.kind == kind))
            .filter(|(_, block)| self.is_active(block.condition.as_ref()))
            .collect()
    }

    fn declarations(unit: &'a TranslationUnit, block_index: usize) -> impl Iterator<Item = (DeclId, &'a Declaration)> {
        unit.declarations_of(block_index)
    }

    fn find_transferred_instance_variables(&mut self, fragment_stage: &StageBlock) -> BTreeSet<DeclId> {
        if !is_instanced(self.values) {
            return BTreeSet::new();
        }
        let unit = self.unit;
        let mut by_name: HashMap<&str, DeclId> = HashMap::new();
        for (block_index, _) in self.active_blocks(&[StorageKind::Instances]) {
            for (id, declaration) in Self::declarations(unit, block_index) {
                if let Some(&first) = by_name.get(declaration.name.as_str()) {
                    let mut diagnostic = Diagnostic::error(
                        DiagnosticCode::DuplicateInstanceVariable,
                        format!("instance variable `{}` is declared more than once", declaration.name),
                    )
                    .at(declaration.span);
                    if let Some(first) = unit.declaration(first) {
                        diagnostic = diagnostic.related_to(first.span);
                    }
                    self.report(diagnostic);
                    continue;
                }
                by_name.insert(&declaration.name, id);
            }
        }

        let mut used = BTreeSet::new();
        let mut record = |expr: &Expr| {
            if let Some(&id) = expr.as_variable().and_then(|name| by_name.get(name)) {
                used.insert(id);
            }
        };
        for function in unit.functions() {
            walk_function(function, &mut record);
        }
        walk_stage_block(fragment_stage, &mut record);
        used
    }

    fn layout_vertex_attributes(&mut self) {
        let kinds: &[StorageKind] = if is_instanced(self.values) {
            &[StorageKind::Attributes, StorageKind::Instances]
        } else {
            &[StorageKind::Attributes]
        };
        let unit = self.unit;
        let mut location = 0;
        for (block_index, block) in self.active_blocks(kinds) {
            let is_instance = block.kind == StorageKind::Instances;
            for (id, declaration) in Self::declarations(unit, block_index) {
                let Some(ty) = declaration.ty.as_numeric() else {
                    self.report(
                        Diagnostic::error(
                            DiagnosticCode::NonNumericVertexAttribute,
                            format!("vertex attribute `{}` must have a numeric type", declaration.name),
                        )
                        .at(declaration.span),
                    );
                    continue;
                };
                self.layout.infos.insert(id, LayoutInfo::in_location(location));
                self.layout.vertex_attributes.push(VertexAttributeInfo {
                    location,
                    name: declaration.name.clone(),
                    ty,
                    is_instance,
                });
                location += ty.columns as u32;
            }
        }
    }

    fn layout_bindings(&mut self) {
        let kinds: &[StorageKind] = if is_instanced(self.values) {
            &[StorageKind::Uniform]
        } else {
            &[StorageKind::Uniform, StorageKind::Instances]
        };
        let unit = self.unit;
        // Everything lives in set 0 for now
        let set = 0;
        let mut binding = 0;
        for (block_index, block) in self.active_blocks(kinds) {
            let mut structure_binding = None;
            let mut members = Vec::new();
            for (id, declaration) in Self::declarations(unit, block_index) {
                if declaration.ty.is_binding_type() {
                    self.layout.infos.insert(id, LayoutInfo::binding(set, binding));
                    if let Some(ty) = self.binding_type_of(declaration) {
                        self.layout
                            .bindings
                            .push(BindingInfo::new(set, binding, declaration.name.clone(), ty));
                    }
                    binding += 1;
                } else if let Some(ty) = declaration.ty.as_numeric() {
                    let slot = *structure_binding.get_or_insert_with(|| {
                        binding += 1;
                        binding - 1
                    });
                    members.push((declaration.name.clone(), ty));
                    self.layout.infos.insert(id, LayoutInfo::binding(set, slot));
                } else {
                    self.report(
                        Diagnostic::error(
                            DiagnosticCode::NonNumericNorBindingUniform,
                            format!(
                                "uniform `{}` must have a numeric, image, sampler or buffer type",
                                declaration.name
                            ),
                        )
                        .at(declaration.span),
                    );
                }
            }
            if let Some(slot) = structure_binding {
                let info = BindingInfo::new(
                    set,
                    slot,
                    block.reflection_name(),
                    BindingType::Structure(StructureType::from_members(members)),
                );
                self.layout.bindings.push(if block.kind == StorageKind::Instances {
                    info.as_instance()
                } else {
                    info
                });
            }
        }
        self.layout.bindings.sort_by_key(|b| (b.set, b.binding));
        self.layout.binding_set_sizes.push(binding);
    }

    fn binding_type_of(&mut self, declaration: &Declaration) -> Option<BindingType> {
        match &declaration.ty {
            Type::Image(image) => Some(BindingType::Image(*image)),
            Type::Sampler(sampler) => Some(BindingType::Sampler(*sampler)),
            Type::Buffer(_) => {
                let buffer = declaration.ty.buffer_type();
                if buffer.is_none() {
                    self.report(
                        Diagnostic::error(
                            DiagnosticCode::UnsupportedBufferType,
                            format!(
                                "buffer `{}` must hold an array of a numeric type",
                                declaration.name
                            ),
                        )
                        .at(declaration.span),
                    );
                }
                buffer.map(BindingType::Buffer)
            }
            _ => None,
        }
    }

    fn layout_varyings(&mut self) {
        let unit = self.unit;
        let mut location = 0;
        for (block_index, _) in self.active_blocks(&[StorageKind::Varying]) {
            for (id, _) in Self::declarations(unit, block_index) {
                self.layout.infos.insert(id, LayoutInfo::location(location));
                location += 1;
            }
        }
        for &id in &self.layout.transferred {
            self.layout.infos.entry(id).or_default().out_location = Some(location);
            location += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ShaderStage, Statement};
    use crate::options::{FilteredOptionValueSet, RawOptionValueSet};
    use shaderset_shared::{ImageShape, ImageType, NumericType, SamplerType, ScalarType};

    fn float(rows: u8) -> Type {
        Type::Numeric(NumericType::vector(ScalarType::Float, rows))
    }

    fn mat4() -> Type {
        Type::Numeric(NumericType::matrix(4, 4))
    }

    fn texture() -> Type {
        Type::Image(ImageType::new(ScalarType::Float, ImageShape::D2, true))
    }

    fn unit() -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        unit.add_option(IS_INSTANCED_OPTION, Vec::<String>::new());
        unit.add_option("Fog", Vec::<String>::new());
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Attributes)
                .with(Declaration::new("position", float(3)))
                .with(Declaration::new("uv", float(2))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Instances)
                .at(crate::ast::Span::new(9, 0))
                .with(Declaration::new("world", mat4()))
                .with(Declaration::new("tint", float(4))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .named("Material")
                .with(Declaration::new("albedo", texture()))
                .with(Declaration::new("roughness", float(1)))
                .with(Declaration::new("linearSampler", Type::Sampler(SamplerType)))
                .with(Declaration::new("metalness", float(1))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .when(Expr::var("Fog"))
                .with(Declaration::new("fogColor", float(4))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Varying)
                .with(Declaration::new("v_uv", float(2)))
                .with(Declaration::new("v_normal", float(3))),
        );
        unit
    }

    fn fragment(statements: Vec<Statement>) -> StageBlock {
        StageBlock::new(ShaderStage::Fragment).with_statements(statements)
    }

    fn assign(unit: &TranslationUnit, raw: &RawOptionValueSet, stage: &StageBlock) -> (Layout, Diagnostics) {
        let values = FilteredOptionValueSet::new(unit.options(), Some(raw));
        let mut diagnostics = Diagnostics::new();
        let layout = LayoutAssignor::new(unit, &values, &mut diagnostics).assign(stage);
        (layout, diagnostics)
    }

    #[test]
    fn test_instanced_attributes_consume_columns() {
        let unit = unit();
        let values = RawOptionValueSet::from_iter([(IS_INSTANCED_OPTION, 1)]);
        let (layout, diagnostics) = assign(&unit, &values, &fragment(Vec::new()));
        assert!(diagnostics.is_empty());
        let locations: Vec<_> = layout
            .vertex_attributes
            .iter()
            .map(|a| (a.name.as_str(), a.location, a.is_instance))
            .collect();
        assert_eq!(
            locations,
            [("position", 0, false), ("uv", 1, false), ("world", 2, true), ("tint", 6, true)]
        );
        // Instances are attributes now, not a uniform block
        assert!(layout.bindings.iter().all(|b| !b.is_instance));
    }

    #[test]
    fn test_bindings_share_structure_slot() {
        let unit = unit();
        let values = RawOptionValueSet::from_iter([("Fog", 1)]);
        let (layout, diagnostics) = assign(&unit, &values, &fragment(Vec::new()));
        assert!(diagnostics.is_empty());

        let bindings: Vec<_> = layout
            .bindings
            .iter()
            .map(|b| (b.name.as_str(), b.binding, b.ty.category()))
            .collect();
        use shaderset_shared::DataTypeCategory::*;
        assert_eq!(
            bindings,
            [
                ("albedo", 0, Image),
                ("Material", 1, Structure),
                ("linearSampler", 2, Sampler),
                ("fogColor", 3, Structure),
                ("block_10_1", 4, Structure),
            ]
        );
        assert_eq!(layout.binding_set_sizes, [5]);
        assert!(layout.bindings[4].is_instance);
        assert_eq!(layout.info(DeclId::new(2, 3)), LayoutInfo::binding(0, 1));

        let mut slots: Vec<_> = layout.bindings.iter().map(|b| (b.set, b.binding)).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), layout.bindings.len());
    }

    #[test]
    fn test_blocks_are_grouped_by_kind() {
        let mut unit = TranslationUnit::new();
        unit.add_option(IS_INSTANCED_OPTION, Vec::<String>::new());
        unit.add_storage_block(StorageBlock::new(StorageKind::Instances).with(Declaration::new("tint", float(4))));
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .named("Material")
                .with(Declaration::new("cutoff", float(1))),
        );
        unit.add_storage_block(StorageBlock::new(StorageKind::Attributes).with(Declaration::new("position", float(3))));

        let instanced = RawOptionValueSet::from_iter([(IS_INSTANCED_OPTION, 1)]);
        let (layout, diagnostics) = assign(&unit, &instanced, &fragment(Vec::new()));
        assert!(diagnostics.is_empty());
        let locations: Vec<_> = layout
            .vertex_attributes
            .iter()
            .map(|a| (a.name.as_str(), a.location, a.is_instance))
            .collect();
        assert_eq!(locations, [("position", 0, false), ("tint", 1, true)]);

        let (layout, diagnostics) = assign(&unit, &RawOptionValueSet::new(), &fragment(Vec::new()));
        assert!(diagnostics.is_empty());
        let bindings: Vec<_> = layout
            .bindings
            .iter()
            .map(|b| (b.name.as_str(), b.binding, b.is_instance))
            .collect();
        assert_eq!(bindings, [("Material", 0, false), ("tint", 1, true)]);
        assert_eq!(layout.info(DeclId::new(0, 0)), LayoutInfo::binding(0, 1));
    }

    #[test]
    fn test_inactive_blocks_are_skipped() {
        let unit = unit();
        let (layout, diagnostics) = assign(&unit, &RawOptionValueSet::new(), &fragment(Vec::new()));
        assert!(diagnostics.is_empty());
        assert!(layout.bindings.iter().all(|b| b.name != "fogColor"));
        assert_eq!(layout.binding_set_sizes, [4]);
    }

    #[test]
    fn test_only_fragment_reads_are_transferred() {
        let unit = unit();
        let values = RawOptionValueSet::from_iter([(IS_INSTANCED_OPTION, 1)]);
        let stage = fragment(vec![Statement::expr(Expr::var("tint"))]);
        let (layout, _) = assign(&unit, &values, &stage);

        let tint = DeclId::new(1, 1);
        let world = DeclId::new(1, 0);
        assert_eq!(layout.transferred.iter().copied().collect::<Vec<_>>(), [tint]);
        assert!(!layout.is_transferred(world));
        assert_eq!(layout.info(tint).in_location, Some(6));
        // After the two declared varyings
        assert_eq!(layout.info(tint).out_location, Some(2));
        assert_eq!(layout.info(DeclId::new(4, 1)), LayoutInfo::location(1));
    }

    #[test]
    fn test_nothing_is_transferred_without_instancing() {
        let unit = unit();
        let stage = fragment(vec![Statement::expr(Expr::var("tint"))]);
        let (layout, _) = assign(&unit, &RawOptionValueSet::new(), &stage);
        assert!(layout.transferred.is_empty());
    }

    #[test]
    fn test_invalid_declarations_are_reported() {
        let mut unit = TranslationUnit::new();
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Attributes)
                .with(Declaration::new("bad", texture()))
                .with(Declaration::new("position", float(3))),
        );
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Uniform)
                .with(Declaration::new("lights", Type::Buffer(Box::new(float(4)))))
                .with(Declaration::new("custom", Type::Custom("Light".into()))),
        );
        let (layout, diagnostics) = assign(&unit, &RawOptionValueSet::new(), &fragment(Vec::new()));
        assert!(diagnostics.contains_code(DiagnosticCode::NonNumericVertexAttribute));
        assert!(diagnostics.contains_code(DiagnosticCode::UnsupportedBufferType));
        assert!(diagnostics.contains_code(DiagnosticCode::NonNumericNorBindingUniform));
        assert_eq!(layout.vertex_attributes[0].location, 0);
        assert!(layout.bindings.is_empty());
        assert_eq!(layout.binding_set_sizes, [1]);
    }

    #[test]
    fn test_duplicate_instance_names() {
        let mut unit = unit();
        unit.add_storage_block(
            StorageBlock::new(StorageKind::Instances).with(Declaration::new("tint", float(4))),
        );
        let values = RawOptionValueSet::from_iter([(IS_INSTANCED_OPTION, 1)]);
        let (_, diagnostics) = assign(&unit, &values, &fragment(Vec::new()));
        assert!(diagnostics.contains_code(DiagnosticCode::DuplicateInstanceVariable));
        assert!(diagnostics.has_error());
    }
}
