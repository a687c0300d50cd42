//! GLSL source generation for one stage of one variant.
//!
//! [`GlslRenderer`] is the seam between the variant pipeline and whatever
//! turns a laid-out unit into stage source. [`GlslWriter`] is the built-in
//! implementation targeting Vulkan GLSL 4.50.

use std::fmt::{self, Write as FmtWrite};

use shaderset_shared::{PipelineState, SamplerType};

use crate::ast::{
    DeclId, Declaration, Expr, ExprKind, FlowKind, Function, ShaderStage, StageBlock, Statement,
    StorageBlock, StorageKind, TranslationUnit, Type, evaluate_condition,
};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::layout::{INSTANCE_VARYING_PREFIX, Layout, is_instanced};
use crate::options::OptionValueSet;

const INDENT: &str = "    ";

/// Everything a renderer needs to generate one stage
pub struct StageInput<'a> {
    pub unit: &'a TranslationUnit,
    pub stage: &'a StageBlock,
    pub layout: &'a Layout,
    pub pipeline: &'a PipelineState,
    /// Resolves options and named values, see [`FilteredOptionValueSet`](crate::options::FilteredOptionValueSet)
    pub values: &'a dyn OptionValueSet,
}

pub trait GlslRenderer: Send + Sync {
    /// Generates the stage source, or `None` after reporting why it cannot
    fn render(&self, input: &StageInput<'_>, diagnostics: &mut Diagnostics) -> Option<String>;
}

/// Default renderer writing `#version 450` GLSL
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslWriter;

impl GlslRenderer for GlslWriter {
    fn render(&self, input: &StageInput<'_>, diagnostics: &mut Diagnostics) -> Option<String> {
        let mut emitter = Emitter {
            input,
            out: String::new(),
            indent: 0,
            diagnostics: Diagnostics::new(),
        };
        let result = emitter.write_unit();
        let failed = emitter.diagnostics.has_error();
        diagnostics.extend(emitter.diagnostics);
        match result {
            Ok(()) if !failed => Some(emitter.out),
            Ok(()) => None,
            Err(fmt::Error) => {
                diagnostics.push(Diagnostic::internal("formatting generated source failed"));
                None
            }
        }
    }
}

struct Emitter<'i, 'a> {
    input: &'i StageInput<'a>,
    out: String,
    indent: usize,
    diagnostics: Diagnostics,
}

impl Emitter<'_, '_> {
    fn stage(&self) -> ShaderStage {
        self.input.stage.stage
    }

    fn write_unit(&mut self) -> fmt::Result {
        writeln!(self.out, "#version 450")?;
        writeln!(self.out, "#extension GL_EXT_scalar_block_layout : require")?;
        writeln!(self.out)?;

        let unit = self.input.unit;
        for (block_index, block) in unit.storage_blocks() {
            if evaluate_condition(block.condition.as_ref(), self.input.values) == Some(true) {
                self.write_storage_block(block_index, block)?;
            }
        }
        if self.stage() == ShaderStage::Fragment {
            self.write_color_outputs()?;
        }

        let stage = self.input.stage;
        for function in unit.functions().chain(&stage.functions) {
            self.write_function(function)?;
        }
        self.write_main()
    }

    // =========================================================================
    // Storage
    // =========================================================================

    fn write_storage_block(&mut self, block_index: usize, block: &StorageBlock) -> fmt::Result {
        let instanced = is_instanced(self.input.values);
        match (block.kind, self.stage()) {
            (StorageKind::Attributes, ShaderStage::Vertex) => self.write_location_block(block_index, "in"),
            (StorageKind::Attributes, ShaderStage::Fragment) => Ok(()),
            (StorageKind::Varying, ShaderStage::Vertex) => self.write_location_block(block_index, "out"),
            (StorageKind::Varying, ShaderStage::Fragment) => self.write_location_block(block_index, "in"),
            (StorageKind::Instances, ShaderStage::Vertex) if instanced => {
                self.write_location_block(block_index, "in")?;
                self.write_transferred(block_index, "flat out", INSTANCE_VARYING_PREFIX)
            }
            (StorageKind::Instances, ShaderStage::Fragment) if instanced => {
                self.write_transferred(block_index, "flat in", "")
            }
            (StorageKind::Uniform | StorageKind::Instances, _) => self.write_uniform_block(block_index, block),
        }
    }

    fn write_location_block(&mut self, block_index: usize, qualifier: &str) -> fmt::Result {
        let unit = self.input.unit;
        for (id, declaration) in unit.declarations_of(block_index) {
            let Some(location) = self.input.layout.info(id).in_location else {
                continue;
            };
            write!(self.out, "layout(location = {location}) {qualifier} ")?;
            self.write_member(declaration, "")?;
        }
        writeln!(self.out)
    }

    fn write_transferred(&mut self, block_index: usize, qualifier: &str, prefix: &str) -> fmt::Result {
        let (unit, layout) = (self.input.unit, self.input.layout);
        for (id, declaration) in unit.declarations_of(block_index) {
            if !layout.is_transferred(id) {
                continue;
            }
            let Some(location) = layout.info(id).out_location else {
                continue;
            };
            write!(self.out, "layout(location = {location}) {qualifier} ")?;
            self.write_member(declaration, prefix)?;
        }
        writeln!(self.out)
    }

    fn write_uniform_block(&mut self, block_index: usize, block: &StorageBlock) -> fmt::Result {
        let (unit, layout) = (self.input.unit, self.input.layout);
        let mut structure = Vec::new();
        for (id, declaration) in unit.declarations_of(block_index) {
            let info = layout.info(id);
            let (Some(set), Some(binding)) = (info.set, info.binding) else {
                continue;
            };
            match &declaration.ty {
                Type::Buffer(inner) => {
                    let declarator = self.declarator(inner, &declaration.name, "")?;
                    writeln!(
                        self.out,
                        "layout(std430, set = {set}, binding = {binding}) buffer buffer_{}_{} {{ {declarator}; }};",
                        declaration.span.line + 1,
                        declaration.span.column + 1,
                    )?;
                }
                ty if ty.is_binding_type() => {
                    write!(self.out, "layout(set = {set}, binding = {binding}) uniform ")?;
                    self.write_member(declaration, "")?;
                }
                _ => structure.push((set, binding, declaration)),
            }
        }

        if let Some(&(set, binding, _)) = structure.first() {
            writeln!(
                self.out,
                "layout(std430, set = {set}, binding = {binding}) uniform {} {{",
                block.glsl_name()
            )?;
            for (_, _, declaration) in structure {
                self.out.push_str(INDENT);
                self.write_member(declaration, "")?;
            }
            writeln!(self.out, "}};")?;
        }
        writeln!(self.out)
    }

    fn write_color_outputs(&mut self) -> fmt::Result {
        let pipeline = self.input.pipeline;
        for (index, output) in pipeline.color_outputs.iter().enumerate() {
            if output.format.is_depth_only() {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::InvalidColorOutput,
                    format!(
                        "color output `{}` cannot use the depth format {:?}",
                        output.name, output.format
                    ),
                ));
                continue;
            }
            let ty = self.numeric_name(output.format.numeric_type());
            writeln!(self.out, "layout(location = {index}) out {ty} {};", output.name)?;
        }
        writeln!(self.out)
    }

    /// `T name[N];` for a storage block member, initializers are not allowed there
    fn write_member(&mut self, declaration: &Declaration, prefix: &str) -> fmt::Result {
        let declarator = self.declarator(&declaration.ty, &declaration.name, prefix)?;
        writeln!(self.out, "{declarator};")
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn numeric_name(&mut self, ty: shaderset_shared::NumericType) -> String {
        ty.glsl_name().unwrap_or_else(|| {
            self.diagnostics
                .push(Diagnostic::internal(format!("numeric type {ty:?} has no GLSL equivalent")));
            "float".to_string()
        })
    }

    /// The type name, without array suffixes
    fn type_name(&mut self, ty: &Type) -> String {
        match ty {
            Type::Numeric(numeric) => self.numeric_name(*numeric),
            Type::Image(image) => image.glsl_name(),
            Type::Sampler(_) => SamplerType::GLSL_NAME.to_string(),
            Type::Array { element, .. } | Type::Buffer(element) => self.type_name(element),
            Type::Custom(name) => name.clone(),
        }
    }

    /// `T prefixname[N]`, array sizes move behind the name
    fn declarator(&mut self, ty: &Type, name: &str, prefix: &str) -> Result<String, fmt::Error> {
        let mut declarator = format!("{} {prefix}{name}", self.type_name(ty));
        self.write_array_suffix(&mut declarator, ty)?;
        Ok(declarator)
    }

    fn write_array_suffix(&self, out: &mut String, ty: &Type) -> fmt::Result {
        let mut ty = ty;
        while let Type::Array { element, size } = ty {
            out.push('[');
            if let Some(size) = size {
                write_expr(out, size)?;
            }
            out.push(']');
            ty = element;
        }
        Ok(())
    }

    // =========================================================================
    // Functions and statements
    // =========================================================================

    fn write_function(&mut self, function: &Function) -> fmt::Result {
        let return_type = match &function.return_type {
            Some(ty) => self.type_name(ty),
            None => "void".to_string(),
        };
        write!(self.out, "{return_type} {}(", function.name)?;
        for (i, parameter) in function.parameters.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let declarator = self.declarator(&parameter.ty, &parameter.name, "")?;
            self.out.push_str(&declarator);
        }
        self.out.push(')');
        match &function.body {
            Some(body) => {
                self.write_body(body)?;
                writeln!(self.out)?;
            }
            None => writeln!(self.out, ";")?,
        }
        writeln!(self.out)
    }

    fn write_main(&mut self) -> fmt::Result {
        writeln!(self.out, "void main() {{")?;
        self.indent += 1;

        let layout = self.input.layout;
        if self.stage() == ShaderStage::Vertex && !layout.transferred.is_empty() {
            for &id in &layout.transferred {
                self.write_transfer(id)?;
            }
            writeln!(self.out)?;
        }
        let stage = self.input.stage;
        for statement in &stage.statements {
            self.write_statement(statement)?;
        }

        self.indent -= 1;
        writeln!(self.out, "}}")
    }

    fn write_transfer(&mut self, id: DeclId) -> fmt::Result {
        let Some(declaration) = self.input.unit.declaration(id) else {
            return Ok(());
        };
        self.write_indent();
        writeln!(
            self.out,
            "{INSTANCE_VARYING_PREFIX}{name} = {name};",
            name = declaration.name
        )
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    /// Writes a loop or function body starting on the current line
    fn write_body(&mut self, body: &Statement) -> fmt::Result {
        if let Statement::Scope(statements) = body {
            writeln!(self.out, " {{")?;
            self.write_block(statements)?;
            self.write_indent();
            self.out.push('}');
            Ok(())
        } else {
            writeln!(self.out)?;
            self.indent += 1;
            let result = self.write_statement_inline_end(body);
            self.indent -= 1;
            result
        }
    }

    fn write_block(&mut self, statements: &[Statement]) -> fmt::Result {
        self.indent += 1;
        for statement in statements {
            self.write_statement(statement)?;
        }
        self.indent -= 1;
        Ok(())
    }

    /// Like [`write_statement`](Self::write_statement) without the final newline
    fn write_statement_inline_end(&mut self, statement: &Statement) -> fmt::Result {
        let start = self.out.len();
        self.write_statement(statement)?;
        if self.out.len() == start {
            // A folded branch left nothing behind
            self.write_indent();
            self.out.push(';');
        } else if self.out.ends_with('\n') {
            self.out.pop();
        }
        Ok(())
    }

    fn write_statement(&mut self, statement: &Statement) -> fmt::Result {
        match statement {
            Statement::Selection {
                condition,
                then,
                otherwise,
            } => {
                // Option-constant branches are resolved here
                if let Some(value) = condition.try_evaluate(self.input.values) {
                    return match (value != 0, otherwise) {
                        (true, _) => self.write_statement(then),
                        (false, Some(otherwise)) => self.write_statement(otherwise),
                        (false, None) => Ok(()),
                    };
                }
                self.write_indent();
                self.out.push_str("if (");
                write_expr(&mut self.out, condition)?;
                self.out.push(')');
                self.write_body(then)?;
                if let Some(otherwise) = otherwise {
                    self.out.push_str(" else");
                    self.write_body(otherwise)?;
                }
                writeln!(self.out)
            }
            Statement::Switch { value, body } => {
                self.write_indent();
                self.out.push_str("switch (");
                write_expr(&mut self.out, value)?;
                writeln!(self.out, ") {{")?;
                self.write_block(body)?;
                self.write_indent();
                writeln!(self.out, "}}")
            }
            Statement::CaseLabel(value) => {
                self.indent = self.indent.saturating_sub(1);
                self.write_indent();
                self.indent += 1;
                self.out.push_str("case ");
                write_expr(&mut self.out, value)?;
                writeln!(self.out, ":")
            }
            Statement::DefaultLabel => {
                self.indent = self.indent.saturating_sub(1);
                self.write_indent();
                self.indent += 1;
                writeln!(self.out, "default:")
            }
            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                self.write_indent();
                self.out.push_str("for (");
                self.write_simple_statement(init)?;
                self.out.push_str("; ");
                write_expr(&mut self.out, condition)?;
                self.out.push_str("; ");
                if let Some(update) = update {
                    write_expr(&mut self.out, update)?;
                }
                self.out.push(')');
                self.write_body(body)?;
                writeln!(self.out)
            }
            Statement::While { condition, body } => {
                self.write_indent();
                self.out.push_str("while (");
                write_expr(&mut self.out, condition)?;
                self.out.push(')');
                self.write_body(body)?;
                writeln!(self.out)
            }
            Statement::DoWhile { body, condition } => {
                self.write_indent();
                self.out.push_str("do");
                self.write_body(body)?;
                self.out.push_str(" while (");
                write_expr(&mut self.out, condition)?;
                writeln!(self.out, ");")
            }
            Statement::Scope(statements) => {
                self.write_indent();
                writeln!(self.out, "{{")?;
                self.write_block(statements)?;
                self.write_indent();
                writeln!(self.out, "}}")
            }
            Statement::Return(value) => {
                self.write_indent();
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    write_expr(&mut self.out, value)?;
                }
                writeln!(self.out, ";")
            }
            Statement::Flow(flow) => {
                self.write_indent();
                writeln!(
                    self.out,
                    "{};",
                    match flow {
                        FlowKind::Break => "break",
                        FlowKind::Continue => "continue",
                        FlowKind::Discard => "discard",
                    }
                )
            }
            Statement::Empty | Statement::Declaration(_) | Statement::Expression(_) => {
                self.write_indent();
                self.write_simple_statement(statement)?;
                writeln!(self.out, ";")
            }
        }
    }

    /// Statements allowed as a `for` initializer, without the semicolon
    fn write_simple_statement(&mut self, statement: &Statement) -> fmt::Result {
        match statement {
            Statement::Empty => Ok(()),
            Statement::Expression(expr) => write_expr(&mut self.out, expr),
            Statement::Declaration(declarations) => {
                let Some(first) = declarations.first() else {
                    return Ok(());
                };
                let ty = self.type_name(&first.ty);
                write!(self.out, "{ty} ")?;
                for (i, declaration) in declarations.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&declaration.name);
                    let mut suffix = String::new();
                    self.write_array_suffix(&mut suffix, &declaration.ty)?;
                    self.out.push_str(&suffix);
                    if let Some(initializer) = &declaration.initializer {
                        self.out.push_str(" = ");
                        write_operand(&mut self.out, initializer, crate::ast::BinaryOp::Comma.precedence(), true)?;
                    }
                }
                Ok(())
            }
            _ => {
                self.diagnostics.push(Diagnostic::internal(
                    "only declarations and expressions can initialize a loop",
                ));
                Ok(())
            }
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Writes `expr` in GLSL syntax with the minimal parentheses
pub fn write_expr(out: &mut String, expr: &Expr) -> fmt::Result {
    match &expr.kind {
        ExprKind::IntLiteral(value) => write!(out, "{value}"),
        // Debug keeps the decimal point on whole numbers
        ExprKind::RealLiteral(value) => write!(out, "{value:?}"),
        ExprKind::Variable(name) => write!(out, "{name}"),
        ExprKind::Call {
            function,
            arguments,
        } => {
            write_operand(out, function, expr.precedence(), false)?;
            out.push('(');
            for (i, argument) in arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_operand(out, argument, crate::ast::BinaryOp::Comma.precedence(), true)?;
            }
            out.push(')');
            Ok(())
        }
        ExprKind::Index { array, index } => {
            write_operand(out, array, expr.precedence(), false)?;
            out.push('[');
            write_expr(out, index)?;
            out.push(']');
            Ok(())
        }
        ExprKind::Member { parent, member } => {
            write_operand(out, parent, expr.precedence(), false)?;
            write!(out, ".{member}")
        }
        ExprKind::PostUnary { op, operand } => {
            write_operand(out, operand, expr.precedence(), false)?;
            out.push_str(op.symbol());
            Ok(())
        }
        ExprKind::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_operand(out, operand, expr.precedence(), false)
        }
        ExprKind::Binary { op, left, right } => {
            write_operand(out, left, op.precedence(), false)?;
            match op {
                crate::ast::BinaryOp::Comma => out.push_str(", "),
                _ => write!(out, " {} ", op.symbol())?,
            }
            write_operand(out, right, op.precedence(), true)
        }
        ExprKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            write_operand(out, condition, expr.precedence(), true)?;
            out.push_str(" ? ");
            write_operand(out, then, expr.precedence(), false)?;
            out.push_str(" : ");
            write_operand(out, otherwise, expr.precedence(), false)
        }
    }
}

/// Parenthesizes `child` if it binds looser than its parent. Right-hand
/// operands also need parentheses at equal precedence.
fn write_operand(out: &mut String, child: &Expr, parent_precedence: i32, is_right: bool) -> fmt::Result {
    let child_precedence = child.precedence();
    let parenthesize = if is_right {
        child_precedence >= parent_precedence
    } else {
        child_precedence > parent_precedence
    };
    if parenthesize {
        out.push('(');
        write_expr(out, child)?;
        out.push(')');
        Ok(())
    } else {
        write_expr(out, child)
    }
}
