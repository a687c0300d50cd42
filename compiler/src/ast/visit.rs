//! Pre-order walks over expressions.
//!
//! Passes that only care about expressions (variable references, mostly)
//! share these instead of each re-matching every statement kind.

use super::{Declaration, Expr, ExprKind, Function, StageBlock, Statement, StorageBlock, Type};

pub fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::IntLiteral(_) | ExprKind::RealLiteral(_) | ExprKind::Variable(_) => {}
        ExprKind::Call {
            function,
            arguments,
        } => {
            walk_expr(function, f);
            for argument in arguments {
                walk_expr(argument, f);
            }
        }
        ExprKind::Index { array, index } => {
            walk_expr(array, f);
            walk_expr(index, f);
        }
        ExprKind::Member { parent, .. } => walk_expr(parent, f),
        ExprKind::PostUnary { operand, .. } | ExprKind::Unary { operand, .. } => {
            walk_expr(operand, f)
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        ExprKind::Conditional {
            condition,
            then,
            otherwise,
        } => {
            walk_expr(condition, f);
            walk_expr(then, f);
            walk_expr(otherwise, f);
        }
    }
}

/// Array size expressions are the only expressions inside types
pub fn walk_type<'a>(ty: &'a Type, f: &mut impl FnMut(&'a Expr)) {
    match ty {
        Type::Buffer(inner) => walk_type(inner, f),
        Type::Array { element, size } => {
            walk_type(element, f);
            if let Some(size) = size {
                walk_expr(size, f);
            }
        }
        Type::Numeric(_) | Type::Image(_) | Type::Sampler(_) | Type::Custom(_) => {}
    }
}

pub fn walk_declaration<'a>(declaration: &'a Declaration, f: &mut impl FnMut(&'a Expr)) {
    walk_type(&declaration.ty, f);
    if let Some(initializer) = &declaration.initializer {
        walk_expr(initializer, f);
    }
}

pub fn walk_statement<'a>(statement: &'a Statement, f: &mut impl FnMut(&'a Expr)) {
    match statement {
        Statement::Empty | Statement::DefaultLabel | Statement::Flow(_) => {}
        Statement::Declaration(declarations) => {
            for declaration in declarations {
                walk_declaration(declaration, f);
            }
        }
        Statement::Expression(expr) | Statement::CaseLabel(expr) => walk_expr(expr, f),
        Statement::Selection {
            condition,
            then,
            otherwise,
        } => {
            walk_expr(condition, f);
            walk_statement(then, f);
            if let Some(otherwise) = otherwise {
                walk_statement(otherwise, f);
            }
        }
        Statement::Switch { value, body } => {
            walk_expr(value, f);
            for statement in body {
                walk_statement(statement, f);
            }
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => {
            walk_statement(init, f);
            walk_expr(condition, f);
            if let Some(update) = update {
                walk_expr(update, f);
            }
            walk_statement(body, f);
        }
        Statement::While { condition, body } | Statement::DoWhile { body, condition } => {
            walk_expr(condition, f);
            walk_statement(body, f);
        }
        Statement::Return(value) => {
            if let Some(value) = value {
                walk_expr(value, f);
            }
        }
        Statement::Scope(body) => {
            for statement in body {
                walk_statement(statement, f);
            }
        }
    }
}

pub fn walk_function<'a>(function: &'a Function, f: &mut impl FnMut(&'a Expr)) {
    if let Some(return_type) = &function.return_type {
        walk_type(return_type, f);
    }
    for parameter in &function.parameters {
        walk_declaration(parameter, f);
    }
    if let Some(body) = &function.body {
        walk_statement(body, f);
    }
}

/// Condition, functions and statements of a stage block
pub fn walk_stage_block<'a>(block: &'a StageBlock, f: &mut impl FnMut(&'a Expr)) {
    if let Some(condition) = &block.condition {
        walk_expr(condition, f);
    }
    for function in &block.functions {
        walk_function(function, f);
    }
    for statement in &block.statements {
        walk_statement(statement, f);
    }
}

pub fn walk_storage_block<'a>(block: &'a StorageBlock, f: &mut impl FnMut(&'a Expr)) {
    if let Some(condition) = &block.condition {
        walk_expr(condition, f);
    }
    for declaration in &block.declarations {
        walk_declaration(declaration, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    #[test]
    fn test_walk_finds_nested_variables() {
        let statement = Statement::if_else(
            Expr::eq(Expr::var("Mode"), Expr::int(1)),
            Statement::Scope(vec![Statement::expr(Expr::assign(
                Expr::var("color"),
                Expr::call("texture", [Expr::var("albedo"), Expr::member(Expr::var("v"), "uv")]),
            ))]),
            Some(Statement::Return(Some(Expr::binary(
                BinaryOp::Mul,
                Expr::var("a"),
                Expr::index(Expr::var("b"), Expr::var("i")),
            )))),
        );
        let mut names = Vec::new();
        walk_statement(&statement, &mut |expr| names.extend(expr.as_variable()));
        assert_eq!(names, ["Mode", "color", "texture", "albedo", "v", "a", "b", "i"]);
    }
}
