use super::{Expr, Type};

/// A local variable, function parameter or storage block member
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ty: Type,
    pub initializer: Option<Expr>,
    pub span: super::Span,
}

impl Declaration {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            initializer: None,
            span: super::Span::default(),
        }
    }

    pub fn with_initializer(mut self, initializer: Expr) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn at(mut self, span: super::Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Break,
    Continue,
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Empty,
    /// One or more local declarations sharing the type of the first
    Declaration(Vec<Declaration>),
    Expression(Expr),
    Selection {
        condition: Expr,
        then: Box<Statement>,
        otherwise: Option<Box<Statement>>,
    },
    Switch {
        value: Expr,
        body: Vec<Statement>,
    },
    CaseLabel(Expr),
    DefaultLabel,
    For {
        init: Box<Statement>,
        condition: Expr,
        update: Option<Expr>,
        body: Box<Statement>,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expr,
    },
    Return(Option<Expr>),
    Flow(FlowKind),
    Scope(Vec<Statement>),
}

impl Statement {
    pub fn declare(declaration: Declaration) -> Self {
        Statement::Declaration(vec![declaration])
    }

    pub fn expr(expr: Expr) -> Self {
        Statement::Expression(expr)
    }

    pub fn if_else(condition: Expr, then: Statement, otherwise: Option<Statement>) -> Self {
        Statement::Selection {
            condition,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }
}
