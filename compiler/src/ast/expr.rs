//! Expressions and their compile-time evaluation against option values.

use super::Span;
use crate::options::OptionValueSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical not, `!x`
    Not,
    Negate,
    Plus,
    BitNot,
    PreIncrement,
    PreDecrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::PreIncrement => "++",
            UnaryOp::PreDecrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostUnaryOp {
    Increment,
    Decrement,
}

impl PostUnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PostUnaryOp::Increment => "++",
            PostUnaryOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Eq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Comma,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEq => "<=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalXor => "^^",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::Comma => ",",
        }
    }

    /// Binding strength, lower binds tighter
    pub fn precedence(self) -> i32 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 0,
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Shl | BinaryOp::Shr => 2,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq => 3,
            BinaryOp::Eq | BinaryOp::NotEq => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitOr => 7,
            BinaryOp::LogicalAnd => 8,
            BinaryOp::LogicalXor => 9,
            BinaryOp::LogicalOr => 10,
            BinaryOp::Assign
            | BinaryOp::AddAssign
            | BinaryOp::SubAssign
            | BinaryOp::MulAssign
            | BinaryOp::DivAssign => 11,
            BinaryOp::Comma => 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(i64),
    RealLiteral(f64),
    Variable(String),
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        parent: Box<Expr>,
        member: String,
    },
    PostUnary {
        op: PostUnaryOp,
        operand: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLiteral(value))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ExprKind::RealLiteral(value))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Variable(name.into()))
    }

    pub fn not(operand: Expr) -> Self {
        Self::unary(UnaryOp::Not, operand)
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::binary(BinaryOp::Assign, target, value)
    }

    pub fn call(function: impl Into<String>, arguments: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(ExprKind::Call {
            function: Box::new(Self::var(function)),
            arguments: arguments.into_iter().collect(),
        })
    }

    pub fn member(parent: Expr, member: impl Into<String>) -> Self {
        Self::new(ExprKind::Member {
            parent: Box::new(parent),
            member: member.into(),
        })
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        Self::new(ExprKind::Index {
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// The variable name if this is a bare variable reference
    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Binding strength used to decide on parentheses when rendering
    pub fn precedence(&self) -> i32 {
        match &self.kind {
            ExprKind::IntLiteral(_) | ExprKind::RealLiteral(_) | ExprKind::Variable(_) => -3,
            ExprKind::Call { .. }
            | ExprKind::Index { .. }
            | ExprKind::Member { .. }
            | ExprKind::PostUnary { .. } => -2,
            ExprKind::Unary { .. } => -1,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Conditional { .. } => 20,
        }
    }

    /// Evaluates the expression if it only depends on option values.
    ///
    /// Only literals, logical not, comparisons and logical connectives are
    /// evaluated. Arithmetic on options is rejected on purpose, conditions
    /// should read as plain predicates over option values.
    pub fn try_evaluate(&self, values: &dyn OptionValueSet) -> Option<i64> {
        match &self.kind {
            ExprKind::IntLiteral(value) => Some(*value),
            ExprKind::Variable(name) => values.try_get_value(name).map(i64::from),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => operand.try_evaluate(values).map(|v| (v == 0) as i64),
            ExprKind::Binary { op, left, right } => {
                let left = left.try_evaluate(values)?;
                let right = right.try_evaluate(values)?;
                let result = match op {
                    BinaryOp::Less => left < right,
                    BinaryOp::Greater => left > right,
                    BinaryOp::LessEq => left <= right,
                    BinaryOp::GreaterEq => left >= right,
                    BinaryOp::Eq => left == right,
                    BinaryOp::NotEq => left != right,
                    BinaryOp::LogicalAnd => left != 0 && right != 0,
                    BinaryOp::LogicalOr => left != 0 || right != 0,
                    BinaryOp::LogicalXor => (left != 0) ^ (right != 0),
                    _ => return None,
                };
                Some(result as i64)
            }
            _ => None,
        }
    }
}

/// Evaluates an optional block condition, an absent condition always holds
pub fn evaluate_condition(condition: Option<&Expr>, values: &dyn OptionValueSet) -> Option<bool> {
    match condition {
        None => Some(true),
        Some(condition) => condition.try_evaluate(values).map(|v| v != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RawOptionValueSet;

    fn values() -> RawOptionValueSet {
        RawOptionValueSet::from_iter([("Mode", 2), ("Skinned", 1)])
    }

    #[test]
    fn test_comparisons_and_connectives() {
        let values = values();
        let expr = Expr::binary(
            BinaryOp::LogicalAnd,
            Expr::eq(Expr::var("Mode"), Expr::int(2)),
            Expr::var("Skinned"),
        );
        assert_eq!(expr.try_evaluate(&values), Some(1));

        let expr = Expr::binary(BinaryOp::LogicalXor, Expr::var("Skinned"), Expr::int(1));
        assert_eq!(expr.try_evaluate(&values), Some(0));

        let expr = Expr::not(Expr::binary(BinaryOp::Less, Expr::var("Mode"), Expr::int(1)));
        assert_eq!(expr.try_evaluate(&values), Some(1));
    }

    #[test]
    fn test_arithmetic_is_not_evaluable() {
        let values = values();
        let expr = Expr::binary(BinaryOp::Add, Expr::var("Mode"), Expr::int(1));
        assert_eq!(expr.try_evaluate(&values), None);
        assert_eq!(Expr::unary(UnaryOp::Negate, Expr::int(1)).try_evaluate(&values), None);
        assert_eq!(
            Expr::conditional(Expr::int(1), Expr::int(1), Expr::int(0)).try_evaluate(&values),
            None
        );
    }

    #[test]
    fn test_unknown_variables_are_not_evaluable() {
        let values = values();
        let expr = Expr::eq(Expr::var("uv"), Expr::int(0));
        assert_eq!(expr.try_evaluate(&values), None);
        assert_eq!(Expr::call("max", [Expr::int(1), Expr::int(2)]).try_evaluate(&values), None);
    }

    #[test]
    fn test_absent_condition_holds() {
        assert_eq!(evaluate_condition(None, &values()), Some(true));
        assert_eq!(evaluate_condition(Some(&Expr::int(0)), &values()), Some(false));
    }
}
