//! Compilation diagnostics.
//!
//! Problems in a shader source are reported as values, never as Rust errors.
//! Only `Error` and `Internal` severities fail a compilation.

use std::fmt;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// A bug in the compiler rather than in the source
    Internal,
}

impl Severity {
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Error | Severity::Internal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Internal => "internal error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Options
    VariantSpaceTooLarge,
    TooFewOptionValues,
    DuplicateOptionName,
    OptionNameIsValue,
    DuplicateNamedValue,
    SpecialOptionWithValues,
    InstancesBlockWithoutOption,
    // Conditions
    ConditionNotEvaluable,
    ConditionIsConstant,
    // Layout
    NonNumericVertexAttribute,
    NonNumericNorBindingUniform,
    UnsupportedBufferType,
    DuplicateInstanceVariable,
    InvalidColorOutput,
    // Variants
    NoStageBlock,
    MultipleStageBlocks,
    VariantStart,
    GeneratedSource,
    Downstream,
    Internal,
}

impl DiagnosticCode {
    /// Short stable identifier, e.g. `OPT003`
    pub fn id(self) -> &'static str {
        match self {
            DiagnosticCode::VariantSpaceTooLarge => "OPT001",
            DiagnosticCode::TooFewOptionValues => "OPT002",
            DiagnosticCode::DuplicateOptionName => "OPT003",
            DiagnosticCode::OptionNameIsValue => "OPT004",
            DiagnosticCode::DuplicateNamedValue => "OPT005",
            DiagnosticCode::SpecialOptionWithValues => "OPT006",
            DiagnosticCode::InstancesBlockWithoutOption => "OPT007",
            DiagnosticCode::ConditionNotEvaluable => "CND001",
            DiagnosticCode::ConditionIsConstant => "CND002",
            DiagnosticCode::NonNumericVertexAttribute => "LAY001",
            DiagnosticCode::NonNumericNorBindingUniform => "LAY002",
            DiagnosticCode::UnsupportedBufferType => "LAY003",
            DiagnosticCode::DuplicateInstanceVariable => "LAY004",
            DiagnosticCode::InvalidColorOutput => "LAY005",
            DiagnosticCode::NoStageBlock => "VAR001",
            DiagnosticCode::MultipleStageBlocks => "VAR002",
            DiagnosticCode::VariantStart => "VAR003",
            DiagnosticCode::GeneratedSource => "VAR004",
            DiagnosticCode::Downstream => "DSC001",
            DiagnosticCode::Internal => "INT001",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub file: Option<String>,
    pub span: Option<Span>,
    /// A second location, e.g. the earlier of two conflicting declarations
    pub related_span: Option<Span>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            file: None,
            span: None,
            related_span: None,
        }
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Severity::Internal, DiagnosticCode::Internal, message)
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn related_to(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.span) {
            (Some(file), Some(span)) => write!(f, "{file}:{span}: ")?,
            (Some(file), None) => write!(f, "{file}: ")?,
            (None, Some(span)) => write!(f, "{span}: ")?,
            (None, None) => {}
        }
        write!(f, "{} {}: {}", self.severity, self.code.id(), self.message)?;
        if let Some(related) = self.related_span {
            write!(f, " (see also {related})")?;
        }
        Ok(())
    }
}

/// An ordered list of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn append(&mut self, other: &mut Diagnostics) {
        self.items.append(&mut other.items);
    }

    pub fn has_error(&self) -> bool {
        self.items.iter().any(|d| d.severity.is_failure())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.severity.is_failure()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains_code(&self, code: DiagnosticCode) -> bool {
        self.items.iter().any(|d| d.code == code)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_errors_fail() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::info(DiagnosticCode::VariantStart, "start"));
        diagnostics.push(Diagnostic::warning(DiagnosticCode::ConditionIsConstant, "constant"));
        assert!(!diagnostics.has_error());
        diagnostics.push(Diagnostic::internal("boom"));
        assert!(diagnostics.has_error());
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::error(DiagnosticCode::NoStageBlock, "no vertex stage")
            .in_file("lit.shader")
            .at(Span::new(2, 4));
        assert_eq!(diagnostic.to_string(), "lit.shader:3:5: error VAR001: no vertex stage");
    }
}
