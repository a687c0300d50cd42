//! Syntax tree of a shader source.
//!
//! The parser is not part of this crate. Callers build a [`TranslationUnit`]
//! either from their own front end or through the small builder methods here.
//! Nodes are plain data; passes match on them and never mutate them, anything
//! a pass derives (like layout slots) lives in side tables keyed by [`DeclId`].

mod expr;
mod stmt;
mod types;
mod visit;

pub use expr::*;
pub use stmt::*;
pub use types::*;
pub use visit::*;

use shaderset_shared::PartialPipelineState;

use crate::options::{OptionAccumulator, ShaderOption};

/// Zero-based position of a node in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Stable identity of a storage block member: block index and member index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId {
    pub block: u32,
    pub index: u32,
}

impl DeclId {
    pub const fn new(block: u32, index: u32) -> Self {
        Self { block, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Per-vertex inputs
    Attributes,
    /// Per-instance inputs, vertex attributes or a uniform block depending on `IsInstanced`
    Instances,
    Uniform,
    /// Vertex to fragment interpolants
    Varying,
}

impl StorageKind {
    pub fn keyword(self) -> &'static str {
        match self {
            StorageKind::Attributes => "attributes",
            StorageKind::Instances => "instances",
            StorageKind::Uniform => "uniform",
            StorageKind::Varying => "varying",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageBlock {
    pub kind: StorageKind,
    pub name: Option<String>,
    pub condition: Option<Expr>,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

impl StorageBlock {
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            name: None,
            condition: None,
            declarations: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn when(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    fn generated_name(&self) -> String {
        format!("block_{}_{}", self.span.line + 1, self.span.column + 1)
    }

    /// Block name used in generated code
    pub fn glsl_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.generated_name())
    }

    /// Block name exposed in reflection data. A lone unnamed member names its block.
    pub fn reflection_name(&self) -> String {
        match (&self.name, self.declarations.as_slice()) {
            (Some(name), _) => name.clone(),
            (None, [single]) => single.name.clone(),
            (None, _) => self.generated_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// `None` for `void`
    pub return_type: Option<Type>,
    pub parameters: Vec<Declaration>,
    pub body: Option<Statement>,
    pub span: Span,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: Option<Type>) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            body: None,
            span: Span::default(),
        }
    }

    pub fn with_parameter(mut self, parameter: Declaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_body(mut self, statements: Vec<Statement>) -> Self {
        self.body = Some(Statement::Scope(statements));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageBlock {
    pub stage: ShaderStage,
    pub condition: Option<Expr>,
    pub functions: Vec<Function>,
    /// Body of the generated `main`
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl StageBlock {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            condition: None,
            functions: Vec::new(),
            statements: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn when(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_statements(mut self, statements: impl IntoIterator<Item = Statement>) -> Self {
        self.statements.extend(statements);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineBlock {
    pub condition: Option<Expr>,
    pub state: PartialPipelineState,
    pub span: Span,
}

impl PipelineBlock {
    pub fn new(state: PartialPipelineState) -> Self {
        Self {
            condition: None,
            state,
            span: Span::default(),
        }
    }

    pub fn when(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalBlock {
    Storage(StorageBlock),
    Stage(StageBlock),
    Pipeline(PipelineBlock),
    Function(Function),
}

/// A whole parsed shader source
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    options: Vec<ShaderOption>,
    blocks: Vec<GlobalBlock>,
    accumulator: OptionAccumulator,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next option, packing it after all previous ones.
    /// An empty `named_values` declares a boolean option.
    pub fn add_option<I, S>(&mut self, name: impl Into<String>, named_values: I) -> &ShaderOption
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_option_at(name, named_values, Span::default())
    }

    pub fn add_option_at<I, S>(
        &mut self,
        name: impl Into<String>,
        named_values: I,
        span: Span,
    ) -> &ShaderOption
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let named_values = named_values.into_iter().map(Into::into).collect();
        let option = self.accumulator.declare(name.into(), named_values, span);
        self.options.push(option);
        &self.options[self.options.len() - 1]
    }

    pub fn add_block(&mut self, block: GlobalBlock) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    pub fn add_storage_block(&mut self, block: StorageBlock) -> usize {
        self.add_block(GlobalBlock::Storage(block))
    }

    pub fn add_stage_block(&mut self, block: StageBlock) -> usize {
        self.add_block(GlobalBlock::Stage(block))
    }

    pub fn add_pipeline_block(&mut self, block: PipelineBlock) -> usize {
        self.add_block(GlobalBlock::Pipeline(block))
    }

    pub fn add_function(&mut self, function: Function) -> usize {
        self.add_block(GlobalBlock::Function(function))
    }

    pub fn options(&self) -> &[ShaderOption] {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut [ShaderOption] {
        &mut self.options
    }

    pub fn option(&self, name: &str) -> Option<&ShaderOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Total number of option bits in use
    pub fn option_bit_count(&self) -> u32 {
        self.accumulator.bit_count()
    }

    pub fn blocks(&self) -> &[GlobalBlock] {
        &self.blocks
    }

    /// Storage blocks with their block index
    pub fn storage_blocks(&self) -> impl Iterator<Item = (usize, &StorageBlock)> {
        self.blocks.iter().enumerate().filter_map(|(i, b)| match b {
            GlobalBlock::Storage(block) => Some((i, block)),
            _ => None,
        })
    }

    pub fn stage_blocks(&self) -> impl Iterator<Item = &StageBlock> {
        self.blocks.iter().filter_map(|b| match b {
            GlobalBlock::Stage(block) => Some(block),
            _ => None,
        })
    }

    pub fn pipeline_blocks(&self) -> impl Iterator<Item = &PipelineBlock> {
        self.blocks.iter().filter_map(|b| match b {
            GlobalBlock::Pipeline(block) => Some(block),
            _ => None,
        })
    }

    /// Free functions, shared by all stages
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.blocks.iter().filter_map(|b| match b {
            GlobalBlock::Function(function) => Some(function),
            _ => None,
        })
    }

    /// Conditions of every conditional block, in block order
    pub fn block_conditions(&self) -> impl Iterator<Item = &Expr> {
        self.blocks.iter().filter_map(|b| match b {
            GlobalBlock::Storage(block) => block.condition.as_ref(),
            GlobalBlock::Stage(block) => block.condition.as_ref(),
            GlobalBlock::Pipeline(block) => block.condition.as_ref(),
            GlobalBlock::Function(_) => None,
        })
    }

    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        match self.blocks.get(id.block as usize)? {
            GlobalBlock::Storage(block) => block.declarations.get(id.index as usize),
            _ => None,
        }
    }

    /// Members of one storage block paired with their ids
    pub fn declarations_of(&self, block_index: usize) -> impl Iterator<Item = (DeclId, &Declaration)> {
        let declarations: &[Declaration] = match self.blocks.get(block_index) {
            Some(GlobalBlock::Storage(block)) => block.declarations.as_slice(),
            _ => &[],
        };
        declarations
            .iter()
            .enumerate()
            .map(move |(i, d)| (DeclId::new(block_index as u32, i as u32), d))
    }

    pub fn has_storage_kind(&self, kind: StorageKind) -> bool {
        self.storage_blocks().any(|(_, b)| b.kind == kind)
    }
}
