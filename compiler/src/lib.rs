//! Option-driven shader variant compiler.
//!
//! A shader declares options, and blocks whose presence depends on them.
//! Every combination of option values is a variant. This crate takes a parsed
//! [`TranslationUnit`](ast::TranslationUnit) and:
//!
//! - packs options into option bits and enumerates variants ([`options`])
//! - finds options that only change pipeline state ([`variance`])
//! - assigns locations and bindings per variant ([`layout`])
//! - renders GLSL and hands it to a downstream compiler ([`glsl`], [`downstream`])
//! - compiles single variants, reusing programs where possible ([`variant`])
//! - builds whole shader set files in parallel ([`batch`])
//!
//! The container format and the runtime-facing model live in `shaderset-shared`.

pub mod ast;
pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod downstream;
pub mod glsl;
pub mod layout;
pub mod options;
pub mod shader;
pub mod variance;
pub mod variant;

pub use batch::{BuildError, BuildSummary, ShaderSetBuilder, ShaderSource};
pub use config::{BuildConfig, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use downstream::{DownstreamCompiler, DownstreamOutput, SourceDownstreamCompiler};
pub use shader::ShaderCompiler;
pub use variant::VariantCompiler;

#[cfg(feature = "naga")]
pub use downstream::NagaDownstreamCompiler;
