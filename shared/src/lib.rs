//! Shared types for compiled shader variant sets.
//!
//! This crate is what a renderer links against: the model of a compiled
//! variant (pipeline state, vertex attributes, bindings, program bytes) and
//! the binary container that stores all variants of all shaders in one file.

pub mod error;
pub mod formats;
pub mod model;

pub use error::{FormatError, LookupError, WriterError};
pub use formats::shader_set::{FileShaderSet, ShaderSet, ShaderSetReader, ShaderSetWriter};
pub use model::*;
