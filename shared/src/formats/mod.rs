//! Binary formats
//!
//! All records are little-endian and length-prefixed, see [`serialization`].

pub mod serialization;
pub mod shader_set;

pub use serialization::BinarySerializable;

/// File extension for shader set containers
pub const SHADER_SET_EXT: &str = "shadercache";
