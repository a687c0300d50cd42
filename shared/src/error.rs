//! Error types for the shader set container.

use std::io;

use crate::model::ShaderVariantKey;

/// Errors raised while decoding a shader set file
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid magic value {0:#010X} for shader set file")]
    InvalidMagic(u32),

    #[error("unsupported shader set version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid {kind} value {value}")]
    InvalidEnum { kind: &'static str, value: u8 },

    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("shader variant counts sum to {declared}, header declares {total}")]
    InconsistentVariantCount { declared: u64, total: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised by misuse of [`crate::ShaderSetWriter`] or I/O failure while writing
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("first variant was written, cannot add shaders anymore")]
    ShadersSealed,

    #[error("shader {0:08X} was not added to writer")]
    UnknownShader(u32),

    #[error("all {count} allocated variants for shader {hash:08X} were already written")]
    VariantSlotsExhausted { hash: u32, count: u32 },

    #[error("shader set exceeds 4 GiB offset range")]
    OffsetOverflow,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Lookup failures of [`crate::ShaderSet`] helpers
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("shader set does not contain shader named {0:?}")]
    ShaderName(String),

    #[error("shader set does not contain shader {0:08X}")]
    ShaderHash(u32),

    #[error("shader set does not contain source for shader {0:08X}")]
    Source(u32),

    #[error("shader set does not contain variant {0}")]
    Variant(ShaderVariantKey),

    #[error(transparent)]
    Format(#[from] FormatError),
}
