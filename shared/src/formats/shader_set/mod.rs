//! Shader set container
//!
//! Stores every compiled variant of every shader of a project in one file.
//! Variants of one shader are indexed by option bits, sorted so a lookup is a
//! binary search. Variants that only differ in program-invariant options point
//! at the same program block, so each distinct program is stored once.
//!
//! # File layout
//!
//! ```text
//! Header:
//!   magic:u32 ("SSET"), version:u32, shader_count:u32, total_variant_count:u32
//! Per shader:
//!   ShaderInfo, variant_count:u32, name:string, source:string ("" = absent)
//! Variant index (total_variant_count entries, sorted by option_bits per shader):
//!   option_bits:u32, offset:u32            (unused slots are 0xFFFFFFFF, 0xFFFFFFFF)
//! Variant body (at offset, relative to the end of the index):
//!   PipelineState, [VertexAttributeInfo], [binding_set_size:i32], [BindingInfo],
//!   program_offset:u32
//! Program block (at program_offset, written by the first variant using it):
//!   vertex_len:i32, vertex bytes, fragment_len:i32, fragment bytes
//! ```

mod file_set;
mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use file_set::{FileShaderSet, ShaderSet};
pub use reader::ShaderSetReader;
pub use writer::ShaderSetWriter;

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::FormatError;
use crate::formats::serialization::{BinarySerializable, read_array, write_array};
use crate::model::{BindingInfo, PipelineState, ShaderInfo, VertexAttributeInfo};

/// "SSET" read as a little-endian u32
pub const MAGIC: u32 = u32::from_le_bytes(*b"SSET");

pub const VERSION: u32 = 1;

/// One entry of the variant index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantHeader {
    pub option_bits: u32,
    pub offset: u32,
}

impl VariantHeader {
    pub const SIZE: usize = 8;

    /// Placeholder for a slot that was never written
    pub const UNUSED: Self = Self {
        option_bits: u32::MAX,
        offset: u32::MAX,
    };

    pub fn is_unused(&self) -> bool {
        *self == Self::UNUSED
    }
}

/// A shader entry of the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderHeader {
    pub info: ShaderInfo,
    pub name: String,
    pub source: Option<String>,
    /// Index of the first entry of this shader in the variant index
    pub variant_start: usize,
    pub variant_count: u32,
}

impl ShaderHeader {
    fn variant_range(&self) -> std::ops::Range<usize> {
        self.variant_start..self.variant_start + self.variant_count as usize
    }
}

/// Everything of a variant body except the program offset
struct VariantBody {
    pipeline_state: PipelineState,
    vertex_attributes: Vec<VertexAttributeInfo>,
    binding_set_sizes: Vec<u32>,
    bindings: Vec<BindingInfo>,
}

impl VariantBody {
    fn write_parts<W: Write>(
        writer: &mut W,
        pipeline_state: &PipelineState,
        vertex_attributes: &[VertexAttributeInfo],
        binding_set_sizes: &[u32],
        bindings: &[BindingInfo],
    ) -> io::Result<()> {
        pipeline_state.write_to(writer)?;
        write_array(writer, vertex_attributes, |w, attribute| attribute.write_to(w))?;
        write_array(writer, binding_set_sizes, |w, &size| {
            let size =
                i32::try_from(size).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            w.write_i32::<LittleEndian>(size)
        })?;
        write_array(writer, bindings, |w, binding| binding.write_to(w))
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            pipeline_state: PipelineState::read_from(reader)?,
            vertex_attributes: read_array(reader, VertexAttributeInfo::read_from)?,
            binding_set_sizes: read_array(reader, |r| {
                let size = r.read_i32::<LittleEndian>()?;
                u32::try_from(size)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
            })?,
            bindings: read_array(reader, BindingInfo::read_from)?,
        })
    }
}
