//! Variant identity and compiled variants.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{BindingInfo, NumericType, PipelineState};
use crate::error::FormatError;
use crate::formats::serialization::{
    BinarySerializable, read_bool, read_string, write_bool, write_string,
};

/// Stable identity of one variant of one shader source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderVariantKey {
    /// CRC32 of the raw source bytes
    pub source_hash: u32,
    pub option_bits: u32,
}

impl ShaderVariantKey {
    pub const fn new(source_hash: u32, option_bits: u32) -> Self {
        Self {
            source_hash,
            option_bits,
        }
    }

    /// The key with every program-invariant option bit cleared.
    ///
    /// Two variants with the same program-invariant key share compiled programs.
    /// Both program reuse during compilation and program deduplication in the
    /// container go through this function.
    pub const fn program_invariant(self, invariance_mask: u32) -> Self {
        Self::new(self.source_hash, self.option_bits & !invariance_mask)
    }
}

impl fmt::Display for ShaderVariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}_{:08X}", self.source_hash, self.option_bits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttributeInfo {
    /// First location, matrices occupy one location per column
    pub location: u32,
    pub name: String,
    pub ty: NumericType,
    pub is_instance: bool,
}

impl BinarySerializable for VertexAttributeInfo {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.location)?;
        write_string(writer, &self.name)?;
        write_bool(writer, self.is_instance)?;
        self.ty.write_to(writer)
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            location: reader.read_u32::<LittleEndian>()?,
            name: read_string(reader)?,
            is_instance: read_bool(reader)?,
            ty: NumericType::read_from(reader)?,
        })
    }
}

/// One fully compiled variant
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderVariant {
    pub key: ShaderVariantKey,
    pub pipeline_state: PipelineState,
    /// Sorted by location
    pub vertex_attributes: Vec<VertexAttributeInfo>,
    /// Number of bindings per descriptor set
    pub binding_set_sizes: Vec<u32>,
    /// Sorted by set and binding
    pub bindings: Vec<BindingInfo>,
    pub vertex_program: Arc<[u8]>,
    pub fragment_program: Arc<[u8]>,
}

impl ShaderVariant {
    /// Reuses this variant's programs and layout for a variant that only differs in pipeline state
    pub fn as_program_invariant(&self, key: ShaderVariantKey, pipeline_state: PipelineState) -> Self {
        Self {
            key,
            pipeline_state,
            vertex_attributes: self.vertex_attributes.clone(),
            binding_set_sizes: self.binding_set_sizes.clone(),
            bindings: self.bindings.clone(),
            vertex_program: Arc::clone(&self.vertex_program),
            fragment_program: Arc::clone(&self.fragment_program),
        }
    }

    pub fn shares_programs_with(&self, other: &ShaderVariant) -> bool {
        Arc::ptr_eq(&self.vertex_program, &other.vertex_program)
            && Arc::ptr_eq(&self.fragment_program, &other.fragment_program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ShaderVariantKey::new(0xDEADBEEF, 0x2A);
        assert_eq!(key.to_string(), "DEADBEEF_0000002A");
    }

    #[test]
    fn test_program_invariant_clears_masked_bits() {
        let key = ShaderVariantKey::new(1, 0b1011);
        assert_eq!(key.program_invariant(0b1000), ShaderVariantKey::new(1, 0b0011));
        assert_eq!(key.program_invariant(0), key);
    }

    #[test]
    fn test_program_invariant_copy_shares_bytes() {
        let base = ShaderVariant {
            key: ShaderVariantKey::new(1, 0),
            pipeline_state: PipelineState::default(),
            vertex_attributes: Vec::new(),
            binding_set_sizes: vec![0],
            bindings: Vec::new(),
            vertex_program: Arc::from(&b"vert"[..]),
            fragment_program: Arc::from(&b"frag"[..]),
        };
        let mut state = PipelineState::default();
        state.depth_write = false;
        let copy = base.as_program_invariant(ShaderVariantKey::new(1, 4), state.clone());
        assert!(copy.shares_programs_with(&base));
        assert_eq!(copy.pipeline_state, state);
        assert_eq!(copy.key.option_bits, 4);
    }
}
