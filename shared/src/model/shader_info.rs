//! Per-shader metadata stored in the container header.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashbrown::HashMap;

use super::ShaderVariantKey;
use crate::error::FormatError;
use crate::formats::serialization::{
    BinarySerializable, read_array, read_string, read_string_array, write_array, write_string,
    write_string_array,
};

/// Number of bits needed to store `value_count` distinct values
pub fn bit_count_for(value_count: u32) -> u32 {
    if value_count <= 1 {
        0
    } else {
        u32::BITS - (value_count - 1).leading_zeros()
    }
}

/// An option as persisted: boolean when it has no named values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionInfo {
    pub name: String,
    pub named_values: Vec<String>,
}

impl OptionInfo {
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named_values: Vec::new(),
        }
    }

    pub fn enumerated<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            named_values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.named_values.is_empty()
    }

    pub fn value_count(&self) -> u32 {
        if self.is_boolean() {
            2
        } else {
            self.named_values.len() as u32
        }
    }

    pub fn bit_count(&self) -> u32 {
        bit_count_for(self.value_count())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub source_hash: u32,
    /// Option bits that never change the compiled programs
    pub program_invariance_mask: u32,
    pub options: Vec<OptionInfo>,
    pub vertex_attributes: Vec<String>,
    pub instance_attributes: Vec<String>,
    pub bindings: Vec<String>,
}

impl ShaderInfo {
    /// Options paired with their bit offset, in packing order
    pub fn option_fields(&self) -> impl Iterator<Item = (&OptionInfo, u32)> {
        self.options.iter().scan(0u32, |offset, option| {
            let field = (option, *offset);
            *offset += option.bit_count();
            Some(field)
        })
    }

    /// Packs option values by name. Missing or out-of-range values become 0.
    pub fn variant_key_for(&self, values: &HashMap<String, u32>) -> ShaderVariantKey {
        let option_bits = self.option_fields().fold(0, |bits, (option, offset)| {
            let value = values
                .get(&option.name)
                .copied()
                .filter(|&v| v < option.value_count())
                .unwrap_or(0);
            bits | (value << offset)
        });
        ShaderVariantKey::new(self.source_hash, option_bits)
    }

    pub fn program_invariant_key(&self, option_bits: u32) -> ShaderVariantKey {
        ShaderVariantKey::new(self.source_hash, option_bits).program_invariant(self.program_invariance_mask)
    }

    /// Lists the non-default options, e.g. `Skinned, Mode=Cutout`
    pub fn format_variant_name(&self, option_bits: u32) -> String {
        let mut name = String::new();
        for (option, offset) in self.option_fields() {
            let mask = (1u32 << option.bit_count()) - 1;
            let value = (option_bits >> offset) & mask;
            if value == 0 {
                continue;
            }
            if !name.is_empty() {
                name.push_str(", ");
            }
            name.push_str(&option.name);
            if option.is_boolean() {
                continue;
            }
            name.push('=');
            match option.named_values.get(value as usize) {
                Some(value_name) => name.push_str(value_name),
                None => {
                    name.push_str("unknown");
                    name.push_str(&value.to_string());
                }
            }
        }
        name
    }
}

impl BinarySerializable for ShaderInfo {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.source_hash)?;
        writer.write_u32::<LittleEndian>(self.program_invariance_mask)?;
        write_array(writer, &self.options, |w, option| {
            write_string(w, &option.name)?;
            write_string_array(w, &option.named_values)
        })?;
        write_string_array(writer, &self.vertex_attributes)?;
        write_string_array(writer, &self.instance_attributes)?;
        write_string_array(writer, &self.bindings)
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            source_hash: reader.read_u32::<LittleEndian>()?,
            program_invariance_mask: reader.read_u32::<LittleEndian>()?,
            options: read_array(reader, |r| {
                Ok(OptionInfo {
                    name: read_string(r)?,
                    named_values: read_string_array(r)?,
                })
            })?,
            vertex_attributes: read_string_array(reader)?,
            instance_attributes: read_string_array(reader)?,
            bindings: read_string_array(reader)?,
        })
    }
}
