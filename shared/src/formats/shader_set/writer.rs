//! Shader set writer
//!
//! Shaders are registered up front with their variant counts. The header and
//! a placeholder variant index are emitted on the first variant write; the
//! index is rewritten, sorted, by [`ShaderSetWriter::finish`].

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use hashbrown::HashMap;

use super::{MAGIC, ShaderHeader, VERSION, VariantBody, VariantHeader};
use crate::error::WriterError;
use crate::formats::serialization::{BinarySerializable, write_bytes, write_string};
use crate::model::{ShaderInfo, ShaderVariant, ShaderVariantKey};

/// Single-writer builder of a shader set file.
///
/// Variants must be written after all shaders were added. Dropping the writer
/// without calling [`finish`](Self::finish) leaves an invalid index behind.
pub struct ShaderSetWriter<W: Write + Seek> {
    writer: W,
    shaders: Vec<ShaderHeader>,
    /// Slots already claimed per shader
    claimed: Vec<u32>,
    variants: Vec<VariantHeader>,
    /// Program offsets by program-invariant key
    program_offsets: HashMap<ShaderVariantKey, u32>,
    index_position: Option<u64>,
    variants_position: u64,
}

impl<W: Write + Seek> ShaderSetWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            shaders: Vec::new(),
            claimed: Vec::new(),
            variants: Vec::new(),
            program_offsets: HashMap::new(),
            index_position: None,
            variants_position: 0,
        }
    }

    /// Registers a shader and reserves `variant_count` index slots for it
    pub fn add_shader(
        &mut self,
        info: ShaderInfo,
        name: impl Into<String>,
        source: Option<String>,
        variant_count: u32,
    ) -> Result<(), WriterError> {
        if self.index_position.is_some() {
            return Err(WriterError::ShadersSealed);
        }
        let variant_start = self.shaders.last().map_or(0, |s| s.variant_range().end);
        self.shaders.push(ShaderHeader {
            info,
            name: name.into(),
            source,
            variant_start,
            variant_count,
        });
        self.claimed.push(0);
        Ok(())
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    fn total_variant_count(&self) -> usize {
        self.shaders.last().map_or(0, |s| s.variant_range().end)
    }

    fn write_headers(&mut self) -> Result<(), WriterError> {
        if self.index_position.is_some() {
            return Ok(());
        }
        let total = self.total_variant_count();
        let total_u32 = u32::try_from(total).map_err(|_| WriterError::OffsetOverflow)?;
        let shader_count = u32::try_from(self.shaders.len()).map_err(|_| WriterError::OffsetOverflow)?;
        self.variants = vec![VariantHeader::UNUSED; total];

        self.writer.write_u32::<LittleEndian>(MAGIC)?;
        self.writer.write_u32::<LittleEndian>(VERSION)?;
        self.writer.write_u32::<LittleEndian>(shader_count)?;
        self.writer.write_u32::<LittleEndian>(total_u32)?;
        for shader in &self.shaders {
            shader.info.write_to(&mut self.writer)?;
            self.writer.write_u32::<LittleEndian>(shader.variant_count)?;
            write_string(&mut self.writer, &shader.name)?;
            write_string(&mut self.writer, shader.source.as_deref().unwrap_or(""))?;
        }

        let index_position = self.writer.stream_position()?;
        self.write_index()?;
        self.index_position = Some(index_position);
        self.variants_position = self.writer.stream_position()?;
        Ok(())
    }

    fn write_index(&mut self) -> Result<(), WriterError> {
        for header in &self.variants {
            self.writer.write_u32::<LittleEndian>(header.option_bits)?;
            self.writer.write_u32::<LittleEndian>(header.offset)?;
        }
        Ok(())
    }

    fn relative_position(&mut self) -> Result<u32, WriterError> {
        let position = self.writer.stream_position()? - self.variants_position;
        u32::try_from(position).map_err(|_| WriterError::OffsetOverflow)
    }

    /// Appends one variant, claiming the next free slot of its shader
    pub fn write_variant(&mut self, variant: &ShaderVariant) -> Result<(), WriterError> {
        self.write_headers()?;
        let hash = variant.key.source_hash;
        let shader_index = self
            .shaders
            .iter()
            .position(|s| s.info.source_hash == hash)
            .ok_or(WriterError::UnknownShader(hash))?;
        let shader = &self.shaders[shader_index];
        let slot = self.claimed[shader_index];
        if slot >= shader.variant_count {
            return Err(WriterError::VariantSlotsExhausted {
                hash,
                count: shader.variant_count,
            });
        }
        let index = shader.variant_start + slot as usize;
        let invariant_key = shader.info.program_invariant_key(variant.key.option_bits);
        self.claimed[shader_index] += 1;

        let offset = self.relative_position()?;
        self.variants[index] = VariantHeader {
            option_bits: variant.key.option_bits,
            offset,
        };
        VariantBody::write_parts(
            &mut self.writer,
            &variant.pipeline_state,
            &variant.vertex_attributes,
            &variant.binding_set_sizes,
            &variant.bindings,
        )?;

        if let Some(&program_offset) = self.program_offsets.get(&invariant_key) {
            self.writer.write_u32::<LittleEndian>(program_offset)?;
        } else {
            // The program block directly follows its own offset field
            let program_offset = self.relative_position()? + 4;
            self.program_offsets.insert(invariant_key, program_offset);
            self.writer.write_u32::<LittleEndian>(program_offset)?;
            write_bytes(&mut self.writer, &variant.vertex_program)?;
            write_bytes(&mut self.writer, &variant.fragment_program)?;
        }
        Ok(())
    }

    /// Writes the final sorted index and returns the underlying writer
    pub fn finish(mut self) -> Result<W, WriterError> {
        self.write_headers()?;
        for shader in &self.shaders {
            self.variants[shader.variant_range()].sort_unstable_by_key(|v| v.option_bits);
        }

        let end = self.writer.stream_position()?;
        if let Some(index_position) = self.index_position {
            self.writer.seek(SeekFrom::Start(index_position))?;
            self.write_index()?;
        }
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        tracing::debug!(
            shaders = self.shaders.len(),
            variants = self.variants.iter().filter(|v| !v.is_unused()).count(),
            programs = self.program_offsets.len(),
            "finished shader set"
        );
        Ok(self.writer)
    }
}
