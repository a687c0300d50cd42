//! Shader set reader

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use hashbrown::HashMap;

use super::{MAGIC, ShaderHeader, VERSION, VariantBody, VariantHeader};
use crate::error::FormatError;
use crate::formats::serialization::{BinarySerializable, read_bytes, read_string};
use crate::model::{ShaderInfo, ShaderVariant, ShaderVariantKey};

type Programs = (Arc<[u8]>, Arc<[u8]>);

/// Parses the header and index of a shader set, reads variant bodies on demand
pub struct ShaderSetReader<R: Read + Seek> {
    reader: R,
    shaders: Vec<ShaderHeader>,
    variants: Vec<VariantHeader>,
    variants_position: u64,
    /// Programs already read, by program offset
    programs: HashMap<u32, Programs>,
}

impl<R: Read + Seek> ShaderSetReader<R> {
    pub fn new(mut reader: R) -> Result<Self, FormatError> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic(magic));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let shader_count = reader.read_u32::<LittleEndian>()?;
        let total_variants = reader.read_u32::<LittleEndian>()?;

        let mut shaders = Vec::with_capacity(shader_count.min(1024) as usize);
        let mut variant_start = 0usize;
        for _ in 0..shader_count {
            let info = ShaderInfo::read_from(&mut reader)?;
            let variant_count = reader.read_u32::<LittleEndian>()?;
            let name = read_string(&mut reader)?;
            let source = read_string(&mut reader)?;
            shaders.push(ShaderHeader {
                info,
                name,
                source: (!source.is_empty()).then_some(source),
                variant_start,
                variant_count,
            });
            variant_start += variant_count as usize;
        }
        if variant_start as u64 != total_variants as u64 {
            return Err(FormatError::InconsistentVariantCount {
                declared: variant_start as u64,
                total: total_variants,
            });
        }

        let mut variants = Vec::with_capacity(total_variants.min(1 << 16) as usize);
        for _ in 0..total_variants {
            variants.push(VariantHeader {
                option_bits: reader.read_u32::<LittleEndian>()?,
                offset: reader.read_u32::<LittleEndian>()?,
            });
        }
        // Writers sort on finish; files from elsewhere may not be
        for shader in &shaders {
            let slice = &mut variants[shader.variant_range()];
            if !slice.is_sorted_by_key(|v| v.option_bits) {
                slice.sort_unstable_by_key(|v| v.option_bits);
            }
        }
        let variants_position = reader.stream_position()?;

        tracing::debug!(
            shaders = shaders.len(),
            variants = variants.len(),
            "opened shader set"
        );
        Ok(Self {
            reader,
            shaders,
            variants,
            variants_position,
            programs: HashMap::new(),
        })
    }

    pub fn shaders(&self) -> &[ShaderHeader] {
        &self.shaders
    }

    pub fn variant_count(&self) -> usize {
        self.variants.iter().filter(|v| !v.is_unused()).count()
    }

    /// Index entries of one shader, sorted by option bits, unused slots last
    pub fn variants_of(&self, shader_index: usize) -> Option<&[VariantHeader]> {
        let shader = self.shaders.get(shader_index)?;
        self.variants.get(shader.variant_range())
    }

    pub fn find_variant(&self, shader_index: usize, option_bits: u32) -> Option<VariantHeader> {
        let variants = self.variants_of(shader_index)?;
        let index = variants
            .binary_search_by_key(&option_bits, |v| v.option_bits)
            .ok()?;
        Some(variants[index]).filter(|v| !v.is_unused())
    }

    /// Reads one variant body and its (possibly shared) programs
    pub fn read_variant(
        &mut self,
        source_hash: u32,
        header: VariantHeader,
    ) -> Result<ShaderVariant, FormatError> {
        self.reader
            .seek(SeekFrom::Start(self.variants_position + header.offset as u64))?;
        let body = VariantBody::read_from(&mut self.reader)?;
        let program_offset = self.reader.read_u32::<LittleEndian>()?;

        let (vertex_program, fragment_program) = match self.programs.get(&program_offset) {
            Some(programs) => programs.clone(),
            None => {
                self.reader
                    .seek(SeekFrom::Start(self.variants_position + program_offset as u64))?;
                let vertex: Arc<[u8]> = read_bytes(&mut self.reader)?.into();
                let fragment: Arc<[u8]> = read_bytes(&mut self.reader)?.into();
                self.programs
                    .insert(program_offset, (vertex.clone(), fragment.clone()));
                (vertex, fragment)
            }
        };

        Ok(ShaderVariant {
            key: ShaderVariantKey::new(source_hash, header.option_bits),
            pipeline_state: body.pipeline_state,
            vertex_attributes: body.vertex_attributes,
            binding_set_sizes: body.binding_set_sizes,
            bindings: body.bindings,
            vertex_program,
            fragment_program,
        })
    }

    /// Drops the program byte cache
    pub fn clear_programs(&mut self) {
        self.programs.clear();
    }
}
