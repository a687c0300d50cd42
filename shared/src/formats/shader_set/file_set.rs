//! Lookup interface over shader set files.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use hashbrown::HashMap;

use super::reader::ShaderSetReader;
use crate::error::{FormatError, LookupError};
use crate::model::{ShaderInfo, ShaderVariant, ShaderVariantKey};

/// A source of compiled shader variants.
///
/// Lookups that miss are expected to consult a fallback set if one is attached,
/// which lets a small override file shadow a large base file.
pub trait ShaderSet {
    fn shader_info(&self, source_hash: u32) -> Option<&ShaderInfo>;

    fn shader_info_by_name(&self, name: &str) -> Option<&ShaderInfo>;

    /// Embedded source text, if the set was built with sources
    fn source(&self, source_hash: u32) -> Option<&str>;

    fn try_get_variant(
        &mut self,
        key: ShaderVariantKey,
    ) -> Result<Option<Arc<ShaderVariant>>, FormatError>;

    fn get_shader_info(&self, name: &str) -> Result<&ShaderInfo, LookupError> {
        self.shader_info_by_name(name)
            .ok_or_else(|| LookupError::ShaderName(name.to_string()))
    }

    fn source_by_name(&self, name: &str) -> Option<&str> {
        let hash = self.shader_info_by_name(name)?.source_hash;
        self.source(hash)
    }

    fn get_source(&self, source_hash: u32) -> Result<&str, LookupError> {
        self.source(source_hash)
            .ok_or(LookupError::Source(source_hash))
    }

    fn get_variant(&mut self, key: ShaderVariantKey) -> Result<Arc<ShaderVariant>, LookupError> {
        self.try_get_variant(key)?
            .ok_or(LookupError::Variant(key))
    }
}

/// A [`ShaderSet`] backed by a container file, loading variants lazily
pub struct FileShaderSet<R: Read + Seek = BufReader<File>> {
    reader: ShaderSetReader<R>,
    shaders_by_hash: HashMap<u32, usize>,
    loaded: HashMap<ShaderVariantKey, Arc<ShaderVariant>>,
    fallback: Option<Box<dyn ShaderSet>>,
}

impl FileShaderSet {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> FileShaderSet<R> {
    pub fn from_reader(reader: R) -> Result<Self, FormatError> {
        let reader = ShaderSetReader::new(reader)?;
        let shaders_by_hash = reader
            .shaders()
            .iter()
            .enumerate()
            .map(|(index, shader)| (shader.info.source_hash, index))
            .collect();
        Ok(Self {
            reader,
            shaders_by_hash,
            loaded: HashMap::new(),
            fallback: None,
        })
    }

    pub fn set_fallback(&mut self, fallback: Box<dyn ShaderSet>) {
        self.fallback = Some(fallback);
    }

    pub fn take_fallback(&mut self) -> Option<Box<dyn ShaderSet>> {
        self.fallback.take()
    }

    pub fn reader(&self) -> &ShaderSetReader<R> {
        &self.reader
    }

    /// Shader names in file order
    pub fn shader_names(&self) -> impl Iterator<Item = &str> {
        self.reader.shaders().iter().map(|s| s.name.as_str())
    }

    /// Keys of every stored variant of one shader, ascending by option bits
    pub fn variant_keys(&self, source_hash: u32) -> Vec<ShaderVariantKey> {
        let Some(&index) = self.shaders_by_hash.get(&source_hash) else {
            return Vec::new();
        };
        self.reader
            .variants_of(index)
            .unwrap_or_default()
            .iter()
            .filter(|v| !v.is_unused())
            .map(|v| ShaderVariantKey::new(source_hash, v.option_bits))
            .collect()
    }

    pub fn total_variant_count(&self) -> usize {
        self.reader.variant_count()
    }

    pub fn loaded_variant_count(&self) -> usize {
        self.loaded.len()
    }

    /// Reads every variant of this file into the cache
    pub fn load_all(&mut self) -> Result<(), FormatError> {
        for index in 0..self.reader.shaders().len() {
            let source_hash = self.reader.shaders()[index].info.source_hash;
            let headers: Vec<_> = self
                .reader
                .variants_of(index)
                .unwrap_or_default()
                .iter()
                .copied()
                .filter(|v| !v.is_unused())
                .collect();
            for header in headers {
                let key = ShaderVariantKey::new(source_hash, header.option_bits);
                if !self.loaded.contains_key(&key) {
                    let variant = self.reader.read_variant(source_hash, header)?;
                    self.loaded.insert(key, Arc::new(variant));
                }
            }
        }
        Ok(())
    }

    pub fn clear_loaded(&mut self) {
        self.loaded.clear();
        self.reader.clear_programs();
    }

    fn load_local(&mut self, key: ShaderVariantKey) -> Result<Option<Arc<ShaderVariant>>, FormatError> {
        if let Some(variant) = self.loaded.get(&key) {
            return Ok(Some(Arc::clone(variant)));
        }
        let Some(&index) = self.shaders_by_hash.get(&key.source_hash) else {
            return Ok(None);
        };
        let Some(header) = self.reader.find_variant(index, key.option_bits) else {
            return Ok(None);
        };
        let variant = Arc::new(self.reader.read_variant(key.source_hash, header)?);
        self.loaded.insert(key, Arc::clone(&variant));
        Ok(Some(variant))
    }
}

impl<R: Read + Seek> ShaderSet for FileShaderSet<R> {
    fn shader_info(&self, source_hash: u32) -> Option<&ShaderInfo> {
        match self.shaders_by_hash.get(&source_hash) {
            Some(&index) => Some(&self.reader.shaders()[index].info),
            None => self.fallback.as_ref()?.shader_info(source_hash),
        }
    }

    fn shader_info_by_name(&self, name: &str) -> Option<&ShaderInfo> {
        match self.reader.shaders().iter().find(|s| s.name == name) {
            Some(shader) => Some(&shader.info),
            None => self.fallback.as_ref()?.shader_info_by_name(name),
        }
    }

    fn source(&self, source_hash: u32) -> Option<&str> {
        let local = self
            .shaders_by_hash
            .get(&source_hash)
            .and_then(|&index| self.reader.shaders()[index].source.as_deref());
        match local {
            Some(source) => Some(source),
            None => self.fallback.as_ref()?.source(source_hash),
        }
    }

    fn try_get_variant(
        &mut self,
        key: ShaderVariantKey,
    ) -> Result<Option<Arc<ShaderVariant>>, FormatError> {
        if let Some(variant) = self.load_local(key)? {
            return Ok(Some(variant));
        }
        match self.fallback.as_mut() {
            Some(fallback) => fallback.try_get_variant(key),
            None => Ok(None),
        }
    }
}
