//! Image and sampler resource types.

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::ScalarType;
use crate::error::FormatError;
use crate::formats::serialization::{BinarySerializable, read_bool, write_bool};

u8_enum! {
    pub enum ImageShape {
        D1 = 0,
        D2 = 1,
        D3 = 2,
        Cube = 3,
        D1Array = 4,
        D2Array = 5,
        CubeArray = 6,
        D2Ms = 7,
        D2MsArray = 8,
    }
}

impl ImageShape {
    pub fn glsl_suffix(self) -> &'static str {
        match self {
            ImageShape::D1 => "1D",
            ImageShape::D2 => "2D",
            ImageShape::D3 => "3D",
            ImageShape::Cube => "Cube",
            ImageShape::D1Array => "1DArray",
            ImageShape::D2Array => "2DArray",
            ImageShape::CubeArray => "CubeArray",
            ImageShape::D2Ms => "2DMS",
            ImageShape::D2MsArray => "2DMSArray",
        }
    }
}

/// A standalone sampler object. There is only one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerType;

impl SamplerType {
    pub const GLSL_NAME: &'static str = "sampler";

    pub fn from_glsl_name(name: &str) -> Option<Self> {
        (name == Self::GLSL_NAME).then_some(SamplerType)
    }
}

/// A texture, optionally combined with a sampler (`sampler2D` vs `texture2D`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageType {
    pub scalar: ScalarType,
    pub shape: ImageShape,
    pub sampled: bool,
}

impl ImageType {
    pub fn new(scalar: ScalarType, shape: ImageShape, sampled: bool) -> Self {
        Self {
            scalar,
            shape,
            sampled,
        }
    }

    pub fn glsl_name(&self) -> String {
        let kind = if self.sampled { "sampler" } else { "texture" };
        format!("{}{}{}", self.scalar.glsl_prefix(), kind, self.shape.glsl_suffix())
    }

    pub fn from_glsl_name(name: &str) -> Option<Self> {
        let (scalar, rest) = match name.as_bytes().first()? {
            b'i' => (ScalarType::Int, &name[1..]),
            b'u' => (ScalarType::UInt, &name[1..]),
            _ => (ScalarType::Float, name),
        };
        let (sampled, suffix) = if let Some(suffix) = rest.strip_prefix("sampler") {
            (true, suffix)
        } else {
            (false, rest.strip_prefix("texture")?)
        };
        let shape = ImageShape::ALL
            .iter()
            .copied()
            .find(|shape| shape.glsl_suffix() == suffix)?;
        Some(Self::new(scalar, shape, sampled))
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glsl_name())
    }
}

impl BinarySerializable for ImageType {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.scalar.as_u8())?;
        writer.write_u8(self.shape.as_u8())?;
        write_bool(writer, self.sampled)
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            scalar: ScalarType::from_u8(reader.read_u8()?)?,
            shape: ImageShape::from_u8(reader.read_u8()?)?,
            sampled: read_bool(reader)?,
        })
    }
}
