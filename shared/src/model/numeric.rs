//! Numeric scalar, vector and matrix types.

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::FormatError;
use crate::formats::serialization::{BinarySerializable, read_bool, write_bool};

u8_enum! {
    #[derive(Default)]
    pub enum ScalarType {
        #[default]
        Int = 0,
        UInt = 1,
        Float = 2,
    }
}

impl ScalarType {
    /// GLSL prefix for vector type names (`ivec`, `uvec`, `vec`)
    pub fn glsl_prefix(self) -> &'static str {
        match self {
            ScalarType::Int => "i",
            ScalarType::UInt => "u",
            ScalarType::Float => "",
        }
    }
}

u8_enum! {
    #[derive(Default)]
    pub enum ScalarWidth {
        #[default]
        DWord = 0,
        Word = 1,
        Byte = 2,
    }
}

/// A scalar, vector (`columns == 1`) or matrix type.
///
/// Vertex attributes may use narrow or normalized scalars; anything bound to
/// a shader program is widened to a 32-bit GLSL type first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericType {
    pub scalar: ScalarType,
    pub columns: u8,
    pub rows: u8,
    pub width: ScalarWidth,
    pub normalized: bool,
}

impl NumericType {
    pub const fn new(scalar: ScalarType, columns: u8, rows: u8) -> Self {
        Self {
            scalar,
            columns,
            rows,
            width: ScalarWidth::DWord,
            normalized: false,
        }
    }

    pub const fn scalar(scalar: ScalarType) -> Self {
        Self::new(scalar, 1, 1)
    }

    pub const fn vector(scalar: ScalarType, rows: u8) -> Self {
        Self::new(scalar, 1, rows)
    }

    pub const fn matrix(columns: u8, rows: u8) -> Self {
        Self::new(ScalarType::Float, columns, rows)
    }

    pub const fn with_width(self, width: ScalarWidth) -> Self {
        Self { width, ..self }
    }

    pub const fn normalized(self) -> Self {
        Self {
            normalized: true,
            ..self
        }
    }

    pub fn is_valid(&self) -> bool {
        (1..=4).contains(&self.rows)
            && (1..=4).contains(&self.columns)
            && !(self.scalar == ScalarType::Float && self.width != ScalarWidth::DWord)
            && !(self.is_matrix() && self.scalar != ScalarType::Float)
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.columns == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.columns == 1
    }

    pub fn is_matrix(&self) -> bool {
        self.columns != 1
    }

    /// The 32-bit type this one is widened to inside a shader program
    pub fn glsl_compatible(&self) -> Option<NumericType> {
        if !self.is_valid() {
            return None;
        }
        let scalar = if self.scalar == ScalarType::Float || self.normalized {
            ScalarType::Float
        } else {
            self.scalar
        };
        Some(NumericType::new(scalar, self.columns, self.rows))
    }

    pub fn glsl_name(&self) -> Option<String> {
        let compatible = self.glsl_compatible()?;
        let name = if compatible.is_scalar() {
            match compatible.scalar {
                ScalarType::Int => "int".to_string(),
                ScalarType::UInt => "uint".to_string(),
                ScalarType::Float => "float".to_string(),
            }
        } else if compatible.is_vector() {
            format!("{}vec{}", compatible.scalar.glsl_prefix(), compatible.rows)
        } else if compatible.rows == compatible.columns {
            format!("mat{}", compatible.columns)
        } else {
            format!("mat{}x{}", compatible.columns, compatible.rows)
        };
        Some(name)
    }

    fn vector_size(&self) -> u32 {
        let rows = if self.rows == 3 { 4 } else { self.rows as u32 };
        rows * 4
    }

    /// Size in bytes inside a uniform structure, 3-row vectors padded to 4
    pub fn size(&self) -> u32 {
        self.columns as u32 * self.vector_size()
    }

    pub fn alignment(&self) -> u32 {
        self.vector_size()
    }

    /// Parses both source-language names (`float3`, `ushort2_norm`) and GLSL names (`vec3`, `mat4x3`)
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(base) = name.strip_suffix("_norm") {
            let ty = Self::from_base_name(base)?;
            let normalizable =
                ty.scalar != ScalarType::Float && ty.is_vector() && matches!(ty.rows, 2 | 4);
            return normalizable.then(|| ty.normalized());
        }
        Self::from_base_name(name)
    }

    fn from_base_name(name: &str) -> Option<Self> {
        const GLSL_VECTORS: [(&str, ScalarType); 3] = [
            ("ivec", ScalarType::Int),
            ("uvec", ScalarType::UInt),
            ("vec", ScalarType::Float),
        ];
        for (prefix, scalar) in GLSL_VECTORS {
            if let Some(rest) = name.strip_prefix(prefix) {
                let rows = parse_dimension(rest)?;
                return (rows > 1).then(|| Self::vector(scalar, rows));
            }
        }
        if let Some(rest) = name.strip_prefix("mat") {
            let (columns, rows) = match rest.split_once('x') {
                Some((c, r)) => (parse_dimension(c)?, parse_dimension(r)?),
                None => {
                    let n = parse_dimension(rest)?;
                    (n, n)
                }
            };
            return (columns > 1 && rows > 1).then(|| Self::matrix(columns, rows));
        }

        const SCALARS: [(&str, ScalarType, ScalarWidth); 7] = [
            ("sbyte", ScalarType::Int, ScalarWidth::Byte),
            ("byte", ScalarType::UInt, ScalarWidth::Byte),
            ("ushort", ScalarType::UInt, ScalarWidth::Word),
            ("short", ScalarType::Int, ScalarWidth::Word),
            ("uint", ScalarType::UInt, ScalarWidth::DWord),
            ("int", ScalarType::Int, ScalarWidth::DWord),
            ("float", ScalarType::Float, ScalarWidth::DWord),
        ];
        let (prefix, scalar, width) = SCALARS.into_iter().find(|(p, ..)| name.starts_with(p))?;
        let rest = &name[prefix.len()..];
        let ty = match rest.split_once('x') {
            None if rest.is_empty() => Self::scalar(scalar),
            None => Self::vector(scalar, parse_dimension(rest)?),
            Some((c, r)) if scalar == ScalarType::Float => {
                Self::matrix(parse_dimension(c)?, parse_dimension(r)?)
            }
            Some(_) => return None,
        };
        Some(ty.with_width(width))
    }
}

fn parse_dimension(text: &str) -> Option<u8> {
    match text {
        "1" => Some(1),
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("<invalid-numeric-type>");
        }
        let scalar = match (self.scalar, self.width) {
            (ScalarType::Float, _) => "float",
            (ScalarType::Int, ScalarWidth::Byte) => "sbyte",
            (ScalarType::UInt, ScalarWidth::Byte) => "byte",
            (ScalarType::Int, ScalarWidth::Word) => "short",
            (ScalarType::UInt, ScalarWidth::Word) => "ushort",
            (ScalarType::Int, ScalarWidth::DWord) => "int",
            (ScalarType::UInt, ScalarWidth::DWord) => "uint",
        };
        f.write_str(scalar)?;
        if self.is_vector() {
            write!(f, "{}", self.rows)?;
        } else if self.is_matrix() {
            write!(f, "{}x{}", self.columns, self.rows)?;
        }
        if self.normalized {
            f.write_str("_norm")?;
        }
        Ok(())
    }
}

impl BinarySerializable for NumericType {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.scalar.as_u8())?;
        writer.write_u8(self.columns)?;
        writer.write_u8(self.rows)?;
        writer.write_u8(self.width.as_u8())?;
        write_bool(writer, self.normalized)
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            scalar: ScalarType::from_u8(reader.read_u8()?)?,
            columns: reader.read_u8()?,
            rows: reader.read_u8()?,
            width: ScalarWidth::from_u8(reader.read_u8()?)?,
            normalized: read_bool(reader)?,
        })
    }
}
