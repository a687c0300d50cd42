//! Descriptor binding reflection.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{ImageType, NumericType, SamplerType};
use crate::error::FormatError;
use crate::formats::serialization::{
    BinarySerializable, read_array, read_bool, read_string, write_array, write_bool, write_string,
};

u8_enum! {
    /// Wire tag of a [`BindingType`]
    pub enum DataTypeCategory {
        Numeric = 0,
        Structure = 1,
        Image = 2,
        Sampler = 3,
        Buffer = 4,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub ty: NumericType,
}

/// An implicit uniform structure collecting the plain numeric fields of one storage block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructureType {
    pub members: Vec<StructureMember>,
    pub total_size: u32,
}

impl StructureType {
    /// Lays out members in order, each aligned to its vector alignment
    pub fn from_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, NumericType)>,
        S: Into<String>,
    {
        let mut offset = 0;
        let mut max_alignment = 1;
        let members = members
            .into_iter()
            .map(|(name, ty)| {
                let alignment = ty.alignment();
                max_alignment = max_alignment.max(alignment);
                offset = align_up(offset, alignment);
                let member = StructureMember {
                    name: name.into(),
                    offset,
                    size: ty.size(),
                    ty,
                };
                offset += member.size;
                member
            })
            .collect();
        Self {
            members,
            total_size: align_up(offset, max_alignment),
        }
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// A raw storage buffer holding an array of numeric elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferType {
    pub element: NumericType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingType {
    Structure(StructureType),
    Image(ImageType),
    Sampler(SamplerType),
    Buffer(BufferType),
}

impl BindingType {
    pub fn category(&self) -> DataTypeCategory {
        match self {
            BindingType::Structure(_) => DataTypeCategory::Structure,
            BindingType::Image(_) => DataTypeCategory::Image,
            BindingType::Sampler(_) => DataTypeCategory::Sampler,
            BindingType::Buffer(_) => DataTypeCategory::Buffer,
        }
    }
}

/// One `(set, binding)` slot of a compiled variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub set: u32,
    pub binding: u32,
    pub name: String,
    pub is_instance: bool,
    pub ty: BindingType,
}

impl BindingInfo {
    pub fn new(set: u32, binding: u32, name: impl Into<String>, ty: BindingType) -> Self {
        Self {
            set,
            binding,
            name: name.into(),
            is_instance: false,
            ty,
        }
    }

    pub fn as_instance(mut self) -> Self {
        self.is_instance = true;
        self
    }
}

impl BinarySerializable for BindingInfo {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.set)?;
        writer.write_u32::<LittleEndian>(self.binding)?;
        write_string(writer, &self.name)?;
        write_bool(writer, self.is_instance)?;
        writer.write_u8(self.ty.category().as_u8())?;
        match &self.ty {
            BindingType::Structure(structure) => {
                write_array(writer, &structure.members, |w, member| {
                    write_string(w, &member.name)?;
                    w.write_u32::<LittleEndian>(member.offset)?;
                    w.write_u32::<LittleEndian>(member.size)?;
                    member.ty.write_to(w)
                })?;
                writer.write_u32::<LittleEndian>(structure.total_size)
            }
            BindingType::Image(image) => image.write_to(writer),
            BindingType::Sampler(_) => Ok(()),
            BindingType::Buffer(buffer) => buffer.element.write_to(writer),
        }
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let set = reader.read_u32::<LittleEndian>()?;
        let binding = reader.read_u32::<LittleEndian>()?;
        let name = read_string(reader)?;
        let is_instance = read_bool(reader)?;
        let category = reader.read_u8()?;
        let ty = match DataTypeCategory::from_u8(category)? {
            DataTypeCategory::Structure => {
                let members = read_array(reader, |r| {
                    Ok(StructureMember {
                        name: read_string(r)?,
                        offset: r.read_u32::<LittleEndian>()?,
                        size: r.read_u32::<LittleEndian>()?,
                        ty: NumericType::read_from(r)?,
                    })
                })?;
                let total_size = reader.read_u32::<LittleEndian>()?;
                BindingType::Structure(StructureType {
                    members,
                    total_size,
                })
            }
            DataTypeCategory::Image => BindingType::Image(ImageType::read_from(reader)?),
            DataTypeCategory::Sampler => BindingType::Sampler(SamplerType),
            DataTypeCategory::Buffer => BindingType::Buffer(BufferType {
                element: NumericType::read_from(reader)?,
            }),
            DataTypeCategory::Numeric => {
                return Err(FormatError::InvalidEnum {
                    kind: "BindingType",
                    value: category,
                });
            }
        };
        Ok(Self {
            set,
            binding,
            name,
            is_instance,
            ty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScalarType;

    #[test]
    fn test_structure_layout_aligns_members() {
        let structure = StructureType::from_members([
            ("intensity", NumericType::scalar(ScalarType::Float)),
            ("direction", NumericType::vector(ScalarType::Float, 3)),
            ("uv", NumericType::vector(ScalarType::Float, 2)),
            ("world", NumericType::matrix(4, 4)),
        ]);
        let offsets: Vec<_> = structure.members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, [0, 16, 32, 48]);
        assert_eq!(structure.members[1].size, 16);
        assert_eq!(structure.total_size, 112);
    }

    #[test]
    fn test_numeric_category_is_not_a_binding() {
        let mut bytes = Vec::new();
        BindingInfo::new(0, 0, "x", BindingType::Sampler(SamplerType))
            .write_to(&mut bytes)
            .unwrap();
        let tag = bytes.len() - 1;
        bytes[tag] = DataTypeCategory::Numeric.as_u8();
        let err = BindingInfo::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, FormatError::InvalidEnum { .. }));
    }
}
