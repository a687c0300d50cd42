//! Primitive encoding shared by every shader set record.
//!
//! All integers are little-endian.
//!
//! ```text
//! string   = len:u32, UTF-8 bytes
//! array    = count:u32, items...
//! bytes    = len:i32, raw bytes
//! bool     = u8 (0 = false, anything else = true)
//! option   = present:bool, value (only if present)
//! enum     = u8 discriminant
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::FormatError;

/// Upper bound for speculative preallocation when reading counted arrays
const MAX_PREALLOCATION: usize = 256;

/// A record with a self-describing binary encoding.
pub trait BinarySerializable: Sized {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError>;
}

fn length_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

pub fn write_bool<W: Write>(writer: &mut W, value: bool) -> io::Result<()> {
    writer.write_u8(value as u8)
}

pub fn read_bool<R: Read>(reader: &mut R) -> Result<bool, FormatError> {
    Ok(reader.read_u8()? != 0)
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(length_u32(value.len())?)?;
    writer.write_all(value.as_bytes())
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String, FormatError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let bytes = read_exact_vec(reader, len)?;
    Ok(String::from_utf8(bytes)?)
}

/// Writes an `i32` length prefix followed by the raw bytes
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let len = i32::try_from(bytes.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    writer.write_i32::<LittleEndian>(len)?;
    writer.write_all(bytes)
}

pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>, FormatError> {
    let len = reader.read_i32::<LittleEndian>()?;
    let len = usize::try_from(len)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    read_exact_vec(reader, len)
}

fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, FormatError> {
    // A corrupt length must not turn into a giant allocation
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATION * 64));
    reader.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

pub fn write_array<W, T, F>(writer: &mut W, items: &[T], mut write_item: F) -> io::Result<()>
where
    W: Write,
    F: FnMut(&mut W, &T) -> io::Result<()>,
{
    writer.write_u32::<LittleEndian>(length_u32(items.len())?)?;
    for item in items {
        write_item(writer, item)?;
    }
    Ok(())
}

pub fn read_array<R, T, F>(reader: &mut R, mut read_item: F) -> Result<Vec<T>, FormatError>
where
    R: Read,
    F: FnMut(&mut R) -> Result<T, FormatError>,
{
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATION));
    for _ in 0..count {
        items.push(read_item(reader)?);
    }
    Ok(items)
}

pub fn write_string_array<W: Write>(writer: &mut W, items: &[String]) -> io::Result<()> {
    write_array(writer, items, |w, s| write_string(w, s))
}

pub fn read_string_array<R: Read>(reader: &mut R) -> Result<Vec<String>, FormatError> {
    read_array(reader, read_string)
}

pub fn write_option<W, T, F>(writer: &mut W, value: Option<&T>, write_value: F) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&mut W, &T) -> io::Result<()>,
{
    write_bool(writer, value.is_some())?;
    match value {
        Some(value) => write_value(writer, value),
        None => Ok(()),
    }
}

pub fn read_option<R, T, F>(reader: &mut R, read_value: F) -> Result<Option<T>, FormatError>
where
    R: Read,
    F: FnOnce(&mut R) -> Result<T, FormatError>,
{
    if read_bool(reader)? {
        Ok(Some(read_value(reader)?))
    } else {
        Ok(None)
    }
}
