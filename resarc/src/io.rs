//! Fixed-endianness integer access over byte buffers
//!
//! The container format mixes little- and big-endian fields, so every
//! accessor is explicit about width and byte order. Stream-based access
//! goes through `byteorder`; the patching routines work on whole in-memory
//! buffers and use the absolute-position helpers below, which bounds-check
//! instead of panicking.

use crate::{Error, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, BE, LE};
use std::io::{Read, Write};

/// Round a length up to the next 16-byte boundary.
#[inline]
pub fn align16(value: u64) -> u64 {
    (value + 15) & !15
}

fn check_range(buf: &[u8], pos: usize, len: usize) -> Result<()> {
    if pos.checked_add(len).is_none_or(|end| end > buf.len()) {
        return Err(Error::format(format!(
            "read of {len} bytes at 0x{pos:X} overruns buffer of {} bytes",
            buf.len()
        )));
    }
    Ok(())
}

/// Read a little-endian u32 at an absolute position.
pub fn get_u32_le(buf: &[u8], pos: usize) -> Result<u32> {
    check_range(buf, pos, 4)?;
    Ok(u32::from_le_bytes([
        buf[pos],
        buf[pos + 1],
        buf[pos + 2],
        buf[pos + 3],
    ]))
}

/// Read a big-endian u32 at an absolute position.
pub fn get_u32_be(buf: &[u8], pos: usize) -> Result<u32> {
    check_range(buf, pos, 4)?;
    Ok(u32::from_be_bytes([
        buf[pos],
        buf[pos + 1],
        buf[pos + 2],
        buf[pos + 3],
    ]))
}

/// Read a little-endian u64 at an absolute position.
pub fn get_u64_le(buf: &[u8], pos: usize) -> Result<u64> {
    check_range(buf, pos, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    Ok(u64::from_le_bytes(bytes))
}

/// Read a big-endian u64 at an absolute position.
pub fn get_u64_be(buf: &[u8], pos: usize) -> Result<u64> {
    check_range(buf, pos, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    Ok(u64::from_be_bytes(bytes))
}

/// Write a little-endian u32 at an absolute position.
pub fn put_u32_le(buf: &mut [u8], pos: usize, value: u32) -> Result<()> {
    check_range(buf, pos, 4)?;
    buf[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Write a big-endian u32 at an absolute position.
pub fn put_u32_be(buf: &mut [u8], pos: usize, value: u32) -> Result<()> {
    check_range(buf, pos, 4)?;
    buf[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Write a little-endian u64 at an absolute position.
pub fn put_u64_le(buf: &mut [u8], pos: usize, value: u64) -> Result<()> {
    check_range(buf, pos, 8)?;
    buf[pos..pos + 8].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Write a big-endian u64 at an absolute position.
pub fn put_u64_be(buf: &mut [u8], pos: usize, value: u64) -> Result<()> {
    check_range(buf, pos, 8)?;
    buf[pos..pos + 8].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Helper trait for reading container integers from a stream
pub trait ReadContainerExt: Read {
    fn read_u32_le(&mut self) -> Result<u32> {
        Ok(ReadBytesExt::read_u32::<LE>(self)?)
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        Ok(ReadBytesExt::read_u64::<LE>(self)?)
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        Ok(ReadBytesExt::read_u32::<BE>(self)?)
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        Ok(ReadBytesExt::read_u64::<BE>(self)?)
    }
}

impl<R: Read> ReadContainerExt for R {}

/// Helper trait for writing container integers to a stream
pub trait WriteContainerExt: Write {
    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        Ok(WriteBytesExt::write_u32::<LE>(self, value)?)
    }

    fn write_u64_le(&mut self, value: u64) -> Result<()> {
        Ok(WriteBytesExt::write_u64::<LE>(self, value)?)
    }

    fn write_u32_be(&mut self, value: u32) -> Result<()> {
        Ok(WriteBytesExt::write_u32::<BE>(self, value)?)
    }

    fn write_u64_be(&mut self, value: u64) -> Result<()> {
        Ok(WriteBytesExt::write_u64::<BE>(self, value)?)
    }
}

impl<W: Write> WriteContainerExt for W {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align16() {
        assert_eq!(align16(0), 0);
        assert_eq!(align16(1), 16);
        assert_eq!(align16(16), 16);
        assert_eq!(align16(17), 32);
        assert_eq!(align16(0x2F), 0x30);
    }

    #[test]
    fn test_get_put_roundtrip() {
        let mut buf = vec![0u8; 32];
        put_u32_le(&mut buf, 4, 0xDEADBEEF).unwrap();
        put_u64_le(&mut buf, 8, 0x1122334455667788).unwrap();
        put_u32_be(&mut buf, 16, 0xCAFEBABE).unwrap();
        put_u64_be(&mut buf, 20, 42).unwrap();

        assert_eq!(get_u32_le(&buf, 4).unwrap(), 0xDEADBEEF);
        assert_eq!(get_u64_le(&buf, 8).unwrap(), 0x1122334455667788);
        assert_eq!(get_u32_be(&buf, 16).unwrap(), 0xCAFEBABE);
        assert_eq!(get_u64_be(&buf, 20).unwrap(), 42);
    }

    #[test]
    fn test_endianness_on_disk() {
        let mut buf = vec![0u8; 8];
        put_u32_le(&mut buf, 0, 0x01020304).unwrap();
        assert_eq!(&buf[..4], &[0x04, 0x03, 0x02, 0x01]);
        put_u32_be(&mut buf, 4, 0x01020304).unwrap();
        assert_eq!(&buf[4..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_out_of_bounds_is_error() {
        let mut buf = vec![0u8; 8];
        assert!(get_u64_le(&buf, 1).is_err());
        assert!(get_u32_le(&buf, usize::MAX).is_err());
        assert!(put_u64_le(&mut buf, 4, 0).is_err());
        assert!(get_u64_le(&buf, 0).is_ok());
    }

    #[test]
    fn test_stream_helpers() {
        let mut buf = Vec::new();
        buf.write_u32_le(7).unwrap();
        buf.write_u64_le(9).unwrap();
        let mut cursor = std::io::Cursor::new(&buf);
        assert_eq!(ReadContainerExt::read_u32_le(&mut cursor).unwrap(), 7);
        assert_eq!(ReadContainerExt::read_u64_le(&mut cursor).unwrap(), 9);
    }
}
