//! HDF5 superblock validation for netCDF-4 containers.
//!
//! netCDF-4 stores its data model inside an HDF5 file, so a structural
//! open succeeds when the superblock is well formed and the recorded
//! end-of-file address fits inside the real file, which is how libhdf5
//! detects truncation. Superblock fields are little-endian.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use super::NcError;

pub(super) const SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// Searches the doubling user-block offsets (512, 1024, 2048, ...) for
/// the HDF5 signature. Offset 0 must have been checked already.
pub(super) fn find_signature(file: &mut File, file_len: u64) -> Result<Option<u64>, NcError> {
    let mut offset = 512u64;
    while offset.saturating_add(8) <= file_len {
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf)?;
        if buf == SIGNATURE {
            return Ok(Some(offset));
        }
        offset = match offset.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(None)
}

/// Validates the superblock that starts at `base` (the signature's
/// offset), returning its version.
pub(super) fn validate_superblock(
    file: &mut File,
    base: u64,
    file_len: u64,
) -> Result<u8, NcError> {
    file.seek(SeekFrom::Start(base + 8))?;
    let mut reader = SuperblockReader {
        file,
        offset: base + 8,
    };

    let version = reader.read_u8()?;
    match version {
        0 | 1 => validate_v0(&mut reader, version, base, file_len)?,
        2 | 3 => validate_v2(&mut reader, base, file_len)?,
        other => return Err(NcError::UnsupportedSuperblock(other)),
    }

    Ok(version)
}

fn validate_v0(
    reader: &mut SuperblockReader,
    version: u8,
    base: u64,
    file_len: u64,
) -> Result<(), NcError> {
    reader.skip(4)?; // free-space, root group, reserved, shm versions
    let size_of_offsets = reader.read_field_size("invalid size of offsets")?;
    reader.read_field_size("invalid size of lengths")?;
    reader.skip(1)?; // reserved

    let leaf_k = reader.read_u16()?;
    if leaf_k == 0 {
        return Err(NcError::BadSuperblock {
            reason: "group leaf node K is zero",
        });
    }
    let internal_k = reader.read_u16()?;
    if internal_k == 0 {
        return Err(NcError::BadSuperblock {
            reason: "group internal node K is zero",
        });
    }

    reader.skip(4)?; // file consistency flags
    if version == 1 {
        reader.skip(4)?; // indexed storage internal node K + reserved
    }

    reader.read_address(size_of_offsets)?; // base address
    reader.read_address(size_of_offsets)?; // free-space info address
    let end_of_file = reader.read_address(size_of_offsets)?;
    check_end_of_file(end_of_file, size_of_offsets, base, file_len)
}

fn validate_v2(reader: &mut SuperblockReader, base: u64, file_len: u64) -> Result<(), NcError> {
    let size_of_offsets = reader.read_field_size("invalid size of offsets")?;
    reader.read_field_size("invalid size of lengths")?;
    reader.skip(1)?; // file consistency flags

    reader.read_address(size_of_offsets)?; // base address
    reader.read_address(size_of_offsets)?; // superblock extension address
    let end_of_file = reader.read_address(size_of_offsets)?;
    check_end_of_file(end_of_file, size_of_offsets, base, file_len)?;
    reader.read_address(size_of_offsets)?; // root group object header address
    reader.skip(4)?; // superblock checksum, not verified

    Ok(())
}

fn check_end_of_file(address: u64, width: u8, base: u64, file_len: u64) -> Result<(), NcError> {
    // an all-ones address is undefined and carries no expectation
    if address == undefined_address(width) {
        return Ok(());
    }
    let expected = base.saturating_add(address);
    if file_len < expected {
        return Err(NcError::Hdf5Truncated {
            expected,
            actual: file_len,
        });
    }
    Ok(())
}

fn undefined_address(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * u32::from(width))) - 1
    }
}

struct SuperblockReader<'a> {
    file: &'a mut File,
    offset: u64,
}

impl SuperblockReader<'_> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), NcError> {
        match self.file.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(NcError::UnexpectedEof {
                    offset: self.offset,
                })
            }
            Err(e) => Err(NcError::Io(e)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, NcError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16, NcError> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// An offset or length width; libhdf5 only ever writes 2, 4 or 8.
    fn read_field_size(&mut self, reason: &'static str) -> Result<u8, NcError> {
        let size = self.read_u8()?;
        match size {
            2 | 4 | 8 => Ok(size),
            _ => Err(NcError::BadSuperblock { reason }),
        }
    }

    /// Reads a `width`-byte little-endian address, zero-extended.
    fn read_address(&mut self, width: u8) -> Result<u64, NcError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf[..width as usize])?;
        Ok(u64::from_le_bytes(buf))
    }

    fn skip(&mut self, count: usize) -> Result<(), NcError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf[..count])?;
        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
