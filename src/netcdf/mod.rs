//! Structural netCDF readers used by the integrity probe.
//!
//! A netCDF file is either a classic-format file (magic bytes `CDF1`,
//! `CDF2` or `CDF5`) or a netCDF-4 file, which is an HDF5 container.
//! `inspect` recognises both families and validates as much of the header
//! as an open/close through the reference libraries would.

mod classic;
mod hdf5;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

/// Canonical netCDF file extension.
pub const EXTENSION: &str = "nc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdfVersion {
    Cdf1,
    Cdf2,
    Cdf5,
}

impl CdfVersion {
    fn from_magic_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Cdf1),
            2 => Some(Self::Cdf2),
            5 => Some(Self::Cdf5),
            _ => None,
        }
    }
}

impl fmt::Display for CdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cdf1 => write!(f, "classic (CDF-1)"),
            Self::Cdf2 => write!(f, "64-bit offset (CDF-2)"),
            Self::Cdf5 => write!(f, "64-bit data (CDF-5)"),
        }
    }
}

/// Summary of a parsed classic-format header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassicHeader {
    pub version: CdfVersion,
    pub dimensions: usize,
    pub variables: usize,
    pub global_attributes: usize,
}

/// What `inspect` learned about a readable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderInfo {
    Classic(ClassicHeader),
    Hdf5 { superblock_version: u8 },
}

impl fmt::Display for HeaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic(header) => write!(
                f,
                "{}, dimensions: {}, variables: {}, global attributes: {}",
                header.version, header.dimensions, header.variables, header.global_attributes
            ),
            Self::Hdf5 { .. } => write!(f, "netCDF-4 (HDF5)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NcError {
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),

    #[error("file is empty")]
    EmptyFile,

    #[error("not a netCDF file (unrecognised signature)")]
    NotNetcdf,

    #[error("unsupported classic netCDF version byte {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported HDF5 superblock version {0}")]
    UnsupportedSuperblock(u8),

    #[error("header ends unexpectedly at byte {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("invalid {what} list tag {tag:#010x} at byte {offset}")]
    BadTag {
        what: &'static str,
        tag: u32,
        offset: u64,
    },

    #[error("invalid type id {type_id} for {owner}")]
    BadTypeId { owner: String, type_id: u32 },

    #[error("implausible {what} ({len}) at byte {offset}")]
    ImplausibleLength {
        what: &'static str,
        len: u64,
        offset: u64,
    },

    #[error("more than one record dimension (`{name}` is the second)")]
    MultipleRecordDimensions { name: String },

    #[error("record dimension is not the outermost dimension of variable `{variable}`")]
    RecordDimNotFirst { variable: String },

    #[error("variable `{variable}` references undefined dimension id {dimid}")]
    UndefinedDimension { variable: String, dimid: u64 },

    #[error("invalid HDF5 superblock: {reason}")]
    BadSuperblock { reason: &'static str },

    #[error("file is truncated: HDF5 end-of-file address expects {expected} bytes, file has {actual}")]
    Hdf5Truncated { expected: u64, actual: u64 },
}

/// Opens `path` and validates its netCDF header, releasing the handle on
/// return. Reads header metadata only, never the data section.
pub fn inspect(path: &Path) -> Result<HeaderInfo, NcError> {
    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if file_len == 0 {
        return Err(NcError::EmptyFile);
    }

    let mut signature = [0u8; 8];
    let got = read_at_most(&mut file, &mut signature)?;

    if got >= 4 && &signature[..3] == b"CDF" {
        return match CdfVersion::from_magic_byte(signature[3]) {
            Some(version) => {
                file.seek(SeekFrom::Start(4))?;
                let header = classic::parse_header(BufReader::new(file), version, file_len)?;
                Ok(HeaderInfo::Classic(header))
            }
            None => Err(NcError::UnsupportedVersion(signature[3])),
        };
    }

    if got == 8 && signature == hdf5::SIGNATURE {
        let superblock_version = hdf5::validate_superblock(&mut file, 0, file_len)?;
        return Ok(HeaderInfo::Hdf5 { superblock_version });
    }

    // HDF5 permits a user block, pushing the signature to a power-of-two
    // offset starting at 512.
    if let Some(base) = hdf5::find_signature(&mut file, file_len)? {
        let superblock_version = hdf5::validate_superblock(&mut file, base, file_len)?;
        return Ok(HeaderInfo::Hdf5 { superblock_version });
    }

    Err(NcError::NotNetcdf)
}

/// Fills as much of `buf` as the reader can supply, returning the count.
fn read_at_most(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testdata {
    use super::hdf5::SIGNATURE;

    /// Smallest valid classic file: zero records, all three lists absent.
    pub(crate) fn empty_classic() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"CDF\x01");
        bytes.extend_from_slice(&0u32.to_be_bytes()); // numrecs
        bytes.extend_from_slice(&[0u8; 8]); // dim_list absent
        bytes.extend_from_slice(&[0u8; 8]); // gatt_list absent
        bytes.extend_from_slice(&[0u8; 8]); // var_list absent
        bytes
    }

    /// CDF-1 file with a record dimension `time`, a fixed dimension `lat`,
    /// one global attribute and one record variable `temp(time, lat)`.
    pub(crate) fn classic_with_entries() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"CDF\x01");
        bytes.extend_from_slice(&0u32.to_be_bytes()); // numrecs

        bytes.extend_from_slice(&10u32.to_be_bytes()); // NC_DIMENSION
        bytes.extend_from_slice(&2u32.to_be_bytes());
        push_name(&mut bytes, b"time");
        bytes.extend_from_slice(&0u32.to_be_bytes()); // record dimension
        push_name(&mut bytes, b"lat");
        bytes.extend_from_slice(&5u32.to_be_bytes());

        bytes.extend_from_slice(&12u32.to_be_bytes()); // NC_ATTRIBUTE
        bytes.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut bytes, b"title");
        bytes.extend_from_slice(&2u32.to_be_bytes()); // NC_CHAR
        bytes.extend_from_slice(&7u32.to_be_bytes()); // 7 characters
        bytes.extend_from_slice(b"example\x00"); // padded to 8

        bytes.extend_from_slice(&11u32.to_be_bytes()); // NC_VARIABLE
        bytes.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut bytes, b"temp");
        bytes.extend_from_slice(&2u32.to_be_bytes()); // ndims
        bytes.extend_from_slice(&0u32.to_be_bytes()); // dimid 0 (time)
        bytes.extend_from_slice(&1u32.to_be_bytes()); // dimid 1 (lat)
        bytes.extend_from_slice(&[0u8; 8]); // vatt_list absent
        bytes.extend_from_slice(&5u32.to_be_bytes()); // NC_FLOAT
        bytes.extend_from_slice(&20u32.to_be_bytes()); // vsize: 5 floats per record
        let begin_pos = bytes.len();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let begin = bytes.len() as u32;
        bytes[begin_pos..begin_pos + 4].copy_from_slice(&begin.to_be_bytes());
        bytes
    }

    /// Classic file whose only variable references a dimension that was
    /// never defined.
    pub(crate) fn classic_with_dangling_dimid() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"CDF\x01");
        bytes.extend_from_slice(&0u32.to_be_bytes());

        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut bytes, b"x");
        bytes.extend_from_slice(&4u32.to_be_bytes());

        bytes.extend_from_slice(&[0u8; 8]); // gatt_list absent

        bytes.extend_from_slice(&11u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        push_name(&mut bytes, b"bad");
        bytes.extend_from_slice(&1u32.to_be_bytes()); // ndims
        bytes.extend_from_slice(&3u32.to_be_bytes()); // dimid 3: undefined
        bytes.extend_from_slice(&[0u8; 8]); // vatt_list absent
        bytes.extend_from_slice(&4u32.to_be_bytes()); // NC_INT
        bytes.extend_from_slice(&16u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes
    }

    /// Valid classic header cut off mid-way through the dimension list.
    pub(crate) fn truncated_classic() -> Vec<u8> {
        let mut bytes = classic_with_entries();
        bytes.truncate(20);
        bytes
    }

    /// Minimal netCDF-4 container: a version-0 HDF5 superblock whose
    /// end-of-file address matches the real file length.
    pub(crate) fn hdf5_minimal() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SIGNATURE);
        bytes.push(0); // superblock version
        bytes.extend_from_slice(&[0, 0, 0, 0]); // free-space, root group, reserved, shm versions
        bytes.push(8); // size of offsets
        bytes.push(8); // size of lengths
        bytes.push(0); // reserved
        bytes.extend_from_slice(&4u16.to_le_bytes()); // group leaf node K
        bytes.extend_from_slice(&16u16.to_le_bytes()); // group internal node K
        bytes.extend_from_slice(&0u32.to_le_bytes()); // consistency flags
        bytes.extend_from_slice(&0u64.to_le_bytes()); // base address
        bytes.extend_from_slice(&u64::MAX.to_le_bytes()); // free-space address (undefined)
        let eof_pos = bytes.len();
        bytes.extend_from_slice(&0u64.to_le_bytes()); // end-of-file address, patched below
        bytes.extend_from_slice(&u64::MAX.to_le_bytes()); // driver info address (undefined)
        bytes.extend_from_slice(&[0u8; 40]); // root group symbol table entry
        let len = bytes.len() as u64;
        bytes[eof_pos..eof_pos + 8].copy_from_slice(&len.to_le_bytes());
        bytes
    }

    /// netCDF-4 container that claims more bytes than the file holds.
    pub(crate) fn hdf5_truncated() -> Vec<u8> {
        let mut bytes = hdf5_minimal();
        bytes.truncate(bytes.len() - 16);
        bytes
    }

    fn push_name(bytes: &mut Vec<u8>, name: &[u8]) {
        bytes.extend_from_slice(&(name.len() as u32).to_be_bytes());
        bytes.extend_from_slice(name);
        let padding = (4 - name.len() % 4) % 4;
        bytes.extend_from_slice(&vec![0u8; padding]);
    }
}
