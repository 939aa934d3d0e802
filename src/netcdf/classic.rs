//! Classic-format (CDF-1, CDF-2, CDF-5) header parser.
//!
//! All multi-byte header integers are big-endian. CDF-2 widens variable
//! begin offsets to 64 bits; CDF-5 widens sizes, counts and dimension ids
//! as well, and admits five extra type ids. Only the header is read, as
//! with `nc_open`: the data section is never length-checked.

use std::io::{self, Read};

use super::{CdfVersion, ClassicHeader, NcError};

const NC_DIMENSION: u32 = 10;
const NC_VARIABLE: u32 = 11;
const NC_ATTRIBUTE: u32 = 12;

/// Parses the header of a classic file. The reader must be positioned
/// just past the four magic bytes.
pub(super) fn parse_header<R: Read>(
    reader: R,
    version: CdfVersion,
    file_len: u64,
) -> Result<ClassicHeader, NcError> {
    let mut reader = HeaderReader {
        inner: reader,
        offset: 4,
        file_len,
        version,
    };

    // numrecs; the all-ones streaming sentinel is legal, so any value goes
    reader.read_size()?;

    let dimensions = reader.read_dimensions()?;
    let global_attributes = reader.read_attributes("the file")?;
    let variables = reader.read_variables(&dimensions)?;

    Ok(ClassicHeader {
        version,
        dimensions: dimensions.len(),
        variables,
        global_attributes,
    })
}

struct HeaderReader<R> {
    inner: R,
    offset: u64,
    file_len: u64,
    version: CdfVersion,
}

impl<R: Read> HeaderReader<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), NcError> {
        match self.inner.read_exact(buf) {
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

    fn read_u32(&mut self) -> Result<u32, NcError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, NcError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// A NON_NEG field: 32 bits in CDF-1/2, 64 bits in CDF-5.
    fn read_size(&mut self) -> Result<u64, NcError> {
        match self.version {
            CdfVersion::Cdf5 => self.read_u64(),
            _ => self.read_u32().map(u64::from),
        }
    }

    /// A variable's begin offset: 32 bits in CDF-1, 64 bits otherwise.
    fn read_begin(&mut self) -> Result<u64, NcError> {
        match self.version {
            CdfVersion::Cdf1 => self.read_u32().map(u64::from),
            _ => self.read_u64(),
        }
    }

    fn skip(&mut self, count: u64) -> Result<(), NcError> {
        let mut buf = [0u8; 512];
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.read_exact(&mut buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// A length claiming more bytes than the whole file holds cannot be
    /// honest, whatever else is wrong with the header.
    fn bounded(&self, len: u64, what: &'static str, offset: u64) -> Result<(), NcError> {
        if len > self.file_len {
            return Err(NcError::ImplausibleLength { what, len, offset });
        }
        Ok(())
    }

    fn read_name(&mut self) -> Result<String, NcError> {
        let at = self.offset;
        let len = self.read_size()?;
        self.bounded(len, "name length", at)?;
        let mut bytes = vec![0u8; len as usize];
        self.read_exact(&mut bytes)?;
        self.skip(padding(len))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads a list tag and element count. An absent list is encoded as
    /// tag 0 with count 0.
    fn read_list_header(&mut self, expected_tag: u32, what: &'static str) -> Result<u64, NcError> {
        let at = self.offset;
        let tag = self.read_u32()?;
        let count = self.read_size()?;
        if tag == 0 && count == 0 {
            return Ok(0);
        }
        if tag != expected_tag {
            return Err(NcError::BadTag { what, tag, offset: at });
        }
        self.bounded(count, "list count", at)?;
        Ok(count)
    }

    /// One entry per dimension; `true` marks the record dimension.
    fn read_dimensions(&mut self) -> Result<Vec<bool>, NcError> {
        let count = self.read_list_header(NC_DIMENSION, "dimension")?;
        let mut dimensions = Vec::new();
        let mut has_record_dim = false;
        for _ in 0..count {
            let name = self.read_name()?;
            let length = self.read_size()?;
            let is_record = length == 0;
            if is_record {
                if has_record_dim {
                    return Err(NcError::MultipleRecordDimensions { name });
                }
                has_record_dim = true;
            }
            dimensions.push(is_record);
        }
        Ok(dimensions)
    }

    /// Validates an attribute list, skipping over the value blocks.
    fn read_attributes(&mut self, owner: &str) -> Result<usize, NcError> {
        let count = self.read_list_header(NC_ATTRIBUTE, "attribute")?;
        for _ in 0..count {
            let name = self.read_name()?;
            let type_id = self.read_u32()?;
            let Some(width) = type_width(type_id, self.version) else {
                return Err(NcError::BadTypeId {
                    owner: format!("attribute `{}` of {}", name, owner),
                    type_id,
                });
            };
            let at = self.offset;
            let nelems = self.read_size()?;
            let len = nelems
                .checked_mul(width)
                .ok_or(NcError::ImplausibleLength {
                    what: "attribute value",
                    len: nelems,
                    offset: at,
                })?;
            self.bounded(len, "attribute value", at)?;
            self.skip(len + padding(len))?;
        }
        Ok(count as usize)
    }

    fn read_variables(&mut self, dimensions: &[bool]) -> Result<usize, NcError> {
        let count = self.read_list_header(NC_VARIABLE, "variable")?;
        for _ in 0..count {
            let name = self.read_name()?;
            let at = self.offset;
            let ndims = self.read_size()?;
            self.bounded(ndims, "dimension count", at)?;
            for i in 0..ndims {
                let dimid = self.read_size()?;
                let is_record = dimensions.get(dimid as usize).copied().ok_or_else(|| {
                    NcError::UndefinedDimension {
                        variable: name.clone(),
                        dimid,
                    }
                })?;
                // the record dimension may only be a variable's outermost
                if is_record && i != 0 {
                    return Err(NcError::RecordDimNotFirst {
                        variable: name.clone(),
                    });
                }
            }
            self.read_attributes(&format!("variable `{}`", name))?;
            let type_id = self.read_u32()?;
            if type_width(type_id, self.version).is_none() {
                return Err(NcError::BadTypeId {
                    owner: format!("variable `{}`", name),
                    type_id,
                });
            }
            self.read_size()?; // vsize
            self.read_begin()?; // begin offset of the data section
        }
        Ok(count as usize)
    }
}

/// Bytes needed to round `len` up to a 4-byte boundary.
fn padding(len: u64) -> u64 {
    (4 - len % 4) % 4
}

/// Width in bytes of one element of the given external type, or `None`
/// when the id is not legal for the format version. Ids 7 to 11 (the
/// unsigned and 64-bit integer types) exist only in CDF-5.
fn type_width(type_id: u32, version: CdfVersion) -> Option<u64> {
    match type_id {
        1 | 2 => Some(1), // NC_BYTE, NC_CHAR
        3 => Some(2),     // NC_SHORT
        4 | 5 => Some(4), // NC_INT, NC_FLOAT
        6 => Some(8),     // NC_DOUBLE
        7 if version == CdfVersion::Cdf5 => Some(1), // NC_UBYTE
        8 if version == CdfVersion::Cdf5 => Some(2), // NC_USHORT
        9 if version == CdfVersion::Cdf5 => Some(4), // NC_UINT
        10 | 11 if version == CdfVersion::Cdf5 => Some(8), // NC_INT64, NC_UINT64
        _ => None,
    }
}

// -- Tests -------------------------------------------------------------------
