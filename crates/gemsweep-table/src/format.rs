//! GST binary table format.
//!
//! A fixed-size header with magic bytes, version and flags, followed by
//! the JSON-serialized columnar table, terminated by a SHA-256 content
//! hash for integrity verification.
//!
//! A file holds one table and is written whole. Sweeps larger than memory
//! are persisted as a numbered series of files (`stats0.gst`,
//! `stats1.gst`, ...) that extraction merges back together.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Magic: 0x47535400 ("GST\0") │  4 bytes
//! │ Version: major.minor.patch   │  3 bytes
//! │ Flags                        │  1 byte
//! ├──────────────────────────────┤
//! │ row_count: u64               │
//! │ column_count: u64            │
//! │ payload_length: u64          │
//! ├──────────────────────────────┤
//! │ JSON payload (columns)       │
//! ├──────────────────────────────┤
//! │ Content Hash (SHA-256)       │  32 bytes
//! └──────────────────────────────┘
//! ```

use std::io::{Read, Write};

use sha2::{Digest, Sha256};

use crate::error::{Result, TableError};
use crate::table::Table;

/// Magic bytes identifying a GST file: "GST\0"
pub const MAGIC: [u8; 4] = [0x47, 0x53, 0x54, 0x00];

/// 4 (magic) + 3 (version) + 1 (flags) + 8*3 (counts + payload_len) = 32 bytes
const HEADER_SIZE: usize = 32;

const HASH_SIZE: usize = 32;

/// GST format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GstVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl GstVersion {
    pub const CURRENT: GstVersion = GstVersion {
        major: 0,
        minor: 1,
        patch: 0,
    };

    /// Same major version and a minor version no newer than ours.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major && self.minor <= Self::CURRENT.minor
    }
}

impl std::fmt::Display for GstVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// GST format flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GstFlags {
    bits: u8,
}

impl GstFlags {
    pub const NONE: GstFlags = GstFlags { bits: 0 };

    /// Derived metric columns (`efficiency`, `k_c`, ...) are present.
    pub const HAS_DERIVED: u8 = 0x01;

    /// Rows were filtered or columns projected after collection.
    pub const EXTRACTED: u8 = 0x02;

    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub fn has(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.bits |= flag;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

/// A GST file: header metadata + table.
#[derive(Debug)]
pub struct GstFile {
    pub version: GstVersion,
    pub flags: GstFlags,
    pub table: Table,
}

impl GstFile {
    pub fn new(table: Table) -> Self {
        let mut flags = GstFlags::NONE;
        if table.has_column("efficiency") {
            flags.set(GstFlags::HAS_DERIVED);
        }
        Self {
            version: GstVersion::CURRENT,
            flags,
            table,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload =
            serde_json::to_vec(&self.table).map_err(|e| TableError::Serialization(e.to_string()))?;

        let row_count = self.table.row_count() as u64;
        let column_count = self.table.column_count() as u64;
        let payload_len = payload.len() as u64;

        let mut hasher = Sha256::new();

        writer.write_all(&MAGIC)?;
        hasher.update(MAGIC);

        let version_bytes = [self.version.major, self.version.minor, self.version.patch];
        writer.write_all(&version_bytes)?;
        hasher.update(version_bytes);

        writer.write_all(&[self.flags.bits()])?;
        hasher.update([self.flags.bits()]);

        for val in [row_count, column_count, payload_len] {
            let bytes = val.to_le_bytes();
            writer.write_all(&bytes)?;
            hasher.update(bytes);
        }

        writer.write_all(&payload)?;
        hasher.update(&payload);

        let hash: [u8; 32] = hasher.finalize().into();
        writer.write_all(&hash)?;

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE + HASH_SIZE {
            return Err(TableError::FileTooSmall);
        }
        if data[0..4] != MAGIC {
            return Err(TableError::InvalidMagic);
        }

        let version = GstVersion {
            major: data[4],
            minor: data[5],
            patch: data[6],
        };
        if !version.is_compatible() {
            return Err(TableError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                patch: version.patch,
            });
        }
        let flags = GstFlags::new(data[7]);

        let row_count = read_u64(data, 8)?;
        let column_count = read_u64(data, 16)?;
        let payload_len = usize::try_from(read_u64(data, 24)?).map_err(|_| TableError::FileTooSmall)?;

        let payload_end = HEADER_SIZE
            .checked_add(payload_len)
            .ok_or(TableError::FileTooSmall)?;
        if data.len() < payload_end + HASH_SIZE {
            return Err(TableError::FileTooSmall);
        }

        let stored_hash = &data[payload_end..payload_end + HASH_SIZE];
        let mut hasher = Sha256::new();
        hasher.update(&data[..payload_end]);
        let computed_hash: [u8; 32] = hasher.finalize().into();
        if computed_hash != stored_hash {
            return Err(TableError::HashMismatch);
        }

        let table: Table = serde_json::from_slice(&data[HEADER_SIZE..payload_end])
            .map_err(|e| TableError::Serialization(e.to_string()))?;
        if table.row_count() as u64 != row_count || table.column_count() as u64 != column_count {
            return Err(TableError::Serialization(format!(
                "header declares {row_count}x{column_count}, payload holds {}x{}",
                table.row_count(),
                table.column_count()
            )));
        }

        Ok(Self {
            version,
            flags,
            table,
        })
    }
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let bytes: [u8; 8] = data
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or(TableError::FileTooSmall)?;
    Ok(u64::from_le_bytes(bytes))
}
