//! Sweep parameters: field names, ISA selection, domains and points.
//!
//! Every sweep varies the same sixteen microarchitectural fields. Their
//! declaration order is the canonical order used for enumeration, for
//! table columns and for grid partitioning.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A sweepable microarchitectural parameter.
///
/// Ordering follows declaration order, which is the canonical field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Kernel rows, in vector registers.
    Mr,
    /// Kernel columns, in scalar elements.
    Nr,
    /// Latency of the vector FMA unit, in cycles.
    SimdLat,
    /// Number of vector FMA units.
    SimdCount,
    /// Vector register width in bits.
    SimdWidth,
    /// Physical vector register file size.
    SimdPhregCount,
    /// Load ports.
    LdCount,
    /// Store ports.
    StCount,
    /// Cache line size in bytes.
    ClSize,
    /// L1 data cache size in KiB.
    L1Size,
    /// L1 data cache associativity.
    Assoc,
    IqSize,
    RobSize,
    DecodeWidth,
    CommitWidth,
    /// Fetch buffer size in bytes.
    FetchBufSize,
}

impl Field {
    /// All fields in canonical order.
    pub const ALL: [Field; 16] = [
        Field::Mr,
        Field::Nr,
        Field::SimdLat,
        Field::SimdCount,
        Field::SimdWidth,
        Field::SimdPhregCount,
        Field::LdCount,
        Field::StCount,
        Field::ClSize,
        Field::L1Size,
        Field::Assoc,
        Field::IqSize,
        Field::RobSize,
        Field::DecodeWidth,
        Field::CommitWidth,
        Field::FetchBufSize,
    ];

    /// Column name used in tables and configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Field::Mr => "mr",
            Field::Nr => "nr",
            Field::SimdLat => "simd_lat",
            Field::SimdCount => "simd_count",
            Field::SimdWidth => "simd_width",
            Field::SimdPhregCount => "simd_phreg_count",
            Field::LdCount => "ld_count",
            Field::StCount => "st_count",
            Field::ClSize => "cl_size",
            Field::L1Size => "l1_size",
            Field::Assoc => "assoc",
            Field::IqSize => "iq_size",
            Field::RobSize => "rob_size",
            Field::DecodeWidth => "decode_width",
            Field::CommitWidth => "commit_width",
            Field::FetchBufSize => "fetch_buf_size",
        }
    }

    /// Parse a column name back into a field.
    pub fn parse(name: &str) -> Result<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CoreError::UnknownField {
                name: name.to_string(),
            })
    }

    /// Whether the field selects the compute kernel rather than the core.
    pub fn is_kernel(self) -> bool {
        matches!(self, Field::Mr | Field::Nr)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction set of the simulated core. A sweep always targets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isa {
    Aarch64,
    Riscv64,
}

impl Isa {
    pub fn name(self) -> &'static str {
        match self {
            Isa::Aarch64 => "aarch64",
            Isa::Riscv64 => "riscv64",
        }
    }

    /// Parse an ISA name. Anything other than aarch64 or riscv64 is rejected.
    pub fn parse(name: &str) -> Result<Isa> {
        match name {
            "aarch64" => Ok(Isa::Aarch64),
            "riscv64" => Ok(Isa::Riscv64),
            other => Err(CoreError::UnsupportedIsa {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One fully specified simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub isa: Isa,
    /// Values indexed by canonical field position.
    values: [u32; 16],
}

impl ParameterPoint {
    /// A point with every field set to zero. Callers fill it with [`Self::set`].
    pub fn new(isa: Isa) -> Self {
        Self {
            isa,
            values: [0; 16],
        }
    }

    /// Build a point from `(field, value)` pairs. Unlisted fields stay zero.
    pub fn from_pairs<I>(isa: Isa, pairs: I) -> Self
    where
        I: IntoIterator<Item = (Field, u32)>,
    {
        let mut point = Self::new(isa);
        for (field, value) in pairs {
            point.set(field, value);
        }
        point
    }

    pub fn get(&self, field: Field) -> u32 {
        self.values[field as usize]
    }

    pub fn set(&mut self, field: Field, value: u32) {
        self.values[field as usize] = value;
    }

    /// `(field, value)` pairs in canonical order.
    pub fn pairs(&self) -> impl Iterator<Item = (Field, u32)> + '_ {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.isa)?;
        for (field, value) in self.pairs() {
            write!(f, " {field}={value}")?;
        }
        Ok(())
    }
}

/// Ordered candidate values for every sweepable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDomains {
    pub isa: Isa,
    domains: BTreeMap<Field, Vec<u32>>,
}

impl ParameterDomains {
    /// Domains for `isa` with every field pinned to a single default value.
    ///
    /// The defaults describe a modest out-of-order core with a 64 KiB,
    /// 8-way L1 and 128-bit vectors.
    pub fn with_defaults(isa: Isa) -> Self {
        let defaults = [
            (Field::Mr, 2),
            (Field::Nr, 4),
            (Field::SimdLat, 4),
            (Field::SimdCount, 2),
            (Field::SimdWidth, 128),
            (Field::SimdPhregCount, 64),
            (Field::LdCount, 2),
            (Field::StCount, 1),
            (Field::ClSize, 64),
            (Field::L1Size, 64),
            (Field::Assoc, 8),
            (Field::IqSize, 64),
            (Field::RobSize, 128),
            (Field::DecodeWidth, 4),
            (Field::CommitWidth, 4),
            (Field::FetchBufSize, 64),
        ];
        Self {
            isa,
            domains: defaults.into_iter().map(|(f, v)| (f, vec![v])).collect(),
        }
    }

    /// Replace the candidate values for `field`. Duplicates are dropped,
    /// keeping the first occurrence.
    pub fn set(&mut self, field: Field, values: Vec<u32>) -> Result<()> {
        if values.is_empty() {
            return Err(CoreError::EmptyDomain { field });
        }
        let mut unique = Vec::with_capacity(values.len());
        for v in values {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        self.domains.insert(field, unique);
        Ok(())
    }

    pub fn values(&self, field: Field) -> &[u32] {
        self.domains.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of candidate values for `field`.
    pub fn len(&self, field: Field) -> usize {
        self.values(field).len()
    }

    /// Size of the full cartesian product, before feasibility filtering.
    pub fn total_combinations(&self) -> u64 {
        Field::ALL.iter().map(|f| self.len(*f) as u64).product()
    }

    /// `(field, values)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &[u32])> {
        self.domains.iter().map(|(f, v)| (*f, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.name()).unwrap(), field);
        }
        assert!(Field::parse("l2_size").is_err());
    }

    #[test]
    fn canonical_order_matches_declaration() {
        let mut sorted = Field::ALL;
        sorted.sort();
        assert_eq!(sorted, Field::ALL);
        assert_eq!(Field::ALL[0], Field::Mr);
        assert_eq!(Field::ALL[15], Field::FetchBufSize);
    }

    #[test]
    fn isa_parse_rejects_unknown() {
        assert_eq!(Isa::parse("aarch64").unwrap(), Isa::Aarch64);
        assert_eq!(Isa::parse("riscv64").unwrap(), Isa::Riscv64);
        let err = Isa::parse("x86").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedIsa { ref name } if name == "x86"));
    }

    #[test]
    fn point_get_set() {
        let mut p = ParameterPoint::new(Isa::Aarch64);
        p.set(Field::RobSize, 192);
        assert_eq!(p.get(Field::RobSize), 192);
        assert_eq!(p.get(Field::IqSize), 0);
        let pairs: Vec<_> = p.pairs().collect();
        assert_eq!(pairs.len(), 16);
        assert_eq!(pairs[12], (Field::RobSize, 192));
    }

    #[test]
    fn domains_reject_empty_and_dedupe() {
        let mut d = ParameterDomains::with_defaults(Isa::Riscv64);
        assert!(d.set(Field::Mr, vec![]).is_err());
        d.set(Field::Mr, vec![2, 4, 2]).unwrap();
        assert_eq!(d.values(Field::Mr), &[2, 4]);
        assert_eq!(d.total_combinations(), 2);
    }

    #[test]
    fn point_serde_round_trip() {
        let p = ParameterPoint::from_pairs(Isa::Aarch64, [(Field::Mr, 4), (Field::Nr, 2)]);
        let json = serde_json::to_string(&p).unwrap();
        let back: ParameterPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
