//! Parameter space enumeration.
//!
//! Points are produced as the lexicographic cartesian product of the
//! field domains in canonical field order (the first field varies
//! slowest), filtered by the vector register feasibility rule.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::param::{Field, Isa, ParameterDomains, ParameterPoint};
use crate::tiling::registers_needed;

/// Default architectural vector register count (AArch64 and RVV both have 32).
pub const DEFAULT_MAX_VECTOR_REGISTERS: u32 = 32;

/// Decides whether a kernel shape fits in the vector register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feasibility {
    pub max_vector_registers: u32,
}

impl Default for Feasibility {
    fn default() -> Self {
        Self {
            max_vector_registers: DEFAULT_MAX_VECTOR_REGISTERS,
        }
    }
}

impl Feasibility {
    /// `mr * nr + 2 * mr + 1 <= max_vector_registers`, with a non-empty kernel.
    pub fn admits(&self, mr: u32, nr: u32) -> bool {
        mr > 0 && nr > 0 && registers_needed(mr, nr) <= self.max_vector_registers
    }

    pub fn admits_point(&self, point: &ParameterPoint) -> bool {
        self.admits(point.get(Field::Mr), point.get(Field::Nr))
    }

    /// Like [`Self::admits_point`] but reports why a point was rejected.
    pub fn check(&self, point: &ParameterPoint) -> Result<()> {
        let (mr, nr) = (point.get(Field::Mr), point.get(Field::Nr));
        if self.admits_point(point) {
            Ok(())
        } else {
            Err(CoreError::Infeasible {
                mr,
                nr,
                needed: registers_needed(mr, nr),
                available: self.max_vector_registers,
            })
        }
    }
}

/// Lexicographic cartesian product over a list of domains.
///
/// Yields one `Vec` of values per combination, first domain slowest.
/// An empty domain list yields a single empty combination.
#[derive(Debug, Clone)]
pub struct Product<'a> {
    domains: Vec<&'a [u32]>,
    cursor: Vec<usize>,
    done: bool,
}

impl<'a> Product<'a> {
    pub fn new(domains: Vec<&'a [u32]>) -> Self {
        let done = domains.iter().any(|d| d.is_empty());
        Self {
            cursor: vec![0; domains.len()],
            domains,
            done,
        }
    }

    /// Number of combinations the iterator yields in total.
    pub fn count_all(&self) -> u64 {
        self.domains.iter().map(|d| d.len() as u64).product()
    }
}

impl Iterator for Product<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        if self.done {
            return None;
        }
        let item = self
            .cursor
            .iter()
            .zip(&self.domains)
            .map(|(&i, d)| d[i])
            .collect();

        // Advance the odometer from the last (fastest) position.
        let mut pos = self.cursor.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.cursor[pos] += 1;
            if self.cursor[pos] < self.domains[pos].len() {
                break;
            }
            self.cursor[pos] = 0;
        }
        Some(item)
    }
}

/// Combine a set of domains with a feasibility rule.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    pub domains: ParameterDomains,
    pub feasibility: Feasibility,
}

impl ParameterSpace {
    pub fn new(domains: ParameterDomains, feasibility: Feasibility) -> Self {
        Self {
            domains,
            feasibility,
        }
    }

    pub fn isa(&self) -> Isa {
        self.domains.isa
    }

    /// Lazily walk every feasible point in lexicographic order.
    pub fn points(&self) -> impl Iterator<Item = ParameterPoint> + '_ {
        let fields: Vec<Field> = self.domains.iter().map(|(f, _)| f).collect();
        let product = Product::new(self.domains.iter().map(|(_, v)| v).collect());
        let isa = self.domains.isa;
        product
            .map(move |values| ParameterPoint::from_pairs(isa, fields.iter().copied().zip(values)))
            .filter(move |p| self.feasibility.admits_point(p))
    }

    /// All feasible points, materialized.
    pub fn enumerate(&self) -> Vec<ParameterPoint> {
        self.points().collect()
    }

    /// Count feasible points without materializing them.
    pub fn feasible_count(&self) -> u64 {
        let rest: u64 = Field::ALL
            .iter()
            .filter(|f| !f.is_kernel())
            .map(|f| self.domains.len(*f) as u64)
            .product();
        self.feasible_kernels().len() as u64 * rest
    }

    /// Feasible `(mr, nr)` pairs in lexicographic order.
    pub fn feasible_kernels(&self) -> Vec<(u32, u32)> {
        let nrs = self.domains.values(Field::Nr);
        self.domains
            .values(Field::Mr)
            .iter()
            .flat_map(|&mr| nrs.iter().map(move |&nr| (mr, nr)))
            .filter(|&(mr, nr)| self.feasibility.admits(mr, nr))
            .collect()
    }
}

/// Enumerate every point of `domains` admitted by `feasibility`.
pub fn enumerate(domains: &ParameterDomains, feasibility: Feasibility) -> Vec<ParameterPoint> {
    ParameterSpace::new(domains.clone(), feasibility).enumerate()
}
