//! Outer/inner grid partitioning.
//!
//! The sweep is split into an outer grid, whose combinations are handed
//! out as independent work chunks, and an inner grid that every chunk
//! walks sequentially. The kernel shape `(mr, nr)` is always outer so
//! the feasibility rule can be applied once per chunk. Further fields
//! are promoted to the outer grid until there are enough chunks to keep
//! the worker budget busy.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::ResourceBudget;
use crate::param::{Field, Isa, ParameterPoint};
use crate::space::{ParameterSpace, Product};

/// One combination of the outer fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterPoint {
    /// Position in outer enumeration order.
    pub index: usize,
    pub values: Vec<(Field, u32)>,
}

impl OuterPoint {
    pub fn get(&self, field: Field) -> Option<u32> {
        self.values.iter().find(|(f, _)| *f == field).map(|(_, v)| *v)
    }
}

/// The partition of the sweep fields into outer and inner grids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub isa: Isa,
    /// Outer fields in canonical order.
    pub outer_fields: Vec<Field>,
    /// Domains of the inner fields, in canonical order.
    pub inner: Vec<(Field, Vec<u32>)>,
    /// Feasible outer combinations.
    pub outer_points: Vec<OuterPoint>,
    /// Workers to run concurrently: `min(worker budget, outer count)`.
    pub max_workers: usize,
}

impl ParameterGrid {
    /// Partition `space` for a host described by `budget`.
    pub fn partition(space: &ParameterSpace, budget: &ResourceBudget) -> Self {
        let domains = &space.domains;
        let mut outer: Vec<Field> = vec![Field::Mr, Field::Nr];
        let mut outer_count = space.feasible_kernels().len() as u64;

        loop {
            let inner_count = inner_count(space, &outer);
            let workers = budget.worker_budget(inner_count) as u64;
            if outer_count == 0 || outer_count >= workers {
                break;
            }

            let candidates: Vec<(Field, u64)> = Field::ALL
                .into_iter()
                .filter(|f| !outer.contains(f))
                .map(|f| (f, domains.len(f) as u64))
                .filter(|(_, n)| *n > 1)
                .collect();
            if candidates.is_empty() {
                break;
            }

            // Largest resulting outer count that still fits the budget,
            // otherwise the smallest domain. Ties go to the earlier field.
            let fitting = candidates
                .iter()
                .filter(|(_, n)| outer_count * n <= workers)
                .fold(None::<(Field, u64)>, |best, &(f, n)| match best {
                    Some((_, bn)) if bn >= n => best,
                    _ => Some((f, n)),
                });
            let (field, n) = fitting.unwrap_or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .fold(candidates[0], |best, c| if c.1 < best.1 { c } else { best })
            });

            debug!(field = %field, domain = n, outer_count, workers, "promoting field to outer grid");
            outer.push(field);
            outer_count *= n;
        }

        outer.sort();
        let inner: Vec<(Field, Vec<u32>)> = Field::ALL
            .into_iter()
            .filter(|f| !outer.contains(f))
            .map(|f| (f, domains.values(f).to_vec()))
            .collect();
        let workers = budget.worker_budget(inner_count(space, &outer));

        let outer_domains: Vec<&[u32]> = outer.iter().map(|f| domains.values(*f)).collect();
        let outer_points: Vec<OuterPoint> = Product::new(outer_domains)
            .map(|values| outer.iter().copied().zip(values).collect::<Vec<_>>())
            .filter(|values| {
                let get = |field| values.iter().find(|(f, _)| *f == field).map(|(_, v)| *v);
                space
                    .feasibility
                    .admits(get(Field::Mr).unwrap_or(0), get(Field::Nr).unwrap_or(0))
            })
            .enumerate()
            .map(|(index, values)| OuterPoint { index, values })
            .collect();

        let max_workers = workers.min(outer_points.len());
        Self {
            isa: space.isa(),
            outer_fields: outer,
            inner,
            outer_points,
            max_workers,
        }
    }

    /// Number of combinations in the inner grid.
    pub fn inner_count(&self) -> u64 {
        self.inner.iter().map(|(_, v)| v.len() as u64).product()
    }

    /// Every full point of one outer combination, inner fields varying
    /// lexicographically.
    pub fn expand<'a>(&'a self, outer: &'a OuterPoint) -> impl Iterator<Item = ParameterPoint> + 'a {
        expand(self.isa, outer, &self.inner)
    }
}

/// Full points for `outer` combined with every inner combination.
pub fn expand<'a>(
    isa: Isa,
    outer: &'a OuterPoint,
    inner: &'a [(Field, Vec<u32>)],
) -> impl Iterator<Item = ParameterPoint> + 'a {
    let product = Product::new(inner.iter().map(|(_, v)| v.as_slice()).collect());
    product.map(move |values| {
        let mut point = ParameterPoint::from_pairs(isa, outer.values.iter().copied());
        for ((field, _), value) in inner.iter().zip(values) {
            point.set(*field, value);
        }
        point
    })
}

fn inner_count(space: &ParameterSpace, outer: &[Field]) -> u64 {
    Field::ALL
        .iter()
        .filter(|f| !outer.contains(f))
        .map(|f| space.domains.len(*f) as u64)
        .product()
}
