//! Simulator statistics tree and its flattening into named scalars.
//!
//! The simulator reports statistics as a tree of named groups. Each
//! statistic is one of a small set of kinds, and every kind expands to
//! one or more scalar columns:
//!
//! | kind         | columns                                                  |
//! |--------------|----------------------------------------------------------|
//! | scalar       | `path.name`                                              |
//! | vector       | `path.name::sub` per non-empty subname                   |
//! | formula      | `path.name` if at most one value, else like a vector     |
//! | distribution | one per bucket, then min/max, mean, stddev, samples,     |
//! |              | total and overflows                                      |
//! | info         | none                                                     |

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Histogram statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub min_val: f64,
    pub max_val: f64,
    pub bucket_size: f64,
    /// Sample count per bucket.
    pub values: Vec<f64>,
    pub sum: f64,
    /// Sum of squared samples.
    pub squares: f64,
    #[serde(default)]
    pub overflow: f64,
}

/// The payload of one statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatKind {
    Scalar {
        value: f64,
    },
    Vector {
        subnames: Vec<String>,
        values: Vec<f64>,
    },
    Formula {
        #[serde(default)]
        subnames: Vec<String>,
        values: Vec<f64>,
    },
    Distribution(Distribution),
    /// Descriptive entries with no numeric value.
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    #[serde(flatten)]
    pub kind: StatKind,
}

impl Stat {
    pub fn scalar(name: &str, value: f64) -> Self {
        Stat {
            name: name.to_string(),
            kind: StatKind::Scalar { value },
        }
    }

    pub fn vector(name: &str, entries: &[(&str, f64)]) -> Self {
        Stat {
            name: name.to_string(),
            kind: StatKind::Vector {
                subnames: entries.iter().map(|(s, _)| s.to_string()).collect(),
                values: entries.iter().map(|(_, v)| *v).collect(),
            },
        }
    }
}

/// A named group of statistics and nested groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatGroup {
    pub name: String,
    #[serde(default)]
    pub stats: Vec<Stat>,
    #[serde(default)]
    pub groups: Vec<StatGroup>,
}

impl StatGroup {
    pub fn new(name: &str) -> Self {
        StatGroup {
            name: name.to_string(),
            ..StatGroup::default()
        }
    }

    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stats.push(stat);
        self
    }

    pub fn with_group(mut self, group: StatGroup) -> Self {
        self.groups.push(group);
        self
    }
}

/// The statistics snapshot taken at the end of a measured phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTree {
    #[serde(default)]
    pub groups: Vec<StatGroup>,
}

impl StatTree {
    /// Flatten into `(column, value)` pairs. Nested groups are emitted
    /// before the statistics of their parent; the first occurrence of a
    /// name wins.
    pub fn flatten(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for group in &self.groups {
            flatten_group(group, "", &mut out, &mut seen);
        }
        out
    }
}

fn flatten_group(
    group: &StatGroup,
    prefix: &str,
    out: &mut Vec<(String, f64)>,
    seen: &mut HashSet<String>,
) {
    let path = format!("{prefix}{}.", group.name);
    for sub in &group.groups {
        flatten_group(sub, &path, out, seen);
    }
    for stat in &group.stats {
        let name = format!("{path}{}", stat.name);
        for (column, value) in expand_stat(&name, &stat.kind) {
            if seen.insert(column.clone()) {
                out.push((column, value));
            }
        }
    }
}

/// Expand one statistic into its scalar columns.
pub fn expand_stat(name: &str, kind: &StatKind) -> Vec<(String, f64)> {
    match kind {
        StatKind::Scalar { value } => vec![(name.to_string(), *value)],
        StatKind::Vector { subnames, values } => expand_named(name, subnames, values),
        StatKind::Formula { subnames, values } if subnames.len() > 1 => {
            expand_named(name, subnames, values)
        }
        StatKind::Formula { values, .. } => values
            .first()
            .map(|v| vec![(name.to_string(), *v)])
            .unwrap_or_default(),
        StatKind::Distribution(dist) => expand_distribution(name, dist),
        StatKind::Info => Vec::new(),
    }
}

fn expand_named(name: &str, subnames: &[String], values: &[f64]) -> Vec<(String, f64)> {
    subnames
        .iter()
        .zip(values)
        .filter(|(sub, _)| !sub.is_empty())
        .map(|(sub, v)| (format!("{name}::{sub}"), *v))
        .collect()
}

fn expand_distribution(name: &str, dist: &Distribution) -> Vec<(String, f64)> {
    let mut out = Vec::with_capacity(dist.values.len() + 7);
    for (i, count) in dist.values.iter().enumerate() {
        let start = dist.min_val + i as f64 * dist.bucket_size;
        let end = dist.min_val + (i + 1) as f64 * dist.bucket_size - 1.0;
        let bucket = if start == end {
            format_bound(start)
        } else {
            format!("{}-{}", format_bound(start), format_bound(end))
        };
        out.push((format!("{name}::{bucket}"), *count));
    }

    let samples: f64 = dist.values.iter().sum();
    let mean = dist.sum / samples.max(1.0);
    let variance =
        (dist.squares * samples - dist.sum * dist.sum).max(0.0) / (samples * (samples - 1.0)).max(1.0);
    out.extend([
        (format!("{name}::min_value"), dist.min_val),
        (format!("{name}::max_value"), dist.max_val),
        (format!("{name}::mean"), mean),
        (format!("{name}::stddev"), variance.sqrt()),
        (format!("{name}::samples"), samples),
        (format!("{name}::total"), dist.sum),
        (format!("{name}::overflows"), dist.overflow),
    ]);
    out
}

fn format_bound(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}
