//! Best-per-group and Pareto frontier queries.

use std::collections::HashMap;

use tracing::debug;

use gemsweep_core::Field;
use gemsweep_table::{Table, Value};

use crate::error::{AnalysisError, Result};
use crate::numeric::{group_key, numeric_column};

/// Column added to Pareto output naming the threshold a row qualified for.
pub const PARETO_THRESHOLD_COLUMN: &str = "pareto_threshold";

/// For every distinct combination of `keys`, the row with the largest
/// `metric`. Groups appear in the order their first row appears; ties and
/// NaN-only groups resolve to the lowest row index.
pub fn best_per_group<S: AsRef<str>>(table: &Table, keys: &[S], metric: &str) -> Result<Table> {
    let metric_values = numeric_column(table, metric)?;
    let key_columns = keys
        .iter()
        .map(|k| {
            table.column(k.as_ref()).ok_or_else(|| AnalysisError::MissingColumn {
                name: k.as_ref().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    let mut best: Vec<usize> = Vec::new();
    for row in 0..table.row_count() {
        let key: Vec<String> = key_columns.iter().map(|c| group_key(&c[row])).collect();
        match slots.get(&key) {
            Some(&slot) => {
                let (candidate, current) = (metric_values[row], metric_values[best[slot]]);
                if candidate > current || (current.is_nan() && !candidate.is_nan()) {
                    best[slot] = row;
                }
            }
            None => {
                slots.insert(key, best.len());
                best.push(row);
            }
        }
    }
    debug!(groups = best.len(), rows = table.row_count(), metric, "best per group");
    Ok(table.take_rows(&best))
}

/// Parameter fields other than `axes`, the grouping used to reduce a
/// sweep to one row per configuration before a frontier search.
pub fn variable_parameters<S: AsRef<str>>(table: &Table, axes: &[S]) -> Vec<&'static str> {
    Field::ALL
        .iter()
        .map(|f| f.name())
        .filter(|name| table.has_column(name) && !axes.iter().any(|a| a.as_ref() == *name))
        .collect()
}

/// Approximate Pareto frontier by lattice-corner search.
///
/// For each threshold, only rows with `target > threshold` take part.
/// Every permutation of `axes` (in lexicographic order of their positions)
/// starts from the per-axis maxima and, axis by axis, fixes all other axes
/// at their current values, picks the rows with the smallest `target`
/// among those, and pins the free axis to the smallest value among them.
/// The resulting corner is kept once per threshold, together with every
/// qualifying row sitting exactly on it. The search is order-dependent and
/// is not a dominance computation.
///
/// Output rows carry an extra `pareto_threshold` column.
pub fn pareto<S: AsRef<str>>(
    table: &Table,
    axes: &[S],
    target: &str,
    thresholds: &[f64],
) -> Result<Table> {
    if axes.len() < 2 {
        return Err(AnalysisError::TooFewAxes { count: axes.len() });
    }
    let axis_values = axes
        .iter()
        .map(|a| numeric_column(table, a.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let target_values = numeric_column(table, target)?;
    let orders = permutations(axes.len());

    let mut out = Table::new();
    for &threshold in thresholds {
        let qualifying: Vec<usize> = (0..table.row_count())
            .filter(|&r| target_values[r] > threshold)
            .collect();
        if qualifying.is_empty() {
            debug!(threshold, "no rows above threshold");
            continue;
        }
        let maxima: Vec<f64> = axis_values
            .iter()
            .map(|values| qualifying.iter().map(|&r| values[r]).fold(f64::NEG_INFINITY, f64::max))
            .collect();

        let mut corners: Vec<Vec<f64>> = Vec::new();
        for order in &orders {
            let mut corner = maxima.clone();
            for &free in order {
                let fixed: Vec<usize> = qualifying
                    .iter()
                    .copied()
                    .filter(|&r| {
                        (0..axes.len())
                            .filter(|&a| a != free)
                            .all(|a| axis_values[a][r] == corner[a])
                    })
                    .collect();
                if fixed.is_empty() {
                    continue;
                }
                let min_target = fixed
                    .iter()
                    .map(|&r| target_values[r])
                    .fold(f64::INFINITY, f64::min);
                corner[free] = fixed
                    .iter()
                    .filter(|&&r| target_values[r] == min_target)
                    .map(|&r| axis_values[free][r])
                    .fold(f64::INFINITY, f64::min);
            }
            // Per threshold: a corner found under several thresholds is
            // reported under each of them.
            if corners.contains(&corner) {
                continue;
            }
            let rows: Vec<usize> = qualifying
                .iter()
                .copied()
                .filter(|&r| (0..axes.len()).all(|a| axis_values[a][r] == corner[a]))
                .collect();
            corners.push(corner);
            if rows.is_empty() {
                continue;
            }
            let mut part = table.take_rows(&rows);
            part.add_column(PARETO_THRESHOLD_COLUMN, vec![Value::Float(threshold); rows.len()])?;
            out.append(part);
        }
        debug!(threshold, corners = corners.len(), "pareto corners");
    }
    Ok(out)
}

/// All orderings of `0..n` in lexicographic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut current: Vec<usize> = (0..n).collect();
    let mut all = vec![current.clone()];
    loop {
        let Some(pivot) = (1..n).rev().find(|&i| current[i - 1] < current[i]) else {
            return all;
        };
        let pivot = pivot - 1;
        let Some(swap) = (pivot + 1..n).rev().find(|&j| current[j] > current[pivot]) else {
            return all;
        };
        current.swap(pivot, swap);
        current[pivot + 1..].reverse();
        all.push(current.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemsweep_table::Column;

    fn table(columns: &[(&str, &[f64])]) -> Table {
        let rows = columns[0].1.len();
        Table::from_columns(
            rows,
            columns
                .iter()
                .map(|(name, values)| Column {
                    name: name.to_string(),
                    values: values.iter().map(|&v| Value::Float(v)).collect(),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn permutation_order() {
        assert_eq!(
            permutations(3),
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(permutations(1), vec![vec![0]]);
    }

    #[test]
    fn best_row_per_group() {
        let t = table(&[
            ("mr", &[2.0, 2.0, 4.0, 4.0, 2.0]),
            ("nr", &[4.0, 4.0, 2.0, 2.0, 2.0]),
            ("efficiency", &[0.5, 0.8, 0.9, 0.9, 0.1]),
        ]);
        let best = best_per_group(&t, &["mr", "nr"], "efficiency").unwrap();
        assert_eq!(best.row_count(), 3);
        assert_eq!(
            best.column("efficiency").unwrap(),
            &[Value::Float(0.8), Value::Float(0.9), Value::Float(0.1)]
        );
        // tie keeps the earlier row; running again changes nothing
        let again = best_per_group(&best, &["mr", "nr"], "efficiency").unwrap();
        assert_eq!(again, best);
    }

    #[test]
    fn best_skips_nan() {
        let t = table(&[("g", &[1.0, 1.0]), ("efficiency", &[f64::NAN, 0.2])]);
        let best = best_per_group(&t, &["g"], "efficiency").unwrap();
        assert_eq!(best.value(0, "efficiency"), Some(&Value::Float(0.2)));
    }

    #[test]
    fn best_without_keys_is_global_max() {
        let t = table(&[("efficiency", &[0.3, 0.9, 0.4])]);
        let best = best_per_group::<&str>(&t, &[], "efficiency").unwrap();
        assert_eq!(best.row_count(), 1);
        assert_eq!(best.value(0, "efficiency"), Some(&Value::Float(0.9)));
    }

    #[test]
    fn pareto_finds_corners() {
        // rob/iq grid with efficiency rising in both
        let t = table(&[
            ("rob_size", &[64.0, 64.0, 128.0, 128.0]),
            ("iq_size", &[32.0, 64.0, 32.0, 64.0]),
            ("efficiency", &[0.6, 0.9, 0.9, 0.95]),
        ]);
        let frontier = pareto(&t, &["rob_size", "iq_size"], "efficiency", &[0.5, 0.85]).unwrap();

        // threshold 0.5: start at (128,64); order (rob,iq): rob free with
        // iq=64 -> min efficiency row rob=64; then iq free with rob=64 ->
        // iq=32. Order (iq,rob): iq free with rob=128 -> iq=32; rob free
        // with iq=32 -> rob=64. Both reach (64,32).
        // threshold 0.85: (64,32) is gone. Order (rob,iq) reaches (64,64),
        // order (iq,rob) reaches (128,32).
        let thresholds = frontier.column(PARETO_THRESHOLD_COLUMN).unwrap();
        assert_eq!(
            thresholds,
            &[Value::Float(0.5), Value::Float(0.85), Value::Float(0.85)]
        );
        assert_eq!(
            frontier.column("rob_size").unwrap(),
            &[Value::Float(64.0), Value::Float(64.0), Value::Float(128.0)]
        );
        assert_eq!(
            frontier.column("iq_size").unwrap(),
            &[Value::Float(32.0), Value::Float(64.0), Value::Float(32.0)]
        );
    }

    #[test]
    fn pareto_threshold_is_strict() {
        let t = table(&[("a", &[1.0]), ("b", &[1.0]), ("efficiency", &[0.9])]);
        assert!(pareto(&t, &["a", "b"], "efficiency", &[0.9]).unwrap().is_empty());
        assert_eq!(pareto(&t, &["a", "b"], "efficiency", &[0.89]).unwrap().row_count(), 1);
    }

    #[test]
    fn corner_repeats_across_thresholds() {
        let t = table(&[("a", &[1.0]), ("b", &[1.0]), ("efficiency", &[0.9])]);
        let frontier = pareto(&t, &["a", "b"], "efficiency", &[0.5, 0.8]).unwrap();
        // (1,1) is the corner under both thresholds and is kept for each
        assert_eq!(frontier.row_count(), 2);
        assert_eq!(frontier.column("a").unwrap(), &[Value::Float(1.0), Value::Float(1.0)]);
        assert_eq!(
            frontier.column(PARETO_THRESHOLD_COLUMN).unwrap(),
            &[Value::Float(0.5), Value::Float(0.8)]
        );
    }

    #[test]
    fn pareto_needs_two_axes() {
        let t = table(&[("a", &[1.0]), ("efficiency", &[0.9])]);
        assert!(matches!(
            pareto(&t, &["a"], "efficiency", &[0.5]),
            Err(AnalysisError::TooFewAxes { count: 1 })
        ));
    }

    #[test]
    fn variable_parameters_exclude_axes() {
        let t = table(&[
            ("mr", &[1.0]),
            ("rob_size", &[1.0]),
            ("iq_size", &[1.0]),
            ("efficiency", &[1.0]),
        ]);
        assert_eq!(variable_parameters(&t, &["rob_size"]), vec!["mr", "iq_size"]);
    }
}
