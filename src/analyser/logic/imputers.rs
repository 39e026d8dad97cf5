//! Imputation primitives used by the missing-value resolver.
//!
//! [`KnnImputer`] fills gaps across a whole numeric matrix at once; the free
//! functions compute the summary statistics the fill rules need.

use crate::error::{CleanError, Result};
use std::collections::BTreeMap;

/// Adjusted Fisher-Pearson skewness (G1) of the observed values.
///
/// Undefined below three observations. A constant column has zero skew.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), x| {
        let d = x - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let m2 = m2 / nf;
    let m3 = m3 / nf;
    if m2 == 0.0 {
        return Some(0.0);
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Most frequent value; ties resolve to the smallest value in sort order.
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

/// K-nearest-neighbour imputation over a column-major numeric matrix.
///
/// Distances use the nan-euclidean metric: only coordinates observed in both
/// rows count, and the sum is scaled by `n_features / n_present`. Donors for
/// a cell are the `k` nearest rows that observed that feature; the cell gets
/// their mean. A cell with no donor gets the column mean.
#[derive(Debug, Clone, Copy)]
pub struct KnnImputer {
    k: usize,
}

impl KnnImputer {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Fills the gaps of every column in place and returns the number of
    /// cells filled. Columns without any observed value are left untouched.
    ///
    /// # Errors
    ///
    /// [`CleanError::ImputationInfeasible`] when there is no column or no
    /// observed value to learn from.
    pub fn fit_transform(&self, columns: &mut [Vec<Option<f64>>]) -> Result<usize> {
        let Some(n_rows) = columns.first().map(Vec::len) else {
            return Err(CleanError::ImputationInfeasible(
                "no numeric columns to impute from".to_owned(),
            ));
        };
        if columns.iter().any(|c| c.len() != n_rows) {
            return Err(CleanError::DataProcessing(
                "numeric columns have different lengths".to_owned(),
            ));
        }

        let column_means: Vec<Option<f64>> = columns
            .iter()
            .map(|c| mean(&c.iter().flatten().copied().collect::<Vec<_>>()))
            .collect();
        if column_means.iter().all(Option::is_none) {
            return Err(CleanError::ImputationInfeasible(
                "numeric columns hold no observed values".to_owned(),
            ));
        }

        let observed: Vec<Vec<Option<f64>>> = columns.to_vec();
        let n_features = observed.len();
        let mut filled = 0;

        for row in 0..n_rows {
            let missing: Vec<usize> = (0..n_features)
                .filter(|&f| observed[f][row].is_none() && column_means[f].is_some())
                .collect();
            if missing.is_empty() {
                continue;
            }

            let mut neighbours: Vec<(f64, usize)> = (0..n_rows)
                .filter(|&other| other != row)
                .filter_map(|other| {
                    nan_euclidean(&observed, row, other, n_features).map(|d| (d, other))
                })
                .collect();
            neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for feature in missing {
                let donors: Vec<f64> = neighbours
                    .iter()
                    .filter_map(|&(_, other)| observed[feature][other])
                    .take(self.k)
                    .collect();
                let value = mean(&donors).or(column_means[feature]);
                if let Some(cell) = columns
                    .get_mut(feature)
                    .and_then(|column| column.get_mut(row))
                {
                    *cell = value;
                    filled += 1;
                }
            }
        }

        Ok(filled)
    }
}

fn nan_euclidean(
    observed: &[Vec<Option<f64>>],
    a: usize,
    b: usize,
    n_features: usize,
) -> Option<f64> {
    let mut present = 0usize;
    let mut sum = 0.0;
    for column in observed {
        if let (Some(x), Some(y)) = (column[a], column[b]) {
            present += 1;
            sum += (x - y) * (x - y);
        }
    }
    if present == 0 {
        return None;
    }
    Some((sum * n_features as f64 / present as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skewness_symmetric_is_zero() {
        let skew = skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(skew.abs() < 1e-12);
    }

    #[test]
    fn test_skewness_matches_adjusted_coefficient() {
        // Reference value from the adjusted Fisher-Pearson formula.
        let skew = skewness(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert!((skew - 2.2324).abs() < 1e-3, "got {skew}");
    }

    #[test]
    fn test_skewness_undefined_for_small_samples() {
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(skewness(&[4.0, 4.0, 4.0]), Some(0.0));
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(vec!["b", "a", "b", "a", "c"]), Some("a"));
        assert_eq!(mode(vec![3, 3, 1]), Some(3));
        assert_eq!(mode(Vec::<i64>::new()), None);
    }

    #[test]
    fn test_knn_fills_from_nearest_rows() {
        let mut columns = vec![
            vec![Some(1.0), Some(2.0), Some(3.0), Some(10.0), Some(2.1)],
            vec![Some(10.0), Some(20.0), Some(30.0), Some(100.0), None],
        ];
        let filled = KnnImputer::new(2).fit_transform(&mut columns).unwrap();
        assert_eq!(filled, 1);
        // Nearest rows by the first feature are rows 1 (2.0) and 2 (3.0).
        assert_eq!(columns[1][4], Some(25.0));
    }

    #[test]
    fn test_knn_falls_back_to_column_mean_without_donors() {
        let mut columns = vec![vec![None, Some(1.0)], vec![Some(5.0), None]];
        KnnImputer::new(3).fit_transform(&mut columns).unwrap();
        assert_eq!(columns[0][0], Some(1.0));
        assert_eq!(columns[1][1], Some(5.0));
    }

    #[test]
    fn test_knn_infeasible_without_columns() {
        let mut columns: Vec<Vec<Option<f64>>> = Vec::new();
        assert!(matches!(
            KnnImputer::new(3).fit_transform(&mut columns),
            Err(CleanError::ImputationInfeasible(_))
        ));
    }
}
