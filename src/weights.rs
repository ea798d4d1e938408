//! Depth and position weighting for kernel queries

use crate::{Error, Result};

/// Per-depth weights used by a query
#[derive(Clone, Copy, Debug)]
pub enum DepthWeights<'a> {
    /// One vector of `degree` weights shared by every position
    Shared(&'a [f64]),
    /// A row-major `rows x degree` matrix, one row per weight position
    PerPosition(&'a [f64]),
}

impl<'a> DepthWeights<'a> {
    /// The `degree` weights that apply at `row`
    pub fn row(&self, row: usize, degree: usize) -> Result<&'a [f64]> {
        match *self {
            DepthWeights::Shared(w) => {
                if w.len() < degree {
                    return Err(Error::WeightsTooShort {
                        needed: degree,
                        got: w.len(),
                    });
                }
                Ok(&w[..degree])
            }
            DepthWeights::PerPosition(w) => {
                let end = row
                    .checked_add(1)
                    .and_then(|rows| rows.checked_mul(degree))
                    .unwrap_or(usize::MAX);
                if w.len() < end {
                    return Err(Error::WeightsTooShort {
                        needed: end,
                        got: w.len(),
                    });
                }
                Ok(&w[end - degree..end])
            }
        }
    }

    pub fn is_per_position(&self) -> bool {
        matches!(self, DepthWeights::PerPosition(_))
    }
}

/// Everything a query needs besides the sequence itself
#[derive(Clone, Copy, Debug)]
pub struct Weighting<'a> {
    pub depth: DepthWeights<'a>,
    /// Optional scalar multiplier per weight position
    pub position: Option<&'a [f64]>,
}

impl<'a> Weighting<'a> {
    pub fn shared(weights: &'a [f64]) -> Self {
        Weighting {
            depth: DepthWeights::Shared(weights),
            position: None,
        }
    }

    pub fn per_position(matrix: &'a [f64]) -> Self {
        Weighting {
            depth: DepthWeights::PerPosition(matrix),
            position: None,
        }
    }

    pub fn with_position_weights(mut self, position: &'a [f64]) -> Self {
        self.position = Some(position);
        self
    }

    /// Position weight at `row`, if position weights are in use
    pub fn position_weight(&self, row: usize) -> Result<Option<f64>> {
        match self.position {
            None => Ok(None),
            Some(p) => p.get(row).copied().map(Some).ok_or(Error::WeightsTooShort {
                needed: row + 1,
                got: p.len(),
            }),
        }
    }
}

/// Standard weighted-degree depth weights: `w[k] = 2 (d - k) / (d (d + 1))`
///
/// Shorter k-mers weigh more; the weights sum to one.
pub fn weighted_degree(degree: usize) -> Vec<f64> {
    let d = degree as f64;
    let norm = d * (d + 1.0);
    (0..degree)
        .map(|k| 2.0 * (d - k as f64) / norm)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_degree_sums_to_one() {
        let w = weighted_degree(10);
        assert_eq!(w.len(), 10);
        let total: f64 = w.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[0] > p[1]));
    }

    #[test]
    fn test_per_position_row() {
        let matrix = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let w = DepthWeights::PerPosition(&matrix);
        assert_eq!(w.row(1, 3).unwrap(), &[4.0, 5.0, 6.0]);
        assert!(matches!(
            w.row(2, 3),
            Err(Error::WeightsTooShort { needed: 9, got: 6 })
        ));
        assert!(matches!(
            w.row(usize::MAX, 3),
            Err(Error::WeightsTooShort { needed: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_shared_row_ignores_position() {
        let weights = [0.5, 0.25, 0.125];
        let w = DepthWeights::Shared(&weights);
        assert_eq!(w.row(0, 2).unwrap(), w.row(7, 2).unwrap());
    }

    #[test]
    fn test_missing_position_weight() {
        let pw = [1.0, 0.0];
        let weighting = Weighting::shared(&[1.0]).with_position_weights(&pw);
        assert_eq!(weighting.position_weight(1).unwrap(), Some(0.0));
        assert!(weighting.position_weight(2).is_err());
    }
}
