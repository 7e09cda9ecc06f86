//! Contiguous dataset of fixed-length vectors.
//!
//! Samples are stored row-major in a single buffer so the training loop can hand
//! out slices without allocating. Values must lie in `[0, 1]`; `binarize` turns
//! grayscale intensities into the `{0, 1}` vectors the model is meant for.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Error, Result};

/// A collection of samples with shape `(len, dim)`.
#[derive(Debug, Clone)]
pub struct Dataset {
    values: Vec<f32>,
    len: usize,
    dim: usize,
}

impl Dataset {
    /// Build a dataset from a flat buffer with shape `(len, dim)`.
    pub fn from_flat(values: Vec<f32>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidData("dim must be > 0".to_owned()));
        }
        if !values.len().is_multiple_of(dim) {
            return Err(Error::InvalidData(format!(
                "values length {} is not divisible by dim {dim}",
                values.len()
            )));
        }
        if let Some(bad) = values
            .iter()
            .find(|v| !(v.is_finite() && (0.0..=1.0).contains(*v)))
        {
            return Err(Error::InvalidData(format!(
                "values must lie in [0, 1], found {bad}"
            )));
        }

        let len = values.len() / dim;
        Ok(Self { values, len, dim })
    }

    /// Build a dataset from per-sample rows (copied into contiguous storage).
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::InvalidData("rows must not be empty".to_owned()));
        };
        let dim = first.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(Error::InvalidData(format!(
                    "row {i} has len {}, expected {dim}",
                    row.len()
                )));
            }
        }
        Self::from_flat(rows.concat(), dim)
    }

    /// Map every value to `1.0` if it is `>= threshold`, else `0.0`.
    pub fn binarize(&self, threshold: f32) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|&v| if v >= threshold { 1.0 } else { 0.0 })
                .collect(),
            len: self.len,
            dim: self.dim,
        }
    }

    /// Split off the last `count` samples, e.g. for validation.
    pub fn split_tail(mut self, count: usize) -> Result<(Self, Self)> {
        if count == 0 || count >= self.len {
            return Err(Error::InvalidConfig(format!(
                "split count {count} must be in 1..{}",
                self.len
            )));
        }
        let tail = self.values.split_off((self.len - count) * self.dim);
        let head_len = self.len - count;
        Ok((
            Self {
                values: self.values,
                len: head_len,
                dim: self.dim,
            },
            Self {
                values: tail,
                len: count,
                dim: self.dim,
            },
        ))
    }

    /// Shuffle sample order in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len).collect();
        order.shuffle(rng);
        let mut values = Vec::with_capacity(self.values.len());
        for idx in order {
            values.extend_from_slice(self.sample(idx));
        }
        self.values = values;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    /// Returns the `idx`-th sample (shape: `(dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn sample(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.values[start..start + self.dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn from_flat_validates_shape_and_range() {
        assert!(Dataset::from_flat(vec![0.0, 1.0, 0.5, 1.0], 2).is_ok());
        assert!(Dataset::from_flat(vec![0.0, 1.0, 0.5], 2).is_err());
        assert!(Dataset::from_flat(vec![0.0, 1.5], 2).is_err());
        assert!(Dataset::from_flat(vec![0.0, f32::NAN], 2).is_err());
        assert!(Dataset::from_flat(vec![0.0], 0).is_err());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let ok = Dataset::from_rows(&[vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!((ok.len(), ok.dim()), (2, 2));
        assert_eq!(ok.sample(1), &[1.0, 1.0]);
        assert!(Dataset::from_rows(&[vec![0.0, 1.0], vec![1.0]]).is_err());
        assert!(Dataset::from_rows(&[]).is_err());
    }

    #[test]
    fn binarize_thresholds_values() {
        let data = Dataset::from_flat(vec![0.1, 0.5, 0.9, 0.49], 2).unwrap();
        assert_eq!(data.binarize(0.5).as_flat(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn split_tail_keeps_rows_intact() {
        let data = Dataset::from_flat(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0], 2).unwrap();
        let (head, tail) = data.split_tail(1).unwrap();
        assert_eq!(head.as_flat(), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(tail.as_flat(), &[1.0, 1.0]);
    }

    #[test]
    fn shuffle_permutes_whole_rows() {
        let rows: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i % 2) as f32, ((i / 2) % 2) as f32, 1.0])
            .collect();
        let mut data = Dataset::from_rows(&rows).unwrap();
        data.shuffle(&mut StdRng::seed_from_u64(0));
        assert_eq!(data.len(), 20);
        for idx in 0..data.len() {
            assert_eq!(data.sample(idx)[2], 1.0);
        }
        let ones: f32 = data.as_flat().iter().sum();
        assert_eq!(ones, rows.iter().flatten().sum::<f32>());
    }
}
