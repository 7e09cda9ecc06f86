//! Connectivity masks.
//!
//! A mask between two layers has shape `(dest_len, source_len)`, matching the
//! row-major `(out_dim, in_dim)` layout of layer weights. Entry `(k, j)` is 1 when
//! destination unit `k` may read source unit `j`:
//!
//! - hidden mode: `dest[k] >= source[j]`
//! - output mode: `dest[k] > source[j]`
//!
//! The strict comparison on the output layer is what keeps `x_i` out of its own
//! prediction.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Comparison rule used when building a mask.
pub enum MaskMode {
    /// Non-strict: the destination feeds another hidden layer.
    Hidden,
    /// Strict: the destination is the output layer.
    Output,
}

/// Binary matrix stored row-major as `0.0` / `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

/// Build the `(dest_ids.len(), source_ids.len())` mask connecting two layers.
pub fn build_mask(source_ids: &[usize], dest_ids: &[usize], mode: MaskMode) -> Mask {
    let rows = dest_ids.len();
    let cols = source_ids.len();
    let mut values = Vec::with_capacity(rows * cols);
    for &d in dest_ids {
        for &s in source_ids {
            let connected = match mode {
                MaskMode::Hidden => d >= s,
                MaskMode::Output => d > s,
            };
            values.push(if connected { 1.0 } else { 0.0 });
        }
    }
    Mask { rows, cols, values }
}

impl Mask {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major values, `1.0` where connected.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Panics if `row >= rows` or `col >= cols`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        assert!(
            row < self.rows && col < self.cols,
            "mask index ({row}, {col}) out of bounds for ({}, {})",
            self.rows,
            self.cols
        );
        self.values[row * self.cols + col] != 0.0
    }

    pub fn count_ones(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0.0).count()
    }

    /// Rows as `0` / `1` bytes, convenient for inspection and assertions.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.values
            .chunks(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().map(|&v| u8::from(v != 0.0)).collect())
            .collect()
    }

    /// Boolean product `self · earlier`.
    ///
    /// If `earlier` connects layer `a` to layer `b` and `self` connects `b` to `c`,
    /// the result connects `a` to `c` wherever at least one path exists.
    pub fn compose(&self, earlier: &Mask) -> Result<Mask> {
        if self.cols != earlier.rows {
            return Err(Error::InvalidShape(format!(
                "cannot compose mask ({}, {}) after mask ({}, {})",
                self.rows, self.cols, earlier.rows, earlier.cols
            )));
        }

        let mut values = vec![0.0_f32; self.rows * earlier.cols];
        for r in 0..self.rows {
            for mid in 0..self.cols {
                if self.values[r * self.cols + mid] == 0.0 {
                    continue;
                }
                let src = &earlier.values[mid * earlier.cols..(mid + 1) * earlier.cols];
                let dst = &mut values[r * earlier.cols..(r + 1) * earlier.cols];
                for (d, &s) in dst.iter_mut().zip(src) {
                    if s != 0.0 {
                        *d = 1.0;
                    }
                }
            }
        }

        Ok(Mask {
            rows: self.rows,
            cols: earlier.cols,
            values,
        })
    }

    /// True when every set entry `(r, c)` satisfies `c < r`.
    pub fn is_strictly_lower_triangular(&self) -> bool {
        (0..self.rows).all(|r| (r..self.cols).all(|c| !self.get(r, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hidden_layer_orientation() {
        let mask = build_mask(&[3, 1, 2], &[2, 1, 2, 2], MaskMode::Hidden);
        assert_eq!((mask.rows(), mask.cols()), (4, 3));
        assert_eq!(
            mask.to_rows(),
            vec![
                vec![0, 1, 1],
                vec![0, 1, 0],
                vec![0, 1, 1],
                vec![0, 1, 1],
            ]
        );
    }

    #[test]
    fn second_hidden_layer_orientation() {
        let mask = build_mask(&[2, 1, 2, 2], &[1, 2, 2, 1], MaskMode::Hidden);
        assert_eq!(
            mask.to_rows(),
            vec![
                vec![0, 1, 0, 0],
                vec![1, 1, 1, 1],
                vec![1, 1, 1, 1],
                vec![0, 1, 0, 0],
            ]
        );
    }

    #[test]
    fn output_mode_is_strict() {
        let mask = build_mask(&[1, 2, 2, 1], &[3, 1, 2], MaskMode::Output);
        assert_eq!(
            mask.to_rows(),
            vec![vec![1, 1, 1, 1], vec![0, 0, 0, 0], vec![1, 0, 0, 1]]
        );
        // Id 1 has no strictly smaller predecessor: only the bias drives it.
        assert!((0..4).all(|c| !mask.get(1, c)));
    }

    #[test]
    fn hidden_and_output_differ_only_on_ties() {
        let src = [1, 2, 3];
        let dst = [2, 3];
        let hidden = build_mask(&src, &dst, MaskMode::Hidden);
        let output = build_mask(&src, &dst, MaskMode::Output);
        assert_eq!(hidden.to_rows(), vec![vec![1, 1, 0], vec![1, 1, 1]]);
        assert_eq!(output.to_rows(), vec![vec![1, 0, 0], vec![1, 1, 0]]);
    }

    #[test]
    fn same_ids_build_identical_masks() {
        let a = build_mask(&[1, 3, 2, 4], &[2, 2, 3], MaskMode::Hidden);
        let b = build_mask(&[1, 3, 2, 4], &[2, 2, 3], MaskMode::Hidden);
        assert_eq!(a, b);
    }

    #[test]
    fn compose_tracks_paths() {
        // inputs (1, 2, 3) -> hidden (1, 2) -> outputs (1, 2, 3)
        let first = build_mask(&[1, 2, 3], &[1, 2], MaskMode::Hidden);
        let second = build_mask(&[1, 2], &[1, 2, 3], MaskMode::Output);
        let reach = second.compose(&first).unwrap();
        assert_eq!(
            reach.to_rows(),
            vec![vec![0, 0, 0], vec![1, 0, 0], vec![1, 1, 0]]
        );
        assert!(reach.is_strictly_lower_triangular());
        assert_eq!(reach.count_ones(), 3);
    }

    #[test]
    fn compose_rejects_mismatched_shapes() {
        let a = build_mask(&[1, 2], &[1, 2, 3], MaskMode::Hidden);
        let b = build_mask(&[1, 2], &[1, 2], MaskMode::Hidden);
        assert!(a.compose(&a).is_err());
        assert!(b.compose(&a).is_err());
    }
}
