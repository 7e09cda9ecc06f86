//! Batched product for masked layers.
//!
//! `out (batch, out_dim) += inputs (batch, in_dim) · weights^T`, where `weights` is
//! the row-major `(out_dim, in_dim)` masked weight matrix. The transpose is never
//! materialized: it is read through swapped strides.
//!
//! Uses `matrixmultiply::sgemm` with the `matrixmultiply` feature, a plain loop
//! otherwise.

#[inline]
pub(crate) fn add_inputs_times_weights_t(
    batch: usize,
    in_dim: usize,
    out_dim: usize,
    inputs: &[f32],
    weights: &[f32],
    out: &mut [f32],
) {
    assert_eq!(inputs.len(), batch * in_dim, "inputs must be (batch, in_dim)");
    assert_eq!(weights.len(), out_dim * in_dim, "weights must be (out_dim, in_dim)");
    assert_eq!(out.len(), batch * out_dim, "out must be (batch, out_dim)");
    if batch == 0 || in_dim == 0 || out_dim == 0 {
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // SAFETY: the assertions above pin every buffer to its exact row-major
        // extent, and the strides below stay inside those extents.
        unsafe {
            matrixmultiply::sgemm(
                batch,
                in_dim,
                out_dim,
                1.0,
                inputs.as_ptr(),
                in_dim as isize,
                1,
                weights.as_ptr(),
                1,
                in_dim as isize,
                1.0,
                out.as_mut_ptr(),
                out_dim as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for (x, row) in inputs.chunks_exact(in_dim).zip(out.chunks_exact_mut(out_dim)) {
        for (acc, w) in row.iter_mut().zip(weights.chunks_exact(in_dim)) {
            *acc += x.iter().zip(w).fold(0.0_f32, |s, (&a, &b)| a.mul_add(b, s));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_against_transposed_weights() {
        // inputs (2, 3), weights (2, 3); out = bias + inputs · weights^T.
        let inputs = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let weights = [1.0_f32, 0.0, 1.0, 0.0, 1.0, 0.0];
        let mut out = [10.0_f32, 20.0, 30.0, 40.0];
        add_inputs_times_weights_t(2, 3, 2, &inputs, &weights, &mut out);
        assert_eq!(out, [14.0, 22.0, 40.0, 45.0]);
    }
}
