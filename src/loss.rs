//! Binary cross-entropy over Bernoulli probabilities.
//!
//! The model already ends in a sigmoid, so these helpers take probabilities, not
//! logits. Probabilities are clamped to `[PROB_EPS, 1 - PROB_EPS]` before taking
//! logs so saturated outputs give a large but finite loss.
//!
//! Typical step:
//!
//! - run `made.forward(...)`
//! - write the output logit gradient via `binary_cross_entropy_backward`
//! - run `made.backward(...)`
//! - update parameters with an optimizer

/// Lower clamp applied to probabilities before taking logs.
pub const PROB_EPS: f32 = 1e-7;

#[inline]
fn clamp_prob(p: f32) -> f32 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// `Σ_i t_i ln p_i + (1 - t_i) ln(1 - p_i)`.
///
/// For a binary `target` this is `ln p(target)` under the factorized model.
#[inline]
pub fn log_likelihood(probs: &[f32], target: &[f32]) -> f32 {
    assert_eq!(
        probs.len(),
        target.len(),
        "probs len {} does not match target len {}",
        probs.len(),
        target.len()
    );

    let mut sum = 0.0_f32;
    for (&p, &t) in probs.iter().zip(target) {
        let p = clamp_prob(p);
        sum += t * p.ln() + (1.0 - t) * (1.0 - p).ln();
    }
    sum
}

/// Mean binary cross-entropy over dimensions.
#[inline]
pub fn binary_cross_entropy(probs: &[f32], target: &[f32]) -> f32 {
    if probs.is_empty() {
        return 0.0;
    }
    -log_likelihood(probs, target) / probs.len() as f32
}

/// Binary cross-entropy + gradient w.r.t. the output logits.
///
/// `probs` must be the sigmoid outputs of the final layer. Writes
/// `d_logits[i] = (p_i - t_i) / N` on the unclamped `p` and returns the loss. The
/// sigmoid derivative is folded in here, so `Made::backward` does not apply it to
/// the output layer and a saturated, wrong output still gets a full gradient.
#[inline]
pub fn binary_cross_entropy_backward(probs: &[f32], target: &[f32], d_logits: &mut [f32]) -> f32 {
    assert_eq!(
        probs.len(),
        target.len(),
        "probs len {} does not match target len {}",
        probs.len(),
        target.len()
    );
    assert_eq!(
        probs.len(),
        d_logits.len(),
        "probs len {} does not match d_logits len {}",
        probs.len(),
        d_logits.len()
    );

    if probs.is_empty() {
        return 0.0;
    }

    let inv_n = 1.0 / probs.len() as f32;
    let mut sum = 0.0_f32;
    for i in 0..probs.len() {
        let t = target[i];
        let p = clamp_prob(probs[i]);
        sum += t * p.ln() + (1.0 - t) * (1.0 - p).ln();
        d_logits[i] = (probs[i] - t) * inv_n;
    }

    -sum * inv_n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_prediction_costs_ln_two() {
        let probs = [0.5_f32; 3];
        let target = [1.0_f32, 0.0, 1.0];
        let loss = binary_cross_entropy(&probs, &target);
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);
        assert!((log_likelihood(&probs, &target) + 3.0 * std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn saturated_predictions_stay_finite() {
        let probs = [1.0_f32, 0.0];
        let wrong = [0.0_f32, 1.0];
        let right = [1.0_f32, 0.0];
        assert!(binary_cross_entropy(&probs, &wrong).is_finite());
        assert!(binary_cross_entropy(&probs, &right) < 1e-5);

        let mut d = [0.0_f32; 2];
        binary_cross_entropy_backward(&probs, &wrong, &mut d);
        assert_eq!(d, [0.5, -0.5]);
    }

    #[test]
    fn logit_gradient_is_p_minus_t() {
        let probs = [0.8_f32, 0.3];
        let target = [1.0_f32, 1.0];
        let mut d = [0.0_f32; 2];
        let loss = binary_cross_entropy_backward(&probs, &target, &mut d);
        assert!((loss - binary_cross_entropy(&probs, &target)).abs() < 1e-6);

        for i in 0..2 {
            assert!((d[i] - (probs[i] - target[i]) / 2.0).abs() < 1e-6);
        }
    }
}
