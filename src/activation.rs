//! Activation functions.
//!
//! Each masked layer computes `z = (W ⊙ M) x + b` and then applies its activation
//! element-wise. Hidden layers rectify, the output layer squashes into `(0, 1)`
//! so each output reads as a Bernoulli probability.
//!
//! Post-activation outputs are cached in `Scratch`, so the derivative is
//! expressed in terms of `y` rather than `z`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Element-wise activation function.
pub enum Activation {
    ReLU,
    Sigmoid,
}

impl Activation {
    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
        }
    }

    /// Derivative of the activation with respect to its input, expressed in terms
    /// of the cached post-activation output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_stays_inside_unit_interval() {
        let y0 = Activation::Sigmoid.forward(0.0);
        assert!((y0 - 0.5).abs() < 1e-6);

        assert!(Activation::Sigmoid.forward(10.0) > 0.999);
        assert!(Activation::Sigmoid.forward(-10.0) < 0.001);
        assert!(Activation::Sigmoid.forward(-200.0) >= 0.0);
        assert!(Activation::Sigmoid.forward(200.0) <= 1.0);
    }

    #[test]
    fn relu_clamps_negative_inputs() {
        assert_eq!(Activation::ReLU.forward(-2.0), 0.0);
        assert_eq!(Activation::ReLU.forward(3.0), 3.0);
        assert_eq!(Activation::ReLU.grad_from_output(0.0), 0.0);
        assert_eq!(Activation::ReLU.grad_from_output(1.5), 1.0);
    }

    #[test]
    fn sigmoid_gradient_from_output() {
        let y = Activation::Sigmoid.forward(0.0);
        assert!((Activation::Sigmoid.grad_from_output(y) - 0.25).abs() < 1e-6);
    }
}
