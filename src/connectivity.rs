//! Connectivity ids.
//!
//! Every unit carries an integer id `m` in `1..=D`. A unit with id `m` may only
//! depend on inputs `1..=m` of the fixed natural ordering. The input layer and the
//! output layer use the identity ids; hidden layers draw theirs at random.

use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::{Error, Result};

/// Ids of the input and output layers: `1, 2, ..., input_dim`.
pub fn identity_ids(input_dim: usize) -> Vec<usize> {
    (1..=input_dim).collect()
}

/// Draw `layer_size` hidden-unit ids, independently and uniformly from
/// `[1, input_dim - 1]`.
///
/// `input_dim` itself is never drawn: a hidden unit that saw every input would
/// leak `x_D` into the last output.
pub fn generate_hidden_ids<R: Rng + ?Sized>(
    layer_size: usize,
    input_dim: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if layer_size == 0 {
        return Err(Error::InvalidConfig(
            "hidden layer size must be > 0".to_owned(),
        ));
    }
    if input_dim <= 1 {
        return Err(Error::InvalidConfig(format!(
            "input_dim must be > 1 to draw hidden ids, got {input_dim}"
        )));
    }

    let dist = Uniform::new_inclusive(1, input_dim - 1);
    Ok((0..layer_size).map(|_| dist.sample(rng)).collect())
}
