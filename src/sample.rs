//! Ancestral sampling.
//!
//! Samples are generated one dimension at a time. At position `i` the whole batch
//! runs through the network, each row draws `x_i ~ Bernoulli(p_i)`, and the draw is
//! written back before moving to `i + 1`. Positions not yet filled hold `0.0`;
//! the masks make `p_i` independent of them.
//!
//! This costs `D` batched forward passes per call.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{BatchScratch, Error, Made, Result};

/// Stepwise sampler over a batch of `count` samples.
///
/// Can be dropped between steps; the model is never mutated.
#[derive(Debug)]
pub struct Sampler<'m> {
    made: &'m Made,
    count: usize,
    position: usize,
    /// Row-major `(count, input_dim)`.
    samples: Vec<f32>,
    scratch: BatchScratch,
}

impl<'m> Sampler<'m> {
    pub fn new(made: &'m Made, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidConfig(
                "sample count must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            made,
            count,
            position: 0,
            samples: vec![0.0; count * made.input_dim()],
            scratch: made.batch_scratch(count),
        })
    }

    /// Next position to fill. Equals `input_dim` once done.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.position == self.made.input_dim()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Partially filled samples, row-major `(count, input_dim)`.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Fill the current position for every row and advance.
    ///
    /// Returns `false` without doing anything once all positions are filled.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.is_done() {
            return false;
        }

        let dim = self.made.input_dim();
        let pos = self.position;
        let (probs, _) = self.made.forward_batch(&self.samples, &mut self.scratch);
        for (row, probs) in self.samples.chunks_exact_mut(dim).zip(probs.chunks_exact(dim)) {
            let p = probs[pos];
            row[pos] = if rng.r#gen::<f32>() < p { 1.0 } else { 0.0 };
        }
        trace!("sampled position {pos} of {dim} for {} rows", self.count);

        self.position += 1;
        true
    }

    /// Run every remaining step.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        while self.step(rng) {}
    }

    /// Take the finished samples, row-major `(count, input_dim)` of `0.0` / `1.0`.
    pub fn finish(self) -> Result<Vec<f32>> {
        if !self.is_done() {
            return Err(Error::UnfinishedSampler {
                position: self.position,
                input_dim: self.made.input_dim(),
            });
        }
        Ok(self.samples)
    }
}

impl Made {
    /// Draw `count` samples, row-major `(count, input_dim)` of `0.0` / `1.0`.
    pub fn sample_with_rng<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<f32>> {
        let mut sampler = Sampler::new(self, count)?;
        sampler.run(rng);
        sampler.finish()
    }

    /// Draw `count` samples using a deterministic seed.
    pub fn sample_with_seed(&self, count: usize, seed: u64) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample_with_rng(count, &mut rng)
    }
}
