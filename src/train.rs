use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Dataset, Error, Made, Optimizer, Result, Trainer, loss};

/// Sample order used by `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shuffle {
    /// Visit samples in dataset order every epoch.
    None,
    /// Reshuffle every epoch from a deterministic seed.
    Seeded(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs: usize,
    pub lr: f32,
    pub batch_size: usize,
    pub shuffle: Shuffle,
    pub optimizer: Optimizer,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            lr: 1e-3,
            batch_size: 32,
            shuffle: Shuffle::Seeded(0),
            optimizer: Optimizer::default(),
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::InvalidConfig("lr must be finite and > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        self.optimizer.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Mean per-dimension binary cross-entropy over the training set.
    pub train_loss: f32,
    /// Mean negative log-likelihood (nats per sample) on the validation set.
    pub val_nll: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn final_loss(&self) -> f32 {
        self.epochs.last().map_or(f32::NAN, |e| e.train_loss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Mean per-dimension binary cross-entropy.
    pub loss: f32,
    /// Mean negative log-likelihood in nats per sample.
    pub nll: f32,
}

impl Made {
    /// Train on binary vectors by minimizing the reconstruction cross-entropy.
    ///
    /// Each mini-batch averages per-sample gradients before one optimizer step.
    pub fn fit(&mut self, train: &Dataset, val: Option<&Dataset>, cfg: FitConfig) -> Result<FitReport> {
        cfg.validate()?;
        self.check_dataset(train, "train")?;
        if let Some(val) = val {
            self.check_dataset(val, "validation")?;
        }

        let mut opt = cfg.optimizer.state(self)?;
        let mut trainer = Trainer::new(self);
        let mut batch_grads = self.gradients();
        let mut order: Vec<usize> = (0..train.len()).collect();
        let mut rng = match cfg.shuffle {
            Shuffle::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
            Shuffle::None => None,
        };

        debug!(
            "fit: {} samples, {} epochs, batch {}, lr {}",
            train.len(),
            cfg.epochs,
            cfg.batch_size,
            cfg.lr
        );

        let mut epochs = Vec::with_capacity(cfg.epochs);
        for epoch in 0..cfg.epochs {
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let mut total = 0.0_f32;
            for batch in order.chunks(cfg.batch_size) {
                batch_grads.zero();
                for &idx in batch {
                    let x = train.sample(idx);
                    let probs = self.forward(x, &mut trainer.scratch);
                    total += loss::binary_cross_entropy_backward(
                        probs,
                        x,
                        trainer.grads.d_output_mut(),
                    );
                    self.backward(x, &trainer.scratch, &mut trainer.grads);
                    batch_grads.accumulate(&trainer.grads);
                }
                batch_grads.scale(1.0 / batch.len() as f32);
                opt.step(self, &mut batch_grads, cfg.lr);
            }

            let train_loss = total / train.len() as f32;
            let val_nll = val.map(|v| self.mean_nll(v, &mut trainer));
            match val_nll {
                Some(nll) => info!(
                    "epoch {}/{}: train loss {train_loss:.4}, val nll {nll:.3}",
                    epoch + 1,
                    cfg.epochs
                ),
                None => info!("epoch {}/{}: train loss {train_loss:.4}", epoch + 1, cfg.epochs),
            }
            epochs.push(EpochReport {
                epoch,
                train_loss,
                val_nll,
            });
        }

        Ok(FitReport { epochs })
    }

    /// Mean cross-entropy and negative log-likelihood over `data`.
    pub fn evaluate(&self, data: &Dataset) -> Result<EvalReport> {
        self.check_dataset(data, "evaluation")?;

        let mut scratch = self.scratch();
        let mut loss_total = 0.0_f32;
        let mut nll_total = 0.0_f32;
        for idx in 0..data.len() {
            let x = data.sample(idx);
            let probs = self.forward(x, &mut scratch);
            let ll = loss::log_likelihood(probs, x);
            nll_total -= ll;
            loss_total -= ll / x.len() as f32;
        }

        let n = data.len() as f32;
        Ok(EvalReport {
            loss: loss_total / n,
            nll: nll_total / n,
        })
    }

    fn mean_nll(&self, data: &Dataset, trainer: &mut Trainer) -> f32 {
        let mut total = 0.0_f32;
        for idx in 0..data.len() {
            total -= self.log_prob(data.sample(idx), &mut trainer.scratch);
        }
        total / data.len() as f32
    }

    fn check_dataset(&self, data: &Dataset, what: &str) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidData(format!("{what} dataset must not be empty")));
        }
        if data.dim() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "{what} dim {} does not match model input_dim {}",
                data.dim(),
                self.input_dim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::MadeBuilder;

    fn made() -> Made {
        MadeBuilder::new(4)
            .unwrap()
            .hidden_width(16)
            .unwrap()
            .build_with_seed(0)
            .unwrap()
    }

    #[test]
    fn rejects_bad_config_and_data() {
        let mut made = made();
        let data = Dataset::from_flat(vec![1.0, 0.0, 1.0, 0.0], 4).unwrap();
        let wrong_dim = Dataset::from_flat(vec![1.0, 0.0, 1.0], 3).unwrap();

        let zero_epochs = FitConfig {
            epochs: 0,
            ..FitConfig::default()
        };
        assert!(made.fit(&data, None, zero_epochs).is_err());
        let zero_batch = FitConfig {
            batch_size: 0,
            ..FitConfig::default()
        };
        assert!(made.fit(&data, None, zero_batch).is_err());
        assert!(made.fit(&wrong_dim, None, FitConfig::default()).is_err());
        assert!(made.fit(&data, Some(&wrong_dim), FitConfig::default()).is_err());
        assert!(made.evaluate(&wrong_dim).is_err());
    }

    #[test]
    fn evaluate_relates_loss_and_nll() {
        let made = made();
        let data = Dataset::from_flat(vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0], 4).unwrap();
        let report = made.evaluate(&data).unwrap();
        assert!((report.nll - 4.0 * report.loss).abs() < 1e-4);
    }

    #[test]
    fn fit_reports_every_epoch() {
        let mut made = made();
        let data = Dataset::from_flat(vec![1.0, 0.0, 1.0, 0.0], 4).unwrap();
        let report = made
            .fit(
                &data,
                Some(&data),
                FitConfig {
                    epochs: 3,
                    lr: 1e-2,
                    batch_size: 1,
                    shuffle: Shuffle::None,
                    optimizer: Optimizer::Sgd,
                },
            )
            .unwrap();
        assert_eq!(report.epochs.len(), 3);
        assert!(report.epochs.iter().all(|e| e.val_nll.is_some()));
        assert!(report.final_loss().is_finite());
    }
}
