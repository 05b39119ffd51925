use log::debug;

use super::EarlyStoppingSpec;

/// Whether training should go on after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

/// Tracks the best epoch loss and the parameters that produced it.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    min_delta: f64,
    patience: usize,

    best: Option<(usize, f64)>,
    best_params: Vec<f64>,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(spec: EarlyStoppingSpec) -> Self {
        Self {
            min_delta: spec.min_delta,
            patience: spec.patience,
            best: None,
            best_params: Vec::new(),
            wait: 0,
        }
    }

    /// Records the loss of `epoch` together with the parameters at the end of it.
    ///
    /// An epoch improves when its loss is below the best one by more than `min_delta`, after
    /// `patience` epochs in a row without improvement the verdict is `Stop`.
    pub fn update(&mut self, epoch: usize, loss: f64, params: &[f64]) -> Verdict {
        let improved = match self.best {
            None => !loss.is_nan(),
            Some((_, best)) => loss < best - self.min_delta,
        };

        if improved {
            self.best = Some((epoch, loss));
            self.best_params.clear();
            self.best_params.extend_from_slice(params);
            self.wait = 0;
            return Verdict::Continue;
        }

        self.wait += 1;
        debug!(epoch = epoch, wait = self.wait; "no improvement");

        if self.wait >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Continue
        }
    }

    /// Copies the best parameters seen into `params`.
    ///
    /// # Returns
    /// `false` if there is nothing to restore.
    pub fn restore(&self, params: &mut [f64]) -> bool {
        if self.best.is_none() || self.best_params.len() != params.len() {
            return false;
        }

        params.copy_from_slice(&self.best_params);
        true
    }

    /// The best epoch and its loss.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }
}
