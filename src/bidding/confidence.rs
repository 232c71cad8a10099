use crate::config::ConfidenceConfig;

/// Multiplicative margin adapted from auction outcomes.
///
/// Wins raise the margin by `step` without limit, losses lower it by
/// `step` down to `floor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence {
    value: f64,
    step: f64,
    floor: f64,
}

impl Confidence {
    pub fn new(baseline: f64, step: f64, floor: f64) -> Self {
        Confidence {
            value: baseline.max(floor),
            step,
            floor,
        }
    }

    pub fn from_config(config: &ConfidenceConfig) -> Self {
        Self::new(config.baseline, config.step, config.floor)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn record_win(&mut self) {
        self.value += self.step;
    }

    pub fn record_loss(&mut self) {
        self.value = (self.value - self.step).max(self.floor);
    }

    /// `price x (1 + confidence)`
    pub fn scale(&self, price: f64) -> f64 {
        price * (1.0 + self.value)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::from_config(&ConfidenceConfig::default())
    }
}
