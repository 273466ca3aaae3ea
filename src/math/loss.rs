//! Paired-target loss.
//!
//! Lower and upper bounds are treated as two independent regression channels
//! with equal weight:
//!
//! ```text
//! loss = (L(out[:,0], tgt[:,0]) + L(out[:,1], tgt[:,1])) / 2
//! ```

use crate::domain::{Interval, LossKind};

impl LossKind {
    /// Mean elementwise loss over one channel. Empty input gives `0`.
    pub fn channel_loss(self, outputs: &[f64], targets: &[f64]) -> f64 {
        debug_assert_eq!(outputs.len(), targets.len());
        let n = outputs.len().min(targets.len());
        if n == 0 {
            return 0.0;
        }
        let total: f64 = outputs
            .iter()
            .zip(targets)
            .map(|(o, t)| match self {
                LossKind::Mse => (o - t) * (o - t),
                LossKind::Mae => (o - t).abs(),
            })
            .sum();
        total / n as f64
    }
}

/// Average of the per-channel losses on lower (index 0) and upper (index 1).
pub fn paired_loss(criterion: LossKind, outputs: &[Interval], targets: &[Interval]) -> f64 {
    let channel = |idx: usize| {
        let out: Vec<f64> = outputs.iter().map(|iv| iv.channel(idx)).collect();
        let tgt: Vec<f64> = targets.iter().map(|iv| iv.channel(idx)).collect();
        criterion.channel_loss(&out, &tgt)
    };
    (channel(0) + channel(1)) / 2.0
}
