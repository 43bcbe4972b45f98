//! Plateau detection for the stochastic training loop.
//!
//! Two monitored quantities are supported: the training loss (lower is better) and a
//! held-out validation score (higher is better). An epoch only counts as an improvement
//! when it beats the best value by more than `tol`.

/// Which quantity decides whether an epoch improved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitor {
    TrainingLoss,
    ValidationScore,
}

/// Counts consecutive epochs without sufficient improvement.
///
/// ```
/// use constrained_regression::early_stop::{Monitor, NoImprovement};
///
/// let mut tracker = NoImprovement::new(Monitor::TrainingLoss, 1e-4);
/// tracker.observe(1.0);
/// tracker.observe(0.99995);
/// assert_eq!(tracker.count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NoImprovement {
    monitor: Monitor,
    tol: f32,
    best: f32,
    count: usize,
}

impl NoImprovement {
    pub fn new(monitor: Monitor, tol: f32) -> Self {
        let best = match monitor {
            Monitor::TrainingLoss => f32::INFINITY,
            Monitor::ValidationScore => f32::NEG_INFINITY,
        };
        Self {
            monitor,
            tol,
            best,
            count: 0,
        }
    }

    /// Record one epoch's value.
    ///
    /// Returns `true` if `value` is a new best (strictly better than every previous value,
    /// ignoring `tol`). Callers snapshot parameters on a new best validation score.
    pub fn observe(&mut self, value: f32) -> bool {
        let (stalled, is_best) = match self.monitor {
            Monitor::TrainingLoss => (value > self.best - self.tol, value < self.best),
            Monitor::ValidationScore => (value < self.best + self.tol, value > self.best),
        };

        if stalled {
            self.count += 1;
        } else {
            self.count = 0;
        }
        if is_best {
            self.best = value;
        }
        is_best
    }

    /// True once more than `patience` consecutive epochs stalled.
    #[inline]
    pub fn exhausted(&self, patience: usize) -> bool {
        self.count > patience
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Best value seen so far (`+inf` / `-inf` before the first observation).
    #[inline]
    pub fn best(&self) -> f32 {
        self.best
    }

    #[inline]
    pub fn monitor(&self) -> Monitor {
        self.monitor
    }

    /// Forget the stall count; the best value is kept.
    #[inline]
    pub fn reset_count(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_counter_grows_while_stalled() {
        let mut t = NoImprovement::new(Monitor::TrainingLoss, 0.01);

        assert!(t.observe(1.0));
        assert_eq!(t.count(), 0);
        // Better, but not by more than tol.
        assert!(t.observe(0.995));
        assert_eq!(t.count(), 1);
        assert!(!t.observe(1.2));
        assert_eq!(t.count(), 2);
        assert!(!t.exhausted(2));
        assert!(!t.observe(1.0));
        assert!(t.exhausted(2));

        // A real improvement resets the count.
        assert!(t.observe(0.5));
        assert_eq!(t.count(), 0);
        assert_eq!(t.best(), 0.5);
    }

    #[test]
    fn validation_score_is_higher_is_better() {
        let mut t = NoImprovement::new(Monitor::ValidationScore, 1e-3);

        assert!(t.observe(0.2));
        assert!(t.observe(0.5));
        assert_eq!(t.count(), 0);
        assert!(!t.observe(0.4));
        assert_eq!(t.count(), 1);
        assert_eq!(t.best(), 0.5);
    }

    #[test]
    fn reset_count_keeps_best() {
        let mut t = NoImprovement::new(Monitor::TrainingLoss, 0.0);
        t.observe(1.0);
        t.observe(2.0);
        t.observe(3.0);
        assert_eq!(t.count(), 2);

        t.reset_count();
        assert_eq!(t.count(), 0);
        assert_eq!(t.best(), 1.0);
        assert_eq!(t.monitor(), Monitor::TrainingLoss);
    }
}
