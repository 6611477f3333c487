// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Linear warmup followed by cosine decay, stepped once per
// optimizer update:
//
//   lr
//    │      ╭──╮
//    │    ╱     ╲__
//    │  ╱          ╲__
//    │╱                ╲___
//    └──────┬───────────────┬── step
//        warmup           total
//
// warmup = floor(total * warmup_ratio)

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmupCosine {
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl WarmupCosine {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { base_lr, warmup_steps, total_steps }
    }

    pub fn from_ratio(base_lr: f64, total_steps: usize, warmup_ratio: f64) -> Self {
        let warmup_steps = (total_steps as f64 * warmup_ratio).floor() as usize;
        Self::new(base_lr, warmup_steps, total_steps)
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Learning rate for the update at `step` (0-based).
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps as f64;
        }

        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1);
        let progress    = (step - self.warmup_steps) as f64 / decay_steps as f64;
        if progress >= 1.0 {
            return 0.0;
        }
        self.base_lr * 0.5 * (1.0 + (PI * progress).cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_warmup_is_linear() {
        let s = WarmupCosine::new(1e-3, 10, 100);
        assert!(close(s.lr_at(0), 0.0));
        assert!(close(s.lr_at(5), 5e-4));
        assert!(close(s.lr_at(10), 1e-3));
    }

    #[test]
    fn test_cosine_midpoint_and_end() {
        let s = WarmupCosine::new(1e-3, 10, 110);
        assert!(close(s.lr_at(60), 5e-4));
        assert!(close(s.lr_at(110), 0.0));
        assert!(close(s.lr_at(500), 0.0));
    }

    #[test]
    fn test_decay_is_monotonic() {
        let s = WarmupCosine::new(5e-5, 3, 40);
        let lrs: Vec<f64> = (3..=40).map(|i| s.lr_at(i)).collect();
        assert!(lrs.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_from_ratio_floors_warmup() {
        let s = WarmupCosine::from_ratio(5e-5, 95, 0.1);
        assert_eq!(s.warmup_steps(), 9);
        assert_eq!(s.total_steps(), 95);
    }

    #[test]
    fn test_no_warmup_starts_at_base() {
        let s = WarmupCosine::from_ratio(2e-4, 50, 0.0);
        assert!(close(s.lr_at(0), 2e-4));
    }
}
