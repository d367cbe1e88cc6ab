//! Saturating streak counter with decay.
//!
//! One instance per gesture category.  Consistent frames bump it, a
//! contradicting frame resets it, and frames with no usable evidence only
//! decay it so a single dropout cannot erase a streak.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakCounter {
    value: u32,
    cap:   u32,
}

impl StreakCounter {
    pub fn new(cap: u32) -> Self {
        StreakCounter { value: 0, cap: cap.max(1) }
    }

    pub fn value(&self) -> u32 { self.value }

    /// Count one more consistent frame, saturating at the cap.
    pub fn bump(&mut self) {
        self.value = (self.value + 1).min(self.cap);
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Step toward zero without going below it.
    pub fn decay(&mut self, step: u32) {
        self.value = self.value.saturating_sub(step);
    }

    pub fn reached(&self, threshold: u32) -> bool {
        self.value >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_saturates_at_cap() {
        let mut c = StreakCounter::new(3);
        for _ in 0..10 { c.bump(); }
        assert_eq!(c.value(), 3);
    }

    #[test]
    fn decay_stops_at_zero() {
        let mut c = StreakCounter::new(10);
        c.bump();
        c.decay(5);
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn decay_keeps_most_of_a_streak() {
        let mut c = StreakCounter::new(10);
        for _ in 0..4 { c.bump(); }
        c.decay(1);
        assert_eq!(c.value(), 3);
        assert!(!c.reached(4));
        c.bump();
        assert!(c.reached(4));
    }

    #[test]
    fn zero_cap_is_clamped() {
        let mut c = StreakCounter::new(0);
        c.bump();
        assert!(c.reached(1));
    }
}
