//! Arena geometry - ring radii as a function of elapsed round time

/// Inner radius shrink per tick
const SHRINK_PER_TICK: f32 = 2.0 / 3.0;

/// Shape of the contracting arena for a given round length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaGeometry {
    round_length: u32,
}

impl ArenaGeometry {
    pub fn new(round_length: u32) -> Self {
        Self { round_length }
    }

    pub fn round_length(&self) -> u32 {
        self.round_length
    }

    /// Radius players must stay inside to remain in play
    pub fn inner_radius(&self, elapsed: u32) -> f32 {
        let remaining = self.round_length - elapsed.min(self.round_length);
        remaining as f32 * SHRINK_PER_TICK
    }

    /// Radius beyond which out-of-play players are kicked
    pub fn outer_radius(&self, elapsed: u32) -> f32 {
        self.inner_radius(elapsed) + self.inner_radius(0)
    }

    /// Nominal extent of the playfield
    pub fn grid_size(&self) -> f32 {
        self.outer_radius(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn radii_at_round_start() {
        let geometry = ArenaGeometry::new(1500);
        assert_eq!(geometry.inner_radius(0), 1000.0);
        assert_eq!(geometry.outer_radius(0), 2000.0);
        assert_eq!(geometry.grid_size(), 2000.0);
    }

    #[test]
    fn inner_radius_reaches_zero_at_round_end() {
        let geometry = ArenaGeometry::new(1500);
        assert_eq!(geometry.inner_radius(1500), 0.0);
        assert_eq!(geometry.outer_radius(1500), 1000.0);
    }

    #[test]
    fn elapsed_past_round_end_is_clamped() {
        let geometry = ArenaGeometry::new(300);
        assert_eq!(geometry.inner_radius(10_000), 0.0);
    }

    proptest! {
        #[test]
        fn outer_always_exceeds_inner(round_length in 1u32..10_000, frac in 0.0f64..1.0) {
            let geometry = ArenaGeometry::new(round_length);
            let t = ((round_length as f64) * frac) as u32;
            prop_assume!(t < round_length);
            let inner = geometry.inner_radius(t);
            let outer = geometry.outer_radius(t);
            prop_assert!(inner >= 0.0);
            prop_assert!(outer > inner);
        }

        #[test]
        fn inner_radius_is_non_increasing(round_length in 1u32..10_000, t in 0u32..10_000) {
            let geometry = ArenaGeometry::new(round_length);
            prop_assert!(geometry.inner_radius(t + 1) <= geometry.inner_radius(t));
        }
    }
}
