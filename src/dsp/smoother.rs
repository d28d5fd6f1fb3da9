//! One-pole parameter smoothing at control rate.

/*
Parameter Smoothing
===================

Jumping a parameter from one value to another between two blocks is audible
as a click or "zipper" noise. A one-pole lowpass on the parameter value
turns the jump into an exponential glide:

    current += coefficient × (target − current)

After k updates the remaining distance is (1 − coefficient)^k of the
original, so a coefficient of 0.05 closes 95% of the gap in ~59 updates.

We update once per block, not once per sample. At 64-frame blocks and
48 kHz that is 750 updates per second, which is smooth enough for every
parameter in the chain and costs one multiply-add per parameter per block.
*/

/// A parameter that glides toward its target once per `process` call.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coefficient: f32,
}

impl SmoothedParam {
    /// Start settled at `initial`.
    ///
    /// `coefficient` is clamped into (0, 1]; 1.0 means no smoothing.
    pub fn new(initial: f32, coefficient: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coefficient: coefficient.clamp(f32::EPSILON, 1.0),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to `value`, no glide.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one step toward the target and return the new value.
    #[inline]
    pub fn process(&mut self) -> f32 {
        self.current += self.coefficient * (self.target - self.current);
        self.current
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    pub fn is_settled(&self, epsilon: f32) -> bool {
        (self.target - self.current).abs() < epsilon
    }

    /// Number of `process` calls needed to get within `epsilon` of a
    /// target `distance` away.
    pub fn steps_to_settle(&self, distance: f32, epsilon: f32) -> u32 {
        let distance = distance.abs();
        if distance <= epsilon {
            return 0;
        }
        if self.coefficient >= 1.0 {
            return 1;
        }
        let per_step = (1.0 - self.coefficient).ln();
        ((epsilon / distance).ln() / per_step).ceil() as u32
    }
}

/// A fixed set of smoothers sharing one coefficient, addressed by slot.
#[derive(Debug, Clone)]
pub struct SmootherBank<const N: usize> {
    params: [SmoothedParam; N],
}

impl<const N: usize> SmootherBank<N> {
    pub fn new(initial: [f32; N], coefficient: f32) -> Self {
        Self {
            params: initial.map(|value| SmoothedParam::new(value, coefficient)),
        }
    }

    pub fn set_target(&mut self, slot: usize, target: f32) {
        if let Some(param) = self.params.get_mut(slot) {
            param.set_target(target);
        }
    }

    pub fn snap(&mut self, slot: usize, value: f32) {
        if let Some(param) = self.params.get_mut(slot) {
            param.snap(value);
        }
    }

    /// Advance one slot and return its new value.
    #[inline]
    pub fn process(&mut self, slot: usize) -> f32 {
        self.params.get_mut(slot).map_or(0.0, SmoothedParam::process)
    }

    pub fn get(&self, slot: usize) -> Option<&SmoothedParam> {
        self.params.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_slots_are_independent() {
        let mut bank = SmootherBank::new([0.0, 1.0, 2.0], 0.5);
        bank.set_target(0, 1.0);
        assert_eq!(bank.process(0), 0.5);
        assert_eq!(bank.process(1), 1.0);
        assert_eq!(bank.get(2).map(SmoothedParam::value), Some(2.0));

        // Out of range slots are ignored
        bank.set_target(9, 4.0);
        assert_eq!(bank.process(9), 0.0);
    }

    #[test]
    fn test_starts_settled() {
        let mut param = SmoothedParam::new(0.4, 0.05);
        assert_eq!(param.process(), 0.4);
        assert!(param.is_settled(1e-6));
    }

    #[test]
    fn test_distance_shrinks_geometrically() {
        let coefficient = 0.05;
        let mut param = SmoothedParam::new(0.0, coefficient);
        param.set_target(1.0);

        let mut distance = 1.0f32;
        for block in 0..100 {
            param.process();
            let next = (param.target() - param.value()).abs();
            let expected = distance * (1.0 - coefficient);
            assert!(
                (next - expected).abs() < 1e-5,
                "block {}: distance {} expected {}",
                block,
                next,
                expected
            );
            distance = next;
        }
    }

    #[test]
    fn test_settles_within_predicted_steps() {
        let mut param = SmoothedParam::new(-1.0, 0.05);
        param.set_target(1.0);
        let steps = param.steps_to_settle(2.0, 1e-3);
        for _ in 0..steps {
            param.process();
        }
        // Small allowance for f32 accumulation error
        assert!(param.is_settled(1.01e-3), "not settled after {} steps", steps);
    }

    #[test]
    fn test_snap_skips_glide() {
        let mut param = SmoothedParam::new(0.0, 0.05);
        param.snap(0.8);
        assert_eq!(param.value(), 0.8);
        assert_eq!(param.process(), 0.8);
    }

    #[test]
    fn test_coefficient_is_clamped() {
        let param = SmoothedParam::new(0.0, 3.0);
        assert_eq!(param.coefficient(), 1.0);
        let param = SmoothedParam::new(0.0, -1.0);
        assert!(param.coefficient() > 0.0);
    }
}
