use rand::Rng;

/// Closed interval a mock value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingRange {
    pub min: f64,
    pub max: f64,
}

impl ReadingRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Uniform sample in `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    /// Sample, then round to `decimals` places without leaving the range.
    pub fn sample_rounded<R: Rng + ?Sized>(&self, rng: &mut R, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        let rounded = (self.sample(rng) * factor).round() / factor;
        rounded.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
