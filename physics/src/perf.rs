use std::time::Duration;

/// Smoothed timings of the last steps, in milliseconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Perf {
    pub total: f32,
    pub broad: f32,
    pub resolve: f32,
    pub position: f32,
}

fn smooth(value: &mut f32, sample: Duration) {
    *value = *value * 0.9 + sample.as_secs_f32() * 1000.0 * 0.1;
}

impl Perf {
    pub fn add_total(&mut self, sample: Duration) {
        smooth(&mut self.total, sample);
    }

    pub fn add_broad(&mut self, sample: Duration) {
        smooth(&mut self.broad, sample);
    }

    pub fn add_resolve(&mut self, sample: Duration) {
        smooth(&mut self.resolve, sample);
    }

    pub fn add_position(&mut self, sample: Duration) {
        smooth(&mut self.position, sample);
    }
}
