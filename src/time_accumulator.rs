use std::time::Duration;

/// Turns variable frame deltas into a whole number of fixed physics steps.
pub struct TimeAccumulator {
    accumulated_time: Duration,
    frame_number: u64,
    num_steps: u32,
    max_steps: u32,
    update_rate: Duration,
    time_dilation: f32,
}

impl TimeAccumulator {
    pub fn new(step_secs: f32) -> Self {
        TimeAccumulator {
            accumulated_time: Duration::from_nanos(0),
            frame_number: 0,
            num_steps: 0,
            max_steps: 4,
            update_rate: Duration::from_secs_f32(step_secs),
            time_dilation: 1.0,
        }
    }

    pub fn update(&mut self, delta: Duration) {
        self.frame_number += 1;
        self.accumulated_time += delta.mul_f32(self.time_dilation);
        self.num_steps = (self.accumulated_time.as_nanos() / self.update_rate.as_nanos()) as u32;
        if self.num_steps > self.max_steps {
            log::warn!(
                "capping physics steps {} from time {} accumulated {} at rate {}",
                self.num_steps,
                delta.as_secs_f64(),
                self.accumulated_time.as_secs_f64(),
                self.update_rate.as_secs_f64(),
            );
            self.accumulated_time = Duration::from_nanos(0);
            self.num_steps = self.max_steps;
        } else {
            self.accumulated_time -= self.update_rate * self.num_steps;
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn step_secs(&self) -> f32 {
        self.update_rate.as_secs_f32()
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn time_dilation(&self) -> f32 {
        self.time_dilation
    }

    pub fn set_time_dilation(&mut self, time_dilation: f32) {
        self.time_dilation = time_dilation.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 64.0;

    #[test]
    fn test_carries_remainder() {
        let mut accum = TimeAccumulator::new(STEP);
        accum.update(Duration::from_millis(40));
        assert_eq!(accum.num_steps(), 2);
        accum.update(Duration::from_millis(10));
        assert_eq!(accum.num_steps(), 1);
        assert_eq!(accum.frame_number(), 2);
    }

    #[test]
    fn test_caps_steps() {
        let mut accum = TimeAccumulator::new(STEP);
        accum.update(Duration::from_secs(1));
        assert_eq!(accum.num_steps(), 4);
        accum.update(Duration::from_millis(5));
        assert_eq!(accum.num_steps(), 0);
    }

    #[test]
    fn test_dilation_scales_time() {
        let mut accum = TimeAccumulator::new(STEP);
        accum.set_time_dilation(0.5);
        accum.update(Duration::from_millis(64));
        assert_eq!(accum.num_steps(), 2);
    }
}
