use time::PrimitiveDateTime;

use crate::error::{DetectError, DetectResult};

/// A single-channel series handed to the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    samples: Vec<f64>,
    sample_rate: f64,
    start_time: Option<PrimitiveDateTime>,
}

impl Trace {
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> DetectResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DetectError::Configuration(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        Ok(Self { samples, sample_rate, start_time: None })
    }

    pub fn with_start_time(mut self, start_time: Option<PrimitiveDateTime>) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start_time(&self) -> Option<PrimitiveDateTime> {
        self.start_time
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_trace_accessors() {
        let trace = Trace::new(vec![0.0; 250], 100.0)
            .unwrap()
            .with_start_time(Some(datetime!(1970-01-19 00:00:00)));
        assert_eq!(trace.len(), 250);
        assert!((trace.duration() - 2.5).abs() < 1e-12);
        assert_eq!(trace.start_time(), Some(datetime!(1970-01-19 00:00:00)));
    }

    #[test]
    fn test_rejects_bad_sample_rate() {
        assert!(Trace::new(vec![1.0], 0.0).is_err());
        assert!(Trace::new(vec![1.0], f64::NAN).is_err());
        assert!(Trace::new(vec![1.0], -5.0).is_err());
    }
}
