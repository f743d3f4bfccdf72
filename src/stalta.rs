//! Classic STA/LTA characteristic function.
//!
//! Both averages are trailing windows of squared amplitude that end at the
//! current sample. Samples before the long window has filled are reported as
//! zero so they can never fire a trigger.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Short- and long-term window lengths, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerWindow {
    pub sta_len: usize,
    pub lta_len: usize,
}

impl TriggerWindow {
    pub fn new(sta_len: usize, lta_len: usize) -> DetectResult<Self> {
        if sta_len < 1 || lta_len < 1 || sta_len >= lta_len {
            return Err(DetectError::InvalidWindow { sta_len, lta_len, len: 0 });
        }
        Ok(Self { sta_len, lta_len })
    }

    /// Converts window durations to sample counts, rounding down.
    pub fn from_seconds(sta_seconds: f64, lta_seconds: f64, sample_rate: f64) -> DetectResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DetectError::Configuration(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if !(sta_seconds > 0.0 && lta_seconds > 0.0) {
            return Err(DetectError::Configuration(format!(
                "window lengths must be positive, got sta={}s lta={}s",
                sta_seconds, lta_seconds
            )));
        }
        Self::new(seconds_to_samples(sta_seconds, sample_rate), seconds_to_samples(lta_seconds, sample_rate))
    }

    pub fn check_fits(&self, len: usize) -> DetectResult<()> {
        if self.lta_len > len {
            return Err(DetectError::InvalidWindow {
                sta_len: self.sta_len,
                lta_len: self.lta_len,
                len,
            });
        }
        Ok(())
    }
}

pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    (seconds * sample_rate).floor() as usize
}

/// STA/LTA ratio for every sample of `samples`, using rolling sums.
pub fn compute_characteristic_function(samples: &[f64], sta_len: usize, lta_len: usize) -> DetectResult<Vec<f64>> {
    let window = TriggerWindow::new(sta_len, lta_len).map_err(|_| DetectError::InvalidWindow {
        sta_len,
        lta_len,
        len: samples.len(),
    })?;
    window.check_fits(samples.len())?;

    let energy: Vec<f64> = samples.iter().map(|&x| x * x).collect();
    let mut cft = vec![0.0; samples.len()];
    let mut sta = RollingEnergy::new(sta_len);
    let mut lta = RollingEnergy::new(lta_len);

    for i in 0..energy.len() {
        sta.push(&energy, i);
        lta.push(&energy, i);
        if i + 1 < lta_len {
            continue;
        }
        let lta_mean = lta.mean();
        cft[i] = if lta_mean > 0.0 { sta.mean() / lta_mean } else { 0.0 };
    }

    debug!(
        "STA/LTA over {} samples (sta={}, lta={}), peak ratio {:.3}",
        samples.len(),
        sta_len,
        lta_len,
        cft.iter().cloned().fold(0.0, f64::max)
    );
    Ok(cft)
}

/// Trailing energy sum over a fixed window.
///
/// The sum is recomputed from the window every `len` samples, which bounds
/// add/subtract drift at amortized O(1). The nonzero count makes a window of
/// exact zeros read as exactly zero whatever residue the sum carries.
struct RollingEnergy {
    len: usize,
    sum: f64,
    nonzero: usize,
}

impl RollingEnergy {
    fn new(len: usize) -> Self {
        Self { len, sum: 0.0, nonzero: 0 }
    }

    fn push(&mut self, energy: &[f64], i: usize) {
        self.sum += energy[i];
        if energy[i] != 0.0 {
            self.nonzero += 1;
        }
        if i >= self.len {
            let leaving = energy[i - self.len];
            self.sum -= leaving;
            if leaving != 0.0 {
                self.nonzero -= 1;
            }
        }
        if (i + 1) % self.len == 0 {
            self.sum = energy[i + 1 - self.len..=i].iter().sum();
        }
    }

    fn mean(&self) -> f64 {
        if self.nonzero == 0 {
            return 0.0;
        }
        self.sum.max(0.0) / self.len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(samples: &[f64], sta_len: usize, lta_len: usize) -> Vec<f64> {
        (0..samples.len())
            .map(|i| {
                if i + 1 < lta_len {
                    return 0.0;
                }
                let mean_sq = |len: usize| samples[i + 1 - len..=i].iter().map(|x| x * x).sum::<f64>() / len as f64;
                let lta = mean_sq(lta_len);
                if lta > 0.0 { mean_sq(sta_len) / lta } else { 0.0 }
            })
            .collect()
    }

    #[test]
    fn test_length_and_warm_up() {
        let samples: Vec<f64> = (0..300).map(|i| (i as f64 * 0.3).sin() + 1.5).collect();
        let cft = compute_characteristic_function(&samples, 10, 50).unwrap();
        assert_eq!(cft.len(), samples.len());
        assert!(cft[..49].iter().all(|&v| v == 0.0));
        assert!(cft[49] > 0.0);
    }

    #[test]
    fn test_constant_signal_is_unity() {
        let cft = compute_characteristic_function(&vec![2.0; 100], 5, 20).unwrap();
        for &v in &cft[19..] {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_silence_is_zero() {
        let cft = compute_characteristic_function(&vec![0.0; 64], 4, 16).unwrap();
        assert!(cft.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_silence_after_loud_stretch_is_zero() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut samples: Vec<f64> = (0..3000)
                .map(|_| {
                    let scale = if rng.gen_bool(0.5) { 1e4 } else { 1e-2 };
                    scale * rng.gen_range(-1.0..1.0)
                })
                .collect();
            samples.extend(std::iter::repeat(0.0).take(3000));

            let cft = compute_characteristic_function(&samples, 10, 100).unwrap();
            assert!(cft.iter().all(|v| v.is_finite()));
            assert!(
                cft[3009..].iter().all(|&v| v == 0.0),
                "seed {} left a nonzero ratio in silence",
                seed
            );
            let events = crate::trigger::detect_triggers(&cft, 4.0, 1.5).unwrap();
            assert!(events.iter().all(|e| e.onset < 3000), "seed {}", seed);
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..2000).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let fast = compute_characteristic_function(&samples, 25, 300).unwrap();
        let slow = brute_force(&samples, 25, 300);
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-9 * b.abs().max(1.0));
        }
    }

    #[test]
    fn test_burst_raises_ratio() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut samples: Vec<f64> = (0..1000).map(|_| rng.gen_range(-0.1..0.1)).collect();
        for v in samples[600..650].iter_mut() {
            *v *= 20.0;
        }
        let cft = compute_characteristic_function(&samples, 10, 200).unwrap();
        assert!(cft[..600].iter().all(|&v| v < 4.0));
        assert!(cft[600..650].iter().any(|&v| v > 4.0));
    }

    #[test]
    fn test_window_from_seconds() {
        let window = TriggerWindow::from_seconds(1.0, 10.0, 100.0).unwrap();
        assert_eq!(window, TriggerWindow { sta_len: 100, lta_len: 1000 });
        assert!(matches!(
            compute_characteristic_function(&vec![1.0; 999], window.sta_len, window.lta_len),
            Err(DetectError::InvalidWindow { len: 999, .. })
        ));
        assert!(compute_characteristic_function(&vec![1.0; 1000], window.sta_len, window.lta_len).is_ok());
    }

    #[test]
    fn test_invalid_windows() {
        let samples = vec![1.0; 100];
        for (sta, lta) in [(10, 10), (20, 10), (0, 10), (0, 0), (5, 101)] {
            assert!(
                matches!(
                    compute_characteristic_function(&samples, sta, lta),
                    Err(DetectError::InvalidWindow { .. })
                ),
                "sta={} lta={}",
                sta,
                lta
            );
        }
        assert!(matches!(
            TriggerWindow::from_seconds(0.001, 10.0, 100.0),
            Err(DetectError::InvalidWindow { sta_len: 0, .. })
        ));
    }
}
