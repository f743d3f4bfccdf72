use std::f64::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed};
use log::debug;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

pub const DEFAULT_ORDER: usize = 4;

/// Bilinear-transform constant for a design normalised to a sample rate of 2.
const BILINEAR_K: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassSpec {
    pub minfreq: f64,
    pub maxfreq: f64,
    pub order: usize,
}

impl BandpassSpec {
    pub fn new(minfreq: f64, maxfreq: f64) -> Self {
        Self { minfreq, maxfreq, order: DEFAULT_ORDER }
    }

    pub fn validate(&self, sample_rate: f64) -> DetectResult<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DetectError::Configuration(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if self.order == 0 {
            return Err(DetectError::Configuration("filter order must be at least 1".into()));
        }
        let nyquist = sample_rate / 2.0;
        let ordered = self.minfreq > 0.0 && self.minfreq < self.maxfreq && self.maxfreq < nyquist;
        if !ordered {
            return Err(DetectError::InvalidBand {
                minfreq: self.minfreq,
                maxfreq: self.maxfreq,
                nyquist,
            });
        }
        Ok(())
    }
}

/// Digital Butterworth band-pass held as a cascade of second-order sections.
///
/// The cascade has `order` sections (2 × order poles), each with numerator
/// `1 - z^-2`; the overall gain lives in the first section.
#[derive(Clone)]
pub struct BandpassFilter {
    sections: Vec<Coefficients<f64>>,
}

impl BandpassFilter {
    pub fn design(spec: &BandpassSpec, sample_rate: f64) -> DetectResult<Self> {
        spec.validate(sample_rate)?;
        let sections = butterworth_bandpass_sections(spec.order, spec.minfreq, spec.maxfreq, sample_rate);
        debug!(
            "Designed {}-section band-pass {}-{} Hz at {} Hz",
            sections.len(),
            spec.minfreq,
            spec.maxfreq,
            sample_rate
        );
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Coefficients<f64>] {
        &self.sections
    }

    /// Causal filtering: output `i` only sees inputs up to `i`.
    pub fn apply(&self, samples: &[f64]) -> DetectResult<Vec<f64>> {
        if samples.is_empty() {
            return Err(DetectError::EmptyBuffer);
        }
        let mut stages = self.stages();
        let mut out = samples.to_vec();
        run_cascade(&mut out, &mut stages);
        Ok(out)
    }

    /// Forward then backward pass; no phase shift, squared magnitude response.
    pub fn apply_zero_phase(&self, samples: &[f64]) -> DetectResult<Vec<f64>> {
        if samples.is_empty() {
            return Err(DetectError::EmptyBuffer);
        }
        let mut stages = self.stages();
        let mut out = samples.to_vec();
        forward_backward_filter(&mut out, &mut stages);
        Ok(out)
    }

    /// Magnitude of the cascade's frequency response at `freq` Hz.
    pub fn gain_at(&self, freq: f64, sample_rate: f64) -> f64 {
        let z_inv = Complex::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        let z_inv2 = z_inv * z_inv;
        self.sections
            .iter()
            .map(|c| {
                let num = z_inv2 * c.b2 + z_inv * c.b1 + c.b0;
                let den = z_inv2 * c.a2 + z_inv * c.a1 + 1.0;
                (num / den).norm()
            })
            .product()
    }

    fn stages(&self) -> Vec<DirectForm2Transposed<f64>> {
        self.sections.iter().map(|c| DirectForm2Transposed::<f64>::new(*c)).collect()
    }
}

/// Designs and applies a causal band-pass in one call.
pub fn apply_bandpass(
    samples: &[f64],
    sample_rate: f64,
    minfreq: f64,
    maxfreq: f64,
    order: usize,
) -> DetectResult<Vec<f64>> {
    let spec = BandpassSpec { minfreq, maxfreq, order };
    BandpassFilter::design(&spec, sample_rate)?.apply(samples)
}

fn run_cascade<F: Biquad<f64>>(signal: &mut [f64], stages: &mut [F]) {
    signal
        .iter_mut()
        .for_each(|x| *x = stages.iter_mut().fold(*x, |acc, stage| stage.run(acc)));
    stages.iter_mut().for_each(|stage| stage.reset_state());
}

pub fn forward_backward_filter<F: Biquad<f64>>(signal: &mut [f64], stages: &mut [F]) {
    run_cascade(signal, stages);
    signal.reverse();
    run_cascade(signal, stages);
    signal.reverse();
}

fn butterworth_bandpass_sections(order: usize, minfreq: f64, maxfreq: f64, sample_rate: f64) -> Vec<Coefficients<f64>> {
    // Pre-warped analog band edges.
    let w1 = BILINEAR_K * (PI * minfreq / sample_rate).tan();
    let w2 = BILINEAR_K * (PI * maxfreq / sample_rate).tan();
    let bw = w2 - w1;
    let wo2 = w1 * w2;

    let n = order as i64;
    let mut analog_poles = Vec::with_capacity(2 * order);
    let mut sections = Vec::with_capacity(order);

    for k in 0..n {
        let m = 2 * k - n + 1;
        let proto = -Complex::from_polar(1.0, PI * m as f64 / (2.0 * order as f64));

        // Low-pass to band-pass: each prototype pole splits into two.
        let scaled = proto * (bw / 2.0);
        let root = (scaled * scaled - wo2).sqrt();
        let pair = [scaled + root, scaled - root];
        analog_poles.extend_from_slice(&pair);

        let [z1, z2] = pair.map(bilinear);
        match m {
            // Upper half plane; the lower-half prototypes supply the conjugates.
            m if m < 0 => {
                sections.push(section_from_poles(z1, z1.conj()));
                sections.push(section_from_poles(z2, z2.conj()));
            }
            0 => sections.push(section_from_poles(z1, z2)),
            _ => {}
        }
    }

    // Zeros: `order` at the origin (analog) map to z = 1, the rest at infinity map to z = -1.
    let denom: Complex<f64> = analog_poles
        .iter()
        .map(|p| Complex::new(BILINEAR_K, 0.0) - p)
        .product();
    let gain = (Complex::new((BILINEAR_K * bw).powi(order as i32), 0.0) / denom).re;

    if let Some(first) = sections.first_mut() {
        first.b0 *= gain;
        first.b2 *= gain;
    }
    sections
}

fn bilinear(s: Complex<f64>) -> Complex<f64> {
    let k = Complex::new(BILINEAR_K, 0.0);
    (k + s) / (k - s)
}

fn section_from_poles(p1: Complex<f64>, p2: Complex<f64>) -> Coefficients<f64> {
    Coefficients {
        a1: -(p1 + p2).re,
        a2: (p1 * p2).re,
        b0: 1.0,
        b1: 0.0,
        b2: -1.0,
    }
}
