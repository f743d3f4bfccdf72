use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use knuffel::Decode;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::filter::{BandpassSpec, DEFAULT_ORDER};
use crate::trigger::Thresholds;

pub const CONFIG_FILE_NAME: &str = "config.kdl";

/// On-disk configuration. Every node and property is optional; missing values
/// fall back to [`DetectParams::default`].
///
/// ```kdl
/// filter minfreq=0.5 maxfreq=1.0 order=4 zero-phase=false
/// trigger sta=1.0 lta=10.0 on=4.0 off=1.5
/// input sample-rate=100.0
/// ```
#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    #[knuffel(child)]
    pub filter: Option<FilterConfig>,
    #[knuffel(child)]
    pub trigger: Option<TriggerConfig>,
    #[knuffel(child)]
    pub input: Option<InputConfig>,
}

#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[knuffel(property)]
    pub minfreq: Option<f64>,
    #[knuffel(property)]
    pub maxfreq: Option<f64>,
    #[knuffel(property)]
    pub order: Option<u32>,
    #[knuffel(property(name = "zero-phase"))]
    pub zero_phase: Option<bool>,
}

#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[knuffel(property)]
    pub sta: Option<f64>,
    #[knuffel(property)]
    pub lta: Option<f64>,
    #[knuffel(property)]
    pub on: Option<f64>,
    #[knuffel(property)]
    pub off: Option<f64>,
}

#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[knuffel(property(name = "sample-rate"))]
    pub sample_rate: Option<f64>,
}

impl DetectConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&path.display().to_string(), &content)
    }

    pub fn parse(file_name: &str, content: &str) -> anyhow::Result<Self> {
        let config = knuffel::parse(file_name, content)?;
        Ok(config)
    }

    pub fn resolve(&self) -> DetectParams {
        let defaults = DetectParams::default();
        let filter = self.filter.clone().unwrap_or_default();
        let trigger = self.trigger.clone().unwrap_or_default();
        let input = self.input.clone().unwrap_or_default();
        DetectParams {
            band: BandpassSpec {
                minfreq: filter.minfreq.unwrap_or(defaults.band.minfreq),
                maxfreq: filter.maxfreq.unwrap_or(defaults.band.maxfreq),
                order: filter.order.map(|o| o as usize).unwrap_or(defaults.band.order),
            },
            zero_phase: filter.zero_phase.unwrap_or(defaults.zero_phase),
            sta_seconds: trigger.sta.unwrap_or(defaults.sta_seconds),
            lta_seconds: trigger.lta.unwrap_or(defaults.lta_seconds),
            thr_on: trigger.on.unwrap_or(defaults.thr_on),
            thr_off: trigger.off.unwrap_or(defaults.thr_off),
            sample_rate: input.sample_rate.or(defaults.sample_rate),
        }
    }
}

/// Fully resolved detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectParams {
    pub band: BandpassSpec,
    pub zero_phase: bool,
    pub sta_seconds: f64,
    pub lta_seconds: f64,
    pub thr_on: f64,
    pub thr_off: f64,
    /// Overrides whatever rate the input reader infers.
    pub sample_rate: Option<f64>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            band: BandpassSpec { minfreq: 0.5, maxfreq: 1.0, order: DEFAULT_ORDER },
            zero_phase: false,
            sta_seconds: 1.0,
            lta_seconds: 10.0,
            thr_on: 4.0,
            thr_off: 1.5,
            sample_rate: None,
        }
    }
}

impl DetectParams {
    /// Checks everything that does not depend on a trace, so a bad value is
    /// reported once instead of once per input file.
    ///
    /// The Nyquist bound is only known once a rate is; without an override it
    /// is checked per trace.
    pub fn validate(&self) -> DetectResult<()> {
        Thresholds::new(self.thr_on, self.thr_off)?;
        if !(self.sta_seconds > 0.0 && self.sta_seconds < self.lta_seconds && self.lta_seconds.is_finite()) {
            return Err(DetectError::Configuration(format!(
                "window lengths need 0 < sta < lta, got sta={}s lta={}s",
                self.sta_seconds, self.lta_seconds
            )));
        }
        match self.sample_rate {
            Some(rate) => self.band.validate(rate),
            None if self.band.order == 0 => {
                Err(DetectError::Configuration("filter order must be at least 1".into()))
            }
            None if !(self.band.minfreq > 0.0 && self.band.minfreq < self.band.maxfreq) => {
                Err(DetectError::InvalidBand {
                    minfreq: self.band.minfreq,
                    maxfreq: self.band.maxfreq,
                    nyquist: f64::INFINITY,
                })
            }
            None => Ok(()),
        }
    }

    pub fn to_kdl(&self) -> String {
        let mut out = format!(
            "filter minfreq={:?} maxfreq={:?} order={} zero-phase={}\ntrigger sta={:?} lta={:?} on={:?} off={:?}\n",
            self.band.minfreq,
            self.band.maxfreq,
            self.band.order,
            self.zero_phase,
            self.sta_seconds,
            self.lta_seconds,
            self.thr_on,
            self.thr_off,
        );
        if let Some(rate) = self.sample_rate {
            out.push_str(&format!("input sample-rate={:?}\n", rate));
        }
        out
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "seispick", "seispick").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
