use thiserror::Error;

/// Failures raised by the detection stages.
///
/// Every stage validates its inputs before doing any work, so an error means
/// nothing was produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("invalid band {minfreq}-{maxfreq} Hz (Nyquist is {nyquist} Hz)")]
    InvalidBand {
        minfreq: f64,
        maxfreq: f64,
        nyquist: f64,
    },
    #[error("sample buffer is empty")]
    EmptyBuffer,
    #[error("invalid trigger window: sta={sta_len}, lta={lta_len} samples for a buffer of {len}")]
    InvalidWindow {
        sta_len: usize,
        lta_len: usize,
        len: usize,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type DetectResult<T> = std::result::Result<T, DetectError>;
