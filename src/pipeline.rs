use log::{debug, info};

use crate::catalog::{build_catalog, CatalogRecord};
use crate::config::DetectParams;
use crate::error::DetectResult;
use crate::filter::BandpassFilter;
use crate::stalta::{compute_characteristic_function, TriggerWindow};
use crate::trace::Trace;
use crate::trigger::{detect_triggers, TriggerEvent};

/// Everything one run of the detector produced for a trace.
#[derive(Debug, Clone)]
pub struct Detection {
    pub filtered: Vec<f64>,
    pub characteristic: Vec<f64>,
    pub window: TriggerWindow,
    pub events: Vec<TriggerEvent>,
    pub records: Vec<CatalogRecord>,
}

/// Filter, STA/LTA, trigger and catalog, in that order.
///
/// The sample rate of `trace` is used as-is; rate overrides are applied when
/// the trace is loaded.
pub fn detect(trace: &Trace, params: &DetectParams, label: &str) -> DetectResult<Detection> {
    let sample_rate = trace.sample_rate();
    let filter = BandpassFilter::design(&params.band, sample_rate)?;
    let window = TriggerWindow::from_seconds(params.sta_seconds, params.lta_seconds, sample_rate)?;

    info!(
        "Detecting on {} ({} samples, {:.3} Hz): band {}-{} Hz, sta={} lta={} samples",
        label,
        trace.len(),
        sample_rate,
        params.band.minfreq,
        params.band.maxfreq,
        window.sta_len,
        window.lta_len
    );

    let filtered = if params.zero_phase {
        filter.apply_zero_phase(trace.samples())?
    } else {
        filter.apply(trace.samples())?
    };

    let characteristic = compute_characteristic_function(&filtered, window.sta_len, window.lta_len)?;
    let events = detect_triggers(&characteristic, params.thr_on, params.thr_off)?;
    for event in &events {
        debug!(
            "Trigger on at {:.3}s, off at {:.3}s ({} samples)",
            event.onset as f64 / sample_rate,
            event.offset as f64 / sample_rate,
            event.duration_samples()
        );
    }

    let records = build_catalog(&events, sample_rate, trace.start_time(), label);
    info!("{}: {} detection(s)", label, records.len());

    Ok(Detection {
        filtered,
        characteristic,
        window,
        events,
        records,
    })
}
