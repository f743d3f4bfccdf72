//! Hysteresis trigger over a characteristic function.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub on: f64,
    pub off: f64,
}

impl Thresholds {
    pub fn new(on: f64, off: f64) -> DetectResult<Self> {
        if !(on.is_finite() && off.is_finite()) || off <= 0.0 || on <= off {
            return Err(DetectError::Configuration(format!(
                "trigger thresholds need on > off > 0, got on={} off={}",
                on, off
            )));
        }
        Ok(Self { on, off })
    }
}

/// A closed trigger: `onset < offset`, both sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub onset: usize,
    pub offset: usize,
}

impl TriggerEvent {
    pub fn duration_samples(&self) -> usize {
        self.offset - self.onset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    Triggered { onset: usize },
}

impl TriggerState {
    /// Feeds one sample. Returns the next state and the event closed by this
    /// sample, if any.
    pub fn step(self, index: usize, value: f64, thresholds: &Thresholds) -> (Self, Option<TriggerEvent>) {
        match self {
            TriggerState::Idle if value >= thresholds.on => (TriggerState::Triggered { onset: index }, None),
            TriggerState::Triggered { onset } if index > onset && value <= thresholds.off => {
                (TriggerState::Idle, Some(TriggerEvent { onset, offset: index }))
            }
            state => (state, None),
        }
    }
}

/// Scans `cft` once and returns every closed trigger in onset order.
///
/// A trigger still open when the data runs out is dropped.
pub fn detect_triggers(cft: &[f64], thr_on: f64, thr_off: f64) -> DetectResult<Vec<TriggerEvent>> {
    let thresholds = Thresholds::new(thr_on, thr_off)?;
    let mut events = Vec::new();
    let mut state = TriggerState::Idle;

    for (index, &value) in cft.iter().enumerate() {
        let (next, event) = state.step(index, value, &thresholds);
        events.extend(event);
        state = next;
    }

    if let TriggerState::Triggered { onset } = state {
        debug!("Discarding trigger opened at sample {} with no offset before end of data", onset);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let cft = [0.0, 0.0, 0.0, 5.0, 5.0, 1.0, 0.0, 0.0];
        let events = detect_triggers(&cft, 4.0, 1.5).unwrap();
        assert_eq!(events, vec![TriggerEvent { onset: 3, offset: 5 }]);
    }

    #[test]
    fn test_never_on() {
        let cft = [0.0, 1.0, 3.9, 2.0, 0.5];
        assert!(detect_triggers(&cft, 4.0, 1.5).unwrap().is_empty());
        assert!(detect_triggers(&[], 4.0, 1.5).unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_trigger_is_dropped() {
        let cft = [0.0, 5.0, 3.0, 2.0, 1.6];
        assert!(detect_triggers(&cft, 4.0, 1.5).unwrap().is_empty());

        let cft = [0.0, 5.0, 1.0, 0.0, 6.0, 2.0];
        assert_eq!(
            detect_triggers(&cft, 4.0, 1.5).unwrap(),
            vec![TriggerEvent { onset: 1, offset: 2 }]
        );
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let cft = [4.0, 1.5];
        assert_eq!(
            detect_triggers(&cft, 4.0, 1.5).unwrap(),
            vec![TriggerEvent { onset: 0, offset: 1 }]
        );
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        // Values between off and on neither open nor close a trigger.
        let cft = [3.0, 4.5, 3.0, 2.0, 4.5, 3.0, 1.0, 3.0, 3.9, 1.0];
        let events = detect_triggers(&cft, 4.0, 1.5).unwrap();
        assert_eq!(events, vec![TriggerEvent { onset: 1, offset: 6 }]);
    }

    #[test]
    fn test_events_ordered_and_respect_thresholds() {
        let cft: Vec<f64> = (0..500).map(|i| 3.0 + 3.0 * (i as f64 * 0.07).sin()).collect();
        let (on, off) = (5.0, 1.0);
        let events = detect_triggers(&cft, on, off).unwrap();
        assert!(events.len() > 2);
        for e in &events {
            assert!(e.onset < e.offset);
            assert!(cft[e.onset] >= on);
            assert!(cft[e.offset] <= off);
        }
        for pair in events.windows(2) {
            assert!(pair[0].onset < pair[1].onset);
            assert!(pair[0].offset <= pair[1].onset);
        }
    }

    #[test]
    fn test_step_transitions() {
        let t = Thresholds::new(4.0, 1.5).unwrap();
        assert_eq!(TriggerState::Idle.step(0, 1.0, &t), (TriggerState::Idle, None));
        assert_eq!(TriggerState::Idle.step(7, 4.0, &t), (TriggerState::Triggered { onset: 7 }, None));
        let open = TriggerState::Triggered { onset: 7 };
        assert_eq!(open.step(8, 2.0, &t), (open, None));
        assert_eq!(open.step(8, 9.0, &t), (open, None));
        assert_eq!(
            open.step(9, 1.5, &t),
            (TriggerState::Idle, Some(TriggerEvent { onset: 7, offset: 9 }))
        );
        assert_eq!(TriggerState::Idle.step(3, f64::NAN, &t), (TriggerState::Idle, None));
    }

    #[test]
    fn test_invalid_thresholds() {
        for (on, off) in [(1.5, 4.0), (2.0, 2.0), (4.0, 0.0), (4.0, -1.0), (f64::INFINITY, 1.0)] {
            assert!(matches!(
                detect_triggers(&[0.0], on, off),
                Err(DetectError::Configuration(_))
            ));
        }
    }
}
