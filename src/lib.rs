pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod input;
pub mod pipeline;
pub mod stalta;
pub mod trace;
pub mod trigger;
pub mod util;

pub use catalog::{build_catalog, CatalogRecord};
pub use error::DetectError;
pub use filter::apply_bandpass;
pub use pipeline::{detect, Detection};
pub use stalta::compute_characteristic_function;
pub use trace::Trace;
pub use trigger::{detect_triggers, TriggerEvent};
