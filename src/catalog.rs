use std::io::Write;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

use crate::trigger::TriggerEvent;

pub const TIME_ABS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");

pub const CATALOG_HEADER: &str = "filename,time_abs(%Y-%m-%dT%H:%M:%S.%f),time_rel(sec)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub filename: String,
    pub absolute_time: Option<PrimitiveDateTime>,
    /// Seconds from the first sample to the onset.
    pub relative_time: f64,
}

impl CatalogRecord {
    pub fn absolute_time_string(&self) -> Option<String> {
        self.absolute_time.and_then(|t| t.format(TIME_ABS_FORMAT).ok())
    }
}

/// One record per event, in the order given.
pub fn build_catalog(
    events: &[TriggerEvent],
    sample_rate: f64,
    start_time: Option<PrimitiveDateTime>,
    filename: &str,
) -> Vec<CatalogRecord> {
    events
        .iter()
        .map(|event| {
            let relative_time = event.onset as f64 / sample_rate;
            let absolute_time = start_time.and_then(|start| {
                let shifted = start.checked_add(Duration::microseconds((relative_time * 1e6).round() as i64));
                if shifted.is_none() {
                    debug!(
                        "{}: onset at {}s from {} is out of calendar range, leaving time_abs empty",
                        filename, relative_time, start
                    );
                }
                shifted
            });
            CatalogRecord {
                filename: filename.to_string(),
                absolute_time,
                relative_time,
            }
        })
        .collect()
}

/// Writes records as CSV rows under the catalog header.
pub fn write_catalog<W: Write>(mut writer: W, records: &[CatalogRecord]) -> Result<()> {
    writeln!(writer, "{}", CATALOG_HEADER)?;
    for record in records {
        let absolute = match record.absolute_time {
            Some(t) => t
                .format(TIME_ABS_FORMAT)
                .with_context(|| format!("Failed to format detection time for {}", record.filename))?,
            None => String::new(),
        };
        writeln!(
            writer,
            "{},{},{:?}",
            csv_field(&record.filename),
            absolute,
            record.relative_time
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
