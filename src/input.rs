use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::trace::Trace;

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "aiff", "aif", "ogg", "mp3", "caf"];

const TIME_ABS_PARSE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const TIME_ABS_PARSE_WHOLE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    match extension(path.as_ref()) {
        Some(ext) => ext == "csv" || AUDIO_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Loads a trace, picking the reader from the file extension.
pub fn load_trace<P: AsRef<Path>>(path: P, sample_rate_override: Option<f64>) -> Result<Trace> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("csv") => load_csv(path, sample_rate_override),
        Some(ext) if AUDIO_EXTENSIONS.contains(&ext) => {
            let trace = load_audio(path)?;
            match sample_rate_override {
                Some(rate) => Ok(Trace::new(trace.samples().to_vec(), rate)?),
                None => Ok(trace),
            }
        }
        _ => bail!("Unsupported file format: {}", path.display()),
    }
}

pub fn load_csv<P: AsRef<Path>>(path: P, sample_rate_override: Option<f64>) -> Result<Trace> {
    let path = path.as_ref();
    info!("Loading CSV trace from {}", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    parse_csv_trace(BufReader::new(file), sample_rate_override)
        .with_context(|| format!("Failed to parse CSV trace: {}", path.display()))
}

/// Reads the catalog-style layout: an optional `time_abs(...)` column, a
/// `time_rel(sec)` column and an amplitude column (`velocity(...)`, or the
/// last column when none is named so).
pub fn parse_csv_trace<R: BufRead>(reader: R, sample_rate_override: Option<f64>) -> Result<Trace> {
    let mut lines = reader.lines();
    let header = lines.next().ok_or_else(|| anyhow!("CSV has no header row"))??;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let find = |prefix: &str| columns.iter().position(|c| c.starts_with(prefix));
    let abs_col = find("time_abs");
    let rel_col = find("time_rel");
    let amp_col = find("velocity").unwrap_or(columns.len() - 1);
    debug!("CSV columns: abs={:?} rel={:?} amplitude={}", abs_col, rel_col, amp_col);

    let mut samples = Vec::new();
    let mut first_abs: Option<String> = None;
    let mut first_rel: Option<f64> = None;
    let mut last_rel: Option<f64> = None;

    for (row, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize| {
            fields
                .get(col)
                .copied()
                .ok_or_else(|| anyhow!("row {} has no column {}", row + 2, col))
        };

        let value: f64 = field(amp_col)?
            .parse()
            .with_context(|| format!("Invalid amplitude on row {}", row + 2))?;
        samples.push(value);

        if let Some(col) = rel_col {
            let t: f64 = field(col)?
                .parse()
                .with_context(|| format!("Invalid relative time on row {}", row + 2))?;
            first_rel.get_or_insert(t);
            last_rel = Some(t);
        }
        if first_abs.is_none() {
            if let Some(col) = abs_col {
                first_abs = Some(field(col)?.to_string());
            }
        }
    }

    let sample_rate = match (sample_rate_override, first_rel, last_rel) {
        (Some(rate), _, _) => rate,
        (None, Some(first), Some(last)) if samples.len() > 1 && last > first => {
            (samples.len() - 1) as f64 / (last - first)
        }
        _ => bail!("Cannot infer sample rate from CSV; set one explicitly"),
    };

    let start_time = first_abs.as_deref().map(parse_time_abs).transpose()?;
    info!(
        "Loaded {} samples at {:.4} Hz (start {})",
        samples.len(),
        sample_rate,
        start_time.map(|t| t.to_string()).unwrap_or_else(|| "unknown".into())
    );
    Ok(Trace::new(samples, sample_rate)?.with_start_time(start_time))
}

fn parse_time_abs(s: &str) -> Result<PrimitiveDateTime> {
    PrimitiveDateTime::parse(s, TIME_ABS_PARSE)
        .or_else(|_| PrimitiveDateTime::parse(s, TIME_ABS_PARSE_WHOLE))
        .with_context(|| format!("Invalid absolute time: {}", s))
}

/// Decodes any container symphonia can probe, averaging channels to one trace.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path = path.as_ref();
    info!("Loading audio trace from {}", path.display());

    let file = File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(BufReader::new(file))), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension(path) {
        hint.with_extension(&ext);
    }

    let probed = get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio format: {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .with_context(|| format!("No decodable track in {}", path.display()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .with_context(|| format!("{} does not declare a sample rate", path.display()))?;

    let mut decoder = get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .with_context(|| "Failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                debug!("Decoder reset required");
                continue;
            }
            // End of stream surfaces as an I/O error.
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) if decoded.frames() > 0 => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f64>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                downmix_into(&mut samples, buf.samples(), spec.channels.count());
            }
            Ok(_) => {}
            Err(SymphoniaError::DecodeError(e)) => debug!("Skipping undecodable packet: {}", e),
            Err(e) => return Err(anyhow!("Decode error in {}: {}", path.display(), e)),
        }
    }

    info!("Loaded {} samples at {} Hz", samples.len(), sample_rate);
    Ok(Trace::new(samples, sample_rate as f64)?)
}

/// Appends one sample per interleaved frame, the mean of its channels.
fn downmix_into(out: &mut Vec<f64>, interleaved: &[f64], channels: usize) {
    match channels {
        0 => {}
        1 => out.extend_from_slice(interleaved),
        n => out.extend(interleaved.chunks_exact(n).map(|frame| frame.iter().sum::<f64>() / n as f64)),
    }
}
