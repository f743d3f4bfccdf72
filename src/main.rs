use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process;
use seispick::args::{Cli, Commands, ConfigAction};
use seispick::catalog::{self, CatalogRecord};
use seispick::config::{self, DetectConfig, DetectParams};
use seispick::{input, pipeline, util};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let params = load_params(&cli)?;

    if let Some(command) = &cli.command {
        match command {
            Commands::Config { action } => match action {
                ConfigAction::Show => print!("{}", params.to_kdl()),
                ConfigAction::Path => match config::default_config_path() {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No configuration directory available."),
                },
            },
        }
        return Ok(());
    }

    let path = cli
        .path
        .as_deref()
        .context("No input path provided")?;
    let inputs = util::collect_inputs(Path::new(path))?;
    if inputs.is_empty() {
        log::warn!("No .csv or audio traces found in {}", path);
    }

    let mut records = Vec::new();
    let mut failures = 0;
    for input_path in &inputs {
        log::info!("Processing file: {}", input_path.display());
        match process_file(input_path, &params) {
            Ok(found) => records.extend(found),
            Err(e) => {
                failures += 1;
                log::warn!("Skipping {}: {:#}", input_path.display(), e);
            }
        }
    }
    if !inputs.is_empty() && failures == inputs.len() {
        bail!("All {} input file(s) failed", failures);
    }

    let file = File::create(&cli.output)
        .with_context(|| format!("Failed to create catalog {}", cli.output))?;
    catalog::write_catalog(BufWriter::new(file), &records)?;
    log::info!("Detection catalog saved to {} ({} detections)", cli.output, records.len());

    Ok(())
}

fn load_params(cli: &Cli) -> Result<DetectParams> {
    let file_config = match &cli.config {
        Some(path) => DetectConfig::load(path)?,
        None => match config::default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                log::debug!("Using config {}", path.display());
                DetectConfig::load(&path)?
            }
            None => DetectConfig::default(),
        },
    };
    let mut params = file_config.resolve();
    cli.apply_overrides(&mut params);
    params.validate().context("Invalid detection parameters")?;
    Ok(params)
}

fn process_file(path: &Path, params: &DetectParams) -> Result<Vec<CatalogRecord>> {
    let trace = input::load_trace(path, params.sample_rate)?;
    let detection = pipeline::detect(&trace, params, &util::catalog_label(path))
        .with_context(|| format!("Detection failed for {}", path.display()))?;
    Ok(detection.records)
}
