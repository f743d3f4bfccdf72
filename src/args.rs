use crate::config::DetectParams;
use crate::util::{order_parser, positive_parser};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "STA/LTA event detection for single-channel seismic traces.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Trace file, or a directory of .csv/.wav traces.
    #[arg(index = 1)]
    pub path: Option<String>,

    /// KDL configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Where to write the detection catalog.
    #[arg(short, long, default_value = "output_catalog.csv")]
    pub output: String,

    #[arg(long, value_parser = positive_parser)]
    pub minfreq: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub maxfreq: Option<f64>,
    #[arg(long, value_parser = order_parser)]
    pub order: Option<usize>,
    #[arg(long)]
    pub zero_phase: bool,

    /// Short-term window, seconds.
    #[arg(long, value_parser = positive_parser)]
    pub sta: Option<f64>,
    /// Long-term window, seconds.
    #[arg(long, value_parser = positive_parser)]
    pub lta: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub thr_on: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub thr_off: Option<f64>,

    /// Overrides the rate read from or inferred for each trace.
    #[arg(long, value_parser = positive_parser)]
    pub sample_rate: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved parameters as KDL.
    Show,
    /// Print the default configuration file location.
    Path,
}

impl Cli {
    /// Command-line values win over the configuration file.
    pub fn apply_overrides(&self, params: &mut DetectParams) {
        if let Some(v) = self.minfreq {
            params.band.minfreq = v;
        }
        if let Some(v) = self.maxfreq {
            params.band.maxfreq = v;
        }
        if let Some(v) = self.order {
            params.band.order = v;
        }
        if self.zero_phase {
            params.zero_phase = true;
        }
        if let Some(v) = self.sta {
            params.sta_seconds = v;
        }
        if let Some(v) = self.lta {
            params.lta_seconds = v;
        }
        if let Some(v) = self.thr_on {
            params.thr_on = v;
        }
        if let Some(v) = self.thr_off {
            params.thr_off = v;
        }
        if self.sample_rate.is_some() {
            params.sample_rate = self.sample_rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "seispick",
            "data",
            "--minfreq",
            "1.0",
            "--lta",
            "600s",
            "--thr-on",
            "3",
            "--zero-phase",
        ]);
        assert_eq!(cli.path.as_deref(), Some("data"));
        assert_eq!(cli.output, "output_catalog.csv");

        let mut params = DetectParams::default();
        cli.apply_overrides(&mut params);
        assert_eq!(params.band.minfreq, 1.0);
        assert_eq!(params.band.maxfreq, 1.0);
        assert_eq!(params.lta_seconds, 600.0);
        assert_eq!(params.thr_on, 3.0);
        assert!(params.zero_phase);
        assert_eq!(params.sample_rate, None);
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::parse_from(["seispick", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config { action: ConfigAction::Show })
        ));
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["seispick", "data", "--order", "0"]).is_err());
        assert!(Cli::try_parse_from(["seispick", "data", "--thr-off", "-1"]).is_err());
    }
}
