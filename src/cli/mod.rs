//! Command-line parsing for the `metnorm` binary.
//!
//! Parsing stays separate from the engine; `app` maps parsed arguments onto
//! `NormaliseConfig` and dispatches.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::{DEFAULT_N_SAMPLES, DEFAULT_TREND_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "metnorm", version, about = "Meteorological normalisation of pollutant time series")]
pub struct Cli {
    /// Log verbosity.
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resample weather covariates, predict, and average into a normalised series.
    Normalise(NormaliseArgs),
    /// Predict the dataset under its observed weather (no resampling).
    Predict(PredictArgs),
    /// Write a synthetic dataset and its generating linear model.
    Demo(DemoArgs),
}

/// Options shared by commands that load a dataset and a model.
#[derive(Debug, Parser, Clone)]
pub struct InputArgs {
    /// Prepared dataset CSV (needs `date`, the trend column and the model's features).
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    /// Linear surrogate JSON.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Name of the trend column held fixed during resampling.
    #[arg(long, default_value = DEFAULT_TREND_COLUMN)]
    pub trend_column: String,

    /// Threads the model may use inside one prediction call.
    #[arg(long, default_value_t = 1)]
    pub predict_threads: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct NormaliseArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Covariates to resample (comma-separated). Defaults to every model feature except the trend.
    #[arg(long, value_delimiter = ',')]
    pub variables: Option<Vec<String>>,

    /// Number of resampling trials.
    #[arg(short = 'n', long, default_value_t = DEFAULT_N_SAMPLES)]
    pub n_samples: usize,

    /// Resample as a permutation instead of with replacement.
    #[arg(long)]
    pub no_replace: bool,

    /// Also estimate standard errors (slower).
    #[arg(long)]
    pub se: bool,

    /// Output every trial's predictions instead of per-date means.
    #[arg(long)]
    pub raw: bool,

    /// Worker pool size (default: available cores minus one).
    #[arg(long)]
    pub cores: Option<usize>,

    /// Base random seed (default: drawn from entropy).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log progress every fifth trial.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the output to CSV.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    /// Rows to print in the terminal summary.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Also estimate standard errors.
    #[arg(long)]
    pub se: bool,

    /// Write predictions to CSV.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Number of daily rows to generate.
    #[arg(long, default_value_t = 365)]
    pub rows: usize,

    /// Random seed for the synthetic data.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Response noise standard deviation.
    #[arg(long, default_value_t = 2.0)]
    pub noise_sd: f64,

    /// Where to write the dataset CSV.
    #[arg(long, value_name = "CSV")]
    pub data_out: PathBuf,

    /// Where to write the model JSON.
    #[arg(long, value_name = "JSON")]
    pub model_out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_defaults() {
        let cli = Cli::parse_from(["metnorm", "normalise", "--data", "d.csv", "--model", "m.json"]);
        let Command::Normalise(args) = cli.command else {
            panic!("expected normalise");
        };
        assert_eq!(args.n_samples, 300);
        assert!(!args.no_replace && !args.se && !args.raw && !args.verbose);
        assert_eq!(args.input.trend_column, "date_unix");
        assert!(args.variables.is_none());
        assert!(args.cores.is_none());
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn variables_split_on_commas() {
        let cli = Cli::parse_from([
            "metnorm",
            "--log-level",
            "debug",
            "normalise",
            "--data",
            "d.csv",
            "--model",
            "m.json",
            "--variables",
            "ws,air_temp",
            "--cores",
            "3",
        ]);
        let Command::Normalise(args) = cli.command else {
            panic!("expected normalise");
        };
        assert_eq!(args.variables, Some(vec!["ws".to_string(), "air_temp".to_string()]));
        assert_eq!(args.cores, Some(3));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
