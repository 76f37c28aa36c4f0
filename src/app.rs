//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - maps flags onto `NormaliseConfig`
//! - runs the requested workflow and prints a summary
//! - writes optional exports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Command, DemoArgs, LogLevel, NormaliseArgs, PredictArgs};
use crate::data::SyntheticConfig;
use crate::domain::NormaliseConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `metnorm` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Command::Normalise(args) => handle_normalise(args),
        Command::Predict(args) => handle_predict(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(level: LogLevel) -> Result<(), AppError> {
    let level = match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::io(format!("Failed to install logger: {e}")))
}

fn handle_normalise(args: NormaliseArgs) -> Result<(), AppError> {
    let config = normalise_config_from_args(&args);
    let output = pipeline::run_normalise(&args.input.data, &args.input.model, &config)?;

    println!(
        "{}",
        crate::report::format_normalise_summary(&output, &config, config.resolved_n_cores(), args.top)
    );

    if let Some(path) = &args.out {
        crate::io::write_normalised_csv(path, &output)?;
        tracing::info!(path = %path.display(), rows = output.len(), "wrote output");
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let rows = pipeline::run_predict(
        &args.input.data,
        &args.input.model,
        &args.input.trend_column,
        args.se,
        args.input.predict_threads,
    )?;

    println!("{}", crate::report::format_observed_summary(&rows));

    if let Some(path) = &args.out {
        crate::io::write_observed_csv(path, &rows)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote predictions");
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        rows: args.rows,
        seed: args.seed,
        noise_sd: args.noise_sd,
        ..SyntheticConfig::default()
    };
    pipeline::run_demo(&config, &args.data_out, &args.model_out)
}

pub fn normalise_config_from_args(args: &NormaliseArgs) -> NormaliseConfig {
    NormaliseConfig {
        variables: args.variables.clone(),
        n_samples: args.n_samples,
        replace: !args.no_replace,
        se: args.se,
        aggregate: !args.raw,
        n_cores: args.cores,
        verbose: args.verbose,
        seed: args.seed,
        trend_column: args.input.trend_column.clone(),
        predict_threads: args.input.predict_threads,
    }
}
