//! Seeded synthetic prepared dataset with a known weather signal.
//!
//! The response is a linear function of the trend and three covariates plus
//! Gaussian noise, so the generating coefficients double as a ready-made
//! `LinearSurrogate` for demos and tests.

use std::f64::consts::TAU;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DEFAULT_TREND_COLUMN, PreparedDataset};
use crate::error::AppError;
use crate::models::{LinearSurrogate, LinearTerm};

/// Concentration level on the first day.
const BASE_LEVEL: f64 = 40.0;
/// Trend per second of `date_unix` (about -0.32 units per year).
const TREND_PER_SECOND: f64 = -1.0e-8;
const WS_EFFECT: f64 = -2.0;
const TEMP_EFFECT: f64 = 0.4;
const RH_EFFECT: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub rows: usize,
    pub start: NaiveDate,
    pub seed: u64,
    /// Standard deviation of the response noise.
    pub noise_sd: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rows: 365,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            seed: 42,
            noise_sd: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub dataset: PreparedDataset,
    /// The generating model, with a small diagonal coefficient covariance.
    pub model: LinearSurrogate,
}

/// Generate `config.rows` daily observations starting at `config.start`.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    if config.rows == 0 {
        return Err(AppError::invalid_input("Synthetic row count must be > 0."));
    }
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::invalid_input(format!("Noise distribution error: {e}")))?;
    let unit = Normal::new(0.0_f64, 1.0)
        .map_err(|e| AppError::invalid_input(format!("Noise distribution error: {e}")))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = config
        .start
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::invalid_input("Invalid synthetic start date."))?;
    let t0 = start.and_utc().timestamp() as f64;
    let intercept = BASE_LEVEL - TREND_PER_SECOND * t0;

    let mut dates = Vec::with_capacity(config.rows);
    let mut trend = Vec::with_capacity(config.rows);
    let mut ws = Vec::with_capacity(config.rows);
    let mut air_temp = Vec::with_capacity(config.rows);
    let mut rh = Vec::with_capacity(config.rows);
    let mut value = Vec::with_capacity(config.rows);

    for i in 0..config.rows {
        let date = start + Duration::days(i as i64);
        let t = date.and_utc().timestamp() as f64;
        let season = (TAU * date.ordinal0() as f64 / 365.25).cos();

        let w = (3.0 + 1.5 * unit.sample(&mut rng)).abs();
        let temp = 10.0 - 8.0 * season + 2.0 * unit.sample(&mut rng);
        let h = (70.0 + 10.0 * unit.sample(&mut rng)).clamp(20.0, 100.0);

        let y = intercept
            + TREND_PER_SECOND * t
            + WS_EFFECT * w
            + TEMP_EFFECT * temp
            + RH_EFFECT * h
            + noise.sample(&mut rng);

        dates.push(date);
        trend.push(t);
        ws.push(w);
        air_temp.push(temp);
        rh.push(h);
        value.push(y);
    }

    let dataset = PreparedDataset::new(dates)
        .with_column(DEFAULT_TREND_COLUMN, trend)?
        .with_column("ws", ws)?
        .with_column("air_temp", air_temp)?
        .with_column("rh", rh)?
        .with_column("value", value)?;

    let terms = [
        (DEFAULT_TREND_COLUMN, TREND_PER_SECOND),
        ("ws", WS_EFFECT),
        ("air_temp", TEMP_EFFECT),
        ("rh", RH_EFFECT),
    ]
    .into_iter()
    .map(|(name, coefficient)| LinearTerm {
        name: name.to_string(),
        coefficient,
    })
    .collect();

    let variances = [0.25, 1.0e-20, 0.01, 0.0025, 0.0001];
    let covariance = (0..variances.len())
        .map(|i| {
            (0..variances.len())
                .map(|j| if i == j { variances[i] } else { 0.0 })
                .collect()
        })
        .collect();

    Ok(SyntheticData {
        dataset,
        model: LinearSurrogate::new(intercept, terms, Some(covariance)),
    })
}
