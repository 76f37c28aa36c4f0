//! Terminal summaries of normalisation output.
//!
//! Formatting lives here so the engine stays free of presentation code.

use std::collections::BTreeSet;

use crate::domain::{Normalised, NormaliseConfig, ObservedPrediction};

/// Summary statistics over the non-missing values of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub n: usize,
    pub missing: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn value_stats(values: impl IntoIterator<Item = f64>) -> ValueStats {
    let mut n = 0;
    let mut missing = 0;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v.is_nan() {
            missing += 1;
            continue;
        }
        n += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    let mean = if n == 0 { f64::NAN } else { sum / n as f64 };
    if n == 0 {
        min = f64::NAN;
        max = f64::NAN;
    }
    ValueStats {
        n,
        missing,
        mean,
        min,
        max,
    }
}

/// Format the run summary plus the first `top_n` output rows.
pub fn format_normalise_summary(output: &Normalised, config: &NormaliseConfig, n_cores: usize, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str("=== metnorm - Meteorological Normalisation ===\n");
    out.push_str(&format!(
        "Trials: {} | replace: {} | se: {} | workers: {}\n",
        config.n_samples,
        yes_no(config.replace),
        yes_no(config.se),
        n_cores,
    ));
    if let Some(vars) = &config.variables {
        out.push_str(&format!("Variables: {}\n", vars.join(", ")));
    }

    match output {
        Normalised::Series(rows) => {
            let stats = value_stats(rows.iter().map(|r| r.value));
            out.push_str(&format!("Output: normalised series, {} dates\n", rows.len()));
            out.push_str(&format_stats(&stats));

            out.push_str("\ndate                 value");
            if output.has_se() {
                out.push_str("        se");
            }
            out.push('\n');
            for r in rows.iter().take(top_n) {
                out.push_str(&format!("{}  {:>10}", r.date.format("%Y-%m-%d %H:%M:%S"), fmt_num(r.value)));
                if let Some(se) = r.se {
                    out.push_str(&format!("  {:>8}", fmt_num(se)));
                }
                out.push('\n');
            }
            if rows.len() > top_n {
                out.push_str(&format!("... {} more\n", rows.len() - top_n));
            }
        }
        Normalised::Ensemble(records) => {
            let trials: BTreeSet<usize> = records.iter().map(|r| r.trial).collect();
            let stats = value_stats(records.iter().map(|r| r.value));
            out.push_str(&format!(
                "Output: raw ensemble, {} records from {} trials\n",
                records.len(),
                trials.len()
            ));
            out.push_str(&format_stats(&stats));
        }
    }

    out
}

/// Format a short summary of observed-weather predictions.
pub fn format_observed_summary(rows: &[ObservedPrediction]) -> String {
    let stats = value_stats(rows.iter().map(|r| r.value));
    let mut out = String::new();
    out.push_str("=== metnorm - Observed-weather Prediction ===\n");
    out.push_str(&format!("Rows: {}\n", rows.len()));
    out.push_str(&format_stats(&stats));
    out
}

fn format_stats(stats: &ValueStats) -> String {
    format!(
        "Value: mean={} | min={} | max={} | missing={}\n",
        fmt_num(stats.mean),
        fmt_num(stats.min),
        fmt_num(stats.max),
        stats.missing
    )
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v:.4}") } else { "-".to_string() }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
