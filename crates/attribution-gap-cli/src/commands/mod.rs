pub mod analyze;
pub mod demo;
pub mod generate;

use std::path::Path;

use attribution_gap_core::{AnalysisResult, CohortConfig, Segment};
use serde::Serialize;

/// Command-line overrides layered on top of a cohort configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortOverrides<'a> {
    pub config_path: Option<&'a str>,
    pub users: Option<usize>,
    pub seed: Option<u64>,
    pub unseeded: bool,
    pub exposure: Option<f64>,
}

/// Build the cohort configuration: file (or reference design), then flags.
pub fn build_config(overrides: CohortOverrides<'_>) -> Result<CohortConfig, String> {
    let mut config = match overrides.config_path {
        Some(path) => CohortConfig::from_path(Path::new(path))
            .map_err(|e| format!("Failed to load config {path}: {e}"))?,
        None => CohortConfig::default(),
    };

    if let Some(users) = overrides.users {
        config.population_size = users;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if overrides.unseeded {
        config.seed = None;
    }
    if let Some(exposure) = overrides.exposure {
        config.exposure_probability = exposure;
    }

    config.validate().map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// Like [`build_config`], but exits the process on error.
pub fn load_config(overrides: CohortOverrides<'_>) -> CohortConfig {
    match build_config(overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Pretty-print `value` as JSON to `path`.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("Failed to encode JSON: {e}"))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write {path}: {e}"))
}

/// Percentage with one decimal, or "undefined".
pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "undefined".to_string(),
    }
}

pub fn fmt_multiplier(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}x"),
        None => "undefined".to_string(),
    }
}

/// Dollar amount with thousands separators and no cents.
pub fn fmt_money(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        format!("-${out}")
    } else {
        format!("${out}")
    }
}

/// Print the shared report: totals, segment table, channel credit.
pub fn print_report(result: &AnalysisResult) {
    let s = &result.summary;
    println!("Total Users:       {}", s.total_users);
    println!("Total Conversions: {}", s.total_conversions);
    println!("Total Revenue:     {}", fmt_money(s.total_value));
    println!();

    println!("SEGMENT ANALYSIS");
    println!("{}", "-".repeat(70));
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12}",
        "Segment", "Conv Rate", "Causal Lift", "Waste", "ROI Mult"
    );
    println!("{}", "-".repeat(70));
    for (segment, m) in &result.behavioral {
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>12}",
            segment.as_str(),
            fmt_pct(m.observed_conversion_rate),
            fmt_pct(m.causal_uplift),
            fmt_pct(m.efficiency_gap),
            fmt_multiplier(m.roi_multiplier)
        );
    }
    println!("{}", "-".repeat(70));
    println!();

    println!("Traditional Attribution (last-touch):");
    for (channel, value) in &result.traditional {
        println!("  - {channel:<8}: {}", fmt_money(*value));
    }
    println!();

    println!("Last-touch credit by segment:");
    for (segment, by_channel) in &result.channel_breakdown {
        println!("  Segment: {segment}");
        for (channel, value) in by_channel {
            println!("    - {channel:<8}: {}", fmt_money(*value));
        }
    }
    println!();

    println!("OVERALL EFFICIENCY GAP: {}", fmt_pct(s.mean_efficiency_gap));
}

/// Segment earning the largest share of `channel`'s last-touch credit.
pub fn dominant_segment(result: &AnalysisResult, channel: &str) -> Option<(Segment, f64)> {
    result
        .behavioral
        .keys()
        .filter_map(|seg| result.channel_share(*seg, channel).map(|share| (*seg, share)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}
