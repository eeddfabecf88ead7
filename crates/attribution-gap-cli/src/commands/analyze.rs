use std::path::Path;

use attribution_gap_core::{AnalysisResult, CohortConfig, HeterogeneityAnalyzer, parse_population};

/// Load a population file and analyze it against the configured segments.
pub fn analyze_file(input: &Path, config: &CohortConfig) -> Result<AnalysisResult, String> {
    let raw = std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {e}", input.display()))?;
    let records = parse_population(&raw).map_err(|e| format!("Invalid population: {e}"))?;
    let analyzer =
        HeterogeneityAnalyzer::from_config(config).map_err(|e| format!("Invalid configuration: {e}"))?;
    log::debug!("loaded {} records from {}", records.len(), input.display());
    analyzer
        .analyze(&records)
        .map_err(|e| format!("Invalid population: {e}"))
}

pub fn run(input: &str, config_path: Option<&str>, output_path: Option<&str>) {
    let config = super::load_config(super::CohortOverrides {
        config_path,
        ..super::CohortOverrides::default()
    });

    let result = match analyze_file(Path::new(input), &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!("Analyzing population from {input}\n");
    super::print_report(&result);

    if let Some(path) = output_path {
        match super::write_json(path, &result) {
            Ok(()) => println!("\nResults written to {path}"),
            Err(e) => eprintln!("\n{e}"),
        }
    }
}
