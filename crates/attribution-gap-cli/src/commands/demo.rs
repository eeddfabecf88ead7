use attribution_gap_core::{CohortGenerator, HeterogeneityAnalyzer};

pub struct DemoCommandConfig<'a> {
    pub cohort: super::CohortOverrides<'a>,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: DemoCommandConfig<'_>) {
    let config = super::load_config(cfg.cohort);

    println!("{}", "=".repeat(70));
    println!("BEHAVIORAL ATTRIBUTION - CAUSAL HETEROGENEITY ANALYSIS");
    println!("{}", "=".repeat(70));
    println!();

    let analyzer = match HeterogeneityAnalyzer::from_config(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    let mut generator = match CohortGenerator::new(config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    match generator.config().seed {
        Some(seed) => println!(
            "Generating {} synthetic users (seed {seed})...",
            generator.config().population_size
        ),
        None => println!(
            "Generating {} synthetic users (unseeded)...",
            generator.config().population_size
        ),
    }
    let records = generator.generate();

    let result = match analyzer.analyze(&records) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Analysis failed: {e}");
            std::process::exit(1);
        }
    };
    println!();
    super::print_report(&result);
    println!();

    println!("KEY INSIGHTS");
    println!("{}", "-".repeat(70));
    if let Some((segment, gap)) = result.segments_by_efficiency_gap().first() {
        println!(
            "  Largest efficiency gap: {segment} ({} of last-touch credit not causal)",
            super::fmt_pct(Some(*gap))
        );
    }
    for channel in analyzer.channels() {
        if let Some((segment, share)) = super::dominant_segment(&result, channel) {
            if share >= 0.5 {
                println!(
                    "  {channel}: {} of last-touch credit comes from {segment} users",
                    super::fmt_pct(Some(share))
                );
            }
        }
    }
    println!();
    println!("{}", "=".repeat(70));

    if let Some(path) = cfg.output_path {
        match super::write_json(path, &result) {
            Ok(()) => println!("\nResults written to {path}"),
            Err(e) => eprintln!("\n{e}"),
        }
    }
}
