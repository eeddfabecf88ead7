use attribution_gap_core::CohortGenerator;

pub fn run(overrides: super::CohortOverrides<'_>, output_path: &str) {
    let config = super::load_config(overrides);
    let mut generator = match CohortGenerator::new(config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let records = generator.generate();
    let conversions = records.iter().filter(|r| r.converted).count();

    if let Err(e) = super::write_json(output_path, &records) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    println!(
        "Wrote {} users ({} conversions) to {output_path}",
        records.len(),
        conversions
    );
}
