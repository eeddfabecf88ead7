//! CLI for attribution-gap — last-touch credit versus segment-level causal uplift.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "attribution-gap")]
#[command(about = "attribution-gap — how much last-touch credit is causally justified?")]
#[command(version = attribution_gap_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic cohort, analyze it, and print the segment report
    Demo {
        /// Cohort configuration JSON (defaults to the reference design)
        #[arg(long)]
        config: Option<String>,

        /// Number of synthetic users
        #[arg(long)]
        users: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Draw from an OS-seeded stream instead of a fixed seed
        #[arg(long, conflicts_with = "seed")]
        unseeded: bool,

        /// Override the cohort-wide exposure probability
        #[arg(long)]
        exposure: Option<f64>,

        /// Write the analysis result as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate a synthetic cohort and write it as a JSON array of user records
    Generate {
        /// Cohort configuration JSON (defaults to the reference design)
        #[arg(long)]
        config: Option<String>,

        /// Number of synthetic users
        #[arg(long)]
        users: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Draw from an OS-seeded stream instead of a fixed seed
        #[arg(long, conflicts_with = "seed")]
        unseeded: bool,

        /// Override the cohort-wide exposure probability
        #[arg(long)]
        exposure: Option<f64>,

        /// Output path for the population
        #[arg(long)]
        output: String,
    },

    /// Analyze an externally supplied population (JSON array of user records)
    Analyze {
        /// Population JSON produced by `generate` or an external pipeline
        #[arg(long)]
        input: String,

        /// Cohort configuration JSON naming the segments and channels to expect
        #[arg(long)]
        config: Option<String>,

        /// Write the analysis result as JSON
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            config,
            users,
            seed,
            unseeded,
            exposure,
            output,
        } => commands::demo::run(commands::demo::DemoCommandConfig {
            cohort: commands::CohortOverrides {
                config_path: config.as_deref(),
                users,
                seed,
                unseeded,
                exposure,
            },
            output_path: output.as_deref(),
        }),
        Commands::Generate {
            config,
            users,
            seed,
            unseeded,
            exposure,
            output,
        } => commands::generate::run(
            commands::CohortOverrides {
                config_path: config.as_deref(),
                users,
                seed,
                unseeded,
                exposure,
            },
            &output,
        ),
        Commands::Analyze {
            input,
            config,
            output,
        } => commands::analyze::run(&input, config.as_deref(), output.as_deref()),
    }
}
