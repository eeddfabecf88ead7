//! # attribution-gap-core
//!
//! **How much of what last-touch credits to media would have happened anyway?**
//!
//! `attribution-gap-core` simulates a user population with hidden,
//! segment-specific causal structure and then recovers, per segment, the
//! causal uplift of ad exposure next to the value a naive last-touch rule
//! credits. The difference is the efficiency gap.
//!
//! ## Quick Start
//!
//! ```
//! use attribution_gap_core::{CohortConfig, CohortGenerator, HeterogeneityAnalyzer, Segment};
//!
//! let config = CohortConfig { population_size: 5_000, ..CohortConfig::default() };
//! let records = CohortGenerator::new(config.clone()).unwrap().generate();
//!
//! let analyzer = HeterogeneityAnalyzer::from_config(&config).unwrap();
//! let result = analyzer.analyze(&records).unwrap();
//!
//! let loyalists = result.segment(Segment::Loyalist).unwrap();
//! println!("Loyalist efficiency gap: {:?}", loyalists.efficiency_gap);
//! ```
//!
//! ## Architecture
//!
//! CohortConfig → CohortGenerator → `Vec<UserRecord>` → HeterogeneityAnalyzer → AnalysisResult
//!
//! The analyzer accepts any population that follows the [`UserRecord`]
//! schema; external rows go through [`validate_rows`] first.

pub mod analysis;
pub mod config;
pub mod error;
pub mod generator;
pub mod record;
pub mod segment;

pub use analysis::{
    AnalysisResult, HeterogeneityAnalyzer, LAST_TOUCH_VALUE_FLOOR, ROI_EPSILON, SegmentMetrics,
    Summary,
};
pub use config::{CohortConfig, DEFAULT_POPULATION_SIZE, DEFAULT_SEED, ValueRange};
pub use error::{ConfigurationError, Error, Result, SchemaError};
pub use generator::{CohortGenerator, generate};
pub use record::{RawUserRow, UserRecord, parse_population, validate_rows};
pub use segment::{ChannelAffinity, Segment, SegmentProfile};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
