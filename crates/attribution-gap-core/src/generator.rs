//! Synthetic cohort generator.
//!
//! Draws users whose conversions follow a known per-segment causal structure:
//!
//! ```text
//! segment ~ Categorical(prior)
//! exposed ~ Bernoulli(exposure_probability)
//! converted ~ Bernoulli(clamp(baseline + exposed * treatment_effect))
//! value ~ Uniform[min, max) if converted else 0
//! attributed_channel = affinity channel or uniform channel, if converted and exposed
//! ```
//!
//! All draws come from one seedable stream, so a fixed seed reproduces the
//! population exactly.

use log::{debug, warn};
use rand::distr::weighted::WeightedIndex;
use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CohortConfig;
use crate::error::ConfigurationError;
use crate::record::UserRecord;
use crate::segment::SegmentProfile;

/// Generator bound to a validated configuration and a single random stream.
///
/// User ids keep counting across calls, so cohorts drawn from the same
/// generator never share an id.
pub struct CohortGenerator {
    config: CohortConfig,
    segment_index: WeightedIndex<f64>,
    value_dist: Uniform<f64>,
    rng: StdRng,
    next_user_id: u64,
}

impl CohortGenerator {
    pub fn new(config: CohortConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let priors: Vec<f64> = config.segments.iter().map(|p| p.prior).collect();
        let sum: f64 = priors.iter().sum();
        let segment_index = WeightedIndex::new(&priors)
            .map_err(|_| ConfigurationError::PriorsDoNotSumToOne { sum })?;

        let range = config.value_range;
        let value_dist = Uniform::new(range.min, range.max).map_err(|_| {
            ConfigurationError::InvalidValueRange {
                min: range.min,
                max: range.max,
            }
        })?;

        for profile in &config.segments {
            if profile.baseline_probability + profile.treatment_effect > 1.0 {
                warn!(
                    "{}: baseline {} + treatment effect {} exceeds 1, exposed conversion clamped",
                    profile.segment, profile.baseline_probability, profile.treatment_effect
                );
            }
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            config,
            segment_index,
            value_dist,
            rng,
            next_user_id: 0,
        })
    }

    pub fn config(&self) -> &CohortConfig {
        &self.config
    }

    /// Draw `population_size` users as configured.
    pub fn generate(&mut self) -> Vec<UserRecord> {
        self.generate_n(self.config.population_size)
    }

    /// Draw `n` users. `n = 0` returns an empty population.
    pub fn generate_n(&mut self, n: usize) -> Vec<UserRecord> {
        let mut records = Vec::with_capacity(n);
        for _ in 0..n {
            let record = self.draw_user();
            records.push(record);
        }
        debug!(
            "generated {} users ({} converted, seed {:?})",
            records.len(),
            records.iter().filter(|r| r.converted).count(),
            self.config.seed
        );
        records
    }

    fn draw_user(&mut self) -> UserRecord {
        let profile = &self.config.segments[self.segment_index.sample(&mut self.rng)];

        let exposure = profile
            .exposure_probability
            .unwrap_or(self.config.exposure_probability);
        let exposed = self.rng.random_bool(exposure);

        let converted = self.rng.random_bool(profile.conversion_probability(exposed));

        let value = if converted {
            self.value_dist.sample(&mut self.rng)
        } else {
            0.0
        };

        let attributed_channel = if converted && exposed {
            Some(pick_channel(profile, &self.config.channels, &mut self.rng))
        } else {
            None
        };

        let user_id = self.next_user_id;
        self.next_user_id += 1;

        UserRecord {
            user_id,
            segment: profile.segment,
            exposed,
            converted,
            value,
            attributed_channel,
        }
    }
}

/// Last-touch channel for a converted, exposed user of `profile`.
fn pick_channel<R: Rng>(profile: &SegmentProfile, channels: &[String], rng: &mut R) -> String {
    if let Some(affinity) = &profile.channel_affinity {
        if rng.random_bool(affinity.strength) {
            return affinity.channel.clone();
        }
    }
    channels[rng.random_range(0..channels.len())].clone()
}

/// Validate `config` and draw one cohort from it.
pub fn generate(config: &CohortConfig) -> Result<Vec<UserRecord>, ConfigurationError> {
    Ok(CohortGenerator::new(config.clone())?.generate())
}
