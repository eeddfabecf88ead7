//! Latent behavioral segments and their hidden causal parameters.
//!
//! Segments form a closed set. Each configured segment carries one
//! [`SegmentProfile`]: the prior weight used to draw membership, the organic
//! (untreated) conversion probability, and the additive lift from exposure.
//! Only the generator reads these parameters; the analyzer has to recover the
//! lift from observed outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Psychographic segment a synthetic user belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    /// Low organic intent; converts mostly when pushed by media.
    #[serde(rename = "Passive Explorer")]
    PassiveExplorer,
    /// Price-driven; moderate baseline and moderate lift.
    #[serde(rename = "Deal Hunter")]
    DealHunter,
    /// Converts anyway; media spend on this segment is mostly redundant.
    #[serde(rename = "Loyalist")]
    Loyalist,
    /// Deliberate searchers; last-touch tends to credit Search for them.
    #[serde(rename = "High-Intent")]
    HighIntent,
    /// Shallow intent; only used by two-segment cohorts.
    #[serde(rename = "Low-Intent")]
    LowIntent,
}

impl Segment {
    /// Every segment the engine knows about, in reporting order.
    pub const ALL: [Segment; 5] = [
        Segment::PassiveExplorer,
        Segment::DealHunter,
        Segment::Loyalist,
        Segment::HighIntent,
        Segment::LowIntent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PassiveExplorer => "Passive Explorer",
            Self::DealHunter => "Deal Hunter",
            Self::Loyalist => "Loyalist",
            Self::HighIntent => "High-Intent",
            Self::LowIntent => "Low-Intent",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .into_iter()
            .find(|seg| seg.as_str() == s.trim())
            .ok_or_else(|| ConfigurationError::UnknownSegment(s.to_string()))
    }
}

/// Preferred last-touch channel for a segment.
///
/// When an exposed user of the segment converts, the preferred channel is
/// credited with probability `strength`; otherwise the channel is drawn
/// uniformly from all configured channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAffinity {
    pub channel: String,
    pub strength: f64,
}

impl ChannelAffinity {
    pub fn new(channel: impl Into<String>, strength: f64) -> Self {
        Self {
            channel: channel.into(),
            strength,
        }
    }
}

/// Hidden causal parameters for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: Segment,
    /// Categorical weight used when drawing segment membership.
    pub prior: f64,
    /// Probability of converting without any media exposure.
    pub baseline_probability: f64,
    /// Additive conversion lift when exposed.
    pub treatment_effect: f64,
    /// Overrides the cohort-wide exposure probability for this segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_affinity: Option<ChannelAffinity>,
}

impl SegmentProfile {
    pub fn new(segment: Segment, prior: f64, baseline_probability: f64, treatment_effect: f64) -> Self {
        Self {
            segment,
            prior,
            baseline_probability,
            treatment_effect,
            exposure_probability: None,
            channel_affinity: None,
        }
    }

    pub fn with_affinity(mut self, affinity: ChannelAffinity) -> Self {
        self.channel_affinity = Some(affinity);
        self
    }

    pub fn with_exposure_probability(mut self, p: f64) -> Self {
        self.exposure_probability = Some(p);
        self
    }

    /// Conversion probability for a user of this segment, clamped to [0, 1].
    pub fn conversion_probability(&self, exposed: bool) -> f64 {
        let lift = if exposed { self.treatment_effect } else { 0.0 };
        (self.baseline_probability + lift).clamp(0.0, 1.0)
    }

    /// Check every probability-valued field and the affinity channel.
    pub(crate) fn validate(&self, channels: &[String]) -> Result<(), ConfigurationError> {
        let seg = self.segment;
        check_probability(format!("{seg} prior"), self.prior)?;
        check_probability(format!("{seg} baseline_probability"), self.baseline_probability)?;
        check_probability(format!("{seg} treatment_effect"), self.treatment_effect)?;
        if let Some(p) = self.exposure_probability {
            check_probability(format!("{seg} exposure_probability"), p)?;
        }
        if let Some(affinity) = &self.channel_affinity {
            check_probability(format!("{seg} affinity strength"), affinity.strength)?;
            if !channels.iter().any(|c| c == &affinity.channel) {
                return Err(ConfigurationError::UnknownAffinityChannel {
                    segment: seg,
                    channel: affinity.channel.clone(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn check_probability(name: String, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidProbability { name, value })
    }
}
