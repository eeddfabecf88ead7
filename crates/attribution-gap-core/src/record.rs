//! User records: the row schema shared by the generator, the analyzer and
//! any external caller.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::segment::Segment;

/// One synthetic (or externally supplied) user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u64,
    pub segment: Segment,
    /// Whether the user saw an ad.
    pub exposed: bool,
    pub converted: bool,
    /// Revenue; positive exactly when `converted`.
    pub value: f64,
    /// Channel a last-touch rule credits. Only set when converted and exposed.
    pub attributed_channel: Option<String>,
}

impl UserRecord {
    /// Check the per-row invariants that do not depend on configuration.
    pub fn check_invariants(&self, row: usize) -> std::result::Result<(), SchemaError> {
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(SchemaError::InvalidValue {
                row,
                value: self.value,
            });
        }
        if (self.value > 0.0) != self.converted {
            return Err(SchemaError::ValueConversionMismatch { row });
        }
        if self.attributed_channel.is_some() && !(self.converted && self.exposed) {
            return Err(SchemaError::AttributionWithoutExposure { row });
        }
        Ok(())
    }
}

/// Loosely-typed input row as it arrives from outside the engine.
///
/// Accepts the legacy column names `saw_ad` and `last_touch`. Extra columns
/// (such as ground-truth parameters) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUserRow {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default, alias = "saw_ad")]
    pub exposed: Option<bool>,
    #[serde(default)]
    pub converted: Option<bool>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, alias = "last_touch")]
    pub attributed_channel: Option<String>,
}

impl RawUserRow {
    fn into_record(self, row: usize) -> std::result::Result<UserRecord, SchemaError> {
        let missing = |field| SchemaError::MissingField { row, field };

        let user_id = self.user_id.ok_or_else(|| missing("user_id"))?;
        let segment_name = self.segment.ok_or_else(|| missing("segment"))?;
        let exposed = self.exposed.ok_or_else(|| missing("exposed"))?;
        let converted = self.converted.ok_or_else(|| missing("converted"))?;
        let value = self.value.ok_or_else(|| missing("value"))?;

        let segment = segment_name
            .parse::<Segment>()
            .map_err(|_| SchemaError::UnknownSegment {
                row,
                segment: segment_name,
            })?;

        let record = UserRecord {
            user_id,
            segment,
            exposed,
            converted,
            value,
            attributed_channel: self.attributed_channel,
        };
        record.check_invariants(row)?;
        Ok(record)
    }
}

/// Convert external rows into typed records, failing on the first bad row.
pub fn validate_rows(rows: Vec<RawUserRow>) -> std::result::Result<Vec<UserRecord>, SchemaError> {
    rows.into_iter()
        .enumerate()
        .map(|(row, raw)| raw.into_record(row))
        .collect()
}

/// Parse a JSON array of rows and validate it.
pub fn parse_population(json: &str) -> Result<Vec<UserRecord>> {
    let rows: Vec<RawUserRow> = serde_json::from_str(json)?;
    Ok(validate_rows(rows)?)
}
