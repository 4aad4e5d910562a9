// ============================================================
// Layer 3 — Feature Schema
// ============================================================
// One California block group is described by eight numbers,
// always in this order:
//
//   0 MedInc      median income              >= 0
//   1 HouseAge    median house age           >= 0
//   2 AveRooms    rooms per household        >= 0
//   3 AveBedrms   bedrooms per household     >= 0
//   4 Population  block group population     >= 0
//   5 AveOccup    household members          >= 0
//   6 Latitude                               [-90, 90]
//   7 Longitude                              [-180, 180]
//
// The same order is used by the dataset loader, the fitted
// pipeline and the vectorizer. Changing it invalidates every
// saved artifact.

use std::fmt;

/// Number of input features
pub const N_FEATURES: usize = 8;

/// Feature names in positional order
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// Ordered numeric layout consumed by the pipeline.
pub type FeatureVector = [f64; N_FEATURES];

// ─── FieldRule ────────────────────────────────────────────────────────────────
/// The domain constraint attached to one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    NonNegative,
    Latitude,
    Longitude,
}

/// Rule for each position of FEATURE_NAMES
pub const FIELD_RULES: [FieldRule; N_FEATURES] = [
    FieldRule::NonNegative,
    FieldRule::NonNegative,
    FieldRule::NonNegative,
    FieldRule::NonNegative,
    FieldRule::NonNegative,
    FieldRule::NonNegative,
    FieldRule::Latitude,
    FieldRule::Longitude,
];

impl FieldRule {
    /// Check `value` for the field called `name`.
    /// On failure returns the human-readable reason.
    pub fn check(self, name: &str, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{name} Must Be A Finite Number"));
        }
        match self {
            FieldRule::NonNegative if value < 0.0 => {
                Err(format!("{name} Must Be Non-Negative"))
            }
            FieldRule::Latitude if !(-90.0..=90.0).contains(&value) => {
                Err("Latitude Must Be Between -90 and 90".to_string())
            }
            FieldRule::Longitude if !(-180.0..=180.0).contains(&value) => {
                Err("Longitude Must Be Between -180 and 180".to_string())
            }
            _ => Ok(()),
        }
    }
}

// ─── FeatureRecord ────────────────────────────────────────────────────────────
/// A validated, immutable set of features for one block group.
///
/// The only way to obtain one is through [`FeatureRecord::from_values`]
/// (or the validator, which calls it), so every instance satisfies
/// the domain constraints above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: FeatureVector,
}

/// A constraint violation found while constructing a record
#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    /// Index into FEATURE_NAMES
    pub position: usize,
    pub reason:   String,
}

impl RuleViolation {
    pub fn field(&self) -> &'static str {
        FEATURE_NAMES[self.position]
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field(), self.reason)
    }
}

impl FeatureRecord {
    /// Build a record from values in FEATURE_NAMES order.
    /// Fields are checked in order and the first violation is returned.
    pub fn from_values(values: FeatureVector) -> Result<Self, RuleViolation> {
        for (position, (&value, rule)) in values.iter().zip(FIELD_RULES).enumerate() {
            rule.check(FEATURE_NAMES[position], value)
                .map_err(|reason| RuleViolation { position, reason })?;
        }
        Ok(Self { values })
    }

    pub fn med_inc(&self)    -> f64 { self.values[0] }
    pub fn house_age(&self)  -> f64 { self.values[1] }
    pub fn ave_rooms(&self)  -> f64 { self.values[2] }
    pub fn ave_bedrms(&self) -> f64 { self.values[3] }
    pub fn population(&self) -> f64 { self.values[4] }
    pub fn ave_occup(&self)  -> f64 { self.values[5] }
    pub fn latitude(&self)   -> f64 { self.values[6] }
    pub fn longitude(&self)  -> f64 { self.values[7] }
}

// ─── Vectorizer ───────────────────────────────────────────────────────────────
/// Convert a record into the positional layout the pipeline expects.
pub fn vectorize(record: &FeatureRecord) -> FeatureVector {
    [
        record.med_inc(),
        record.house_age(),
        record.ave_rooms(),
        record.ave_bedrms(),
        record.population(),
        record.ave_occup(),
        record.latitude(),
        record.longitude(),
    ]
}

/// Vectorize a batch, preserving input order.
pub fn vectorize_batch(records: &[FeatureRecord]) -> Vec<FeatureVector> {
    records.iter().map(vectorize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: FeatureVector = [
        8.3252, 41.0, 6.98412698, 1.02380952, 322.0, 2.55555556, 37.88, -122.23,
    ];

    #[test]
    fn test_valid_record_is_accepted() {
        let record = FeatureRecord::from_values(SAMPLE).unwrap();
        assert_eq!(record.med_inc(), 8.3252);
        assert_eq!(record.longitude(), -122.23);
    }

    #[test]
    fn test_negative_income_names_med_inc() {
        let mut values = SAMPLE;
        values[0] = -8.3252;
        let err = FeatureRecord::from_values(values).unwrap_err();
        assert_eq!(err.field(), "MedInc");
        assert_eq!(err.reason, "MedInc Must Be Non-Negative");
    }

    #[test]
    fn test_first_violation_in_field_order_wins() {
        let mut values = SAMPLE;
        values[3] = -1.0;
        values[6] = 200.0;
        let err = FeatureRecord::from_values(values).unwrap_err();
        assert_eq!(err.field(), "AveBedrms");
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let mut values = SAMPLE;
        values[0] = 0.0;
        values[6] = -90.0;
        values[7] = 180.0;
        assert!(FeatureRecord::from_values(values).is_ok());
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let mut values = SAMPLE;
        values[4] = f64::NAN;
        let err = FeatureRecord::from_values(values).unwrap_err();
        assert_eq!(err.field(), "Population");
    }

    #[test]
    fn test_batch_preserves_order() {
        let a = FeatureRecord::from_values(SAMPLE).unwrap();
        let mut other = SAMPLE;
        other[0] = 1.5;
        let b = FeatureRecord::from_values(other).unwrap();
        let vectors = vectorize_batch(&[b, a]);
        assert_eq!(vectors[0][0], 1.5);
        assert_eq!(vectors[1], SAMPLE);
    }

    fn valid_values() -> impl Strategy<Value = FeatureVector> {
        (
            prop::array::uniform6(0.0f64..1.0e5),
            -90.0f64..=90.0,
            -180.0f64..=180.0,
        )
            .prop_map(|(head, lat, lon)| {
                [head[0], head[1], head[2], head[3], head[4], head[5], lat, lon]
            })
    }

    proptest! {
        #[test]
        fn prop_vectorize_keeps_field_order(values in valid_values()) {
            let record = FeatureRecord::from_values(values).unwrap();
            let vector = vectorize(&record);
            prop_assert_eq!(vector.len(), N_FEATURES);
            prop_assert_eq!(vector, values);
        }

        #[test]
        fn prop_negative_non_negative_field_is_named(
            values in valid_values(),
            position in 0usize..6,
            magnitude in 1.0e-6f64..1.0e6,
        ) {
            let mut values = values;
            values[position] = -magnitude;
            let err = FeatureRecord::from_values(values).unwrap_err();
            prop_assert_eq!(err.field(), FEATURE_NAMES[position]);
        }

        #[test]
        fn prop_out_of_range_coordinates_are_named(
            values in valid_values(),
            lat_excess in 1.0e-6f64..1.0e3,
            lon_excess in 1.0e-6f64..1.0e3,
            negative in any::<bool>(),
        ) {
            let sign = if negative { -1.0 } else { 1.0 };

            let mut bad_lat = values;
            bad_lat[6] = sign * (90.0 + lat_excess);
            prop_assert_eq!(FeatureRecord::from_values(bad_lat).unwrap_err().field(), "Latitude");

            let mut bad_lon = values;
            bad_lon[7] = sign * (180.0 + lon_excess);
            prop_assert_eq!(FeatureRecord::from_values(bad_lon).unwrap_err().field(), "Longitude");
        }
    }
}
