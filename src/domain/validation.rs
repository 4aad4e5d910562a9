// ============================================================
// Layer 3 — Input Validator
// ============================================================
// Turns untyped JSON request bodies into FeatureRecords.
//
// Every field is checked in FEATURE_NAMES order against three
// rules, also in order:
//
//   missing     — the key is absent
//   type-error  — the value is not a number or a numeric string
//   value-error — the number breaks the field's domain rule
//
// Validation never panics and never coerces a bad value into a
// good one. The result is either records or a ValidationFailure
// listing field-level errors.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::features::{FeatureRecord, FeatureVector, FEATURE_NAMES, FIELD_RULES, N_FEATURES};

/// Key holding the record list in a batch body
pub const BATCH_KEY: &str = "houses";

// ─── Error types ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "missing")]
    Missing,
    #[serde(rename = "type-error")]
    TypeError,
    #[serde(rename = "value-error")]
    ValueError,
    #[serde(rename = "json-invalid")]
    JsonInvalid,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Missing     => "missing",
            ErrorKind::TypeError   => "type-error",
            ErrorKind::ValueError  => "value-error",
            ErrorKind::JsonInvalid => "json-invalid",
        }
    }
}

/// One step in the location path of an error, e.g. `["body", "houses", 2, "MedInc"]`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for LocSegment {
    fn from(key: &str) -> Self {
        LocSegment::Key(key.to_string())
    }
}

impl From<usize> for LocSegment {
    fn from(index: usize) -> Self {
        LocSegment::Index(index)
    }
}

/// A single field-level validation error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind:  ErrorKind,
    pub loc:   Vec<LocSegment>,
    pub msg:   String,
    pub field: String,
}

impl FieldError {
    fn new(kind: ErrorKind, field: &str, loc: Vec<LocSegment>, msg: impl Into<String>) -> Self {
        Self { kind, loc, msg: msg.into(), field: field.to_string() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.kind.as_str(), self.msg)
    }
}

/// All errors reported for one request. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    errors: Vec<FieldError>,
}

impl ValidationFailure {
    fn new(errors: Vec<FieldError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    fn single(error: FieldError) -> Self {
        Self { errors: vec![error] }
    }

    pub fn first(&self) -> &FieldError {
        &self.errors[0]
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first())?;
        if self.errors.len() > 1 {
            write!(f, " (+{} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

// ─── Policy ───────────────────────────────────────────────────────────────────
/// How many violations a validation run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Stop at the first violation: first field of the first invalid record
    #[default]
    FailFast,
    /// Report every violation of every record
    AccumulateAll,
}

// ─── Validator ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Parse raw request bytes as JSON. Malformed input is a
    /// `json-invalid` error located at the offending byte.
    pub fn parse_body(&self, body: &[u8]) -> Result<Value, ValidationFailure> {
        serde_json::from_slice(body).map_err(|err| {
            ValidationFailure::single(FieldError::new(
                ErrorKind::JsonInvalid,
                "body",
                vec!["body".into(), err.column().into()],
                format!("JSON decode error: {err}"),
            ))
        })
    }

    /// Validate a single-record body (a JSON object of the eight fields).
    pub fn validate_record(&self, body: &Value) -> Result<FeatureRecord, ValidationFailure> {
        let mut errors = Vec::new();
        match self.check_record(body, vec!["body".into()], &mut errors) {
            Some(record) => Ok(record),
            None => Err(ValidationFailure::new(errors)),
        }
    }

    /// Validate a batch body: `{"houses": [record, ...]}`.
    /// Records are checked in list order.
    pub fn validate_batch(&self, body: &Value) -> Result<Vec<FeatureRecord>, ValidationFailure> {
        let Some(object) = body.as_object() else {
            return Err(ValidationFailure::single(not_an_object("body", vec!["body".into()])));
        };

        let loc: Vec<LocSegment> = vec!["body".into(), BATCH_KEY.into()];
        let items = match object.get(BATCH_KEY) {
            None => {
                return Err(ValidationFailure::single(FieldError::new(
                    ErrorKind::Missing, BATCH_KEY, loc, "Field required",
                )));
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ValidationFailure::single(FieldError::new(
                    ErrorKind::TypeError, BATCH_KEY, loc, "Input should be a valid list",
                )));
            }
        };

        let mut errors  = Vec::new();
        let mut records = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let mut item_loc = loc.clone();
            item_loc.push(index.into());

            if let Some(record) = self.check_record(item, item_loc, &mut errors) {
                records.push(record);
            } else if self.policy == ValidationPolicy::FailFast {
                break;
            }
        }

        if errors.is_empty() {
            Ok(records)
        } else {
            Err(ValidationFailure::new(errors))
        }
    }

    /// Check one record object. Pushes errors and returns None on failure.
    fn check_record(
        &self,
        value:  &Value,
        loc:    Vec<LocSegment>,
        errors: &mut Vec<FieldError>,
    ) -> Option<FeatureRecord> {
        let Some(object) = value.as_object() else {
            let name = match loc.last() {
                Some(LocSegment::Key(key)) => key.clone(),
                _ => "body".to_string(),
            };
            errors.push(not_an_object(&name, loc));
            return None;
        };

        let before = errors.len();
        let mut values: FeatureVector = [0.0; N_FEATURES];

        for (position, name) in FEATURE_NAMES.iter().enumerate() {
            let mut field_loc = loc.clone();
            field_loc.push((*name).into());

            match check_field(object, position, field_loc) {
                Ok(value) => values[position] = value,
                Err(error) => {
                    errors.push(error);
                    if self.policy == ValidationPolicy::FailFast {
                        return None;
                    }
                }
            }
        }

        if errors.len() > before {
            return None;
        }

        // Every rule already passed above, so construction cannot fail here.
        match FeatureRecord::from_values(values) {
            Ok(record) => Some(record),
            Err(violation) => {
                let mut field_loc = loc;
                field_loc.push(violation.field().into());
                errors.push(FieldError::new(
                    ErrorKind::ValueError,
                    violation.field(),
                    field_loc,
                    format!("Value error, {}", violation.reason),
                ));
                None
            }
        }
    }
}

/// Apply missing → type → value rules to one field
fn check_field(
    object:   &Map<String, Value>,
    position: usize,
    loc:      Vec<LocSegment>,
) -> Result<f64, FieldError> {
    let name = FEATURE_NAMES[position];

    let raw = object
        .get(name)
        .ok_or_else(|| FieldError::new(ErrorKind::Missing, name, loc.clone(), "Field required"))?;

    let number = coerce_number(raw)
        .map_err(|msg| FieldError::new(ErrorKind::TypeError, name, loc.clone(), msg))?;

    FIELD_RULES[position]
        .check(name, number)
        .map_err(|reason| FieldError::new(ErrorKind::ValueError, name, loc, format!("Value error, {reason}")))?;

    Ok(number)
}

/// JSON numbers pass through; strings are parsed after trimming.
/// Booleans, null, arrays and objects are type errors.
fn coerce_number(raw: &Value) -> Result<f64, &'static str> {
    match raw {
        Value::Number(n) => n.as_f64().ok_or("Input should be a valid number"),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| "Input should be a valid number, unable to parse string as a number"),
        _ => Err("Input should be a valid number"),
    }
}

fn not_an_object(field: &str, loc: Vec<LocSegment>) -> FieldError {
    FieldError::new(
        ErrorKind::TypeError,
        field,
        loc,
        "Input should be a valid dictionary or object to extract fields from",
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn house() -> Value {
        json!({
            "MedInc": 8.3252, "HouseAge": 41.0, "AveRooms": 6.98412698,
            "AveBedrms": 1.02380952, "Population": 322.0, "AveOccup": 2.55555556,
            "Latitude": 37.88, "Longitude": -122.23
        })
    }

    fn other_house() -> Value {
        json!({
            "MedInc": 7.2574, "HouseAge": 30.0, "AveRooms": 5.86957656,
            "AveBedrms": 1.07539683, "Population": 500.0, "AveOccup": 3.43209876,
            "Latitude": 36.78, "Longitude": -121.23
        })
    }

    fn with(mut body: Value, field: &str, value: Value) -> Value {
        body[field] = value;
        body
    }

    fn without(mut body: Value, field: &str) -> Value {
        body.as_object_mut().unwrap().remove(field);
        body
    }

    #[test]
    fn test_valid_record() {
        let record = Validator::default().validate_record(&house()).unwrap();
        assert_eq!(record.med_inc(), 8.3252);
    }

    #[test]
    fn test_missing_field() {
        let failure = Validator::default()
            .validate_record(&without(house(), "MedInc"))
            .unwrap_err();
        let err = failure.first();
        assert_eq!(err.kind, ErrorKind::Missing);
        assert_eq!(err.field, "MedInc");
        assert_eq!(err.msg, "Field required");
        assert_eq!(err.loc, vec![LocSegment::from("body"), LocSegment::from("MedInc")]);
    }

    #[test]
    fn test_unparseable_string() {
        let failure = Validator::default()
            .validate_record(&with(house(), "MedInc", json!("Hello world")))
            .unwrap_err();
        let err = failure.first();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.msg, "Input should be a valid number, unable to parse string as a number");
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let record = Validator::default()
            .validate_record(&with(house(), "HouseAge", json!(" 12.5 ")))
            .unwrap();
        assert_eq!(record.house_age(), 12.5);
    }

    #[test]
    fn test_null_and_bool_are_type_errors() {
        let v = Validator::default();
        for bad in [json!(null), json!(true), json!([1.0])] {
            let failure = v.validate_record(&with(house(), "AveRooms", bad)).unwrap_err();
            assert_eq!(failure.first().kind, ErrorKind::TypeError);
            assert_eq!(failure.first().msg, "Input should be a valid number");
        }
    }

    #[test]
    fn test_negative_income() {
        let failure = Validator::default()
            .validate_record(&with(house(), "MedInc", json!(-8.3252)))
            .unwrap_err();
        assert_eq!(failure.first().kind, ErrorKind::ValueError);
        assert_eq!(failure.first().msg, "Value error, MedInc Must Be Non-Negative");
    }

    #[test]
    fn test_latitude_and_longitude_messages() {
        let v = Validator::default();
        let lat = v.validate_record(&with(house(), "Latitude", json!(200.0))).unwrap_err();
        assert_eq!(lat.first().msg, "Value error, Latitude Must Be Between -90 and 90");
        let lon = v.validate_record(&with(house(), "Longitude", json!(-200))).unwrap_err();
        assert_eq!(lon.first().msg, "Value error, Longitude Must Be Between -180 and 180");
    }

    #[test]
    fn test_field_order_decides_first_error() {
        // Longitude is the later field, so the missing HouseAge is reported.
        let body = with(without(house(), "HouseAge"), "Longitude", json!(-500.0));
        let failure = Validator::default().validate_record(&body).unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(failure.first().field, "HouseAge");
    }

    #[test]
    fn test_accumulate_all_reports_every_field() {
        let body = with(without(house(), "HouseAge"), "Longitude", json!(-500.0));
        let failure = Validator::new(ValidationPolicy::AccumulateAll)
            .validate_record(&body)
            .unwrap_err();
        let fields: Vec<&str> = failure.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["HouseAge", "Longitude"]);
    }

    #[test]
    fn test_non_object_body() {
        let failure = Validator::default().validate_record(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(failure.first().kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_batch_valid() {
        let body = json!({ "houses": [house(), other_house()] });
        let records = Validator::default().validate_batch(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].med_inc(), 7.2574);
    }

    #[test]
    fn test_batch_reports_first_invalid_record() {
        let bad_second = with(other_house(), "Latitude", json!(95.0));
        let bad_third  = without(house(), "MedInc");
        let body = json!({ "houses": [house(), bad_second, bad_third, other_house()] });

        let failure = Validator::default().validate_batch(&body).unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        let err = failure.first();
        assert_eq!(err.field, "Latitude");
        assert_eq!(
            err.loc,
            vec![
                LocSegment::from("body"),
                LocSegment::from("houses"),
                LocSegment::from(1usize),
                LocSegment::from("Latitude"),
            ]
        );
    }

    #[test]
    fn test_batch_first_invalid_independent_of_valid_neighbours() {
        let bad = with(house(), "AveOccup", json!(-1.0));
        for position in 0..4 {
            let mut houses = vec![house(), other_house(), house()];
            houses.insert(position, bad.clone());
            let failure = Validator::default()
                .validate_batch(&json!({ "houses": houses }))
                .unwrap_err();
            assert_eq!(failure.first().field, "AveOccup");
            assert_eq!(failure.first().loc[2], LocSegment::Index(position));
        }
    }

    #[test]
    fn test_batch_accumulate_all_covers_every_record() {
        let body = json!({
            "houses": [without(house(), "MedInc"), other_house(), with(house(), "Latitude", json!(-91))]
        });
        let failure = Validator::new(ValidationPolicy::AccumulateAll)
            .validate_batch(&body)
            .unwrap_err();
        assert_eq!(failure.errors().len(), 2);
        assert_eq!(failure.errors()[1].loc[2], LocSegment::Index(2));
    }

    #[test]
    fn test_batch_missing_or_wrong_houses() {
        let v = Validator::default();
        let missing = v.validate_batch(&json!({})).unwrap_err();
        assert_eq!(missing.first().kind, ErrorKind::Missing);
        assert_eq!(missing.first().field, "houses");

        let wrong = v.validate_batch(&json!({ "houses": house() })).unwrap_err();
        assert_eq!(wrong.first().kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let records = Validator::default().validate_batch(&json!({ "houses": [] })).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let failure = Validator::default()
            .validate_record(&without(house(), "MedInc"))
            .unwrap_err();
        let json = serde_json::to_value(failure.first()).unwrap();
        assert_eq!(json["type"], "missing");
        assert_eq!(json["loc"], json!(["body", "MedInc"]));
        assert_eq!(json["field"], "MedInc");
    }

    #[test]
    fn test_malformed_json_is_json_invalid() {
        let v = Validator::default();
        let failure = v.parse_body(br#"{"MedInc": 8.3,"#).unwrap_err();
        assert_eq!(failure.first().kind, ErrorKind::JsonInvalid);
        assert!(failure.first().msg.starts_with("JSON decode error"));
        assert_eq!(failure.first().loc[0], LocSegment::Key("body".into()));

        let parsed = v.parse_body(br#"{"MedInc": 8.3}"#).unwrap();
        assert_eq!(parsed["MedInc"], 8.3);
    }
}
