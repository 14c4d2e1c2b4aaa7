//! # Disruption Record Model
//!
//! Mirrors one element of the upstream JSON array. Every field is optional:
//! a record with none of them is still valid. Fields the pipeline does not
//! name are kept in [`DisruptionRecord::extra`] so a record survives the JSON
//! snapshot unchanged.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Column order used by the tabular formats before any extra keys.
pub const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "severity",
    "severityLevel",
    "category",
    "subCategory",
    "comments",
    "description",
    "startDateTime",
    "point",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionRecord {
    /// Opaque identifier; upstream uses strings such as `"TIMS-12345"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Lower is more severe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw upstream timestamp; see [`DisruptionRecord::start_time`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<String>,
    /// Raw `[longitude, latitude]`, kept verbatim; see [`DisruptionRecord::coordinates`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Value>,
    /// Every other upstream field, keyed by its wire name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A validated position. Built from `point`, which is `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PointError {
    #[error("point must be a [longitude, latitude] array, got {0}")]
    NotAnArray(String),

    #[error("point must have exactly 2 elements, got {0}")]
    WrongLength(usize),

    #[error("point element {index} is not a finite number: {value}")]
    NotNumeric { index: usize, value: String },

    #[error("point ({lon}, {lat}) is outside the valid longitude/latitude range")]
    OutOfRange { lon: f64, lat: f64 },
}

impl DisruptionRecord {
    /// Identifier rendered for log lines.
    pub fn label(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => "<unidentified>".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Parses `startDateTime` as RFC 3339. `None` when absent or unparsable,
    /// which only removes the record from time-based views.
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        self.start_date_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
    }

    /// Validates `point`.
    ///
    /// Accepts a JSON array or a string holding one (the live feed sends
    /// `"[-0.1,51.5]"`). A malformed value is an error for this view only; the
    /// record and its raw `point` stay intact.
    pub fn coordinates(&self) -> Result<Option<Coordinates>, PointError> {
        match &self.point {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => parse_pair(items).map(Some),
            Some(Value::String(text)) => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(Value::Array(items)) => parse_pair(&items).map(Some),
                    _ => Err(PointError::NotAnArray(text.clone())),
                }
            }
            Some(other) => Err(PointError::NotAnArray(other.to_string())),
        }
    }
}

fn parse_pair(items: &[Value]) -> Result<Coordinates, PointError> {
    if items.len() != 2 {
        return Err(PointError::WrongLength(items.len()));
    }

    let number = |index: usize| -> Result<f64, PointError> {
        items[index]
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| PointError::NotNumeric {
                index,
                value: items[index].to_string(),
            })
    };

    let lon = number(0)?;
    let lat = number(1)?;

    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(PointError::OutOfRange { lon, lat });
    }
    Ok(Coordinates { lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> DisruptionRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn point_is_longitude_then_latitude() {
        let r = record(json!({"id": "TIMS-1", "point": [-0.1, 51.5]}));
        let c = r.coordinates().unwrap().unwrap();
        assert_eq!(c.lat, 51.5);
        assert_eq!(c.lon, -0.1);
    }

    #[test]
    fn string_encoded_point_is_accepted() {
        let r = record(json!({"point": "[-0.1279,51.5077]"}));
        let c = r.coordinates().unwrap().unwrap();
        assert_eq!((c.lat, c.lon), (51.5077, -0.1279));
    }

    #[test]
    fn three_element_point_is_rejected_but_record_survives() {
        let r = record(json!({
            "id": "TIMS-2",
            "severity": "Serious",
            "category": "Works",
            "point": [1, 2, 3]
        }));
        assert_eq!(r.coordinates(), Err(PointError::WrongLength(3)));
        assert_eq!(r.id, Some(json!("TIMS-2")));
        assert_eq!(r.severity.as_deref(), Some("Serious"));
        assert_eq!(r.category.as_deref(), Some("Works"));
        assert_eq!(r.point, Some(json!([1, 2, 3])));
    }

    #[test]
    fn non_numeric_and_out_of_range_points_are_rejected() {
        let r = record(json!({"point": ["a", 51.5]}));
        assert!(matches!(r.coordinates(), Err(PointError::NotNumeric { index: 0, .. })));

        let r = record(json!({"point": [51.5, 200.0]}));
        assert!(matches!(r.coordinates(), Err(PointError::OutOfRange { .. })));

        let r = record(json!({"point": {"lat": 1}}));
        assert!(matches!(r.coordinates(), Err(PointError::NotAnArray(_))));
    }

    #[test]
    fn absent_point_is_not_an_error() {
        assert_eq!(DisruptionRecord::default().coordinates(), Ok(None));
    }

    #[test]
    fn empty_record_round_trips_as_empty_object() {
        let r = record(json!({}));
        assert_eq!(r, DisruptionRecord::default());
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({}));
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let raw = json!({
            "id": "TIMS-3",
            "location": "[A2] Old Kent Road",
            "corridorIds": ["a2"],
            "severityLevel": 7
        });
        let r = record(raw.clone());
        assert_eq!(r.severity_level, Some(7));
        assert_eq!(r.extra.get("location"), Some(&json!("[A2] Old Kent Road")));
        assert_eq!(serde_json::to_value(&r).unwrap(), raw);
    }

    #[test]
    fn start_time_parses_offsets_and_ignores_garbage() {
        let r = record(json!({"startDateTime": "2024-03-01T08:30:00+01:00"}));
        let ts = r.start_time().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);

        let r = record(json!({"startDateTime": "yesterday"}));
        assert!(r.start_time().is_none());
    }

    #[test]
    fn label_falls_back_for_missing_ids() {
        assert_eq!(DisruptionRecord::default().label(), "<unidentified>");
        assert_eq!(record(json!({"id": 42})).label(), "42");
    }
}
