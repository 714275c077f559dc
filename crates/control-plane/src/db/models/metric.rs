//! Metric sample model and reading normalization.
//!
//! Collector agents report the four readings in whatever shape they have on
//! hand: a flat percentage (number or string, sometimes with a trailing `%`),
//! a nested JSON payload, or `"N/A"`. The heterogeneity is normalized here at
//! the ingestion boundary into a tagged union so no downstream consumer ever
//! shape-sniffs a raw value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized reading (cpu, memory, disk, or gpu).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    /// A flat utilization percentage.
    Percent { value: f64 },
    /// A structured payload reported as-is by the collector.
    Detail { value: serde_json::Value },
    /// The collector had nothing to report ("N/A", null, garbage).
    Unavailable,
}

impl Reading {
    /// Normalize a raw reading from a collector.
    pub fn normalize(raw: &serde_json::Value) -> Reading {
        match raw {
            serde_json::Value::Null => Reading::Unavailable,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(value) => Reading::Percent { value },
                None => Reading::Unavailable,
            },
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => Reading::Detail {
                value: raw.clone(),
            },
            serde_json::Value::String(s) => Self::normalize_str(s),
            serde_json::Value::Bool(_) => Reading::Unavailable,
        }
    }

    fn normalize_str(s: &str) -> Reading {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
            return Reading::Unavailable;
        }

        // Flat percentage, with or without the unit suffix.
        if let Ok(value) = trimmed.trim_end_matches('%').trim().parse::<f64>() {
            return Reading::Percent { value };
        }

        // Collectors sometimes JSON-encode the structured payload into the
        // string field; unwrap one level.
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if parsed.is_object() || parsed.is_array() {
                return Reading::Detail { value: parsed };
            }
            if let Some(value) = parsed.as_f64() {
                return Reading::Percent { value };
            }
        }

        Reading::Unavailable
    }
}

/// A normalized, stored metric sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: i64,
    pub server_id: i64,
    pub cpu: Reading,
    pub memory: Reading,
    pub disk: Reading,
    pub gpu: Reading,
    pub recorded_at: DateTime<Utc>,
}

/// Incoming sample as reported by a collector, readings still raw.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricIngestRequest {
    pub server_id: i64,

    #[serde(default)]
    pub cpu: serde_json::Value,

    #[serde(default)]
    pub memory: serde_json::Value,

    #[serde(default)]
    pub disk: serde_json::Value,

    #[serde(default)]
    pub gpu: serde_json::Value,

    /// Sample timestamp; defaults to ingestion time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_number() {
        assert_eq!(
            Reading::normalize(&json!(42.5)),
            Reading::Percent { value: 42.5 }
        );
    }

    #[test]
    fn test_normalize_percent_string() {
        assert_eq!(
            Reading::normalize(&json!("87")),
            Reading::Percent { value: 87.0 }
        );
        assert_eq!(
            Reading::normalize(&json!("87.5 %")),
            Reading::Percent { value: 87.5 }
        );
    }

    #[test]
    fn test_normalize_not_available() {
        assert_eq!(Reading::normalize(&json!("N/A")), Reading::Unavailable);
        assert_eq!(Reading::normalize(&json!("n/a")), Reading::Unavailable);
        assert_eq!(Reading::normalize(&json!(null)), Reading::Unavailable);
        assert_eq!(Reading::normalize(&json!("")), Reading::Unavailable);
    }

    #[test]
    fn test_normalize_structured() {
        let payload = json!({"total": 16384, "used": 8192, "percent": 50.0});
        assert_eq!(
            Reading::normalize(&payload),
            Reading::Detail {
                value: payload.clone()
            }
        );
    }

    #[test]
    fn test_normalize_json_encoded_string() {
        let encoded = r#"{"usage_percent": 12.5, "cores_logical": 8}"#;
        match Reading::normalize(&json!(encoded)) {
            Reading::Detail { value } => {
                assert_eq!(value.get("cores_logical"), Some(&json!(8)));
            }
            other => panic!("expected detail reading, got {:?}", other),
        }
    }

    #[test]
    fn test_normalized_form_is_tagged() {
        let reading = Reading::Percent { value: 12.0 };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json.get("kind"), Some(&json!("percent")));

        let back: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_ingest_request_defaults() {
        let request: MetricIngestRequest =
            serde_json::from_str(r#"{"server_id": 9, "cpu": "33"}"#).unwrap();
        assert_eq!(request.server_id, 9);
        assert!(request.timestamp.is_none());
        assert!(request.gpu.is_null());
    }
}
