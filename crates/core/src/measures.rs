//! Normalization of SonarQube measure values
//!
//! SonarQube reports current-code values under `"value"` and, in older
//! versions, new-code (leak period) values under `"period": {"value": ...}`.
//! Everything is a string on the wire. This module turns both encodings into
//! one numeric representation keyed by metric name.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Prefix SonarQube puts in front of new-code metric keys
pub const NEW_CODE_PREFIX: &str = "new_";

// =============================================================================
// API Response Types (Deserialization)
// =============================================================================

/// A single measure as returned by `/api/measures/*`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Measure {
    pub metric: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub period: Option<MeasurePeriod>,
}

/// Legacy leak-period wrapper around a measure value
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MeasurePeriod {
    #[serde(default)]
    pub value: Option<Value>,
}

// =============================================================================
// Output Domain Types
// =============================================================================

/// A metric value after normalization
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    /// The backend value did not parse as a number and is passed through
    Raw(String),
}

impl MetricValue {
    /// Numeric view of the value, `None` for unparseable raw strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Integer(i) => Some(*i as f64),
            MetricValue::Float(f) => Some(*f),
            MetricValue::Raw(_) => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Integer(i) => write!(f, "{i}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Raw(s) => write!(f, "{s}"),
        }
    }
}

/// Insertion-ordered mapping from metric key to an optional value
///
/// `None` marks a metric that was requested but has no obtainable value; it
/// serializes as `null`. Re-inserting an existing key replaces its value and
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    entries: Vec<(String, Option<MetricValue>)>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<MetricValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value for `key`; the outer `Option` tells whether the key is present at all
    pub fn get(&self, key: &str) -> Option<&Option<MetricValue>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Option<MetricValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Option<MetricValue>)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (String, Option<MetricValue>)>>(iter: I) -> Self {
        let mut set = MetricSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

impl IntoIterator for MetricSet {
    type Item = (String, Option<MetricValue>);
    type IntoIter = std::vec::IntoIter<(String, Option<MetricValue>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for MetricSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Pure Transformation Functions
// =============================================================================

/// Convert a measure to a numeric value, or `None` when it carries no value
///
/// `value` wins over `period.value`; the two are never merged. Whole numbers
/// come back as integers ("88.0" → 88), anything with a fractional part stays
/// a float. Strings that do not parse are returned unchanged.
pub fn to_numeric(measure: &Measure) -> Option<MetricValue> {
    let raw = present(measure.value.as_ref()).or_else(|| {
        measure
            .period
            .as_ref()
            .and_then(|period| present(period.value.as_ref()))
    })?;

    let text = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Some(parse_number(&text))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn parse_number(text: &str) -> MetricValue {
    match text.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                MetricValue::Integer(f as i64)
            } else {
                MetricValue::Float(f)
            }
        }
        _ => MetricValue::Raw(text.to_string()),
    }
}

/// Build a metric set from raw measures; later duplicates win
pub fn measures_to_set(measures: &[Measure]) -> MetricSet {
    measures
        .iter()
        .map(|m| (m.metric.clone(), to_numeric(m)))
        .collect()
}

/// Pick `keys` out of `measures`, in order, with `None` for the missing ones
pub fn select(measures: &MetricSet, keys: &[&str]) -> MetricSet {
    keys.iter()
        .map(|key| (key.to_string(), measures.get(key).cloned().flatten()))
        .collect()
}

/// Remove the `new_` prefix from every key that has it
///
/// When a stripped key collides with an existing one the later entry wins.
pub fn strip_new_prefix(measures: MetricSet) -> MetricSet {
    measures
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(NEW_CODE_PREFIX) {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}
