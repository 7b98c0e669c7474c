use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the per-benchmark scores inside an executor record.
pub const SCORES_FIELD: &str = "scores";

/// Field holding the execution timestamp inside an executor record.
pub const DATE_FIELD: &str = "date";

/// Result of a single workload run, as produced by an executor.
///
/// Only the sort key and the `scores`/`date` fields are ever interpreted;
/// everything else is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreRecord(Value);

impl ScoreRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `scores` sub-structure, if the executor reported one.
    pub fn scores(&self) -> Option<&Value> {
        self.0.get(SCORES_FIELD)
    }

    /// The execution timestamp, if the executor reported one.
    pub fn date(&self) -> Option<&Value> {
        self.0.get(DATE_FIELD)
    }

    /// Resolve the numeric sort key at `path`.
    ///
    /// Scores are commonly stored as strings (`"87.4"`), so both JSON numbers
    /// and numeric strings are accepted. NaN is treated as absent.
    pub fn sort_key(&self, path: &ScoreKeyPath) -> Option<f64> {
        let mut current = &self.0;
        for segment in path.segments() {
            current = current.get(segment.as_str())?;
        }
        let parsed = match current {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (!parsed.is_nan()).then_some(parsed)
    }
}

impl From<Value> for ScoreRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Ordered list of object keys leading to the numeric sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreKeyPath(Vec<String>);

impl ScoreKeyPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ScoreKeyPath {
    fn default() -> Self {
        Self::new([SCORES_FIELD, "Total Score"])
    }
}

impl fmt::Display for ScoreKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
