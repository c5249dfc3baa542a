//! Wire types for the Rollbar read API.
//!
//! Only the fields the unfurler renders are modelled; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;

/// Every Rollbar API response is wrapped in this envelope. `err` is non-zero
/// on application errors, in which case `message` explains why.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub err: i64,
    pub result: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    pub id: i64,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub counter: Option<i64>,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    /// Null for items that have never fired.
    #[serde(default)]
    pub first_occurrence_timestamp: Option<i64>,
    #[serde(default)]
    pub last_occurrence_timestamp: Option<i64>,
    #[serde(default)]
    pub total_occurrences: u64,
    #[serde(default)]
    pub activating_occurrence_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Occurrence {
    pub id: u64,
    #[serde(default)]
    pub data: OccurrenceData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceData {
    #[serde(default)]
    pub body: OccurrenceBody,
}

/// Exception payloads carry either a chain of traces (nested causes) or a
/// single trace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceBody {
    #[serde(default)]
    pub trace_chain: Vec<Trace>,
    #[serde(default)]
    pub trace: Option<Trace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Trace {
    /// Ordered oldest call first; the frame that raised is last.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub lineno: Option<u32>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub class_name: Option<String>,
}

impl Occurrence {
    /// The outermost trace of the exception, if the payload has one.
    pub fn top_trace(&self) -> Option<&Trace> {
        self.data
            .body
            .trace_chain
            .first()
            .or(self.data.body.trace.as_ref())
    }
}
