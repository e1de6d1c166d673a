// src/record/mod.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action tag carried by the final record of a successful planning run.
pub const COMPLETE_ACTION: &str = "complete";

/// One progress update emitted by the planning backend.
///
/// Records arrive in stream order and carry no identity beyond it: `step`
/// is an ordinal (>= 1, not necessarily contiguous) and `progress` is the
/// latest authoritative completion percentage, not a monotone counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u64,
    pub message: String,
    pub action: String,
    pub progress: f64,
    /// Which sub-agent emitted this update, when the backend says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Phase-specific payload, opaque to the decoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// A localized phase failure; not necessarily fatal to the stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    /// True when the action tag reports a phase finishing successfully
    /// (`transport_complete`, `budget_complete`, ...).
    pub fn phase_succeeded(&self) -> bool {
        self.action.ends_with("_complete")
    }

    /// True when the action tag reports a phase failing
    /// (`transport_error`, `food_error`, ...).
    pub fn phase_failed(&self) -> bool {
        self.action.ends_with("_error")
    }

    /// True for the terminal record of a successful run.
    pub fn is_terminal(&self) -> bool {
        self.action == COMPLETE_ACTION
    }

    /// The materialized plan attached to the terminal record, if this is it.
    pub fn result_payload(&self) -> Option<&Value> {
        if self.is_terminal() {
            self.data.as_ref()
        } else {
            None
        }
    }
}
