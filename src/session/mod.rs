// src/session/mod.rs

use std::io::Read;

use serde_json::Value;

use crate::decode::{StepStream, StreamError};
use crate::record::StepRecord;
use crate::transport::{PlanRequest, Transport};

/// Client bound to one planning backend.
///
/// Each [`PlanClient::stream_plan`] call opens a fresh single-use stream; a
/// stream that ended (normally or not) cannot be restarted, only replaced by
/// a new call.
pub struct PlanClient {
    transport: Box<dyn Transport>,
    token: String,
}

impl PlanClient {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Box::new(transport),
            token: String::new(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.into();
        self
    }

    /// Issues the planning request and wraps the response body in a decoder.
    ///
    /// A transport-level refusal (connection failure or non-success status)
    /// comes back as [`StreamError::Connection`] here, before any decoding —
    /// distinguishable from a stream that delivered records and then broke.
    pub fn stream_plan(
        &self,
        request: &PlanRequest,
    ) -> Result<StepStream<Box<dyn Read>>, StreamError> {
        let body = self.transport.open(request, &self.token)?;
        Ok(StepStream::new(body))
    }
}

/// What a consumer is left with after driving a stream to its end.
///
/// Mirrors what the planning screen shows: the full step history, the latest
/// message and progress value, per-phase errors, and the materialized plan
/// from the terminal record. A fatal mid-stream failure lands in `failure`
/// without discarding the records that already arrived.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub history: Vec<StepRecord>,
    pub latest_message: String,
    pub progress: f64,
    pub phase_errors: Vec<String>,
    pub result: Option<Value>,
    pub failure: Option<StreamError>,
    pub skipped_lines: usize,
}

impl PlanOutcome {
    /// True when the run produced a plan and the stream ended cleanly.
    pub fn completed(&self) -> bool {
        self.result.is_some() && self.failure.is_none()
    }
}

/// Drives a stream until it ends, folding every record into a [`PlanOutcome`].
pub fn run_to_completion<R: Read>(mut stream: StepStream<R>) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();
    while let Some(item) = stream.next() {
        match item {
            Ok(record) => {
                outcome.latest_message = record.message.clone();
                outcome.progress = record.progress;
                if let Some(error) = &record.error {
                    outcome.phase_errors.push(format!("{}: {error}", record.action));
                }
                if let Some(payload) = record.result_payload() {
                    outcome.result = Some(payload.clone());
                }
                outcome.history.push(record);
            }
            Err(err) => {
                outcome.failure = Some(err);
                break;
            }
        }
    }
    outcome.skipped_lines = stream.issues().len();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedTransport, TripBudget};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn request() -> PlanRequest {
        PlanRequest {
            title: "周末短途".into(),
            destinations: vec!["杭州".into()],
            start_date: "2026-05-01".into(),
            end_date: "2026-05-03".into(),
            travelers: 2,
            budget: TripBudget::from_total(3000),
            preferences: json!({}),
        }
    }

    fn data_line(value: Value) -> Vec<u8> {
        format!("data: {value}\n").into_bytes()
    }

    #[test]
    fn connection_refusal_yields_no_stream() {
        let client = PlanClient::new(ScriptedTransport::rejecting("401 Unauthorized"));
        let err = client.stream_plan(&request()).err().unwrap();
        assert!(matches!(err, StreamError::Connection(_)));
    }

    #[test]
    fn fatal_read_preserves_delivered_records() {
        let chunks = vec![
            data_line(json!({"step":1,"message":"开始","action":"init","progress":5})),
            data_line(json!({"step":2,"message":"规划交通","action":"transport","progress":30})),
        ];
        let transport = ScriptedTransport::new(chunks).interrupt_after_script("reset");
        let client = PlanClient::new(transport).with_token("token");
        let outcome = run_to_completion(client.stream_plan(&request()).unwrap());

        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.latest_message, "规划交通");
        assert_eq!(outcome.progress, 30.0);
        assert!(matches!(outcome.failure, Some(StreamError::Read(_))));
        assert!(!outcome.completed());
    }

    #[test]
    fn completed_run_captures_terminal_payload() {
        let chunks = vec![
            data_line(json!({"step":1,"message":"开始","action":"init","progress":5})),
            data_line(json!({
                "step":2,"message":"住宿查询失败","action":"accommodation_error",
                "progress":40,"error":"upstream timeout"
            })),
            data_line(json!({
                "step":3,"message":"完成","action":"complete","progress":100,
                "data":{"id":"t1","title":"周末短途"}
            })),
        ];
        let client = PlanClient::new(ScriptedTransport::new(chunks));
        let outcome = run_to_completion(client.stream_plan(&request()).unwrap());

        assert!(outcome.completed());
        assert_eq!(outcome.progress, 100.0);
        assert_eq!(outcome.result.as_ref().unwrap()["id"], "t1");
        // The localized phase failure was recorded but did not end the run.
        assert_eq!(outcome.phase_errors, vec!["accommodation_error: upstream timeout"]);
    }

    #[test]
    fn malformed_lines_counted_not_fatal() {
        let mut chunks = vec![b"data: {broken\n".to_vec()];
        chunks.push(data_line(
            json!({"step":1,"message":"ok","action":"generate","progress":90}),
        ));
        let client = PlanClient::new(ScriptedTransport::new(chunks));
        let outcome = run_to_completion(client.stream_plan(&request()).unwrap());

        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.skipped_lines, 1);
        assert!(outcome.failure.is_none());
    }

    #[test]
    fn token_reaches_the_transport() {
        struct Capturing {
            seen: Arc<Mutex<Option<String>>>,
        }

        impl Transport for Capturing {
            fn open(
                &self,
                _request: &PlanRequest,
                token: &str,
            ) -> Result<Box<dyn std::io::Read>, StreamError> {
                *self.seen.lock().unwrap() = Some(token.to_string());
                Err(StreamError::Connection("capture only".into()))
            }
        }

        let seen = Arc::new(Mutex::new(None));
        let client = PlanClient::new(Capturing {
            seen: Arc::clone(&seen),
        })
        .with_token("bearer-xyz");
        let _ = client.stream_plan(&request());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("bearer-xyz"));
    }
}
