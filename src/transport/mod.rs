// src/transport/mod.rs

use std::collections::VecDeque;
use std::io::{self, Read};

use serde::Serialize;
use serde_json::Value;

use crate::decode::StreamError;

/// Planning parameters posted to the backend when a stream is opened.
#[derive(Clone, Debug, Serialize)]
pub struct PlanRequest {
    pub title: String,
    pub destinations: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub travelers: u32,
    pub budget: TripBudget,
    /// Free-form traveler preferences, passed through to the backend agents.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub preferences: Value,
}

/// Total budget plus the per-category split the planner works against.
#[derive(Clone, Debug, Serialize)]
pub struct TripBudget {
    pub total: u64,
    pub transport: u64,
    pub accommodation: u64,
    pub food: u64,
    pub activities: u64,
}

impl TripBudget {
    /// Splits a total using the app's default category weights.
    pub fn from_total(total: u64) -> Self {
        Self {
            total,
            transport: total * 30 / 100,
            accommodation: total * 35 / 100,
            food: total * 20 / 100,
            activities: total * 15 / 100,
        }
    }
}

/// Opens the authenticated planning stream.
///
/// Implementations must check the response before handing a body back: any
/// failure to establish the stream (request construction, connection, or a
/// non-success HTTP status) is reported as [`StreamError::Connection`], so
/// the caller never starts decoding a stream that was refused.
pub trait Transport: Send + Sync {
    fn open(&self, request: &PlanRequest, token: &str) -> Result<Box<dyn Read>, StreamError>;
}

/// Production transport over the blocking HTTP client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn open(&self, request: &PlanRequest, token: &str) -> Result<Box<dyn Read>, StreamError> {
        let url = format!("{}/trips/ai-plan", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .map_err(|err| StreamError::Connection(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Connection(format!(
                "server rejected planning request: {status}"
            )));
        }
        // The blocking response body reads as a plain byte stream.
        Ok(Box::new(response))
    }
}

/// Replays a fixed chunk script instead of hitting the network.
///
/// Each `open` call hands out a fresh reader over the same script, matching
/// the one-stream-per-request contract. Useful for the demo binary and for
/// driving every decoder path in tests.
pub struct ScriptedTransport {
    chunks: Vec<Vec<u8>>,
    reject: Option<String>,
    interrupt: Option<String>,
}

impl ScriptedTransport {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            reject: None,
            interrupt: None,
        }
    }

    /// A transport whose stream can never be established.
    pub fn rejecting(message: &str) -> Self {
        Self {
            chunks: Vec::new(),
            reject: Some(message.into()),
            interrupt: None,
        }
    }

    /// Ends the replayed stream with a read error instead of a clean EOF.
    pub fn interrupt_after_script(mut self, message: &str) -> Self {
        self.interrupt = Some(message.into());
        self
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _request: &PlanRequest, _token: &str) -> Result<Box<dyn Read>, StreamError> {
        if let Some(message) = &self.reject {
            return Err(StreamError::Connection(message.clone()));
        }
        Ok(Box::new(ScriptReader {
            chunks: self.chunks.iter().cloned().collect(),
            interrupt: self.interrupt.clone(),
        }))
    }
}

struct ScriptReader {
    chunks: VecDeque<Vec<u8>>,
    interrupt: Option<String>,
}

impl Read for ScriptReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while matches!(self.chunks.front(), Some(c) if c.is_empty()) {
            self.chunks.pop_front();
        }
        let Some(chunk) = self.chunks.front_mut() else {
            if let Some(message) = self.interrupt.take() {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, message));
            }
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.chunks.pop_front();
        }
        Ok(n)
    }
}
