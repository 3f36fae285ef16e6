//! In-memory stats source serving canned JSON documents.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;

use crate::metrics::{AllocatorStats, RuntimeStats};
use crate::source::{FetchError, StatsSource};

/// Canned answer for one endpoint.
#[derive(Debug, Clone)]
enum Response {
    Json(String),
    Fail(FetchError),
}

impl Response {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        match self {
            Response::Json(body) => {
                serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
            }
            Response::Fail(e) => Err(e.clone()),
        }
    }
}

/// Stats source returning preset documents or errors.
///
/// Counts requests per endpoint so tests can check which endpoints a poll
/// touched. Endpoints without a preset answer fail with a connection error.
#[derive(Debug)]
pub struct MockSource {
    runtime: Response,
    allocator: Response,
    runtime_calls: AtomicUsize,
    allocator_calls: AtomicUsize,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Creates a source whose endpoints all fail.
    pub fn new() -> Self {
        let unset = Response::Fail(FetchError::Connection("no mock response".to_string()));
        Self {
            runtime: unset.clone(),
            allocator: unset,
            runtime_calls: AtomicUsize::new(0),
            allocator_calls: AtomicUsize::new(0),
        }
    }

    /// Sets the `/stats` body.
    pub fn with_runtime(mut self, body: impl Into<String>) -> Self {
        self.runtime = Response::Json(body.into());
        self
    }

    /// Makes `/stats` fail.
    pub fn with_runtime_error(mut self, error: FetchError) -> Self {
        self.runtime = Response::Fail(error);
        self
    }

    /// Sets the `/gc-stats` body.
    pub fn with_allocator(mut self, body: impl Into<String>) -> Self {
        self.allocator = Response::Json(body.into());
        self
    }

    /// Makes `/gc-stats` fail.
    pub fn with_allocator_error(mut self, error: FetchError) -> Self {
        self.allocator = Response::Fail(error);
        self
    }

    pub fn runtime_calls(&self) -> usize {
        self.runtime_calls.load(Ordering::Relaxed)
    }

    pub fn allocator_calls(&self) -> usize {
        self.allocator_calls.load(Ordering::Relaxed)
    }
}

impl StatsSource for MockSource {
    fn fetch_runtime_stats(&self) -> Result<RuntimeStats, FetchError> {
        self.runtime_calls.fetch_add(1, Ordering::Relaxed);
        self.runtime.decode()
    }

    fn fetch_allocator_stats(&self) -> Result<AllocatorStats, FetchError> {
        self.allocator_calls.fetch_add(1, Ordering::Relaxed);
        self.allocator.decode()
    }
}
