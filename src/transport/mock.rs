//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{RawResponse, Transport, TransportError};
use crate::models::RequestMethod;

type Outcome = Result<RawResponse, TransportError>;

/// A transport that replays scripted outcomes and records every exchange.
///
/// Scripted outcomes are consumed in order. Once the script is empty the
/// repeating outcome (if any) is returned for every further call.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Outcome>>,
    repeat: Mutex<Option<Outcome>>,
    calls: Mutex<Vec<(RequestMethod, String)>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a new mock transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every exchange
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response with the given status and body
    pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
        lock(&self.script).push_back(Ok(RawResponse::new(status, body)));
        self
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) -> &Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Return this response whenever the script is empty
    pub fn always_respond(&self, status: u16, body: impl Into<String>) -> &Self {
        *lock(&self.repeat) = Some(Ok(RawResponse::new(status, body)));
        self
    }

    /// Return this failure whenever the script is empty
    pub fn always_fail(&self, error: TransportError) -> &Self {
        *lock(&self.repeat) = Some(Err(error));
        self
    }

    /// Encoded queries of every exchange so far
    pub fn calls(&self) -> Vec<(RequestMethod, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(
        &self,
        method: RequestMethod,
        encoded_query: &str,
    ) -> Result<RawResponse, TransportError> {
        lock(&self.calls).push((method, encoded_query.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => lock(&self.repeat)
                .clone()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted response".to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_repeat() {
        let mock = MockTransport::new();
        mock.push_response(503, "busy").always_respond(200, "ok");

        let first = mock.exchange(RequestMethod::Get, "a").await.unwrap();
        assert_eq!(first.status, 503);
        let second = mock.exchange(RequestMethod::Post, "b").await.unwrap();
        assert_eq!(second.body, "ok");
        let third = mock.exchange(RequestMethod::Get, "c").await.unwrap();
        assert_eq!(third.status, 200);

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[1], (RequestMethod::Post, "b".to_string()));
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let mock = MockTransport::new();
        let result = mock.exchange(RequestMethod::Get, "").await;
        assert!(matches!(result, Err(TransportError::Other(_))));
    }
}
