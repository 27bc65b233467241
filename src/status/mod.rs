/// Assistant availability indicator.
///
/// [`indicator_for`] reduces the outcome of `GET /api/chat/status` to a
/// healthy flag and a short label. [`StatusPoller`] repeats that check on a
/// fixed interval from a background thread, independent of any chat
/// request in flight.
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::api::types::{ChatStatusResponse, HealthProbe};
use crate::api::{ApiClient, ClientError};

pub const LABEL_ONLINE: &str = "Assistant online";
pub const LABEL_MODEL_LOADING: &str = "Model loading...";
pub const LABEL_UNREACHABLE: &str = "Assistant service unreachable";
pub const LABEL_SERVICE_ERROR: &str = "Service error";
pub const LABEL_CONNECTION_ERROR: &str = "Connection error";

/// What the status dot shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub healthy: bool,
    pub label: String,
}

impl StatusIndicator {
    fn new(healthy: bool, label: &str) -> Self {
        Self {
            healthy,
            label: label.to_string(),
        }
    }

    /// Shown before the first check completes.
    pub fn unknown() -> Self {
        Self::new(false, "Checking...")
    }
}

/// Map a status call to an indicator.
pub fn indicator_for(result: &Result<ChatStatusResponse, ClientError>) -> StatusIndicator {
    match result {
        Err(_) => StatusIndicator::new(false, LABEL_CONNECTION_ERROR),
        Ok(resp) if !resp.success => StatusIndicator::new(false, LABEL_SERVICE_ERROR),
        Ok(resp) => {
            let s = resp.status;
            if s.ollama_running && s.model_available {
                StatusIndicator::new(true, LABEL_ONLINE)
            } else if s.ollama_running {
                StatusIndicator::new(false, LABEL_MODEL_LOADING)
            } else {
                StatusIndicator::new(false, LABEL_UNREACHABLE)
            }
        }
    }
}

/// One status check against the service.
pub fn check(client: &ApiClient) -> StatusIndicator {
    let result = client.chat_status();
    if let Err(e) = &result {
        debug!("status check failed: {e}");
    }
    indicator_for(&result)
}

/// Warning for the prediction page's health probe, `None` when all is well.
pub fn probe_warning(result: &Result<HealthProbe, ClientError>) -> Option<&'static str> {
    match result {
        Ok(probe) if probe.model_loaded => None,
        Ok(_) => Some("⚠️ Model could not be loaded. Check the backend."),
        Err(_) => Some("⚠️ Cannot reach the API. Make sure the backend is running."),
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Background status checker.
///
/// Dropping the poller signals its thread to stop but does not wait for it:
/// a check stuck on an unresponsive backend must not hold up the caller.
/// The thread exits once its current check returns.
pub struct StatusPoller {
    stop: Option<Sender<()>>,
}

impl StatusPoller {
    /// Check immediately, then every `interval`, passing each indicator to
    /// `on_update`.
    pub fn spawn<F>(client: ApiClient, interval: Duration, on_update: F) -> Self
    where
        F: Fn(StatusIndicator) + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        thread::spawn(move || {
            loop {
                on_update(check(&client));
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self { stop: Some(stop) }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        // Dropping the sender wakes the thread out of `recv_timeout`.
        self.stop.take();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
