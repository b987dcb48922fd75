//! Error boundary for view rendering and background commands.
//!
//! A panic inside a guarded render or command is caught here instead of
//! tearing down the terminal. The boundary then holds the [`Fault`] and the
//! active view renders a fallback until [`ErrorBoundary::reset`] is called.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Where the failure was caught, e.g. the view or command name.
    pub origin: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Fault {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorBoundary {
    fault: Option<Fault>,
    trips: u32,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. The first fault wins until the boundary is reset.
    pub fn trip(&mut self, fault: Fault) {
        error!(origin = %fault.origin, message = %fault.message, "error boundary tripped");
        self.trips += 1;
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_tripped(&self) -> bool {
        self.fault.is_some()
    }

    /// Total faults seen since start, including ones after the first.
    pub fn trips(&self) -> u32 {
        self.trips
    }

    /// Clear the fault. Returns whether there was one.
    pub fn reset(&mut self) -> bool {
        let had_fault = self.fault.take().is_some();
        if had_fault {
            info!("error boundary reset");
        }
        had_fault
    }
}

/// Run `task`, turning a panic into its message.
pub fn catch<R>(task: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(task)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Await `task`, turning a panic into its message.
pub async fn catch_async<F: Future>(task: F) -> Result<F::Output, String> {
    AssertUnwindSafe(task)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
