//! A [`FrameHandler`] that records what it is told.

use std::sync::{Mutex, MutexGuard};

use rsocket_core::{Error, FrameHandler, Payload};

/// One callback received by a [`RecordingHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// `handle_next`.
    Next {
        /// Delivered payload.
        payload: Payload,
        /// Whether the frame also completed the stream.
        complete: bool,
    },
    /// `handle_complete`.
    Complete,
    /// `handle_request_n`.
    RequestN(u64),
    /// `handle_cancel`.
    Cancel,
    /// `handle_error`.
    Error(Error),
}

/// Handler that appends every callback to an in-memory log.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingHandler {
    fn lock(&self) -> MutexGuard<'_, Vec<Signal>> {
        self.signals.lock().expect("signal log poisoned")
    }

    fn record(&self, signal: Signal) { self.lock().push(signal); }

    /// Copy of the signals received so far.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> { self.lock().clone() }

    /// Remove and return the signals received so far.
    #[must_use]
    pub fn take(&self) -> Vec<Signal> { std::mem::take(&mut *self.lock()) }

    /// Number of signals received.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().len() }

    /// Whether nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    /// Errors received, in order.
    #[must_use]
    pub fn errors(&self) -> Vec<Error> {
        self.lock()
            .iter()
            .filter_map(|signal| match signal {
                Signal::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }
}

impl FrameHandler for RecordingHandler {
    fn handle_next(&self, payload: Payload, complete: bool) {
        self.record(Signal::Next { payload, complete });
    }

    fn handle_complete(&self) { self.record(Signal::Complete); }

    fn handle_request_n(&self, request_n: u64) { self.record(Signal::RequestN(request_n)); }

    fn handle_cancel(&self) { self.record(Signal::Cancel); }

    fn handle_error(&self, error: &Error) { self.record(Signal::Error(error.clone())); }
}
