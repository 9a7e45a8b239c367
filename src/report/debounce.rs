//! Debouncing of rapid search input.

use std::time::Duration;

/// Quiet time a search term must survive before it is applied.
pub const SEARCH_DEBOUNCE_MS: u64 = 350;

pub fn search_debounce() -> Duration {
    Duration::from_millis(SEARCH_DEBOUNCE_MS)
}

/// A raw input value and when it arrived, relative to some start point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent<T> {
    pub at: Duration,
    pub value: T,
}

/// Holds the latest value until `delay` passes without a newer one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<InputEvent<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record a new value. If the previously pending value had been quiet
    /// for at least `delay` by `at`, it is released.
    pub fn push(&mut self, at: Duration, value: T) -> Option<T> {
        let released = self.poll(at);
        self.pending = Some(InputEvent { at, value });
        released
    }

    /// Release the pending value if it has settled by `now`.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some(event) if now.saturating_sub(event.at) >= self.delay => {
                self.pending.take().map(|e| e.value)
            }
            _ => None,
        }
    }

    /// Release whatever is pending regardless of timing, e.g. when input ends.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|e| e.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Values from a time-ordered input stream that stayed unchanged for
/// `delay`. The final value is always emitted.
pub fn debounce<T: Clone>(events: &[InputEvent<T>], delay: Duration) -> Vec<T> {
    let mut debouncer = Debouncer::new(delay);
    let mut out: Vec<T> = events
        .iter()
        .filter_map(|e| debouncer.push(e.at, e.value.clone()))
        .collect();
    out.extend(debouncer.flush());
    out
}
