//! Build diagnostics.
//!
//! Table builds never fail because of one bad line. Each rejected line is
//! reported to an [`ErrorSink`] together with a per-build "already alarmed"
//! flag, so a sink can raise a single alarm per build while still logging
//! every message.

use parking_lot::Mutex;

/// Receiver for non-fatal build diagnostics.
pub trait ErrorSink {
    /// Report one diagnostic. `already_alarmed` is shared across one build.
    fn signal_error(&self, msg: &str, already_alarmed: &mut bool);
}

/// Sink that writes diagnostics to the `log` facade.
///
/// Every message is a warning; the first one of a build is also logged as an
/// error on the `alarm` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn signal_error(&self, msg: &str, already_alarmed: &mut bool) {
        log::warn!("{}", msg);
        if !*already_alarmed {
            *already_alarmed = true;
            log::error!(target: "alarm", "{}", msg);
        }
    }
}

/// Sink that keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: Mutex<Collected>,
}

#[derive(Debug, Default)]
struct Collected {
    messages: Vec<String>,
    alarms: usize,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().messages.clone()
    }

    /// Number of messages received so far.
    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    /// Check if no messages were received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of alarms raised (at most one per build).
    pub fn alarms(&self) -> usize {
        self.inner.lock().alarms
    }
}

impl ErrorSink for CollectingSink {
    fn signal_error(&self, msg: &str, already_alarmed: &mut bool) {
        log::warn!("{}", msg);
        let mut inner = self.inner.lock();
        inner.messages.push(msg.to_string());
        if !*already_alarmed {
            *already_alarmed = true;
            inner.alarms += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_single_alarm_per_build() {
        let sink = CollectingSink::new();
        let mut alarmed = false;
        sink.signal_error("first", &mut alarmed);
        sink.signal_error("second", &mut alarmed);
        assert_eq!(sink.messages(), vec!["first", "second"]);
        assert_eq!(sink.alarms(), 1);

        let mut alarmed = false;
        sink.signal_error("next build", &mut alarmed);
        assert_eq!(sink.alarms(), 2);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_log_sink_sets_flag() {
        let mut alarmed = false;
        LogSink.signal_error("msg", &mut alarmed);
        assert!(alarmed);
    }
}
