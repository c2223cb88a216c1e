use log::{error, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible message, e.g. a dropped frame or a finished bake.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub level: MessageLevel,
    pub message: String,
}

/// Sink for user-visible messages. The host decides where they end up —
/// an editor console, a notification area, or just the log.
pub trait Reporter {
    fn publish(&self, event: MessageEvent);
}

/// Reporter that forwards every message to the `log` crate.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn publish(&self, event: MessageEvent) {
        match event.level {
            MessageLevel::Success | MessageLevel::Info => info!("{}", event.message),
            MessageLevel::Warning => warn!("{}", event.message),
            MessageLevel::Error => error!("{}", event.message),
        }
    }
}

#[macro_export]
macro_rules! publish_error {
    ($reporter:expr, $($args:tt)*) => {
        $reporter.publish($crate::MessageEvent {
            level: $crate::MessageLevel::Error,
            message: format!($($args)*),
        });
    };
}

#[macro_export]
macro_rules! publish_success {
    ($reporter:expr, $($args:tt)*) => {
        $reporter.publish($crate::MessageEvent {
            level: $crate::MessageLevel::Success,
            message: format!($($args)*),
        });
    };
}

#[macro_export]
macro_rules! publish_info {
    ($reporter:expr, $($args:tt)*) => {
        $reporter.publish($crate::MessageEvent {
            level: $crate::MessageLevel::Info,
            message: format!($($args)*),
        });
    };
}

#[macro_export]
macro_rules! publish_warn {
    ($reporter:expr, $($args:tt)*) => {
        $reporter.publish($crate::MessageEvent {
            level: $crate::MessageLevel::Warning,
            message: format!($($args)*),
        });
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{MessageEvent, MessageLevel, Reporter};

    #[derive(Default)]
    struct CollectingReporter {
        events: Mutex<Vec<MessageEvent>>,
    }

    impl Reporter for CollectingReporter {
        fn publish(&self, event: MessageEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn macros_format_and_publish() {
        let reporter = CollectingReporter::default();
        publish_error!(reporter, "pass '{}' failed", "tonemap");
        publish_warn!(reporter, "frame {} dropped", 3);

        let events = reporter.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, MessageLevel::Error);
        assert_eq!(events[0].message, "pass 'tonemap' failed");
        assert_eq!(events[1].level, MessageLevel::Warning);
    }
}
