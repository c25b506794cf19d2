//! Event reporting with optional callbacks, plus structured log payloads.

use std::fmt;

/// Result ceiling above which a calculation event fires.
pub const CALCULATION_MAXIMUM: i64 = 100;

/// Result floor below which a calculation event fires.
pub const CALCULATION_MINIMUM: i64 = 10;

type EventCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A named component that reports events through an optional callback.
///
/// Without a callback, events land in the log instead.
pub struct EventModule {
    name: String,
    callback: Option<EventCallback>,
}

impl EventModule {
    pub fn new(name: &str) -> Self {
        EventModule {
            name: name.to_string(),
            callback: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs the callback invoked by [`emit`](Self::emit).
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Reports an event, falling back to the log when no callback is set.
    pub fn emit(&self, message: &str) {
        match &self.callback {
            Some(callback) => callback(message),
            None => log::info!("[{}] {}", self.name, message),
        }
    }

    /// Multiplies the operands, reporting threshold crossings as events.
    pub fn perform_calculation(&self, a: i64, b: i64) -> i64 {
        let result = a.saturating_mul(b);
        if result > CALCULATION_MAXIMUM {
            self.emit(&format!(
                "calculation result {result} exceeds the maximum of {CALCULATION_MAXIMUM}"
            ));
        } else if result < CALCULATION_MINIMUM {
            self.emit(&format!(
                "calculation result {result} is below the minimum of {CALCULATION_MINIMUM}"
            ));
        }
        result
    }
}

impl fmt::Debug for EventModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventModule")
            .field("name", &self.name)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Payload attached to a log message.
#[derive(Debug, Clone, PartialEq)]
pub enum LogData {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for LogData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogData::Str(s) => write!(f, "{s}"),
            LogData::Int(i) => write!(f, "{i}"),
            LogData::Float(x) => write!(f, "{x}"),
        }
    }
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub module: String,
    pub text: String,
    pub data: Option<LogData>,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.module, self.text)?;
        if let Some(data) = &self.data {
            write!(f, " ({data})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn capturing_module(name: &str) -> (EventModule, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut module = EventModule::new(name);
        module.set_callback(move |msg| sink.lock().unwrap().push(msg.to_string()));
        (module, events)
    }

    #[test]
    fn callback_receives_events() {
        let (module, events) = capturing_module("loader");
        module.emit("section table parsed");

        let events = events.lock().unwrap();
        assert_eq!(events.as_slice(), ["section table parsed"]);
    }

    #[test]
    fn in_range_calculations_are_silent() {
        let (module, events) = capturing_module("calc");
        assert_eq!(module.perform_calculation(5, 4), 20);
        assert_eq!(module.perform_calculation(10, 10), 100);
        assert_eq!(module.perform_calculation(10, 1), 10);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn threshold_crossings_fire_events() {
        let (module, events) = capturing_module("calc");
        assert_eq!(module.perform_calculation(11, 10), 110);
        assert_eq!(module.perform_calculation(3, 2), 6);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].contains("110"));
        assert!(events[0].contains("maximum"));
        assert!(events[1].contains("6"));
        assert!(events[1].contains("minimum"));
    }

    #[test]
    fn huge_operands_saturate() {
        let (module, events) = capturing_module("calc");
        assert_eq!(module.perform_calculation(i64::MAX, 2), i64::MAX);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn emit_without_callback_does_not_panic() {
        let mut module = EventModule::new("quiet");
        module.emit("goes to the log");

        module.set_callback(|_| {});
        module.clear_callback();
        module.emit("back to the log");
    }

    #[test]
    fn log_messages_render_with_payload() {
        let msg = LogMessage {
            module: "binsize".to_string(),
            text: "parsed 3 sections".to_string(),
            data: Some(LogData::Int(1536)),
        };
        assert_eq!(msg.to_string(), "[binsize] parsed 3 sections (1536)");

        let bare = LogMessage {
            module: "binsize".to_string(),
            text: "done".to_string(),
            data: None,
        };
        assert_eq!(bare.to_string(), "[binsize] done");
    }
}
