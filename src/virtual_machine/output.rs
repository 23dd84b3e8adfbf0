//! Sinks for the values emitted by `dis` and `fmt`.

use crate::virtual_machine::cell::Value;
use std::io::Write;

/// Receives every value the interpreter emits, in program order.
pub trait Output {
    fn emit(&mut self, value: &Value);
}

/// Prints one line per emitted value on stdout.
#[derive(Debug, Default)]
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn emit(&mut self, value: &Value) {
        let mut stdout = std::io::stdout().lock();
        // A closed pipe must not abort the run.
        let _ = writeln!(stdout, "{value}");
    }
}

/// Collects emitted values in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    values: Vec<Value>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Emitted values rendered the way [`StdoutOutput`] prints them.
    pub fn lines(&self) -> Vec<String> {
        self.values.iter().map(Value::to_string).collect()
    }

    /// Integer values only, in emission order.
    pub fn ints(&self) -> Vec<i64> {
        self.values.iter().filter_map(Value::as_int).collect()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Output for CapturedOutput {
    fn emit(&mut self, value: &Value) {
        self.values.push(value.clone());
    }
}
