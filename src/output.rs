//! Report destination and the `VAR=VALUE` output gate
//!
//! `BYFL_OUTPUT_IF=VAR=VALUE` restricts output to processes in which `VAR`
//! currently equals `VALUE`, e.g. one MPI rank out of many. The gate is
//! evaluated once when the engine is built.

use crate::error::ConfigError;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Environment variable holding the output gate
pub const OUTPUT_IF_VAR: &str = "BYFL_OUTPUT_IF";

/// Parsed `VAR=VALUE` gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFilter {
    pub variable: String,
    pub value: String,
}

impl OutputFilter {
    /// Parse `VAR=VALUE`; the value may be empty but the `=` is required
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let (variable, value) = expr
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedOutputFilter(expr.to_string()))?;
        Ok(OutputFilter {
            variable: variable.to_string(),
            value: value.to_string(),
        })
    }

    /// Evaluate the gate against the process environment
    ///
    /// An unset variable compares as the empty string.
    pub fn matches(&self) -> bool {
        self.matches_with(|name| std::env::var(name).ok())
    }

    /// Evaluate the gate against an arbitrary variable lookup
    pub fn matches_with<F>(&self, lookup: F) -> bool
    where
        F: FnOnce(&str) -> Option<String>,
    {
        lookup(&self.variable).unwrap_or_default() == self.value
    }
}

/// Where reports go, and whether they go anywhere at all
pub struct OutputSink {
    writer: Box<dyn Write + Send>,
    enabled: bool,
}

impl OutputSink {
    pub fn new(writer: Box<dyn Write + Send>, enabled: bool) -> Self {
        OutputSink { writer, enabled }
    }

    /// Standard output, gated by `filter`
    pub fn stdout(filter: Option<&OutputFilter>) -> Self {
        let enabled = filter.map_or(true, OutputFilter::matches);
        Self::new(Box::new(io::stdout()), enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn writer(&mut self) -> &mut dyn Write {
        &mut *self.writer
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Cloneable in-memory writer for capturing reports
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
