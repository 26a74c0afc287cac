//! Severity-graded outcome reporting.
//!
//! A [`Status`] is what long-running operations hand back to the caller: a
//! severity, a human-readable message, the underlying error when there is one,
//! and optional children when several outcomes are aggregated.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Plugin id attached to statuses raised by this workspace.
pub const PLUGIN_ID: &str = "mpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
    Cancel,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Clone)]
pub struct Status {
    severity: Severity,
    plugin_id: String,
    message: String,
    source: Option<SharedError>,
    children: Vec<Status>,
}

impl Status {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            plugin_id: PLUGIN_ID.into(),
            message: message.into(),
            source: None,
            children: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Severity::Ok, "ok")
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn cancel() -> Self {
        Self::new(Severity::Cancel, "operation cancelled")
    }

    /// An ERROR status wrapping `source`, using its display text as message.
    pub fn from_error<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = source.to_string();
        Self::error(message).with_source(Arc::new(source))
    }

    /// Aggregates `children` under `message`. The aggregate takes the most
    /// severe child severity, or OK when there are no children.
    pub fn multi(message: impl Into<String>, children: Vec<Status>) -> Self {
        let severity = children
            .iter()
            .map(Status::severity)
            .max()
            .unwrap_or(Severity::Ok);
        Self {
            severity,
            plugin_id: PLUGIN_ID.into(),
            message: message.into(),
            source: None,
            children,
        }
    }

    pub fn with_plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = plugin_id.into();
        self
    }

    pub fn with_source(mut self, source: SharedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Re-grades this status as a cancellation, keeping message and children.
    pub fn into_cancel(mut self) -> Self {
        self.severity = Severity::Cancel;
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> Option<&SharedError> {
        self.source.as_ref()
    }

    pub fn children(&self) -> &[Status] {
        &self.children
    }

    pub fn is_multi(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn is_cancel(&self) -> bool {
        self.severity == Severity::Cancel
    }

    pub fn matches(&self, severity: Severity) -> bool {
        self.severity == severity
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("severity", &self.severity)
            .field("plugin_id", &self.plugin_id)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .field("children", &self.children)
            .finish()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        for child in &self.children {
            write!(f, "\n  {child}")?;
        }
        Ok(())
    }
}

impl StdError for Status {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}
