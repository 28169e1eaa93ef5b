use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// End before start, or a date that does not parse as `YYYY-MM-DD`.
    InvalidInterval(String),
    UnknownCategory(String),
    /// Every unit of the category is booked somewhere in the requested span.
    NoAvailability {
        category: String,
    },
    /// The category's commit lock was not acquired within the timeout.
    StoreBusy(Duration),
    Durability(String),
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Whether the same request may succeed if simply submitted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreBusy(_) | EngineError::Durability(_))
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::InvalidInterval(_) => "invalid_interval",
            EngineError::UnknownCategory(_) => "unknown_category",
            EngineError::NoAvailability { .. } => "no_availability",
            EngineError::StoreBusy(_) => "store_busy",
            EngineError::Durability(_) => "durability",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            EngineError::UnknownCategory(c) => write!(f, "unknown category: {c}"),
            EngineError::NoAvailability { category } => {
                write!(f, "no {category} available for the selected dates")
            }
            EngineError::StoreBusy(waited) => {
                write!(f, "store busy: commit lock not acquired within {}ms", waited.as_millis())
            }
            EngineError::Durability(e) => write!(f, "durability error: {e}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Durability(e.to_string())
    }
}
