//! Error and version reporting.

use std::fmt;

/// Build identifier, constant for the life of the process.
pub fn version_string() -> &'static str {
    concat!("retempo ", env!("CARGO_PKG_VERSION"))
}

/// Most recent failure of one session.
///
/// Owned by the session rather than the process, so concurrent sessions
/// never overwrite each other's messages. A failing operation records its
/// message; the next successful one clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot {
    message: Option<String>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent failure description, or `""` when none is pending.
    pub fn last_error(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    pub fn is_set(&self) -> bool {
        self.message.is_some()
    }

    pub fn record(&mut self, err: &dyn fmt::Display) {
        let message = err.to_string();
        tracing::debug!("recording error: {}", message);
        self.message = Some(message);
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    /// Record a failure or clear on success, passing the result through.
    pub fn track<T, E: fmt::Display>(&mut self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.clear(),
            Err(e) => self.record(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_version_string() {
        assert!(version_string().starts_with("retempo "));
        assert_eq!(version_string(), version_string());
    }

    #[test]
    fn test_slot_starts_empty() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.last_error(), "");
        assert!(!slot.is_set());
    }

    #[test]
    fn test_track_records_then_clears() {
        let mut slot = ErrorSlot::new();
        let failed: Result<(), Error> =
            slot.track(Err(Error::InvalidState("flushed".into())));
        assert!(failed.is_err());
        assert_eq!(slot.last_error(), "Invalid state: flushed");

        let ok: Result<u32, Error> = slot.track(Ok(3));
        assert_eq!(ok.unwrap(), 3);
        assert_eq!(slot.last_error(), "");
    }

    #[test]
    fn test_record_overwrites() {
        let mut slot = ErrorSlot::new();
        slot.record(&"first");
        slot.record(&"second");
        assert_eq!(slot.last_error(), "second");
    }
}
