//! Widget-facing errors.
//!
//! Every failure surfaced to the host page carries a stable code plus a
//! human-readable message. No error here is fatal: each recovery path
//! leaves the conversation in its last known good state.

/// Errors reported through the widget's error callback.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// Transport/backend failure during a dialogue transition.
    #[error("transition failed: {0}")]
    Transition(String),
    /// Booking attempted without a complete selection set.
    #[error("missing selection: {0}")]
    MissingSelection(String),
    /// Startup data load failed; the widget degraded to offline defaults.
    #[error("initialization failed: {0}")]
    Initialization(String),
    /// Booking creation or confirmation failed.
    #[error("booking failed: {0}")]
    Booking(String),
    /// Input refused while a transition is outstanding, or after the
    /// widget was destroyed. Not reported through the error callback.
    #[error("widget is not accepting input")]
    NotAccepting,
}

impl WidgetError {
    /// Stable machine-readable code for the host page.
    pub fn code(&self) -> &'static str {
        match self {
            WidgetError::Transition(_) => "TRANSITION_ERROR",
            WidgetError::MissingSelection(_) => "MISSING_SELECTION",
            WidgetError::Initialization(_) => "INIT_ERROR",
            WidgetError::Booking(_) => "BOOKING_ERROR",
            WidgetError::NotAccepting => "NOT_ACCEPTING",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            WidgetError::Transition("x".to_string()).code(),
            "TRANSITION_ERROR"
        );
        assert_eq!(
            WidgetError::MissingSelection("provider".to_string()).code(),
            "MISSING_SELECTION"
        );
        assert_eq!(
            WidgetError::Initialization("offline".to_string()).code(),
            "INIT_ERROR"
        );
        assert_eq!(WidgetError::Booking("x".to_string()).code(), "BOOKING_ERROR");
        assert_eq!(WidgetError::NotAccepting.code(), "NOT_ACCEPTING");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = WidgetError::Transition("backend unreachable".to_string());
        assert_eq!(err.to_string(), "transition failed: backend unreachable");

        let err = WidgetError::MissingSelection("slot".to_string());
        assert_eq!(err.to_string(), "missing selection: slot");
    }
}
