//! Host-page notification callbacks.
//!
//! The host registers plain closures; the orchestrator fires them outside
//! its state lock. All callbacks are optional.

use reserva_core::types::Booking;

use crate::error::WidgetError;

type Notify = Box<dyn Fn() + Send + Sync>;
type NotifyBooking = Box<dyn Fn(&Booking) + Send + Sync>;
type NotifyError = Box<dyn Fn(&WidgetError) + Send + Sync>;

/// External notification hooks for widget lifecycle and outcomes.
#[derive(Default)]
pub struct WidgetCallbacks {
    on_ready: Option<Notify>,
    on_open: Option<Notify>,
    on_close: Option<Notify>,
    on_booking_created: Option<NotifyBooking>,
    on_error: Option<NotifyError>,
}

impl WidgetCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn on_booking_created(mut self, f: impl Fn(&Booking) + Send + Sync + 'static) -> Self {
        self.on_booking_created = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&WidgetError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn ready(&self) {
        if let Some(f) = &self.on_ready {
            f();
        }
    }

    pub(crate) fn opened(&self) {
        if let Some(f) = &self.on_open {
            f();
        }
    }

    pub(crate) fn closed(&self) {
        if let Some(f) = &self.on_close {
            f();
        }
    }

    pub(crate) fn booking_created(&self, booking: &Booking) {
        if let Some(f) = &self.on_booking_created {
            f(booking);
        }
    }

    pub(crate) fn error(&self, error: &WidgetError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_unset_callbacks_are_noops() {
        let callbacks = WidgetCallbacks::new();
        callbacks.ready();
        callbacks.opened();
        callbacks.closed();
        callbacks.error(&WidgetError::NotAccepting);
    }

    #[test]
    fn test_callbacks_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let callbacks = WidgetCallbacks::new()
            .on_ready(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(|err| {
                assert_eq!(err.code(), "INIT_ERROR");
            });

        callbacks.ready();
        callbacks.ready();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        callbacks.error(&WidgetError::Initialization("offline".to_string()));
    }
}
