//! Step-based dialogue engine for the booking widget.
//!
//! Provides slot generation, per-conversation session storage, the ordered
//! rule cascade that drives state transitions, and booking finalization.

pub mod engine;
pub mod error;
pub mod finalizer;
pub mod rules;
pub mod session;
pub mod slots;

pub use engine::{DialogueEngine, Transition};
pub use error::DialogueError;
pub use finalizer::BookingFinalizer;
pub use session::SessionStore;
pub use slots::SlotGenerator;
