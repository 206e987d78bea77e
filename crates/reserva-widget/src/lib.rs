//! Client-side orchestration for the conversational booking widget.
//!
//! Owns the message log and UI flags, funnels free text and chip
//! selections through the dialogue contract, and finalizes bookings. The
//! transport behind the contract is pluggable: in-process for demos and
//! tests, remote in production.

pub mod backend;
pub mod error;
pub mod events;
pub mod orchestrator;

pub use backend::{BackendError, ChatBackend, LocalBackend};
pub use error::WidgetError;
pub use events::WidgetCallbacks;
pub use orchestrator::{ChatOrchestrator, WidgetState};
