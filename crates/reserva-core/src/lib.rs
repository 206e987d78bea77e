//! Shared core for the conversational booking widget.
//!
//! Defines the catalog entities, chat message model, conversation state,
//! error taxonomy root, and configuration used by the dialogue engine and
//! the client-side orchestrator.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::Catalog;
pub use config::{BackendKind, WidgetConfig};
pub use error::{ReservaError, Result};
pub use types::{
    slot_label, AgentReply, Booking, BookingStatus, Conversation, ConversationStep,
    CreateBookingRequest, Message, MessageMetadata, MessageSender, OptionChip, PaymentStatus,
    Provider, Service, SessionContext, TenantSettings, TimeSlot, UserContext,
};
