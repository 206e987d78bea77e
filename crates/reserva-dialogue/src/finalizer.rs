//! Booking finalization.
//!
//! Turns a fully-specified selection into a persisted booking. Reads
//! exclusively from the conversation context: the orchestrator's local
//! cache is a render-only view and never consulted here, so the machine's
//! confirmed state is the single source of truth for what gets booked.

use chrono::Utc;
use uuid::Uuid;

use reserva_core::catalog::Catalog;
use reserva_core::types::{
    AgentReply, Booking, BookingStatus, Conversation, ConversationStep, CreateBookingRequest,
    MessageMetadata, PaymentStatus,
};

use crate::error::DialogueError;

const TEXT_BOOKED: &str = "✅ ¡Reserva confirmada! Te enviamos un email de confirmación.";

/// Validates booking prerequisites and materializes the booking record.
pub struct BookingFinalizer {
    catalog: Catalog,
}

impl BookingFinalizer {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Create a booking from explicit parameters.
    ///
    /// Fails with [`DialogueError::MissingSelection`] when the service,
    /// provider, or contact data is absent or unknown; no booking is
    /// produced on any failure path.
    pub fn create_booking(&self, request: &CreateBookingRequest) -> Result<Booking, DialogueError> {
        if request.service_id.is_empty() || self.catalog.service_by_id(&request.service_id).is_none()
        {
            return Err(DialogueError::MissingSelection("service"));
        }
        if request.provider_id.is_empty()
            || self.catalog.provider_by_id(&request.provider_id).is_none()
        {
            return Err(DialogueError::MissingSelection("provider"));
        }
        if request.start >= request.end {
            return Err(DialogueError::Booking(format!(
                "slot must end after it starts: {} >= {}",
                request.start, request.end
            )));
        }
        if request.customer_name.trim().is_empty() {
            return Err(DialogueError::MissingSelection("name"));
        }
        if request.customer_email.trim().is_empty() {
            return Err(DialogueError::MissingSelection("email"));
        }

        let booking = Booking {
            id: format!("bkg_{}", Uuid::new_v4()),
            service_id: request.service_id.clone(),
            provider_id: request.provider_id.clone(),
            start: request.start,
            end: request.end,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            customer_name: Some(request.customer_name.clone()),
            customer_email: Some(request.customer_email.clone()),
            customer_phone: request.customer_phone.clone(),
            created_at: Utc::now(),
        };
        tracing::info!(
            booking_id = %booking.id,
            service_id = %booking.service_id,
            provider_id = %booking.provider_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// Confirm the booking pending in a conversation.
    ///
    /// Pulls every parameter out of the conversation context, books, marks
    /// the conversation completed, and produces the terminal reply. A
    /// conversation that already completed is refused, which is what keeps
    /// a repeated confirm click from double booking.
    pub fn confirm_from_context(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(Booking, AgentReply), DialogueError> {
        if conversation.step == ConversationStep::Completed {
            return Err(DialogueError::AlreadyCompleted);
        }

        let context = &conversation.context;
        let service_id = context
            .service_id
            .clone()
            .ok_or(DialogueError::MissingSelection("service"))?;
        let slot = context
            .selected_slot
            .clone()
            .ok_or(DialogueError::MissingSelection("slot"))?;
        let customer_name = context
            .full_name
            .clone()
            .ok_or(DialogueError::MissingSelection("name"))?;
        let customer_email = context
            .email
            .clone()
            .ok_or(DialogueError::MissingSelection("email"))?;

        let request = CreateBookingRequest {
            service_id,
            provider_id: slot.provider_id.clone(),
            start: slot.start,
            end: slot.end,
            customer_name,
            customer_email,
            customer_phone: context.phone.clone(),
        };
        let booking = self.create_booking(&request)?;

        conversation.step = ConversationStep::Completed;
        let reply = AgentReply::with_metadata(
            TEXT_BOOKED,
            MessageMetadata::BookingConfirmation {
                booking: Some(booking.clone()),
            },
        );
        Ok((booking, reply))
    }
}
