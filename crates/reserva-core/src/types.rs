//! Core types and value objects shared across the widget.
//!
//! Defines catalog entities, chat messages, conversation state, and the
//! booking record with its supporting enumerations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Catalog entities
// =============================================================================

/// A bookable service offered by the tenant. Read-only reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub category: Option<String>,
    /// Price in the tenant's minor currency unit.
    pub price: Option<u32>,
    pub active: bool,
}

/// A professional who performs one or more services. Read-only reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub timezone: String,
    pub active: bool,
    /// Ids of the services this provider performs.
    pub service_ids: Vec<String>,
}

/// A candidate bookable time window for a service/provider pair.
///
/// Generated on demand, never persisted. Identified for selection purposes
/// by `(start, provider_id, service_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub provider_id: String,
    pub service_id: String,
}

/// Human-facing label for a slot, used both when rendering slot chips and
/// when resolving a chip selection back to the offered slot.
pub fn slot_label(slot: &TimeSlot) -> String {
    slot.start.format("%d/%m %H:%M").to_string()
}

// =============================================================================
// Booking
// =============================================================================

/// Booking lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    PendingPayment,
    Confirmed,
    Cancelled,
    NoShow,
    Expired,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::PendingPayment => write!(f, "PENDING_PAYMENT"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
            BookingStatus::NoShow => write!(f, "NO_SHOW"),
            BookingStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "PENDING_PAYMENT" => Ok(BookingStatus::PendingPayment),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            "EXPIRED" => Ok(BookingStatus::Expired),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

/// Payment lifecycle states. Payment collection itself is an external
/// collaborator; the widget only carries the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    None,
    Pending,
    Processing,
    Paid,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::None => write!(f, "NONE"),
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Processing => write!(f, "PROCESSING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
            PaymentStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(PaymentStatus::None),
            "PENDING" => Ok(PaymentStatus::Pending),
            "PROCESSING" => Ok(PaymentStatus::Processing),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

/// A confirmed (or pending) reservation.
///
/// Materialized only by the booking finalizer after explicit confirmation;
/// immutable from the widget's point of view thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub service_id: String,
    pub provider_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a booking through the transport seam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: String,
    pub provider_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

// =============================================================================
// Chat messages
// =============================================================================

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageSender {
    User,
    Agent,
    System,
}

impl fmt::Display for MessageSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSender::User => write!(f, "user"),
            MessageSender::Agent => write!(f, "agent"),
            MessageSender::System => write!(f, "system"),
        }
    }
}

/// A selectable chip rendered under an agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChip {
    pub label: String,
    pub value: String,
}

impl OptionChip {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Structured payload attached to an agent message, telling the
/// presentation layer what to render alongside the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageMetadata {
    ServiceChips { services: Vec<Service> },
    ProviderChips { providers: Vec<Provider> },
    TimeSlots { time_slots: Vec<TimeSlot> },
    OptionChips { options: Vec<OptionChip> },
    BookingConfirmation { booking: Option<Booking> },
}

/// A single entry in the conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Build a message stamped now.
    pub fn new(sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// =============================================================================
// Conversation state
// =============================================================================

/// The funnel position of a conversation. Closed set; `Greeting` is the
/// initial state, `Confirmation`/`Completed` are the terminal end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStep {
    Greeting,
    OptionsSelection,
    ServiceSelection,
    ProviderSelection,
    TimeSelection,
    AskName,
    AskSurname,
    AskEmail,
    AskPhone,
    ConfirmDetails,
    Confirmation,
    Completed,
}

impl ConversationStep {
    /// Whether the funnel has reached its end.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConversationStep::Confirmation | ConversationStep::Completed
        )
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStep::Greeting => write!(f, "GREETING"),
            ConversationStep::OptionsSelection => write!(f, "OPTIONS_SELECTION"),
            ConversationStep::ServiceSelection => write!(f, "SERVICE_SELECTION"),
            ConversationStep::ProviderSelection => write!(f, "PROVIDER_SELECTION"),
            ConversationStep::TimeSelection => write!(f, "TIME_SELECTION"),
            ConversationStep::AskName => write!(f, "ASK_NAME"),
            ConversationStep::AskSurname => write!(f, "ASK_SURNAME"),
            ConversationStep::AskEmail => write!(f, "ASK_EMAIL"),
            ConversationStep::AskPhone => write!(f, "ASK_PHONE"),
            ConversationStep::ConfirmDetails => write!(f, "CONFIRM_DETAILS"),
            ConversationStep::Confirmation => write!(f, "CONFIRMATION"),
            ConversationStep::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for ConversationStep {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREETING" => Ok(ConversationStep::Greeting),
            "OPTIONS_SELECTION" => Ok(ConversationStep::OptionsSelection),
            "SERVICE_SELECTION" => Ok(ConversationStep::ServiceSelection),
            "PROVIDER_SELECTION" => Ok(ConversationStep::ProviderSelection),
            "TIME_SELECTION" => Ok(ConversationStep::TimeSelection),
            "ASK_NAME" => Ok(ConversationStep::AskName),
            "ASK_SURNAME" => Ok(ConversationStep::AskSurname),
            "ASK_EMAIL" => Ok(ConversationStep::AskEmail),
            "ASK_PHONE" => Ok(ConversationStep::AskPhone),
            "CONFIRM_DETAILS" => Ok(ConversationStep::ConfirmDetails),
            "CONFIRMATION" => Ok(ConversationStep::Confirmation),
            "COMPLETED" => Ok(ConversationStep::Completed),
            _ => Err(format!("Unknown conversation step: {}", s)),
        }
    }
}

/// Accumulated data gathered so far in a conversation.
///
/// May hold a partially-built booking's fields; an actual [`Booking`] is
/// only materialized by the finalizer after explicit confirmation, so a
/// half-confirmed reservation can never look committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub provider_id: Option<String>,
    pub service_id: Option<String>,
    /// Slots presented in the most recent availability reply, kept so a
    /// later selection can be resolved back to a concrete slot.
    pub offered_slots: Vec<TimeSlot>,
    pub selected_slot: Option<TimeSlot>,
    /// Raw text of the slot selection, verbatim.
    pub selected_time_text: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl SessionContext {
    /// Drop everything collected during the contact sequence. Used when the
    /// user rejects the recap and the collection restarts from the top.
    pub fn clear_contact(&mut self) {
        self.name = None;
        self.surname = None;
        self.full_name = None;
        self.email = None;
        self.phone = None;
    }

    /// All contact fields required for a booking are present.
    pub fn has_contact(&self) -> bool {
        self.full_name.is_some() && self.email.is_some() && self.phone.is_some()
    }
}

/// A single end-to-end dialogue session, owned by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub step: ConversationStep,
    pub context: SessionContext,
    /// Epoch seconds.
    pub started_at: i64,
    /// Epoch seconds; bumped on every store write.
    pub last_activity_at: i64,
}

impl Conversation {
    /// Fresh conversation in the initial step.
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4(),
            step: ConversationStep::Greeting,
            context: SessionContext::default(),
            started_at: now,
            last_activity_at: now,
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The payload half of a transition: what the agent says and what the
/// presentation layer should render with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    pub metadata: Option<MessageMetadata>,
}

impl AgentReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(text: impl Into<String>, metadata: MessageMetadata) -> Self {
        Self {
            text: text.into(),
            metadata: Some(metadata),
        }
    }
}

/// Optional identity of the page visitor, passed through to the backend
/// opaquely alongside each transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Tenant
// =============================================================================

/// Per-tenant display settings, loaded from the backend at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSettings {
    pub tenant_id: String,
    pub name: String,
    pub language: String,
    pub greeting_message: String,
}

// =============================================================================
// Tests
// =============================================================================
