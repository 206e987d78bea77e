//! The transport seam.
//!
//! The orchestrator talks to the dialogue contract through [`ChatBackend`];
//! whether the engine runs in-process or behind a network API is invisible
//! to it. [`LocalBackend`] is the in-process implementation; a remote
//! transport satisfies the same trait and owns its own timeouts.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use reserva_core::config::WidgetConfig;
use reserva_core::types::{Booking, CreateBookingRequest, Service, TenantSettings, UserContext};
use reserva_dialogue::{BookingFinalizer, DialogueEngine, DialogueError, Transition};

/// Errors crossing the transport seam.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("missing selection: {0}")]
    MissingSelection(String),
    #[error("booking rejected: {0}")]
    Rejected(String),
}

impl From<DialogueError> for BackendError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::SessionNotFound(id) => BackendError::SessionNotFound(id),
            DialogueError::MissingSelection(field) => {
                BackendError::MissingSelection(field.to_string())
            }
            DialogueError::AlreadyCompleted => BackendError::Rejected(err.to_string()),
            DialogueError::Booking(msg) => BackendError::Rejected(msg),
        }
    }
}

/// Abstract dialogue/booking capability consumed by the orchestrator.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn tenant_settings(&self) -> Result<TenantSettings, BackendError>;

    async fn list_services(&self) -> Result<Vec<Service>, BackendError>;

    /// Run one dialogue transition. A missing id starts a fresh
    /// conversation; the returned transition carries the id to use next.
    /// The user context, when known, rides along opaquely.
    async fn send_message(
        &self,
        conversation_id: Option<Uuid>,
        text: &str,
        user_context: Option<&UserContext>,
    ) -> Result<Transition, BackendError>;

    async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Booking, BackendError>;

    /// Confirm the booking pending in a conversation, producing both the
    /// terminal transition and the created booking.
    async fn confirm_pending_booking(
        &self,
        conversation_id: Uuid,
    ) -> Result<(Transition, Booking), BackendError>;
}

/// In-process backend over the dialogue engine and finalizer.
pub struct LocalBackend {
    engine: Arc<DialogueEngine>,
    finalizer: BookingFinalizer,
    tenant: TenantSettings,
}

impl LocalBackend {
    pub fn new(engine: Arc<DialogueEngine>, config: &WidgetConfig) -> Self {
        let finalizer = BookingFinalizer::new(engine.catalog().clone());
        let tenant = TenantSettings {
            tenant_id: config.widget.tenant_id.clone(),
            name: "Demo Tenant".to_string(),
            language: config.widget.locale.clone(),
            greeting_message: "¡Hola! 👋 Bienvenido a nuestro centro de servicios.".to_string(),
        };
        Self {
            engine,
            finalizer,
            tenant,
        }
    }

    pub fn engine(&self) -> &Arc<DialogueEngine> {
        &self.engine
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    async fn tenant_settings(&self) -> Result<TenantSettings, BackendError> {
        Ok(self.tenant.clone())
    }

    async fn list_services(&self) -> Result<Vec<Service>, BackendError> {
        Ok(self.engine.catalog().active_services())
    }

    async fn send_message(
        &self,
        conversation_id: Option<Uuid>,
        text: &str,
        _user_context: Option<&UserContext>,
    ) -> Result<Transition, BackendError> {
        // The engine is total over its input; the local seam never fails.
        Ok(self.engine.transition(conversation_id, text))
    }

    async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Booking, BackendError> {
        Ok(self.finalizer.create_booking(&request)?)
    }

    async fn confirm_pending_booking(
        &self,
        conversation_id: Uuid,
    ) -> Result<(Transition, Booking), BackendError> {
        let mut conversation = self
            .engine
            .sessions()
            .get(conversation_id)
            .ok_or(BackendError::SessionNotFound(conversation_id))?;

        let (booking, reply) = self.finalizer.confirm_from_context(&mut conversation)?;
        self.engine.sessions().set(conversation.clone());

        let transition = Transition {
            conversation_id: conversation.id,
            step: conversation.step,
            reply,
            context: conversation.context,
        };
        Ok((transition, booking))
    }
}
