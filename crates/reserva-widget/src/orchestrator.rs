//! Client-side conversation orchestrator.
//!
//! Owns the UI-visible state: the message log, the loading gate, and the
//! caches of selectable entities. Feeds user actions through the transport
//! seam and reconciles each transition back into renderable form. The
//! selected service/provider/slot mirrors exist purely for rendering and
//! for assembling the direct booking call; the dialogue context inside the
//! engine remains the source of truth for the confirm path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use reserva_core::config::WidgetConfig;
use reserva_core::types::{
    slot_label, Booking, ConversationStep, CreateBookingRequest, Message, MessageMetadata,
    MessageSender, Provider, Service, TenantSettings, TimeSlot,
};
use reserva_dialogue::Transition;

use crate::backend::{BackendError, ChatBackend};
use crate::error::WidgetError;
use crate::events::WidgetCallbacks;

const DEFAULT_GREETING: &str = "¡Hola! 👋 ¿En qué puedo ayudarte?";
const DEFAULT_ERROR_CONNECTION: &str = "Error de conexión. Por favor, intenta de nuevo.";
const DEFAULT_BOOKING_SUCCESS: &str =
    "✅ ¡Reserva confirmada! Te enviamos un email de confirmación.";
const DEFAULT_BOOKING_ERROR: &str = "Error al crear la reserva. Por favor, intenta de nuevo.";
const DEFAULT_CONFIRM_ERROR: &str = "Error al confirmar. Por favor intenta nuevamente.";

/// UI-visible widget state. Cheap to snapshot; the presentation layer
/// renders from clones and never holds the lock.
#[derive(Debug, Clone)]
pub struct WidgetState {
    pub is_open: bool,
    pub is_initialized: bool,
    pub is_loading: bool,
    pub conversation_id: Option<Uuid>,
    pub current_step: ConversationStep,
    pub messages: Vec<Message>,
    pub available_services: Vec<Service>,
    pub available_providers: Vec<Provider>,
    pub available_slots: Vec<TimeSlot>,
    pub selected_service: Option<Service>,
    pub selected_provider: Option<Provider>,
    pub selected_slot: Option<TimeSlot>,
    pub tenant: Option<TenantSettings>,
}

impl WidgetState {
    fn new(is_open: bool) -> Self {
        Self {
            is_open,
            is_initialized: false,
            is_loading: false,
            conversation_id: None,
            current_step: ConversationStep::Greeting,
            messages: Vec::new(),
            available_services: Vec::new(),
            available_providers: Vec::new(),
            available_slots: Vec::new(),
            selected_service: None,
            selected_provider: None,
            selected_slot: None,
            tenant: None,
        }
    }
}

/// Coordinates the message log, loading gate, and selection caches around
/// the dialogue contract.
pub struct ChatOrchestrator {
    backend: Box<dyn ChatBackend>,
    config: WidgetConfig,
    callbacks: WidgetCallbacks,
    state: Mutex<WidgetState>,
    /// Set once by [`destroy`]; in-flight transitions complete but their
    /// replies are no longer delivered into the UI state.
    ///
    /// [`destroy`]: ChatOrchestrator::destroy
    destroyed: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Box<dyn ChatBackend>,
        config: WidgetConfig,
        callbacks: WidgetCallbacks,
    ) -> Self {
        let is_open = config.widget.auto_open;
        Self {
            backend,
            config,
            callbacks,
            state: Mutex::new(WidgetState::new(is_open)),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current UI state.
    pub fn state(&self) -> WidgetState {
        self.lock_state().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn is_open(&self) -> bool {
        self.lock_state().is_open
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Load tenant settings and the service catalog, then seed the
    /// greeting. A backend failure degrades to the locally-seeded greeting
    /// so the widget is usable offline; the failure is still reported
    /// through the error callback.
    pub async fn initialize(&self) -> Result<(), WidgetError> {
        let loaded = async {
            let settings = self.backend.tenant_settings().await?;
            let services = self.backend.list_services().await?;
            Ok::<_, BackendError>((settings, services))
        }
        .await;

        match loaded {
            Ok((settings, services)) => {
                let greeting = self
                    .config
                    .widget
                    .greeting_message
                    .clone()
                    .unwrap_or_else(|| settings.greeting_message.clone());
                {
                    let mut state = self.lock_state();
                    state
                        .messages
                        .push(Message::new(MessageSender::Agent, greeting));
                    state.available_services =
                        services.into_iter().filter(|s| s.active).collect();
                    state.tenant = Some(settings);
                    state.is_initialized = true;
                }
                tracing::info!("Widget initialized");
                self.callbacks.ready();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Backend not available, using fallback initialization: {}", e);
                let greeting = self
                    .config
                    .widget
                    .greeting_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GREETING.to_string());
                {
                    let mut state = self.lock_state();
                    state
                        .messages
                        .push(Message::new(MessageSender::Agent, greeting));
                    state.is_initialized = true;
                }
                self.callbacks.ready();
                let err = WidgetError::Initialization(format!(
                    "backend not available, running in offline mode: {}",
                    e
                ));
                self.callbacks.error(&err);
                // Degraded startup is still a usable widget
                Ok(())
            }
        }
    }

    /// Tear the widget down. The session store is untouched; any in-flight
    /// transition completes and is discarded.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.lock_state().is_open = false;
    }

    pub fn open(&self) {
        self.lock_state().is_open = true;
        self.callbacks.opened();
    }

    pub fn close(&self) {
        self.lock_state().is_open = false;
        self.callbacks.closed();
    }

    /// Flip visibility, returning whether the widget is now open.
    pub fn toggle(&self) -> bool {
        let now_open = {
            let mut state = self.lock_state();
            state.is_open = !state.is_open;
            state.is_open
        };
        if now_open {
            self.callbacks.opened();
        } else {
            self.callbacks.closed();
        }
        now_open
    }

    // -----------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------

    /// Send free text through the dialogue contract.
    ///
    /// Appends the user message, runs the transition, appends the agent
    /// reply, and refreshes the option caches from its metadata. On
    /// failure the conversation keeps its last known good state and a
    /// system-visible error message is appended instead.
    pub async fn send_message(&self, text: &str) -> Result<Transition, WidgetError> {
        let conversation_id = self.begin_turn(text)?;

        let result = self
            .backend
            .send_message(conversation_id, text, self.config.user.as_ref())
            .await;
        if self.destroyed.load(Ordering::SeqCst) {
            // Torn-down UI: the transition completed against the store but
            // is not delivered anywhere.
            return result.map_err(|e| WidgetError::Transition(e.to_string()));
        }

        match result {
            Ok(transition) => {
                let mut state = self.lock_state();
                state.messages.push(agent_message(&transition));
                refresh_option_caches(&mut state, &transition);
                state.conversation_id = Some(transition.conversation_id);
                state.current_step = transition.step;
                state.is_loading = false;
                drop(state);
                Ok(transition)
            }
            Err(e) => {
                let err = WidgetError::Transition(e.to_string());
                tracing::warn!("Transition failed: {}", e);
                {
                    let mut state = self.lock_state();
                    state.messages.push(Message::new(
                        MessageSender::System,
                        self.message_or(
                            self.config.messages.error_connection.as_deref(),
                            DEFAULT_ERROR_CONNECTION,
                        ),
                    ));
                    state.is_loading = false;
                }
                self.callbacks.error(&err);
                Err(err)
            }
        }
    }

    /// Chip selection for a service: one code path with free text.
    pub async fn select_service(&self, service: Service) -> Result<Transition, WidgetError> {
        let transition = self
            .send_message(&format!("Selecciono: {}", service.name))
            .await?;
        self.lock_state().selected_service = Some(service);
        Ok(transition)
    }

    pub async fn select_provider(&self, provider: Provider) -> Result<Transition, WidgetError> {
        let transition = self
            .send_message(&format!("Prefiero con: {}", provider.name))
            .await?;
        self.lock_state().selected_provider = Some(provider);
        Ok(transition)
    }

    pub async fn select_time_slot(&self, slot: TimeSlot) -> Result<Transition, WidgetError> {
        let transition = self
            .send_message(&format!("Reservo para: {}", slot_label(&slot)))
            .await?;
        self.lock_state().selected_slot = Some(slot);
        Ok(transition)
    }

    /// Generic chip dispatch. `confirm` bypasses the message path because
    /// it must trigger the booking side effect rather than another prompt;
    /// every other value maps to its canonical phrase.
    pub async fn select_option(&self, value: &str) -> Result<Transition, WidgetError> {
        match value {
            "confirm" => self.confirm_booking().await,
            "services" => self.send_message("Ver Servicios").await,
            "providers" => self.send_message("Ver Profesionales").await,
            "retry" => self.send_message("Corregir").await,
            "restart" => self.send_message("Agendar otra hora").await,
            other => self.send_message(other).await,
        }
    }

    // -----------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------

    /// Create a booking from the locally selected entities.
    ///
    /// Fails with a `MISSING_SELECTION` error, without calling the
    /// backend, unless a service, provider, and slot have all been
    /// selected.
    pub async fn create_booking(
        &self,
        customer_name: &str,
        customer_email: &str,
        customer_phone: Option<&str>,
    ) -> Result<Booking, WidgetError> {
        let request = {
            let mut state = self.lock_state();
            if state.is_loading || self.destroyed.load(Ordering::SeqCst) {
                return Err(WidgetError::NotAccepting);
            }
            let (service, provider, slot) = match (
                state.selected_service.clone(),
                state.selected_provider.clone(),
                state.selected_slot.clone(),
            ) {
                (Some(service), Some(provider), Some(slot)) => (service, provider, slot),
                (service, provider, slot) => {
                    let missing = [
                        service.is_none().then_some("service"),
                        provider.is_none().then_some("provider"),
                        slot.is_none().then_some("slot"),
                    ]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", ");
                    let err = WidgetError::MissingSelection(missing);
                    state.messages.push(Message::new(
                        MessageSender::System,
                        self.message_or(
                            self.config.messages.booking_error.as_deref(),
                            DEFAULT_BOOKING_ERROR,
                        ),
                    ));
                    drop(state);
                    self.callbacks.error(&err);
                    return Err(err);
                }
            };
            state.is_loading = true;
            CreateBookingRequest {
                service_id: service.id,
                provider_id: provider.id,
                start: slot.start,
                end: slot.end,
                customer_name: customer_name.to_string(),
                customer_email: customer_email.to_string(),
                customer_phone: customer_phone.map(String::from),
            }
        };

        match self.backend.create_booking(request).await {
            Ok(booking) => {
                if !self.destroyed.load(Ordering::SeqCst) {
                    let mut state = self.lock_state();
                    state.messages.push(
                        Message::new(
                            MessageSender::System,
                            self.message_or(
                                self.config.messages.booking_success.as_deref(),
                                DEFAULT_BOOKING_SUCCESS,
                            ),
                        )
                        .with_metadata(MessageMetadata::BookingConfirmation {
                            booking: Some(booking.clone()),
                        }),
                    );
                    state.current_step = ConversationStep::Completed;
                    state.is_loading = false;
                }
                self.callbacks.booking_created(&booking);
                Ok(booking)
            }
            Err(e) => {
                let err = match e {
                    BackendError::MissingSelection(field) => WidgetError::MissingSelection(field),
                    other => WidgetError::Booking(other.to_string()),
                };
                tracing::warn!("Booking failed: {}", err);
                if !self.destroyed.load(Ordering::SeqCst) {
                    let mut state = self.lock_state();
                    state.messages.push(Message::new(
                        MessageSender::System,
                        self.message_or(
                            self.config.messages.booking_error.as_deref(),
                            DEFAULT_BOOKING_ERROR,
                        ),
                    ));
                    state.is_loading = false;
                }
                self.callbacks.error(&err);
                Err(err)
            }
        }
    }

    /// The `confirm` chip path: books from the conversation context held
    /// by the engine, not from the local mirrors.
    async fn confirm_booking(&self) -> Result<Transition, WidgetError> {
        let conversation_id = {
            let mut state = self.lock_state();
            if state.is_loading || self.destroyed.load(Ordering::SeqCst) {
                return Err(WidgetError::NotAccepting);
            }
            let Some(id) = state.conversation_id else {
                let err =
                    WidgetError::Booking("no active conversation to confirm".to_string());
                state
                    .messages
                    .push(Message::new(MessageSender::System, DEFAULT_CONFIRM_ERROR));
                drop(state);
                self.callbacks.error(&err);
                return Err(err);
            };
            state.is_loading = true;
            state
                .messages
                .push(Message::new(MessageSender::User, "Sí, confirmar"));
            id
        };

        let result = self.backend.confirm_pending_booking(conversation_id).await;
        if self.destroyed.load(Ordering::SeqCst) {
            return result
                .map(|(transition, _)| transition)
                .map_err(|e| WidgetError::Booking(e.to_string()));
        }

        match result {
            Ok((transition, booking)) => {
                {
                    let mut state = self.lock_state();
                    state.messages.push(agent_message(&transition));
                    state.conversation_id = Some(transition.conversation_id);
                    state.current_step = transition.step;
                    state.is_loading = false;
                }
                self.callbacks.booking_created(&booking);
                Ok(transition)
            }
            Err(e) => {
                let err = match e {
                    BackendError::MissingSelection(field) => WidgetError::MissingSelection(field),
                    other => WidgetError::Booking(other.to_string()),
                };
                tracing::warn!("Confirmation failed: {}", err);
                {
                    let mut state = self.lock_state();
                    state
                        .messages
                        .push(Message::new(MessageSender::System, DEFAULT_CONFIRM_ERROR));
                    state.is_loading = false;
                }
                self.callbacks.error(&err);
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------

    /// Gate check plus user-message append; returns the conversation id to
    /// send with.
    fn begin_turn(&self, text: &str) -> Result<Option<Uuid>, WidgetError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(WidgetError::NotAccepting);
        }
        let mut state = self.lock_state();
        if state.is_loading {
            tracing::warn!("Input refused while a transition is outstanding");
            return Err(WidgetError::NotAccepting);
        }
        state.is_loading = true;
        state
            .messages
            .push(Message::new(MessageSender::User, text));
        Ok(state.conversation_id)
    }

    fn message_or(&self, configured: Option<&str>, default: &str) -> String {
        configured.unwrap_or(default).to_string()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WidgetState> {
        // A poisoned lock only means a panic mid-update; the state is
        // still renderable.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn agent_message(transition: &Transition) -> Message {
    let mut message = Message::new(MessageSender::Agent, transition.reply.text.clone());
    message.metadata = transition.reply.metadata.clone();
    message
}

/// Replace the selectable-entity caches from the reply metadata. Replies
/// without chips clear all three so stale buttons never survive a turn.
fn refresh_option_caches(state: &mut WidgetState, transition: &Transition) {
    state.available_services.clear();
    state.available_providers.clear();
    state.available_slots.clear();
    match &transition.reply.metadata {
        Some(MessageMetadata::ServiceChips { services }) => {
            state.available_services = services.clone();
        }
        Some(MessageMetadata::ProviderChips { providers }) => {
            state.available_providers = providers.clone();
        }
        Some(MessageMetadata::TimeSlots { time_slots }) => {
            state.available_slots = time_slots.clone();
        }
        _ => {}
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use async_trait::async_trait;
    use reserva_core::catalog::Catalog;
    use reserva_dialogue::{DialogueEngine, SessionStore, SlotGenerator};

    use crate::backend::LocalBackend;

    fn local_backend() -> Box<LocalBackend> {
        let engine = Arc::new(DialogueEngine::new(
            Catalog::demo(),
            SlotGenerator::default(),
            SessionStore::new(30),
        ));
        Box::new(LocalBackend::new(engine, &WidgetConfig::default()))
    }

    fn make_orchestrator() -> ChatOrchestrator {
        ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new(),
        )
    }

    /// Backend that fails every operation, for degraded-path tests.
    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn tenant_settings(&self) -> Result<TenantSettings, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn list_services(&self) -> Result<Vec<Service>, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn send_message(
            &self,
            _conversation_id: Option<Uuid>,
            _text: &str,
            _user_context: Option<&reserva_core::types::UserContext>,
        ) -> Result<Transition, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn create_booking(
            &self,
            _request: CreateBookingRequest,
        ) -> Result<Booking, BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
        async fn confirm_pending_booking(
            &self,
            _conversation_id: Uuid,
        ) -> Result<(Transition, Booking), BackendError> {
            Err(BackendError::Transport("connection refused".to_string()))
        }
    }

    async fn drive_to_confirm(orchestrator: &ChatOrchestrator) {
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();
        orchestrator.select_option("services").await.unwrap();
        let service = orchestrator.state().available_services[0].clone();
        orchestrator.select_service(service).await.unwrap();
        let slot = orchestrator.state().available_slots[0].clone();
        orchestrator.select_time_slot(slot).await.unwrap();
        orchestrator.send_message("Ana").await.unwrap();
        orchestrator.send_message("Pérez").await.unwrap();
        orchestrator.send_message("ana@example.com").await.unwrap();
        orchestrator.send_message("+56911112222").await.unwrap();
        assert_eq!(
            orchestrator.state().current_step,
            ConversationStep::ConfirmDetails
        );
    }

    // ---- Initialization ----

    #[tokio::test]
    async fn test_initialize_seeds_greeting_and_services() {
        let ready_count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&ready_count);
        let orchestrator = ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_ready(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        orchestrator.initialize().await.unwrap();
        let state = orchestrator.state();
        assert!(state.is_initialized);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].sender, MessageSender::Agent);
        assert!(state.messages[0].text.contains("Bienvenido"));
        assert_eq!(state.available_services.len(), 4);
        assert_eq!(ready_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_greeting_override() {
        let mut config = WidgetConfig::default();
        config.widget.greeting_message = Some("Hola desde la tienda".to_string());
        let orchestrator =
            ChatOrchestrator::new(local_backend(), config, WidgetCallbacks::new());
        orchestrator.initialize().await.unwrap();
        assert_eq!(orchestrator.state().messages[0].text, "Hola desde la tienda");
    }

    #[tokio::test]
    async fn test_initialize_degrades_offline() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        let orchestrator = ChatOrchestrator::new(
            Box::new(FailingBackend),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_error(move |err| {
                e.lock().unwrap().push(err.code());
            }),
        );

        orchestrator.initialize().await.unwrap();
        let state = orchestrator.state();
        // Still usable: initialized with the default greeting
        assert!(state.is_initialized);
        assert_eq!(state.messages[0].text, DEFAULT_GREETING);
        assert_eq!(*errors.lock().unwrap(), vec!["INIT_ERROR"]);
    }

    // ---- Messaging ----

    #[tokio::test]
    async fn test_send_message_appends_pair_and_updates_state() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();

        let transition = orchestrator.send_message("hola").await.unwrap();
        assert_eq!(transition.step, ConversationStep::OptionsSelection);

        let state = orchestrator.state();
        // greeting + user + agent
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[1].sender, MessageSender::User);
        assert_eq!(state.messages[1].text, "hola");
        assert_eq!(state.messages[2].sender, MessageSender::Agent);
        assert_eq!(state.conversation_id, Some(transition.conversation_id));
        assert_eq!(state.current_step, ConversationStep::OptionsSelection);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_send_failure_preserves_state_and_reports() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        let orchestrator = ChatOrchestrator::new(
            Box::new(FailingBackend),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_error(move |err| {
                e.lock().unwrap().push(err.code());
            }),
        );

        let err = orchestrator.send_message("hola").await.unwrap_err();
        assert_eq!(err.code(), "TRANSITION_ERROR");

        let state = orchestrator.state();
        // user message + system error message
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].sender, MessageSender::System);
        assert_eq!(state.messages[1].text, DEFAULT_ERROR_CONNECTION);
        // Conversation left in last known good state
        assert!(state.conversation_id.is_none());
        assert_eq!(state.current_step, ConversationStep::Greeting);
        assert!(!state.is_loading);
        assert_eq!(*errors.lock().unwrap(), vec!["TRANSITION_ERROR"]);
    }

    #[tokio::test]
    async fn test_send_failure_uses_configured_message() {
        let mut config = WidgetConfig::default();
        config.messages.error_connection = Some("Sin conexión 😢".to_string());
        let orchestrator =
            ChatOrchestrator::new(Box::new(FailingBackend), config, WidgetCallbacks::new());
        let _ = orchestrator.send_message("hola").await;
        let state = orchestrator.state();
        assert_eq!(state.messages[1].text, "Sin conexión 😢");
    }

    #[tokio::test]
    async fn test_loading_gate_refuses_input() {
        let orchestrator = make_orchestrator();
        orchestrator.lock_state().is_loading = true;
        let err = orchestrator.send_message("hola").await.unwrap_err();
        assert!(matches!(err, WidgetError::NotAccepting));
        // Nothing was appended behind the gate
        assert!(orchestrator.state().messages.is_empty());
    }

    // ---- Option caches ----

    #[tokio::test]
    async fn test_caches_follow_reply_metadata() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();

        orchestrator.select_option("providers").await.unwrap();
        let state = orchestrator.state();
        assert_eq!(state.available_providers.len(), 3);
        assert!(state.available_services.is_empty());

        orchestrator
            .send_message("Prefiero con: Carlos Ruiz")
            .await
            .unwrap();
        let state = orchestrator.state();
        // Provider chips replaced by that provider's services
        assert_eq!(state.available_services.len(), 1);
        assert!(state.available_providers.is_empty());
    }

    #[tokio::test]
    async fn test_stale_chips_cleared_on_plain_reply() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();
        orchestrator.select_option("services").await.unwrap();
        let service = orchestrator.state().available_services[0].clone();
        orchestrator.select_service(service).await.unwrap();
        assert!(!orchestrator.state().available_slots.is_empty());

        let slot = orchestrator.state().available_slots[0].clone();
        orchestrator.select_time_slot(slot).await.unwrap();
        // The ask-name reply carries no chips; every cache is cleared
        let state = orchestrator.state();
        assert!(state.available_services.is_empty());
        assert!(state.available_providers.is_empty());
        assert!(state.available_slots.is_empty());
    }

    // ---- Selection mirrors ----

    #[tokio::test]
    async fn test_selection_mirrors_record_entities() {
        let orchestrator = make_orchestrator();
        drive_to_confirm(&orchestrator).await;
        let state = orchestrator.state();
        assert!(state.selected_service.is_some());
        assert!(state.selected_slot.is_some());
        // Provider never explicitly chosen on this path
        assert!(state.selected_provider.is_none());
    }

    // ---- Confirm path ----

    #[tokio::test]
    async fn test_confirm_option_books_and_completes() {
        let bookings = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::clone(&bookings);
        let orchestrator = ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_booking_created(move |booking| {
                b.lock().unwrap().push(booking.id.clone());
            }),
        );

        drive_to_confirm(&orchestrator).await;
        // Confirm requires the selected slot to resolve in context, which
        // the chip path guarantees.
        let transition = orchestrator.select_option("confirm").await.unwrap();
        assert_eq!(transition.step, ConversationStep::Completed);

        let state = orchestrator.state();
        assert_eq!(state.current_step, ConversationStep::Completed);
        let last = state.messages.last().unwrap();
        assert_eq!(last.sender, MessageSender::Agent);
        assert!(matches!(
            last.metadata,
            Some(MessageMetadata::BookingConfirmation { booking: Some(_) })
        ));
        // The user echo precedes the terminal reply
        let echo = &state.messages[state.messages.len() - 2];
        assert_eq!(echo.sender, MessageSender::User);
        assert_eq!(echo.text, "Sí, confirmar");
        assert_eq!(bookings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_without_conversation_fails() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        let err = orchestrator.select_option("confirm").await.unwrap_err();
        assert_eq!(err.code(), "BOOKING_ERROR");
        let state = orchestrator.state();
        assert_eq!(
            state.messages.last().unwrap().text,
            DEFAULT_CONFIRM_ERROR
        );
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_confirm_with_incomplete_context_reports_missing_selection() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        let orchestrator = ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_error(move |err| {
                e.lock().unwrap().push(err.code());
            }),
        );
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();

        let err = orchestrator.select_option("confirm").await.unwrap_err();
        assert_eq!(err.code(), "MISSING_SELECTION");
        assert_eq!(*errors.lock().unwrap(), vec!["MISSING_SELECTION"]);
        // Dialogue state untouched by the failed confirm
        assert_eq!(
            orchestrator.state().current_step,
            ConversationStep::OptionsSelection
        );
    }

    // ---- Option phrase mapping ----

    #[tokio::test]
    async fn test_option_values_map_to_canonical_phrases() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();
        orchestrator.select_option("services").await.unwrap();
        let state = orchestrator.state();
        let user_texts: Vec<&str> = state
            .messages
            .iter()
            .filter(|m| m.sender == MessageSender::User)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(user_texts, vec!["hola", "Ver Servicios"]);
    }

    // ---- Direct booking path ----

    #[tokio::test]
    async fn test_create_booking_requires_selections() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        let orchestrator = ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new().on_error(move |err| {
                e.lock().unwrap().push(err.code());
            }),
        );
        orchestrator.initialize().await.unwrap();

        let err = orchestrator
            .create_booking("Ana Pérez", "ana@example.com", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_SELECTION");
        assert!(err.to_string().contains("provider"));
        assert_eq!(*errors.lock().unwrap(), vec!["MISSING_SELECTION"]);
        // Error surfaced to the user as a system message
        let state = orchestrator.state();
        assert_eq!(state.messages.last().unwrap().sender, MessageSender::System);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_create_booking_happy_path() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.send_message("hola").await.unwrap();
        orchestrator.select_option("providers").await.unwrap();
        let provider = orchestrator.state().available_providers[0].clone();
        orchestrator.select_provider(provider).await.unwrap();
        let service = orchestrator.state().available_services[0].clone();
        orchestrator.select_service(service).await.unwrap();
        let slot = orchestrator.state().available_slots[0].clone();
        orchestrator.select_time_slot(slot).await.unwrap();

        let booking = orchestrator
            .create_booking("Ana Pérez", "ana@example.com", Some("+56911112222"))
            .await
            .unwrap();
        assert_eq!(booking.provider_id, "p1");
        let state = orchestrator.state();
        assert_eq!(state.current_step, ConversationStep::Completed);
        assert_eq!(
            state.messages.last().unwrap().text,
            DEFAULT_BOOKING_SUCCESS
        );
    }

    // ---- Visibility ----

    #[tokio::test]
    async fn test_open_close_toggle_fire_callbacks() {
        let opens = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let (o, c) = (Arc::clone(&opens), Arc::clone(&closes));
        let orchestrator = ChatOrchestrator::new(
            local_backend(),
            WidgetConfig::default(),
            WidgetCallbacks::new()
                .on_open(move || {
                    o.fetch_add(1, Ordering::SeqCst);
                })
                .on_close(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
        );

        assert!(!orchestrator.is_open());
        orchestrator.open();
        assert!(orchestrator.is_open());
        orchestrator.close();
        assert!(!orchestrator.is_open());
        assert!(orchestrator.toggle());
        assert!(!orchestrator.toggle());
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auto_open_from_config() {
        let mut config = WidgetConfig::default();
        config.widget.auto_open = true;
        let orchestrator =
            ChatOrchestrator::new(local_backend(), config, WidgetCallbacks::new());
        assert!(orchestrator.is_open());
    }

    // ---- Teardown ----

    #[tokio::test]
    async fn test_destroyed_widget_refuses_input() {
        let orchestrator = make_orchestrator();
        orchestrator.initialize().await.unwrap();
        orchestrator.destroy();
        let err = orchestrator.send_message("hola").await.unwrap_err();
        assert!(matches!(err, WidgetError::NotAccepting));
        // Only the greeting remains; nothing was delivered after teardown
        assert_eq!(orchestrator.state().messages.len(), 1);
    }
}
