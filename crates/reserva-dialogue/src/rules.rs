//! The dialogue rule cascade.
//!
//! The transition logic is an explicit ordered list of `(predicate,
//! handler)` pairs, evaluated top to bottom with first match winning, so a
//! new intent can be inserted without re-deriving the priority order by
//! inspection. Intent detection is deliberately a handful of keyword
//! heuristics, not natural-language understanding.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use reserva_core::catalog::Catalog;
use reserva_core::types::{
    slot_label, AgentReply, Conversation, ConversationStep, MessageMetadata, OptionChip, Provider,
    SessionContext,
};

use crate::slots::SlotGenerator;

// =============================================================================
// Keyword patterns
// =============================================================================

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bhola\b").unwrap());

static PROVIDERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)profesional|providers").unwrap());

static SERVICES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)servicio|services").unwrap());

static RESERVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\breserv(?:o|ar)\s+para\b").unwrap());

/// Tokens accepted as a confirmation at the recap step.
const AFFIRMATIVE_TOKENS: &[&str] = &["confirm", "sí, confirmar", "sí", "si", "yes", "ok"];

/// Inputs this short count as a greeting on first contact.
const GREETING_MAX_CHARS: usize = 5;

fn is_affirmative(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    AFFIRMATIVE_TOKENS.contains(&normalized.as_str())
}

// =============================================================================
// Agent texts
// =============================================================================

const TEXT_GREETING: &str = "👋 ¡Hola! Un gusto saludarte.\n\nPara ayudarte mejor, cuéntame: \
                             ¿Prefieres ver nuestros servicios o buscar un profesional?";
const TEXT_PROVIDER_LIST: &str = "Perfecto. Estos son nuestros especialistas disponibles:";
const TEXT_SERVICE_CATALOG: &str = "Aquí tienes nuestro catálogo de servicios:";
const TEXT_SLOT_CHOSEN: &str = "¡Excelente elección! 📝 Para coordinar tu reserva, primero \
                                necesito tu **nombre** (sin apellidos).";
const TEXT_ASK_EMAIL: &str =
    "Perfecto. ¿A qué **correo electrónico** te enviamos la confirmación?";
const TEXT_ASK_PHONE: &str =
    "Anotado. Por último, ¿me indicas un número de **teléfono** de contacto?";
const TEXT_CONFIRMED: &str = "¡Reserva confirmada con éxito! 🎉 \n\nTe hemos enviado un correo \
                              con todos los detalles de tu cita.";
const TEXT_RETRY: &str =
    "Entendido. Comencemos de nuevo para corregir los datos.\n\n¿Cuál es tu **nombre**?";
const TEXT_FALLBACK: &str =
    "Disculpa, no entendí. Por favor selecciona una de las opciones disponibles.";

fn greeting_options() -> Vec<OptionChip> {
    vec![
        OptionChip::new("Ver Servicios", "services"),
        OptionChip::new("Ver Profesionales", "providers"),
    ]
}

fn confirm_options() -> Vec<OptionChip> {
    vec![
        OptionChip::new("Sí, confirmar", "confirm"),
        OptionChip::new("Corregir", "retry"),
    ]
}

// =============================================================================
// Rule table
// =============================================================================

/// One user turn, pre-lowercased once for the keyword heuristics.
pub struct Turn<'a> {
    pub raw: &'a str,
    pub lower: String,
}

impl<'a> Turn<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }
}

/// Read-only collaborators available to every rule.
pub struct RuleEnv<'a> {
    pub catalog: &'a Catalog,
    pub slots: &'a SlotGenerator,
    pub now: DateTime<Utc>,
}

type Predicate = fn(&RuleEnv<'_>, &Turn<'_>, &Conversation) -> bool;
type Handler = fn(&RuleEnv<'_>, &Turn<'_>, &mut Conversation) -> AgentReply;

/// A single dispatch entry: `apply` runs only when `matches` is the first
/// predicate in [`RULES`] to hold.
pub struct Rule {
    pub name: &'static str,
    pub matches: Predicate,
    pub apply: Handler,
}

/// The cascade, highest priority first. The final entry always matches,
/// which is what guarantees every input produces a reply.
pub const RULES: &[Rule] = &[
    Rule {
        name: "provider-mention",
        matches: |env, turn, _| env.catalog.find_provider_in(&turn.lower).is_some(),
        apply: apply_provider_mention,
    },
    Rule {
        name: "greeting",
        matches: |_, turn, conv| {
            conv.step == ConversationStep::Greeting
                && (turn.raw.trim() == "/start"
                    || GREETING_RE.is_match(turn.raw)
                    || turn.raw.trim().chars().count() < GREETING_MAX_CHARS)
        },
        apply: |_, _, conv| {
            conv.step = ConversationStep::OptionsSelection;
            conv.context = SessionContext::default();
            AgentReply::with_metadata(
                TEXT_GREETING,
                MessageMetadata::OptionChips {
                    options: greeting_options(),
                },
            )
        },
    },
    Rule {
        name: "option-dispatch",
        matches: |_, turn, conv| {
            conv.step == ConversationStep::OptionsSelection
                || (conv.step == ConversationStep::Greeting
                    && (SERVICES_RE.is_match(&turn.lower) || PROVIDERS_RE.is_match(&turn.lower)))
        },
        apply: |env, turn, conv| {
            conv.context = SessionContext::default();
            if PROVIDERS_RE.is_match(&turn.lower) {
                conv.step = ConversationStep::ProviderSelection;
                AgentReply::with_metadata(
                    TEXT_PROVIDER_LIST,
                    MessageMetadata::ProviderChips {
                        providers: env.catalog.active_providers(),
                    },
                )
            } else {
                // Ambiguous input defaults to the service catalog.
                conv.step = ConversationStep::ServiceSelection;
                AgentReply::with_metadata(
                    TEXT_SERVICE_CATALOG,
                    MessageMetadata::ServiceChips {
                        services: env.catalog.active_services(),
                    },
                )
            }
        },
    },
    Rule {
        name: "provider-chosen",
        matches: |env, turn, conv| {
            conv.step == ConversationStep::ProviderSelection
                && env.catalog.find_provider_in(&turn.lower).is_some()
        },
        apply: apply_provider_chosen,
    },
    Rule {
        name: "service-chosen",
        matches: |env, turn, conv| {
            conv.step == ConversationStep::ServiceSelection
                && env.catalog.find_service_in(&turn.lower).is_some()
        },
        apply: |env, turn, conv| {
            let service = env
                .catalog
                .find_service_in(&turn.lower)
                .expect("predicate checked service")
                .clone();
            let provider_id = conv
                .context
                .provider_id
                .clone()
                .or_else(|| env.catalog.default_provider_id().map(String::from))
                .unwrap_or_default();
            let slots = env.slots.generate_at(env.now, &service.id, &provider_id);

            conv.step = ConversationStep::TimeSelection;
            conv.context.service_id = Some(service.id.clone());
            conv.context.offered_slots = slots.clone();

            if slots.is_empty() {
                return AgentReply::text_only(format!(
                    "Por ahora no tenemos horas disponibles para {}. Inténtalo más tarde.",
                    service.name
                ));
            }
            AgentReply::with_metadata(
                format!(
                    "📅 Aquí tienes la disponibilidad más próxima para {} (Próximos {} días):",
                    service.name,
                    env.slots.horizon_days()
                ),
                MessageMetadata::TimeSlots { time_slots: slots },
            )
        },
    },
    Rule {
        name: "slot-chosen",
        matches: |_, turn, conv| {
            conv.step == ConversationStep::TimeSelection || RESERVE_RE.is_match(&turn.lower)
        },
        apply: |_, turn, conv| {
            conv.context.selected_time_text = Some(turn.raw.to_string());
            conv.context.selected_slot = conv
                .context
                .offered_slots
                .iter()
                .find(|slot| {
                    turn.raw.contains(&slot_label(slot))
                        || turn.raw.contains(&slot.start.to_rfc3339())
                })
                .cloned();
            conv.step = ConversationStep::AskName;
            AgentReply::text_only(TEXT_SLOT_CHOSEN)
        },
    },
    Rule {
        name: "collect-name",
        matches: |_, _, conv| conv.step == ConversationStep::AskName,
        apply: |_, turn, conv| {
            let name = turn.raw.trim().to_string();
            conv.context.name = Some(name.clone());
            conv.step = ConversationStep::AskSurname;
            AgentReply::text_only(format!(
                "Gracias {}. ¿Me podrías indicar tus **apellidos**?",
                name
            ))
        },
    },
    Rule {
        name: "collect-surname",
        matches: |_, _, conv| conv.step == ConversationStep::AskSurname,
        apply: |_, turn, conv| {
            let surname = turn.raw.trim().to_string();
            let full_name = match &conv.context.name {
                Some(name) => format!("{} {}", name, surname),
                None => surname.clone(),
            };
            conv.context.surname = Some(surname);
            conv.context.full_name = Some(full_name);
            conv.step = ConversationStep::AskEmail;
            AgentReply::text_only(TEXT_ASK_EMAIL)
        },
    },
    Rule {
        name: "collect-email",
        matches: |_, _, conv| conv.step == ConversationStep::AskEmail,
        apply: |_, turn, conv| {
            // Verbatim capture; format validation belongs to a collaborator.
            conv.context.email = Some(turn.raw.trim().to_string());
            conv.step = ConversationStep::AskPhone;
            AgentReply::text_only(TEXT_ASK_PHONE)
        },
    },
    Rule {
        name: "collect-phone",
        matches: |_, _, conv| conv.step == ConversationStep::AskPhone,
        apply: |_, turn, conv| {
            let phone = turn.raw.trim().to_string();
            conv.context.phone = Some(phone.clone());
            conv.step = ConversationStep::ConfirmDetails;
            AgentReply::with_metadata(
                format!(
                    "¡Gracias! Por favor confirma si estos datos son correctos:\n\n\
                     👤 **Nombre:** {}\n📧 **Email:** {}\n📱 **Teléfono:** {}\n\n\
                     ¿Procedemos con la reserva?",
                    conv.context.full_name.as_deref().unwrap_or(""),
                    conv.context.email.as_deref().unwrap_or(""),
                    phone
                ),
                MessageMetadata::OptionChips {
                    options: confirm_options(),
                },
            )
        },
    },
    Rule {
        name: "confirm-details",
        matches: |_, turn, conv| {
            conv.step == ConversationStep::ConfirmDetails
                || (conv.step == ConversationStep::Confirmation && is_affirmative(turn.raw))
        },
        apply: |_, turn, conv| {
            if is_affirmative(turn.raw) {
                // Re-affirming at Confirmation re-emits the same reply; the
                // booking side effect lives behind the finalizer, not here.
                conv.step = ConversationStep::Confirmation;
                AgentReply::with_metadata(
                    TEXT_CONFIRMED,
                    MessageMetadata::BookingConfirmation { booking: None },
                )
            } else {
                // Full redo of the collection sequence, not per-field edit.
                conv.context.clear_contact();
                conv.step = ConversationStep::AskName;
                AgentReply::text_only(TEXT_RETRY)
            }
        },
    },
    Rule {
        name: "fallback",
        matches: |_, _, _| true,
        apply: apply_fallback,
    },
];

/// Walk the cascade and apply the first matching rule. Total: the final
/// rule matches everything, so a reply is always produced.
pub fn evaluate(
    env: &RuleEnv<'_>,
    turn: &Turn<'_>,
    conversation: &mut Conversation,
) -> (&'static str, AgentReply) {
    for rule in RULES {
        if (rule.matches)(env, turn, conversation) {
            return (rule.name, (rule.apply)(env, turn, conversation));
        }
    }
    // Unreachable while the fallback rule closes the table; kept total
    // rather than panicking.
    ("fallback", apply_fallback(env, turn, conversation))
}

// =============================================================================
// Handlers too large for the table
// =============================================================================

fn provider_service_reply(env: &RuleEnv<'_>, provider: &Provider, text: String) -> AgentReply {
    AgentReply::with_metadata(
        text,
        MessageMetadata::ServiceChips {
            services: env.catalog.services_for(provider),
        },
    )
}

fn apply_provider_mention(
    env: &RuleEnv<'_>,
    turn: &Turn<'_>,
    conv: &mut Conversation,
) -> AgentReply {
    let provider = env
        .catalog
        .find_provider_in(&turn.lower)
        .expect("predicate checked provider")
        .clone();
    // A direct mention short-circuits the funnel: prior selections are
    // superseded by the named provider.
    conv.step = ConversationStep::ServiceSelection;
    conv.context = SessionContext {
        provider_id: Some(provider.id.clone()),
        ..SessionContext::default()
    };
    provider_service_reply(
        env,
        &provider,
        format!(
            "¡Entendido! Veo que buscas atenderte con {}.\n\nSelecciona el servicio que necesitas:",
            provider.name
        ),
    )
}

fn apply_provider_chosen(
    env: &RuleEnv<'_>,
    turn: &Turn<'_>,
    conv: &mut Conversation,
) -> AgentReply {
    let provider = env
        .catalog
        .find_provider_in(&turn.lower)
        .expect("predicate checked provider")
        .clone();
    conv.step = ConversationStep::ServiceSelection;
    conv.context = SessionContext {
        provider_id: Some(provider.id.clone()),
        ..SessionContext::default()
    };
    provider_service_reply(
        env,
        &provider,
        format!(
            "Excelente, {} realiza los siguientes servicios. ¿Cuál prefieres?",
            provider.name
        ),
    )
}

fn apply_fallback(env: &RuleEnv<'_>, _turn: &Turn<'_>, conv: &mut Conversation) -> AgentReply {
    // State is left untouched; the reply repeats whatever is currently
    // selectable so the conversation never stalls.
    let metadata = match conv.step {
        ConversationStep::OptionsSelection => Some(MessageMetadata::OptionChips {
            options: greeting_options(),
        }),
        ConversationStep::ServiceSelection => {
            let services = match conv
                .context
                .provider_id
                .as_deref()
                .and_then(|id| env.catalog.provider_by_id(id))
            {
                Some(provider) => env.catalog.services_for(provider),
                None => env.catalog.active_services(),
            };
            Some(MessageMetadata::ServiceChips { services })
        }
        ConversationStep::ProviderSelection => Some(MessageMetadata::ProviderChips {
            providers: env.catalog.active_providers(),
        }),
        ConversationStep::TimeSelection if !conv.context.offered_slots.is_empty() => {
            Some(MessageMetadata::TimeSlots {
                time_slots: conv.context.offered_slots.clone(),
            })
        }
        ConversationStep::ConfirmDetails => Some(MessageMetadata::OptionChips {
            options: confirm_options(),
        }),
        _ => None,
    };
    AgentReply {
        text: TEXT_FALLBACK.to_string(),
        metadata,
    }
}

// =============================================================================
// Tests
// =============================================================================
