//! Dialogue state machine driver.
//!
//! Resolves (or mints) the conversation, walks the rule cascade, persists
//! the updated conversation, and returns the structured transition. Never
//! fails for any input: the cascade's fallback rule guarantees a reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reserva_core::catalog::Catalog;
use reserva_core::config::WidgetConfig;
use reserva_core::types::{AgentReply, ConversationStep, SessionContext};

use crate::rules::{self, RuleEnv, Turn};
use crate::session::SessionStore;
use crate::slots::SlotGenerator;

/// The result of one dialogue turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub conversation_id: Uuid,
    pub step: ConversationStep,
    pub reply: AgentReply,
    pub context: SessionContext,
}

/// Maps `(conversation, user input)` to `(next step, reply, context)`.
///
/// The session store is the only mutation point: every transition writes
/// the updated conversation back, keyed by conversation id.
pub struct DialogueEngine {
    catalog: Catalog,
    slots: SlotGenerator,
    sessions: SessionStore,
}

impl DialogueEngine {
    pub fn new(catalog: Catalog, slots: SlotGenerator, sessions: SessionStore) -> Self {
        Self {
            catalog,
            slots,
            sessions,
        }
    }

    /// Build an engine from widget configuration.
    pub fn from_config(catalog: Catalog, config: &WidgetConfig) -> Self {
        Self::new(
            catalog,
            SlotGenerator::from_config(&config.dialogue),
            SessionStore::new(config.dialogue.session_ttl_minutes),
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one user turn against the current wall clock.
    pub fn transition(&self, conversation_id: Option<Uuid>, text: &str) -> Transition {
        self.transition_at(Utc::now(), conversation_id, text)
    }

    /// Process one user turn with an injected clock (slot generation is
    /// the only time-dependent rule).
    pub fn transition_at(
        &self,
        now: DateTime<Utc>,
        conversation_id: Option<Uuid>,
        text: &str,
    ) -> Transition {
        // Unknown or absent ids mint a fresh conversation; identity is
        // always explicit from here on.
        let mut conversation = conversation_id
            .and_then(|id| self.sessions.get(id))
            .unwrap_or_else(|| self.sessions.create());

        let turn = Turn::new(text);
        let env = RuleEnv {
            catalog: &self.catalog,
            slots: &self.slots,
            now,
        };
        let (rule_name, reply) = rules::evaluate(&env, &turn, &mut conversation);
        tracing::debug!(
            conversation_id = %conversation.id,
            rule = rule_name,
            step = %conversation.step,
            "Dialogue transition"
        );

        self.sessions.set(conversation.clone());

        Transition {
            conversation_id: conversation.id,
            step: conversation.step,
            reply,
            context: conversation.context,
        }
    }
}
