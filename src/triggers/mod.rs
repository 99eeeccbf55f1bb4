//! Event bus and trigger system.
//!
//! Triggered abilities respond to game events. The rules engine emits a
//! [`GameEvent`] for everything observable that happens; the
//! [`TriggerRegistry`] finds the listeners of cards in play that answer it.
//!
//! ## Key Components
//!
//! - [`EventKind`]: the event alphabet
//! - [`GameEvent`]: one occurrence, with subject/actor cards and a player
//! - [`TriggerFilter`]: which occurrences a listener answers
//! - [`Condition`]: state predicates gating abilities and effects
//! - [`TriggerRegistry`]: per-card listeners and deterministic matching
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use rust_lorcana::cards::{Card, CardId, CardRegistry};
//! use rust_lorcana::core::{GameState, PlayerId, RulesConfig};
//! use rust_lorcana::effects::{AbilityDefinition, Effect};
//! use rust_lorcana::triggers::{EventKind, GameEvent, TriggerFilter, TriggerRegistry};
//! use rust_lorcana::zones::{Zone, ZonePosition};
//!
//! let mut cards = CardRegistry::new();
//! cards.register(Card::character(CardId::new(1), "Stitch", 2).with_stats(2, 2, 1));
//! let card = cards.get(CardId::new(1)).unwrap().clone();
//!
//! let mut state = GameState::new(&RulesConfig::default(), 42);
//! let stitch = state.spawn(&card, PlayerId::new(0), Zone::Play, ZonePosition::Top).unwrap();
//!
//! // "Whenever this character quests, draw a card."
//! let ability = AbilityDefinition::triggered(EventKind::Quested, TriggerFilter::SubjectIsSelf, "")
//!     .with_effect(Effect::draw(1));
//! let mut registry = TriggerRegistry::new();
//! registry.register(stitch, PlayerId::new(0), Arc::new(ability));
//!
//! let event = GameEvent::quested(stitch, PlayerId::new(0), 1);
//! assert_eq!(registry.find_triggers(&event, &state, &cards).len(), 1);
//! ```

mod condition;
mod event;
mod registry;

pub use condition::{Condition, ConditionContext, ConditionEvaluator};
pub use event::{EventKind, GameEvent};
pub use registry::{
    support_ability, Trigger, TriggerFilter, TriggerId, TriggerRegistry, TriggeredAbility,
};
