//! Trigger registry.
//!
//! The registry stores one listener per triggered ability of every card in
//! play and finds the listeners an event wakes up. A card's listeners are
//! registered when it enters play and removed after the events describing
//! its departure have been dispatched, so "when this character is
//! banished" still fires.
//!
//! ## Matching
//!
//! For each listener indexed under the event's kind:
//! 1. `should_trigger`: the listener's `TriggerFilter` accepts the event
//! 2. `meets_conditions`: the ability's `Condition` holds
//!
//! Listeners whose source is no longer in play only answer departure
//! events about their own source.
//!
//! ## Ordering
//!
//! Matches are returned active player first, then by registration order.
//! A card's abilities are registered in declaration order, so several
//! triggers on one source resolve in the order they are printed.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cards::CardRegistry;
use crate::core::{GameState, InstanceId, PlayerId};
use crate::effects::{
    AbilityDefinition, AbilityKind, Amount, Duration, Effect, EffectKind, FilterContext,
    KeywordKind, Stat, Target, TargetFilter,
};
use crate::zones::Zone;

use super::condition::{ConditionContext, ConditionEvaluator};
use super::event::{EventKind, GameEvent};

/// Unique identifier for a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

impl TriggerId {
    /// Create a new trigger ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Trigger({})", self.0)
    }
}

/// Which occurrences of an event kind a listener answers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerFilter {
    /// Every occurrence.
    #[default]
    Any,
    /// The event is about the listener's own card ("when you play this
    /// character", "whenever this character quests").
    SubjectIsSelf,
    /// The listener's card is the other participant ("whenever this
    /// character challenges").
    ActorIsSelf,
    /// The event's subject matches a filter ("whenever one of your other
    /// characters is banished").
    Subject(TargetFilter),
    /// The event's actor matches a filter.
    Actor(TargetFilter),
    /// The event belongs to the listener's controller ("at the start of
    /// your turn", "whenever you draw a card").
    PlayerIsController,
    /// The event belongs to an opponent.
    PlayerIsOpponent,
    /// Every filter must accept.
    All(Vec<TriggerFilter>),
}

impl TriggerFilter {
    /// Check whether this filter accepts an event for a listener.
    #[must_use]
    pub fn accepts(&self, event: &GameEvent, ctx: &FilterContext<'_>) -> bool {
        let instance = |id: Option<InstanceId>| id.and_then(|id| ctx.state.instance(id));

        match self {
            Self::Any => true,
            Self::SubjectIsSelf => event.subject.is_some() && event.subject == ctx.source,
            Self::ActorIsSelf => event.actor.is_some() && event.actor == ctx.source,
            Self::Subject(filter) => {
                instance(event.subject).is_some_and(|c| filter.matches_traits(ctx, c))
            }
            Self::Actor(filter) => {
                instance(event.actor).is_some_and(|c| filter.matches_traits(ctx, c))
            }
            Self::PlayerIsController => event.player == Some(ctx.controller),
            Self::PlayerIsOpponent => event.player.is_some_and(|p| p != ctx.controller),
            Self::All(filters) => filters.iter().all(|f| f.accepts(event, ctx)),
        }
    }

    /// Combine with another filter.
    #[must_use]
    pub fn and(self, other: TriggerFilter) -> Self {
        match (self, other) {
            (Self::Any, f) | (f, Self::Any) => f,
            (Self::All(mut filters), f) => {
                filters.push(f);
                Self::All(filters)
            }
            (a, b) => Self::All(vec![a, b]),
        }
    }
}

/// A registered listener.
#[derive(Clone, Debug)]
pub struct Trigger {
    pub id: TriggerId,

    /// Card whose ability this is.
    pub source: InstanceId,

    /// Player who controls the ability and answers its prompts.
    pub controller: PlayerId,

    pub ability: Arc<AbilityDefinition>,

    pub event: EventKind,

    pub filter: TriggerFilter,
}

/// A listener that matched an event, ready to be resolved.
#[derive(Clone, Debug)]
pub struct TriggeredAbility {
    pub trigger_id: TriggerId,
    pub source: InstanceId,
    pub controller: PlayerId,
    pub ability: Arc<AbilityDefinition>,
    /// The event that woke the listener.
    pub event: GameEvent,
}

/// The ability the Support keyword grants: when this character quests, you
/// may add its strength to another chosen character of yours this turn.
#[must_use]
pub fn support_ability() -> AbilityDefinition {
    let target = Target::chosen(TargetFilter::characters().yours().other());
    AbilityDefinition::triggered(EventKind::Quested, TriggerFilter::SubjectIsSelf, "Support")
        .with_name("Support")
        .with_effect(
            Effect::new(EffectKind::ModifyStats {
                target,
                stat: Stat::Strength,
                amount: Amount::StatOf {
                    target: Box::new(Target::This),
                    stat: Stat::Strength,
                },
                duration: Duration::ThisTurn,
            })
            .optional(),
        )
}

/// Registry of listeners, indexed by event kind.
#[derive(Clone, Debug, Default)]
pub struct TriggerRegistry {
    triggers: FxHashMap<TriggerId, Trigger>,

    by_event: FxHashMap<EventKind, Vec<TriggerId>>,

    next_id: u32,
}

impl TriggerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a triggered ability. Other ability kinds are ignored.
    pub fn register(
        &mut self,
        source: InstanceId,
        controller: PlayerId,
        ability: Arc<AbilityDefinition>,
    ) -> Option<TriggerId> {
        let AbilityKind::Triggered { event, filter } = &ability.kind else {
            return None;
        };
        let (event, filter) = (*event, filter.clone());

        self.next_id += 1;
        let id = TriggerId::new(self.next_id);
        self.by_event.entry(event).or_default().push(id);
        self.triggers.insert(
            id,
            Trigger {
                id,
                source,
                controller,
                ability,
                event,
                filter,
            },
        );
        Some(id)
    }

    /// Register every triggered ability of a card entering play, plus the
    /// listener implied by the Support keyword.
    pub fn register_card(
        &mut self,
        source: InstanceId,
        controller: PlayerId,
        abilities: &[Arc<AbilityDefinition>],
    ) -> Vec<TriggerId> {
        let mut ids = Vec::new();
        for ability in abilities {
            let support = ability
                .as_keyword()
                .is_some_and(|k| k.kind == KeywordKind::Support);
            if support {
                ids.extend(self.register(source, controller, Arc::new(support_ability())));
            } else {
                ids.extend(self.register(source, controller, Arc::clone(ability)));
            }
        }
        ids
    }

    /// Unregister a trigger.
    pub fn unregister(&mut self, id: TriggerId) -> Option<Trigger> {
        let trigger = self.triggers.remove(&id)?;
        if let Some(list) = self.by_event.get_mut(&trigger.event) {
            list.retain(|&tid| tid != id);
            if list.is_empty() {
                self.by_event.remove(&trigger.event);
            }
        }
        Some(trigger)
    }

    /// Remove all triggers owned by a card.
    pub fn remove_for_source(&mut self, source: InstanceId) -> usize {
        let to_remove: Vec<_> = self
            .triggers
            .values()
            .filter(|t| t.source == source)
            .map(|t| t.id)
            .collect();
        let count = to_remove.len();
        for id in to_remove {
            self.unregister(id);
        }
        count
    }

    /// Get a trigger by ID.
    #[must_use]
    pub fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.get(&id)
    }

    /// Triggers owned by a card, in registration order.
    #[must_use]
    pub fn triggers_for_source(&self, source: InstanceId) -> Vec<&Trigger> {
        let mut triggers: Vec<_> = self
            .triggers
            .values()
            .filter(|t| t.source == source)
            .collect();
        triggers.sort_by_key(|t| t.id);
        triggers
    }

    /// Whether the listener's event filter accepts the event.
    #[must_use]
    pub fn should_trigger(
        trigger: &Trigger,
        event: &GameEvent,
        state: &GameState,
        cards: &CardRegistry,
    ) -> bool {
        if trigger.event != event.kind {
            return false;
        }
        let in_play = state
            .instance(trigger.source)
            .is_some_and(|c| c.zone == Zone::Play);
        if !in_play && !(event.kind.is_departure() && event.subject == Some(trigger.source)) {
            return false;
        }
        let ctx =
            FilterContext::new(state, cards, trigger.controller).with_source(Some(trigger.source));
        trigger.filter.accepts(event, &ctx)
    }

    /// Whether the ability's own condition holds.
    #[must_use]
    pub fn meets_conditions(
        trigger: &Trigger,
        event: &GameEvent,
        state: &GameState,
        cards: &CardRegistry,
    ) -> bool {
        let ctx = ConditionContext::new(state, cards, trigger.controller)
            .with_source(Some(trigger.source))
            .with_event(Some(event));
        ConditionEvaluator::evaluate(&trigger.ability.condition, &ctx)
    }

    /// Find every listener an event wakes up, in resolution order.
    #[must_use]
    pub fn find_triggers(
        &self,
        event: &GameEvent,
        state: &GameState,
        cards: &CardRegistry,
    ) -> Vec<TriggeredAbility> {
        let Some(ids) = self.by_event.get(&event.kind) else {
            return Vec::new();
        };

        let mut matched: Vec<&Trigger> = ids
            .iter()
            .filter_map(|id| self.triggers.get(id))
            .filter(|t| Self::should_trigger(t, event, state, cards))
            .filter(|t| Self::meets_conditions(t, event, state, cards))
            .collect();

        let active = state.active_player;
        matched.sort_by_key(|t| (t.controller != active, t.id));

        matched
            .into_iter()
            .map(|t| {
                trace!(trigger = %t.id, source = %t.source, event = %event.kind, "trigger matched");
                TriggeredAbility {
                    trigger_id: t.id,
                    source: t.source,
                    controller: t.controller,
                    ability: Arc::clone(&t.ability),
                    event: event.clone(),
                }
            })
            .collect()
    }

    /// Get total trigger count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Iterate all triggers.
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.values()
    }
}
