//! Continuous effect engine.
//!
//! Derived stats, keywords, and restrictions of every card are recomputed
//! from scratch by [`recompute`] after each state change:
//!
//! 1. Reset every instance to its printed stats plus its printed keywords.
//! 2. Against that reset state, collect the modifications of
//!    - static abilities of cards in play whose conditions hold, and
//!    - stored [`ContinuousEffect`]s.
//! 3. Apply every modification additively.
//!
//! Step 2 never reads values written by step 3, so running `recompute`
//! twice yields the same result as running it once.
//!
//! ## Expiry
//!
//! Stored effects are removed at phase boundaries, never by countdown:
//! - `ThisTurn`: end-of-turn cleanup
//! - `UntilStartOfYourNextTurn`: the controller's next Ready step
//! - `DuringTheirNextTurn`: cleanup of the affected player's next turn
//! - `WhileActive`: when the source leaves play

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::cards::{CardRegistry, DerivedStats};
use crate::core::{GameState, InstanceId, PlayerId};
use crate::effects::executor::count_of;
use crate::effects::{
    AbilityKind, Amount, Duration, Effect, EffectKind, FilterContext, Keyword, Restriction, Stat,
    Target, TargetCount, TargetFilter, TargetSelector,
};
use crate::triggers::{ConditionContext, ConditionEvaluator};
use crate::zones::Zone;

/// What a continuous effect applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppliesTo {
    /// Specific cards, resolved when the effect was created.
    Instances(SmallVec<[InstanceId; 2]>),
    /// Every card matching a filter, re-evaluated on each recompute.
    Filter(TargetFilter),
    /// A player (cost reductions).
    Player(PlayerId),
}

/// The change a continuous effect makes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modification {
    Stat { stat: Stat, amount: i32 },
    Keyword(Keyword),
    Restriction(Restriction),
    /// Cards matching `filter` cost `amount` less.
    CostReduction { amount: i32, filter: TargetFilter, next_only: bool },
    PreventChallengeDamage,
}

/// A stored standing modifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousEffect {
    pub id: u32,
    /// Card whose ability created the effect.
    pub source: Option<InstanceId>,
    pub controller: PlayerId,
    pub applies_to: AppliesTo,
    pub modification: Modification,
    pub duration: Duration,
    /// Turn the effect was created on.
    pub created_turn: u32,
    /// Owner of the affected cards, for `DuringTheirNextTurn`.
    pub affected_owner: Option<PlayerId>,
}

impl ContinuousEffect {
    /// Create an effect on the current turn, allocating its id.
    pub fn create(
        state: &mut GameState,
        source: Option<InstanceId>,
        controller: PlayerId,
        applies_to: AppliesTo,
        modification: Modification,
        duration: Duration,
    ) -> Self {
        let affected_owner = match &applies_to {
            AppliesTo::Instances(ids) => ids
                .first()
                .and_then(|id| state.instance(*id))
                .map(|c| c.owner),
            AppliesTo::Player(player) => Some(*player),
            AppliesTo::Filter(_) => None,
        };
        Self {
            id: state.next_effect_id(),
            source,
            controller,
            applies_to,
            modification,
            duration,
            created_turn: state.turn,
            affected_owner,
        }
    }
}

/// Phase boundaries at which stored effects expire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Cleanup at the end of the active player's turn.
    EndOfTurn,
    /// Ready step at the start of the active player's turn.
    ReadyStep,
}

/// Register a stored effect and recompute.
pub fn add_effect(state: &mut GameState, cards: &CardRegistry, effect: ContinuousEffect) {
    trace!(
        id = effect.id,
        modification = ?effect.modification,
        duration = ?effect.duration,
        "continuous effect added"
    );
    state.continuous.push_back(effect);
    recompute(state, cards);
}

/// Recompute every instance's derived values from scratch.
pub fn recompute(state: &mut GameState, cards: &CardRegistry) {
    for id in state.instance_ids() {
        let Some(instance) = state.instance(id) else {
            continue;
        };
        let Some(card) = cards.get(instance.card) else {
            continue;
        };
        let mut derived = DerivedStats::base(card);
        for ability in cards.abilities(card.id) {
            if let Some(keyword) = ability.as_keyword() {
                derived.keywords.add(keyword);
            }
        }
        if let Some(instance) = state.instance_mut(id) {
            instance.derived = derived;
        }
    }

    let mut pending: Vec<(InstanceId, Modification)> = Vec::new();
    collect_statics(state, cards, &mut pending);
    collect_stored(state, cards, &mut pending);

    for (id, modification) in pending {
        if let Some(instance) = state.instance_mut(id) {
            apply(&mut instance.derived, &modification);
        }
    }
}

fn apply(derived: &mut DerivedStats, modification: &Modification) {
    match modification {
        Modification::Stat { stat, amount } => match stat {
            Stat::Strength => derived.strength += amount,
            Stat::Willpower => derived.willpower += amount,
            Stat::Lore => derived.lore += amount,
        },
        Modification::Keyword(keyword) => derived.keywords.add(*keyword),
        Modification::Restriction(restriction) => {
            if !derived.restrictions.contains(restriction) {
                derived.restrictions.push(*restriction);
            }
        }
        Modification::PreventChallengeDamage => derived.challenge_damage_immune = true,
        Modification::CostReduction { .. } => {}
    }
}

fn collect_statics(
    state: &GameState,
    cards: &CardRegistry,
    out: &mut Vec<(InstanceId, Modification)>,
) {
    for source in state.in_play() {
        let Some(instance) = state.instance(source) else {
            continue;
        };
        let Some(card) = cards.get(instance.card) else {
            continue;
        };
        if card.card_type.is_action() {
            continue;
        }
        for ability in cards.abilities(card.id) {
            if !matches!(ability.kind, AbilityKind::Static) {
                continue;
            }
            let cctx = ConditionContext::new(state, cards, instance.owner)
                .with_source(Some(source));
            if !ConditionEvaluator::evaluate(&ability.condition, &cctx) {
                continue;
            }
            for effect in &ability.effects {
                collect_static_effect(state, cards, instance.owner, source, effect, out);
            }
        }
    }
}

fn collect_static_effect(
    state: &GameState,
    cards: &CardRegistry,
    controller: PlayerId,
    source: InstanceId,
    effect: &Effect,
    out: &mut Vec<(InstanceId, Modification)>,
) {
    let fctx = FilterContext::new(state, cards, controller).with_source(Some(source));
    let (target, modification) = match &effect.kind {
        EffectKind::ModifyStats { target, stat, amount, .. } => {
            let amount = static_amount(amount, &fctx, source);
            let modification = Modification::Stat {
                stat: *stat,
                amount,
            };
            (target, modification)
        }
        EffectKind::GrantKeyword { target, keyword, .. } => {
            (target, Modification::Keyword(*keyword))
        }
        EffectKind::Restrict {
            target,
            restriction,
            ..
        } => (target, Modification::Restriction(*restriction)),
        EffectKind::PreventDamage { target, .. } => (target, Modification::PreventChallengeDamage),
        EffectKind::Conditional { condition, then } => {
            let cctx = ConditionContext::new(state, cards, controller).with_source(Some(source));
            if ConditionEvaluator::evaluate(condition, &cctx) {
                for child in then {
                    collect_static_effect(state, cards, controller, source, child, out);
                }
            }
            return;
        }
        EffectKind::Sequence(children) => {
            for child in children {
                collect_static_effect(state, cards, controller, source, child, out);
            }
            return;
        }
        _ => return,
    };
    for id in static_targets(target, &fctx, source) {
        out.push((id, modification.clone()));
    }
}

fn static_amount(amount: &Amount, fctx: &FilterContext<'_>, source: InstanceId) -> i32 {
    match amount {
        Amount::Fixed(n) | Amount::UpTo(n) => *n,
        Amount::ForEach { per, count } => per * count_of(count, fctx, None),
        Amount::StatOf { target, stat } => static_targets(target, fctx, source)
            .first()
            .and_then(|id| fctx.state.instance(*id))
            .map_or(0, |c| match stat {
                Stat::Strength => c.strength(),
                Stat::Willpower => c.willpower(),
                Stat::Lore => c.lore(),
            }),
        Amount::All => 0,
    }
}

fn static_targets(
    target: &Target,
    fctx: &FilterContext<'_>,
    source: InstanceId,
) -> Vec<InstanceId> {
    match target {
        Target::This => vec![source],
        Target::All(filter) => TargetSelector::new(filter, TargetCount::Any).valid_targets(fctx),
        Target::Named(name) => {
            let filter = TargetFilter::any().yours().named(name.clone());
            TargetSelector::new(&filter, TargetCount::Any).valid_targets(fctx)
        }
        Target::Chosen { .. } | Target::Triggering | Target::Previous => Vec::new(),
    }
}

fn collect_stored(
    state: &GameState,
    cards: &CardRegistry,
    out: &mut Vec<(InstanceId, Modification)>,
) {
    for effect in &state.continuous {
        let targets: Vec<InstanceId> = match &effect.applies_to {
            AppliesTo::Instances(ids) => ids
                .iter()
                .copied()
                .filter(|id| state.instance(*id).is_some_and(|c| c.zone == Zone::Play))
                .collect(),
            AppliesTo::Filter(filter) => {
                let fctx = FilterContext::new(state, cards, effect.controller)
                    .with_source(effect.source);
                TargetSelector::new(filter, TargetCount::Any).valid_targets(&fctx)
            }
            AppliesTo::Player(_) => continue,
        };
        for id in targets {
            out.push((id, effect.modification.clone()));
        }
    }
}

/// Remove stored effects that end at a boundary of the active player's turn.
pub fn expire(state: &mut GameState, cards: &CardRegistry, boundary: Boundary) {
    let active = state.active_player;
    let turn = state.turn;
    let before = state.continuous.len();
    state.continuous.retain(|effect| match (boundary, effect.duration) {
        (Boundary::EndOfTurn, Duration::ThisTurn) => false,
        (Boundary::EndOfTurn, Duration::DuringTheirNextTurn) => {
            !(effect.affected_owner == Some(active) && turn > effect.created_turn)
        }
        (Boundary::ReadyStep, Duration::UntilStartOfYourNextTurn) => {
            !(effect.controller == active && turn > effect.created_turn)
        }
        _ => true,
    });
    if state.continuous.len() != before {
        trace!(?boundary, removed = before - state.continuous.len(), "continuous effects expired");
    }
    recompute(state, cards);
}

/// Remove `WhileActive` effects of a source that left play.
pub fn remove_for_source(state: &mut GameState, source: InstanceId) {
    state.continuous.retain(|effect| {
        !(effect.source == Some(source) && effect.duration == Duration::WhileActive)
    });
}

/// Reductions that apply to `card` for `player`, as (effect id, amount).
/// Static reductions have no id.
fn reductions(
    state: &GameState,
    cards: &CardRegistry,
    player: PlayerId,
    card: InstanceId,
) -> Vec<(Option<u32>, i32)> {
    let Some(instance) = state.instance(card) else {
        return Vec::new();
    };
    let mut found = Vec::new();

    for source in state.cards_in(player, Zone::Play) {
        let Some(source_instance) = state.instance(source) else {
            continue;
        };
        for ability in cards.abilities(source_instance.card) {
            if !ability.is_static() {
                continue;
            }
            let cctx = ConditionContext::new(state, cards, player).with_source(Some(source));
            if !ConditionEvaluator::evaluate(&ability.condition, &cctx) {
                continue;
            }
            let fctx = FilterContext::new(state, cards, player).with_source(Some(source));
            for effect in &ability.effects {
                if let EffectKind::CostReduction { amount, filter, .. } = &effect.kind {
                    if filter.matches_traits(&fctx, instance) {
                        found.push((None, *amount));
                    }
                }
            }
        }
    }

    for effect in &state.continuous {
        if effect.applies_to != AppliesTo::Player(player) {
            continue;
        }
        if let Modification::CostReduction { amount, filter, .. } = &effect.modification {
            let fctx = FilterContext::new(state, cards, player).with_source(effect.source);
            if filter.matches_traits(&fctx, instance) {
                found.push((Some(effect.id), *amount));
            }
        }
    }
    found
}

/// Ink cost of playing `card` for `player` after reductions.
#[must_use]
pub fn effective_cost(
    state: &GameState,
    cards: &CardRegistry,
    player: PlayerId,
    card: InstanceId,
    base: u32,
) -> u32 {
    let reduction: i32 = reductions(state, cards, player, card)
        .iter()
        .map(|(_, n)| n)
        .sum();
    (base as i32 - reduction).max(0) as u32
}

/// Consume one-shot ("the next X you play") reductions used by `card`.
pub fn consume_reductions(
    state: &mut GameState,
    cards: &CardRegistry,
    player: PlayerId,
    card: InstanceId,
) {
    let used: Vec<u32> = reductions(state, cards, player, card)
        .into_iter()
        .filter_map(|(id, _)| id)
        .collect();
    state.continuous.retain(|effect| {
        let next_only = matches!(
            effect.modification,
            Modification::CostReduction {
                next_only: true,
                ..
            }
        );
        !(next_only && used.contains(&effect.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId};
    use crate::core::RulesConfig;
    use crate::effects::{AbilityDefinition, KeywordKind};
    use crate::zones::ZonePosition;

    fn setup() -> (GameState, CardRegistry, InstanceId, InstanceId) {
        let mut cards = CardRegistry::new();
        let aura = AbilityDefinition::static_ability(
            vec![Effect::new(EffectKind::ModifyStats {
                target: Target::All(TargetFilter::characters().yours().other()),
                stat: Stat::Strength,
                amount: Amount::Fixed(1),
                duration: Duration::WhileActive,
            })],
            "Your other characters get +1 {S}.",
        );
        let captain_def = Card::character(CardId::new(1), "Captain", 3).with_stats(2, 3, 1);
        cards.register_with_abilities(captain_def, vec![aura]);
        cards.register(Card::character(CardId::new(2), "Sailor", 1).with_stats(1, 1, 1));

        let mut state = GameState::new(&RulesConfig::default(), 5);
        state.turn = 1;
        let p0 = PlayerId::new(0);
        let captain_card = cards.get(CardId::new(1)).unwrap().clone();
        let sailor_card = cards.get(CardId::new(2)).unwrap().clone();
        let captain = state
            .spawn(&captain_card, p0, Zone::Play, ZonePosition::Top)
            .unwrap();
        let sailor = state
            .spawn(&sailor_card, p0, Zone::Play, ZonePosition::Top)
            .unwrap();
        (state, cards, captain, sailor)
    }

    #[test]
    fn test_static_aura() {
        let (mut state, cards, captain, sailor) = setup();
        recompute(&mut state, &cards);
        assert_eq!(state.instance(sailor).unwrap().strength(), 2);
        assert_eq!(state.instance(captain).unwrap().strength(), 2);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (mut state, cards, _, _) = setup();
        recompute(&mut state, &cards);
        let first: Vec<_> = state.instances().map(|c| c.derived.clone()).collect();
        recompute(&mut state, &cards);
        let second: Vec<_> = state.instances().map(|c| c.derived.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aura_ends_when_source_leaves() {
        let (mut state, cards, captain, sailor) = setup();
        recompute(&mut state, &cards);
        state
            .move_card(captain, Zone::Discard, ZonePosition::Top)
            .unwrap();
        recompute(&mut state, &cards);
        assert_eq!(state.instance(sailor).unwrap().strength(), 1);
    }

    #[test]
    fn test_this_turn_expires_at_end_of_turn() {
        let (mut state, cards, _, sailor) = setup();
        let effect = ContinuousEffect::create(
            &mut state,
            None,
            PlayerId::new(0),
            AppliesTo::Instances(smallvec::smallvec![sailor]),
            Modification::Keyword(Keyword::new(KeywordKind::Evasive)),
            Duration::ThisTurn,
        );
        add_effect(&mut state, &cards, effect);
        assert!(state.instance(sailor).unwrap().has_keyword(KeywordKind::Evasive));

        expire(&mut state, &cards, Boundary::ReadyStep);
        assert!(state.instance(sailor).unwrap().has_keyword(KeywordKind::Evasive));
        expire(&mut state, &cards, Boundary::EndOfTurn);
        assert!(!state.instance(sailor).unwrap().has_keyword(KeywordKind::Evasive));
    }

    #[test]
    fn test_until_start_of_next_turn() {
        let (mut state, cards, _, sailor) = setup();
        let effect = ContinuousEffect::create(
            &mut state,
            None,
            PlayerId::new(0),
            AppliesTo::Instances(smallvec::smallvec![sailor]),
            Modification::Restriction(Restriction::CantQuest),
            Duration::UntilStartOfYourNextTurn,
        );
        add_effect(&mut state, &cards, effect);

        expire(&mut state, &cards, Boundary::EndOfTurn);
        state.advance_turn();
        expire(&mut state, &cards, Boundary::ReadyStep);
        assert!(state.instance(sailor).unwrap().is_restricted(Restriction::CantQuest));

        state.advance_turn();
        expire(&mut state, &cards, Boundary::ReadyStep);
        assert!(!state.instance(sailor).unwrap().is_restricted(Restriction::CantQuest));
    }

    #[test]
    fn test_next_only_cost_reduction() {
        let (mut state, cards, captain, _) = setup();
        let p0 = PlayerId::new(0);
        let card = cards.get(CardId::new(2)).unwrap().clone();
        let in_hand = state
            .spawn(&card, p0, Zone::Hand, ZonePosition::Top)
            .unwrap();

        let effect = ContinuousEffect::create(
            &mut state,
            Some(captain),
            p0,
            AppliesTo::Player(p0),
            Modification::CostReduction {
                amount: 2,
                filter: TargetFilter::characters(),
                next_only: true,
            },
            Duration::ThisTurn,
        );
        add_effect(&mut state, &cards, effect);

        assert_eq!(effective_cost(&state, &cards, p0, in_hand, 1), 0);
        assert_eq!(effective_cost(&state, &cards, p0, in_hand, 4), 2);
        consume_reductions(&mut state, &cards, p0, in_hand);
        assert_eq!(effective_cost(&state, &cards, p0, in_hand, 4), 4);
    }
}
