//! Ability conditions.
//!
//! A `Condition` gates a triggered ability when it fires, a static ability
//! while it is active, and the branches of `Conditional` /
//! `ConditionalAction` effects at resolution. Conditions are evaluated
//! against the current state, relative to the ability's controller and
//! source card.

use serde::{Deserialize, Serialize};

use crate::cards::CardRegistry;
use crate::core::{GameState, InstanceId, PlayerId};
use crate::effects::{
    Comparison, FilterContext, PlayerTarget, TargetCount, TargetFilter, TargetSelector,
};
use crate::zones::Zone;

use super::event::GameEvent;

/// A predicate over game state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Always holds.
    #[default]
    Always,

    /// Never holds (disabled ability).
    Never,

    // === Turn ===
    /// "During your turn"
    DuringYourTurn,

    /// "During an opponent's turn"
    DuringOpponentsTurn,

    // === Source Status ===
    /// "While this character is exerted"
    SelfExerted,

    SelfReady,

    /// "While this character has damage"
    SelfDamaged,

    /// "While this character has no damage"
    SelfUndamaged,

    /// "While this character is at a location"
    SelfAtLocation,

    // === Board ===
    /// "If you have a Villain character in play"
    YouControl { filter: TargetFilter, at_least: u32 },

    /// "If an opponent has 2 or more ready characters"
    OpponentControls { filter: TargetFilter, at_least: u32 },

    /// "If you have a card named X in your discard"
    InDiscard { filter: TargetFilter, at_least: u32 },

    // === Player Totals ===
    Lore { who: PlayerTarget, compare: Comparison },

    HandSize { who: PlayerTarget, compare: Comparison },

    InkwellSize { who: PlayerTarget, compare: Comparison },

    // === Resolved Cards ===
    /// The card the triggering event is about matches the filter.
    TriggeringMatches(TargetFilter),

    /// Every card the previous effect resolved to matches the filter, and
    /// there is at least one ("if a Princess character is chosen").
    PreviousMatches(TargetFilter),

    // === Combinators ===
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// "if you have a X in play"
    #[must_use]
    pub fn you_control(filter: TargetFilter) -> Self {
        Self::YouControl {
            filter,
            at_least: 1,
        }
    }

    /// Negate this condition.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Add another condition with AND.
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        match (self, other) {
            (Self::Always, c) | (c, Self::Always) => c,
            (Self::All(mut conditions), c) => {
                conditions.push(c);
                Self::All(conditions)
            }
            (a, b) => Self::All(vec![a, b]),
        }
    }

    /// Add another condition with OR.
    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        match self {
            Self::Any(mut conditions) => {
                conditions.push(other);
                Self::Any(conditions)
            }
            _ => Self::Any(vec![self, other]),
        }
    }

    #[must_use]
    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }
}

/// Context for evaluating conditions.
pub struct ConditionContext<'a> {
    pub state: &'a GameState,
    pub cards: &'a CardRegistry,
    /// Player the condition is relative to.
    pub controller: PlayerId,
    /// Ability source.
    pub source: Option<InstanceId>,
    /// Event that triggered the ability.
    pub event: Option<&'a GameEvent>,
    /// Cards resolved by the previous effect of the ability.
    pub remembered: &'a [InstanceId],
}

impl<'a> ConditionContext<'a> {
    /// Create a new context.
    #[must_use]
    pub fn new(state: &'a GameState, cards: &'a CardRegistry, controller: PlayerId) -> Self {
        Self {
            state,
            cards,
            controller,
            source: None,
            event: None,
            remembered: &[],
        }
    }

    /// Set the source card (builder pattern).
    #[must_use]
    pub fn with_source(mut self, source: Option<InstanceId>) -> Self {
        self.source = source;
        self
    }

    /// Set the triggering event (builder pattern).
    #[must_use]
    pub fn with_event(mut self, event: Option<&'a GameEvent>) -> Self {
        self.event = event;
        self
    }

    /// Set the remembered targets (builder pattern).
    #[must_use]
    pub fn with_remembered(mut self, remembered: &'a [InstanceId]) -> Self {
        self.remembered = remembered;
        self
    }

    fn filter_context(&self) -> FilterContext<'a> {
        FilterContext::new(self.state, self.cards, self.controller).with_source(self.source)
    }

    fn players(&self, who: PlayerTarget) -> Vec<PlayerId> {
        match who {
            PlayerTarget::You => vec![self.controller],
            PlayerTarget::Opponent => vec![self.controller.opponent()],
            PlayerTarget::EachPlayer => PlayerId::all(self.state.player_count()).collect(),
            PlayerTarget::Triggering => self.event.and_then(|e| e.player).into_iter().collect(),
        }
    }
}

/// Evaluator for conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check if a condition is satisfied.
    #[must_use]
    pub fn evaluate(condition: &Condition, ctx: &ConditionContext<'_>) -> bool {
        let source = ctx.source.and_then(|id| ctx.state.instance(id));

        match condition {
            Condition::Always => true,

            Condition::Never => false,

            Condition::DuringYourTurn => ctx.state.active_player == ctx.controller,

            Condition::DuringOpponentsTurn => ctx.state.active_player != ctx.controller,

            Condition::SelfExerted => source.is_some_and(|c| c.exerted),

            Condition::SelfReady => source.is_some_and(|c| !c.exerted),

            Condition::SelfDamaged => source.is_some_and(|c| c.damage > 0),

            Condition::SelfUndamaged => source.is_some_and(|c| c.damage == 0),

            Condition::SelfAtLocation => source.is_some_and(|c| c.location.is_some()),

            Condition::YouControl { filter, at_least } => {
                Self::count_matching(ctx, &filter.clone().yours()) >= *at_least as usize
            }

            Condition::OpponentControls { filter, at_least } => {
                Self::count_matching(ctx, &filter.clone().opposing()) >= *at_least as usize
            }

            Condition::InDiscard { filter, at_least } => {
                let filter = filter.clone().yours().in_zone(Zone::Discard);
                Self::count_matching(ctx, &filter) >= *at_least as usize
            }

            Condition::Lore { who, compare } => Self::all_players(ctx, *who, |p| {
                compare.test(ctx.state.players[p].lore as i32)
            }),

            Condition::HandSize { who, compare } => Self::all_players(ctx, *who, |p| {
                compare.test(ctx.state.zone_size(p, Zone::Hand) as i32)
            }),

            Condition::InkwellSize { who, compare } => Self::all_players(ctx, *who, |p| {
                compare.test(ctx.state.zone_size(p, Zone::Inkwell) as i32)
            }),

            Condition::TriggeringMatches(filter) => {
                let fctx = ctx.filter_context();
                ctx.event
                    .and_then(|e| e.subject)
                    .and_then(|id| ctx.state.instance(id))
                    .is_some_and(|instance| filter.matches_traits(&fctx, instance))
            }

            Condition::PreviousMatches(filter) => {
                let fctx = ctx.filter_context();
                !ctx.remembered.is_empty()
                    && ctx.remembered.iter().all(|id| {
                        ctx.state
                            .instance(*id)
                            .is_some_and(|instance| filter.matches_traits(&fctx, instance))
                    })
            }

            Condition::Not(inner) => !Self::evaluate(inner, ctx),

            Condition::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            Condition::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),
        }
    }

    fn count_matching(ctx: &ConditionContext<'_>, filter: &TargetFilter) -> usize {
        TargetSelector::new(filter, TargetCount::Any)
            .valid_targets(&ctx.filter_context())
            .len()
    }

    fn all_players(
        ctx: &ConditionContext<'_>,
        who: PlayerTarget,
        test: impl Fn(PlayerId) -> bool,
    ) -> bool {
        let players = ctx.players(who);
        !players.is_empty() && players.into_iter().all(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId};
    use crate::core::RulesConfig;
    use crate::zones::ZonePosition;

    fn setup() -> (GameState, CardRegistry, InstanceId) {
        let mut registry = CardRegistry::new();
        registry.register(
            Card::character(CardId::new(1), "Jafar", 4)
                .with_stats(3, 4, 1)
                .with_classification("Villain"),
        );
        registry.register(
            Card::character(CardId::new(2), "Aladdin", 2)
                .with_stats(2, 2, 1)
                .with_classification("Hero"),
        );

        let mut state = GameState::new(&RulesConfig::default(), 1);
        state.turn = 1;
        let p0 = PlayerId::new(0);
        let jafar = state
            .spawn(registry.get(CardId::new(1)).unwrap(), p0, Zone::Play, ZonePosition::Top)
            .unwrap();
        let aladdin = registry.get(CardId::new(2)).unwrap();
        state
            .spawn(aladdin, p0.opponent(), Zone::Play, ZonePosition::Top)
            .unwrap();
        (state, registry, jafar)
    }

    #[test]
    fn test_turn_conditions() {
        let (state, registry, jafar) = setup();
        let ctx =
            ConditionContext::new(&state, &registry, PlayerId::new(0)).with_source(Some(jafar));
        assert!(ConditionEvaluator::evaluate(&Condition::DuringYourTurn, &ctx));
        assert!(!ConditionEvaluator::evaluate(&Condition::DuringOpponentsTurn, &ctx));

        let ctx = ConditionContext::new(&state, &registry, PlayerId::new(1));
        assert!(ConditionEvaluator::evaluate(&Condition::DuringOpponentsTurn, &ctx));
    }

    #[test]
    fn test_source_status() {
        let (mut state, registry, jafar) = setup();
        {
            let ctx = ConditionContext::new(&state, &registry, PlayerId::new(0))
                .with_source(Some(jafar));
            assert!(!ConditionEvaluator::evaluate(&Condition::SelfExerted, &ctx));
            assert!(ConditionEvaluator::evaluate(&Condition::SelfUndamaged, &ctx));
        }
        state.instance_mut(jafar).unwrap().exerted = true;
        state.instance_mut(jafar).unwrap().damage = 1;
        let ctx =
            ConditionContext::new(&state, &registry, PlayerId::new(0)).with_source(Some(jafar));
        assert!(ConditionEvaluator::evaluate(&Condition::SelfExerted, &ctx));
        assert!(ConditionEvaluator::evaluate(&Condition::SelfDamaged, &ctx));
    }

    #[test]
    fn test_board_conditions() {
        let (state, registry, _) = setup();
        let ctx = ConditionContext::new(&state, &registry, PlayerId::new(0));

        let villain = TargetFilter::characters().with_classification("Villain");
        let hero = TargetFilter::characters().with_classification("Hero");
        assert!(ConditionEvaluator::evaluate(&Condition::you_control(villain.clone()), &ctx));
        assert!(!ConditionEvaluator::evaluate(&Condition::you_control(hero.clone()), &ctx));
        assert!(ConditionEvaluator::evaluate(
            &Condition::OpponentControls {
                filter: hero,
                at_least: 1,
            },
            &ctx
        ));
        assert!(!ConditionEvaluator::evaluate(
            &Condition::YouControl {
                filter: villain,
                at_least: 2,
            },
            &ctx
        ));
    }

    #[test]
    fn test_player_totals() {
        let (mut state, registry, _) = setup();
        state.players[PlayerId::new(1)].gain_lore(5);
        let ctx = ConditionContext::new(&state, &registry, PlayerId::new(0));

        let opponent_five = Condition::Lore {
            who: PlayerTarget::Opponent,
            compare: Comparison::at_least(5),
        };
        assert!(ConditionEvaluator::evaluate(&opponent_five, &ctx));
        assert!(!ConditionEvaluator::evaluate(&opponent_five.clone().negate(), &ctx));
        assert!(ConditionEvaluator::evaluate(
            &Condition::HandSize {
                who: PlayerTarget::You,
                compare: Comparison::exactly(0),
            },
            &ctx
        ));
    }

    #[test]
    fn test_previous_matches() {
        let (state, registry, jafar) = setup();
        let remembered = [jafar];
        let villain = TargetFilter::characters().with_classification("Villain");

        let ctx = ConditionContext::new(&state, &registry, PlayerId::new(0))
            .with_remembered(&remembered);
        assert!(ConditionEvaluator::evaluate(&Condition::PreviousMatches(villain.clone()), &ctx));

        let empty = ConditionContext::new(&state, &registry, PlayerId::new(0));
        assert!(!ConditionEvaluator::evaluate(&Condition::PreviousMatches(villain), &empty));
    }

    #[test]
    fn test_combinators() {
        let (state, registry, _) = setup();
        let ctx = ConditionContext::new(&state, &registry, PlayerId::new(0));

        assert!(ConditionEvaluator::evaluate(
            &Condition::Always.and(Condition::DuringYourTurn),
            &ctx,
        ));
        assert!(!ConditionEvaluator::evaluate(
            &Condition::Never.and(Condition::DuringYourTurn),
            &ctx
        ));
        assert!(ConditionEvaluator::evaluate(
            &Condition::Never.or(Condition::DuringYourTurn),
            &ctx,
        ));
        assert_eq!(Condition::Always.and(Condition::SelfExerted), Condition::SelfExerted);
    }

    #[test]
    fn test_condition_serialization() {
        let condition = Condition::All(vec![
            Condition::DuringYourTurn,
            Condition::you_control(TargetFilter::characters().with_classification("Princess")),
        ]);

        let json = serde_json::to_string(&condition).unwrap();
        let deserialized: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(condition, deserialized);
    }
}
