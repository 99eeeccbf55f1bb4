//! Effect executor.
//!
//! Runs one [`Effect`] node at a time against the game state. Compound
//! kinds (`Sequence`, `Conditional`, `ForEach`, ...) do not recurse: they
//! return [`Step::Expand`] with the children to run next, so the engine's
//! frame stack always knows exactly where execution stands.
//!
//! ## Choices
//!
//! An effect that needs a decision returns [`Step::Suspend`] with a
//! [`ChoiceRequest`]. Once the answer arrives the engine calls `execute`
//! again with every answer given so far for that node; the executor
//! replays them in order and asks for the next one. Nothing is mutated
//! until every choice of the node is answered, so replaying is always
//! safe.
//!
//! Optional effects ask a yes/no question first. Effects whose targets
//! cannot be found fizzle without asking anything.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::ability::KeywordKind;
use super::choice::{ChoiceAnswer, ChoiceId, ChoiceKind, ChoiceOption, ChoiceRequest};
use super::effect::{
    Amount, Chooser, Count, Duration, Effect, EffectKind, LookDestination, PlayerTarget, Stat,
};
use super::targeting::{FilterContext, Target, TargetCount, TargetFilter, TargetSelector};
use crate::cards::{CardRegistry, CardType};
use crate::continuous::{self, AppliesTo, ContinuousEffect, Modification};
use crate::core::{GameState, InstanceId, PlayerId};
use crate::error::{EngineError, Result};
use crate::rules::mechanics;
use crate::triggers::{Condition, ConditionContext, ConditionEvaluator, GameEvent};
use crate::zones::{Zone, ZoneKey, ZonePosition};

/// Why an effect did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FizzleReason {
    /// No card satisfied the target filter.
    NoLegalTargets,
    /// The source card is no longer in play.
    SourceGone,
    /// The zone the effect reads from is empty.
    EmptyZone,
}

impl FizzleReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoLegalTargets => "no legal targets",
            Self::SourceGone => "source left play",
            Self::EmptyZone => "zone is empty",
        }
    }
}

impl std::fmt::Display for FizzleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A recorded fizzle, reported back with the action outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fizzle {
    pub source: Option<InstanceId>,
    /// Name of the effect kind.
    pub effect: &'static str,
    pub reason: FizzleReason,
}

/// Result of executing one effect node.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The effect took place.
    Applied,
    /// An optional effect was declined.
    Declined,
    /// Replace this node with these children, in order.
    Expand(Vec<Effect>),
    /// The effect could not take place.
    Fizzled(FizzleReason),
    /// A decision is needed before the effect can finish.
    Suspend(ChoiceRequest),
}

/// Per-ability execution context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectContext {
    /// Card whose ability is resolving.
    pub source: Option<InstanceId>,
    pub controller: PlayerId,
    /// Event that triggered the ability.
    pub event: Option<GameEvent>,
    /// Cards the previous effect resolved to ("them", "that character").
    pub remembered: SmallVec<[InstanceId; 2]>,
    /// Whether the ability belongs to an action or song being played.
    pub from_action: bool,
}

impl EffectContext {
    #[must_use]
    pub fn new(source: Option<InstanceId>, controller: PlayerId) -> Self {
        Self {
            source,
            controller,
            event: None,
            remembered: SmallVec::new(),
            from_action: false,
        }
    }

    #[must_use]
    pub fn with_event(mut self, event: Option<GameEvent>) -> Self {
        self.event = event;
        self
    }

    #[must_use]
    pub fn from_action(mut self) -> Self {
        self.from_action = true;
        self
    }

    /// Player answering prompts for an effect.
    #[must_use]
    pub fn chooser(&self, chooser: Chooser) -> PlayerId {
        match chooser {
            Chooser::Controller => self.controller,
            Chooser::Opponent => self.controller.opponent(),
        }
    }

    fn filter_context<'a>(
        &self,
        state: &'a GameState,
        cards: &'a CardRegistry,
    ) -> FilterContext<'a> {
        FilterContext::new(state, cards, self.controller).with_source(self.source)
    }
}

/// Mutable environment an effect runs in.
pub struct ExecEnv<'a> {
    pub state: &'a mut GameState,
    pub cards: &'a CardRegistry,
    /// Events produced, in order.
    pub events: &'a mut Vec<GameEvent>,
    /// Actions and songs played by effects; the engine resolves them.
    pub plays: &'a mut Vec<(InstanceId, PlayerId)>,
}

/// Evaluate a count relative to a filter context.
#[must_use]
pub fn count_of(count: &Count, ctx: &FilterContext<'_>, event: Option<&GameEvent>) -> i32 {
    let n: usize = match count {
        Count::InPlay(filter) => TargetSelector::new(filter, TargetCount::Any)
            .valid_targets(ctx)
            .len(),
        Count::CardsInHand(who) => players(*who, ctx.controller, event, ctx.state)
            .into_iter()
            .map(|p| ctx.state.zone_size(p, Zone::Hand))
            .sum(),
        Count::CardsInDiscard(who, filter) => players(*who, ctx.controller, event, ctx.state)
            .into_iter()
            .flat_map(|p| ctx.state.cards_in(p, Zone::Discard))
            .filter_map(|id| ctx.state.instance(id))
            .filter(|c| filter.matches_traits(ctx, c))
            .count(),
        Count::DamageOnSource => ctx
            .source
            .and_then(|id| ctx.state.instance(id))
            .map_or(0, |c| c.damage as usize),
        Count::InkwellSize(who) => players(*who, ctx.controller, event, ctx.state)
            .into_iter()
            .map(|p| ctx.state.zone_size(p, Zone::Inkwell))
            .sum(),
    };
    n as i32
}

fn players(
    who: PlayerTarget,
    controller: PlayerId,
    event: Option<&GameEvent>,
    state: &GameState,
) -> SmallVec<[PlayerId; 2]> {
    match who {
        PlayerTarget::You => smallvec::smallvec![controller],
        PlayerTarget::Opponent => smallvec::smallvec![controller.opponent()],
        PlayerTarget::EachPlayer => PlayerId::all(state.player_count()).collect(),
        PlayerTarget::Triggering => event.and_then(|e| e.player).into_iter().collect(),
    }
}

fn stat_value(state: &GameState, card: InstanceId, stat: Stat) -> i32 {
    state.instance(card).map_or(0, |c| match stat {
        Stat::Strength => c.strength(),
        Stat::Willpower => c.willpower(),
        Stat::Lore => c.lore(),
    })
}

/// Outcome of one sub-decision.
enum Ask<T> {
    Ready(T),
    Suspend(ChoiceRequest),
    Fizzle(FizzleReason),
}

macro_rules! ask {
    ($e:expr) => {
        match $e {
            Ask::Ready(value) => value,
            Ask::Suspend(request) => return Ok(Step::Suspend(request)),
            Ask::Fizzle(reason) => return Ok(Step::Fizzled(reason)),
        }
    };
}

/// Answers given so far for the node being executed.
struct Answers<'a> {
    given: &'a [ChoiceAnswer],
    next: usize,
}

impl<'a> Answers<'a> {
    fn next(&mut self) -> Option<&'a ChoiceAnswer> {
        let answer = self.given.get(self.next);
        if answer.is_some() {
            self.next += 1;
        }
        answer
    }
}

/// A prompt under construction.
struct Prompt {
    player: PlayerId,
    kind: ChoiceKind,
    text: String,
    options: Vec<ChoiceOption>,
    min: usize,
    max: usize,
    optional: bool,
}

/// Interprets effect nodes.
pub struct Executor;

impl Executor {
    /// Execute one node. `answers` are the choices already made for it.
    pub fn execute(
        env: &mut ExecEnv<'_>,
        effect: &Effect,
        ctx: &mut EffectContext,
        answers: &[ChoiceAnswer],
    ) -> Result<Step> {
        let mut answers = Answers {
            given: answers,
            next: 0,
        };
        let chooser = ctx.chooser(effect.chooser);

        if let Some(reason) = Self::precheck(env, effect, ctx, chooser) {
            debug!(effect = effect.kind.name(), %reason, "effect fizzled");
            return Ok(Step::Fizzled(reason));
        }

        if effect.optional {
            let prompt = Prompt {
                player: chooser,
                kind: ChoiceKind::Confirm,
                text: format!("Use optional effect: {}?", effect.kind.name()),
                options: vec![ChoiceOption::new(0, "No"), ChoiceOption::new(1, "Yes")],
                min: 1,
                max: 1,
                optional: true,
            };
            let answer = ask!(Self::ask(env, ctx, prompt, &mut answers));
            if !answer.accepted() {
                debug!(effect = effect.kind.name(), %chooser, "optional effect declined");
                return Ok(Step::Declined);
            }
        }

        Self::run(env, effect, ctx, chooser, &mut answers)
    }

    /// Fizzle chosen-target effects without candidates before prompting.
    fn precheck(
        env: &ExecEnv<'_>,
        effect: &Effect,
        ctx: &EffectContext,
        chooser: PlayerId,
    ) -> Option<FizzleReason> {
        let Some(Target::Chosen { filter, count }) = effect.kind.target() else {
            return None;
        };
        let fctx = ctx.filter_context(env.state, env.cards);
        let selector = TargetSelector::new(filter, *count).chosen_by(chooser);
        (!selector.has_targets(&fctx)).then_some(FizzleReason::NoLegalTargets)
    }

    fn run(
        env: &mut ExecEnv<'_>,
        effect: &Effect,
        ctx: &mut EffectContext,
        chooser: PlayerId,
        answers: &mut Answers<'_>,
    ) -> Result<Step> {
        let name = effect.kind.name();
        trace!(
            effect = name,
            source = ?ctx.source,
            controller = %ctx.controller,
            "executing effect"
        );

        match &effect.kind {
            // === Control flow ===
            EffectKind::Sequence(children) => Ok(Step::Expand(children.clone())),

            EffectKind::Conditional { condition, then } => {
                if Self::condition_holds(env, ctx, condition) {
                    Ok(Step::Expand(then.clone()))
                } else {
                    trace!(effect = name, "condition not met");
                    Ok(Step::Applied)
                }
            }

            EffectKind::ConditionalAction { condition, base, replacement } => {
                if Self::condition_holds(env, ctx, condition) {
                    Ok(Step::Expand(replacement.clone()))
                } else {
                    Ok(Step::Expand(base.clone()))
                }
            }

            EffectKind::ForEach { count, effects } => {
                let n = {
                    let fctx = ctx.filter_context(env.state, env.cards);
                    count_of(count, &fctx, ctx.event.as_ref()).max(0) as usize
                };
                let repeated: Vec<Effect> = effects
                    .iter()
                    .cycle()
                    .take(effects.len() * n)
                    .cloned()
                    .collect();
                Ok(Step::Expand(repeated))
            }

            EffectKind::Modal { options } => {
                if options.is_empty() {
                    return Ok(Step::Applied);
                }
                let prompt = Prompt {
                    player: chooser,
                    kind: ChoiceKind::Mode,
                    text: "Choose one".to_string(),
                    options: options
                        .iter()
                        .enumerate()
                        .map(|(i, option)| {
                            let names: Vec<_> = option.iter().map(|e| e.kind.name()).collect();
                            let label = names.join(", ");
                            ChoiceOption::new(i as u32, label)
                        })
                        .collect(),
                    min: 1,
                    max: 1,
                    optional: false,
                };
                let answer = ask!(Self::ask(env, ctx, prompt, answers));
                let index = answer.selected.first().copied().unwrap_or(0) as usize;
                Ok(Step::Expand(options.get(index).cloned().unwrap_or_default()))
            }

            // === Drawing and hands ===
            EffectKind::Draw { who, amount } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let n = ask!(Self::amount(env, ctx, amount, player, answers));
                    mechanics::draw(env.state, player, n.max(0) as u32, env.events)?;
                }
                Ok(Step::Applied)
            }

            EffectKind::DrawUntil { who, hand_size } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let have = env.state.zone_size(player, Zone::Hand) as u32;
                    mechanics::draw(env.state, player, hand_size.saturating_sub(have), env.events)?;
                }
                Ok(Step::Applied)
            }

            EffectKind::Discard { who, amount, random } => {
                let mut plan = Vec::new();
                let mut random_picks = Vec::new();
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let hand = env.state.cards_in(player, Zone::Hand);
                    if hand.is_empty() {
                        continue;
                    }
                    let wanted = match amount {
                        Amount::All => hand.len(),
                        other => {
                            ask!(Self::amount(env, ctx, other, player, answers)).max(0) as usize
                        }
                    };
                    let n = wanted.min(hand.len());
                    if n == 0 {
                        continue;
                    }
                    if n == hand.len() {
                        plan.extend(hand);
                    } else if *random {
                        random_picks.push((hand, n));
                    } else {
                        let prompt = Prompt {
                            player,
                            kind: ChoiceKind::Discard,
                            text: format!("Choose {n} card(s) to discard"),
                            options: Self::card_options(env, &hand),
                            min: n,
                            max: n,
                            optional: false,
                        };
                        let answer = ask!(Self::ask(env, ctx, prompt, answers));
                        plan.extend(answer.cards().into_iter().filter(|c| hand.contains(c)));
                    }
                }
                for (mut pool, n) in random_picks {
                    for _ in 0..n {
                        let i = env.state.rng.gen_range_usize(0..pool.len());
                        plan.push(pool.remove(i));
                    }
                }
                for card in plan {
                    mechanics::discard(env.state, card, env.events)?;
                }
                Ok(Step::Applied)
            }

            EffectKind::DiscardHand { who } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    for card in env.state.cards_in(player, Zone::Hand) {
                        mechanics::discard(env.state, card, env.events)?;
                    }
                }
                Ok(Step::Applied)
            }

            // === Moving cards ===
            EffectKind::Banish { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    mechanics::banish(env.state, *card, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::ReturnToHand { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    mechanics::return_to_hand(env.state, *card, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::PutIntoInkwell { target, exerted } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    mechanics::put_into_inkwell(env.state, *card, *exerted, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::InkFromDeck { who, exerted } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let deck = ZoneKey::new(player, Zone::Deck);
                    let Some(card) = env.state.zones.top_card(deck) else {
                        return Ok(Step::Fizzled(FizzleReason::EmptyZone));
                    };
                    mechanics::put_into_inkwell(env.state, card, *exerted, env.events)?;
                }
                Ok(Step::Applied)
            }

            EffectKind::ShuffleIntoDeck { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                let mut owners: SmallVec<[PlayerId; 2]> = SmallVec::new();
                for card in &targets {
                    let owner = env.state.try_instance(*card)?.owner;
                    Self::leave_play(env, *card, Zone::Deck, ZonePosition::Top)?;
                    if !owners.contains(&owner) {
                        owners.push(owner);
                    }
                }
                for owner in owners {
                    let deck = ZoneKey::new(owner, Zone::Deck);
                    env.state.zones.shuffle_zone(deck, &mut env.state.rng);
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::PutOnBottom { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    Self::leave_play(env, *card, Zone::Deck, ZonePosition::Bottom)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::LookAtTop { who, count, plan } => {
                let player = players(*who, ctx.controller, ctx.event.as_ref(), env.state)
                    .first()
                    .copied()
                    .unwrap_or(ctx.controller);
                let deck = ZoneKey::new(player, Zone::Deck);
                let seen = env.state.zones.top_cards(deck, *count as usize);
                if seen.is_empty() {
                    return Ok(Step::Fizzled(FizzleReason::EmptyZone));
                }
                let candidates: Vec<InstanceId> = {
                    let fctx = ctx.filter_context(env.state, env.cards);
                    seen.iter()
                        .copied()
                        .filter(|id| {
                            plan.filter.as_ref().map_or(true, |f| {
                                env.state
                                    .instance(*id)
                                    .is_some_and(|c| f.matches_traits(&fctx, c))
                            })
                        })
                        .collect()
                };
                let (min, max) = plan.take.bounds(candidates.len());
                let picked = if max == 0 {
                    Vec::new()
                } else {
                    let prompt = Prompt {
                        player: ctx.controller,
                        kind: ChoiceKind::Look,
                        text: format!("Look at the top {} card(s)", seen.len()),
                        options: Self::card_options(env, &candidates),
                        min,
                        max,
                        optional: min == 0,
                    };
                    ask!(Self::ask(env, ctx, prompt, answers)).cards_among(&candidates)
                };

                for card in &picked {
                    Self::place(env, *card, plan.to)?;
                }
                if plan.rest != LookDestination::TopOfDeck {
                    for card in seen.iter().filter(|c| !picked.contains(c)) {
                        Self::place(env, *card, plan.rest)?;
                    }
                }
                ctx.remembered = picked.into_iter().collect();
                Ok(Step::Applied)
            }

            EffectKind::Mill { who, amount } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let n = ask!(Self::amount(env, ctx, amount, player, answers)).max(0) as usize;
                    for card in env.state.zones.top_cards(ZoneKey::new(player, Zone::Deck), n) {
                        env.state.move_card(card, Zone::Discard, ZonePosition::Top)?;
                    }
                }
                Ok(Step::Applied)
            }

            EffectKind::ReturnFromDiscard { filter, count } => {
                let filter = filter.clone().in_zone(Zone::Discard).yours();
                let picked = ask!(Self::pick_from_zone(
                    env,
                    ctx,
                    &filter,
                    *count,
                    ChoiceKind::Targets,
                    name,
                    answers,
                ));
                for card in &picked {
                    env.state.move_card(*card, Zone::Hand, ZonePosition::Top)?;
                }
                ctx.remembered = picked.into_iter().collect();
                Ok(Step::Applied)
            }

            EffectKind::PlayForFree { filter } => {
                let filter = filter.clone().in_zone(Zone::Hand).yours();
                let picked = ask!(Self::pick_from_zone(
                    env,
                    ctx,
                    &filter,
                    TargetCount::UpTo(1),
                    ChoiceKind::Targets,
                    name,
                    answers,
                ));
                for card in &picked {
                    Self::play_free(env, *card, ctx.controller)?;
                }
                ctx.remembered = picked.into_iter().collect();
                Ok(Step::Applied)
            }

            EffectKind::Tutor { filter } => {
                let filter = filter.clone().in_zone(Zone::Deck).yours();
                let picked = ask!(Self::pick_from_zone(
                    env,
                    ctx,
                    &filter,
                    TargetCount::UpTo(1),
                    ChoiceKind::Look,
                    name,
                    answers,
                ));
                for card in &picked {
                    env.state.move_card(*card, Zone::Hand, ZonePosition::Top)?;
                }
                env.state
                    .zones
                    .shuffle_zone(ZoneKey::new(ctx.controller, Zone::Deck), &mut env.state.rng);
                ctx.remembered = picked.into_iter().collect();
                Ok(Step::Applied)
            }

            // === Stored modifiers ===
            EffectKind::ModifyStats { target, stat, amount, duration } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                let n = ask!(Self::amount(env, ctx, amount, ctx.controller, answers));
                let modification = Modification::Stat {
                    stat: *stat,
                    amount: n,
                };
                Self::store(env, ctx, &targets, modification, *duration);
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::GrantKeyword { target, keyword, duration } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                Self::store(env, ctx, &targets, Modification::Keyword(*keyword), *duration);
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::Restrict { target, restriction, duration } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                Self::store(env, ctx, &targets, Modification::Restriction(*restriction), *duration);
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::PreventDamage { target, duration } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                Self::store(env, ctx, &targets, Modification::PreventChallengeDamage, *duration);
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::CostReduction { amount, filter, duration, next_only } => {
                let effect = ContinuousEffect::create(
                    env.state,
                    ctx.source,
                    ctx.controller,
                    AppliesTo::Player(ctx.controller),
                    Modification::CostReduction {
                        amount: *amount,
                        filter: filter.clone(),
                        next_only: *next_only,
                    },
                    *duration,
                );
                continuous::add_effect(env.state, env.cards, effect);
                Ok(Step::Applied)
            }

            // === Readiness ===
            EffectKind::Exert { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    mechanics::exert(env.state, *card, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::Ready { target } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                for card in &targets {
                    mechanics::ready(env.state, *card, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            // === Damage ===
            EffectKind::DealDamage { target, amount } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                let n = ask!(Self::amount(env, ctx, amount, chooser, answers)).max(0) as u32;
                for card in &targets {
                    mechanics::deal_damage(env.state, *card, n, ctx.source, false, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::RemoveDamage { target, amount } => {
                let targets = ask!(Self::targets(env, ctx, target, chooser, name, answers));
                let n = match amount {
                    Amount::All => u32::MAX,
                    other => ask!(Self::amount(env, ctx, other, chooser, answers)).max(0) as u32,
                };
                for card in &targets {
                    mechanics::remove_damage(env.state, *card, n, env.events)?;
                }
                Self::finish(env, ctx, chooser, targets)
            }

            EffectKind::MoveDamage { from, to, amount } => {
                let sources = ask!(Self::targets(env, ctx, from, chooser, name, answers));
                let destinations = ask!(Self::targets(env, ctx, to, chooser, name, answers));
                let n = match amount {
                    Amount::All => u32::MAX,
                    other => ask!(Self::amount(env, ctx, other, chooser, answers)).max(0) as u32,
                };
                let from = sources.first().copied();
                let (Some(from), Some(to)) = (from, destinations.first().copied()) else {
                    return Ok(Step::Fizzled(FizzleReason::NoLegalTargets));
                };
                let moved = n.min(env.state.try_instance(from)?.damage);
                if moved > 0 && from != to {
                    env.state.try_instance_mut(from)?.damage -= moved;
                    env.state.try_instance_mut(to)?.damage += moved;
                    trace!(%from, %to, moved, "damage moved");
                }
                Self::finish(env, ctx, chooser, destinations)
            }

            EffectKind::DistributeDamage { amount, filter } => {
                let mut assigned = Vec::with_capacity(*amount as usize);
                for point in 0..*amount {
                    let candidates = Self::candidates(env, ctx, filter, Some(chooser));
                    if candidates.is_empty() {
                        break;
                    }
                    let prompt = Prompt {
                        player: chooser,
                        kind: ChoiceKind::Targets,
                        text: format!("Assign damage point {} of {}", point + 1, amount),
                        options: Self::card_options(env, &candidates),
                        min: 1,
                        max: 1,
                        optional: false,
                    };
                    let answer = ask!(Self::ask(env, ctx, prompt, answers));
                    assigned.extend(answer.cards_among(&candidates).into_iter().take(1));
                }
                if assigned.is_empty() {
                    return Ok(Step::Fizzled(FizzleReason::NoLegalTargets));
                }
                // One hit per target, so Resist applies once.
                let mut totals: Vec<(InstanceId, u32)> = Vec::new();
                for card in assigned {
                    match totals.iter_mut().find(|(id, _)| *id == card) {
                        Some((_, points)) => *points += 1,
                        None => totals.push((card, 1)),
                    }
                }
                for &(card, points) in &totals {
                    mechanics::deal_damage(env.state, card, points, ctx.source, false, env.events)?;
                }
                let targets = totals.into_iter().map(|(card, _)| card).collect();
                Self::finish(env, ctx, chooser, targets)
            }

            // === Lore ===
            EffectKind::GainLore { who, amount } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let n = ask!(Self::amount(env, ctx, amount, player, answers)).max(0) as u32;
                    mechanics::gain_lore(env.state, player, n, env.events);
                }
                Ok(Step::Applied)
            }

            EffectKind::LoseLore { who, amount } => {
                for player in players(*who, ctx.controller, ctx.event.as_ref(), env.state) {
                    let n = match amount {
                        Amount::All => u32::MAX,
                        other => {
                            let n = ask!(Self::amount(env, ctx, other, ctx.controller, answers));
                            n.max(0) as u32
                        }
                    };
                    mechanics::lose_lore(env.state, player, n);
                }
                Ok(Step::Applied)
            }

            EffectKind::Unrecognized(text) => Err(EngineError::UnhandledEffect(text.clone())),
        }
    }

    // === Decisions ===

    /// Return the next replayed answer, or a request for it.
    fn ask<'a>(
        env: &mut ExecEnv<'_>,
        ctx: &EffectContext,
        prompt: Prompt,
        answers: &mut Answers<'a>,
    ) -> Ask<&'a ChoiceAnswer> {
        if let Some(answer) = answers.next() {
            return Ask::Ready(answer);
        }
        let request = ChoiceRequest {
            id: ChoiceId::new(env.state.next_choice_id()),
            player: prompt.player,
            kind: prompt.kind,
            prompt: prompt.text,
            options: prompt.options,
            min: prompt.min,
            max: prompt.max,
            optional: prompt.optional,
            source: ctx.source,
        };
        debug!(
            id = %request.id,
            player = %request.player,
            kind = ?request.kind,
            "choice requested"
        );
        Ask::Suspend(request)
    }

    fn card_options(env: &ExecEnv<'_>, ids: &[InstanceId]) -> Vec<ChoiceOption> {
        ids.iter()
            .map(|id| {
                let label = env
                    .state
                    .instance(*id)
                    .and_then(|c| env.cards.get(c.card))
                    .map_or_else(|| id.to_string(), |card| card.full_name());
                ChoiceOption::card(*id, label)
            })
            .collect()
    }

    fn candidates(
        env: &ExecEnv<'_>,
        ctx: &EffectContext,
        filter: &TargetFilter,
        chooser: Option<PlayerId>,
    ) -> Vec<InstanceId> {
        let fctx = ctx.filter_context(env.state, env.cards);
        let mut selector = TargetSelector::new(filter, TargetCount::Any);
        if let Some(chooser) = chooser {
            selector = selector.chosen_by(chooser);
        }
        selector.valid_targets(&fctx)
    }

    /// Resolve a target to concrete cards, asking the chooser if needed.
    fn targets(
        env: &mut ExecEnv<'_>,
        ctx: &EffectContext,
        target: &Target,
        chooser: PlayerId,
        effect: &str,
        answers: &mut Answers<'_>,
    ) -> Ask<Vec<InstanceId>> {
        match target {
            Target::Chosen { filter, count } => {
                let candidates = Self::candidates(env, ctx, filter, Some(chooser));
                if candidates.is_empty() {
                    return Ask::Fizzle(FizzleReason::NoLegalTargets);
                }
                let (min, max) = count.bounds(candidates.len());
                let prompt = Prompt {
                    player: chooser,
                    kind: ChoiceKind::Targets,
                    text: format!("Choose target(s) for {effect}"),
                    options: Self::card_options(env, &candidates),
                    min,
                    max,
                    optional: min == 0,
                };
                match Self::ask(env, ctx, prompt, answers) {
                    Ask::Ready(answer) => Ask::Ready(answer.cards_among(&candidates)),
                    Ask::Suspend(request) => Ask::Suspend(request),
                    Ask::Fizzle(reason) => Ask::Fizzle(reason),
                }
            }
            other => {
                let resolved = Self::fixed_targets(env.state, env.cards, ctx, other);
                if resolved.is_empty() {
                    let reason = if matches!(other, Target::This) {
                        FizzleReason::SourceGone
                    } else {
                        FizzleReason::NoLegalTargets
                    };
                    return Ask::Fizzle(reason);
                }
                Ask::Ready(resolved)
            }
        }
    }

    /// Targets that need no decision.
    fn fixed_targets(
        state: &GameState,
        cards: &CardRegistry,
        ctx: &EffectContext,
        target: &Target,
    ) -> Vec<InstanceId> {
        match target {
            Target::This => ctx
                .source
                .filter(|id| state.instance(*id).is_some_and(|c| c.in_play()))
                .into_iter()
                .collect(),
            Target::All(filter) => {
                let fctx = ctx.filter_context(state, cards);
                TargetSelector::new(filter, TargetCount::Any).valid_targets(&fctx)
            }
            Target::Named(name) => {
                let fctx = ctx.filter_context(state, cards);
                let filter = TargetFilter::any().yours().named(name.clone());
                TargetSelector::new(&filter, TargetCount::Any).valid_targets(&fctx)
            }
            Target::Triggering => ctx
                .event
                .as_ref()
                .and_then(|e| e.subject)
                .filter(|id| state.instance(*id).is_some())
                .into_iter()
                .collect(),
            Target::Previous => ctx.remembered.to_vec(),
            Target::Chosen { .. } => Vec::new(),
        }
    }

    /// Evaluate an amount. "Up to N" asks `player` for the number.
    fn amount(
        env: &mut ExecEnv<'_>,
        ctx: &EffectContext,
        amount: &Amount,
        player: PlayerId,
        answers: &mut Answers<'_>,
    ) -> Ask<i32> {
        match amount {
            Amount::Fixed(n) => Ask::Ready(*n),
            Amount::UpTo(n) if *n <= 0 => Ask::Ready(0),
            Amount::UpTo(n) => {
                let prompt = Prompt {
                    player,
                    kind: ChoiceKind::Amount,
                    text: format!("Choose a number from 0 to {n}"),
                    options: (0..=*n as u32).map(|i| ChoiceOption::new(i, i.to_string())).collect(),
                    min: 1,
                    max: 1,
                    optional: false,
                };
                match Self::ask(env, ctx, prompt, answers) {
                    Ask::Ready(answer) => {
                        Ask::Ready(answer.selected.first().map_or(0, |v| *v as i32))
                    }
                    Ask::Suspend(request) => Ask::Suspend(request),
                    Ask::Fizzle(reason) => Ask::Fizzle(reason),
                }
            }
            Amount::ForEach { per, count } => {
                let fctx = ctx.filter_context(env.state, env.cards);
                Ask::Ready(per * count_of(count, &fctx, ctx.event.as_ref()))
            }
            Amount::StatOf { target, stat } => {
                let cards = Self::fixed_targets(env.state, env.cards, ctx, target);
                Ask::Ready(cards.first().map_or(0, |id| stat_value(env.state, *id, *stat)))
            }
            Amount::All => Ask::Ready(i32::MAX),
        }
    }

    /// Pick cards from a non-play zone.
    fn pick_from_zone(
        env: &mut ExecEnv<'_>,
        ctx: &EffectContext,
        filter: &TargetFilter,
        count: TargetCount,
        kind: ChoiceKind,
        effect: &str,
        answers: &mut Answers<'_>,
    ) -> Ask<Vec<InstanceId>> {
        let candidates = Self::candidates(env, ctx, filter, None);
        if candidates.is_empty() {
            return Ask::Fizzle(FizzleReason::NoLegalTargets);
        }
        let (min, max) = count.bounds(candidates.len());
        let prompt = Prompt {
            player: ctx.controller,
            kind,
            text: format!("Choose card(s) for {effect}"),
            options: Self::card_options(env, &candidates),
            min,
            max,
            optional: min == 0,
        };
        match Self::ask(env, ctx, prompt, answers) {
            Ask::Ready(answer) => Ask::Ready(answer.cards_among(&candidates)),
            Ask::Suspend(request) => Ask::Suspend(request),
            Ask::Fizzle(reason) => Ask::Fizzle(reason),
        }
    }

    fn condition_holds(env: &ExecEnv<'_>, ctx: &EffectContext, condition: &Condition) -> bool {
        let cctx = ConditionContext::new(env.state, env.cards, ctx.controller)
            .with_source(ctx.source)
            .with_event(ctx.event.as_ref())
            .with_remembered(&ctx.remembered);
        ConditionEvaluator::evaluate(condition, &cctx)
    }

    // === Mutations ===

    /// Remember resolved targets and apply Vanish.
    fn finish(
        env: &mut ExecEnv<'_>,
        ctx: &mut EffectContext,
        chooser: PlayerId,
        targets: Vec<InstanceId>,
    ) -> Result<Step> {
        if ctx.from_action {
            for card in &targets {
                let vanishes = env
                    .state
                    .instance(*card)
                    .is_some_and(|c| {
                        c.in_play() && c.owner != chooser && c.has_keyword(KeywordKind::Vanish)
                    });
                if vanishes {
                    debug!(%card, "vanish");
                    mechanics::banish(env.state, *card, env.events)?;
                }
            }
        }
        ctx.remembered = targets.into_iter().collect();
        Ok(Step::Applied)
    }

    fn store(
        env: &mut ExecEnv<'_>,
        ctx: &EffectContext,
        targets: &[InstanceId],
        modification: Modification,
        duration: Duration,
    ) {
        let in_play: SmallVec<[InstanceId; 2]> = targets
            .iter()
            .copied()
            .filter(|id| env.state.instance(*id).is_some_and(|c| c.in_play()))
            .collect();
        if in_play.is_empty() {
            return;
        }
        let effect = ContinuousEffect::create(
            env.state,
            ctx.source,
            ctx.controller,
            AppliesTo::Instances(in_play),
            modification,
            duration,
        );
        continuous::add_effect(env.state, env.cards, effect);
    }

    /// Move a card out of wherever it is; cards in play leave properly.
    fn leave_play(
        env: &mut ExecEnv<'_>,
        card: InstanceId,
        zone: Zone,
        position: ZonePosition,
    ) -> Result<()> {
        let instance = env.state.try_instance(card)?;
        if instance.in_play() {
            for under in instance.beneath.clone() {
                env.state.move_card(under, Zone::Discard, ZonePosition::Top)?;
            }
            env.state.try_instance_mut(card)?.beneath.clear();
            continuous::remove_for_source(env.state, card);
        }
        env.state.move_card(card, zone, position)?;
        Ok(())
    }

    fn place(env: &mut ExecEnv<'_>, card: InstanceId, destination: LookDestination) -> Result<()> {
        match destination {
            LookDestination::Hand => {
                env.state.move_card(card, Zone::Hand, ZonePosition::Top)?;
            }
            LookDestination::TopOfDeck => {
                env.state.move_card(card, Zone::Deck, ZonePosition::Top)?;
            }
            LookDestination::BottomOfDeck => {
                env.state.move_card(card, Zone::Deck, ZonePosition::Bottom)?;
            }
            LookDestination::Discard => {
                env.state.move_card(card, Zone::Discard, ZonePosition::Top)?;
            }
            LookDestination::Inkwell => {
                mechanics::put_into_inkwell(env.state, card, false, env.events)?;
            }
        }
        Ok(())
    }

    /// Play a card without paying its cost.
    fn play_free(env: &mut ExecEnv<'_>, card: InstanceId, player: PlayerId) -> Result<()> {
        let definition = env.state.try_instance(card)?.card;
        let card_type = env
            .cards
            .get(definition)
            .map(|c| c.card_type)
            .ok_or(EngineError::UnknownCard(definition))?;
        debug!(%card, %player, "played for free");
        if card_type == CardType::Action || card_type == CardType::Song {
            env.plays.push((card, player));
            Ok(())
        } else {
            mechanics::enter_play(env.state, card, player, env.events)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardId};
    use crate::core::RulesConfig;
    use crate::effects::{ChoiceResponse, Keyword, LookPlan};
    use crate::triggers::EventKind;

    struct Fixture {
        state: GameState,
        cards: CardRegistry,
        events: Vec<GameEvent>,
        plays: Vec<(InstanceId, PlayerId)>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut cards = CardRegistry::new();
            cards.register(Card::character(CardId::new(1), "Pua", 1).with_stats(1, 3, 1));
            cards.register(Card::character(CardId::new(2), "Heihei", 2).with_stats(2, 2, 1));
            cards.register(
                Card::character(CardId::new(3), "Tamatoa", 4)
                    .with_stats(3, 5, 1)
                    .with_ability("Ward"),
            );
            cards.register(
                Card::character(CardId::new(4), "Maui", 5)
                    .with_stats(3, 5, 2)
                    .with_ability("Resist +1"),
            );
            cards.register(
                Card::action(CardId::new(5), "Heave Ho", 1).with_ability("Draw a card."),
            );
            let mut state = GameState::new(&RulesConfig::default(), 11);
            state.turn = 1;
            Self {
                state,
                cards,
                events: Vec::new(),
                plays: Vec::new(),
            }
        }

        fn spawn(&mut self, card: u32, owner: u8, zone: Zone) -> InstanceId {
            let card = self.cards.get(CardId::new(card)).unwrap().clone();
            let id = self
                .state
                .spawn(&card, PlayerId::new(owner), zone, ZonePosition::Top)
                .unwrap();
            continuous::recompute(&mut self.state, &self.cards);
            id
        }

        fn run(
            &mut self,
            effect: &Effect,
            ctx: &mut EffectContext,
            answers: &[ChoiceAnswer],
        ) -> Step {
            let mut env = ExecEnv {
                state: &mut self.state,
                cards: &self.cards,
                events: &mut self.events,
                plays: &mut self.plays,
            };
            Executor::execute(&mut env, effect, ctx, answers).unwrap()
        }
    }

    fn p0() -> PlayerId {
        PlayerId::new(0)
    }

    fn answer(request: &ChoiceRequest, response: ChoiceResponse) -> ChoiceAnswer {
        request.check(&response).unwrap();
        response.into()
    }

    #[test]
    fn test_chosen_target_suspends_then_applies() {
        let mut f = Fixture::new();
        let source = f.spawn(1, 0, Zone::Play);
        let heihei = f.spawn(2, 1, Zone::Play);
        let effect = Effect::damage(Target::opposing(TargetFilter::characters()), 2);
        let mut ctx = EffectContext::new(Some(source), p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a choice");
        };
        assert_eq!(request.kind, ChoiceKind::Targets);
        assert_eq!(request.option_ids(), vec![heihei.raw()]);
        assert_eq!(f.state.instance(heihei).unwrap().damage, 0);

        let given = answer(&request, ChoiceResponse::select_cards(&request, &[heihei]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(heihei).unwrap().damage, 2);
        assert_eq!(ctx.remembered.as_slice(), &[heihei]);
    }

    #[test]
    fn test_no_targets_fizzles_without_prompt() {
        let mut f = Fixture::new();
        let source = f.spawn(1, 0, Zone::Play);
        let effect = Effect::banish(Target::opposing(TargetFilter::characters())).optional();
        let mut ctx = EffectContext::new(Some(source), p0());
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Fizzled(FizzleReason::NoLegalTargets));
    }

    #[test]
    fn test_ward_hides_from_opponent() {
        let mut f = Fixture::new();
        let source = f.spawn(1, 0, Zone::Play);
        f.spawn(3, 1, Zone::Play);
        let effect = Effect::banish(Target::opposing(TargetFilter::characters()));
        let mut ctx = EffectContext::new(Some(source), p0());
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Fizzled(FizzleReason::NoLegalTargets));
    }

    #[test]
    fn test_declined_optional_does_nothing() {
        let mut f = Fixture::new();
        f.spawn(1, 0, Zone::Deck);
        let effect = Effect::draw(1).optional();
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected confirm");
        };
        assert_eq!(request.kind, ChoiceKind::Confirm);
        let given = answer(&request, ChoiceResponse::decline(&request));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Declined);
        assert_eq!(f.state.zone_size(p0(), Zone::Hand), 0);
    }

    #[test]
    fn test_conditional_action_picks_one_branch() {
        let mut f = Fixture::new();
        let effect = Effect::new(EffectKind::ConditionalAction {
            condition: Condition::DuringYourTurn,
            base: vec![Effect::gain_lore(1)],
            replacement: vec![Effect::gain_lore(3)],
        });
        let mut ctx = EffectContext::new(None, p0());
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Expand(vec![Effect::gain_lore(3)]));

        let mut ctx = EffectContext::new(None, PlayerId::new(1));
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Expand(vec![Effect::gain_lore(1)]));
    }

    #[test]
    fn test_for_each_repeats_children() {
        let mut f = Fixture::new();
        f.spawn(1, 0, Zone::Play);
        f.spawn(2, 0, Zone::Play);
        let effect = Effect::new(EffectKind::ForEach {
            count: Count::InPlay(TargetFilter::characters().yours()),
            effects: vec![Effect::draw(1)],
        });
        let mut ctx = EffectContext::new(None, p0());
        assert_eq!(
            f.run(&effect, &mut ctx, &[]),
            Step::Expand(vec![Effect::draw(1), Effect::draw(1)])
        );
    }

    #[test]
    fn test_this_turn_modifier_on_previous() {
        let mut f = Fixture::new();
        let pua = f.spawn(1, 0, Zone::Play);
        let effect = Effect::modify(Target::Previous, Stat::Strength, 2, Duration::ThisTurn);
        let mut ctx = EffectContext::new(None, p0());
        ctx.remembered.push(pua);

        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Applied);
        assert_eq!(f.state.instance(pua).unwrap().strength(), 3);
    }

    #[test]
    fn test_discard_asks_discarding_player() {
        let mut f = Fixture::new();
        let a = f.spawn(1, 1, Zone::Hand);
        f.spawn(2, 1, Zone::Hand);
        let effect = Effect::new(EffectKind::Discard {
            who: PlayerTarget::Opponent,
            amount: Amount::Fixed(1),
            random: false,
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected discard choice");
        };
        assert_eq!(request.player, PlayerId::new(1));
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[a]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(a).unwrap().zone, Zone::Discard);
        assert_eq!(f.state.zone_size(PlayerId::new(1), Zone::Hand), 1);
    }

    #[test]
    fn test_vanish_banishes_when_chosen_by_opponent_action() {
        let mut f = Fixture::new();
        let mut cards = CardRegistry::new();
        cards.register_with_abilities(
            Card::character(CardId::new(9), "Ghost", 2).with_stats(1, 4, 1),
            vec![crate::effects::AbilityDefinition::keyword(
                Keyword::new(KeywordKind::Vanish),
                "Vanish",
            )],
        );
        f.cards = cards;
        let ghost = f.spawn(9, 1, Zone::Play);
        let effect = Effect::new(EffectKind::Exert {
            target: Target::opposing(TargetFilter::characters()),
        });
        let mut ctx = EffectContext::new(None, p0()).from_action();

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected target choice");
        };
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[ghost]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(ghost).unwrap().zone, Zone::Discard);
    }

    #[test]
    fn test_unrecognized_is_fatal() {
        let mut f = Fixture::new();
        let effect = Effect::new(EffectKind::Unrecognized("juggle".into()));
        let mut ctx = EffectContext::new(None, p0());
        let mut env = ExecEnv {
            state: &mut f.state,
            cards: &f.cards,
            events: &mut f.events,
            plays: &mut f.plays,
        };
        assert!(matches!(
            Executor::execute(&mut env, &effect, &mut ctx, &[]),
            Err(EngineError::UnhandledEffect(_))
        ));
    }

    #[test]
    fn test_modal_expands_chosen_option() {
        let mut f = Fixture::new();
        let effect = Effect::new(EffectKind::Modal {
            options: vec![vec![Effect::draw(1)], vec![Effect::gain_lore(1)]],
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a mode choice");
        };
        assert_eq!(request.kind, ChoiceKind::Mode);
        assert_eq!(request.option_ids(), vec![0, 1]);
        let given = answer(&request, ChoiceResponse::select(&request, [1]));
        assert_eq!(
            f.run(&effect, &mut ctx, &[given]),
            Step::Expand(vec![Effect::gain_lore(1)])
        );
    }

    #[test]
    fn test_distributed_damage_hits_each_target_once() {
        let mut f = Fixture::new();
        let maui = f.spawn(4, 1, Zone::Play);
        let heihei = f.spawn(2, 1, Zone::Play);
        let effect = Effect::new(EffectKind::DistributeDamage {
            amount: 3,
            filter: TargetFilter::characters(),
        });
        let mut ctx = EffectContext::new(None, p0());

        let mut given = Vec::new();
        for pick in [maui, maui, heihei] {
            let Step::Suspend(request) = f.run(&effect, &mut ctx, &given) else {
                panic!("expected a damage assignment");
            };
            given.push(answer(&request, ChoiceResponse::select_cards(&request, &[pick])));
        }
        assert_eq!(f.run(&effect, &mut ctx, &given), Step::Applied);

        // Resist +1 reduces the two points on Maui as one hit.
        assert_eq!(f.state.instance(maui).unwrap().damage, 1);
        assert_eq!(f.state.instance(heihei).unwrap().damage, 1);
        let hits = f
            .events
            .iter()
            .filter(|e| e.kind == EventKind::DamageDealt)
            .count();
        assert_eq!(hits, 2);
        assert_eq!(ctx.remembered.as_slice(), &[maui, heihei]);
    }

    #[test]
    fn test_distributed_damage_all_on_resist() {
        let mut f = Fixture::new();
        let maui = f.spawn(4, 1, Zone::Play);
        let effect = Effect::new(EffectKind::DistributeDamage {
            amount: 3,
            filter: TargetFilter::characters(),
        });
        let mut ctx = EffectContext::new(None, p0());

        let mut given = Vec::new();
        while let Step::Suspend(request) = f.run(&effect, &mut ctx, &given) {
            given.push(answer(&request, ChoiceResponse::select_cards(&request, &[maui])));
        }
        assert_eq!(given.len(), 3);
        assert_eq!(f.state.instance(maui).unwrap().damage, 2);
    }

    #[test]
    fn test_move_damage_from_source() {
        let mut f = Fixture::new();
        let pua = f.spawn(1, 0, Zone::Play);
        let heihei = f.spawn(2, 1, Zone::Play);
        f.state.instance_mut(pua).unwrap().damage = 2;
        let effect = Effect::new(EffectKind::MoveDamage {
            from: Target::This,
            to: Target::opposing(TargetFilter::characters()),
            amount: Amount::Fixed(1),
        });
        let mut ctx = EffectContext::new(Some(pua), p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a destination choice");
        };
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[heihei]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(pua).unwrap().damage, 1);
        assert_eq!(f.state.instance(heihei).unwrap().damage, 1);
    }

    #[test]
    fn test_look_at_top_takes_one_and_bottoms_the_rest() {
        let mut f = Fixture::new();
        let bottom = f.spawn(1, 0, Zone::Deck);
        let second = f.spawn(2, 0, Zone::Deck);
        let top = f.spawn(3, 0, Zone::Deck);
        let effect = Effect::new(EffectKind::LookAtTop {
            who: PlayerTarget::You,
            count: 2,
            plan: LookPlan {
                filter: None,
                take: TargetCount::UpTo(1),
                to: LookDestination::Hand,
                rest: LookDestination::BottomOfDeck,
            },
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a look choice");
        };
        assert_eq!(request.kind, ChoiceKind::Look);
        assert_eq!((request.min, request.max), (0, 1));
        assert_eq!(request.option_ids(), vec![top.raw(), second.raw()]);

        let given = answer(&request, ChoiceResponse::select_cards(&request, &[second]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(second).unwrap().zone, Zone::Hand);
        assert_eq!(f.state.cards_in(p0(), Zone::Deck), vec![top, bottom]);
        assert_eq!(ctx.remembered.as_slice(), &[second]);
    }

    #[test]
    fn test_tutor_moves_named_card_to_hand() {
        let mut f = Fixture::new();
        f.spawn(1, 0, Zone::Deck);
        let heihei = f.spawn(2, 0, Zone::Deck);
        f.spawn(1, 0, Zone::Deck);
        let effect = Effect::new(EffectKind::Tutor {
            filter: TargetFilter::characters().named("Heihei"),
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a search choice");
        };
        assert_eq!(request.option_ids(), vec![heihei.raw()]);
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[heihei]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(heihei).unwrap().zone, Zone::Hand);
        assert_eq!(f.state.zone_size(p0(), Zone::Deck), 2);
    }

    #[test]
    fn test_mill_puts_top_cards_into_discard() {
        let mut f = Fixture::new();
        let p1 = PlayerId::new(1);
        for _ in 0..3 {
            f.spawn(1, 1, Zone::Deck);
        }
        let effect = Effect::new(EffectKind::Mill {
            who: PlayerTarget::Opponent,
            amount: Amount::Fixed(2),
        });
        let mut ctx = EffectContext::new(None, p0());
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Applied);
        assert_eq!(f.state.zone_size(p1, Zone::Discard), 2);
        assert_eq!(f.state.zone_size(p1, Zone::Deck), 1);
    }

    #[test]
    fn test_play_for_free() {
        let mut f = Fixture::new();
        let pua = f.spawn(1, 0, Zone::Hand);
        let effect = Effect::new(EffectKind::PlayForFree {
            filter: TargetFilter::characters(),
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a card choice");
        };
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[pua]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert!(f.state.instance(pua).unwrap().in_play());
        assert!(f.plays.is_empty());

        // Actions are handed back to the engine to resolve.
        let heave_ho = f.spawn(5, 0, Zone::Hand);
        let effect = Effect::new(EffectKind::PlayForFree {
            filter: TargetFilter::of_type(CardType::Action),
        });
        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a card choice");
        };
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[heave_ho]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.plays, vec![(heave_ho, p0())]);
    }

    #[test]
    fn test_return_from_discard() {
        let mut f = Fixture::new();
        let pua = f.spawn(1, 0, Zone::Discard);
        f.spawn(2, 1, Zone::Discard);
        let effect = Effect::new(EffectKind::ReturnFromDiscard {
            filter: TargetFilter::characters(),
            count: TargetCount::Exactly(1),
        });
        let mut ctx = EffectContext::new(None, p0());

        let Step::Suspend(request) = f.run(&effect, &mut ctx, &[]) else {
            panic!("expected a card choice");
        };
        assert_eq!(request.option_ids(), vec![pua.raw()]);
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[pua]));
        assert_eq!(f.run(&effect, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.instance(pua).unwrap().zone, Zone::Hand);
    }

    #[test]
    fn test_ink_from_deck() {
        let mut f = Fixture::new();
        let effect = Effect::new(EffectKind::InkFromDeck {
            who: PlayerTarget::You,
            exerted: true,
        });
        let mut ctx = EffectContext::new(None, p0());
        assert_eq!(
            f.run(&effect, &mut ctx, &[]),
            Step::Fizzled(FizzleReason::EmptyZone)
        );

        let card = f.spawn(1, 0, Zone::Deck);
        assert_eq!(f.run(&effect, &mut ctx, &[]), Step::Applied);
        let inked = f.state.instance(card).unwrap();
        assert_eq!(inked.zone, Zone::Inkwell);
        assert!(inked.exerted);
    }

    #[test]
    fn test_put_on_bottom_and_shuffle_into_deck() {
        let mut f = Fixture::new();
        let p1 = PlayerId::new(1);
        let pua = f.spawn(1, 0, Zone::Play);
        f.spawn(1, 1, Zone::Deck);
        let heihei = f.spawn(2, 1, Zone::Play);
        let bottom = Effect::new(EffectKind::PutOnBottom {
            target: Target::opposing(TargetFilter::characters()),
        });
        let mut ctx = EffectContext::new(Some(pua), p0());

        let Step::Suspend(request) = f.run(&bottom, &mut ctx, &[]) else {
            panic!("expected a target choice");
        };
        let given = answer(&request, ChoiceResponse::select_cards(&request, &[heihei]));
        assert_eq!(f.run(&bottom, &mut ctx, &[given]), Step::Applied);
        assert_eq!(f.state.cards_in(p1, Zone::Deck).first(), Some(&heihei));

        let shuffle = Effect::new(EffectKind::ShuffleIntoDeck {
            target: Target::This,
        });
        assert_eq!(f.run(&shuffle, &mut ctx, &[]), Step::Applied);
        assert_eq!(f.state.instance(pua).unwrap().zone, Zone::Deck);
        assert_eq!(f.state.zone_size(p0(), Zone::Play), 0);
    }
}
