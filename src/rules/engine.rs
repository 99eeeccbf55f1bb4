//! The game driver.
//!
//! `Game` owns the state of one game and is the only entry point that
//! mutates it. Callers submit [`GameAction`]s through [`Game::apply`] and
//! answer prompts through [`Game::respond`]; both return an [`Outcome`].
//!
//! ## Resolution
//!
//! Everything that happens after an action is validated runs off the
//! [`ResolutionStack`]: turn steps, ability effect lists, and delayed
//! events. Each effect step is followed by a settle pass:
//!
//! 1. Recompute derived stats
//! 2. Banish lethally damaged cards until none remain
//! 3. Start listening to cards that entered play
//! 4. Check the lore threshold
//! 5. Match the step's events against the trigger registry and push the
//!    triggered abilities on top of the stack, one level deeper
//! 6. Stop listening to cards that left play
//!
//! Triggers therefore resolve depth-first, before the rest of the ability
//! that caused them. All triggers of one settle pass are pushed together:
//! the active player's first, then the opponent's, each in event order.
//!
//! ## Rollback
//!
//! A fatal [`EngineError`] during `apply` or `respond` restores the
//! snapshot taken before the call. All state lives in `im` collections, so
//! the snapshot is cheap.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, trace, warn};

use super::mechanics;
use super::turn::{Phase, TurnStep};
use super::validate::{self, RejectReason, Rejection};
use crate::cards::{CardId, CardRegistry, CardType};
use crate::continuous::{self, Boundary};
use crate::core::{GameAction, GameState, InstanceId, PlayerId, RulesConfig};
use crate::effects::{
    AbilityKind, ChoiceError, ChoiceRequest, ChoiceResponse, Cost, Effect, EffectContext,
    EffectKind, ExecEnv, Executor, Fizzle, Restriction, Step,
};
use crate::error::{EngineError, Result};
use crate::stack::{EffectFrame, Frame, ResolutionStack};
use crate::triggers::{Condition, EventKind, GameEvent, TriggerRegistry};
use crate::zones::{Zone, ZoneKey, ZonePosition};

/// How a game was won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// Reached the lore threshold.
    Lore,
    /// The opponent ended their turn with an empty deck.
    DeckOut,
    /// The opponent conceded.
    Concede,
}

/// Result of a completed game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    Winner { player: PlayerId, reason: WinReason },
    /// Both players reached the threshold in the same step.
    Draw,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        matches!(self, Self::Winner { player: p, .. } if *p == player)
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Winner { player, .. } => Some(*player),
            Self::Draw => None,
        }
    }
}

/// What `apply` and `respond` report back.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Everything resolved; effects that fizzled along the way are listed.
    Completed { fizzles: Vec<Fizzle> },
    /// Resolution is suspended until the request is answered.
    AwaitingChoice(ChoiceRequest),
    /// Nothing happened.
    Rejected(Rejection),
    GameOver(GameResult),
}

impl Outcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The outstanding request, if resolution suspended.
    #[must_use]
    pub fn choice(&self) -> Option<&ChoiceRequest> {
        match self {
            Self::AwaitingChoice(request) => Some(request),
            _ => None,
        }
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Everything `apply` and `respond` may change.
struct Snapshot {
    state: GameState,
    triggers: TriggerRegistry,
    listening: BTreeSet<InstanceId>,
    stack: ResolutionStack,
    pending: Option<ChoiceRequest>,
}

/// One game between two players.
///
/// ```
/// use std::sync::Arc;
/// use rust_lorcana::cards::{Card, CardId, CardRegistry};
/// use rust_lorcana::core::{GameAction, PlayerId, RulesConfig};
/// use rust_lorcana::rules::{Game, Outcome, Phase};
///
/// let mut cards = CardRegistry::new();
/// let goofy = cards.register(Card::character(CardId::new(1), "Goofy", 1).with_stats(1, 2, 1));
/// let config = RulesConfig::default().with_opening_hand(3).without_shuffle();
///
/// let mut game = Game::new(Arc::new(cards), config, 42);
/// game.setup_decks(vec![vec![goofy; 10], vec![goofy; 10]]).unwrap();
/// game.start(PlayerId::new(0)).unwrap();
/// assert_eq!(game.state().phase, Phase::Main);
///
/// let outcome = game.apply(GameAction::PassTurn { player: PlayerId::new(0) }).unwrap();
/// assert!(matches!(outcome, Outcome::Completed { .. }));
/// assert_eq!(game.state().active_player, PlayerId::new(1));
/// ```
#[derive(Clone, Debug)]
pub struct Game {
    cards: Arc<CardRegistry>,
    config: RulesConfig,
    state: GameState,
    triggers: TriggerRegistry,
    /// Instances whose triggered abilities are registered.
    listening: BTreeSet<InstanceId>,
    stack: ResolutionStack,
    pending: Option<ChoiceRequest>,
    fizzles: Vec<Fizzle>,
}

impl Game {
    /// Create a game in the Setup phase.
    #[must_use]
    pub fn new(cards: Arc<CardRegistry>, config: RulesConfig, seed: u64) -> Self {
        let state = GameState::new(&config, seed);
        Self {
            cards,
            config,
            state,
            triggers: TriggerRegistry::new(),
            listening: BTreeSet::new(),
            stack: ResolutionStack::new(),
            pending: None,
            fizzles: Vec::new(),
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct state access for building scenarios. Rules are not applied
    /// until the next action resolves.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn cards(&self) -> &CardRegistry {
        &self.cards
    }

    #[must_use]
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    /// The request resolution is waiting on.
    #[must_use]
    pub fn pending_choice(&self) -> Option<&ChoiceRequest> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        self.state.result
    }

    // === Setup ===

    /// Fill each player's deck. The first card listed is the top card
    /// unless the config shuffles decks.
    pub fn setup_decks(&mut self, decks: Vec<Vec<CardId>>) -> Result<()> {
        if self.state.phase != Phase::Setup {
            return Err(EngineError::AlreadyStarted);
        }
        let expected = self.state.player_count();
        if decks.len() != expected {
            return Err(EngineError::DeckCount {
                expected,
                actual: decks.len(),
            });
        }

        for (player, deck) in PlayerId::all(expected).zip(decks) {
            for card in deck.into_iter().rev() {
                let definition = self.cards.get(card).ok_or(EngineError::UnknownCard(card))?;
                self.state.spawn(definition, player, Zone::Deck, ZonePosition::Top)?;
            }
            if self.config.shuffle_decks {
                let key = ZoneKey::new(player, Zone::Deck);
                self.state.zones.shuffle_zone(key, &mut self.state.rng);
            }
            debug!(%player, size = self.state.zone_size(player, Zone::Deck), "deck ready");
        }
        Ok(())
    }

    /// Draw opening hands and run the first turn up to its Main phase.
    pub fn start(&mut self, starting_player: PlayerId) -> Result<Outcome> {
        if self.state.phase != Phase::Setup || self.state.turn > 0 {
            return Err(EngineError::AlreadyStarted);
        }

        let mut events = Vec::new();
        for player in PlayerId::all(self.state.player_count()) {
            let count = self.config.opening_hand_size as u32;
            mechanics::draw(&mut self.state, player, count, &mut events)?;
        }

        self.state.turn = 1;
        self.state.active_player = starting_player;
        self.state.starting_player = starting_player;
        info!(%starting_player, "game started");

        self.stack.push_in_order(TurnStep::OPENING.map(Frame::Phase));
        self.run()
    }

    /// Put a card straight into a zone, bypassing costs and events.
    ///
    /// Cards placed in play are dry and their triggered abilities are
    /// registered immediately.
    pub fn spawn(&mut self, card: CardId, owner: PlayerId, zone: Zone) -> Result<InstanceId> {
        let definition = self.cards.get(card).ok_or(EngineError::UnknownCard(card))?;
        let id = self.state.spawn(definition, owner, zone, ZonePosition::Top)?;
        if zone == Zone::Play {
            self.state.try_instance_mut(id)?.turn_played = None;
        }
        continuous::recompute(&mut self.state, &self.cards);
        self.listen_to_new_cards();
        Ok(id)
    }

    // === Entry points ===

    /// Validate and perform an action.
    pub fn apply(&mut self, action: GameAction) -> Result<Outcome> {
        if self.state.phase == Phase::Setup {
            return Err(EngineError::NotStarted);
        }
        if self.pending.is_some() {
            return Ok(Outcome::Rejected(Rejection::new(
                RejectReason::ChoicePending,
                "answer the outstanding choice first",
            )));
        }
        if let Err(rejection) = validate::validate(&self.state, &self.cards, &action) {
            debug!(
                action = action.name(),
                player = %action.player(),
                %rejection,
                "action rejected"
            );
            return Ok(Outcome::Rejected(rejection));
        }

        debug!(
            action = action.name(),
            player = %action.player(),
            turn = self.state.turn,
            "applying action"
        );
        let snapshot = self.snapshot();
        self.fizzles.clear();
        self.guarded(snapshot, |game| {
            game.state.record_action(action.clone());
            let mut events = Vec::new();
            let after = game.perform(&action, &mut events)?;
            game.settle(events, 0)?;
            game.stack.push_in_order(after);
            game.run()
        })
    }

    /// Answer the outstanding choice and resume resolution.
    pub fn respond(&mut self, response: ChoiceResponse) -> Result<Outcome> {
        let Some(request) = self.pending.as_ref() else {
            return Ok(Outcome::Rejected(Rejection::new(
                RejectReason::NoChoicePending,
                "no choice is outstanding",
            )));
        };
        if let Err(err) = request.check(&response) {
            let reason = match err {
                ChoiceError::Stale => RejectReason::StaleChoice,
                _ => RejectReason::InvalidChoice,
            };
            debug!(request = %request.id, %err, "choice response rejected");
            return Ok(Outcome::Rejected(Rejection::new(reason, err.to_string())));
        }

        trace!(request = %request.id, selected = ?response.selected_ids, "choice answered");
        let snapshot = self.snapshot();
        self.guarded(snapshot, |game| {
            game.pending = None;
            match game.stack.top_mut() {
                Some(Frame::Effects(frame)) => frame.answers.push(response.into()),
                _ => return Err(EngineError::NothingToResume),
            }
            game.run()
        })
    }

    /// Resolve an effect list as if an ability of `source` had started it.
    pub fn resolve_effects(
        &mut self,
        source: Option<InstanceId>,
        controller: PlayerId,
        effects: Vec<Effect>,
    ) -> Result<Outcome> {
        if self.pending.is_some() {
            return Ok(Outcome::Rejected(Rejection::new(
                RejectReason::ChoicePending,
                "answer the outstanding choice first",
            )));
        }
        let snapshot = self.snapshot();
        self.fizzles.clear();
        self.guarded(snapshot, |game| {
            let ctx = EffectContext::new(source, controller);
            game.stack.push(Frame::Effects(EffectFrame::new(effects, ctx, 0)));
            game.run()
        })
    }

    // === Legal actions ===

    /// Every action `player` could submit right now.
    #[must_use]
    pub fn legal_actions(&self, player: PlayerId) -> Vec<GameAction> {
        if self.pending.is_some() || self.state.is_over() || self.state.phase == Phase::Setup {
            return Vec::new();
        }

        let mut candidates = vec![GameAction::Concede { player }];
        if player == self.state.active_player && self.state.phase.accepts_actions() {
            candidates.push(GameAction::PassTurn { player });

            let hand = self.state.cards_in(player, Zone::Hand);
            let board = self.state.cards_in(player, Zone::Play);
            let opposing = self.state.cards_in(player.opponent(), Zone::Play);

            for &card in &hand {
                candidates.push(GameAction::play(player, card));
                candidates.push(GameAction::InkCard { player, card });
                for &base in &board {
                    candidates.push(GameAction::PlayCard {
                        player,
                        card,
                        shift_onto: Some(base),
                    });
                    candidates.push(GameAction::sing(player, card, base));
                }
            }

            for &card in &board {
                candidates.push(GameAction::quest(player, card));
                for &defender in &opposing {
                    candidates.push(GameAction::Challenge {
                        player,
                        attacker: card,
                        defender,
                    });
                }
                if let Some(instance) = self.state.instance(card) {
                    let abilities = self.cards.abilities(instance.card);
                    let activated = abilities
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| a.is_activated());
                    for (ability, _) in activated {
                        candidates.push(GameAction::UseAbility {
                            player,
                            card,
                            ability,
                        });
                    }
                }
                for &location in &board {
                    candidates.push(GameAction::Move {
                        player,
                        character: card,
                        location,
                    });
                }
            }
        }

        candidates
            .into_iter()
            .filter(|action| validate::validate(&self.state, &self.cards, action).is_ok())
            .collect()
    }

    // === Snapshots ===

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            triggers: self.triggers.clone(),
            listening: self.listening.clone(),
            stack: self.stack.clone(),
            pending: self.pending.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state = snapshot.state;
        self.triggers = snapshot.triggers;
        self.listening = snapshot.listening;
        self.stack = snapshot.stack;
        self.pending = snapshot.pending;
        self.fizzles.clear();
    }

    fn guarded(
        &mut self,
        snapshot: Snapshot,
        f: impl FnOnce(&mut Self) -> Result<Outcome>,
    ) -> Result<Outcome> {
        match f(self) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(%err, "fatal engine error, rolling back");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    // === Resolution loop ===

    fn run(&mut self) -> Result<Outcome> {
        loop {
            if let Some(result) = self.state.result {
                self.stack.clear();
                self.pending = None;
                info!(?result, turn = self.state.turn, "game over");
                return Ok(Outcome::GameOver(result));
            }

            let Some(frame) = self.stack.pop() else {
                return Ok(Outcome::Completed {
                    fizzles: std::mem::take(&mut self.fizzles),
                });
            };

            match frame {
                Frame::Phase(step) => {
                    let mut events = Vec::new();
                    self.turn_step(step, &mut events)?;
                    self.settle(events, 0)?;
                }
                Frame::Emit { event, depth } => self.settle(vec![event], depth)?,
                Frame::Effects(frame) => {
                    if let Some(request) = self.step_effects(frame)? {
                        return Ok(Outcome::AwaitingChoice(request));
                    }
                }
            }
        }
    }

    /// Run the effect at the frame's cursor. Returns the request if the
    /// effect suspended.
    fn step_effects(&mut self, mut frame: EffectFrame) -> Result<Option<ChoiceRequest>> {
        let Some(effect) = frame.current().cloned() else {
            return Ok(None);
        };

        let mut events = Vec::new();
        let mut plays = Vec::new();
        let step = {
            let mut env = ExecEnv {
                state: &mut self.state,
                cards: &self.cards,
                events: &mut events,
                plays: &mut plays,
            };
            Executor::execute(&mut env, &effect, &mut frame.ctx, &frame.answers)?
        };

        match step {
            Step::Suspend(request) => {
                debug!(
                    request = %request.id,
                    player = %request.player,
                    kind = ?request.kind,
                    "awaiting choice"
                );
                self.stack.push(Frame::Effects(frame));
                self.pending = Some(request.clone());
                return Ok(Some(request));
            }
            Step::Expand(children) => frame.expand(children),
            Step::Fizzled(reason) => {
                debug!(
                    effect = effect.kind.name(),
                    source = ?frame.ctx.source,
                    %reason,
                    "effect fizzled"
                );
                self.fizzles.push(Fizzle {
                    source: frame.ctx.source,
                    effect: effect.kind.name(),
                    reason,
                });
                frame.advance();
            }
            Step::Applied | Step::Declined => frame.advance(),
        }

        let depth = frame.depth;
        if !frame.is_done() {
            self.stack.push(Frame::Effects(frame));
        }

        let mut after = Vec::new();
        for (card, player) in plays {
            after.extend(self.play_action(card, player, depth)?);
        }
        self.settle(events, depth)?;
        self.stack.push_in_order(after);
        Ok(None)
    }

    /// Apply state-based rules after a step and queue its triggers.
    fn settle(&mut self, mut events: Vec<GameEvent>, depth: u32) -> Result<()> {
        loop {
            continuous::recompute(&mut self.state, &self.cards);
            if mechanics::banish_lethal(&mut self.state, &mut events)? == 0 {
                break;
            }
        }

        self.listen_to_new_cards();

        if self.state.result.is_none() {
            if let Some(result) = mechanics::lore_winner(&self.state, &self.config) {
                self.state.result = Some(result);
            }
        }

        let mut triggered = Vec::new();
        for event in &events {
            trace!(event = %event.kind, subject = ?event.subject, "dispatching event");
            triggered.extend(self.triggers.find_triggers(event, &self.state, &self.cards));
        }
        // Stable: each player's triggers keep event order.
        let active = self.state.active_player;
        triggered.sort_by_key(|t| t.controller != active);

        let child = depth + 1;
        if !triggered.is_empty() && child > self.config.max_trigger_depth {
            return Err(EngineError::TriggerDepthExceeded {
                max: self.config.max_trigger_depth,
            });
        }
        let frames: Vec<Frame> = triggered
            .into_iter()
            .map(|t| {
                debug!(
                    trigger = %t.trigger_id,
                    source = %t.source,
                    depth = child,
                    "ability triggered"
                );
                let ctx = EffectContext::new(Some(t.source), t.controller)
                    .with_event(Some(t.event));
                Frame::Effects(EffectFrame::new(t.ability.effects.clone(), ctx, child))
            })
            .collect();

        self.forget_departed();
        self.stack.push_in_order(frames);
        Ok(())
    }

    fn listen_to_new_cards(&mut self) {
        for id in self.state.in_play() {
            if self.listening.contains(&id) {
                continue;
            }
            let Some(instance) = self.state.instance(id) else {
                continue;
            };
            self.triggers
                .register_card(id, instance.owner, self.cards.abilities(instance.card));
            self.listening.insert(id);
        }
    }

    fn forget_departed(&mut self) {
        let departed: Vec<InstanceId> = self
            .listening
            .iter()
            .copied()
            .filter(|id| !self.state.instance(*id).is_some_and(|c| c.in_play()))
            .collect();
        for id in departed {
            self.listening.remove(&id);
            self.triggers.remove_for_source(id);
        }
    }

    // === Turn steps ===

    fn turn_step(&mut self, step: TurnStep, events: &mut Vec<GameEvent>) -> Result<()> {
        let active = self.state.active_player;
        self.state.phase = step.phase();
        debug!(turn = self.state.turn, player = %active, ?step, "turn step");

        match step {
            TurnStep::End => events.push(GameEvent::turn(EventKind::TurnEnded, active)),
            TurnStep::Cleanup => {
                continuous::expire(&mut self.state, &self.cards, Boundary::EndOfTurn);
                if self.state.zone_size(active, Zone::Deck) == 0 {
                    info!(player = %active, "decked out");
                    self.state.result = Some(GameResult::Winner {
                        player: active.opponent(),
                        reason: WinReason::DeckOut,
                    });
                    return Ok(());
                }
                self.state.advance_turn();
            }
            TurnStep::Ready => {
                for id in self.state.cards_in(active, Zone::Play) {
                    let instance = self.state.try_instance(id)?;
                    if !instance.is_restricted(Restriction::CantReady) {
                        mechanics::ready(&mut self.state, id, events)?;
                    }
                }
                for id in self.state.cards_in(active, Zone::Inkwell) {
                    self.state.try_instance_mut(id)?.exerted = false;
                }
                continuous::expire(&mut self.state, &self.cards, Boundary::ReadyStep);
            }
            TurnStep::Set => {
                for id in self.state.cards_in(active, Zone::Play) {
                    let instance = self.state.try_instance(id)?;
                    let is_location = self
                        .cards
                        .get(instance.card)
                        .is_some_and(|c| c.card_type == CardType::Location);
                    let lore = instance.lore();
                    if is_location && lore > 0 {
                        mechanics::gain_lore(&mut self.state, active, lore as u32, events);
                    }
                }
                events.push(GameEvent::turn(EventKind::TurnStarted, active));
            }
            TurnStep::Draw => {
                let skip = self.state.turn == 1
                    && active == self.state.starting_player
                    && !self.config.starting_player_draws;
                if !skip {
                    mechanics::draw(&mut self.state, active, 1, events)?;
                }
            }
            TurnStep::Main => {}
        }
        Ok(())
    }

    // === Actions ===

    /// Perform a validated action. Returns frames to resolve before the
    /// triggers the action caused.
    fn perform(&mut self, action: &GameAction, events: &mut Vec<GameEvent>) -> Result<Vec<Frame>> {
        match action {
            GameAction::PlayCard {
                player,
                card,
                shift_onto,
            } => return self.play_card(*player, *card, *shift_onto, events),
            GameAction::Quest { character, .. } => {
                mechanics::quest(&mut self.state, *character, events)?;
            }
            GameAction::Challenge { attacker, defender, .. } => {
                mechanics::challenge(&mut self.state, &self.cards, *attacker, *defender, events)?;
            }
            GameAction::UseAbility { player, card, ability } => {
                return self.use_ability(*player, *card, *ability, events);
            }
            GameAction::InkCard { player, card } => {
                mechanics::put_into_inkwell(&mut self.state, *card, false, events)?;
                self.state.players[*player].inked_this_turn = true;
            }
            GameAction::SingSong { player, song, singers } => {
                return self.sing(*player, *song, singers, events);
            }
            GameAction::PassTurn { .. } => {
                self.stack.push_in_order(TurnStep::PASS.map(Frame::Phase));
            }
            GameAction::Concede { player } => {
                self.state.players[*player].conceded = true;
                self.state.result = Some(GameResult::Winner {
                    player: player.opponent(),
                    reason: WinReason::Concede,
                });
                info!(%player, "conceded");
            }
            GameAction::Move {
                player,
                character,
                location,
            } => {
                let location_card = self.state.try_instance(*location)?.card;
                let cost = self
                    .cards
                    .get(location_card)
                    .ok_or(EngineError::UnknownCard(location_card))?
                    .move_cost
                    .unwrap_or(0);
                self.state.pay_ink(*player, cost);
                self.state.try_instance_mut(*character)?.location = Some(*location);
                events.push(
                    GameEvent::new(EventKind::MovedToLocation)
                        .with_subject(*character)
                        .with_actor(*location)
                        .with_player(*player),
                );
            }
        }
        Ok(Vec::new())
    }

    fn play_card(
        &mut self,
        player: PlayerId,
        card: InstanceId,
        shift_onto: Option<InstanceId>,
        events: &mut Vec<GameEvent>,
    ) -> Result<Vec<Frame>> {
        let cost = validate::play_cost(&self.state, &self.cards, player, card, shift_onto.is_some())
            .ok_or(EngineError::UnknownInstance(card))?;
        self.state.pay_ink(player, cost);
        continuous::consume_reductions(&mut self.state, &self.cards, player, card);

        let definition = self.state.try_instance(card)?.card;
        let card_type = self
            .cards
            .get(definition)
            .ok_or(EngineError::UnknownCard(definition))?
            .card_type;
        debug!(%card, %player, cost, ?card_type, "card played");

        if card_type.is_action() {
            return self.play_action(card, player, 0);
        }

        match shift_onto {
            Some(base) => self.shift(card, base, player, events)?,
            None => mechanics::enter_play(&mut self.state, card, player, events)?,
        }
        Ok(Vec::new())
    }

    /// Put a character onto a same-named one. The new card takes over the
    /// old card's exertion, damage, drying and location.
    fn shift(
        &mut self,
        card: InstanceId,
        base: InstanceId,
        player: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<()> {
        let old = self.state.try_instance(base)?.clone();
        mechanics::enter_play(&mut self.state, card, player, events)?;
        self.state.move_card(base, Zone::Beneath, ZonePosition::Top)?;
        continuous::remove_for_source(&mut self.state, base);

        let shifted = self.state.try_instance_mut(card)?;
        shifted.exerted = old.exerted;
        shifted.damage = old.damage;
        shifted.turn_played = old.turn_played;
        shifted.location = old.location;
        shifted.beneath = old.beneath;
        shifted.beneath.push(base);
        trace!(%card, %base, "shifted");
        Ok(())
    }

    fn sing(
        &mut self,
        player: PlayerId,
        song: InstanceId,
        singers: &SmallVec<[InstanceId; 2]>,
        events: &mut Vec<GameEvent>,
    ) -> Result<Vec<Frame>> {
        for &singer in singers {
            mechanics::exert(&mut self.state, singer, events)?;
        }
        let mut sung = GameEvent::new(EventKind::SongSung)
            .with_subject(song)
            .with_player(player);
        if let Some(&first) = singers.first() {
            sung = sung.with_actor(first);
        }
        events.push(sung);
        debug!(%song, %player, singers = singers.len(), "song sung");
        self.play_action(song, player, 0)
    }

    fn use_ability(
        &mut self,
        player: PlayerId,
        card: InstanceId,
        index: usize,
        events: &mut Vec<GameEvent>,
    ) -> Result<Vec<Frame>> {
        let definition = self.state.try_instance(card)?.card;
        let Some(ability) = self.cards.abilities(definition).get(index).cloned() else {
            return Err(EngineError::UnknownCard(definition));
        };
        let AbilityKind::Activated { costs } = &ability.kind else {
            return Err(EngineError::UnhandledEffect(format!(
                "ability {index} of {definition} is not activated"
            )));
        };

        let mut effects = Vec::new();
        for cost in costs {
            match *cost {
                Cost::Exert => mechanics::exert(&mut self.state, card, events)?,
                Cost::Ink(amount) => {
                    self.state.pay_ink(player, amount);
                }
                Cost::BanishSelf => {
                    mechanics::banish(&mut self.state, card, events)?;
                }
                Cost::Discard(amount) => effects.push(Effect::discard(amount as i32)),
            }
        }
        effects.extend(ability.effects.iter().cloned());
        debug!(%card, %player, ability = index, "ability activated");

        let ctx = EffectContext::new(Some(card), player);
        Ok(vec![Frame::Effects(EffectFrame::new(effects, ctx, 0))])
    }

    /// Resolve an action or song: it goes to the discard, its effects
    /// run, then its "played" event fires.
    fn play_action(
        &mut self,
        card: InstanceId,
        player: PlayerId,
        depth: u32,
    ) -> Result<Vec<Frame>> {
        self.state.move_card(card, Zone::Discard, ZonePosition::Top)?;
        let definition = self.state.try_instance(card)?.card;

        let effects: Vec<Effect> = self
            .cards
            .abilities(definition)
            .iter()
            .filter(|ability| ability.is_static())
            .flat_map(|ability| match &ability.condition {
                Condition::Always => ability.effects.clone(),
                condition => vec![Effect::new(EffectKind::Conditional {
                    condition: condition.clone(),
                    then: ability.effects.clone(),
                })],
            })
            .collect();

        let ctx = EffectContext::new(Some(card), player).from_action();
        Ok(vec![
            Frame::Effects(EffectFrame::new(effects, ctx, depth)),
            Frame::Emit {
                event: GameEvent::played(card, player),
                depth,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::effects::{AbilityDefinition, ChoiceResponse, Target, TargetFilter};
    use crate::triggers::TriggerFilter;

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    fn registry() -> CardRegistry {
        let mut cards = CardRegistry::new();
        cards.register(Card::character(CardId::new(1), "Goofy", 1).with_stats(1, 2, 1));
        cards.register(
            Card::character(CardId::new(2), "Stitch", 2)
                .with_stats(2, 2, 2)
                .with_ability("When you play this character, draw a card."),
        );
        cards.register(
            Card::action(CardId::new(3), "Fire the Cannons!", 1)
                .with_ability("Deal 2 damage to chosen character."),
        );
        cards
    }

    fn started() -> Game {
        let cards = registry();
        let config = RulesConfig::default()
            .with_opening_hand(3)
            .without_shuffle();
        let mut game = Game::new(Arc::new(cards), config, 9);
        let deck = vec![CardId::new(1); 12];
        game.setup_decks(vec![deck.clone(), deck]).unwrap();
        game.start(P0).unwrap();
        game
    }

    fn give_ink(game: &mut Game, player: PlayerId, amount: usize) {
        for _ in 0..amount {
            game.spawn(CardId::new(1), player, Zone::Inkwell).unwrap();
        }
    }

    #[test]
    fn test_start_runs_to_main() {
        let game = started();
        assert_eq!(game.state().phase, Phase::Main);
        assert_eq!(game.state().turn, 1);
        // The starting player skips the first draw.
        assert_eq!(game.state().zone_size(P0, Zone::Hand), 3);
        assert_eq!(game.state().zone_size(P1, Zone::Hand), 3);
    }

    #[test]
    fn test_start_twice_is_error() {
        let mut game = started();
        assert_eq!(game.start(P0), Err(EngineError::AlreadyStarted));
    }

    #[test]
    fn test_apply_before_start_is_error() {
        let mut game = Game::new(Arc::new(registry()), RulesConfig::default(), 1);
        let result = game.apply(GameAction::PassTurn { player: P0 });
        assert_eq!(result, Err(EngineError::NotStarted));
    }

    #[test]
    fn test_wrong_deck_count() {
        let mut game = Game::new(Arc::new(registry()), RulesConfig::default(), 1);
        let err = game.setup_decks(vec![vec![CardId::new(1)]]).unwrap_err();
        assert_eq!(
            err,
            EngineError::DeckCount {
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_pass_turn_draws_for_opponent() {
        let mut game = started();
        let outcome = game.apply(GameAction::PassTurn { player: P0 }).unwrap();
        assert!(outcome.is_completed());
        assert_eq!(game.state().active_player, P1);
        assert_eq!(game.state().turn, 2);
        assert_eq!(game.state().zone_size(P1, Zone::Hand), 4);
    }

    #[test]
    fn test_play_triggers_draw() {
        let mut game = started();
        give_ink(&mut game, P0, 2);
        let stitch = game.spawn(CardId::new(2), P0, Zone::Hand).unwrap();
        let hand_before = game.state().zone_size(P0, Zone::Hand);

        let outcome = game.apply(GameAction::play(P0, stitch)).unwrap();
        assert!(outcome.is_completed());
        assert!(game.state().instance(stitch).unwrap().in_play());
        // Stitch left the hand and the trigger drew one.
        assert_eq!(game.state().zone_size(P0, Zone::Hand), hand_before);
        assert_eq!(game.state().available_ink(P0), 0);
    }

    #[test]
    fn test_action_suspends_and_resumes() {
        let mut game = started();
        give_ink(&mut game, P0, 1);
        let target = game.spawn(CardId::new(2), P1, Zone::Play).unwrap();
        let cannons = game.spawn(CardId::new(3), P0, Zone::Hand).unwrap();

        let outcome = game.apply(GameAction::play(P0, cannons)).unwrap();
        let request = outcome.choice().cloned().unwrap();
        assert_eq!(game.pending_choice(), Some(&request));

        let blocked = game.apply(GameAction::PassTurn { player: P0 }).unwrap();
        assert_eq!(blocked.rejection().map(|r| r.reason), Some(RejectReason::ChoicePending));

        let outcome = game
            .respond(ChoiceResponse::select_cards(&request, &[target]))
            .unwrap();
        assert!(outcome.is_completed());
        assert_eq!(game.state().instance(target).unwrap().zone, Zone::Discard);
        assert_eq!(game.state().instance(cannons).unwrap().zone, Zone::Discard);
    }

    #[test]
    fn test_respond_without_pending() {
        let mut game = started();
        let request = ChoiceRequest {
            id: crate::effects::ChoiceId::new(99),
            player: P0,
            kind: crate::effects::ChoiceKind::Confirm,
            prompt: String::new(),
            options: Vec::new(),
            min: 0,
            max: 0,
            optional: true,
            source: None,
        };
        let outcome = game.respond(ChoiceResponse::decline(&request)).unwrap();
        assert_eq!(outcome.rejection().map(|r| r.reason), Some(RejectReason::NoChoicePending));
    }

    #[test]
    fn test_concede_from_unknown_seat_is_rejected() {
        let mut game = started();
        let outcome = game
            .apply(GameAction::Concede {
                player: PlayerId::new(5),
            })
            .unwrap();
        assert_eq!(
            outcome.rejection().map(|r| r.reason),
            Some(RejectReason::UnknownPlayer)
        );
        assert!(game.result().is_none());
    }

    #[test]
    fn test_concede_ends_game() {
        let mut game = started();
        let outcome = game.apply(GameAction::Concede { player: P1 }).unwrap();
        assert_eq!(
            outcome,
            Outcome::GameOver(GameResult::Winner {
                player: P0,
                reason: WinReason::Concede
            })
        );
        let after = game.apply(GameAction::PassTurn { player: P0 }).unwrap();
        assert_eq!(after.rejection().map(|r| r.reason), Some(RejectReason::GameOver));
    }

    #[test]
    fn test_unrecognized_effect_rolls_back() {
        let mut game = started();
        let hand = game.state().zone_size(P0, Zone::Hand);
        let effects = vec![
            Effect::draw(1),
            Effect::new(EffectKind::Unrecognized("mystery".into())),
        ];

        let result = game.resolve_effects(None, P0, effects);
        assert!(matches!(result, Err(EngineError::UnhandledEffect(_))));
        assert_eq!(game.state().zone_size(P0, Zone::Hand), hand);
        assert!(game.pending_choice().is_none());
    }

    #[test]
    fn test_deck_out_at_cleanup() {
        let cards = registry();
        let config = RulesConfig::default()
            .with_opening_hand(0)
            .without_shuffle();
        let mut game = Game::new(Arc::new(cards), config, 3);
        game.setup_decks(vec![Vec::new(), vec![CardId::new(1); 3]])
            .unwrap();
        game.start(P0).unwrap();

        let outcome = game.apply(GameAction::PassTurn { player: P0 }).unwrap();
        assert_eq!(
            outcome,
            Outcome::GameOver(GameResult::Winner {
                player: P1,
                reason: WinReason::DeckOut
            })
        );
    }

    #[test]
    fn test_legal_actions_filter_through_validation() {
        let mut game = started();
        let actions = game.legal_actions(P0);
        assert!(actions.contains(&GameAction::PassTurn { player: P0 }));
        assert!(actions.iter().any(|a| matches!(a, GameAction::InkCard { .. })));
        assert!(!actions.iter().any(|a| matches!(a, GameAction::Quest { .. })));

        let goofy = game.spawn(CardId::new(1), P0, Zone::Play).unwrap();
        let actions = game.legal_actions(P0);
        assert!(actions.contains(&GameAction::quest(P0, goofy)));
        assert_eq!(game.legal_actions(P1), vec![GameAction::Concede { player: P1 }]);
    }

    #[test]
    fn test_deal_damage_banishes_at_willpower() {
        let mut game = started();
        let target = game.spawn(CardId::new(2), P1, Zone::Play).unwrap();
        let effects = vec![Effect::damage(Target::chosen(TargetFilter::characters()), 2)];

        let outcome = game.resolve_effects(None, P0, effects).unwrap();
        let request = outcome.choice().cloned().unwrap();
        game.respond(ChoiceResponse::select_cards(&request, &[target]))
            .unwrap();
        assert_eq!(game.state().instance(target).unwrap().zone, Zone::Discard);
    }

    /// An action played by a triggered ability fires its "played" event
    /// at the trigger's depth, so listeners to it count one level deeper.
    #[test]
    fn test_free_play_keeps_trigger_depth() {
        let mut cards = registry();
        cards.register_with_abilities(
            Card::character(CardId::new(4), "Rafiki", 1).with_stats(1, 2, 1),
            vec![
                AbilityDefinition::triggered(
                    EventKind::CardPlayed,
                    TriggerFilter::SubjectIsSelf,
                    "When you play this character, you may play an action for free.",
                )
                .with_effect(Effect::new(EffectKind::PlayForFree {
                    filter: TargetFilter::of_type(CardType::Action),
                })),
            ],
        );
        cards.register_with_abilities(
            Card::character(CardId::new(5), "Timon", 1).with_stats(1, 2, 1),
            vec![AbilityDefinition::triggered(
                EventKind::CardPlayed,
                TriggerFilter::PlayerIsController,
                "Whenever you play a card, gain 1 lore.",
            )
            .with_effect(Effect::gain_lore(1))],
        );
        cards.register(Card::action(CardId::new(6), "Study", 1).with_ability("Draw a card."));

        let config = RulesConfig::default()
            .with_opening_hand(0)
            .with_max_trigger_depth(1)
            .without_shuffle();
        let mut game = Game::new(Arc::new(cards), config, 4);
        let deck = vec![CardId::new(1); 10];
        game.setup_decks(vec![deck.clone(), deck]).unwrap();
        game.start(P0).unwrap();

        give_ink(&mut game, P0, 1);
        game.spawn(CardId::new(5), P0, Zone::Play).unwrap();
        let study = game.spawn(CardId::new(6), P0, Zone::Hand).unwrap();
        let rafiki = game.spawn(CardId::new(4), P0, Zone::Hand).unwrap();

        let outcome = game.apply(GameAction::play(P0, rafiki)).unwrap();
        let request = outcome.choice().cloned().unwrap();
        let result = game.respond(ChoiceResponse::select_cards(&request, &[study]));
        assert_eq!(result, Err(EngineError::TriggerDepthExceeded { max: 1 }));
        assert_eq!(game.state().instance(study).unwrap().zone, Zone::Hand);
    }
}
