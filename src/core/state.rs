//! Game state.
//!
//! ## GameState
//!
//! Everything a game position consists of:
//! - Turn number, phase, active and starting player
//! - Per-player lore and turn flags
//! - Zone manager (card locations and order)
//! - Card instances
//! - Stored continuous effects
//! - RNG, action history, and the result once decided
//!
//! All collections are `im` persistent structures so a snapshot taken
//! before an action is an O(1) clone. The engine restores that snapshot
//! when an action fails with a fatal error.

use im::{OrdMap, Vector};

use super::action::ActionRecord;
use super::config::RulesConfig;
use super::entity::InstanceId;
use super::player::{PlayerId, PlayerMap, PlayerState};
use super::rng::GameRng;
use crate::cards::{Card, CardInstance};
use crate::continuous::ContinuousEffect;
use crate::error::{EngineError, Result};
use crate::rules::{GameResult, Phase};
use crate::zones::{Zone, ZoneKey, ZoneManager, ZonePosition};

/// Complete game state.
#[derive(Clone, Debug)]
pub struct GameState {
    /// Turn number, starting at 1.
    pub turn: u32,

    pub phase: Phase,

    /// Player whose turn it is.
    pub active_player: PlayerId,

    /// Player who took the first turn.
    pub starting_player: PlayerId,

    pub players: PlayerMap<PlayerState>,

    pub zones: ZoneManager,

    cards: OrdMap<InstanceId, CardInstance>,

    /// Stored (non-static) continuous effects, in creation order.
    pub continuous: Vector<ContinuousEffect>,

    pub rng: GameRng,

    /// Accepted actions, oldest first.
    pub history: Vector<ActionRecord>,

    pub result: Option<GameResult>,

    next_instance: u32,
    next_effect: u32,
    next_choice: u32,
    action_sequence: u32,
}

impl GameState {
    /// Create an empty state for a new game.
    #[must_use]
    pub fn new(config: &RulesConfig, seed: u64) -> Self {
        Self {
            turn: 0,
            phase: Phase::Setup,
            active_player: PlayerId::new(0),
            starting_player: PlayerId::new(0),
            players: PlayerMap::with_default(config.player_count),
            zones: ZoneManager::new(),
            cards: OrdMap::new(),
            continuous: Vector::new(),
            rng: GameRng::new(seed),
            history: Vector::new(),
            result: None,
            next_instance: 1,
            next_effect: 1,
            next_choice: 1,
            action_sequence: 0,
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.player_count()
    }

    /// Whether the game has a result.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    // === Instances ===

    /// Look up an instance.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&CardInstance> {
        self.cards.get(&id)
    }

    /// Look up an instance mutably.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut CardInstance> {
        self.cards.get_mut(&id)
    }

    /// Look up an instance, failing with `UnknownInstance`.
    pub fn try_instance(&self, id: InstanceId) -> Result<&CardInstance> {
        self.cards.get(&id).ok_or(EngineError::UnknownInstance(id))
    }

    /// Look up an instance mutably, failing with `UnknownInstance`.
    pub fn try_instance_mut(&mut self, id: InstanceId) -> Result<&mut CardInstance> {
        self.cards
            .get_mut(&id)
            .ok_or(EngineError::UnknownInstance(id))
    }

    /// Every instance, in id order.
    pub fn instances(&self) -> impl Iterator<Item = &CardInstance> {
        self.cards.values()
    }

    /// Every instance id, in order.
    #[must_use]
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.cards.keys().copied().collect()
    }

    /// Create a new instance of `card` in a zone.
    pub fn spawn(
        &mut self,
        card: &Card,
        owner: PlayerId,
        zone: Zone,
        position: ZonePosition,
    ) -> Result<InstanceId> {
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;

        self.zones.add_to_zone(id, ZoneKey::new(owner, zone), position)?;
        let mut instance = CardInstance::new(id, card, owner, zone);
        if zone == Zone::Play {
            instance.turn_played = Some(self.turn);
        }
        self.cards.insert(id, instance);
        Ok(id)
    }

    /// Move an instance to one of its owner's zones.
    ///
    /// Leaving play clears damage, exertion, and location; characters at a
    /// location that leaves play are detached. Returns the previous zone.
    pub fn move_card(
        &mut self,
        id: InstanceId,
        zone: Zone,
        position: ZonePosition,
    ) -> Result<Zone> {
        let instance = self.try_instance(id)?;
        let owner = instance.owner;
        let old = instance.zone;

        self.zones
            .move_to_zone(id, ZoneKey::new(owner, zone), position)
            .ok_or(EngineError::UnknownInstance(id))?;

        let turn = self.turn;
        let instance = self.try_instance_mut(id)?;
        instance.zone = zone;
        if old == Zone::Play && zone != Zone::Play {
            instance.reset_for_zone_change();
        }
        if zone == Zone::Play && old != Zone::Play {
            instance.turn_played = Some(turn);
        }

        if old == Zone::Play && zone != Zone::Play {
            let attached: Vec<InstanceId> = self
                .cards
                .values()
                .filter(|c| c.location == Some(id))
                .map(|c| c.id)
                .collect();
            for other in attached {
                if let Some(card) = self.cards.get_mut(&other) {
                    card.location = None;
                }
            }
        }
        Ok(old)
    }

    // === Zone Queries ===

    /// Instances in one of a player's zones, bottom/oldest first.
    #[must_use]
    pub fn cards_in(&self, player: PlayerId, zone: Zone) -> Vec<InstanceId> {
        self.zones.cards_in(ZoneKey::new(player, zone))
    }

    #[must_use]
    pub fn zone_size(&self, player: PlayerId, zone: Zone) -> usize {
        self.zones.zone_size(ZoneKey::new(player, zone))
    }

    /// Instances in play for both players, in id order.
    #[must_use]
    pub fn in_play(&self) -> Vec<InstanceId> {
        self.cards
            .values()
            .filter(|c| c.zone == Zone::Play)
            .map(|c| c.id)
            .collect()
    }

    /// Ready cards in a player's inkwell.
    #[must_use]
    pub fn available_ink(&self, player: PlayerId) -> u32 {
        self.cards_in(player, Zone::Inkwell)
            .into_iter()
            .filter_map(|id| self.instance(id))
            .filter(|c| !c.exerted)
            .count() as u32
    }

    /// Exert `amount` ready inkwell cards. Returns false (and changes
    /// nothing) if there is not enough ink.
    pub fn pay_ink(&mut self, player: PlayerId, amount: u32) -> bool {
        if self.available_ink(player) < amount {
            return false;
        }
        let ready: Vec<InstanceId> = self
            .cards_in(player, Zone::Inkwell)
            .into_iter()
            .filter(|id| self.instance(*id).is_some_and(|c| !c.exerted))
            .take(amount as usize)
            .collect();
        for id in ready {
            if let Some(card) = self.instance_mut(id) {
                card.exerted = true;
            }
        }
        true
    }

    // === Counters ===

    /// Allocate a continuous effect id.
    pub fn next_effect_id(&mut self) -> u32 {
        let id = self.next_effect;
        self.next_effect += 1;
        id
    }

    /// Allocate a choice id.
    pub fn next_choice_id(&mut self) -> u32 {
        let id = self.next_choice;
        self.next_choice += 1;
        id
    }

    /// Record an accepted action.
    pub fn record_action(&mut self, action: crate::core::GameAction) {
        let record = ActionRecord::new(action, self.turn, self.action_sequence);
        self.action_sequence += 1;
        self.history.push_back(record);
    }

    /// Advance to the next player's turn.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
        self.active_player = self.active_player.opponent();
        self.action_sequence = 0;
        for (_, player) in self.players.iter_mut() {
            player.reset_turn();
        }
    }
}
