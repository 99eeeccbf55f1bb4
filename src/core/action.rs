//! Player actions.
//!
//! `GameAction` is the turn manager's input vocabulary. Every action names
//! the acting player and the card instances it points at; the engine
//! validates it against the current state before anything changes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::InstanceId;
use super::player::PlayerId;

/// An action a player submits during their turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    /// Play a card from hand, paying its ink cost. With `shift_onto` the
    /// card is played for its Shift cost on top of a same-named character.
    PlayCard {
        player: PlayerId,
        card: InstanceId,
        shift_onto: Option<InstanceId>,
    },

    /// Exert a dry character to gain its lore.
    Quest { player: PlayerId, character: InstanceId },

    /// Exert a dry character to challenge an exerted opposing character
    /// or an opposing location.
    Challenge {
        player: PlayerId,
        attacker: InstanceId,
        defender: InstanceId,
    },

    /// Activate the `ability`-th compiled ability of a card in play.
    UseAbility {
        player: PlayerId,
        card: InstanceId,
        ability: usize,
    },

    /// Put an inkable card from hand into the inkwell.
    InkCard { player: PlayerId, card: InstanceId },

    /// Exert one or more characters to play a song for free.
    SingSong {
        player: PlayerId,
        song: InstanceId,
        singers: SmallVec<[InstanceId; 2]>,
    },

    /// End the turn.
    PassTurn { player: PlayerId },

    /// Give up the game.
    Concede { player: PlayerId },

    /// Move a character to one of your locations, paying its move cost.
    Move {
        player: PlayerId,
        character: InstanceId,
        location: InstanceId,
    },
}

impl GameAction {
    /// The player submitting the action.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            Self::PlayCard { player, .. }
            | Self::Quest { player, .. }
            | Self::Challenge { player, .. }
            | Self::UseAbility { player, .. }
            | Self::InkCard { player, .. }
            | Self::SingSong { player, .. }
            | Self::PassTurn { player }
            | Self::Concede { player }
            | Self::Move { player, .. } => *player,
        }
    }

    /// Short name used in logs and rejection messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayCard { .. } => "play_card",
            Self::Quest { .. } => "quest",
            Self::Challenge { .. } => "challenge",
            Self::UseAbility { .. } => "use_ability",
            Self::InkCard { .. } => "ink_card",
            Self::SingSong { .. } => "sing_song",
            Self::PassTurn { .. } => "pass_turn",
            Self::Concede { .. } => "concede",
            Self::Move { .. } => "move",
        }
    }

    /// Convenience constructor for a normal play.
    #[must_use]
    pub fn play(player: PlayerId, card: InstanceId) -> Self {
        Self::PlayCard {
            player,
            card,
            shift_onto: None,
        }
    }

    #[must_use]
    pub fn quest(player: PlayerId, character: InstanceId) -> Self {
        Self::Quest { player, character }
    }

    #[must_use]
    pub fn challenge(player: PlayerId, attacker: InstanceId, defender: InstanceId) -> Self {
        Self::Challenge {
            player,
            attacker,
            defender,
        }
    }

    #[must_use]
    pub fn ink(player: PlayerId, card: InstanceId) -> Self {
        Self::InkCard { player, card }
    }

    /// Convenience constructor for a single-singer song.
    #[must_use]
    pub fn sing(player: PlayerId, song: InstanceId, singer: InstanceId) -> Self {
        let mut singers = SmallVec::new();
        singers.push(singer);
        Self::SingSong {
            player,
            song,
            singers,
        }
    }
}

/// A recorded action with its position in the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The action taken.
    pub action: GameAction,

    /// Turn number when the action was taken.
    pub turn: u32,

    /// Sequence number within the turn.
    pub sequence: u32,
}

impl ActionRecord {
    /// Create a new action record.
    #[must_use]
    pub fn new(action: GameAction, turn: u32, sequence: u32) -> Self {
        Self {
            action,
            turn,
            sequence,
        }
    }

    /// The acting player.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.action.player()
    }
}
