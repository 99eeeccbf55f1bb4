//! Game events.
//!
//! Every observable occurrence the rules engine produces is a `GameEvent`:
//! its `EventKind` plus the cards and player involved. Triggered abilities
//! listen for event kinds; the trigger registry matches them.
//!
//! ## Subject and Actor
//!
//! `subject` is the card the event is about (the card played, the character
//! that quested, the card banished). `actor` is the other card involved, if
//! any:
//!
//! | Kind | subject | actor |
//! |------|---------|-------|
//! | `Challenged` | defender | attacker |
//! | `BanishedInChallenge` | banished card | the other combatant |
//! | `DamageDealt` | damaged card | damage source |
//! | `SongSung` | song | first singer |
//! | `MovedToLocation` | character | location |

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, PlayerId};

/// The event alphabet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    CardPlayed,
    Quested,
    Challenged,
    Banished,
    BanishedInChallenge,
    DamageDealt,
    CardDrawn,
    CardInked,
    TurnStarted,
    TurnEnded,
    SongSung,
    MovedToLocation,
    Readied,
    Exerted,
    ReturnedToHand,
    Discarded,
    LoreGained,
    DamageRemoved,
}

impl EventKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CardPlayed => "card_played",
            Self::Quested => "quested",
            Self::Challenged => "challenged",
            Self::Banished => "banished",
            Self::BanishedInChallenge => "banished_in_challenge",
            Self::DamageDealt => "damage_dealt",
            Self::CardDrawn => "card_drawn",
            Self::CardInked => "card_inked",
            Self::TurnStarted => "turn_started",
            Self::TurnEnded => "turn_ended",
            Self::SongSung => "song_sung",
            Self::MovedToLocation => "moved_to_location",
            Self::Readied => "readied",
            Self::Exerted => "exerted",
            Self::ReturnedToHand => "returned_to_hand",
            Self::Discarded => "discarded",
            Self::LoreGained => "lore_gained",
            Self::DamageRemoved => "damage_removed",
        }
    }

    /// Whether the event describes its subject leaving play.
    ///
    /// Listeners of a departed card still answer these for their own card.
    #[must_use]
    pub const fn is_departure(self) -> bool {
        matches!(
            self,
            Self::Banished | Self::BanishedInChallenge | Self::ReturnedToHand | Self::Discarded
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One occurrence of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,

    /// Card the event is about.
    pub subject: Option<InstanceId>,

    /// Other card involved.
    pub actor: Option<InstanceId>,

    /// Player the event belongs to (who played, quested, drew, gained lore).
    pub player: Option<PlayerId>,

    /// Damage dealt, cards drawn, lore gained.
    pub amount: i32,
}

impl GameEvent {
    /// Create an event with just a kind.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            subject: None,
            actor: None,
            player: None,
            amount: 0,
        }
    }

    /// Set the subject (builder pattern).
    #[must_use]
    pub fn with_subject(mut self, subject: InstanceId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set the actor (builder pattern).
    #[must_use]
    pub fn with_actor(mut self, actor: InstanceId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the player (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Set the amount (builder pattern).
    #[must_use]
    pub fn with_amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    // === Convenience Constructors ===

    /// A card was played.
    #[must_use]
    pub fn played(card: InstanceId, player: PlayerId) -> Self {
        Self::new(EventKind::CardPlayed)
            .with_subject(card)
            .with_player(player)
    }

    /// A character quested for `lore`.
    #[must_use]
    pub fn quested(character: InstanceId, player: PlayerId, lore: i32) -> Self {
        Self::new(EventKind::Quested)
            .with_subject(character)
            .with_player(player)
            .with_amount(lore)
    }

    /// `attacker` challenged `defender`.
    #[must_use]
    pub fn challenged(attacker: InstanceId, defender: InstanceId, player: PlayerId) -> Self {
        Self::new(EventKind::Challenged)
            .with_subject(defender)
            .with_actor(attacker)
            .with_player(player)
    }

    /// A card was banished. `player` is the card's owner.
    #[must_use]
    pub fn banished(card: InstanceId, owner: PlayerId) -> Self {
        Self::new(EventKind::Banished)
            .with_subject(card)
            .with_player(owner)
    }

    /// Damage was dealt to a card.
    #[must_use]
    pub fn damage(target: InstanceId, source: Option<InstanceId>, amount: i32) -> Self {
        let mut event = Self::new(EventKind::DamageDealt)
            .with_subject(target)
            .with_amount(amount);
        event.actor = source;
        event
    }

    /// The active player's turn started or ended.
    #[must_use]
    pub fn turn(kind: EventKind, player: PlayerId) -> Self {
        Self::new(kind).with_player(player)
    }
}
