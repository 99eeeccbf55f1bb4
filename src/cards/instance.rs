//! Card instances - runtime card state.
//!
//! A `CardInstance` is one physical card in one game. It tracks damage,
//! readiness, the drying marker (`turn_played`), location attachment, and
//! the derived stats the continuous effect engine recomputes after every
//! state change.
//!
//! Derived values are never edited incrementally; see
//! [`continuous`](crate::continuous).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::definition::{Card, CardId};
use crate::core::{InstanceId, PlayerId};
use crate::effects::{Keyword, KeywordKind, Restriction};
use crate::zones::Zone;

/// Keywords an instance currently has.
///
/// Numeric keywords of the same kind stack: Challenger +1 from the card and
/// Challenger +2 from an effect give `total(Challenger) == 3`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordSet(SmallVec<[Keyword; 4]>);

impl KeywordSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword.
    pub fn add(&mut self, keyword: Keyword) {
        self.0.push(keyword);
    }

    /// Whether any keyword of this kind is present.
    #[must_use]
    pub fn has(&self, kind: KeywordKind) -> bool {
        self.0.iter().any(|k| k.kind == kind)
    }

    /// Sum of values for a kind.
    #[must_use]
    pub fn total(&self, kind: KeywordKind) -> i32 {
        self.0.iter().filter(|k| k.kind == kind).map(|k| k.value).sum()
    }

    /// Largest value for a kind (Shift, Singer).
    #[must_use]
    pub fn max_value(&self, kind: KeywordKind) -> Option<i32> {
        self.0.iter().filter(|k| k.kind == kind).map(|k| k.value).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Values recomputed from scratch by the continuous effect engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedStats {
    pub strength: i32,
    pub willpower: i32,
    pub lore: i32,
    pub keywords: KeywordSet,
    pub restrictions: SmallVec<[Restriction; 2]>,
    /// Takes no damage from challenges.
    pub challenge_damage_immune: bool,
}

impl DerivedStats {
    /// Printed values of a card, with no modifiers applied.
    #[must_use]
    pub fn base(card: &Card) -> Self {
        Self {
            strength: card.strength,
            willpower: card.willpower,
            lore: card.lore,
            ..Self::default()
        }
    }
}

/// A card instance in a game.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: InstanceId,

    /// Definition this instance was created from.
    pub card: CardId,

    /// Owner, who is also the controller.
    pub owner: PlayerId,

    /// Current zone. Kept in sync with the zone manager by `GameState`.
    pub zone: Zone,

    pub damage: u32,

    pub exerted: bool,

    /// Turn the card entered play; cards are "drying" on that turn.
    pub turn_played: Option<u32>,

    /// Location this character is at.
    pub location: Option<InstanceId>,

    /// Cards underneath after Shift.
    pub beneath: SmallVec<[InstanceId; 1]>,

    pub derived: DerivedStats,
}

impl CardInstance {
    /// Create an instance with printed stats.
    #[must_use]
    pub fn new(id: InstanceId, card: &Card, owner: PlayerId, zone: Zone) -> Self {
        Self {
            id,
            card: card.id,
            owner,
            zone,
            damage: 0,
            exerted: false,
            turn_played: None,
            location: None,
            beneath: SmallVec::new(),
            derived: DerivedStats::base(card),
        }
    }

    /// Current strength, floored at zero.
    #[must_use]
    pub fn strength(&self) -> i32 {
        self.derived.strength.max(0)
    }

    /// Current willpower, floored at zero.
    #[must_use]
    pub fn willpower(&self) -> i32 {
        self.derived.willpower.max(0)
    }

    /// Current lore value, floored at zero.
    #[must_use]
    pub fn lore(&self) -> i32 {
        self.derived.lore.max(0)
    }

    #[must_use]
    pub fn has_keyword(&self, kind: KeywordKind) -> bool {
        self.derived.keywords.has(kind)
    }

    /// Summed keyword value (Challenger, Resist).
    #[must_use]
    pub fn keyword_total(&self, kind: KeywordKind) -> i32 {
        self.derived.keywords.total(kind)
    }

    #[must_use]
    pub fn is_restricted(&self, restriction: Restriction) -> bool {
        self.derived.restrictions.contains(&restriction)
    }

    /// Whether the card entered play this turn.
    #[must_use]
    pub fn is_drying(&self, turn: u32) -> bool {
        self.turn_played == Some(turn)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.exerted
    }

    #[must_use]
    pub fn in_play(&self) -> bool {
        self.zone == Zone::Play
    }

    /// Whether current damage banishes the card.
    #[must_use]
    pub fn is_lethally_damaged(&self) -> bool {
        self.damage > 0 && self.damage as i64 >= self.willpower() as i64
    }

    /// Clear per-play state when the card leaves play.
    pub fn reset_for_zone_change(&mut self) {
        self.damage = 0;
        self.exerted = false;
        self.turn_played = None;
        self.location = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> Card {
        Card::character(CardId::new(1), "Moana", 3).with_stats(2, 3, 1)
    }

    #[test]
    fn test_new_instance_uses_printed_stats() {
        let instance = CardInstance::new(InstanceId(5), &card(), PlayerId::new(0), Zone::Hand);
        assert_eq!(instance.strength(), 2);
        assert_eq!(instance.willpower(), 3);
        assert_eq!(instance.lore(), 1);
        assert!(instance.is_ready());
        assert!(!instance.in_play());
    }

    #[test]
    fn test_negative_stats_floor_at_zero() {
        let mut instance = CardInstance::new(InstanceId(5), &card(), PlayerId::new(0), Zone::Play);
        instance.derived.strength = -3;
        assert_eq!(instance.strength(), 0);
    }

    #[test]
    fn test_lethal_damage() {
        let mut instance = CardInstance::new(InstanceId(5), &card(), PlayerId::new(0), Zone::Play);
        instance.damage = 2;
        assert!(!instance.is_lethally_damaged());
        instance.damage = 3;
        assert!(instance.is_lethally_damaged());
    }

    #[test]
    fn test_keyword_set_stacks() {
        let mut keywords = KeywordSet::new();
        keywords.add(Keyword::with_value(KeywordKind::Challenger, 1));
        keywords.add(Keyword::with_value(KeywordKind::Challenger, 2));
        keywords.add(Keyword::new(KeywordKind::Evasive));

        assert_eq!(keywords.total(KeywordKind::Challenger), 3);
        assert_eq!(keywords.max_value(KeywordKind::Challenger), Some(2));
        assert!(keywords.has(KeywordKind::Evasive));
        assert!(!keywords.has(KeywordKind::Ward));
    }

    #[test]
    fn test_drying() {
        let mut instance = CardInstance::new(InstanceId(5), &card(), PlayerId::new(0), Zone::Play);
        instance.turn_played = Some(3);
        assert!(instance.is_drying(3));
        assert!(!instance.is_drying(4));
    }
}
