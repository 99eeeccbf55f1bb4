//! Zone manager for card locations and movement.
//!
//! Every player owns one of each [`Zone`]. The manager tracks which zone
//! each instance is in and keeps every zone ordered:
//! - Deck: index 0 is the bottom, the last element is the top card
//! - Play: order of entry, which is the registration order used by the
//!   trigger registry
//! - Hand, Discard, Inkwell: order of arrival
//!
//! Moving an instance relocates it; an instance is never in two zones and
//! never duplicated. Storage uses `im` collections so cloning the manager
//! for a rollback snapshot is O(1).

use im::{HashMap as ImHashMap, OrdMap, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{GameRng, InstanceId, PlayerId};
use crate::error::{EngineError, Result};

/// The zones a player owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    Deck,
    Hand,
    Play,
    Discard,
    Inkwell,
    /// Cards underneath a shifted character.
    Beneath,
}

impl Zone {
    /// Lower-case zone name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deck => "deck",
            Self::Hand => "hand",
            Self::Play => "play",
            Self::Discard => "discard",
            Self::Inkwell => "inkwell",
            Self::Beneath => "beneath",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A specific player's zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneKey {
    pub owner: PlayerId,
    pub zone: Zone,
}

impl ZoneKey {
    #[must_use]
    pub const fn new(owner: PlayerId, zone: Zone) -> Self {
        Self { owner, zone }
    }
}

/// Position for inserting a card into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// End of the zone (top of a deck).
    Top,
    /// Start of the zone (bottom of a deck).
    Bottom,
    /// Insert at a specific index (0 = bottom).
    Index(usize),
}

/// Tracks card locations across every player's zones.
///
/// ```
/// use rust_lorcana::zones::{Zone, ZoneKey, ZoneManager, ZonePosition};
/// use rust_lorcana::core::{InstanceId, PlayerId};
///
/// let deck = ZoneKey::new(PlayerId::new(0), Zone::Deck);
/// let mut zones = ZoneManager::new();
/// zones.add_to_zone(InstanceId(1), deck, ZonePosition::Top).unwrap();
/// zones.add_to_zone(InstanceId(2), deck, ZonePosition::Top).unwrap();
///
/// assert_eq!(zones.top_card(deck), Some(InstanceId(2)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ZoneManager {
    locations: OrdMap<InstanceId, ZoneKey>,
    order: ImHashMap<ZoneKey, Vector<InstanceId>>,
}

impl ZoneManager {
    /// Create an empty zone manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new instance to a zone.
    pub fn add_to_zone(
        &mut self,
        id: InstanceId,
        key: ZoneKey,
        position: ZonePosition,
    ) -> Result<()> {
        if self.locations.contains_key(&id) {
            return Err(EngineError::DuplicateInstance(id));
        }
        self.locations.insert(id, key);
        self.insert_ordered(id, key, position);
        Ok(())
    }

    /// Move an instance to another zone.
    ///
    /// Returns the old zone, or `None` if the instance is unknown. Moving
    /// within the same zone repositions the instance.
    pub fn move_to_zone(
        &mut self,
        id: InstanceId,
        key: ZoneKey,
        position: ZonePosition,
    ) -> Option<ZoneKey> {
        let old = self.locations.get(&id).copied()?;
        self.detach(id, old);
        self.locations.insert(id, key);
        self.insert_ordered(id, key, position);
        Some(old)
    }

    fn detach(&mut self, id: InstanceId, key: ZoneKey) {
        if let Some(list) = self.order.get_mut(&key) {
            if let Some(index) = list.index_of(&id) {
                list.remove(index);
            }
        }
    }

    fn insert_ordered(&mut self, id: InstanceId, key: ZoneKey, position: ZonePosition) {
        let list = self.order.entry(key).or_insert_with(Vector::new);
        match position {
            ZonePosition::Top => list.push_back(id),
            ZonePosition::Bottom => list.push_front(id),
            ZonePosition::Index(i) => {
                let index = i.min(list.len());
                list.insert(index, id);
            }
        }
    }

    /// Get the zone an instance is in.
    #[must_use]
    pub fn zone_of(&self, id: InstanceId) -> Option<ZoneKey> {
        self.locations.get(&id).copied()
    }

    /// Check if an instance is in a specific zone.
    #[must_use]
    pub fn is_in(&self, id: InstanceId, key: ZoneKey) -> bool {
        self.locations.get(&id) == Some(&key)
    }

    /// Instances in a zone, bottom/oldest first.
    #[must_use]
    pub fn cards_in(&self, key: ZoneKey) -> Vec<InstanceId> {
        self.order
            .get(&key)
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of instances in a zone.
    #[must_use]
    pub fn zone_size(&self, key: ZoneKey) -> usize {
        self.order.get(&key).map_or(0, Vector::len)
    }

    /// The top card of a zone (last element).
    #[must_use]
    pub fn top_card(&self, key: ZoneKey) -> Option<InstanceId> {
        self.order.get(&key)?.last().copied()
    }

    /// The top `count` cards of a zone, topmost first.
    #[must_use]
    pub fn top_cards(&self, key: ZoneKey, count: usize) -> Vec<InstanceId> {
        self.order
            .get(&key)
            .map(|list| list.iter().rev().take(count).copied().collect())
            .unwrap_or_default()
    }

    /// Shuffle a zone.
    pub fn shuffle_zone(&mut self, key: ZoneKey, rng: &mut GameRng) {
        if let Some(list) = self.order.get_mut(&key) {
            let mut cards: Vec<InstanceId> = list.iter().copied().collect();
            rng.shuffle(&mut cards);
            *list = cards.into_iter().collect();
        }
    }

    /// Total number of tracked instances.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.locations.len()
    }

    /// Check if the manager tracks an instance.
    #[must_use]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.locations.contains_key(&id)
    }
}
