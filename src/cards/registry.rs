//! Card registry for definition lookup.
//!
//! The `CardRegistry` stores every card definition of a game together with
//! its compiled abilities. Abilities are compiled once, when the card is
//! registered, and shared by every instance through `Arc`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::definition::{Card, CardId};
use crate::compiler::AbilityCompiler;
use crate::effects::AbilityDefinition;

/// Registry of card definitions and their compiled abilities.
///
/// ## Example
///
/// ```
/// use rust_lorcana::cards::{Card, CardId, CardRegistry};
///
/// let mut registry = CardRegistry::new();
///
/// let hades = Card::character(CardId::new(1), "Hades", 7)
///     .with_version("King of Olympus")
///     .with_stats(6, 7, 2)
///     .with_ability("Evasive");
///
/// registry.register(hades);
///
/// let found = registry.get(CardId::new(1)).unwrap();
/// assert_eq!(found.name, "Hades");
/// assert_eq!(registry.abilities(CardId::new(1)).len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, Card>,
    abilities: FxHashMap<CardId, Vec<Arc<AbilityDefinition>>>,
    compiler: AbilityCompiler,
}

impl CardRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card, compiling its rules text.
    ///
    /// Registering an id twice replaces the earlier definition.
    pub fn register(&mut self, card: Card) -> CardId {
        let abilities = self.compiler.compile(&card);
        self.register_with_abilities(card, abilities)
    }

    /// Register a card with abilities built by hand instead of compiled.
    pub fn register_with_abilities(
        &mut self,
        card: Card,
        abilities: Vec<AbilityDefinition>,
    ) -> CardId {
        let id = card.id;
        if self.cards.contains_key(&id) {
            warn!(card = %id, "card registered twice, replacing definition");
        }
        debug!(
            card = %id,
            name = %card.full_name(),
            abilities = abilities.len(),
            "registered card"
        );
        self.abilities.insert(id, abilities.into_iter().map(Arc::new).collect());
        self.cards.insert(id, card);
        id
    }

    /// Register several cards.
    pub fn register_all(&mut self, cards: impl IntoIterator<Item = Card>) {
        for card in cards {
            self.register(card);
        }
    }

    /// Get a card definition by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Compiled abilities of a card, in printed order. Empty for unknown ids.
    #[must_use]
    pub fn abilities(&self, id: CardId) -> &[Arc<AbilityDefinition>] {
        self.abilities.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Check if a card ID is registered.
    #[must_use]
    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    /// Get the number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over all card definitions.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Find a card by base name or full "Name - Version" name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Card> {
        let mut matches: Vec<&Card> = self
            .cards
            .values()
            .filter(|c| {
                c.full_name().eq_ignore_ascii_case(name) || c.name.eq_ignore_ascii_case(name)
            })
            .collect();
        matches.sort_by_key(|c| c.id);
        matches.into_iter().next()
    }

    /// Find cards matching a predicate.
    pub fn find<F>(&self, predicate: F) -> impl Iterator<Item = &Card>
    where
        F: Fn(&Card) -> bool,
    {
        self.cards.values().filter(move |c| predicate(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardType;
    use crate::effects::KeywordKind;

    #[test]
    fn test_register_compiles_abilities() {
        let mut registry = CardRegistry::new();
        registry.register(
            Card::character(CardId::new(1), "Simba", 2)
                .with_version("Protective Cub")
                .with_stats(2, 3, 1)
                .with_ability("Bodyguard (This character may enter play exerted.)"),
        );

        let abilities = registry.abilities(CardId::new(1));
        assert_eq!(abilities.len(), 1);
        assert_eq!(abilities[0].as_keyword().map(|k| k.kind), Some(KeywordKind::Bodyguard));
    }

    #[test]
    fn test_unknown_card() {
        let registry = CardRegistry::new();
        assert!(registry.get(CardId::new(9)).is_none());
        assert!(registry.abilities(CardId::new(9)).is_empty());
    }

    #[test]
    fn test_find_by_name() {
        let mut registry = CardRegistry::new();
        registry.register(
            Card::character(CardId::new(2), "Mickey Mouse", 3)
                .with_version("True Friend"),
        );
        registry.register(Card::song(CardId::new(3), "Friends on the Other Side", 3));

        assert_eq!(
            registry
                .find_by_name("mickey mouse - true friend")
                .map(|c| c.id),
            Some(CardId::new(2))
        );
        assert_eq!(
            registry.find_by_name("Mickey Mouse").map(|c| c.id),
            Some(CardId::new(2))
        );
        assert_eq!(registry.find(|c| c.card_type == CardType::Song).count(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_with_abilities() {
        let mut registry = CardRegistry::new();
        let ability = AbilityDefinition::static_ability(vec![], "nothing");
        registry.register_with_abilities(
            Card::item(CardId::new(4), "Dinglehopper", 1),
            vec![ability],
        );
        assert_eq!(registry.abilities(CardId::new(4))[0].raw_text, "nothing");
    }
}
