//! Card definitions - static card data.
//!
//! `Card` holds the printed, immutable properties of a card: cost, ink
//! color, stats, classifications, and the raw rules text blocks the
//! ability compiler turns into abilities. Runtime data (damage, readiness,
//! zone) lives in [`CardInstance`](super::CardInstance).
//!
//! Cards deserialize from JSON with every optional field defaulted:
//!
//! ```
//! use rust_lorcana::cards::{Card, CardType};
//!
//! let card: Card = serde_json::from_str(r#"{
//!     "id": 1,
//!     "name": "Stitch",
//!     "version": "Rock Star",
//!     "cost": 6,
//!     "card_type": "Character",
//!     "strength": 3, "willpower": 5, "lore": 3,
//!     "abilities": [{ "text": "Shift 4" }]
//! }"#).unwrap();
//!
//! assert_eq!(card.card_type, CardType::Character);
//! assert_eq!(card.full_name(), "Stitch - Rock Star");
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier for a card definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Printed card type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Character,
    Action,
    /// An action that can be sung by exerting a character.
    Song,
    Item,
    Location,
}

impl CardType {
    /// Whether cards of this type stay in play after being played.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Character | Self::Item | Self::Location)
    }

    /// Actions and songs.
    #[must_use]
    pub const fn is_action(self) -> bool {
        matches!(self, Self::Action | Self::Song)
    }

    /// Word used for the card's self-reference in rules text.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Action | Self::Song => "action",
            Self::Item => "item",
            Self::Location => "location",
        }
    }
}

/// Ink color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InkColor {
    #[default]
    Amber,
    Amethyst,
    Emerald,
    Ruby,
    Sapphire,
    Steel,
}

/// Optional annotation on an ability block telling the compiler what kind
/// of ability it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityHint {
    Keyword,
    Triggered,
    Static,
    Activated,
}

/// One raw rules-text block as printed on the card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityText {
    /// Printed text.
    pub text: String,

    /// Ability kind, when the data source knows it.
    #[serde(default, rename = "type")]
    pub hint: Option<AbilityHint>,

    /// Keyword name for keyword blocks ("Shift", "Challenger").
    #[serde(default)]
    pub keyword: Option<String>,

    /// Keyword value ("Shift 5" -> 5).
    #[serde(default)]
    pub value: Option<i32>,
}

impl AbilityText {
    /// A block with text only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attach a kind hint (builder pattern).
    #[must_use]
    pub fn with_hint(mut self, hint: AbilityHint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Attach keyword metadata (builder pattern).
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>, value: Option<i32>) -> Self {
        self.keyword = Some(keyword.into());
        self.value = value;
        self.hint = Some(AbilityHint::Keyword);
        self
    }
}

impl From<&str> for AbilityText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Static card definition.
///
/// ```
/// use rust_lorcana::cards::{Card, CardId};
///
/// let card = Card::character(CardId::new(7), "Mickey Mouse", 3)
///     .with_version("True Friend")
///     .with_stats(3, 3, 2)
///     .with_ability("Evasive");
///
/// assert_eq!(card.willpower, 3);
/// assert_eq!(card.abilities.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier.
    pub id: CardId,

    /// Base name ("Mickey Mouse").
    pub name: String,

    /// Subtitle ("Brave Little Tailor").
    #[serde(default)]
    pub version: Option<String>,

    /// Ink cost.
    pub cost: u32,

    #[serde(default)]
    pub ink: InkColor,

    /// Whether the card can be put into the inkwell.
    #[serde(default = "default_inkable")]
    pub inkable: bool,

    pub card_type: CardType,

    /// Classifications such as Hero, Princess, Storyborn.
    #[serde(default)]
    pub classifications: Vec<String>,

    #[serde(default)]
    pub strength: i32,

    #[serde(default)]
    pub willpower: i32,

    #[serde(default)]
    pub lore: i32,

    /// Ink cost to move a character here (locations only).
    #[serde(default)]
    pub move_cost: Option<u32>,

    /// Raw rules-text blocks.
    #[serde(default)]
    pub abilities: Vec<AbilityText>,
}

fn default_inkable() -> bool {
    true
}

impl Card {
    /// Create a card definition.
    pub fn new(id: CardId, name: impl Into<String>, card_type: CardType, cost: u32) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            cost,
            ink: InkColor::default(),
            inkable: true,
            card_type,
            classifications: Vec::new(),
            strength: 0,
            willpower: 0,
            lore: 0,
            move_cost: None,
            abilities: Vec::new(),
        }
    }

    /// Character card.
    pub fn character(id: CardId, name: impl Into<String>, cost: u32) -> Self {
        Self::new(id, name, CardType::Character, cost)
    }

    /// Action card.
    pub fn action(id: CardId, name: impl Into<String>, cost: u32) -> Self {
        Self::new(id, name, CardType::Action, cost)
    }

    /// Song card.
    pub fn song(id: CardId, name: impl Into<String>, cost: u32) -> Self {
        Self::new(id, name, CardType::Song, cost)
    }

    /// Item card.
    pub fn item(id: CardId, name: impl Into<String>, cost: u32) -> Self {
        Self::new(id, name, CardType::Item, cost)
    }

    /// Location card.
    pub fn location(id: CardId, name: impl Into<String>, cost: u32) -> Self {
        Self::new(id, name, CardType::Location, cost)
    }

    /// Set the subtitle (builder pattern).
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set strength, willpower and lore (builder pattern).
    #[must_use]
    pub fn with_stats(mut self, strength: i32, willpower: i32, lore: i32) -> Self {
        self.strength = strength;
        self.willpower = willpower;
        self.lore = lore;
        self
    }

    /// Add a classification (builder pattern).
    #[must_use]
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classifications.push(classification.into());
        self
    }

    /// Add a rules-text block (builder pattern).
    #[must_use]
    pub fn with_ability(mut self, text: impl Into<AbilityText>) -> Self {
        self.abilities.push(text.into());
        self
    }

    /// Set the ink color (builder pattern).
    #[must_use]
    pub fn with_ink(mut self, ink: InkColor) -> Self {
        self.ink = ink;
        self
    }

    /// Mark the card as not inkable (builder pattern).
    #[must_use]
    pub fn uninkable(mut self) -> Self {
        self.inkable = false;
        self
    }

    /// Set a location's move cost (builder pattern).
    #[must_use]
    pub fn with_move_cost(mut self, cost: u32) -> Self {
        self.move_cost = Some(cost);
        self
    }

    /// "Name - Version", or just the name.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{} - {}", self.name, version),
            None => self.name.clone(),
        }
    }

    /// Case-insensitive classification check.
    #[must_use]
    pub fn has_classification(&self, classification: &str) -> bool {
        self.classifications
            .iter()
            .any(|c| c.eq_ignore_ascii_case(classification))
    }
}
