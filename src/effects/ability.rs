//! Compiled abilities.
//!
//! The ability compiler produces one `AbilityDefinition` per recognized
//! rules-text block. Definitions are immutable once compiled and shared by
//! every instance of the card.
//!
//! ## Kinds
//!
//! - `Keyword`: a named keyword with an optional value ("Challenger +2")
//! - `Static`: continuous effects while the card is in play; for actions
//!   and songs, the effects that run once when the card is played
//! - `Triggered`: effects run when a matching event happens
//! - `Activated`: effects run when the controller pays the costs

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::effect::Effect;
use crate::triggers::{Condition, EventKind, TriggerFilter};

/// Keyword abilities the rules engine knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeywordKind {
    /// Alert: may challenge characters with Evasive.
    Alert,
    /// May enter play exerted; must be challenged first when able.
    Bodyguard,
    /// Deals +N damage while challenging.
    Challenger,
    /// Can only be challenged by Evasive (or Alert) characters.
    Evasive,
    /// Can't quest; must challenge each turn if able.
    Reckless,
    /// Damage dealt to this is reduced by N.
    Resist,
    /// Can challenge the turn it is played.
    Rush,
    /// May be played for N ink on top of a same-named character.
    Shift,
    /// Counts as cost N for singing songs.
    Singer,
    /// Song may be sung by characters with total cost N or more.
    SingTogether,
    /// When questing, may add strength to another character this turn.
    Support,
    /// Opponents can't choose this except to challenge.
    Ward,
    /// Banished when an opponent chooses it for an action.
    Vanish,
}

impl KeywordKind {
    /// Every keyword, in lookup order.
    pub const ALL: [KeywordKind; 13] = [
        Self::Alert,
        Self::Bodyguard,
        Self::Challenger,
        Self::Evasive,
        Self::Reckless,
        Self::Resist,
        Self::Rush,
        Self::Shift,
        Self::Singer,
        Self::SingTogether,
        Self::Support,
        Self::Ward,
        Self::Vanish,
    ];

    /// Printed keyword name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Alert => "Alert",
            Self::Bodyguard => "Bodyguard",
            Self::Challenger => "Challenger",
            Self::Evasive => "Evasive",
            Self::Reckless => "Reckless",
            Self::Resist => "Resist",
            Self::Rush => "Rush",
            Self::Shift => "Shift",
            Self::Singer => "Singer",
            Self::SingTogether => "Sing Together",
            Self::Support => "Support",
            Self::Ward => "Ward",
            Self::Vanish => "Vanish",
        }
    }

    /// Whether the keyword carries a number.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        matches!(
            self,
            Self::Challenger | Self::Resist | Self::Shift | Self::Singer | Self::SingTogether
        )
    }

    /// Values of these keywords print with a leading '+'.
    #[must_use]
    pub const fn signed_value(self) -> bool {
        matches!(self, Self::Challenger | Self::Resist)
    }

    /// Case-insensitive lookup by printed name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

/// A keyword with its value (0 for keywords without one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub kind: KeywordKind,
    pub value: i32,
}

impl Keyword {
    /// Keyword without a value.
    #[must_use]
    pub const fn new(kind: KeywordKind) -> Self {
        Self { kind, value: 0 }
    }

    /// Keyword with a value ("Resist +2").
    #[must_use]
    pub const fn with_value(kind: KeywordKind, value: i32) -> Self {
        Self { kind, value }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind.signed_value() {
            write!(f, "{} +{}", self.kind.name(), self.value)
        } else if self.kind.takes_value() {
            write!(f, "{} {}", self.kind.name(), self.value)
        } else {
            f.write_str(self.kind.name())
        }
    }
}

/// A cost paid to activate an ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cost {
    /// Exert the card ({E}).
    Exert,
    /// Pay N ink.
    Ink(u32),
    /// Banish the card itself.
    BanishSelf,
    /// Choose and discard N cards.
    Discard(u32),
}

/// What kind of ability a definition is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    Keyword(Keyword),
    Static,
    Triggered { event: EventKind, filter: TriggerFilter },
    Activated { costs: SmallVec<[Cost; 2]> },
}

/// A compiled ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub kind: AbilityKind,

    /// Printed ability name ("DRAGON FIRE"), when present.
    pub name: Option<String>,

    /// Gate checked when a trigger fires, and continuously for statics.
    pub condition: Condition,

    /// Effects in resolution order.
    pub effects: Vec<Effect>,

    /// Normalized rules text this ability was compiled from.
    pub raw_text: String,
}

impl AbilityDefinition {
    /// Create an ability with no effects.
    pub fn new(kind: AbilityKind, raw_text: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            condition: Condition::Always,
            effects: Vec::new(),
            raw_text: raw_text.into(),
        }
    }

    /// Keyword ability.
    pub fn keyword(keyword: Keyword, raw_text: impl Into<String>) -> Self {
        Self::new(AbilityKind::Keyword(keyword), raw_text)
    }

    /// Static ability.
    pub fn static_ability(effects: Vec<Effect>, raw_text: impl Into<String>) -> Self {
        Self::new(AbilityKind::Static, raw_text).with_effects(effects)
    }

    /// Triggered ability.
    pub fn triggered(event: EventKind, filter: TriggerFilter, raw_text: impl Into<String>) -> Self {
        Self::new(AbilityKind::Triggered { event, filter }, raw_text)
    }

    /// Activated ability.
    pub fn activated(costs: impl IntoIterator<Item = Cost>, raw_text: impl Into<String>) -> Self {
        Self::new(
            AbilityKind::Activated {
                costs: costs.into_iter().collect(),
            },
            raw_text,
        )
    }

    /// Set the ability name (builder pattern).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Replace the effect list (builder pattern).
    #[must_use]
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    /// Append an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// The keyword, for keyword abilities.
    #[must_use]
    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.kind {
            AbilityKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.kind, AbilityKind::Static)
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self.kind, AbilityKind::Triggered { .. })
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self.kind, AbilityKind::Activated { .. })
    }
}
