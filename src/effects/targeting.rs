//! Effect targeting.
//!
//! - `Target`: which cards an effect touches
//! - `TargetFilter`: card-type, ownership, stat and status constraints
//! - `TargetCount`: how many cards a choice may select
//! - `TargetSelector`: enumerates legal candidates for a filter against a
//!   game state and validates selections
//!
//! Filters are relative to a controller: `Ownership::Yours` means cards the
//! ability's controller owns.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::ability::KeywordKind;
use crate::cards::{CardInstance, CardRegistry, CardType};
use crate::core::{GameState, InstanceId, PlayerId};
use crate::zones::{Zone, ZoneKey};

/// Whose cards a filter admits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    #[default]
    Any,
    Yours,
    Opposing,
}

/// Readiness / damage status constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Exerted,
    Ready,
    Damaged,
    Undamaged,
    AtLocation,
}

/// Comparison operator for numeric filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    AtMost,
    AtLeast,
    Exactly,
}

/// "cost 3 or less", "5 {S} or more".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    pub op: CompareOp,
    pub value: i32,
}

impl Comparison {
    #[must_use]
    pub const fn at_most(value: i32) -> Self {
        Self {
            op: CompareOp::AtMost,
            value,
        }
    }

    #[must_use]
    pub const fn at_least(value: i32) -> Self {
        Self {
            op: CompareOp::AtLeast,
            value,
        }
    }

    #[must_use]
    pub const fn exactly(value: i32) -> Self {
        Self {
            op: CompareOp::Exactly,
            value,
        }
    }

    /// Test a value.
    #[must_use]
    pub fn test(&self, actual: i32) -> bool {
        match self.op {
            CompareOp::AtMost => actual <= self.value,
            CompareOp::AtLeast => actual >= self.value,
            CompareOp::Exactly => actual == self.value,
        }
    }
}

/// Constraints on candidate cards. An empty filter admits every card in
/// play.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetFilter {
    /// Admitted card types; empty admits all. `Action` also admits songs.
    pub card_types: SmallVec<[CardType; 2]>,
    pub ownership: Ownership,
    pub classification: Option<String>,
    /// Base card name ("named Mickey Mouse").
    pub name: Option<String>,
    pub cost: Option<Comparison>,
    pub strength: Option<Comparison>,
    pub willpower: Option<Comparison>,
    pub status: Option<Status>,
    pub keyword: Option<KeywordKind>,
    /// "other" / "another": excludes the ability's source.
    pub exclude_self: bool,
    /// "here": only characters at the source location.
    pub at_source_location: bool,
    /// Zone searched; `None` means play.
    pub zone: Option<Zone>,
}

impl TargetFilter {
    /// Filter admitting every card in play.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Characters in play.
    #[must_use]
    pub fn characters() -> Self {
        Self::of_type(CardType::Character)
    }

    /// Cards of one type.
    #[must_use]
    pub fn of_type(card_type: CardType) -> Self {
        let mut filter = Self::default();
        filter.card_types.push(card_type);
        filter
    }

    /// Add an admitted type (builder pattern).
    #[must_use]
    pub fn or_type(mut self, card_type: CardType) -> Self {
        if !self.card_types.contains(&card_type) {
            self.card_types.push(card_type);
        }
        self
    }

    #[must_use]
    pub fn yours(mut self) -> Self {
        self.ownership = Ownership::Yours;
        self
    }

    #[must_use]
    pub fn opposing(mut self) -> Self {
        self.ownership = Ownership::Opposing;
        self
    }

    #[must_use]
    pub fn other(mut self) -> Self {
        self.exclude_self = true;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_cost(mut self, comparison: Comparison) -> Self {
        self.cost = Some(comparison);
        self
    }

    #[must_use]
    pub fn with_strength(mut self, comparison: Comparison) -> Self {
        self.strength = Some(comparison);
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: KeywordKind) -> Self {
        self.keyword = Some(keyword);
        self
    }

    #[must_use]
    pub fn in_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    #[must_use]
    pub fn here(mut self) -> Self {
        self.at_source_location = true;
        self
    }

    /// Zone this filter searches.
    #[must_use]
    pub fn search_zone(&self) -> Zone {
        self.zone.unwrap_or(Zone::Play)
    }

    /// Whether the filter admits a card type.
    #[must_use]
    pub fn admits_type(&self, card_type: CardType) -> bool {
        self.card_types.is_empty()
            || self.card_types.contains(&card_type)
            || (card_type == CardType::Song && self.card_types.contains(&CardType::Action))
    }

    /// Check a card's printed and derived properties, ignoring its zone.
    ///
    /// Trigger filters use this directly so a card that just left play can
    /// still match "one of your characters is banished".
    #[must_use]
    pub fn matches_traits(&self, ctx: &FilterContext<'_>, instance: &CardInstance) -> bool {
        let Some(card) = ctx.cards.get(instance.card) else {
            return false;
        };

        if !self.admits_type(card.card_type) {
            return false;
        }
        match self.ownership {
            Ownership::Any => {}
            Ownership::Yours if instance.owner != ctx.controller => return false,
            Ownership::Opposing if instance.owner == ctx.controller => return false,
            _ => {}
        }
        if self.exclude_self && ctx.source == Some(instance.id) {
            return false;
        }
        if let Some(classification) = &self.classification {
            if !card.has_classification(classification) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if !card.name.eq_ignore_ascii_case(name)
                && !card.full_name().eq_ignore_ascii_case(name)
            {
                return false;
            }
        }
        if let Some(cost) = &self.cost {
            if !cost.test(card.cost as i32) {
                return false;
            }
        }
        if let Some(strength) = &self.strength {
            if !strength.test(instance.strength()) {
                return false;
            }
        }
        if let Some(willpower) = &self.willpower {
            if !willpower.test(instance.willpower()) {
                return false;
            }
        }
        if let Some(keyword) = self.keyword {
            if !instance.has_keyword(keyword) {
                return false;
            }
        }
        if let Some(status) = self.status {
            let ok = match status {
                Status::Exerted => instance.exerted,
                Status::Ready => !instance.exerted,
                Status::Damaged => instance.damage > 0,
                Status::Undamaged => instance.damage == 0,
                Status::AtLocation => instance.location.is_some(),
            };
            if !ok {
                return false;
            }
        }
        if self.at_source_location {
            match ctx.source {
                Some(source) if instance.location == Some(source) => {}
                _ => return false,
            }
        }
        true
    }

    /// Full check including the searched zone.
    #[must_use]
    pub fn matches(&self, ctx: &FilterContext<'_>, id: InstanceId) -> bool {
        ctx.state.instance(id).is_some_and(|instance| {
            instance.zone == self.search_zone() && self.matches_traits(ctx, instance)
        })
    }
}

/// How many cards a choice selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetCount {
    /// Exactly N, or every candidate if fewer exist.
    Exactly(u32),
    /// Zero to N.
    UpTo(u32),
    /// Any number of candidates.
    Any,
}

impl TargetCount {
    /// (min, max) selection bounds given the number of candidates.
    #[must_use]
    pub fn bounds(self, available: usize) -> (usize, usize) {
        match self {
            Self::Exactly(n) => {
                let n = (n as usize).min(available);
                (n, n)
            }
            Self::UpTo(n) => (0, (n as usize).min(available)),
            Self::Any => (0, available),
        }
    }
}

/// Which cards an effect touches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// The ability's source card.
    This,
    /// Cards the chooser picks.
    Chosen { filter: TargetFilter, count: TargetCount },
    /// Every matching card, evaluated at resolution.
    All(TargetFilter),
    /// The controller's cards in play with this name.
    Named(String),
    /// The card the triggering event is about.
    Triggering,
    /// The cards the previous effect of the same ability resolved to
    /// ("them", "that character").
    Previous,
}

impl Target {
    /// One chosen card.
    #[must_use]
    pub fn chosen(filter: TargetFilter) -> Self {
        Self::Chosen {
            filter,
            count: TargetCount::Exactly(1),
        }
    }

    /// One chosen opposing card.
    #[must_use]
    pub fn opposing(filter: TargetFilter) -> Self {
        Self::chosen(filter.opposing())
    }

    /// Up to N chosen cards.
    #[must_use]
    pub fn up_to(n: u32, filter: TargetFilter) -> Self {
        Self::Chosen {
            filter,
            count: TargetCount::UpTo(n),
        }
    }

    /// Whether resolving this target asks a player.
    #[must_use]
    pub fn needs_choice(&self) -> bool {
        matches!(self, Self::Chosen { .. })
    }
}

/// Read-only context for filter evaluation.
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    pub state: &'a GameState,
    pub cards: &'a CardRegistry,
    /// Player the filter is relative to.
    pub controller: PlayerId,
    /// Ability source, for "other" and "here".
    pub source: Option<InstanceId>,
}

impl<'a> FilterContext<'a> {
    #[must_use]
    pub fn new(state: &'a GameState, cards: &'a CardRegistry, controller: PlayerId) -> Self {
        Self {
            state,
            cards,
            controller,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<InstanceId>) -> Self {
        self.source = source;
        self
    }
}

/// Enumerates and validates candidates for a filter.
#[derive(Clone, Debug)]
pub struct TargetSelector<'f> {
    filter: &'f TargetFilter,
    count: TargetCount,
    /// Player making the choice; Ward hides opposing cards from them.
    chooser: Option<PlayerId>,
}

impl<'f> TargetSelector<'f> {
    /// Selector for a filter.
    #[must_use]
    pub fn new(filter: &'f TargetFilter, count: TargetCount) -> Self {
        Self {
            filter,
            count,
            chooser: None,
        }
    }

    /// Apply Ward for choices made by this player (builder pattern).
    #[must_use]
    pub fn chosen_by(mut self, chooser: PlayerId) -> Self {
        self.chooser = Some(chooser);
        self
    }

    /// Every legal candidate, controller's cards first, in zone order.
    #[must_use]
    pub fn valid_targets(&self, ctx: &FilterContext<'_>) -> Vec<InstanceId> {
        let zone = self.filter.search_zone();
        let owners: SmallVec<[PlayerId; 2]> = match self.filter.ownership {
            Ownership::Yours => smallvec::smallvec![ctx.controller],
            Ownership::Opposing => smallvec::smallvec![ctx.controller.opponent()],
            Ownership::Any => smallvec::smallvec![ctx.controller, ctx.controller.opponent()],
        };

        let mut targets = Vec::new();
        for owner in owners {
            for id in ctx.state.zones.cards_in(ZoneKey::new(owner, zone)) {
                let Some(instance) = ctx.state.instance(id) else {
                    continue;
                };
                if !self.filter.matches_traits(ctx, instance) {
                    continue;
                }
                if let Some(chooser) = self.chooser {
                    if instance.owner != chooser && instance.has_keyword(KeywordKind::Ward) {
                        continue;
                    }
                }
                targets.push(id);
            }
        }
        targets
    }

    /// Whether at least one selection is possible.
    #[must_use]
    pub fn has_targets(&self, ctx: &FilterContext<'_>) -> bool {
        !self.valid_targets(ctx).is_empty()
    }

    /// Validate a selection against the count bounds and candidates.
    #[must_use]
    pub fn validate_selection(&self, ctx: &FilterContext<'_>, selected: &[InstanceId]) -> bool {
        let valid = self.valid_targets(ctx);
        let (min, max) = self.count.bounds(valid.len());
        let mut unique = selected.to_vec();
        unique.sort_unstable();
        unique.dedup();
        unique.len() == selected.len()
            && (min..=max).contains(&selected.len())
            && selected.iter().all(|s| valid.contains(s))
    }
}
