//! Effect definitions.
//!
//! An `Effect` is one node of a compiled ability: an `EffectKind` plus the
//! `optional` flag ("you may ...") and the `chooser` who answers the
//! optional prompt and picks targets.
//!
//! ## Card Movement
//!
//! `Draw`, `DrawUntil`, `Discard`, `DiscardHand`, `Banish`, `ReturnToHand`,
//! `PutIntoInkwell`, `InkFromDeck`, `ShuffleIntoDeck`, `PutOnBottom`,
//! `LookAtTop`, `Mill`, `ReturnFromDiscard`, `PlayForFree`, `Tutor`
//!
//! ## Stats, Keywords, Restrictions
//!
//! `ModifyStats`, `GrantKeyword`, `Restrict`, `CostReduction`,
//! `PreventDamage`. Each carries a [`Duration`]; inside static abilities the
//! duration is `WhileActive`.
//!
//! ## Damage, Readiness, Lore
//!
//! `DealDamage`, `RemoveDamage`, `MoveDamage`, `DistributeDamage`, `Exert`,
//! `Ready`, `GainLore`, `LoseLore`
//!
//! ## Control Flow
//!
//! - `Sequence`: children run in order ("then")
//! - `Conditional`: children run only if the condition holds
//! - `ConditionalAction`: exactly one of `base` / `replacement` runs
//!   ("... instead")
//! - `ForEach`: children repeat once per counted object
//! - `Modal`: the chooser picks one option ("Choose one:")
//!
//! `Unrecognized` keeps text the compiler classified but could not model.

use serde::{Deserialize, Serialize};

use super::ability::Keyword;
use super::targeting::{Target, TargetCount, TargetFilter};
use crate::triggers::Condition;

/// Character stats a modifier can change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Strength,
    Willpower,
    Lore,
}

impl Stat {
    /// Canonical symbol token.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Strength => "{S}",
            Self::Willpower => "{W}",
            Self::Lore => "{L}",
        }
    }
}

/// How long a modifier lasts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duration {
    /// While the source is in play (and its condition holds).
    #[default]
    WhileActive,
    /// Until the End phase of the current turn completes.
    ThisTurn,
    /// Until the Ready step of the controller's next turn.
    UntilStartOfYourNextTurn,
    /// Until the end of the affected card owner's next turn.
    DuringTheirNextTurn,
}

/// Things a card can be prevented from doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Restriction {
    CantQuest,
    CantChallenge,
    CantBeChallenged,
    CantReady,
    CantSing,
    CantMove,
}

impl Restriction {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CantQuest => "can't quest",
            Self::CantChallenge => "can't challenge",
            Self::CantBeChallenged => "can't be challenged",
            Self::CantReady => "can't ready",
            Self::CantSing => "can't sing songs",
            Self::CantMove => "can't move",
        }
    }
}

/// Which player answers prompts for an effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chooser {
    /// The ability's controller.
    #[default]
    Controller,
    /// The controller's opponent ("each opponent chooses ...").
    Opponent,
}

/// Players an effect applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerTarget {
    You,
    Opponent,
    EachPlayer,
    /// The player named by the triggering event.
    Triggering,
}

/// Numbers that are evaluated when the effect resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Count {
    /// Cards in play matching a filter, relative to the controller.
    InPlay(TargetFilter),
    /// Cards in a player's hand.
    CardsInHand(PlayerTarget),
    /// Cards in a player's discard matching a filter.
    CardsInDiscard(PlayerTarget, TargetFilter),
    /// Damage on the source card.
    DamageOnSource,
    /// Cards in a player's inkwell.
    InkwellSize(PlayerTarget),
}

/// An effect's magnitude.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    /// Exactly N.
    Fixed(i32),
    /// Any number from 0 to N, chosen on resolution.
    UpTo(i32),
    /// N for each counted object.
    ForEach { per: i32, count: Box<Count> },
    /// A stat of a resolved card ("equal to their {S}").
    StatOf { target: Box<Target>, stat: Stat },
    /// Everything available ("remove all damage").
    All,
}

impl Amount {
    /// Fixed amount helper.
    #[must_use]
    pub const fn fixed(n: i32) -> Self {
        Self::Fixed(n)
    }

    /// "N for each ..." helper.
    #[must_use]
    pub fn for_each(per: i32, count: Count) -> Self {
        Self::ForEach {
            per,
            count: Box::new(count),
        }
    }
}

/// Where a looked-at card can go.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookDestination {
    Hand,
    TopOfDeck,
    BottomOfDeck,
    Discard,
    Inkwell,
}

/// What to do with the cards seen by `LookAtTop`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookPlan {
    /// Cards that may be picked; `None` allows any card.
    pub filter: Option<TargetFilter>,
    /// How many to pick.
    pub take: TargetCount,
    /// Where picked cards go.
    pub to: LookDestination,
    /// Where everything else goes.
    pub rest: LookDestination,
}

/// The kind of an effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    // === Card movement ===
    Draw { who: PlayerTarget, amount: Amount },
    DrawUntil { who: PlayerTarget, hand_size: u32 },
    Discard { who: PlayerTarget, amount: Amount, random: bool },
    DiscardHand { who: PlayerTarget },
    Banish { target: Target },
    ReturnToHand { target: Target },
    PutIntoInkwell { target: Target, exerted: bool },
    InkFromDeck { who: PlayerTarget, exerted: bool },
    ShuffleIntoDeck { target: Target },
    PutOnBottom { target: Target },
    LookAtTop { who: PlayerTarget, count: u32, plan: LookPlan },
    Mill { who: PlayerTarget, amount: Amount },
    ReturnFromDiscard { filter: TargetFilter, count: TargetCount },
    PlayForFree { filter: TargetFilter },
    Tutor { filter: TargetFilter },

    // === Stats, keywords, restrictions ===
    ModifyStats { target: Target, stat: Stat, amount: Amount, duration: Duration },
    GrantKeyword { target: Target, keyword: Keyword, duration: Duration },
    Restrict { target: Target, restriction: Restriction, duration: Duration },
    /// "You pay N {I} less for the next X you play this turn" (`next_only`)
    /// or "You pay N {I} less to play X" (static).
    CostReduction { amount: i32, filter: TargetFilter, duration: Duration, next_only: bool },
    /// "takes no damage from challenges"
    PreventDamage { target: Target, duration: Duration },

    // === Readiness ===
    Exert { target: Target },
    Ready { target: Target },

    // === Damage ===
    DealDamage { target: Target, amount: Amount },
    RemoveDamage { target: Target, amount: Amount },
    MoveDamage { from: Target, to: Target, amount: Amount },
    /// N points of damage, each assigned to a chosen card.
    DistributeDamage { amount: u32, filter: TargetFilter },

    // === Lore ===
    GainLore { who: PlayerTarget, amount: Amount },
    LoseLore { who: PlayerTarget, amount: Amount },

    // === Control flow ===
    Sequence(Vec<Effect>),
    Conditional { condition: Condition, then: Vec<Effect> },
    ConditionalAction { condition: Condition, base: Vec<Effect>, replacement: Vec<Effect> },
    ForEach { count: Count, effects: Vec<Effect> },
    Modal { options: Vec<Vec<Effect>> },

    /// Classified but not modelled.
    Unrecognized(String),
}

impl EffectKind {
    /// Stable name for logs and fizzle records.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::DrawUntil { .. } => "draw_until",
            Self::Discard { .. } => "discard",
            Self::DiscardHand { .. } => "discard_hand",
            Self::Banish { .. } => "banish",
            Self::ReturnToHand { .. } => "return_to_hand",
            Self::PutIntoInkwell { .. } => "put_into_inkwell",
            Self::InkFromDeck { .. } => "ink_from_deck",
            Self::ShuffleIntoDeck { .. } => "shuffle_into_deck",
            Self::PutOnBottom { .. } => "put_on_bottom",
            Self::LookAtTop { .. } => "look_at_top",
            Self::Mill { .. } => "mill",
            Self::ReturnFromDiscard { .. } => "return_from_discard",
            Self::PlayForFree { .. } => "play_for_free",
            Self::Tutor { .. } => "tutor",
            Self::ModifyStats { .. } => "modify_stats",
            Self::GrantKeyword { .. } => "grant_keyword",
            Self::Restrict { .. } => "restriction",
            Self::CostReduction { .. } => "cost_reduction",
            Self::PreventDamage { .. } => "prevent_damage",
            Self::Exert { .. } => "exert",
            Self::Ready { .. } => "ready",
            Self::DealDamage { .. } => "damage",
            Self::RemoveDamage { .. } => "heal",
            Self::MoveDamage { .. } => "move_damage",
            Self::DistributeDamage { .. } => "distribute_damage",
            Self::GainLore { .. } => "gain_lore",
            Self::LoseLore { .. } => "lose_lore",
            Self::Sequence(_) => "sequence",
            Self::Conditional { .. } => "conditional",
            Self::ConditionalAction { .. } => "conditional_action",
            Self::ForEach { .. } => "for_each",
            Self::Modal { .. } => "modal",
            Self::Unrecognized(_) => "unrecognized",
        }
    }

    /// The card target of single-target kinds.
    #[must_use]
    pub fn target(&self) -> Option<&Target> {
        match self {
            Self::Banish { target }
            | Self::ReturnToHand { target }
            | Self::PutIntoInkwell { target, .. }
            | Self::ShuffleIntoDeck { target }
            | Self::PutOnBottom { target }
            | Self::ModifyStats { target, .. }
            | Self::GrantKeyword { target, .. }
            | Self::Restrict { target, .. }
            | Self::PreventDamage { target, .. }
            | Self::Exert { target }
            | Self::Ready { target }
            | Self::DealDamage { target, .. }
            | Self::RemoveDamage { target, .. } => Some(target),
            Self::MoveDamage { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Whether this kind only groups other effects.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Self::Sequence(_)
                | Self::Conditional { .. }
                | Self::ConditionalAction { .. }
                | Self::ForEach { .. }
                | Self::Modal { .. }
        )
    }
}

/// One node of a compiled ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,

    /// "You may ..." effects ask the chooser first.
    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub chooser: Chooser,
}

impl Effect {
    /// Wrap a kind with default flags.
    #[must_use]
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            optional: false,
            chooser: Chooser::Controller,
        }
    }

    /// Mark as optional (builder pattern).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set who answers prompts (builder pattern).
    #[must_use]
    pub fn chosen_by(mut self, chooser: Chooser) -> Self {
        self.chooser = chooser;
        self
    }

    // === Helper constructors ===

    /// Controller draws N.
    #[must_use]
    pub fn draw(n: i32) -> Self {
        Self::new(EffectKind::Draw {
            who: PlayerTarget::You,
            amount: Amount::Fixed(n),
        })
    }

    /// Controller chooses and discards N.
    #[must_use]
    pub fn discard(n: i32) -> Self {
        Self::new(EffectKind::Discard {
            who: PlayerTarget::You,
            amount: Amount::Fixed(n),
            random: false,
        })
    }

    /// Deal N damage.
    #[must_use]
    pub fn damage(target: Target, n: i32) -> Self {
        Self::new(EffectKind::DealDamage {
            target,
            amount: Amount::Fixed(n),
        })
    }

    /// Banish a target.
    #[must_use]
    pub fn banish(target: Target) -> Self {
        Self::new(EffectKind::Banish { target })
    }

    /// Controller gains N lore.
    #[must_use]
    pub fn gain_lore(n: i32) -> Self {
        Self::new(EffectKind::GainLore {
            who: PlayerTarget::You,
            amount: Amount::Fixed(n),
        })
    }

    /// Stat modifier.
    #[must_use]
    pub fn modify(target: Target, stat: Stat, amount: i32, duration: Duration) -> Self {
        Self::new(EffectKind::ModifyStats {
            target,
            stat,
            amount: Amount::Fixed(amount),
            duration,
        })
    }

    /// Ordered group.
    #[must_use]
    pub fn sequence(effects: Vec<Effect>) -> Self {
        Self::new(EffectKind::Sequence(effects))
    }

    /// Number of nodes in this effect tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Effect::node_count).sum::<usize>()
    }

    /// Direct children of compound kinds.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Effect> + '_> {
        match &self.kind {
            EffectKind::Sequence(effects)
            | EffectKind::Conditional { then: effects, .. }
            | EffectKind::ForEach { effects, .. } => Box::new(effects.iter()),
            EffectKind::ConditionalAction { base, replacement, .. } => {
                Box::new(base.iter().chain(replacement.iter()))
            }
            EffectKind::Modal { options } => Box::new(options.iter().flatten()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Whether any node in the tree is `Unrecognized`.
    #[must_use]
    pub fn has_unrecognized(&self) -> bool {
        matches!(self.kind, EffectKind::Unrecognized(_))
            || self.children().any(Effect::has_unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        let effect = Effect::draw(2).optional();
        assert!(effect.optional);
        assert_eq!(effect.kind.name(), "draw");
        assert!(matches!(
            effect.kind,
            EffectKind::Draw { who: PlayerTarget::You, amount: Amount::Fixed(2) }
        ));
    }

    #[test]
    fn test_target_accessor() {
        let effect = Effect::damage(Target::This, 2);
        assert_eq!(effect.kind.target(), Some(&Target::This));
        assert_eq!(Effect::draw(1).kind.target(), None);
    }

    #[test]
    fn test_node_count_and_unrecognized() {
        let effect = Effect::sequence(vec![
            Effect::draw(1),
            Effect::new(EffectKind::Unrecognized("sing a little song".into())),
        ]);
        assert_eq!(effect.node_count(), 3);
        assert!(effect.kind.is_compound());
        assert!(effect.has_unrecognized());
        assert!(!Effect::draw(1).has_unrecognized());
    }

    #[test]
    fn test_effect_serialization() {
        let effect = Effect::new(EffectKind::ConditionalAction {
            condition: Condition::DuringYourTurn,
            base: vec![Effect::damage(Target::This, 2)],
            replacement: vec![Effect::damage(Target::This, 4)],
        });
        let json = serde_json::to_string(&effect).unwrap();
        let back: Effect = serde_json::from_str(&json).unwrap();
        assert_eq!(effect, back);
    }
}
