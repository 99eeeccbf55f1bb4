//! Card-specific rules for wording the generic tables do not cover.
//!
//! Looked up by full card name before any generic rule runs. Each builder
//! still checks the text it expects, so a reprint with different wording
//! falls through to the generic path.

use crate::cards::Card;
use crate::effects::{
    AbilityDefinition, Amount, Chooser, Cost, Effect, EffectKind, LookDestination, LookPlan,
    PlayerTarget, Target, TargetCount, TargetFilter,
};
use crate::triggers::{EventKind, TriggerFilter};

/// One card's override.
#[derive(Clone, Copy, Debug)]
pub struct NamedRule {
    pub card: &'static str,
    pub rule: &'static str,
    pub build: fn(&str) -> Option<Vec<AbilityDefinition>>,
}

pub static NAMED_RULES: &[NamedRule] = &[
    NamedRule {
        card: "A Whole New World",
        rule: "named:a_whole_new_world",
        build: |text| {
            expect(text, "each player discards their hand and draws 7 cards")?;
            Some(vec![AbilityDefinition::static_ability(
                vec![
                    Effect::new(EffectKind::DiscardHand {
                        who: PlayerTarget::EachPlayer,
                    }),
                    Effect::new(EffectKind::Draw {
                        who: PlayerTarget::EachPlayer,
                        amount: Amount::Fixed(7),
                    }),
                ],
                "",
            )])
        },
    },
    NamedRule {
        card: "Develop Your Brain",
        rule: "named:develop_your_brain",
        build: |text| {
            expect(
                text,
                "look at the top 2 cards of your deck. put one into your hand and the other on the bottom of the deck",
            )?;
            Some(vec![AbilityDefinition::static_ability(
                vec![look(2, LookDestination::Hand, LookDestination::BottomOfDeck)],
                "",
            )])
        },
    },
    NamedRule {
        card: "Ursula's Cauldron",
        rule: "named:ursulas_cauldron",
        build: |text| {
            expect(
                text,
                "{E} — look at the top 2 cards of your deck. put one on the top of your deck and the other on the bottom",
            )?;
            Some(vec![AbilityDefinition::activated([Cost::Exert], "").with_effect(look(
                2,
                LookDestination::TopOfDeck,
                LookDestination::BottomOfDeck,
            ))])
        },
    },
    NamedRule {
        card: "Lady Tremaine - Imperious Queen",
        rule: "named:lady_tremaine_imperious_queen",
        build: |text| {
            expect(
                text,
                "when you play this character, each opponent chooses and banishes one of their characters",
            )?;
            let banish = Effect::banish(Target::Chosen {
                filter: TargetFilter::characters().opposing(),
                count: TargetCount::Exactly(1),
            })
            .chosen_by(Chooser::Opponent);
            let ability = AbilityDefinition::triggered(
                EventKind::CardPlayed,
                TriggerFilter::SubjectIsSelf,
                "",
            );
            Some(vec![ability.with_effect(banish)])
        },
    },
];

fn expect(text: &str, wanted: &str) -> Option<()> {
    text.trim()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(wanted)
        .then_some(())
}

fn look(count: u32, to: LookDestination, rest: LookDestination) -> Effect {
    Effect::new(EffectKind::LookAtTop {
        who: PlayerTarget::You,
        count,
        plan: LookPlan {
            filter: None,
            take: TargetCount::Exactly(1),
            to,
            rest,
        },
    })
}

/// Card-specific abilities for this text, if a rule claims it.
#[must_use]
pub fn lookup(card: &Card, text: &str) -> Option<(&'static str, Vec<AbilityDefinition>)> {
    let name = card.full_name();
    NAMED_RULES
        .iter()
        .filter(|rule| rule.card.eq_ignore_ascii_case(&name))
        .find_map(|rule| (rule.build)(text).map(|abilities| (rule.rule, abilities)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;

    #[test]
    fn test_named_rule_claims_matching_text() {
        let card = Card::song(CardId::new(1), "A Whole New World", 5);
        let text = "Each player discards their hand and draws 7 cards.";
        let (rule, abilities) = lookup(&card, text).unwrap();
        assert_eq!(rule, "named:a_whole_new_world");
        assert_eq!(abilities[0].effects.len(), 2);
    }

    #[test]
    fn test_named_rule_checks_text() {
        let card = Card::song(CardId::new(1), "A Whole New World", 5);
        assert!(lookup(&card, "Draw a card.").is_none());
    }

    #[test]
    fn test_other_cards_fall_through() {
        let card = Card::action(CardId::new(2), "Dragon Fire", 5);
        assert!(lookup(&card, "Each player discards their hand and draws 7 cards.").is_none());
    }

    #[test]
    fn test_opponent_chooses_banish() {
        let card = Card::character(CardId::new(3), "Lady Tremaine", 5)
            .with_version("Imperious Queen");
        let (_, abilities) = lookup(
            &card,
            "When you play this character, each opponent chooses and banishes one of their characters.",
        )
        .unwrap();
        assert!(abilities[0].is_triggered());
        assert_eq!(abilities[0].effects[0].chooser, Chooser::Opponent);
    }
}
