//! Trigger phrases.
//!
//! A triggered ability reads `<phrase>, <effects>`. The phrase maps to one
//! or two `(EventKind, TriggerFilter)` pairs; "When you play this character
//! and whenever he quests" listens to both events with the same body.

use std::sync::LazyLock;

use smallvec::{smallvec, SmallVec};

use super::target::filter;
use super::{first_match, group, PatternRule, Scope};
use crate::effects::TargetFilter;
use crate::triggers::{Condition, EventKind, TriggerFilter};

/// Events a trigger phrase listens to.
pub type Listens = SmallVec<[(EventKind, TriggerFilter); 2]>;

/// The source card as printed after normalization.
macro_rules! self_ref {
    () => {
        r"this (?:character|item|location)"
    };
}

fn subject(phrase: &str) -> Option<TriggerFilter> {
    filter(phrase).map(TriggerFilter::Subject)
}

fn actor(phrase: &str) -> Option<TriggerFilter> {
    filter(phrase).map(TriggerFilter::Actor)
}

fn one(event: EventKind, filter: TriggerFilter) -> Option<Listens> {
    Some(smallvec![(event, filter)])
}

pub static TRIGGER_RULES: LazyLock<Vec<PatternRule<Listens>>> = LazyLock::new(|| {
    vec![
        // === Playing cards ===
        PatternRule::new(
            "play_self_and_quest",
            concat!(r"when you play ", self_ref!(), r" and whenever (?:he|she|it|they) quests?"),
            |_, _| {
                Some(smallvec![
                    (EventKind::CardPlayed, TriggerFilter::SubjectIsSelf),
                    (EventKind::Quested, TriggerFilter::SubjectIsSelf),
                ])
            },
        ),
        PatternRule::new("play_self", concat!(r"when(?:ever)? you play ", self_ref!()), |_, _| {
            one(EventKind::CardPlayed, TriggerFilter::SubjectIsSelf)
        }),
        PatternRule::new("you_play", r"whenever you play (?P<f>.+)", |caps, _| {
            one(
                EventKind::CardPlayed,
                TriggerFilter::PlayerIsController.and(subject(group(caps, "f")?)?),
            )
        }),
        PatternRule::new("opponent_plays", r"whenever an opponent plays (?P<f>.+)", |caps, _| {
            one(
                EventKind::CardPlayed,
                TriggerFilter::PlayerIsOpponent.and(subject(group(caps, "f")?)?),
            )
        }),
        PatternRule::new(
            "self_sings",
            concat!(r"whenever ", self_ref!(), r" sings a song"),
            |_, _| one(EventKind::SongSung, TriggerFilter::ActorIsSelf),
        ),
        PatternRule::new("you_sing", r"whenever you sing a song", |_, _| {
            one(EventKind::SongSung, TriggerFilter::PlayerIsController)
        }),
        // === Questing ===
        PatternRule::new("self_quests", concat!(r"whenever ", self_ref!(), r" quests"), |_, _| {
            one(EventKind::Quested, TriggerFilter::SubjectIsSelf)
        }),
        PatternRule::new("quests_here", r"whenever a character quests while here", |_, _| {
            one(
                EventKind::Quested,
                TriggerFilter::Subject(TargetFilter::characters().here()),
            )
        }),
        PatternRule::new("filter_quests", r"whenever (?P<f>.+?) quests", |caps, _| {
            one(EventKind::Quested, subject(group(caps, "f")?)?)
        }),
        // === Challenges ===
        PatternRule::new(
            "self_challenges",
            concat!(r"whenever ", self_ref!(), r" challenges (?P<f>.+)"),
            |caps, _| {
                one(
                    EventKind::Challenged,
                    TriggerFilter::ActorIsSelf.and(subject(group(caps, "f")?)?),
                )
            },
        ),
        PatternRule::new(
            "self_banished_in_challenge",
            concat!(
                r"when(?:ever)? ",
                self_ref!(),
                r" is (?:challenged and banished|banished in a challenge)"
            ),
            |_, _| one(EventKind::BanishedInChallenge, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new(
            "self_challenged",
            concat!(r"whenever ", self_ref!(), r" is challenged"),
            |_, _| one(EventKind::Challenged, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new(
            "self_banishes_in_challenge",
            concat!(
                r"whenever ",
                self_ref!(),
                r" banishes (?:another|a|an opposing) character in a challenge"
            ),
            |_, _| one(EventKind::BanishedInChallenge, TriggerFilter::ActorIsSelf),
        ),
        PatternRule::new(
            "filter_challenges",
            r"whenever (?P<f>.+?) challenges (?:a|another) character",
            |caps, _| one(EventKind::Challenged, actor(group(caps, "f")?)?),
        ),
        PatternRule::new("filter_challenged", r"whenever (?P<f>.+?) is challenged", |caps, _| {
            one(EventKind::Challenged, subject(group(caps, "f")?)?)
        }),
        // === Leaving play ===
        PatternRule::new(
            "self_banished",
            concat!(r"when(?:ever)? ", self_ref!(), r" is banished"),
            |_, _| one(EventKind::Banished, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new(
            "filter_banished_in_challenge",
            r"whenever (?P<f>.+?) is banished in a challenge",
            |caps, _| one(EventKind::BanishedInChallenge, subject(group(caps, "f")?)?),
        ),
        PatternRule::new("filter_banished", r"whenever (?P<f>.+?) is banished", |caps, _| {
            one(EventKind::Banished, subject(group(caps, "f")?)?)
        }),
        PatternRule::new(
            "self_returned",
            concat!(r"when(?:ever)? ", self_ref!(), r" is returned to your hand"),
            |_, _| one(EventKind::ReturnedToHand, TriggerFilter::SubjectIsSelf),
        ),
        // === Damage ===
        PatternRule::new(
            "self_damaged",
            concat!(r"whenever ", self_ref!(), r" is dealt damage"),
            |_, _| one(EventKind::DamageDealt, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new("filter_damaged", r"whenever (?P<f>.+?) is dealt damage", |caps, _| {
            one(EventKind::DamageDealt, subject(group(caps, "f")?)?)
        }),
        PatternRule::new(
            "damage_removed",
            r"whenever you remove (?:one or more )?damage from (?P<f>.+)",
            |caps, _| one(EventKind::DamageRemoved, subject(group(caps, "f")?)?),
        ),
        // === Cards and lore ===
        PatternRule::new("you_draw", r"whenever you draw a card", |_, _| {
            one(EventKind::CardDrawn, TriggerFilter::PlayerIsController)
        }),
        PatternRule::new("opponent_draws", r"whenever an opponent draws a card", |_, _| {
            one(EventKind::CardDrawn, TriggerFilter::PlayerIsOpponent)
        }),
        PatternRule::new("you_ink", r"whenever you put a card into your inkwell", |_, _| {
            one(EventKind::CardInked, TriggerFilter::PlayerIsController)
        }),
        PatternRule::new("you_discard", r"whenever you discard a card", |_, _| {
            one(EventKind::Discarded, TriggerFilter::PlayerIsController)
        }),
        PatternRule::new("opponent_discards", r"whenever an opponent discards a card", |_, _| {
            one(EventKind::Discarded, TriggerFilter::PlayerIsOpponent)
        }),
        PatternRule::new("you_gain_lore", r"whenever you gain lore", |_, _| {
            one(EventKind::LoreGained, TriggerFilter::PlayerIsController)
        }),
        // === Turn structure ===
        PatternRule::new("your_turn_start", r"at the start of your turn", |_, _| {
            one(EventKind::TurnStarted, TriggerFilter::PlayerIsController)
        }),
        PatternRule::new("your_turn_end", r"at the end of your turn", |_, _| {
            one(EventKind::TurnEnded, TriggerFilter::PlayerIsController)
        }),
        PatternRule::new(
            "opponent_turn_start",
            r"at the start of (?:each|an) opponent's turn",
            |_, _| one(EventKind::TurnStarted, TriggerFilter::PlayerIsOpponent),
        ),
        PatternRule::new("opponent_turn_end", r"at the end of (?:each|an) opponent's turn", |_, _| {
            one(EventKind::TurnEnded, TriggerFilter::PlayerIsOpponent)
        }),
        // === Readiness and movement ===
        PatternRule::new(
            "self_exerted",
            concat!(r"whenever ", self_ref!(), r" (?:is exerted|exerts)"),
            |_, _| one(EventKind::Exerted, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new(
            "self_readied",
            concat!(r"whenever ", self_ref!(), r" (?:is readied|readies)"),
            |_, _| one(EventKind::Readied, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new(
            "self_moves",
            concat!(r"whenever ", self_ref!(), r" moves to a location"),
            |_, _| one(EventKind::MovedToLocation, TriggerFilter::SubjectIsSelf),
        ),
        PatternRule::new("moved_here", r"when(?:ever)? you move a character here", |_, _| {
            one(EventKind::MovedToLocation, TriggerFilter::ActorIsSelf)
        }),
    ]
});

/// A trigger split into its parts.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerParts<'t> {
    pub rule: &'static str,
    pub listens: Listens,
    /// "During your turn, whenever ..." gates the listener.
    pub condition: Condition,
    pub body: &'t str,
}

/// Split `<phrase>, <body>` at the first comma whose left side is a known
/// trigger phrase.
#[must_use]
pub fn split<'t>(text: &'t str, scope: &Scope) -> Option<TriggerParts<'t>> {
    let (condition, text) = turn_gate(text);
    let mut at = 0;
    while let Some(pos) = text[at..].find(", ") {
        let comma = at + pos;
        if let Some((rule, listens)) = first_match(&TRIGGER_RULES, &text[..comma], scope) {
            return Some(TriggerParts {
                rule,
                listens,
                condition,
                body: text[comma + 2..].trim(),
            });
        }
        at = comma + 2;
    }
    None
}

fn turn_gate(text: &str) -> (Condition, &str) {
    let lower = text.to_ascii_lowercase();
    for (prefix, condition) in [
        ("during your turn, ", Condition::DuringYourTurn),
        ("during an opponent's turn, ", Condition::DuringOpponentsTurn),
        ("during opponents' turns, ", Condition::DuringOpponentsTurn),
    ] {
        if lower.starts_with(prefix) {
            return (condition, &text[prefix.len()..]);
        }
    }
    (Condition::Always, text)
}

/// Whether text opens like a trigger.
#[must_use]
pub fn looks_triggered(text: &str) -> bool {
    let (_, rest) = turn_gate(text);
    let lower = rest.trim_start().to_ascii_lowercase();
    lower.starts_with("when ")
        || lower.starts_with("whenever ")
        || lower.starts_with("at the start of ")
        || lower.starts_with("at the end of ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;
    use crate::effects::Ownership;

    fn scope() -> Scope {
        Scope::new(AbilityMode::Triggered)
    }

    #[test]
    fn test_play_self() {
        let parts = split("When you play this character, draw a card.", &scope()).unwrap();
        assert_eq!(parts.rule, "play_self");
        assert_eq!(
            parts.listens.as_slice(),
            &[(EventKind::CardPlayed, TriggerFilter::SubjectIsSelf)]
        );
        assert_eq!(parts.body, "draw a card.");
        assert!(parts.condition.is_always());
    }

    #[test]
    fn test_two_events() {
        let parts = split(
            "When you play this character and whenever he quests, you may banish one of your items to draw 2 cards.",
            &scope(),
        )
        .unwrap();
        assert_eq!(parts.listens.len(), 2);
        assert_eq!(parts.listens[1].0, EventKind::Quested);
    }

    #[test]
    fn test_filtered_subject() {
        let text = "Whenever one of your other characters is banished, gain 1 lore.";
        let parts = split(text, &scope()).unwrap();
        assert_eq!(parts.rule, "filter_banished");
        let (event, TriggerFilter::Subject(filter)) = &parts.listens[0] else {
            panic!("expected subject filter");
        };
        assert_eq!(*event, EventKind::Banished);
        assert!(filter.exclude_self);
        assert_eq!(filter.ownership, Ownership::Yours);
    }

    #[test]
    fn test_play_filter_and_comma_in_body() {
        let text = "Whenever you play a song, chosen character gets +1 {L}, then draw a card.";
        let parts = split(text, &scope()).unwrap();
        assert_eq!(parts.rule, "you_play");
        assert_eq!(parts.body, "chosen character gets +1 {L}, then draw a card.");
    }

    #[test]
    fn test_turn_gate() {
        let parts = split(
            "During your turn, whenever this character banishes another character in a challenge, gain 2 lore.",
            &scope(),
        )
        .unwrap();
        assert_eq!(parts.condition, Condition::DuringYourTurn);
        assert_eq!(parts.listens[0], (EventKind::BanishedInChallenge, TriggerFilter::ActorIsSelf));
    }

    #[test]
    fn test_turn_events() {
        let text = "At the end of your turn, if this character is exerted, draw a card.";
        let parts = split(text, &scope()).unwrap();
        assert_eq!(
            parts.listens[0],
            (EventKind::TurnEnded, TriggerFilter::PlayerIsController)
        );
        assert_eq!(parts.body, "if this character is exerted, draw a card.");
    }

    #[test]
    fn test_looks_triggered() {
        assert!(looks_triggered("Whenever this character quests, gain 1 lore."));
        assert!(looks_triggered("During your turn, whenever you draw a card, gain 1 lore."));
        assert!(!looks_triggered("Draw a card."));
    }

    #[test]
    fn test_unknown_phrase() {
        assert!(split("Whenever the moon rises, draw a card.", &scope()).is_none());
    }
}
