//! Condition phrases: the part after "if" / "while".

use std::sync::LazyLock;

use super::numbers::comparison;
use super::target::{compare_phrase, filter, threshold};
use super::{first_match, group, num, PatternRule, Scope};
use crate::effects::{Comparison, PlayerTarget};
use crate::triggers::Condition;

fn player_of(phrase: &str) -> PlayerTarget {
    if phrase.to_ascii_lowercase().contains("opponent") {
        PlayerTarget::Opponent
    } else {
        PlayerTarget::You
    }
}

pub static CONDITION_RULES: LazyLock<Vec<PatternRule<Condition>>> = LazyLock::new(|| {
    vec![
        PatternRule::new("your_turn", r"it's your turn|it is your turn|during your turn", |_, _| {
            Some(Condition::DuringYourTurn)
        }),
        PatternRule::new(
            "opponents_turn",
            concat!(
                r"it's an opponent's turn|it's not your turn|",
                r"during an opponent's turn|during opponents' turns"
            ),
            |_, _| Some(Condition::DuringOpponentsTurn),
        ),
        PatternRule::new("self_exerted", r"this (?:character|item|location) is exerted", |_, _| {
            Some(Condition::SelfExerted)
        }),
        PatternRule::new("self_ready", r"this (?:character|item|location) is ready", |_, _| {
            Some(Condition::SelfReady)
        }),
        PatternRule::new(
            "self_damaged",
            r"this character (?:is damaged|has damage|has damage on it|has any damage)",
            |_, _| Some(Condition::SelfDamaged),
        ),
        PatternRule::new(
            "self_undamaged",
            r"this character (?:has no damage|is undamaged)(?: on it)?",
            |_, _| Some(Condition::SelfUndamaged),
        ),
        PatternRule::new("self_at_location", r"this character is at a location", |_, _| {
            Some(Condition::SelfAtLocation)
        }),
        PatternRule::new(
            "hand_empty",
            r"(?P<who>you have|an opponent has|each opponent has) no cards in (?:your|their) hand",
            |caps, _| {
                Some(Condition::HandSize {
                    who: player_of(group(caps, "who")?),
                    compare: Comparison::exactly(0),
                })
            },
        ),
        PatternRule::new(
            "hand_size",
            concat!(
                r"(?P<who>you have|an opponent has|each opponent has) ",
                num!("n"),
                r" (?P<dir>or more|or fewer|or less) cards in (?:your|their) hand"
            ),
            |caps, _| {
                let phrase = format!("{} {}", group(caps, "n")?, group(caps, "dir")?);
                Some(Condition::HandSize {
                    who: player_of(group(caps, "who")?),
                    compare: compare_phrase(&phrase)?,
                })
            },
        ),
        PatternRule::new(
            "inkwell_size",
            concat!(
                r"(?P<who>you have|an opponent has) ",
                num!("n"),
                r" or more cards in (?:your|their) inkwell"
            ),
            |caps, _| {
                Some(Condition::InkwellSize {
                    who: player_of(group(caps, "who")?),
                    compare: compare_phrase(&format!("{} or more", group(caps, "n")?))?,
                })
            },
        ),
        PatternRule::new(
            "lore",
            concat!(
                r"(?P<who>you have|an opponent has|each opponent has) ",
                num!("n"),
                r" (?P<dir>or more|or less) lore"
            ),
            |caps, _| {
                let n = super::numbers::number(group(caps, "n")?)?;
                Some(Condition::Lore {
                    who: player_of(group(caps, "who")?),
                    compare: comparison(n, group(caps, "dir")),
                })
            },
        ),
        PatternRule::new(
            "in_discard",
            r"you have (?P<n>a|an|\d+(?: or more)?) (?P<filter>.+?) in your discard",
            |caps, _| {
                Some(Condition::InDiscard {
                    filter: filter(group(caps, "filter")?)?,
                    at_least: threshold(group(caps, "n")?)?,
                })
            },
        ),
        PatternRule::new(
            "you_control_none",
            r"you (?:have no|don't have any|don't have an?) (?P<filter>.+?)(?: in play)?",
            |caps, _| {
                let f = filter(group(caps, "filter")?)?.yours();
                Some(Condition::you_control(f).negate())
            },
        ),
        PatternRule::new(
            "you_control",
            r"you have (?P<n>a|an|another|\d+ or more) (?P<filter>.+?)(?: in play)?",
            |caps, _| {
                let n = group(caps, "n")?;
                let mut f = filter(group(caps, "filter")?)?.yours();
                if n.eq_ignore_ascii_case("another") {
                    f = f.other();
                }
                Some(Condition::YouControl {
                    filter: f,
                    at_least: threshold(n).unwrap_or(1),
                })
            },
        ),
        PatternRule::new(
            "opponent_controls",
            r"(?:an|each) opponent has (?P<n>a|an|\d+ or more) (?P<filter>.+?)(?: in play)?",
            |caps, _| {
                Some(Condition::OpponentControls {
                    filter: filter(group(caps, "filter")?)?.opposing(),
                    at_least: threshold(group(caps, "n")?)?,
                })
            },
        ),
        PatternRule::new(
            "previous_is",
            concat!(
                r"(?:it's|it is|that's|that is|that character is|they are|the chosen character is)",
                r" (?:a|an) (?P<filter>.+)"
            ),
            |caps, scope| {
                let f = filter(group(caps, "filter")?)?;
                Some(if scope.previous {
                    Condition::PreviousMatches(f)
                } else {
                    Condition::TriggeringMatches(f)
                })
            },
        ),
    ]
});

/// Parse a condition, including "A and B" / "A or B".
#[must_use]
pub fn condition(text: &str, scope: &Scope) -> Option<Condition> {
    let text = text.trim().trim_end_matches(['.', ',']);
    if let Some((_, condition)) = first_match(&CONDITION_RULES, text, scope) {
        return Some(condition);
    }
    let joins: [(&str, fn(Condition, Condition) -> Condition); 2] =
        [(" and ", Condition::and), (" or ", Condition::or)];
    for (sep, join) in joins {
        if let Some((left, right)) = text.split_once(sep) {
            return Some(join(condition(left, scope)?, condition(right, scope)?));
        }
    }
    None
}
