//! Continuous abilities: an optional gate around a body of effects.
//!
//! "While this character is exerted, your characters get +1 {S}." keeps
//! the gate as the ability condition and parses the body in static scope,
//! where chosen targets are refused and durations default to
//! `WhileActive`.

use std::sync::LazyLock;

use super::conditions::condition;
use super::{first_match, group, PatternRule, Scope};
use crate::triggers::Condition;

/// A gated body.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticForm {
    pub condition: Condition,
    pub body: String,
}

fn form(condition: Condition, body: &str) -> Option<StaticForm> {
    Some(StaticForm {
        condition,
        body: body.to_string(),
    })
}

pub static STATIC_RULES: LazyLock<Vec<PatternRule<StaticForm>>> = LazyLock::new(|| {
    vec![
        PatternRule::new("while_prefix", r"while (?P<cond>.+?), (?P<body>.+)", |caps, scope| {
            form(condition(group(caps, "cond")?, scope)?, group(caps, "body")?)
        }),
        PatternRule::new("during_your_turn", r"during your turn, (?P<body>.+)", |caps, _| {
            form(Condition::DuringYourTurn, group(caps, "body")?)
        }),
        PatternRule::new(
            "during_opponents_turn",
            r"during (?:an opponent's turn|opponents' turns), (?P<body>.+)",
            |caps, _| form(Condition::DuringOpponentsTurn, group(caps, "body")?),
        ),
        // Locations: "Characters get +1 {W} while here."
        PatternRule::new(
            "while_here",
            r"(?P<subject>.+?) (?P<verb>gets?|gains?|can't|takes?) (?P<rest>.+?) while here\.?",
            |caps, _| {
                let body = format!(
                    "{} here {} {}",
                    group(caps, "subject")?,
                    group(caps, "verb")?,
                    group(caps, "rest")?
                );
                form(Condition::Always, &body)
            },
        ),
        PatternRule::new("while_suffix", r"(?P<body>.+?) while (?P<cond>.+?)\.?", |caps, scope| {
            form(condition(group(caps, "cond")?, scope)?, group(caps, "body")?)
        }),
        PatternRule::new("ungated", r"(?P<body>.+)", |caps, _| {
            form(Condition::Always, group(caps, "body")?)
        }),
    ]
});

/// Peel the gate off a static ability.
#[must_use]
pub fn split(text: &str, scope: &Scope) -> Option<(&'static str, StaticForm)> {
    first_match(&STATIC_RULES, text.trim(), scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;

    fn scope() -> Scope {
        Scope::new(AbilityMode::Static)
    }

    #[test]
    fn test_while_prefix() {
        let text = "While this character is exerted, your characters get +1 {S}.";
        let (rule, form) = split(text, &scope()).unwrap();
        assert_eq!(rule, "while_prefix");
        assert_eq!(form.condition, Condition::SelfExerted);
        assert_eq!(form.body, "your characters get +1 {S}.");
    }

    #[test]
    fn test_during_your_turn() {
        let (_, form) = split("During your turn, this character gains Evasive.", &scope()).unwrap();
        assert_eq!(form.condition, Condition::DuringYourTurn);
        assert_eq!(form.body, "this character gains Evasive.");
    }

    #[test]
    fn test_while_here() {
        let (rule, form) = split("Characters get +1 {W} while here.", &scope()).unwrap();
        assert_eq!(rule, "while_here");
        assert_eq!(form.body, "Characters here get +1 {W}");
    }

    #[test]
    fn test_while_suffix_requires_condition() {
        let (rule, form) = split(
            "This character gets +2 {S} while you have a Villain character in play.",
            &scope(),
        )
        .unwrap();
        assert_eq!(rule, "while_suffix");
        assert!(matches!(form.condition, Condition::YouControl { .. }));

        let text = "This character gets +1 {S} while the moon is full.";
        let (rule, _) = split(text, &scope()).unwrap();
        assert_eq!(rule, "ungated");
    }
}
