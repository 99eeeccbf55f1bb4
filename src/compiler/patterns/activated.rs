//! Activated abilities: `<costs> — <effects>`.

use std::sync::LazyLock;

use smallvec::SmallVec;

use super::numbers::count;
use super::{first_match, group, num, PatternRule, Scope};
use crate::effects::Cost;

/// Separator the normalizer writes between costs and effects.
pub const SEPARATOR: &str = " — ";

pub static COST_RULES: LazyLock<Vec<PatternRule<Cost>>> = LazyLock::new(|| {
    vec![
        PatternRule::new("exert", r"\{E\}", |_, _| Some(Cost::Exert)),
        PatternRule::new("ink", r"(?P<n>\d+) \{I\}", |caps, _| {
            Some(Cost::Ink(count(group(caps, "n")?)?))
        }),
        PatternRule::new("banish_self", r"banish this (?:character|item|location)", |_, _| {
            Some(Cost::BanishSelf)
        }),
        PatternRule::new(
            "discard",
            concat!(r"(?:choose and )?discard ", num!("n"), r" cards?"),
            |caps, _| Some(Cost::Discard(count(group(caps, "n")?)?)),
        ),
    ]
});

/// Costs and the effect text after the separator.
pub type Split<'t> = (SmallVec<[Cost; 2]>, &'t str);

/// Split activated text. `None` when the left side is not a cost list.
#[must_use]
pub fn split<'t>(text: &'t str, scope: &Scope) -> Option<Split<'t>> {
    let (left, body) = text.split_once(SEPARATOR)?;
    let mut costs: SmallVec<[Cost; 2]> = SmallVec::new();
    let parts = left.split(',').map(str::trim);
    for part in parts.filter(|part| !part.is_empty()) {
        if let Some((_, cost)) = first_match(&COST_RULES, part, scope) {
            costs.push(cost);
            continue;
        }
        // "{E} and 1 {I}"
        for piece in part.split(" and ") {
            costs.push(first_match(&COST_RULES, piece.trim(), scope)?.1);
        }
    }
    (!costs.is_empty()).then_some((costs, body.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;

    fn scope() -> Scope {
        Scope::new(AbilityMode::Activated)
    }

    #[test]
    fn test_exert_cost() {
        let (costs, body) = split("{E} — Draw a card.", &scope()).unwrap();
        assert_eq!(costs.as_slice(), &[Cost::Exert]);
        assert_eq!(body, "Draw a card.");
    }

    #[test]
    fn test_multiple_costs() {
        let (costs, _) = split("{E}, 2 {I} — Gain 1 lore.", &scope()).unwrap();
        assert_eq!(costs.as_slice(), &[Cost::Exert, Cost::Ink(2)]);

        let text = "Banish this item — Deal 2 damage to chosen character.";
        let (costs, _) = split(text, &scope()).unwrap();
        assert_eq!(costs.as_slice(), &[Cost::BanishSelf]);

        let text = "{E}, Choose and discard a card — Draw 2 cards.";
        let (costs, _) = split(text, &scope()).unwrap();
        assert_eq!(costs.as_slice(), &[Cost::Exert, Cost::Discard(1)]);
    }

    #[test]
    fn test_not_a_cost() {
        assert!(split("Draw a card.", &scope()).is_none());
        assert!(split("Sing a song — Draw a card.", &scope()).is_none());
    }
}
