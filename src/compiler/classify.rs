//! Block classification.

use serde::Serialize;

use super::patterns::{activated, keywords, triggered, AbilityMode, Scope};
use crate::cards::{AbilityHint, AbilityText};

/// Which pattern family handles a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BlockKind {
    Keyword,
    Triggered,
    Static,
    Activated,
}

/// Classify normalized text. An explicit hint from the data source wins;
/// otherwise keyword lines, trigger openers, and cost separators are
/// recognized in that order and everything else is static.
#[must_use]
pub fn classify(block: &AbilityText, text: &str) -> BlockKind {
    if let Some(hint) = block.hint {
        return match hint {
            AbilityHint::Keyword => BlockKind::Keyword,
            AbilityHint::Triggered => BlockKind::Triggered,
            AbilityHint::Static => BlockKind::Static,
            AbilityHint::Activated => BlockKind::Activated,
        };
    }
    if block.keyword.is_some()
        || keywords::parse(text, &Scope::new(AbilityMode::Static)).is_some()
    {
        return BlockKind::Keyword;
    }
    if triggered::looks_triggered(text) {
        return BlockKind::Triggered;
    }
    if activated::split(text, &Scope::new(AbilityMode::Activated)).is_some() {
        return BlockKind::Activated;
    }
    BlockKind::Static
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> BlockKind {
        classify(&AbilityText::new(text), text)
    }

    #[test]
    fn test_classify_by_shape() {
        assert_eq!(kind("Evasive"), BlockKind::Keyword);
        assert_eq!(kind("Challenger +2"), BlockKind::Keyword);
        assert_eq!(kind("When you play this character, draw a card."), BlockKind::Triggered);
        assert_eq!(kind("At the end of your turn, gain 1 lore."), BlockKind::Triggered);
        assert_eq!(kind("{E}, 1 {I} — Draw a card."), BlockKind::Activated);
        assert_eq!(kind("Your characters get +1 {S}."), BlockKind::Static);
        assert_eq!(kind("Draw a card."), BlockKind::Static);
    }

    #[test]
    fn test_hint_wins() {
        let block = AbilityText::new("Draw a card.").with_hint(AbilityHint::Triggered);
        assert_eq!(classify(&block, "Draw a card."), BlockKind::Triggered);
    }

    #[test]
    fn test_cost_shape_required_for_activated() {
        assert_eq!(kind("Sing a song — draw a card."), BlockKind::Static);
    }
}
