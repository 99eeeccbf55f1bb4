//! Keyword lines: "Evasive", "Challenger +2", "Shift 5 {I}", "Evasive, Ward".

use std::sync::LazyLock;

use super::numbers::signed;
use super::{first_match, group, PatternRule, Scope};
use crate::effects::{Keyword, KeywordKind};

pub static KEYWORD_RULES: LazyLock<Vec<PatternRule<Keyword>>> = LazyLock::new(|| {
    vec![
        PatternRule::new(
            "valued",
            r"(?P<kw>challenger|resist|singer|shift|sing together) (?P<v>[+-]?\d+)(?: \{I\})?",
            |caps, _| {
                let kind = KeywordKind::from_name(group(caps, "kw")?)?;
                Some(Keyword::with_value(kind, signed(group(caps, "v")?)?))
            },
        ),
        // "Shift: Discard a song card" and other alternate costs are not modeled.
        PatternRule::new("plain", r"(?P<kw>[a-z]+)", |caps, _| {
            let kind = KeywordKind::from_name(group(caps, "kw")?)?;
            (!kind.takes_value()).then_some(Keyword::new(kind))
        }),
    ]
});

/// Parse a keyword line. Every comma-separated item must be a keyword.
#[must_use]
pub fn parse(text: &str, scope: &Scope) -> Option<Vec<Keyword>> {
    let text = text.trim().trim_end_matches('.');
    let keywords: Vec<Keyword> = text
        .split(',')
        .map(str::trim)
        .map(|item| first_match(&KEYWORD_RULES, item, scope).map(|(_, keyword)| keyword))
        .collect::<Option<_>>()?;
    (!keywords.is_empty()).then_some(keywords)
}

/// Keyword from structured card data: name plus optional value.
#[must_use]
pub fn from_parts(name: &str, value: Option<i32>) -> Option<Keyword> {
    let kind = KeywordKind::from_name(name)?;
    match (kind.takes_value(), value) {
        (true, Some(v)) => Some(Keyword::with_value(kind, v)),
        (true, None) => None,
        (false, _) => Some(Keyword::new(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;

    fn scope() -> Scope {
        Scope::new(AbilityMode::Static)
    }

    #[test]
    fn test_plain_keywords() {
        assert_eq!(parse("Evasive", &scope()), Some(vec![Keyword::new(KeywordKind::Evasive)]));
        assert_eq!(parse("Ward", &scope()), Some(vec![Keyword::new(KeywordKind::Ward)]));
        assert_eq!(parse("Reckless", &scope()), Some(vec![Keyword::new(KeywordKind::Reckless)]));
    }

    #[test]
    fn test_valued_keywords() {
        assert_eq!(
            parse("Challenger +2", &scope()),
            Some(vec![Keyword::with_value(KeywordKind::Challenger, 2)])
        );
        assert_eq!(
            parse("Shift 5 {I}", &scope()),
            Some(vec![Keyword::with_value(KeywordKind::Shift, 5)])
        );
        assert_eq!(
            parse("Sing Together 8", &scope()),
            Some(vec![Keyword::with_value(KeywordKind::SingTogether, 8)])
        );
    }

    #[test]
    fn test_keyword_list() {
        assert_eq!(
            parse("Evasive, Resist +1", &scope()),
            Some(vec![
                Keyword::new(KeywordKind::Evasive),
                Keyword::with_value(KeywordKind::Resist, 1)
            ])
        );
    }

    #[test]
    fn test_rejects_non_keywords() {
        assert_eq!(parse("Challenger", &scope()), None);
        assert_eq!(parse("Draw a card", &scope()), None);
        assert_eq!(parse("Evasive, Flying", &scope()), None);
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            from_parts("Singer", Some(5)),
            Some(Keyword::with_value(KeywordKind::Singer, 5))
        );
        assert_eq!(
            from_parts("Bodyguard", None),
            Some(Keyword::new(KeywordKind::Bodyguard))
        );
        assert_eq!(from_parts("Resist", None), None);
    }
}
