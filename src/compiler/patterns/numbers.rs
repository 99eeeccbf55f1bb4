//! Numbers, signs, and stat symbols.

use crate::effects::{Comparison, Stat};

/// Parse a number word or digits.
#[must_use]
pub fn number(word: &str) -> Option<i32> {
    let word = word.trim();
    let n = match word.to_ascii_lowercase().as_str() {
        "no" | "zero" => 0,
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => return digits.parse().ok(),
    };
    Some(n)
}

/// Unsigned variant of [`number`].
#[must_use]
pub fn count(word: &str) -> Option<u32> {
    number(word).and_then(|n| u32::try_from(n).ok())
}

/// Parse a signed modifier: "+2", "-1", "2".
#[must_use]
pub fn signed(text: &str) -> Option<i32> {
    let text = text.trim();
    match text.strip_prefix('+') {
        Some(rest) => rest.parse().ok(),
        None => text.replace('−', "-").parse().ok(),
    }
}

/// Canonical stat token to stat.
#[must_use]
pub fn stat(symbol: &str) -> Option<Stat> {
    match symbol.trim().to_ascii_uppercase().as_str() {
        "{S}" | "S" | "STRENGTH" => Some(Stat::Strength),
        "{W}" | "W" | "WILLPOWER" => Some(Stat::Willpower),
        "{L}" | "L" | "LORE" => Some(Stat::Lore),
        _ => None,
    }
}

/// "or less" / "or more" / nothing.
#[must_use]
pub fn comparison(value: i32, direction: Option<&str>) -> Comparison {
    match direction.map(|d| d.trim().to_ascii_lowercase()) {
        Some(d) if d.ends_with("less") || d.ends_with("lower") || d.ends_with("fewer") => {
            Comparison::at_most(value)
        }
        Some(d) if d.ends_with("more") || d.ends_with("greater") || d.ends_with("higher") => {
            Comparison::at_least(value)
        }
        _ => Comparison::exactly(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_words() {
        assert_eq!(number("a"), Some(1));
        assert_eq!(number("Three"), Some(3));
        assert_eq!(number("12"), Some(12));
        assert_eq!(number("several"), None);
    }

    #[test]
    fn test_signed() {
        assert_eq!(signed("+2"), Some(2));
        assert_eq!(signed("-1"), Some(-1));
        assert_eq!(signed("−3"), Some(-3));
    }

    #[test]
    fn test_stat_tokens() {
        assert_eq!(stat("{S}"), Some(Stat::Strength));
        assert_eq!(stat("{l}"), Some(Stat::Lore));
        assert_eq!(stat("{I}"), None);
    }

    #[test]
    fn test_comparison_direction() {
        assert_eq!(comparison(3, Some("or less")), Comparison::at_most(3));
        assert_eq!(comparison(5, Some("or more")), Comparison::at_least(5));
        assert_eq!(comparison(2, None), Comparison::exactly(2));
    }
}
