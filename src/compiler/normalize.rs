//! Text normalization.
//!
//! Printed text arrives with reminder parentheticals, symbol glyphs, curly
//! quotes, several dash styles, and the card's own name. Pattern rules see
//! one canonical form:
//!
//! - reminders stripped, unless the block is nothing but a reminder
//! - glyphs as `{E}` `{I}` `{S}` `{W}` `{L}`
//! - straight quotes
//! - one separator, ` — `, between costs and effects
//! - the card's own name as "this character" (or item / location)
//! - a leading all-caps ability name split off

use std::sync::LazyLock;

use regex::Regex;

use crate::cards::Card;

/// Normalized block text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Printed ability name ("DRAGON FIRE").
    pub name: Option<String>,
    pub text: String,
}

static REMINDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid regex"));

static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([eiswlEISWL])\}").expect("valid regex"));

static DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:—|–|\s-{1,2}\s)\s*").expect("valid regex")
});

const GLYPHS: [(char, &str); 6] = [
    ('⟳', "{E}"),
    ('⬡', "{I}"),
    ('¤', "{S}"),
    ('🛡', "{W}"),
    ('◊', "{L}"),
    ('⛉', "{W}"),
];

/// Normalize one block of printed text for a card.
#[must_use]
pub fn normalize(raw: &str, card: &Card) -> Normalized {
    let text = strip_reminders(raw);
    let text = replace_glyphs(&text);
    let text = text.replace(['’', '‘'], "'").replace(['“', '”'], "\"");
    let text = replace_self_name(&text, card);
    let text = DASH.replace_all(&text, " — ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    split_name(&text)
}

fn strip_reminders(raw: &str) -> String {
    let stripped = REMINDER.replace_all(raw, "");
    if stripped.trim().is_empty() {
        // The whole block is a reminder: keep what it says.
        raw.replace(['(', ')'], "")
    } else {
        stripped.into_owned()
    }
}

fn replace_glyphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match GLYPHS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, token)) => out.push_str(token),
            None => out.push(c),
        }
    }
    SYMBOL
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            format!("{{{}}}", caps[1].to_ascii_uppercase())
        })
        .into_owned()
}

/// "Stitch" in Stitch's own text becomes "this character". References
/// after "named" stay, since they mean other cards with that name.
fn replace_self_name(text: &str, card: &Card) -> String {
    let reference = format!("this {}", card.card_type.noun());
    let mut out = text.to_string();
    for name in [card.full_name(), card.name.clone()] {
        if name.is_empty() {
            continue;
        }
        let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(&name))) else {
            continue;
        };
        let mut replaced = String::with_capacity(out.len());
        let mut last = 0;
        for m in pattern.find_iter(&out) {
            let before = &out[..m.start()];
            replaced.push_str(&out[last..m.start()]);
            if before.trim_end().to_ascii_lowercase().ends_with("named") {
                replaced.push_str(m.as_str());
            } else {
                replaced.push_str(&reference);
            }
            last = m.end();
        }
        replaced.push_str(&out[last..]);
        out = replaced;
    }
    out
}

/// Split a leading all-caps name: "DRAGON FIRE When you play ...".
fn split_name(text: &str) -> Normalized {
    let words: Vec<&str> = text.split(' ').collect();
    let mut taken = 0;
    for word in &words {
        let has_upper = word.chars().any(|c| c.is_uppercase());
        let has_lower = word.chars().any(|c| c.is_lowercase());
        let symbol = word.contains('{') || word.contains('—');
        if symbol || has_lower || (!has_upper && !word.chars().all(|c| c.is_ascii_punctuation())) {
            break;
        }
        taken += 1;
    }
    let name = words[..taken].join(" ");
    let letters = name.chars().filter(|c| c.is_alphabetic()).count();
    if taken == words.len() || letters < 2 {
        return Normalized {
            name: None,
            text: text.to_string(),
        };
    }
    Normalized {
        name: Some(name),
        text: words[taken..].join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;

    fn stitch() -> Card {
        Card::character(CardId::new(1), "Stitch", 3).with_version("Rock Star")
    }

    #[test]
    fn test_strips_reminder_text() {
        let n = normalize("Bodyguard (This character may enter play exerted.)", &stitch());
        assert_eq!(n.text, "Bodyguard");
        assert_eq!(n.name, None);
    }

    #[test]
    fn test_keeps_reminder_only_block() {
        let n = normalize(
            "(A character with cost 2 or more can ⟳ to sing this song for free.)",
            &stitch(),
        );
        assert_eq!(
            n.text,
            "A character with cost 2 or more can {E} to sing this song for free."
        );
    }

    #[test]
    fn test_glyphs_and_quotes() {
        let n = normalize("Your characters get +1 ¤ and +1 {w}. Don’t worry.", &stitch());
        assert_eq!(
            n.text,
            "Your characters get +1 {S} and +1 {W}. Don't worry."
        );
    }

    #[test]
    fn test_dash_separator() {
        assert_eq!(
            normalize("⟳, 2 ⬡ - Draw a card.", &stitch()).text,
            "{E}, 2 {I} — Draw a card."
        );
        assert_eq!(normalize("{E}—Draw a card.", &stitch()).text, "{E} — Draw a card.");
        assert_eq!(normalize("{E} – Draw a card.", &stitch()).text, "{E} — Draw a card.");
    }

    #[test]
    fn test_self_name() {
        let n = normalize("When you play Stitch, Stitch gets +1 {S}.", &stitch());
        assert_eq!(n.text, "When you play this character, this character gets +1 {S}.");

        let n = normalize("If you have a character named Stitch in play, draw a card.", &stitch());
        assert_eq!(n.text, "If you have a character named Stitch in play, draw a card.");
    }

    #[test]
    fn test_ability_name() {
        let n = normalize("ADORING FANS Whenever you play a character, draw a card.", &stitch());
        assert_eq!(n.name.as_deref(), Some("ADORING FANS"));
        assert_eq!(n.text, "Whenever you play a character, draw a card.");

        let n = normalize("I SUMMON THEE! {E} — Draw a card.", &stitch());
        assert_eq!(n.name.as_deref(), Some("I SUMMON THEE!"));
        assert_eq!(n.text, "{E} — Draw a card.");

        // A lone capital is a word, not a name.
        let n = normalize("A character gets +1 {S}.", &stitch());
        assert_eq!(n.name, None);
    }

    #[test]
    fn test_collapses_whitespace() {
        let n = normalize("Draw   a\ncard.", &stitch());
        assert_eq!(n.text, "Draw a card.");
    }
}
