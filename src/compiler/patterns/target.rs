//! Target, filter, player, and count phrases.
//!
//! Filters are read word by word rather than with one regex: the printed
//! grammar is a run of prefixes ("another", "your", "exerted",
//! classification names), a type noun, then suffix clauses ("with cost 3 or
//! less", "named Stitch", "here"). Classifications are the capitalized
//! words in front of the noun, so the input keeps its original case.

use std::sync::LazyLock;

use regex::Regex;

use super::numbers::{comparison, count, number, stat};
use super::Scope;
use crate::cards::CardType;
use crate::effects::{
    Comparison, Count, KeywordKind, PlayerTarget, Stat, Status, Target, TargetCount, TargetFilter,
};
use crate::zones::Zone;

static SUFFIX_COST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^with (?:a )?cost (?P<n>\d+) or (?P<dir>less|more)").expect("valid regex")
});

static SUFFIX_STAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^with (?P<n>\d+) (?P<stat>\{[SWL]\}) or (?P<dir>less|more)")
        .expect("valid regex")
});

static SUFFIX_NAMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^named (?P<name>.+)$").expect("valid regex"));

/// Parse a noun phrase into a filter: "another exerted Villain character
/// with cost 3 or less".
#[must_use]
pub fn filter(phrase: &str) -> Option<TargetFilter> {
    let phrase = phrase.trim().trim_end_matches(['.', ',']);
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let mut filter = TargetFilter::default();
    let mut classes: Vec<&str> = Vec::new();
    let mut i = 0;

    // Prefixes, up to and including the type noun.
    let mut typed = false;
    while i < words.len() {
        let word = words[i];
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "a" | "an" | "the" | "each" | "all" | "every" | "any" => {}
            "one" | "two" | "three" if next_is(&words, i + 1, &["of"]) => i += 1,
            "another" | "other" => filter = filter.other(),
            "your" => filter = filter.yours(),
            "opposing" | "opponent's" | "opponents'" => filter = filter.opposing(),
            "exerted" => filter = filter.with_status(Status::Exerted),
            "ready" => filter = filter.with_status(Status::Ready),
            "damaged" => filter = filter.with_status(Status::Damaged),
            "undamaged" => filter = filter.with_status(Status::Undamaged),
            _ => {
                if let Some(types) = type_noun(&lower) {
                    for t in types {
                        filter = filter.or_type(*t);
                    }
                    typed = true;
                    i += 1;
                    // "character or location", "character, item, or location"
                    while i < words.len() {
                        let joined = matches!(words[i].to_ascii_lowercase().as_str(), "or" | "and");
                        let step = if joined {
                            1
                        } else if words[i - 1].ends_with(',') {
                            0
                        } else {
                            break;
                        };
                        let lowered = words.get(i + step).map(|w| w.to_ascii_lowercase());
                        let Some(more) = lowered.as_deref().and_then(type_noun) else {
                            break;
                        };
                        for t in more {
                            filter = filter.or_type(*t);
                        }
                        i += step + 1;
                    }
                    // "an action card"
                    if next_is(&words, i, &["card", "cards"]) {
                        i += 1;
                    }
                    break;
                }
                if word.starts_with(|c: char| c.is_ascii_uppercase()) {
                    classes.push(word.trim_end_matches(','));
                } else {
                    return None;
                }
            }
        }
        i += 1;
    }
    if !typed {
        return None;
    }
    if !classes.is_empty() {
        filter = filter.with_classification(classes.join(" "));
    }

    // Suffixes.
    let mut rest = words[i..].join(" ");
    while !rest.is_empty() {
        let lower = rest.to_ascii_lowercase();
        let consumed = if let Some(tail) = strip_words(&lower, &["of", "yours"]) {
            filter = filter.yours();
            tail
        } else if let Some(tail) = strip_words(&lower, &["in", "play"]) {
            tail
        } else if let Some(tail) = strip_words(&lower, &["you", "have", "in", "play"]) {
            filter = filter.yours();
            tail
        } else if let Some(tail) = strip_words(&lower, &["an", "opponent", "has", "in", "play"]) {
            filter = filter.opposing();
            tail
        } else if let Some(tail) = strip_words(&lower, &["here"])
            .or_else(|| strip_words(&lower, &["at", "this", "location"]))
        {
            filter = filter.here();
            tail
        } else if let Some(tail) = strip_words(&lower, &["at", "a", "location"]) {
            filter = filter.with_status(Status::AtLocation);
            tail
        } else if let Some(tail) = strip_words(&lower, &["with", "no", "damage"]) {
            filter = filter.with_status(Status::Undamaged);
            tail
        } else if let Some(tail) = strip_words(&lower, &["with", "damage"]) {
            filter = filter.with_status(Status::Damaged);
            tail
        } else if let Some(tail) = strip_words(&lower, &["in", "your", "discard"])
            .or_else(|| strip_words(&lower, &["from", "your", "discard"]))
        {
            filter = filter.in_zone(Zone::Discard);
            tail
        } else if let Some(tail) = strip_words(&lower, &["in", "your", "hand"])
            .or_else(|| strip_words(&lower, &["from", "your", "hand"]))
        {
            filter = filter.in_zone(Zone::Hand);
            tail
        } else if let Some(caps) = SUFFIX_COST.captures(&rest) {
            let n = caps["n"].parse().ok()?;
            filter = filter.with_cost(comparison(n, Some(&caps["dir"])));
            rest[caps[0].len()..].to_ascii_lowercase()
        } else if let Some(caps) = SUFFIX_STAT.captures(&rest) {
            let n = caps["n"].parse().ok()?;
            let cmp = comparison(n, Some(&caps["dir"]));
            match stat(&caps["stat"])? {
                Stat::Strength => filter = filter.with_strength(cmp),
                Stat::Willpower => filter.willpower = Some(cmp),
                Stat::Lore => return None,
            }
            rest[caps[0].len()..].to_ascii_lowercase()
        } else if let Some(caps) = SUFFIX_NAMED.captures(&rest) {
            return Some(filter.named(caps["name"].trim()));
        } else if let Some((keyword, tail)) = keyword_suffix(&lower) {
            filter = filter.with_keyword(keyword);
            tail
        } else {
            return None;
        };
        // Case only matters for names, which end the phrase.
        rest = consumed.trim().trim_start_matches("and ").to_string();
    }
    Some(filter)
}

fn next_is(words: &[&str], i: usize, options: &[&str]) -> bool {
    words
        .get(i)
        .is_some_and(|w| options.iter().any(|o| w.eq_ignore_ascii_case(o)))
}

fn strip_words<'t>(text: &'t str, words: &[&str]) -> Option<String> {
    let mut rest: &'t str = text;
    for word in words {
        rest = rest.strip_prefix(word)?;
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        rest = rest.trim_start();
    }
    Some(rest.to_string())
}

/// "with Evasive", "with Sing Together".
fn keyword_suffix(lower: &str) -> Option<(KeywordKind, String)> {
    let rest = lower.strip_prefix("with ")?;
    let words: Vec<&str> = rest.split_whitespace().collect();
    (1..=words.len().min(2)).rev().find_map(|n| {
        let keyword = KeywordKind::from_name(&words[..n].join(" "))?;
        Some((keyword, words[n..].join(" ")))
    })
}

fn type_noun(word: &str) -> Option<&'static [CardType]> {
    let word = word.trim_end_matches(',');
    let types: &'static [CardType] = match word {
        "character" | "characters" => &[CardType::Character],
        "item" | "items" => &[CardType::Item],
        "location" | "locations" => &[CardType::Location],
        "action" | "actions" => &[CardType::Action],
        "song" | "songs" => &[CardType::Song],
        "card" | "cards" => &[],
        _ => return None,
    };
    Some(types)
}

/// Anaphora: what "them" and "that character" mean here.
#[must_use]
pub fn back_reference(scope: &Scope) -> Target {
    if scope.previous {
        Target::Previous
    } else if scope.mode == super::AbilityMode::Triggered {
        Target::Triggering
    } else {
        Target::This
    }
}

static CHOSEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:(?P<upto>up to )?",
        super::num!("n"),
        r" )?(?P<another>another )?chosen (?P<rest>.+)$"
    ))
    .expect("valid regex")
});

static ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:each of|all|each|every) (?P<rest>.+)$").expect("valid regex")
});

/// Parse a target phrase: "chosen opposing character", "up to 2 chosen
/// characters", "each opposing character", "this character", "them".
#[must_use]
pub fn target(phrase: &str, scope: &Scope) -> Option<Target> {
    let phrase = phrase.trim().trim_end_matches(['.', ',']);
    let lower = phrase.to_ascii_lowercase();
    match lower.as_str() {
        "this character" | "this item" | "this location" | "this card" | "itself" | "him"
        | "her" => return Some(Target::This),
        "them" | "it" | "they" | "that character" | "that item" | "that location" | "that card"
        | "those characters" | "the chosen character" | "that song" => {
            return Some(back_reference(scope))
        }
        _ => {}
    }
    if let Some(caps) = CHOSEN.captures(phrase) {
        // Static abilities never ask.
        if scope.is_static() {
            return None;
        }
        let mut filter = filter(&caps["rest"])?;
        if caps.name("another").is_some() {
            filter = filter.other();
        }
        let n = caps.name("n").and_then(|m| count(m.as_str())).unwrap_or(1);
        let count = if caps.name("upto").is_some() {
            TargetCount::UpTo(n)
        } else {
            TargetCount::Exactly(n)
        };
        return Some(Target::Chosen { filter, count });
    }
    if let Some(caps) = ALL.captures(phrase) {
        return filter(&caps["rest"]).map(Target::All);
    }
    // "your other characters", "opposing characters": plural means all.
    let plural = lower
        .split_whitespace()
        .any(|w| matches!(w, "characters" | "items" | "locations"));
    if plural {
        return filter(phrase).map(Target::All);
    }
    // "one of your characters" is a choice.
    if lower.starts_with("one of ") || lower.starts_with("a ") || lower.starts_with("an ") {
        if scope.is_static() {
            return None;
        }
        return filter(phrase).map(Target::chosen);
    }
    None
}

/// Parse a player phrase.
#[must_use]
pub fn player(phrase: &str) -> Option<PlayerTarget> {
    match phrase.trim().to_ascii_lowercase().as_str() {
        "you" | "your" => Some(PlayerTarget::You),
        "each opponent" | "your opponent" | "your opponents" | "an opponent" | "chosen opponent"
        | "opponents" | "each opponent's" | "their" => Some(PlayerTarget::Opponent),
        "each player" | "all players" | "every player" => Some(PlayerTarget::EachPlayer),
        "that player" | "that character's player" => Some(PlayerTarget::Triggering),
        _ => None,
    }
}

static COUNT_HAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^cards? in ",
        r"(?P<who>your|each opponent's|an opponent's|your opponents'|their) hands?$"
    ))
    .expect("valid regex")
});

static COUNT_DISCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?P<filter>.+?) in your discard$").expect("valid regex"));

/// Parse what a "for each ..." counts.
#[must_use]
pub fn counted(phrase: &str) -> Option<Count> {
    let phrase = phrase.trim().trim_end_matches('.');
    let lower = phrase.to_ascii_lowercase();
    match lower.as_str() {
        "damage on this character" | "damage counter on this character" | "damage on it" => {
            return Some(Count::DamageOnSource)
        }
        "card in your inkwell" | "ink in your inkwell" => {
            return Some(Count::InkwellSize(PlayerTarget::You))
        }
        _ => {}
    }
    if let Some(caps) = COUNT_HAND.captures(phrase) {
        let who = match caps["who"].to_ascii_lowercase().as_str() {
            "your" => PlayerTarget::You,
            _ => PlayerTarget::Opponent,
        };
        return Some(Count::CardsInHand(who));
    }
    if let Some(caps) = COUNT_DISCARD.captures(phrase) {
        let filter = filter(&caps["filter"])?;
        let filter = TargetFilter {
            zone: None,
            ..filter
        };
        return Some(Count::CardsInDiscard(PlayerTarget::You, filter));
    }
    filter(phrase).map(Count::InPlay)
}

/// "N or more" / "a" / "N" to a threshold.
#[must_use]
pub fn threshold(word: &str) -> Option<u32> {
    let word = word.trim();
    let head = word.split_whitespace().next()?;
    count(head)
}

/// Comparison phrase: "3 or more", "no".
#[must_use]
pub fn compare_phrase(phrase: &str) -> Option<Comparison> {
    let mut words = phrase.split_whitespace();
    let n = number(words.next()?)?;
    let rest: Vec<&str> = words.collect();
    let dir = (!rest.is_empty()).then(|| rest.join(" "));
    Some(comparison(n, dir.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;
    use crate::effects::Ownership;

    fn action() -> Scope {
        Scope::new(AbilityMode::Action)
    }

    #[test]
    fn test_filter_prefixes_and_noun() {
        let f = filter("another exerted Villain character").unwrap();
        assert!(f.exclude_self);
        assert_eq!(f.status, Some(Status::Exerted));
        assert_eq!(f.classification.as_deref(), Some("Villain"));
        assert_eq!(f.card_types.as_slice(), &[CardType::Character]);
    }

    #[test]
    fn test_filter_suffixes() {
        let f = filter("opposing character with cost 3 or less").unwrap();
        assert_eq!(f.ownership, Ownership::Opposing);
        assert_eq!(f.cost, Some(Comparison::at_most(3)));

        let f = filter("character with 2 {S} or more").unwrap();
        assert_eq!(f.strength, Some(Comparison::at_least(2)));

        let f = filter("character named Stitch").unwrap();
        assert_eq!(f.name.as_deref(), Some("Stitch"));

        let f = filter("characters of yours here").unwrap();
        assert_eq!(f.ownership, Ownership::Yours);
        assert!(f.at_source_location);

        let f = filter("character with Evasive").unwrap();
        assert_eq!(f.keyword, Some(KeywordKind::Evasive));
    }

    #[test]
    fn test_filter_multiple_types() {
        let f = filter("character or location").unwrap();
        assert!(f.card_types.contains(&CardType::Character));
        assert!(f.card_types.contains(&CardType::Location));

        let f = filter("an action card").unwrap();
        assert_eq!(f.card_types.as_slice(), &[CardType::Action]);
    }

    #[test]
    fn test_filter_rejects_unknown_words() {
        assert!(filter("character that sang a song").is_none());
        assert!(filter("Villain").is_none());
        assert!(filter("").is_none());
    }

    #[test]
    fn test_chosen_targets() {
        let Some(Target::Chosen { filter, count }) = target("chosen opposing character", &action())
        else {
            panic!("expected chosen target");
        };
        assert_eq!(filter.ownership, Ownership::Opposing);
        assert_eq!(count, TargetCount::Exactly(1));

        let Some(Target::Chosen { count, .. }) = target("up to 2 chosen characters", &action())
        else {
            panic!("expected chosen target");
        };
        assert_eq!(count, TargetCount::UpTo(2));

        let chosen = target("another chosen character of yours", &action());
        let Some(Target::Chosen { filter, .. }) = chosen else {
            panic!("expected chosen target");
        };
        assert!(filter.exclude_self);
        assert_eq!(filter.ownership, Ownership::Yours);
    }

    #[test]
    fn test_static_scope_refuses_choices() {
        assert!(target("chosen character", &Scope::new(AbilityMode::Static)).is_none());
        assert!(matches!(
            target("your other characters", &Scope::new(AbilityMode::Static)),
            Some(Target::All(_))
        ));
    }

    #[test]
    fn test_all_and_plural_targets() {
        assert!(matches!(target("each opposing character", &action()), Some(Target::All(_))));
        assert!(matches!(target("all damaged characters", &action()), Some(Target::All(_))));
        assert!(matches!(target("your Hero characters", &action()), Some(Target::All(_))));
        assert!(matches!(target("one of your items", &action()), Some(Target::Chosen { .. })));
    }

    #[test]
    fn test_back_references() {
        assert_eq!(target("this character", &action()), Some(Target::This));
        assert_eq!(target("them", &action()), Some(Target::This));
        assert_eq!(target("them", &action().with_previous()), Some(Target::Previous));
        let triggered = Scope::new(AbilityMode::Triggered);
        assert_eq!(target("that character", &triggered), Some(Target::Triggering));
    }

    #[test]
    fn test_players_and_counts() {
        assert_eq!(player("each opponent"), Some(PlayerTarget::Opponent));
        assert_eq!(player("You"), Some(PlayerTarget::You));
        assert_eq!(player("each player"), Some(PlayerTarget::EachPlayer));

        assert_eq!(counted("card in your hand"), Some(Count::CardsInHand(PlayerTarget::You)));
        assert_eq!(counted("damage on this character"), Some(Count::DamageOnSource));
        let Some(Count::InPlay(f)) = counted("other character you have in play") else {
            panic!("expected in-play count");
        };
        assert!(f.exclude_self);
        assert_eq!(f.ownership, Ownership::Yours);
        assert!(matches!(
            counted("character card in your discard"),
            Some(Count::CardsInDiscard(..))
        ));
    }

    #[test]
    fn test_compare_phrase() {
        assert_eq!(compare_phrase("3 or more"), Some(Comparison::at_least(3)));
        assert_eq!(compare_phrase("no"), Some(Comparison::exactly(0)));
    }
}
