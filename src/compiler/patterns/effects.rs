//! Effect clauses and the sentence grammar around them.
//!
//! [`parse`] splits an ability body into sentences, peels the control-flow
//! wrappers ("you may", "if ...", "for each ...", "Choose one:") and hands
//! the remaining clauses to [`EFFECT_RULES`]. Every clause must match or
//! the whole body is rejected; a partially modeled ability is worse than a
//! missing one.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::conditions::condition;
use super::numbers::{count, number, signed, stat};
use super::target::{back_reference, counted, filter, player, target};
use super::{first_match, group, num, PatternRule, Scope};
use crate::effects::{
    Amount, Chooser, Duration, Effect, EffectKind, Keyword, KeywordKind, LookDestination, LookPlan,
    PlayerTarget, Restriction, Stat, Target, TargetCount, TargetFilter,
};

/// Duration suffix shared by modifier rules.
macro_rules! dur {
    () => {
        concat!(
            r"(?P<dur> this turn| for the rest of this turn| until the start of your next turn",
            r"| during their next turn| until the end of (?:the|this) turn)?"
        )
    };
}

/// Subject of a third-person verb: "each opponent draws".
macro_rules! who {
    () => {
        r"(?P<who>each player|each opponent|chosen opponent|your opponent|that player|you)"
    };
}

fn duration(caps: &Captures<'_>, scope: &Scope) -> Duration {
    match group(caps, "dur").map(str::to_ascii_lowercase) {
        Some(d) if d.contains("start of your next turn") => Duration::UntilStartOfYourNextTurn,
        Some(d) if d.contains("their next turn") => Duration::DuringTheirNextTurn,
        Some(_) => Duration::ThisTurn,
        None => scope.default_duration(),
    }
}

fn who(caps: &Captures<'_>) -> Option<PlayerTarget> {
    match group(caps, "who") {
        Some(phrase) => player(phrase),
        None => Some(PlayerTarget::You),
    }
}

fn n(caps: &Captures<'_>) -> Option<i32> {
    number(group(caps, "n")?)
}

fn target_of(caps: &Captures<'_>, name: &str, scope: &Scope) -> Option<Target> {
    target(group(caps, name)?, scope)
}

/// Whose stat an "equal to" amount reads.
fn stat_owner(phrase: &str, scope: &Scope) -> Option<Target> {
    match phrase.trim().to_ascii_lowercase().as_str() {
        "this character's" | "this character" | "his" | "her" => Some(Target::This),
        "its" | "their" | "that character's" | "the chosen character's" | "them" => {
            Some(back_reference(scope))
        }
        _ => None,
    }
}

fn amount_upto(caps: &Captures<'_>) -> Option<Amount> {
    let value = n(caps)?;
    Some(if caps.name("upto").is_some() {
        Amount::UpTo(value)
    } else {
        Amount::Fixed(value)
    })
}

fn keyword(caps: &Captures<'_>) -> Option<Keyword> {
    let kind = KeywordKind::from_name(group(caps, "kw")?)?;
    let value = match group(caps, "v") {
        Some(v) if kind.takes_value() => signed(v)?,
        Some(_) => return None,
        None if kind.takes_value() => return None,
        None => 0,
    };
    Some(Keyword::with_value(kind, value))
}

fn restriction(word: &str) -> Option<Restriction> {
    match word.to_ascii_lowercase().as_str() {
        "quest" => Some(Restriction::CantQuest),
        "challenge" => Some(Restriction::CantChallenge),
        "ready" => Some(Restriction::CantReady),
        "sing songs" | "sing" => Some(Restriction::CantSing),
        "move" | "move to locations" => Some(Restriction::CantMove),
        _ => None,
    }
}

/// One clause, one effect.
pub static EFFECT_RULES: LazyLock<Vec<PatternRule<Effect>>> = LazyLock::new(|| {
    vec![
        // === Card movement ===
        PatternRule::new(
            "draw_until",
            concat!(r"draw cards until you have ", num!("n"), r" cards in your hand"),
            |caps, _| {
                Some(Effect::new(EffectKind::DrawUntil {
                    who: PlayerTarget::You,
                    hand_size: count(group(caps, "n")?)?,
                }))
            },
        ),
        PatternRule::new(
            "draw_for_each",
            concat!(
                r"(?:",
                who!(),
                r" draws?|draw) ",
                num!("n"),
                r" cards? for each (?P<count>.+)"
            ),
            |caps, _| {
                Some(Effect::new(EffectKind::Draw {
                    who: who(caps)?,
                    amount: Amount::for_each(n(caps)?, counted(group(caps, "count")?)?),
                }))
            },
        ),
        PatternRule::new(
            "draw",
            concat!(r"(?:", who!(), r" draws?|draw) ", num!("n"), r" cards?"),
            |caps, _| {
                Some(Effect::new(EffectKind::Draw {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                }))
            },
        ),
        PatternRule::new(
            "discard_hand",
            concat!(r"(?:", who!(), r" discards? (?:their|his or her) hand|discard your hand)"),
            |caps, _| Some(Effect::new(EffectKind::DiscardHand { who: who(caps)? })),
        ),
        PatternRule::new(
            "discard_random",
            concat!(r"(?:", who!(), r" discards?|discard) ", num!("n"), r" cards? at random"),
            |caps, _| {
                Some(Effect::new(EffectKind::Discard {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                    random: true,
                }))
            },
        ),
        PatternRule::new(
            "discard",
            concat!(
                r"(?:",
                who!(),
                r" (?:chooses and )?discards?|(?:choose and )?discard) ",
                num!("n"),
                r" cards?"
            ),
            |caps, _| {
                Some(Effect::new(EffectKind::Discard {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                    random: false,
                }))
            },
        ),
        PatternRule::new(
            "return_from_discard",
            concat!(
                r"return (?P<upto>up to )?",
                num!("n"),
                r" (?P<f>.+?) from your discard to your hand"
            ),
            |caps, _| {
                let n = count(group(caps, "n")?)?;
                Some(Effect::new(EffectKind::ReturnFromDiscard {
                    filter: filter(group(caps, "f")?)?,
                    count: if caps.name("upto").is_some() {
                        TargetCount::UpTo(n)
                    } else {
                        TargetCount::Exactly(n)
                    },
                }))
            },
        ),
        PatternRule::new(
            "return_to_hand",
            concat!(
                r"return (?P<t>.+?) to (?:their|its|his|her|your)",
                r"(?: owner's| player's|s? players'?)? hands?"
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::ReturnToHand {
                    target: target_of(caps, "t", scope)?,
                }))
            },
        ),
        PatternRule::new(
            "ink_from_deck",
            r"put the top card of your deck into your inkwell(?: facedown)?(?P<ex> and exerted)?",
            |caps, _| {
                Some(Effect::new(EffectKind::InkFromDeck {
                    who: PlayerTarget::You,
                    exerted: caps.name("ex").is_some(),
                }))
            },
        ),
        PatternRule::new(
            "put_into_inkwell",
            concat!(
                r"put (?P<t>.+?) into (?:its|their|your)(?: owner's| player's)? inkwell",
                r"(?: facedown)?(?P<ex> and exerted)?"
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::PutIntoInkwell {
                    target: target_of(caps, "t", scope)?,
                    exerted: caps.name("ex").is_some(),
                }))
            },
        ),
        PatternRule::new(
            "shuffle_into_deck",
            r"shuffle (?P<t>.+?) into (?:its|their|your)(?: owner's| player's)? decks?",
            |caps, scope| {
                Some(Effect::new(EffectKind::ShuffleIntoDeck {
                    target: target_of(caps, "t", scope)?,
                }))
            },
        ),
        PatternRule::new(
            "put_on_bottom",
            r"put (?P<t>.+?) on the bottom of (?:its|their|your)(?: owner's| player's)? decks?",
            |caps, scope| {
                Some(Effect::new(EffectKind::PutOnBottom {
                    target: target_of(caps, "t", scope)?,
                }))
            },
        ),
        PatternRule::new(
            "mill",
            concat!(
                r"(?:",
                who!(),
                r" puts?|put) the top ",
                num!("n"),
                r" cards? of (?:your|their|his or her) deck into (?:your|their|his or her) discard"
            ),
            |caps, _| {
                Some(Effect::new(EffectKind::Mill {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                }))
            },
        ),
        PatternRule::new(
            "play_for_free",
            r"play (?:a|an) (?P<f>.+?) (?:from your hand )?for free",
            |caps, _| {
                Some(Effect::new(EffectKind::PlayForFree {
                    filter: filter(group(caps, "f")?)?,
                }))
            },
        ),
        // === Stats, keywords, restrictions ===
        PatternRule::new(
            "modify_two_stats",
            concat!(
                r"(?P<t>.+?) gets? (?P<a>[+-]\d+) (?P<s1>\{[SWL]\})",
                r" and (?P<b>[+-]\d+) (?P<s2>\{[SWL]\})",
                dur!()
            ),
            |caps, scope| {
                let first = target_of(caps, "t", scope)?;
                let second = if first.needs_choice() { Target::Previous } else { first.clone() };
                let duration = duration(caps, scope);
                Some(Effect::sequence(vec![
                    Effect::modify(
                        first,
                        stat(group(caps, "s1")?)?,
                        signed(group(caps, "a")?)?,
                        duration,
                    ),
                    Effect::modify(
                        second,
                        stat(group(caps, "s2")?)?,
                        signed(group(caps, "b")?)?,
                        duration,
                    ),
                ]))
            },
        ),
        PatternRule::new(
            "modify_for_each",
            concat!(
                r"(?P<t>.+?) gets? (?P<a>[+-]\d+) (?P<s>\{[SWL]\})",
                dur!(),
                r" for each (?P<count>.+?)"
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::ModifyStats {
                    target: target_of(caps, "t", scope)?,
                    stat: stat(group(caps, "s")?)?,
                    amount: Amount::for_each(
                        signed(group(caps, "a")?)?,
                        counted(group(caps, "count")?)?,
                    ),
                    duration: duration(caps, scope),
                }))
            },
        ),
        PatternRule::new(
            "modify_stat",
            concat!(r"(?P<t>.+?) gets? (?P<a>[+-]\d+) (?P<s>\{[SWL]\})", dur!()),
            |caps, scope| {
                Some(Effect::modify(
                    target_of(caps, "t", scope)?,
                    stat(group(caps, "s")?)?,
                    signed(group(caps, "a")?)?,
                    duration(caps, scope),
                ))
            },
        ),
        PatternRule::new(
            "grant_keyword",
            concat!(
                r"(?P<t>.+?) gains? (?P<kw>sing together|[a-z]+)(?: (?P<v>[+-]?\d+))?(?: \{I\})?",
                dur!()
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::GrantKeyword {
                    target: target_of(caps, "t", scope)?,
                    keyword: keyword(caps)?,
                    duration: duration(caps, scope),
                }))
            },
        ),
        PatternRule::new(
            "cant_be_challenged",
            concat!(r"(?P<t>.+?) can't be challenged", dur!()),
            |caps, scope| {
                Some(Effect::new(EffectKind::Restrict {
                    target: target_of(caps, "t", scope)?,
                    restriction: Restriction::CantBeChallenged,
                    duration: duration(caps, scope),
                }))
            },
        ),
        PatternRule::new(
            "cant_ready_next_turn",
            concat!(
                r"(?P<t>.+?) can't ready at the start of ",
                r"(?P<whose>your|their|its owner's|his|her) next turn"
            ),
            |caps, scope| {
                let duration = match group(caps, "whose")?.to_ascii_lowercase().as_str() {
                    "your" => Duration::UntilStartOfYourNextTurn,
                    _ => Duration::DuringTheirNextTurn,
                };
                Some(Effect::new(EffectKind::Restrict {
                    target: target_of(caps, "t", scope)?,
                    restriction: Restriction::CantReady,
                    duration,
                }))
            },
        ),
        PatternRule::new(
            "restrict",
            concat!(
                r"(?P<t>.+?) can't (?P<r>quest|challenge|ready|sing songs|move to locations|move)",
                dur!()
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::Restrict {
                    target: target_of(caps, "t", scope)?,
                    restriction: restriction(group(caps, "r")?)?,
                    duration: duration(caps, scope),
                }))
            },
        ),
        PatternRule::new(
            "cost_reduction_next",
            concat!(
                r"you pay ",
                num!("n"),
                r" \{I\} less (?:to play|for) the next (?P<f>.+?) you play this turn"
            ),
            |caps, _| {
                Some(Effect::new(EffectKind::CostReduction {
                    amount: n(caps)?,
                    filter: filter(group(caps, "f")?)?,
                    duration: Duration::ThisTurn,
                    next_only: true,
                }))
            },
        ),
        PatternRule::new(
            "cost_reduction",
            concat!(r"you pay ", num!("n"), r" \{I\} less to play (?P<f>.+?)", dur!()),
            |caps, scope| {
                Some(Effect::new(EffectKind::CostReduction {
                    amount: n(caps)?,
                    filter: filter(group(caps, "f")?)?,
                    duration: duration(caps, scope),
                    next_only: false,
                }))
            },
        ),
        PatternRule::new(
            "cards_cost_less",
            concat!(r"(?P<f>.+?) cost ", num!("n"), r" \{I\} less(?: to play)?", dur!()),
            |caps, scope| {
                Some(Effect::new(EffectKind::CostReduction {
                    amount: n(caps)?,
                    filter: filter(group(caps, "f")?)?,
                    duration: duration(caps, scope),
                    next_only: false,
                }))
            },
        ),
        PatternRule::new(
            "prevent_damage",
            concat!(r"(?P<t>.+?) (?:takes?|can't be dealt) no damage from challenges", dur!()),
            |caps, scope| {
                Some(Effect::new(EffectKind::PreventDamage {
                    target: target_of(caps, "t", scope)?,
                    duration: duration(caps, scope),
                }))
            },
        ),
        // === Readiness ===
        PatternRule::new("exert", r"exert (?P<t>.+)", |caps, scope| {
            Some(Effect::new(EffectKind::Exert {
                target: target_of(caps, "t", scope)?,
            }))
        }),
        PatternRule::new("ready", r"ready (?P<t>.+)", |caps, scope| {
            Some(Effect::new(EffectKind::Ready {
                target: target_of(caps, "t", scope)?,
            }))
        }),
        // === Damage ===
        PatternRule::new(
            "damage_equal_to_stat",
            r"deal damage to (?P<t>.+?) equal to (?P<whose>.+?) (?P<s>\{[SWL]\})",
            |caps, scope| {
                Some(Effect::new(EffectKind::DealDamage {
                    target: target_of(caps, "t", scope)?,
                    amount: Amount::StatOf {
                        target: Box::new(stat_owner(group(caps, "whose")?, scope)?),
                        stat: stat(group(caps, "s")?)?,
                    },
                }))
            },
        ),
        PatternRule::new(
            "distribute_damage",
            concat!(
                r"(?:deal ",
                num!("n"),
                r" damage divided as you choose among|distribute ",
                num!("m"),
                r" damage among) (?P<f>.+)"
            ),
            |caps, _| {
                let amount = group(caps, "n").or_else(|| group(caps, "m"))?;
                Some(Effect::new(EffectKind::DistributeDamage {
                    amount: count(amount)?,
                    filter: filter(group(caps, "f")?)?,
                }))
            },
        ),
        PatternRule::new(
            "damage_for_each",
            concat!(r"deal ", num!("n"), r" damage to (?P<t>.+?) for each (?P<count>.+)"),
            |caps, scope| {
                Some(Effect::new(EffectKind::DealDamage {
                    target: target_of(caps, "t", scope)?,
                    amount: Amount::for_each(n(caps)?, counted(group(caps, "count")?)?),
                }))
            },
        ),
        PatternRule::new(
            "damage",
            concat!(
                r"(?:deal|(?:this character|it|they|that character) deals?) ",
                num!("n"),
                r" damage to (?P<t>.+)"
            ),
            |caps, scope| Some(Effect::damage(target_of(caps, "t", scope)?, n(caps)?)),
        ),
        PatternRule::new(
            "damage_counters",
            concat!(r"put ", num!("n"), r" damage counters? on (?P<t>.+)"),
            |caps, scope| Some(Effect::damage(target_of(caps, "t", scope)?, n(caps)?)),
        ),
        PatternRule::new("remove_all_damage", r"remove all damage from (?P<t>.+)", |caps, scope| {
            Some(Effect::new(EffectKind::RemoveDamage {
                target: target_of(caps, "t", scope)?,
                amount: Amount::All,
            }))
        }),
        PatternRule::new(
            "remove_damage",
            concat!(
                r"remove (?P<upto>up to )?",
                num!("n"),
                r" damage(?: counters?)? from (?P<t>.+)"
            ),
            |caps, scope| {
                Some(Effect::new(EffectKind::RemoveDamage {
                    target: target_of(caps, "t", scope)?,
                    amount: amount_upto(caps)?,
                }))
            },
        ),
        PatternRule::new(
            "move_damage",
            concat!(
                r"move (?:(?P<all>all)|(?P<upto>up to )?",
                num!("n"),
                r") damage(?: counters?)? from (?P<from>.+?) to (?P<to>.+)"
            ),
            |caps, scope| {
                let amount = if caps.name("all").is_some() {
                    Amount::All
                } else {
                    amount_upto(caps)?
                };
                let from = target_of(caps, "from", scope)?;
                // "to another chosen character" after a chosen source.
                let to_scope = if from.needs_choice() { scope.with_previous() } else { *scope };
                Some(Effect::new(EffectKind::MoveDamage {
                    from,
                    to: target_of(caps, "to", &to_scope)?,
                    amount,
                }))
            },
        ),
        // === Lore ===
        PatternRule::new(
            "gain_lore_equal_to_stat",
            r"gain lore equal to (?P<whose>.+?) \{L\}",
            |caps, scope| {
                Some(Effect::new(EffectKind::GainLore {
                    who: PlayerTarget::You,
                    amount: Amount::StatOf {
                        target: Box::new(stat_owner(group(caps, "whose")?, scope)?),
                        stat: Stat::Lore,
                    },
                }))
            },
        ),
        PatternRule::new(
            "gain_lore_for_each",
            concat!(r"(?:", who!(), r" gains?|gain) ", num!("n"), r" lore for each (?P<count>.+)"),
            |caps, _| {
                Some(Effect::new(EffectKind::GainLore {
                    who: who(caps)?,
                    amount: Amount::for_each(n(caps)?, counted(group(caps, "count")?)?),
                }))
            },
        ),
        PatternRule::new(
            "gain_lore",
            concat!(r"(?:", who!(), r" gains?|gain) ", num!("n"), r" lore"),
            |caps, _| {
                Some(Effect::new(EffectKind::GainLore {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                }))
            },
        ),
        PatternRule::new(
            "lose_lore",
            concat!(r"(?:", who!(), r" loses?|lose) ", num!("n"), r" lore"),
            |caps, _| {
                Some(Effect::new(EffectKind::LoseLore {
                    who: who(caps)?,
                    amount: Amount::Fixed(n(caps)?),
                }))
            },
        ),
        // Plain removal last: "banish" swallows any target phrase.
        PatternRule::new("banish", r"banish (?P<t>.+)", |caps, scope| {
            Some(Effect::banish(target_of(caps, "t", scope)?))
        }),
    ]
});

/// Rules that span sentences.
pub static BLOCK_RULES: LazyLock<Vec<PatternRule<Effect>>> = LazyLock::new(|| {
    vec![
        PatternRule::new(
            "look_reveal_to_hand",
            concat!(
                r"look at the top ",
                num!("n"),
                r" cards of your deck\. you may reveal (?:a|an) (?P<f>.+?) and ",
                r"put (?:it|that card) into your hand\. ",
                r"(?:put|place) the rest on the (?P<rest>top|bottom) of your deck",
                r"(?: in any order)?\.?"
            ),
            |caps, _| look(caps, filter(group(caps, "f")?), TargetCount::UpTo(1)),
        ),
        PatternRule::new(
            "look_one_to_hand",
            concat!(
                r"look at the top ",
                num!("n"),
                r" cards of your deck\. put one (?:of them )?into your hand and ",
                r"(?:put |place )?the rest on the ",
                r"(?P<rest>top|bottom) of your deck(?: in any order)?\.?"
            ),
            |caps, _| look(caps, None, TargetCount::Exactly(1)),
        ),
        PatternRule::new(
            "look_reorder",
            concat!(
                r"look at the top ",
                num!("n"),
                r" cards of your deck\. put them (?:back )?on the (?P<rest>top|bottom)",
                r" of your deck in any order\.?"
            ),
            |caps, _| look(caps, None, TargetCount::Exactly(0)),
        ),
        PatternRule::new(
            "look_top_or_bottom",
            concat!(
                r"look at the top card of your deck\. ",
                r"put it on either the top or the bottom of your deck\.?"
            ),
            |_, _| {
                Some(Effect::new(EffectKind::LookAtTop {
                    who: PlayerTarget::You,
                    count: 1,
                    plan: LookPlan {
                        filter: None,
                        take: TargetCount::UpTo(1),
                        to: LookDestination::BottomOfDeck,
                        rest: LookDestination::TopOfDeck,
                    },
                }))
            },
        ),
        PatternRule::new(
            "tutor",
            concat!(
                r"search your deck for (?:a|an) (?P<f>.+?) and ",
                r"(?:reveal (?:it|that card) to all players and )?",
                r"put (?:it|that card) into your hand\.(?: (?:then,? )?shuffle your deck\.?)?"
            ),
            |caps, _| {
                Some(Effect::new(EffectKind::Tutor {
                    filter: filter(group(caps, "f")?)?,
                }))
            },
        ),
    ]
});

fn look(caps: &Captures<'_>, filter: Option<TargetFilter>, take: TargetCount) -> Option<Effect> {
    let rest = match group(caps, "rest")?.to_ascii_lowercase().as_str() {
        "top" => LookDestination::TopOfDeck,
        _ => LookDestination::BottomOfDeck,
    };
    Some(Effect::new(EffectKind::LookAtTop {
        who: PlayerTarget::You,
        count: count(group(caps, "n")?)?,
        plan: LookPlan {
            filter,
            take,
            to: LookDestination::Hand,
            rest,
        },
    }))
}

static IF_INSTEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^if (?P<cond>.+?), (?P<body>.+?) instead$").expect("valid regex")
});

static IF_THEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^if (?P<cond>.+?), (?P<body>.+)$").expect("valid regex"));

static FOR_EACH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^for each (?P<count>.+?), (?P<body>.+)$").expect("valid regex")
});

static YOU_MAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^you may (?P<body>.+)$").expect("valid regex"));

static OPPONENT_CHOOSES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^each opponent chooses ",
        num!("n"),
        r" of their (?P<f>.+?) and (?P<verb>[a-z]+?)(?:es|s) (?P<rest>.+)$"
    ))
    .expect("valid regex")
});

/// Parse an ability body into effects.
#[must_use]
pub fn parse(text: &str, scope: &Scope) -> Option<Vec<Effect>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some((_, effect)) = first_match(&BLOCK_RULES, text, scope) {
        return Some(vec![effect]);
    }
    if let Some(modal) = modal(text, scope) {
        return Some(vec![modal]);
    }

    let mut out: Vec<Effect> = Vec::new();
    let mut scope = *scope;
    for sentence in sentences(text) {
        if let Some(caps) = IF_INSTEAD.captures(sentence) {
            // Replaces what the previous sentence would have done.
            let base = out.pop()?;
            let effect = Effect::new(EffectKind::ConditionalAction {
                condition: condition(&caps["cond"], &scope)?,
                base: vec![base],
                replacement: vec![body(&caps["body"], &scope)?],
            });
            out.push(effect);
            continue;
        }
        let effect = sentence_effect(sentence, &scope)?;
        if refers_to_cards(&effect) {
            scope = scope.with_previous();
        }
        out.push(effect);
    }
    (!out.is_empty()).then_some(out)
}

/// Split on sentence ends, keeping "Then, ..." attached as its own sentence.
fn sentences(text: &str) -> Vec<&str> {
    text.split(". ")
        .map(|s| s.trim().trim_end_matches('.').trim())
        .map(|s| {
            s.strip_prefix("Then, ")
                .or_else(|| s.strip_prefix("then, "))
                .or_else(|| s.strip_prefix("Then "))
                .unwrap_or(s)
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn sentence_effect(sentence: &str, scope: &Scope) -> Option<Effect> {
    if let Some(caps) = IF_THEN.captures(sentence) {
        if let Some(cond) = condition(&caps["cond"], scope) {
            let then = body(&caps["body"], scope)?;
            return Some(Effect::new(EffectKind::Conditional {
                condition: cond,
                then: vec![then],
            }));
        }
    }
    if let Some(caps) = FOR_EACH.captures(sentence) {
        if let Some(count) = counted(&caps["count"]) {
            let effects = vec![body(&caps["body"], scope)?];
            return Some(Effect::new(EffectKind::ForEach { count, effects }));
        }
    }
    body(sentence, scope)
}

/// "you may ..." wrapper around a clause chain.
fn body(text: &str, scope: &Scope) -> Option<Effect> {
    if let Some(caps) = YOU_MAY.captures(text) {
        return chain(&caps["body"], scope).map(Effect::optional);
    }
    chain(text, scope)
}

/// Clauses joined by "then" or by "to" ("banish one of your items to draw 2
/// cards").
fn chain(text: &str, scope: &Scope) -> Option<Effect> {
    for sep in [", then ", " and then ", ". then "] {
        if let Some((first, rest)) = text.split_once(sep) {
            return join(first, rest, scope);
        }
    }
    if let Some(effect) = clause(text, scope) {
        return Some(effect);
    }
    for sep in [" to ", " and ", ", "] {
        let mut at = 0;
        while let Some(pos) = text[at..].find(sep) {
            let split = at + pos;
            if let Some(effect) = join(&text[..split], &text[split + sep.len()..], scope) {
                return Some(effect);
            }
            at = split + sep.len();
        }
    }
    None
}

fn join(first: &str, rest: &str, scope: &Scope) -> Option<Effect> {
    let head = clause(first, scope)?;
    let scope = if refers_to_cards(&head) { scope.with_previous() } else { *scope };
    let tail = chain(rest, &scope)?;
    let mut effects = vec![head];
    match tail.kind {
        EffectKind::Sequence(more) if !tail.optional => effects.extend(more),
        _ => effects.push(tail),
    }
    Some(Effect::sequence(effects))
}

/// A single clause.
fn clause(text: &str, scope: &Scope) -> Option<Effect> {
    let text = text.trim().trim_end_matches(['.', ',']);
    if let Some(effect) = opponent_chooses(text, scope) {
        return Some(effect);
    }
    first_match(&EFFECT_RULES, text, scope).map(|(_, effect)| effect)
}

/// "each opponent chooses one of their characters and banishes it"
fn opponent_chooses(text: &str, scope: &Scope) -> Option<Effect> {
    let caps = OPPONENT_CHOOSES.captures(text)?;
    let n = count(&caps["n"])?;
    let chosen = Target::Chosen {
        filter: filter(&caps["f"])?.opposing(),
        count: TargetCount::Exactly(n),
    };
    let imperative =
        format!("{} {}", &caps["verb"], &caps["rest"]).replace(" their ", " its owner's ");
    let effect = first_match(&EFFECT_RULES, &imperative, &scope.with_previous())?.1;
    Some(retarget(effect, chosen)?.chosen_by(Chooser::Opponent))
}

/// Swap a back-reference target for a concrete one.
fn retarget(mut effect: Effect, to: Target) -> Option<Effect> {
    let slot = match &mut effect.kind {
        EffectKind::Banish { target }
        | EffectKind::ReturnToHand { target }
        | EffectKind::PutIntoInkwell { target, .. }
        | EffectKind::ShuffleIntoDeck { target }
        | EffectKind::PutOnBottom { target }
        | EffectKind::Exert { target }
        | EffectKind::Ready { target }
        | EffectKind::DealDamage { target, .. } => target,
        _ => return None,
    };
    if *slot != Target::Previous {
        return None;
    }
    *slot = to;
    Some(effect)
}

static MODAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^choose one:?\s*(?P<options>.+)$").expect("valid regex"));

/// "Choose one: • A. • B."
fn modal(text: &str, scope: &Scope) -> Option<Effect> {
    let caps = MODAL.captures(text)?;
    let options: Vec<Vec<Effect>> = caps["options"]
        .split('•')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| parse(o, scope))
        .collect::<Option<_>>()?;
    (options.len() >= 2).then(|| Effect::new(EffectKind::Modal { options }))
}

/// Whether later text may refer back to this effect's cards.
fn refers_to_cards(effect: &Effect) -> bool {
    effect.kind.target().is_some_and(Target::needs_choice)
        || matches!(
            effect.kind,
            EffectKind::ReturnFromDiscard { .. }
                | EffectKind::PlayForFree { .. }
                | EffectKind::Tutor { .. }
        )
        || effect.children().any(refers_to_cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::patterns::AbilityMode;
    use crate::effects::Ownership;
    use crate::triggers::Condition;

    fn action() -> Scope {
        Scope::new(AbilityMode::Action)
    }

    fn one(text: &str, scope: &Scope) -> Effect {
        let mut effects = parse(text, scope).unwrap_or_else(|| panic!("no parse: {text}"));
        assert_eq!(effects.len(), 1, "{text}");
        effects.remove(0)
    }

    #[test]
    fn test_draw() {
        assert_eq!(one("Draw a card.", &action()), Effect::draw(1));
        assert_eq!(one("Draw 2 cards.", &action()), Effect::draw(2));
        let effect = one("Each opponent draws a card.", &action());
        assert!(matches!(
            effect.kind,
            EffectKind::Draw {
                who: PlayerTarget::Opponent,
                ..
            }
        ));
    }

    #[test]
    fn test_damage_to_chosen() {
        let effect = one("Deal 2 damage to chosen character.", &action());
        let EffectKind::DealDamage { target, amount } = effect.kind else {
            panic!("expected damage");
        };
        assert_eq!(amount, Amount::Fixed(2));
        assert!(matches!(target, Target::Chosen { .. }));
    }

    #[test]
    fn test_gain_lore_for_each() {
        let effect = one("Gain 1 lore for each character you have in play.", &action());
        let EffectKind::GainLore {
            amount: Amount::ForEach { per, count },
            ..
        } = effect.kind
        else {
            panic!("expected counted lore");
        };
        assert_eq!(per, 1);
        assert!(matches!(*count, crate::effects::Count::InPlay(_)));
    }

    #[test]
    fn test_optional_then_sequence() {
        let effect = one("You may draw a card, then choose and discard a card.", &action());
        assert!(effect.optional);
        let EffectKind::Sequence(steps) = effect.kind else {
            panic!("expected sequence");
        };
        assert_eq!(steps, vec![Effect::draw(1), Effect::discard(1)]);
    }

    #[test]
    fn test_cost_to_effect_chain() {
        let effect = one("you may banish one of your items to draw 2 cards", &action());
        assert!(effect.optional);
        let EffectKind::Sequence(steps) = effect.kind else {
            panic!("expected sequence");
        };
        assert!(matches!(steps[0].kind, EffectKind::Banish { .. }));
        assert_eq!(steps[1], Effect::draw(2));
    }

    #[test]
    fn test_modifier_durations() {
        let effect = one("Chosen character gets +2 {S} this turn.", &action());
        let EffectKind::ModifyStats { stat, duration, .. } = effect.kind else {
            panic!("expected modifier");
        };
        assert_eq!(stat, Stat::Strength);
        assert_eq!(duration, Duration::ThisTurn);

        let effect = one("Your characters get +1 {W}.", &Scope::new(AbilityMode::Static));
        let EffectKind::ModifyStats { target, duration, .. } = effect.kind else {
            panic!("expected modifier");
        };
        assert_eq!(duration, Duration::WhileActive);
        assert!(matches!(target, Target::All(f) if f.ownership == Ownership::Yours));
    }

    #[test]
    fn test_restrictions() {
        let text = "Chosen opposing character can't quest during their next turn.";
        let effect = one(text, &action());
        assert!(matches!(
            effect.kind,
            EffectKind::Restrict {
                restriction: Restriction::CantQuest,
                duration: Duration::DuringTheirNextTurn,
                ..
            }
        ));
        let text = "Chosen character can't ready at the start of their next turn.";
        let effect = one(text, &action());
        assert!(matches!(
            effect.kind,
            EffectKind::Restrict {
                restriction: Restriction::CantReady,
                duration: Duration::DuringTheirNextTurn,
                ..
            }
        ));
    }

    #[test]
    fn test_grant_keyword_with_value() {
        let effect = one("Chosen character gains Challenger +3 this turn.", &action());
        let EffectKind::GrantKeyword { keyword, .. } = effect.kind else {
            panic!("expected keyword grant");
        };
        assert_eq!(keyword, Keyword::with_value(KeywordKind::Challenger, 3));
    }

    #[test]
    fn test_conditional_and_instead() {
        let effect = one("If you have a Villain character in play, gain 2 lore.", &action());
        assert!(matches!(effect.kind, EffectKind::Conditional { .. }));

        let effect = one(
            "Deal 2 damage to chosen character. If you have a Villain character in play, deal 3 damage to chosen character instead.",
            &action(),
        );
        let EffectKind::ConditionalAction { condition, base, replacement } = effect.kind else {
            panic!("expected conditional action");
        };
        assert!(matches!(condition, Condition::YouControl { .. }));
        assert_eq!(base.len(), 1);
        assert_eq!(replacement.len(), 1);
    }

    #[test]
    fn test_back_reference_after_choice() {
        let effects = parse(
            "Ready chosen character. They can't quest for the rest of this turn.",
            &action(),
        )
        .unwrap();
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            &effects[1].kind,
            EffectKind::Restrict {
                target: Target::Previous,
                duration: Duration::ThisTurn,
                ..
            }
        ));
    }

    #[test]
    fn test_modal() {
        let effect = one("Choose one: • Draw a card. • Gain 1 lore.", &action());
        let EffectKind::Modal { options } = effect.kind else {
            panic!("expected modal");
        };
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_look_at_top() {
        let effect = one(
            "Look at the top 4 cards of your deck. You may reveal a song card and put it into your hand. Put the rest on the bottom of your deck in any order.",
            &action(),
        );
        let EffectKind::LookAtTop { count, plan, .. } = effect.kind else {
            panic!("expected look");
        };
        assert_eq!(count, 4);
        assert_eq!(plan.take, TargetCount::UpTo(1));
        assert_eq!(plan.rest, LookDestination::BottomOfDeck);
        assert!(plan.filter.is_some());
    }

    #[test]
    fn test_opponent_chooses() {
        let text = "Each opponent chooses one of their characters and banishes it.";
        let effect = one(text, &action());
        assert_eq!(effect.chooser, Chooser::Opponent);
        let EffectKind::Banish {
            target: Target::Chosen { filter, .. },
        } = effect.kind
        else {
            panic!("expected chosen banish");
        };
        assert_eq!(filter.ownership, Ownership::Opposing);
    }

    #[test]
    fn test_rejects_unknown_clause() {
        assert!(parse("Draw a card. Tap your head three times.", &action()).is_none());
        assert!(parse("", &action()).is_none());
    }
}
