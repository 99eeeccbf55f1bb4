//! Ability compiler integration tests.
//!
//! Printed card text in, typed abilities out. These go through the public
//! registry so normalization, classification and the pattern tables are
//! exercised together.

use rust_lorcana::cards::{AbilityHint, AbilityText, Card, CardId, CardRegistry};
use rust_lorcana::compiler::AbilityCompiler;
use rust_lorcana::effects::{
    AbilityKind, Amount, Chooser, Cost, Duration, Effect, EffectKind, KeywordKind, PlayerTarget,
    Restriction, Stat, Target, TargetCount,
};
use rust_lorcana::triggers::{Condition, EventKind, TriggerFilter};

fn character(id: u32, text: &str) -> Card {
    Card::character(CardId::new(id), "Sample", 3)
        .with_version("Test Subject")
        .with_ability(text)
}

fn compile_one(text: &str) -> rust_lorcana::AbilityDefinition {
    let abilities = AbilityCompiler::new().compile(&character(1, text));
    assert_eq!(abilities.len(), 1, "expected one ability from {text:?}, got {abilities:?}");
    abilities.into_iter().next().unwrap()
}

// ============================================================================
// Keywords
// ============================================================================

#[test]
fn test_keyword_blocks() {
    let card = Card::character(CardId::new(1), "Mickey Mouse", 3)
        .with_ability("Evasive")
        .with_ability("Challenger +3 (While challenging, this character gets +3 {S}.)")
        .with_ability("Shift 5 (You may pay 5 {I} to play this on top of one of your characters named Mickey Mouse.)");
    let abilities = AbilityCompiler::new().compile(&card);

    let keywords: Vec<_> = abilities.iter().filter_map(|a| a.as_keyword()).collect();
    assert_eq!(keywords.len(), 3);
    assert_eq!(keywords[0].kind, KeywordKind::Evasive);
    assert_eq!((keywords[1].kind, keywords[1].value), (KeywordKind::Challenger, 3));
    assert_eq!((keywords[2].kind, keywords[2].value), (KeywordKind::Shift, 5));
}

#[test]
fn test_keyword_list_on_one_line() {
    let abilities = AbilityCompiler::new().compile(&character(1, "Rush, Ward"));
    let kinds: Vec<_> = abilities
        .iter()
        .filter_map(|a| a.as_keyword())
        .map(|k| k.kind)
        .collect();
    assert_eq!(kinds, vec![KeywordKind::Rush, KeywordKind::Ward]);
}

// ============================================================================
// Triggered abilities
// ============================================================================

#[test]
fn test_play_trigger_with_name() {
    let card = Card::character(CardId::new(1), "Stitch", 2)
        .with_version("New Dog")
        .with_ability("HAPPY TO SEE YOU When you play Stitch, draw a card.");
    let abilities = AbilityCompiler::new().compile(&card);

    assert_eq!(abilities.len(), 1);
    let ability = &abilities[0];
    assert_eq!(ability.name.as_deref(), Some("HAPPY TO SEE YOU"));
    assert_eq!(ability.raw_text, "When you play this character, draw a card.");
    assert_eq!(
        ability.kind,
        AbilityKind::Triggered {
            event: EventKind::CardPlayed,
            filter: TriggerFilter::SubjectIsSelf,
        }
    );
    assert_eq!(ability.effects, vec![Effect::draw(1)]);
}

#[test]
fn test_quest_trigger_opponent_loses_lore() {
    let ability = compile_one("Whenever this character quests, each opponent loses 1 lore.");
    assert_eq!(
        ability.kind,
        AbilityKind::Triggered {
            event: EventKind::Quested,
            filter: TriggerFilter::SubjectIsSelf,
        }
    );
    assert_eq!(
        ability.effects,
        vec![Effect::new(EffectKind::LoseLore {
            who: PlayerTarget::Opponent,
            amount: Amount::Fixed(1),
        })]
    );
}

#[test]
fn test_end_of_turn_trigger() {
    let ability = compile_one("At the end of your turn, gain 1 lore.");
    assert_eq!(
        ability.kind,
        AbilityKind::Triggered {
            event: EventKind::TurnEnded,
            filter: TriggerFilter::PlayerIsController,
        }
    );
    assert_eq!(ability.effects, vec![Effect::gain_lore(1)]);
}

#[test]
fn test_optional_trigger_body() {
    let ability =
        compile_one("When you play this character, you may draw a card, then discard a card.");
    assert_eq!(ability.effects.len(), 1);
    let effect = &ability.effects[0];
    assert!(effect.optional);
    assert_eq!(effect.kind, EffectKind::Sequence(vec![Effect::draw(1), Effect::discard(1)]));
}

#[test]
fn test_back_reference_to_chosen() {
    let ability = compile_one(
        "When you play this character, ready chosen character. They can't quest for the rest of this turn.",
    );
    assert_eq!(ability.effects.len(), 2);
    assert!(matches!(
        ability.effects[0].kind,
        EffectKind::Ready {
            target: Target::Chosen { .. }
        }
    ));
    assert_eq!(
        ability.effects[1].kind,
        EffectKind::Restrict {
            target: Target::Previous,
            restriction: Restriction::CantQuest,
            duration: Duration::ThisTurn,
        }
    );
}

// ============================================================================
// Activated and static abilities
// ============================================================================

#[test]
fn test_activated_costs() {
    let ability = compile_one("{E}, 2 {I} — Deal 1 damage to chosen character.");
    let AbilityKind::Activated { costs } = &ability.kind else {
        panic!("expected activated, got {:?}", ability.kind);
    };
    assert_eq!(costs.as_slice(), &[Cost::Exert, Cost::Ink(2)]);
    assert!(matches!(
        &ability.effects[0].kind,
        EffectKind::DealDamage {
            target: Target::Chosen {
                count: TargetCount::Exactly(1),
                ..
            },
            amount: Amount::Fixed(1),
        }
    ));
}

#[test]
fn test_glyph_costs() {
    let ability = compile_one("⟳ - Draw a card.");
    assert_eq!(
        ability.kind,
        AbilityKind::Activated {
            costs: smallvec::smallvec![Cost::Exert]
        }
    );
    assert_eq!(ability.raw_text, "{E} — Draw a card.");
}

#[test]
fn test_static_gated_modifier() {
    let ability = compile_one("While this character is exerted, your other characters get +1 {S}.");
    assert!(ability.is_static());
    assert_eq!(ability.condition, Condition::SelfExerted);
    let EffectKind::ModifyStats { target, stat, amount, duration } = &ability.effects[0].kind else {
        panic!("expected a stat modifier, got {:?}", ability.effects[0].kind);
    };
    assert!(matches!(target, Target::All(_)));
    assert_eq!(*stat, Stat::Strength);
    assert_eq!(*amount, Amount::Fixed(1));
    assert_eq!(*duration, Duration::WhileActive);
}

#[test]
fn test_action_text_compiles_as_action_body() {
    let card = Card::action(CardId::new(9), "Fire the Cannons!", 1)
        .with_ability("Deal 2 damage to chosen character.");
    let abilities = AbilityCompiler::new().compile(&card);
    assert_eq!(abilities.len(), 1);
    assert!(abilities[0].is_static());
    assert!(matches!(
        abilities[0].effects[0].kind,
        EffectKind::DealDamage {
            amount: Amount::Fixed(2),
            ..
        }
    ));
}

#[test]
fn test_named_override() {
    let card = Card::character(CardId::new(5), "Lady Tremaine", 5)
        .with_version("Imperious Queen")
        .with_ability("When you play this character, each opponent chooses and banishes one of their characters.");
    let abilities = AbilityCompiler::new().compile(&card);
    assert_eq!(abilities.len(), 1);
    assert_eq!(abilities[0].effects[0].chooser, Chooser::Opponent);
}

// ============================================================================
// Coverage reporting
// ============================================================================

#[test]
fn test_unknown_text_never_reaches_the_registry() {
    let mut registry = CardRegistry::new();
    let id = registry.register(
        character(7, "Evasive")
            .with_ability("Whenever the moon is full, howl.")
            .with_ability(AbilityText::new("Flip a coin.").with_hint(AbilityHint::Static)),
    );

    let abilities = registry.abilities(id);
    assert_eq!(abilities.len(), 1);
    assert!(abilities.iter().all(|a| a.effects.iter().all(|e| !e.has_unrecognized())));

    let card = registry.get(id).unwrap();
    let (_, report) = AbilityCompiler::new().compile_with_report(card);
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.missed.len(), 2);
    assert_eq!(report.total(), 3);
}

#[test]
fn test_report_serializes() {
    let (_, report) = AbilityCompiler::new().compile_with_report(&character(1, "Evasive"));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["card"], "Sample - Test Subject");
    assert_eq!(json["matched"][0]["rule"], "keyword");
    assert_eq!(json["missed"].as_array().map(Vec::len), Some(0));
}
