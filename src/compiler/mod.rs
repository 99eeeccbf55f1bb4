//! Ability compiler.
//!
//! Turns a card's printed ability blocks into [`AbilityDefinition`]s:
//!
//! 1. [`normalize`]: canonical text, ability name split off
//! 2. [`named`](patterns::named): card-specific overrides
//! 3. [`classify`]: keyword / triggered / activated / static
//! 4. the matching [`patterns`] table builds the definition
//!
//! Blocks no rule accepts are dropped and reported, never compiled into
//! a placeholder that would fail at resolution time.
//!
//! ```
//! use rust_lorcana::cards::{Card, CardId};
//! use rust_lorcana::compiler::AbilityCompiler;
//! use rust_lorcana::effects::Effect;
//!
//! let card = Card::character(CardId::new(1), "Stitch", 2)
//!     .with_version("New Dog")
//!     .with_ability("Evasive")
//!     .with_ability("HAPPY TO SEE YOU When you play this character, draw a card.");
//!
//! let (abilities, report) = AbilityCompiler::new().compile_with_report(&card);
//! assert_eq!(abilities.len(), 2);
//! assert_eq!(abilities[1].name.as_deref(), Some("HAPPY TO SEE YOU"));
//! assert_eq!(abilities[1].effects, vec![Effect::draw(1)]);
//! assert!(report.missed.is_empty());
//! ```

pub mod classify;
pub mod normalize;
pub mod patterns;

use serde::Serialize;
use tracing::{debug, trace};

use crate::cards::{AbilityText, Card};
use crate::effects::AbilityDefinition;
use classify::{classify, BlockKind};
use normalize::{normalize, Normalized};
use patterns::{activated, effects, keywords, named, statics, triggered, AbilityMode, Scope};

/// A block a rule accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchedBlock {
    pub text: String,
    pub rule: &'static str,
    pub kind: BlockKind,
}

/// What happened to each block of one card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    pub card: String,
    pub matched: Vec<MatchedBlock>,
    /// Normalized text of blocks no rule accepted.
    pub missed: Vec<String>,
}

impl CompileReport {
    /// Blocks seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matched.len() + self.missed.len()
    }
}

/// Compiles printed ability text. Stateless; the pattern tables are
/// process-wide and built on first use.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbilityCompiler;

impl AbilityCompiler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compile every block of a card.
    #[must_use]
    pub fn compile(&self, card: &Card) -> Vec<AbilityDefinition> {
        self.compile_with_report(card).0
    }

    /// Compile and report which rule claimed each block.
    #[must_use]
    pub fn compile_with_report(&self, card: &Card) -> (Vec<AbilityDefinition>, CompileReport) {
        let mut report = CompileReport {
            card: card.full_name(),
            ..CompileReport::default()
        };
        let mut abilities = Vec::new();

        for block in &card.abilities {
            let normalized = normalize(&block.text, card);
            match self.compile_block(card, block, &normalized) {
                Some((rule, kind, compiled)) => {
                    trace!(card = %report.card, rule, count = compiled.len(), "block compiled");
                    report.matched.push(MatchedBlock {
                        text: normalized.text.clone(),
                        rule,
                        kind,
                    });
                    abilities.extend(
                        compiled
                            .into_iter()
                            .map(|ability| finish(ability, &normalized)),
                    );
                }
                None => {
                    debug!(
                        card = %report.card,
                        text = %normalized.text,
                        "no rule matched, block dropped"
                    );
                    report.missed.push(normalized.text);
                }
            }
        }
        (abilities, report)
    }

    fn compile_block(
        &self,
        card: &Card,
        block: &AbilityText,
        normalized: &Normalized,
    ) -> Option<(&'static str, BlockKind, Vec<AbilityDefinition>)> {
        let text = normalized.text.as_str();

        // Structured keyword data needs no text at all.
        let structured = block
            .keyword
            .as_deref()
            .and_then(|name| keywords::from_parts(name, block.value));
        if let Some(keyword) = structured {
            let compiled = vec![AbilityDefinition::keyword(keyword, text)];
            return Some(("keyword", BlockKind::Keyword, compiled));
        }

        let kind = classify(block, text);
        if let Some((rule, compiled)) = named::lookup(card, text) {
            return Some((rule, kind, compiled));
        }

        let tagged = |kind| move |(rule, compiled): Compiled| (rule, kind, compiled);
        match kind {
            BlockKind::Keyword => compile_keywords(text).map(tagged(kind)),
            BlockKind::Triggered => compile_triggered(text).map(tagged(kind)),
            // Cost-less text routes to the static matcher.
            BlockKind::Activated => compile_activated(text)
                .map(tagged(kind))
                .or_else(|| compile_static(card, text).map(tagged(BlockKind::Static))),
            BlockKind::Static => compile_static(card, text).map(tagged(kind)),
        }
    }
}

type Compiled = (&'static str, Vec<AbilityDefinition>);

fn compile_keywords(text: &str) -> Option<Compiled> {
    let keywords = keywords::parse(text, &Scope::new(AbilityMode::Static))?;
    let abilities = keywords
        .into_iter()
        .map(|keyword| AbilityDefinition::keyword(keyword, text))
        .collect();
    Some(("keyword", abilities))
}

fn compile_triggered(text: &str) -> Option<Compiled> {
    let scope = Scope::new(AbilityMode::Triggered);
    let parts = triggered::split(text, &scope)?;
    let body = effects::parse(parts.body, &scope)?;
    let abilities = parts
        .listens
        .into_iter()
        .map(|(event, filter)| {
            AbilityDefinition::triggered(event, filter, text)
                .with_condition(parts.condition.clone())
                .with_effects(body.clone())
        })
        .collect();
    Some((parts.rule, abilities))
}

fn compile_activated(text: &str) -> Option<Compiled> {
    let scope = Scope::new(AbilityMode::Activated);
    let (costs, body) = activated::split(text, &scope)?;
    let body = effects::parse(body, &scope)?;
    Some(("activated", vec![AbilityDefinition::activated(costs, text).with_effects(body)]))
}

fn compile_static(card: &Card, text: &str) -> Option<Compiled> {
    if card.card_type.is_action() {
        let body = effects::parse(text, &Scope::new(AbilityMode::Action))?;
        return Some(("action", vec![AbilityDefinition::static_ability(body, text)]));
    }
    let scope = Scope::new(AbilityMode::Static);
    let (rule, form) = statics::split(text, &scope)?;
    let body = effects::parse(&form.body, &scope)?;
    Some((rule, vec![AbilityDefinition::static_ability(body, text).with_condition(form.condition)]))
}

/// Stamp the normalized text and printed name on a compiled ability.
fn finish(mut ability: AbilityDefinition, normalized: &Normalized) -> AbilityDefinition {
    ability.raw_text.clone_from(&normalized.text);
    ability.name.clone_from(&normalized.name);
    ability
}
