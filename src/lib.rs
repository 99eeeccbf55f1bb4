//! # rust-lorcana
//!
//! Rules engine core for a Lorcana-style card game.
//!
//! Printed ability text is compiled once, at card load, into a typed effect
//! tree. The engine then interprets that tree: triggers queue on game
//! events, continuous effects are recomputed after every change, and any
//! effect that needs a player decision suspends the game until the
//! matching response arrives.
//!
//! ## Modules
//!
//! - `core`: instance IDs, players, state, actions, RNG, configuration
//! - `zones`: deck / hand / play / discard / inkwell per player
//! - `cards`: card definitions, the registry, per-instance state
//! - `compiler`: text normalization and the pattern library
//! - `effects`: ability and effect IR, targeting, choices, the executor
//! - `triggers`: events, conditions, trigger registration
//! - `continuous`: layered modifiers with durations
//! - `stack`: resolution frames for effects and triggers
//! - `rules`: the game facade, turn structure, action validation

pub mod cards;
pub mod compiler;
pub mod continuous;
pub mod core;
pub mod effects;
pub mod error;
pub mod rules;
pub mod stack;
pub mod triggers;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    ActionRecord, GameAction, GameRng, GameState, InstanceId, PlayerId, PlayerMap, RulesConfig,
};

pub use crate::zones::{Zone, ZoneManager};

pub use crate::cards::{Card, CardId, CardInstance, CardRegistry, CardType};

pub use crate::compiler::{AbilityCompiler, CompileReport};

pub use crate::effects::{
    AbilityDefinition, ChoiceRequest, ChoiceResponse, Effect, EffectKind, Keyword, KeywordKind,
    Target, TargetFilter,
};

pub use crate::triggers::{Condition, EventKind, GameEvent};

pub use crate::continuous::ContinuousEffect;

pub use crate::rules::{Game, GameResult, Outcome, Phase, TurnStep};

pub use crate::error::{EngineError, Result};
