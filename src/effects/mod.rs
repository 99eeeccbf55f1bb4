//! Effect system for card abilities.
//!
//! The typed intermediate representation the ability compiler produces and
//! the executor interprets:
//! - `AbilityDefinition`: keyword / static / triggered / activated ability
//! - `Effect` / `EffectKind`: one closed variant per effect kind
//! - `Target` / `TargetFilter`: which cards an effect touches
//! - `Condition` (in [`triggers`](crate::triggers)): predicates on state
//! - `ChoiceRequest` / `ChoiceResponse`: the suspend/resume pair
//! - `Executor`: runs one effect node against game state

mod ability;
mod choice;
mod effect;
pub mod executor;
mod targeting;

pub use ability::{AbilityDefinition, AbilityKind, Cost, Keyword, KeywordKind};
pub use choice::{
    ChoiceAnswer, ChoiceError, ChoiceId, ChoiceKind, ChoiceOption, ChoiceRequest, ChoiceResponse,
};
pub use effect::{
    Amount, Chooser, Count, Duration, Effect, EffectKind, LookDestination, LookPlan, PlayerTarget,
    Restriction, Stat,
};
pub use executor::{EffectContext, ExecEnv, Executor, Fizzle, FizzleReason, Step};
pub use targeting::{
    CompareOp, Comparison, FilterContext, Ownership, Status, Target, TargetCount, TargetFilter,
    TargetSelector,
};
