//! Turn manager.
//!
//! - `turn`: phases and the turn-transition steps
//! - `validate`: legality checks that run before any action mutates state
//! - `mechanics`: primitive mutations shared by actions and effects
//! - `engine`: the `Game` driver, its resolution loop and outcomes

pub mod engine;
pub mod mechanics;
pub mod turn;
pub mod validate;

pub use engine::{Game, GameResult, Outcome, WinReason};
pub use turn::{Phase, TurnStep};
pub use validate::{play_cost, singer_value, validate, RejectReason, Rejection};
