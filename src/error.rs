//! Engine error types.
//!
//! Only invariant violations are errors. Illegal actions are reported as
//! [`Rejection`](crate::rules::Rejection) values, unmatched rules text is
//! dropped by the compiler, and effects without legal targets fizzle.
//! When `Game::apply` or `Game::respond` returns one of these errors the
//! game state has already been rolled back to before the call.

use thiserror::Error;

use crate::cards::CardId;
use crate::core::InstanceId;

/// Fatal engine errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A card instance id was referenced that the state does not know about.
    #[error("unknown card instance {0}")]
    UnknownInstance(InstanceId),

    /// A card definition id was referenced that the registry does not know about.
    #[error("unknown card definition {0}")]
    UnknownCard(CardId),

    /// An instance was inserted into a zone while already tracked.
    #[error("instance {0} is already tracked by the zone manager")]
    DuplicateInstance(InstanceId),

    /// Triggered abilities recursed deeper than the configured limit.
    #[error("trigger recursion exceeded maximum depth {max}")]
    TriggerDepthExceeded { max: u32 },

    /// The executor met an effect kind it cannot interpret.
    #[error("unhandled effect kind: {0}")]
    UnhandledEffect(String),

    /// Decks were supplied for the wrong number of players.
    #[error("expected {expected} decks, got {actual}")]
    DeckCount { expected: usize, actual: usize },

    /// The game has not been started yet.
    #[error("game has not been started")]
    NotStarted,

    /// The game was started twice.
    #[error("game already started")]
    AlreadyStarted,

    /// A choice was answered but no suspended effect was waiting for it.
    #[error("no suspended effect to resume")]
    NothingToResume,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
