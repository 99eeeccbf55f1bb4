//! Turn structure.
//!
//! A turn runs Ready → Set → Draw → Main → End. Only Main accepts player
//! actions other than Concede. The transitions themselves are queued as
//! [`TurnStep`] frames on the resolution stack so that start- and
//! end-of-turn triggers can suspend on a choice in the middle of a
//! transition and resume afterwards.

use serde::{Deserialize, Serialize};

/// Phases of a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Before the first turn.
    #[default]
    Setup,
    Ready,
    Set,
    Draw,
    Main,
    End,
}

impl Phase {
    /// The phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Setup => Self::Ready,
            Self::Ready => Self::Set,
            Self::Set => Self::Draw,
            Self::Draw => Self::Main,
            Self::Main => Self::End,
            Self::End => Self::Ready,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Ready => "ready",
            Self::Set => "set",
            Self::Draw => "draw",
            Self::Main => "main",
            Self::End => "end",
        }
    }

    /// Whether players may take game actions.
    #[must_use]
    pub const fn accepts_actions(self) -> bool {
        matches!(self, Self::Main)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work in a turn transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnStep {
    /// Enter End and fire end-of-turn triggers.
    End,
    /// Expire "this turn" effects, check deck-out, pass the turn.
    Cleanup,
    /// Ready the new active player's cards.
    Ready,
    /// Location lore and start-of-turn triggers.
    Set,
    /// Draw for the turn.
    Draw,
    /// Enter Main.
    Main,
}

impl TurnStep {
    /// Steps queued by passing the turn, in execution order.
    pub const PASS: [TurnStep; 6] = [
        Self::End,
        Self::Cleanup,
        Self::Ready,
        Self::Set,
        Self::Draw,
        Self::Main,
    ];

    /// Steps that open the first turn.
    pub const OPENING: [TurnStep; 4] = [Self::Ready, Self::Set, Self::Draw, Self::Main];

    /// Phase the game is in while this step runs.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::End | Self::Cleanup => Phase::End,
            Self::Ready => Phase::Ready,
            Self::Set => Phase::Set,
            Self::Draw => Phase::Draw,
            Self::Main => Phase::Main,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycle() {
        let mut phase = Phase::Ready;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(phase);
            phase = phase.next();
        }
        assert_eq!(seen, vec![Phase::Ready, Phase::Set, Phase::Draw, Phase::Main, Phase::End]);
        assert_eq!(phase, Phase::Ready);
    }

    #[test]
    fn test_only_main_accepts_actions() {
        assert!(Phase::Main.accepts_actions());
        assert!(!Phase::Draw.accepts_actions());
        assert!(!Phase::End.accepts_actions());
    }

    #[test]
    fn test_pass_steps_end_in_main() {
        assert_eq!(TurnStep::PASS.first().map(|s| s.phase()), Some(Phase::End));
        assert_eq!(TurnStep::PASS.last().map(|s| s.phase()), Some(Phase::Main));
    }
}
