//! Resolution stack.
//!
//! The engine resolves everything through an explicit stack of frames
//! instead of recursion, so that a pending choice can suspend resolution
//! at any point and a later response can resume it exactly where it
//! stopped.
//!
//! ## Frames
//!
//! - [`Frame::Effects`]: the remaining effects of one ability, with the
//!   choices already made for the effect at the cursor
//! - [`Frame::Phase`]: a turn transition step
//! - [`Frame::Emit`]: an event dispatched once the frames above it have
//!   resolved (an action card's "played" event fires after its effects)
//!
//! Frames resolve LIFO. Triggered abilities are pushed on top of the
//! ability whose effect caused them, one level deeper, which makes event
//! processing depth-first.
//!
//! ## Example Usage
//!
//! ```
//! use rust_lorcana::core::PlayerId;
//! use rust_lorcana::effects::{Effect, EffectContext};
//! use rust_lorcana::rules::TurnStep;
//! use rust_lorcana::stack::{EffectFrame, Frame, ResolutionStack};
//!
//! let mut stack = ResolutionStack::new();
//! stack.push(Frame::Phase(TurnStep::Main));
//! stack.push(Frame::Effects(EffectFrame::new(
//!     vec![Effect::draw(1)],
//!     EffectContext::new(None, PlayerId::new(0)),
//!     0,
//! )));
//!
//! assert_eq!(stack.len(), 2);
//! assert!(matches!(stack.pop(), Some(Frame::Effects(_))));
//! ```

use crate::effects::{ChoiceAnswer, Effect, EffectContext};
use crate::rules::TurnStep;
use crate::triggers::GameEvent;

/// The remaining effects of one resolving ability.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectFrame {
    effects: Vec<Effect>,
    cursor: usize,
    pub ctx: EffectContext,
    /// Nesting level: 0 for abilities started by an action or a turn
    /// step, parent + 1 for triggered abilities.
    pub depth: u32,
    /// Choices made so far for the effect at the cursor.
    pub answers: Vec<ChoiceAnswer>,
}

impl EffectFrame {
    #[must_use]
    pub fn new(effects: Vec<Effect>, ctx: EffectContext, depth: u32) -> Self {
        Self {
            effects,
            cursor: 0,
            ctx,
            depth,
            answers: Vec::new(),
        }
    }

    /// The effect at the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Effect> {
        self.effects.get(self.cursor)
    }

    /// Move past the current effect.
    pub fn advance(&mut self) {
        self.cursor += 1;
        self.answers.clear();
    }

    /// Replace the current effect with its children.
    pub fn expand(&mut self, children: Vec<Effect>) {
        let end = (self.cursor + 1).min(self.effects.len());
        self.effects.splice(self.cursor..end, children);
        self.answers.clear();
    }

    /// Whether every effect has run.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor >= self.effects.len()
    }

    /// Effects not yet run, including the current one.
    #[must_use]
    pub fn remaining(&self) -> &[Effect] {
        self.effects.get(self.cursor..).unwrap_or_default()
    }
}

/// One unit of pending work.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Effects(EffectFrame),
    Phase(TurnStep),
    /// Dispatched at `depth`, so its triggers resolve at `depth + 1`.
    Emit { event: GameEvent, depth: u32 },
}

impl Frame {
    /// Nesting level of the frame.
    #[must_use]
    pub fn depth(&self) -> u32 {
        match self {
            Self::Effects(frame) => frame.depth,
            Self::Emit { depth, .. } => *depth,
            Self::Phase(_) => 0,
        }
    }
}

/// LIFO stack of frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Push frames so that the first one resolves first.
    pub fn push_in_order(&mut self, frames: impl IntoIterator<Item = Frame>) {
        let mut frames: Vec<Frame> = frames.into_iter().collect();
        frames.reverse();
        self.frames.extend(frames);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// The frame that resolves next.
    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;

    fn frame(effects: Vec<Effect>) -> EffectFrame {
        EffectFrame::new(effects, EffectContext::new(None, PlayerId::new(0)), 0)
    }

    #[test]
    fn test_frame_cursor() {
        let mut f = frame(vec![Effect::draw(1), Effect::gain_lore(1)]);
        assert_eq!(f.current(), Some(&Effect::draw(1)));
        f.answers.push(ChoiceAnswer {
            selected: vec![1],
            declined: false,
        });
        f.advance();
        assert!(f.answers.is_empty());
        assert_eq!(f.current(), Some(&Effect::gain_lore(1)));
        f.advance();
        assert!(f.is_done());
        assert!(f.remaining().is_empty());
    }

    #[test]
    fn test_expand_replaces_current() {
        let mut f = frame(vec![
            Effect::sequence(vec![Effect::draw(1), Effect::draw(2)]),
            Effect::gain_lore(1),
        ]);
        f.expand(vec![Effect::draw(1), Effect::draw(2)]);
        assert_eq!(f.remaining(), &[Effect::draw(1), Effect::draw(2), Effect::gain_lore(1)]);

        f.expand(Vec::new());
        assert_eq!(f.remaining(), &[Effect::draw(2), Effect::gain_lore(1)]);
    }

    #[test]
    fn test_emit_carries_depth() {
        let event = GameEvent::turn(crate::triggers::EventKind::TurnStarted, PlayerId::new(0));
        assert_eq!(Frame::Emit { event, depth: 3 }.depth(), 3);
        assert_eq!(Frame::Phase(TurnStep::Main).depth(), 0);
    }

    #[test]
    fn test_push_in_order() {
        let mut stack = ResolutionStack::new();
        stack.push_in_order([Frame::Phase(TurnStep::Ready), Frame::Phase(TurnStep::Set)]);
        assert_eq!(stack.pop(), Some(Frame::Phase(TurnStep::Ready)));
        assert_eq!(stack.pop(), Some(Frame::Phase(TurnStep::Set)));
        assert!(stack.is_empty());
    }
}
