//! Choice suspension protocol.
//!
//! When an effect needs a decision (a target, a yes/no on an optional
//! effect, a mode, cards to discard) the executor emits a `ChoiceRequest`
//! and execution suspends. The game resumes only when a `ChoiceResponse`
//! with the same request id arrives.
//!
//! Option ids are instance ids for card choices, `0`/`1` for yes/no, and
//! the option index for modal choices.

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, PlayerId};

/// Identifier of an outstanding choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceId(pub u32);

impl ChoiceId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Choice({})", self.0)
    }
}

/// What kind of decision is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    /// Pick cards in play (or in another zone) as effect targets.
    Targets,
    /// Accept or decline an optional effect.
    Confirm,
    /// Pick one option of a modal effect.
    Mode,
    /// Pick cards from your own hand to discard.
    Discard,
    /// Pick cards among those looked at.
    Look,
    /// Pick an amount for an "up to N" effect.
    Amount,
}

/// One selectable option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: u32,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: u32, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// Option naming a card instance.
    pub fn card(id: InstanceId, label: impl Into<String>) -> Self {
        Self::new(id.raw(), label)
    }
}

/// A pending decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRequest {
    pub id: ChoiceId,
    /// Who must answer.
    pub player: PlayerId,
    pub kind: ChoiceKind,
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
    /// Minimum selections.
    pub min: usize,
    /// Maximum selections.
    pub max: usize,
    /// Whether the whole choice may be declined.
    pub optional: bool,
    /// Card whose ability asks.
    pub source: Option<InstanceId>,
}

impl ChoiceRequest {
    /// Option ids, in order.
    #[must_use]
    pub fn option_ids(&self) -> Vec<u32> {
        self.options.iter().map(|o| o.id).collect()
    }

    /// Check a response against this request.
    pub fn check(&self, response: &ChoiceResponse) -> Result<(), ChoiceError> {
        if response.request_id != self.id {
            return Err(ChoiceError::Stale);
        }
        if response.player != self.player {
            return Err(ChoiceError::WrongPlayer);
        }
        if response.declined {
            return if self.optional || self.min == 0 {
                Ok(())
            } else {
                Err(ChoiceError::NotOptional)
            };
        }
        let count = response.selected_ids.len();
        if count < self.min || count > self.max {
            return Err(ChoiceError::Count {
                min: self.min,
                max: self.max,
                got: count,
            });
        }
        let mut seen = Vec::with_capacity(count);
        for id in &response.selected_ids {
            if !self.options.iter().any(|o| o.id == *id) {
                return Err(ChoiceError::UnknownOption(*id));
            }
            if seen.contains(id) {
                return Err(ChoiceError::Duplicate(*id));
            }
            seen.push(*id);
        }
        Ok(())
    }
}

/// A participant's answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceResponse {
    pub request_id: ChoiceId,
    pub player: PlayerId,
    pub selected_ids: Vec<u32>,
    /// Decline an optional choice.
    #[serde(default)]
    pub declined: bool,
}

impl ChoiceResponse {
    /// Select option ids.
    #[must_use]
    pub fn select(request: &ChoiceRequest, selected_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            request_id: request.id,
            player: request.player,
            selected_ids: selected_ids.into_iter().collect(),
            declined: false,
        }
    }

    /// Select card instances.
    #[must_use]
    pub fn select_cards(request: &ChoiceRequest, cards: &[InstanceId]) -> Self {
        Self::select(request, cards.iter().map(|c| c.raw()))
    }

    /// Answer yes to a confirm prompt.
    #[must_use]
    pub fn accept(request: &ChoiceRequest) -> Self {
        Self::select(request, [1])
    }

    /// Decline the choice.
    #[must_use]
    pub fn decline(request: &ChoiceRequest) -> Self {
        Self {
            request_id: request.id,
            player: request.player,
            selected_ids: Vec::new(),
            declined: true,
        }
    }
}

/// Why a response does not fit its request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChoiceError {
    #[error("response does not answer the outstanding request")]
    Stale,
    #[error("response submitted by the wrong player")]
    WrongPlayer,
    #[error("choice cannot be declined")]
    NotOptional,
    #[error("expected between {min} and {max} selections, got {got}")]
    Count { min: usize, max: usize, got: usize },
    #[error("option {0} was not offered")]
    UnknownOption(u32),
    #[error("option {0} selected twice")]
    Duplicate(u32),
}

/// A validated answer stored for replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceAnswer {
    pub selected: Vec<u32>,
    pub declined: bool,
}

impl From<ChoiceResponse> for ChoiceAnswer {
    fn from(response: ChoiceResponse) -> Self {
        Self {
            selected: response.selected_ids,
            declined: response.declined,
        }
    }
}

impl ChoiceAnswer {
    /// Interpret as a yes/no answer.
    #[must_use]
    pub fn accepted(&self) -> bool {
        !self.declined && self.selected.first() == Some(&1)
    }

    /// Interpret selections as card instances.
    #[must_use]
    pub fn cards(&self) -> Vec<InstanceId> {
        if self.declined {
            return Vec::new();
        }
        self.selected.iter().map(|id| InstanceId(*id)).collect()
    }

    /// Selected cards that are among `candidates`.
    #[must_use]
    pub fn cards_among(&self, candidates: &[InstanceId]) -> Vec<InstanceId> {
        let mut cards = self.cards();
        cards.retain(|c| candidates.contains(c));
        cards
    }
}
