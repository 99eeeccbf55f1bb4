//! Pattern library.
//!
//! Each table is an ordered slice of [`PatternRule`]s: a name, an anchored
//! case-insensitive regex, and a pure builder that turns the captures into
//! a fragment of the effect AST or declines with `None`. The first rule
//! whose regex matches *and* whose builder accepts wins, so tables list the
//! most specific shapes first.
//!
//! ## Tables
//!
//! - [`keywords`]: keyword lines ("Challenger +2", "Shift 5 {I}")
//! - [`triggered`]: trigger phrases ("Whenever this character quests")
//! - [`statics`]: prefixes of continuous abilities ("While ...", "During your turn")
//! - [`activated`]: cost tokens left of the separator
//! - [`effects`]: effect clauses ("deal 2 damage to chosen character")
//! - [`conditions`]: predicates ("you have a Villain character in play")
//! - [`named`]: card-specific wording, consulted before everything else
//!
//! [`target`] and [`numbers`] hold the shared phrase parsers the builders
//! call into.

pub mod activated;
pub mod conditions;
pub mod effects;
pub mod keywords;
pub mod named;
pub mod numbers;
pub mod statics;
pub mod target;
pub mod triggered;

use regex::{Captures, Regex};

use crate::effects::Duration;

/// Number word capture: "a", "two", "3".
macro_rules! num {
    ($name:literal) => {
        concat!(
            "(?P<",
            $name,
            r">a|an|one|two|three|four|five|six|seven|eight|nine|ten|\d+)"
        )
    };
}
pub(crate) use num;

/// Kind of ability the text being parsed belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilityMode {
    /// Continuous ability of a card in play.
    Static,
    /// Effect of an action or song, run once when played.
    Action,
    Triggered,
    Activated,
}

/// What a builder may assume about the surrounding text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub mode: AbilityMode,
    /// An earlier effect of the same ability resolved to cards, so "them"
    /// and "that character" refer back to it.
    pub previous: bool,
}

impl Scope {
    #[must_use]
    pub const fn new(mode: AbilityMode) -> Self {
        Self {
            mode,
            previous: false,
        }
    }

    #[must_use]
    pub const fn with_previous(mut self) -> Self {
        self.previous = true;
        self
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mode == AbilityMode::Static
    }

    /// Duration of a modifier printed without one.
    #[must_use]
    pub fn default_duration(&self) -> Duration {
        match self.mode {
            AbilityMode::Static => Duration::WhileActive,
            _ => Duration::ThisTurn,
        }
    }
}

/// Builder signature shared by every table.
pub type Builder<T> = fn(&Captures<'_>, &Scope) -> Option<T>;

/// One text shape and the fragment it produces.
pub struct PatternRule<T> {
    pub name: &'static str,
    pub regex: Regex,
    pub build: Builder<T>,
}

impl<T> PatternRule<T> {
    /// Compile a rule. The pattern is anchored at both ends and matched
    /// case-insensitively. Only called from table initializers.
    pub(crate) fn new(name: &'static str, pattern: &str, build: Builder<T>) -> Self {
        let regex = Regex::new(&format!("(?i)^(?:{pattern})$")).expect("valid regex");
        Self { name, regex, build }
    }

    /// Run the rule against text.
    pub fn apply(&self, text: &str, scope: &Scope) -> Option<T> {
        let caps = self.regex.captures(text)?;
        (self.build)(&caps, scope)
    }
}

impl<T> std::fmt::Debug for PatternRule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// First rule in table order that accepts the text.
pub fn first_match<T>(
    rules: &[PatternRule<T>],
    text: &str,
    scope: &Scope,
) -> Option<(&'static str, T)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(text, scope).map(|fragment| (rule.name, fragment)))
}

/// A named capture, trimmed.
pub(crate) fn group<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}
