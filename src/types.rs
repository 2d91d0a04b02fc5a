//! Core types for the boardflow execution core.
//!
//! This module defines the fundamental types used throughout the system for
//! identifying boards and classifying cards. These are the core domain
//! concepts that define what a board *is*.
//!
//! For runtime identifiers (execution ids, context ids), see
//! [`crate::utils::id_generator`].
//!
//! # Key Types
//!
//! - [`BoardId`]: Validated board name (lowercase alphanumeric/underscore)
//! - [`CardKind`]: Classifies the behavior of a card
//! - [`StateMode`]: Per-card policy for persisting state writes
//!
//! # Examples
//!
//! ```rust
//! use boardflow::types::{BoardId, CardKind, StateMode};
//!
//! let board = BoardId::new("home_automation").unwrap();
//! assert_eq!(board.as_str(), "home_automation");
//!
//! // Encode for persistence
//! assert_eq!(CardKind::Action.encode(), "action");
//! assert_eq!(StateMode::decode("ephemeral"), StateMode::Ephemeral);
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when constructing core identifiers.
#[derive(Debug, Error, Diagnostic)]
pub enum TypesError {
    /// Board names must be non-empty, lowercase ASCII alphanumeric or
    /// underscore.
    #[error("invalid board name: {name:?}")]
    #[diagnostic(
        code(boardflow::types::invalid_board_name),
        help("Board names are non-empty, lowercase ASCII letters, digits, and underscores.")
    )]
    InvalidBoardName { name: String },
}

/// Validated board identifier.
///
/// A board name is the immutable key of a board document. Names are
/// restricted to lowercase ASCII alphanumerics and underscores so they can
/// be embedded verbatim in URLs, file names, and log output.
///
/// # Examples
///
/// ```rust
/// use boardflow::types::BoardId;
///
/// let ok = BoardId::new("garden_2");
/// assert!(ok.is_ok());
///
/// assert!(BoardId::new("Garden").is_err());
/// assert!(BoardId::new("").is_err());
/// assert!(BoardId::new("no spaces").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    /// Validate and wrap a board name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypesError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(TypesError::InvalidBoardName { name });
        }
        Ok(BoardId(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BoardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Classifies the behavior of a card within a board.
///
/// Cards carry user rule code; the kind determines how the surrounding
/// platform drives them. The execution core dispatches [`Action`](Self::Action)
/// cards; the remaining kinds are resolved and stored but driven by external
/// collaborators (trigger scheduling, monitor polling, and so on).
///
/// # Persistence
///
/// `CardKind` supports serialization through both serde and the
/// [`encode`](Self::encode)/[`decode`](Self::decode) methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    /// Executable unit invoked on demand, may chain into other actions.
    Action,
    /// Fires an action when an external condition occurs.
    Trigger,
    /// Long-lived background behavior owned by the platform.
    Subsystem,
    /// Periodically evaluates board state.
    Monitor,
    /// Pure state holder with no executable behavior.
    Value,
}

impl CardKind {
    /// Encode a CardKind into its persisted string form.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            CardKind::Action => "action",
            CardKind::Trigger => "trigger",
            CardKind::Subsystem => "subsystem",
            CardKind::Monitor => "monitor",
            CardKind::Value => "value",
        }
    }

    /// Decode a persisted string form back into a CardKind.
    ///
    /// Unrecognized forms fall back to [`Value`](Self::Value) so documents
    /// written by newer deployments still load.
    pub fn decode(s: &str) -> Self {
        match s {
            "action" => CardKind::Action,
            "trigger" => CardKind::Trigger,
            "subsystem" => CardKind::Subsystem,
            "monitor" => CardKind::Monitor,
            _ => CardKind::Value,
        }
    }

    /// Returns `true` if cards of this kind are dispatchable.
    #[must_use]
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Action)
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl From<&str> for CardKind {
    fn from(s: &str) -> Self {
        CardKind::decode(s)
    }
}

/// Per-card policy controlling whether state writes persist.
///
/// - `Ephemeral` writes live only in the invoking chain's overlay and are
///   discarded when the chain terminates.
/// - `NonEphemeral` writes commit synchronously to the board's base state.
/// - `Default` defers to the board's `ephemeral` flag.
///
/// Documents written before this field existed deserialize as
/// `NonEphemeral`, which matches the historical behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateMode {
    Ephemeral,
    #[default]
    NonEphemeral,
    Default,
}

impl StateMode {
    /// Encode a StateMode into its persisted string form.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            StateMode::Ephemeral => "ephemeral",
            StateMode::NonEphemeral => "non-ephemeral",
            StateMode::Default => "default",
        }
    }

    /// Decode a persisted string form back into a StateMode.
    ///
    /// Unknown forms decode as `NonEphemeral`, the legacy behavior for
    /// cards that never declared a mode.
    pub fn decode(s: &str) -> Self {
        match s {
            "ephemeral" => StateMode::Ephemeral,
            "default" => StateMode::Default,
            _ => StateMode::NonEphemeral,
        }
    }

    /// Resolve this mode against a board's `ephemeral` default.
    ///
    /// Explicit modes win; only `Default` consults the board flag. The
    /// result is never `Default`.
    #[must_use]
    pub fn resolve(&self, board_ephemeral: bool) -> StateMode {
        match self {
            StateMode::Default => {
                if board_ephemeral {
                    StateMode::Ephemeral
                } else {
                    StateMode::NonEphemeral
                }
            }
            explicit => *explicit,
        }
    }

    /// Returns `true` if writes under this mode stay in the chain overlay.
    ///
    /// Only meaningful after [`resolve`](Self::resolve).
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral)
    }
}

impl fmt::Display for StateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl From<&str> for StateMode {
    fn from(s: &str) -> Self {
        StateMode::decode(s)
    }
}

/// Unique identifier for one top-level invocation chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub String);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one action invocation, recursive calls included.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub String);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
