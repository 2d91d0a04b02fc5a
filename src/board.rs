//! Board document model.
//!
//! A board is a named container of [`Card`]s plus the base state those cards
//! have persisted. The document is owned exclusively by the
//! [`BoardStore`](crate::store::BoardStore) and mutated only through its
//! serialized write path; everything here is plain data.
//!
//! # Core Types
//!
//! - [`Card`]: a named unit of behavior with rule code
//! - [`BoardDocument`]: cards + base state + board-level defaults
//! - [`VersionSnapshot`] / [`VersionMeta`]: immutable point-in-time copies
//!
//! # Examples
//!
//! ```rust
//! use boardflow::board::{BoardDocument, Card};
//! use boardflow::types::{BoardId, CardKind, StateMode};
//! use serde_json::json;
//!
//! let board = BoardDocument::builder(BoardId::new("greenhouse").unwrap())
//!     .with_card(Card::action("vent", "open_vents()"))
//!     .with_card(
//!         Card::action("log_temp", "record(temp)").with_state_mode(StateMode::Ephemeral),
//!     )
//!     .with_state("vent", json!("closed"))
//!     .build();
//!
//! assert_eq!(board.cards.len(), 2);
//! assert!(board.card("vent").is_some());
//! assert!(board.card("VENT").is_none()); // card names are case-sensitive
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BoardId, CardKind, StateMode};
use crate::utils::collections::new_state_map;

/// A named unit of behavior attached to a board.
///
/// The execution core treats the `code` field as opaque text handed to the
/// [`ActionRuntime`](crate::runtime::ActionRuntime); it never parses it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Unique within the board, case-sensitive.
    pub name: String,
    pub kind: CardKind,
    /// Missing in documents written before state modes existed; those cards
    /// behave as non-ephemeral.
    #[serde(default)]
    pub state_mode: StateMode,
    /// A chain that reaches this card ends when the card completes; the
    /// chain's ephemeral overlay is discarded.
    #[serde(default)]
    pub chain_terminator: bool,
    /// Opaque rule-code text.
    #[serde(default)]
    pub code: String,
}

impl Card {
    /// Construct an action card with non-ephemeral state and no terminator
    /// flag. Adjust with the `with_*` methods.
    pub fn action(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CardKind::Action,
            state_mode: StateMode::NonEphemeral,
            chain_terminator: false,
            code: code.into(),
        }
    }

    /// Construct a value card holding state only.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CardKind::Value,
            state_mode: StateMode::NonEphemeral,
            chain_terminator: false,
            code: String::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CardKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_state_mode(mut self, mode: StateMode) -> Self {
        self.state_mode = mode;
        self
    }

    #[must_use]
    pub fn with_chain_terminator(mut self, terminator: bool) -> Self {
        self.chain_terminator = terminator;
        self
    }

    /// The mode writes through this card actually use, with `Default`
    /// resolved against the owning board's flag.
    #[must_use]
    pub fn effective_mode(&self, board_ephemeral: bool) -> StateMode {
        self.state_mode.resolve(board_ephemeral)
    }
}

/// The persisted document for one board.
///
/// `version_counter` only ever grows; it is bumped by the
/// [`VersionManager`](crate::versioning::VersionManager) when a snapshot is
/// taken and survives restores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub board: BoardId,
    /// Ordered as added; order is meaningful to the surrounding UI.
    pub cards: Vec<Card>,
    /// Last persisted value per card name.
    #[serde(default = "new_state_map")]
    pub base_state: FxHashMap<String, Value>,
    /// Board-level default for cards with `StateMode::Default`.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub version_counter: u64,
}

impl BoardDocument {
    pub fn new(board: BoardId) -> Self {
        Self {
            board,
            cards: Vec::new(),
            base_state: new_state_map(),
            ephemeral: false,
            version_counter: 0,
        }
    }

    /// Creates a builder for seeding a document with cards and state.
    pub fn builder(board: BoardId) -> BoardDocumentBuilder {
        BoardDocumentBuilder {
            doc: BoardDocument::new(board),
        }
    }

    /// Look up a card by exact name.
    #[must_use]
    pub fn card(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.name == name)
    }

    /// Look up a dispatchable action card by exact name.
    ///
    /// A name that matches a non-action card resolves to `None`; the
    /// dispatcher reports it the same way it reports an absent name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&Card> {
        self.cards
            .iter()
            .find(|c| c.name == name && c.kind.is_action())
    }

    /// Deep-copy the versionable content (cards + base state).
    #[must_use]
    pub fn snapshot_content(&self) -> (Vec<Card>, FxHashMap<String, Value>) {
        (self.cards.clone(), self.base_state.clone())
    }
}

/// Fluent builder for seeding [`BoardDocument`]s in tests and setup code.
#[derive(Debug)]
pub struct BoardDocumentBuilder {
    doc: BoardDocument,
}

impl BoardDocumentBuilder {
    #[must_use]
    pub fn with_card(mut self, card: Card) -> Self {
        self.doc.cards.push(card);
        self
    }

    #[must_use]
    pub fn with_state(mut self, card_name: impl Into<String>, value: Value) -> Self {
        self.doc.base_state.insert(card_name.into(), value);
        self
    }

    /// Set the board-level default for `StateMode::Default` cards.
    #[must_use]
    pub fn ephemeral_by_default(mut self, ephemeral: bool) -> Self {
        self.doc.ephemeral = ephemeral;
        self
    }

    #[must_use]
    pub fn build(self) -> BoardDocument {
        self.doc
    }
}

/// Immutable copy of a board's versionable content at snapshot time.
///
/// Snapshot content is never mutated after capture; only the `comment` and
/// `tag` metadata may be attached later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    /// Monotonic per board, first snapshot is 1.
    pub version: u64,
    pub cards: Vec<Card>,
    pub base_state: FxHashMap<String, Value>,
    pub comment: Option<String>,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VersionSnapshot {
    /// The content-free view returned by history listings.
    #[must_use]
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            version: self.version,
            comment: self.comment.clone(),
            tag: self.tag.clone(),
            created_at: self.created_at,
        }
    }
}

/// Version metadata without the captured content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub version: u64,
    pub comment: Option<String>,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_lookup_is_case_sensitive() {
        let doc = BoardDocument::builder(BoardId::new("b").unwrap())
            .with_card(Card::action("Light", "on()"))
            .build();
        assert!(doc.card("Light").is_some());
        assert!(doc.card("light").is_none());
    }

    #[test]
    fn action_lookup_skips_non_action_cards() {
        let doc = BoardDocument::builder(BoardId::new("b").unwrap())
            .with_card(Card::value("temp"))
            .with_card(Card::action("read", "temp"))
            .build();
        assert!(doc.action("temp").is_none());
        assert!(doc.action("read").is_some());
    }

    #[test]
    fn legacy_card_deserializes_as_non_ephemeral() {
        let card: Card = serde_json::from_value(json!({
            "name": "old",
            "kind": "action"
        }))
        .unwrap();
        assert_eq!(card.state_mode, StateMode::NonEphemeral);
        assert!(!card.chain_terminator);
    }

    #[test]
    fn snapshot_content_is_independent() {
        let mut doc = BoardDocument::builder(BoardId::new("b").unwrap())
            .with_state("k", json!(1))
            .build();
        let (_, state) = doc.snapshot_content();
        doc.base_state.insert("k".into(), json!(2));
        assert_eq!(state.get("k"), Some(&json!(1)));
    }
}
