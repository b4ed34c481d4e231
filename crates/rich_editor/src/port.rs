use serde::{Deserialize, Serialize};

use crate::core::{ApplyError, Document, Selection};
use crate::ops::{Op, Transaction};

/// Imperative editing commands a surface may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeCommand {
    Bold,
    Italic,
    Underline,
    InsertUnorderedList,
    Indent,
    Outdent,
    ForeColor,
    InsertHtml,
    InsertText,
    Delete,
    QueryState,
}

impl NativeCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::InsertUnorderedList => "insertUnorderedList",
            Self::Indent => "indent",
            Self::Outdent => "outdent",
            Self::ForeColor => "foreColor",
            Self::InsertHtml => "insertHTML",
            Self::InsertText => "insertText",
            Self::Delete => "delete",
            Self::QueryState => "queryCommandState",
        }
    }
}

impl std::fmt::Display for NativeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("command `{0}` is not available on this surface")]
    Unavailable(NativeCommand),
    #[error("command `{command}` was rejected: {reason}")]
    Rejected {
        command: NativeCommand,
        reason: String,
    },
    #[error("edit could not be applied: {0}")]
    InvalidEdit(#[from] ApplyError),
}

impl PortError {
    pub fn rejected(command: NativeCommand, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command,
            reason: reason.into(),
        }
    }
}

/// Formatting state the surface reports for the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFormats {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub unordered_list: bool,
}

/// The rich-text editing primitives of an editable surface.
///
/// Commands act on the surface's current selection. A surface that cannot run
/// a command reports [`PortError`]; callers treat that as a no-op.
pub trait CommandPort {
    fn toggle_bold(&mut self) -> Result<(), PortError>;
    fn toggle_italic(&mut self) -> Result<(), PortError>;
    fn toggle_underline(&mut self) -> Result<(), PortError>;
    fn toggle_list(&mut self) -> Result<(), PortError>;
    fn indent(&mut self) -> Result<(), PortError>;
    fn outdent(&mut self) -> Result<(), PortError>;
    fn set_foreground_color(&mut self, color: &str) -> Result<(), PortError>;
    fn insert_raw_markup(&mut self, markup: &str) -> Result<(), PortError>;
    fn insert_text(&mut self, text: &str) -> Result<(), PortError>;
    fn delete_backward(&mut self) -> Result<(), PortError>;
    fn query_active_formats(&self) -> Result<ActiveFormats, PortError>;

    fn undo(&mut self) -> bool;
    fn redo(&mut self) -> bool;

    fn document(&self) -> &Document;
    fn selection(&self) -> &Selection;
    fn set_selection(&mut self, selection: Selection);
    /// Replaces the surface content wholesale (`innerHTML` assignment).
    fn replace_document(&mut self, doc: Document);
    /// Applies a user-level edit as one undo step.
    fn apply_transaction(&mut self, tx: Transaction) -> Result<(), PortError>;
    /// Applies normalizer output, folded into the latest undo step.
    fn apply_normalization(&mut self, ops: Vec<Op>) -> Result<(), PortError>;
}
