//! Linear Undo/Redo History
//!
//! Commands live in a vector with a current index: everything below the
//! index has been applied, everything at or above it is the redo tail.
//! Pushing a new command truncates the tail. The index doubles as the
//! document's dirty flag.

use crate::command::{self, EditCommand};
use dbc_schema::{DbcError, SchemaDocument};
use tracing::debug;

/// Undo/redo history over one schema document.
///
/// The history holds commands, not the document; callers pass the document
/// explicitly so several documents with independent histories can coexist.
#[derive(Debug, Default)]
pub struct EditHistory {
    commands: Vec<EditCommand>,
    index: usize,
}

impl EditHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a new command and record it, discarding any redo tail.
    ///
    /// A command that fails to apply leaves both the document and the
    /// history unchanged.
    pub fn push(&mut self, doc: &mut SchemaDocument, cmd: EditCommand) -> Result<(), DbcError> {
        command::apply(doc, &cmd)?;
        self.commands.truncate(self.index);
        self.commands.push(cmd);
        self.index += 1;
        debug!(index = self.index, "applied edit");
        Ok(())
    }

    /// Revert the most recent applied command.
    ///
    /// Returns `Ok(false)` without touching the document when there is
    /// nothing to undo; an exhausted history is not an error.
    pub fn undo(&mut self, doc: &mut SchemaDocument) -> Result<bool, DbcError> {
        if self.index == 0 {
            return Ok(false);
        }
        command::revert(doc, &self.commands[self.index - 1])?;
        self.index -= 1;
        debug!(index = self.index, "undid edit");
        Ok(true)
    }

    /// Re-apply the most recently undone command.
    ///
    /// Returns `Ok(false)` without touching the document when there is
    /// nothing to redo.
    pub fn redo(&mut self, doc: &mut SchemaDocument) -> Result<bool, DbcError> {
        if self.index == self.commands.len() {
            return Ok(false);
        }
        command::apply(doc, &self.commands[self.index])?;
        self.index += 1;
        debug!(index = self.index, "redid edit");
        Ok(true)
    }

    /// True while un-undone edits exist; the editor shell's unsaved marker
    pub fn is_dirty(&self) -> bool {
        self.index != 0
    }

    /// True when `undo` would do something
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// True when `redo` would do something
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    /// Number of recorded commands (applied plus redo tail)
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no commands are recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget all history, e.g. after a save establishes a new baseline
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
    }
}
