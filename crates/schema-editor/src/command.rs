//! Reversible Edit Commands
//!
//! A closed set of tagged variants, one per structural edit, carrying full
//! old/new snapshots. A single exhaustive dispatch applies or reverts them;
//! commands own no document state of their own.

use dbc_schema::{DbcError, Message, SchemaDocument, Signal};

/// One reversible structural edit
#[derive(Debug, Clone)]
pub enum EditCommand {
    /// Insert a new message
    AddMessage { message: Message },
    /// Replace a message wholesale (header edits; the address may change)
    EditMessage { old: Message, new: Message },
    /// Remove a message and everything in it
    RemoveMessage { message: Message },
    /// Append a signal to a message
    AddSignal { address: u32, signal: Signal },
    /// Replace a signal's fields (renames allowed)
    EditSignal { address: u32, old: Signal, new: Signal },
    /// Remove a signal; `index` is its declaration position so undo can
    /// reinsert it at the same slot
    RemoveSignal {
        address: u32,
        index: usize,
        signal: Signal,
    },
}

impl EditCommand {
    /// Build an edit-signal command, snapshotting the current definition
    pub fn edit_signal(
        doc: &SchemaDocument,
        address: u32,
        name: &str,
        new: Signal,
    ) -> Result<Self, DbcError> {
        let old = doc
            .message(address)
            .ok_or(DbcError::UnknownMessage(address))?
            .signal(name)
            .ok_or_else(|| DbcError::UnknownSignal(name.to_string()))?
            .clone();
        Ok(Self::EditSignal { address, old, new })
    }

    /// Build a remove-signal command, snapshotting the current definition
    /// and its position
    pub fn remove_signal(
        doc: &SchemaDocument,
        address: u32,
        name: &str,
    ) -> Result<Self, DbcError> {
        let message = doc
            .message(address)
            .ok_or(DbcError::UnknownMessage(address))?;
        let index = message
            .signals()
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DbcError::UnknownSignal(name.to_string()))?;
        let signal = message.signals()[index].clone();
        Ok(Self::RemoveSignal {
            address,
            index,
            signal,
        })
    }

    /// Build an edit-message command, snapshotting the current message
    pub fn edit_message(
        doc: &SchemaDocument,
        address: u32,
        new: Message,
    ) -> Result<Self, DbcError> {
        let old = doc
            .message(address)
            .ok_or(DbcError::UnknownMessage(address))?
            .clone();
        Ok(Self::EditMessage { old, new })
    }

    /// Build a remove-message command, snapshotting the current message
    pub fn remove_message(doc: &SchemaDocument, address: u32) -> Result<Self, DbcError> {
        let message = doc
            .message(address)
            .ok_or(DbcError::UnknownMessage(address))?
            .clone();
        Ok(Self::RemoveMessage { message })
    }
}

/// Apply the command's new state to the document
pub fn apply(doc: &mut SchemaDocument, cmd: &EditCommand) -> Result<(), DbcError> {
    match cmd {
        EditCommand::AddMessage { message } => doc.add_message(message.clone()),
        EditCommand::EditMessage { old, new } => {
            doc.replace_message(old.address, new.clone()).map(|_| ())
        }
        EditCommand::RemoveMessage { message } => {
            doc.remove_message(message.address).map(|_| ())
        }
        EditCommand::AddSignal { address, signal } => doc.add_signal(*address, signal.clone()),
        EditCommand::EditSignal { address, old, new } => {
            doc.replace_signal(*address, &old.name, new.clone()).map(|_| ())
        }
        EditCommand::RemoveSignal {
            address, signal, ..
        } => doc.remove_signal(*address, &signal.name).map(|_| ()),
    }
}

/// Restore the document state from before the command
pub fn revert(doc: &mut SchemaDocument, cmd: &EditCommand) -> Result<(), DbcError> {
    match cmd {
        EditCommand::AddMessage { message } => {
            doc.remove_message(message.address).map(|_| ())
        }
        EditCommand::EditMessage { old, new } => {
            doc.replace_message(new.address, old.clone()).map(|_| ())
        }
        EditCommand::RemoveMessage { message } => doc.add_message(message.clone()),
        EditCommand::AddSignal { address, signal } => {
            doc.remove_signal(*address, &signal.name).map(|_| ())
        }
        EditCommand::EditSignal { address, old, new } => {
            doc.replace_signal(*address, &new.name, old.clone()).map(|_| ())
        }
        EditCommand::RemoveSignal {
            address,
            index,
            signal,
        } => doc.insert_signal(*address, *index, signal.clone()),
    }
}
