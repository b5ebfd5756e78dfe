//! Schema Editor Command Layer
//!
//! Every structural edit to a [`dbc_schema::SchemaDocument`] is expressed as
//! a reversible command and pushed through a linear undo/redo history. This
//! is the only sanctioned mutation path for an interactive editor; direct
//! document mutation bypasses the history and is a correctness hazard.

mod command;
mod history;

pub use command::{apply, revert, EditCommand};
pub use history::EditHistory;
