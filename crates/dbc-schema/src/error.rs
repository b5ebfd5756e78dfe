//! DBC Codec Error Types

use thiserror::Error;

/// Errors from parsing, generating, and editing DBC schema documents
#[derive(Debug, Error)]
pub enum DbcError {
    /// A line failed strict statement matching or violated a semantic check.
    /// Carries the 1-based line number and the offending line verbatim.
    #[error("parse error at line {line}: {reason}: {text}")]
    Parse {
        line: usize,
        reason: String,
        text: String,
    },

    /// File unreadable or unwritable; recoverable by the caller
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Save-in-place on a document loaded from in-memory text
    #[error("document has no source path")]
    NoSourcePath,

    /// Two messages declared with the same frame address
    #[error("Duplicate message address {0}")]
    DuplicateMessage(u32),

    /// Two signals in one message share a name
    #[error("Duplicate signal name {0}")]
    DuplicateSignal(String),

    /// More than one signal marked `M` in one message
    #[error("Multiple multiplexor signals in one message")]
    MultipleMultiplexor,

    /// A signal marked `m<N>` with no `M` signal in the message
    #[error("No multiplexor signal for multiplexed signal")]
    NoMultiplexor,

    /// Signal bit width outside 1..=64
    #[error("signal size {0} bits out of range 1..=64")]
    InvalidSignalSize(u32),

    /// Signal bit range extends past the end of its message
    #[error("signal {signal} does not fit in {size} bytes")]
    SignalOutOfBounds { signal: String, size: u32 },

    /// Name is empty or contains characters the DBC grammar cannot carry
    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// Free text with a quote or newline cannot survive generation
    #[error("unrepresentable text {0:?}")]
    UnrepresentableText(String),

    /// No message at the given address
    #[error("unknown message address {0}")]
    UnknownMessage(u32),

    /// No signal with the given name in the message
    #[error("unknown signal {0}")]
    UnknownSignal(String),
}
