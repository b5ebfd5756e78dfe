//! DBC Schema Codec
//!
//! Parses DBC (CAN database) text into an editable in-memory document,
//! generates deterministic DBC text back out, and extracts physical signal
//! values from raw frame payloads.

mod decode;
mod document;
mod error;
mod generate;
mod message;
mod parse;
mod signal;

pub use decode::{decode_message, physical_value, raw_value, DecodedSignal};
pub use document::{SchemaDocument, AUTO_SAVE_SUFFIX};
pub use error::DbcError;
pub use message::Message;
pub use signal::{flip_bit_pos, MultiplexRole, Signal};
