//! Value Extraction
//!
//! Pure functions from a raw frame payload and a signal definition to raw
//! and physical values. Safe to call concurrently from readers as long as
//! the signal is not being mutated underneath them.

use crate::message::Message;
use crate::signal::{MultiplexRole, Signal};

/// Extract the raw `size`-bit field spanning the signal's canonical bit range.
///
/// Walks the payload one byte slice at a time starting at the byte holding
/// `msb`, toward lower byte indices for Intel signals and higher ones for
/// Motorola, accumulating MSB-first. Bytes outside the payload read as zero,
/// so short frames degrade instead of failing. The result is sign-extended
/// two's-complement when the signal is signed.
pub fn raw_value(payload: &[u8], sig: &Signal) -> i64 {
    let mut value: u64 = 0;
    let mut bits = sig.size;
    let mut byte = (sig.msb / 8) as i64;

    while bits > 0 {
        let i = byte as u32;
        let lo = if sig.lsb / 8 == i { sig.lsb } else { i * 8 };
        let hi = if sig.msb / 8 == i { sig.msb } else { i * 8 + 7 };
        let width = hi - lo + 1;

        // Out-of-range bytes contribute zero but still consume their bit
        // positions, keeping in-range bits aligned.
        let data = if byte >= 0 {
            payload.get(byte as usize).copied().unwrap_or(0)
        } else {
            0
        };
        let chunk = (u64::from(data) >> (lo % 8)) & ((1u64 << width) - 1);
        value |= chunk << (bits - width);

        bits -= width;
        byte += if sig.is_little_endian { -1 } else { 1 };
    }

    if sig.is_signed && sig.size < 64 && value >> (sig.size - 1) & 1 == 1 {
        value |= u64::MAX << sig.size;
    }
    value as i64
}

/// Physical value of a signal in a frame: `raw * factor + offset`
pub fn physical_value(payload: &[u8], sig: &Signal) -> f64 {
    raw_value(payload, sig) as f64 * sig.factor + sig.offset
}

/// One signal decoded from a frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Signal name
    pub name: String,
    /// Unscaled integer extracted from the frame bits
    pub raw: i64,
    /// Physical value after factor and offset
    pub value: f64,
    /// Engineering unit copied from the definition
    pub unit: String,
    /// Label from the signal's value table, if the raw value has one
    pub label: Option<String>,
}

/// Decode every signal of a message from one frame payload.
///
/// Multiplexed signals whose selector value does not match the frame's
/// multiplexor raw value are skipped; the multiplexor itself and plain
/// signals always decode.
pub fn decode_message(msg: &Message, payload: &[u8]) -> Vec<DecodedSignal> {
    let mux_value = msg.multiplexor().map(|m| raw_value(payload, m));
    msg.signals()
        .iter()
        .filter(|sig| match sig.multiplex {
            MultiplexRole::Multiplexed(selector) => mux_value == Some(selector),
            _ => true,
        })
        .map(|sig| {
            let raw = raw_value(payload, sig);
            DecodedSignal {
                name: sig.name.clone(),
                raw,
                value: raw as f64 * sig.factor + sig.offset,
                unit: sig.unit.clone(),
                label: sig.value_description(raw).map(str::to_string),
            }
        })
        .collect()
}
