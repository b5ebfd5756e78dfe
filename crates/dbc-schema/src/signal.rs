//! Signal Model and Start-Bit Addressing
//!
//! A signal declares its start bit in one of two conventions: Intel
//! (little-endian) signals name their least-significant bit, Motorola
//! (big-endian) signals name their most-significant bit in a byte-reversed
//! numbering. Both are converted once into a canonical `lsb`/`msb` pair
//! that everything downstream consumes.

use serde::{Deserialize, Serialize};

/// Role a signal plays in message multiplexing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiplexRole {
    /// Always valid
    #[default]
    None,
    /// The selector signal (`M` in DBC text)
    Multiplexor,
    /// Valid only in frames where the multiplexor's raw value equals this
    /// selector value (`m<N>` in DBC text)
    Multiplexed(i64),
}

/// Map a bit position to its byte-reversed counterpart.
///
/// Motorola start bits count down from each byte's MSB, so bit 7 of byte 0
/// is the first position of the big-endian walk. The mapping is its own
/// inverse.
pub fn flip_bit_pos(bit: u32) -> u32 {
    8 * (bit / 8) + 7 - bit % 8
}

/// A named bit-field within a CAN frame with linear scaling to a physical unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name, unique within its message
    pub name: String,
    /// Start bit as declared in the DBC text (convention depends on endianness)
    pub start_bit: u32,
    /// Field width in bits (1..=64)
    pub size: u32,
    /// Intel byte order when true, Motorola when false
    pub is_little_endian: bool,
    /// Two's-complement interpretation when true
    pub is_signed: bool,
    /// Scale applied to the raw value
    pub factor: f64,
    /// Offset added after scaling: physical = raw * factor + offset
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit, free text
    pub unit: String,
    /// Free-text comment (`CM_ SG_`)
    pub comment: String,
    /// Multiplex role
    pub multiplex: MultiplexRole,
    /// Ordered (raw value, label) pairs from `VAL_`; later entries win on lookup
    pub value_descriptions: Vec<(i64, String)>,
    /// Canonical low bit index, cached by [`Signal::update_layout`]
    pub lsb: u32,
    /// Canonical high bit index, cached by [`Signal::update_layout`]
    pub msb: u32,
}

impl Signal {
    /// Create a signal with unit scaling and no comment or value table.
    /// The canonical bit range is computed immediately.
    pub fn new(name: impl Into<String>, start_bit: u32, size: u32) -> Self {
        let mut sig = Self {
            name: name.into(),
            start_bit,
            size,
            is_little_endian: true,
            is_signed: false,
            factor: 1.0,
            offset: 0.0,
            min: 0.0,
            max: 0.0,
            unit: String::new(),
            comment: String::new(),
            multiplex: MultiplexRole::None,
            value_descriptions: Vec::new(),
            lsb: 0,
            msb: 0,
        };
        sig.update_layout();
        sig
    }

    /// Recompute the cached canonical bit range from the declared layout.
    ///
    /// Must be called whenever `start_bit`, `size`, or `is_little_endian`
    /// change; the parser and every layout-edit path do so. For Motorola
    /// signals the declared MSB is flipped into the big-endian walk,
    /// advanced `size - 1` positions, and flipped back.
    ///
    /// Saturating arithmetic: a hostile start bit or a zero size never
    /// panics here; the saturated range is rejected by the message-level
    /// bounds check instead.
    pub fn update_layout(&mut self) {
        let span = self.size.saturating_sub(1);
        if self.is_little_endian {
            self.lsb = self.start_bit;
            self.msb = self.start_bit.saturating_add(span);
        } else {
            self.msb = self.start_bit;
            self.lsb = flip_bit_pos(flip_bit_pos(self.start_bit).saturating_add(span));
        }
    }

    /// Look up the label for a raw value. Duplicate raw values are allowed
    /// in the table; the last entry wins.
    pub fn value_description(&self, raw: i64) -> Option<&str> {
        self.value_descriptions
            .iter()
            .rev()
            .find(|(v, _)| *v == raw)
            .map(|(_, label)| label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_flip_bit_pos_first_byte() {
        // Byte 0 reverses in place: 7 <-> 0, 6 <-> 1, ...
        assert_eq!(flip_bit_pos(7), 0);
        assert_eq!(flip_bit_pos(0), 7);
        assert_eq!(flip_bit_pos(3), 4);
        // Byte 1: 15 <-> 8
        assert_eq!(flip_bit_pos(15), 8);
        assert_eq!(flip_bit_pos(8), 15);
    }

    #[test]
    fn test_little_endian_layout() {
        let sig = Signal::new("speed", 16, 12);
        assert_eq!(sig.lsb, 16);
        assert_eq!(sig.msb, 27);
    }

    #[test]
    fn test_big_endian_layout_two_bytes() {
        // start_bit=7 size=16: field is bytes 0..=1, MSB at bit 7 of byte 0,
        // LSB at bit 0 of byte 1 (absolute index 8).
        let mut sig = Signal::new("checksum", 7, 16);
        sig.is_little_endian = false;
        sig.update_layout();
        assert_eq!(sig.msb, 7);
        assert_eq!(sig.lsb, 8);
    }

    #[test]
    fn test_big_endian_layout_single_bit() {
        let mut sig = Signal::new("flag", 23, 1);
        sig.is_little_endian = false;
        sig.update_layout();
        assert_eq!(sig.msb, 23);
        assert_eq!(sig.lsb, 23);
    }

    #[test]
    fn test_big_endian_layout_within_byte() {
        // start_bit=6 size=6 (motohawk AverageRadius): bits 6..1 of byte 0.
        let mut sig = Signal::new("radius", 6, 6);
        sig.is_little_endian = false;
        sig.update_layout();
        assert_eq!(sig.msb, 6);
        assert_eq!(sig.lsb, 1);
    }

    #[test]
    fn test_layout_recomputed_on_edit() {
        let mut sig = Signal::new("s", 0, 8);
        assert_eq!((sig.lsb, sig.msb), (0, 7));
        sig.start_bit = 8;
        sig.size = 4;
        sig.update_layout();
        assert_eq!((sig.lsb, sig.msb), (8, 11));
    }

    #[test]
    fn test_layout_saturates_on_extreme_inputs() {
        // A start bit near u32::MAX or a zero size must not panic; the
        // saturated range is caught by the message bounds check.
        let sig = Signal::new("s", u32::MAX, 8);
        assert_eq!(sig.msb, u32::MAX);

        let mut sig = Signal::new("t", u32::MAX, 8);
        sig.is_little_endian = false;
        sig.update_layout();
        assert_eq!(sig.msb, u32::MAX);

        let sig = Signal::new("z", 4, 0);
        assert_eq!((sig.lsb, sig.msb), (4, 4));
    }

    #[test]
    fn test_value_description_last_wins() {
        let mut sig = Signal::new("gear", 0, 4);
        sig.value_descriptions = vec![
            (0, "park".to_string()),
            (1, "reverse".to_string()),
            (0, "neutral".to_string()),
        ];
        assert_eq!(sig.value_description(0), Some("neutral"));
        assert_eq!(sig.value_description(1), Some("reverse"));
        assert_eq!(sig.value_description(2), None);
    }

    proptest! {
        #[test]
        fn prop_flip_is_involution(bit in 0u32..512) {
            prop_assert_eq!(flip_bit_pos(flip_bit_pos(bit)), bit);
        }

        #[test]
        fn prop_flip_stays_in_byte(bit in 0u32..512) {
            prop_assert_eq!(flip_bit_pos(bit) / 8, bit / 8);
        }

        #[test]
        fn prop_big_endian_lsb_follows_walk(start in 0u32..64, size in 1u32..33) {
            // lsb is reachable from msb by walking size-1 positions of the
            // big-endian bit order.
            let mut sig = Signal::new("s", start, size);
            sig.is_little_endian = false;
            sig.update_layout();
            prop_assert_eq!(
                flip_bit_pos(sig.lsb),
                flip_bit_pos(sig.msb) + size - 1
            );
        }
    }
}
