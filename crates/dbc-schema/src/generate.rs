//! Deterministic DBC Text Generation
//!
//! Emits one `BO_` block per message in address order, each followed by its
//! signals in declaration order, then the comment and value-table sections.
//! Re-parsing the output reproduces the document structurally.

use crate::message::Message;
use crate::signal::MultiplexRole;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Render an f64 so that parsing the text reproduces the exact same bits.
/// Rust's `Display` for f64 emits the shortest digit string that parses
/// back to the same value; integral values render without a decimal point,
/// which the parser accepts.
fn fmt_float(v: f64) -> String {
    format!("{v}")
}

fn mux_indicator(role: MultiplexRole) -> String {
    match role {
        MultiplexRole::None => String::new(),
        MultiplexRole::Multiplexor => " M".to_string(),
        MultiplexRole::Multiplexed(value) => format!(" m{value}"),
    }
}

/// Generate DBC text for a message map. Addresses and sizes are decimal;
/// sender and receiver slots render as the `XXX` placeholder.
///
/// Quoted fields have no escape syntax. The model rejects quotes and
/// newlines in units, comments, and value labels at mutation time, so
/// everything interpolated here re-parses.
pub(crate) fn generate_document(messages: &BTreeMap<u32, Message>) -> String {
    let mut out = String::new();

    for message in messages.values() {
        let _ = writeln!(
            out,
            "BO_ {} {}: {} XXX",
            message.address, message.name, message.size
        );
        for sig in message.signals() {
            let _ = writeln!(
                out,
                "  SG_ {}{} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\" XXX",
                sig.name,
                mux_indicator(sig.multiplex),
                sig.start_bit,
                sig.size,
                if sig.is_little_endian { '1' } else { '0' },
                if sig.is_signed { '-' } else { '+' },
                fmt_float(sig.factor),
                fmt_float(sig.offset),
                fmt_float(sig.min),
                fmt_float(sig.max),
                sig.unit,
            );
        }
        out.push('\n');
    }

    for message in messages.values() {
        if !message.comment.is_empty() {
            let _ = writeln!(out, "CM_ BO_ {} \"{}\";", message.address, message.comment);
        }
    }
    for message in messages.values() {
        for sig in message.signals() {
            if !sig.comment.is_empty() {
                let _ = writeln!(
                    out,
                    "CM_ SG_ {} {} \"{}\";",
                    message.address, sig.name, sig.comment
                );
            }
        }
    }
    for message in messages.values() {
        for sig in message.signals() {
            if !sig.value_descriptions.is_empty() {
                let pairs = sig
                    .value_descriptions
                    .iter()
                    .map(|(value, label)| format!("{value} \"{label}\""))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(out, "VAL_ {} {} {};", message.address, sig.name, pairs);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;
    use crate::signal::Signal;

    fn sample() -> BTreeMap<u32, Message> {
        let mut messages = BTreeMap::new();

        let mut cmd = Message::new(228, "ControlCommand", 8);
        cmd.comment = "Steering command".to_string();
        let mut counter = Signal::new("Counter", 0, 2);
        counter.max = 3.0;
        counter.value_descriptions = vec![(0, "zero".into()), (1, "one".into())];
        cmd.add_signal(counter).unwrap();
        let mut torque = Signal::new("Torque", 8, 16);
        torque.is_little_endian = false;
        torque.is_signed = true;
        torque.factor = 0.1;
        torque.offset = -10.0;
        torque.min = -100.0;
        torque.max = 100.0;
        torque.unit = "Nm".to_string();
        torque.comment = "Commanded torque".to_string();
        torque.update_layout();
        cmd.add_signal(torque).unwrap();
        messages.insert(228, cmd);

        let mut mux = Message::new(512, "MuxMsg", 8);
        let mut sel = Signal::new("Sel", 0, 4);
        sel.max = 15.0;
        sel.multiplex = MultiplexRole::Multiplexor;
        mux.add_signal(sel).unwrap();
        let mut v3 = Signal::new("V3", 8, 8);
        v3.max = 255.0;
        v3.multiplex = MultiplexRole::Multiplexed(3);
        mux.add_signal(v3).unwrap();
        messages.insert(512, mux);

        messages
    }

    #[test]
    fn test_generated_layout() {
        let text = generate_document(&sample());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "BO_ 228 ControlCommand: 8 XXX");
        assert_eq!(lines[1], "  SG_ Counter : 0|2@1+ (1,0) [0|3] \"\" XXX");
        assert_eq!(lines[2], "  SG_ Torque : 8|16@0- (0.1,-10) [-100|100] \"Nm\" XXX");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "BO_ 512 MuxMsg: 8 XXX");
        assert_eq!(lines[5], "  SG_ Sel M : 0|4@1+ (1,0) [0|15] \"\" XXX");
        assert_eq!(lines[6], "  SG_ V3 m3 : 8|8@1+ (1,0) [0|255] \"\" XXX");
        // Sections after all message blocks: comments, then value tables.
        assert!(text.contains("CM_ BO_ 228 \"Steering command\";"));
        assert!(text.contains("CM_ SG_ 228 Torque \"Commanded torque\";"));
        assert!(text.contains("VAL_ 228 Counter 0 \"zero\" 1 \"one\";"));
        let cm_pos = text.find("CM_ BO_").unwrap();
        let val_pos = text.find("VAL_").unwrap();
        assert!(cm_pos < val_pos);
    }

    #[test]
    fn test_round_trip_structural_equality() {
        let original = sample();
        let reparsed = parse_document(&generate_document(&original)).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn test_round_trip_preserves_awkward_floats() {
        let mut messages = BTreeMap::new();
        let mut msg = Message::new(1, "A", 8);
        let mut sig = Signal::new("S", 0, 32);
        sig.factor = 0.005062299;
        sig.offset = -3.335e-5;
        sig.min = -1.7e308;
        sig.max = 4294967295.0;
        msg.add_signal(sig).unwrap();
        messages.insert(1, msg);

        let reparsed = parse_document(&generate_document(&messages)).unwrap();
        let sig = reparsed[&1].signal("S").unwrap();
        assert_eq!(sig.factor.to_bits(), 0.005062299f64.to_bits());
        assert_eq!(sig.offset.to_bits(), (-3.335e-5f64).to_bits());
        assert_eq!(sig.min.to_bits(), (-1.7e308f64).to_bits());
        assert_eq!(sig.max.to_bits(), 4294967295.0f64.to_bits());
    }

    #[test]
    fn test_addresses_emitted_in_order() {
        let mut messages = BTreeMap::new();
        messages.insert(512, Message::new(512, "B", 8));
        messages.insert(228, Message::new(228, "A", 8));
        let text = generate_document(&messages);
        let first = text.find("BO_ 228").unwrap();
        let second = text.find("BO_ 512").unwrap();
        assert!(first < second);
    }
}
