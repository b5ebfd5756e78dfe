//! Strict Line-Oriented DBC Parser
//!
//! One named parsing function per statement kind, each returning either the
//! extracted fields or a reason string; the driver attaches the 1-based
//! line number and the verbatim line text to any failure. Unrecognized
//! statement kinds are skipped for forward compatibility.

use crate::error::DbcError;
use crate::message::Message;
use crate::signal::{MultiplexRole, Signal};
use std::collections::BTreeMap;
use tracing::debug;

/// Parse a full DBC document into its message map.
///
/// Strict: the first malformed recognized line or semantic violation
/// (duplicate address, duplicate signal name, multiplexor misuse) aborts
/// the parse. The caller swaps the returned map in only on success.
pub(crate) fn parse_document(text: &str) -> Result<BTreeMap<u32, Message>, DbcError> {
    let mut messages: BTreeMap<u32, Message> = BTreeMap::new();
    // Address of the message whose SG_ block we are inside.
    let mut current: Option<u32> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let fail = |reason: String| DbcError::Parse {
            line,
            reason,
            text: raw_line.to_string(),
        };
        let trimmed = raw_line.trim();

        if let Some(rest) = trimmed.strip_prefix("BO_ ") {
            let message = parse_message_line(rest).map_err(fail)?;
            if messages.contains_key(&message.address) {
                return Err(fail(DbcError::DuplicateMessage(message.address).to_string()));
            }
            current = Some(message.address);
            messages.insert(message.address, message);
        } else if let Some(rest) = trimmed.strip_prefix("SG_ ") {
            let address = current
                .ok_or_else(|| fail("signal declared outside a message".to_string()))?;
            let signal = parse_signal_line(rest).map_err(fail)?;
            let message = messages
                .get_mut(&address)
                .ok_or_else(|| fail(DbcError::UnknownMessage(address).to_string()))?;
            message
                .add_signal(signal)
                .map_err(|e| fail(e.to_string()))?;
        } else if let Some(rest) = trimmed.strip_prefix("CM_ BO_ ") {
            let (address, comment) = parse_message_comment(rest).map_err(fail)?;
            match messages.get_mut(&address) {
                Some(message) => message.comment = comment,
                None => debug!(line, address, "comment for unknown message, skipping"),
            }
        } else if let Some(rest) = trimmed.strip_prefix("CM_ SG_ ") {
            let (address, name, comment) = parse_signal_comment(rest).map_err(fail)?;
            match messages.get_mut(&address).and_then(|m| m.signal_mut(&name)) {
                Some(signal) => signal.comment = comment,
                None => debug!(line, address, name = %name, "comment for unknown signal, skipping"),
            }
        } else if let Some(rest) = trimmed.strip_prefix("VAL_ ") {
            let (address, name, pairs) = parse_value_table(rest).map_err(fail)?;
            match messages.get_mut(&address).and_then(|m| m.signal_mut(&name)) {
                Some(signal) => signal.value_descriptions = pairs,
                None => debug!(line, address, name = %name, "value table for unknown signal, skipping"),
            }
        } else if !trimmed.is_empty() {
            debug!(line, "skipping unrecognized line");
        }
    }

    Ok(messages)
}

/// `<address> <name>: <byte_size> <sender>` (after the `BO_ ` keyword)
fn parse_message_line(rest: &str) -> Result<Message, String> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| "invalid message definition".to_string())?;

    let mut head_tokens = head.split_whitespace();
    let address: u32 = head_tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| "invalid message address".to_string())?;
    let name = head_tokens
        .next()
        .ok_or_else(|| "missing message name".to_string())?;
    if head_tokens.next().is_some() {
        return Err("invalid message definition".to_string());
    }

    let mut tail_tokens = tail.split_whitespace();
    let size: u32 = tail_tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| "invalid message size".to_string())?;
    // Sender node; required by the grammar but not part of the model.
    tail_tokens
        .next()
        .ok_or_else(|| "missing sender node".to_string())?;

    Ok(Message::new(address, name, size))
}

/// `<name> [M|m<N>] : <start>|<size>@<0|1><+|-> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>`
fn parse_signal_line(rest: &str) -> Result<Signal, String> {
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| "invalid signal definition".to_string())?;

    let mut head_tokens = head.split_whitespace();
    let name = head_tokens
        .next()
        .ok_or_else(|| "missing signal name".to_string())?;
    let multiplex = match head_tokens.next() {
        None => MultiplexRole::None,
        Some("M") => MultiplexRole::Multiplexor,
        Some(tok) => match tok.strip_prefix('m').and_then(|v| v.parse().ok()) {
            Some(value) => MultiplexRole::Multiplexed(value),
            None => return Err(format!("invalid multiplex indicator {tok:?}")),
        },
    };
    if head_tokens.next().is_some() {
        return Err("invalid signal definition".to_string());
    }

    // <start>|<size>@<endian><sign>
    let (layout, tail) = take_token(tail).ok_or_else(|| "missing bit layout".to_string())?;
    let (bits, order) = layout
        .split_once('@')
        .ok_or_else(|| "invalid bit layout".to_string())?;
    let (start, size) = bits
        .split_once('|')
        .ok_or_else(|| "invalid bit layout".to_string())?;
    let start_bit: u32 = start
        .parse()
        .map_err(|_| format!("invalid start bit {start:?}"))?;
    let size: u32 = size
        .parse()
        .map_err(|_| format!("invalid signal size {size:?}"))?;
    if size == 0 || size > 64 {
        return Err(format!("signal size {size} out of range 1..=64"));
    }
    let mut order_chars = order.chars();
    let is_little_endian = match order_chars.next() {
        Some('1') => true,
        Some('0') => false,
        _ => return Err(format!("invalid byte order flag {order:?}")),
    };
    let is_signed = match order_chars.next() {
        Some('-') => true,
        Some('+') => false,
        _ => return Err(format!("invalid sign flag {order:?}")),
    };
    if order_chars.next().is_some() {
        return Err(format!("invalid bit layout {layout:?}"));
    }

    // (<factor>,<offset>)
    let (scale, tail) = delimited(tail, '(', ')').ok_or_else(|| "missing scaling".to_string())?;
    let (factor, offset) = scale
        .split_once(',')
        .ok_or_else(|| "invalid scaling".to_string())?;
    let factor: f64 = factor
        .trim()
        .parse()
        .map_err(|_| format!("invalid factor {factor:?}"))?;
    let offset: f64 = offset
        .trim()
        .parse()
        .map_err(|_| format!("invalid offset {offset:?}"))?;

    // [<min>|<max>]
    let (range, tail) = delimited(tail, '[', ']').ok_or_else(|| "missing range".to_string())?;
    let (min, max) = range
        .split_once('|')
        .ok_or_else(|| "invalid range".to_string())?;
    let min: f64 = min
        .trim()
        .parse()
        .map_err(|_| format!("invalid minimum {min:?}"))?;
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|_| format!("invalid maximum {max:?}"))?;

    // "<unit>" <receivers>; receivers are not part of the model.
    let (unit, _receivers) = quoted(tail).ok_or_else(|| "missing unit".to_string())?;

    let mut sig = Signal::new(name, start_bit, size);
    sig.is_little_endian = is_little_endian;
    sig.is_signed = is_signed;
    sig.factor = factor;
    sig.offset = offset;
    sig.min = min;
    sig.max = max;
    sig.unit = unit.to_string();
    sig.multiplex = multiplex;
    sig.update_layout();
    Ok(sig)
}

/// `<address> "<text>";` (after the `CM_ BO_ ` keyword)
fn parse_message_comment(rest: &str) -> Result<(u32, String), String> {
    let (address, rest) = take_token(rest).ok_or_else(|| "missing address".to_string())?;
    let address: u32 = address
        .parse()
        .map_err(|_| format!("invalid message address {address:?}"))?;
    let (text, rest) = quoted(rest).ok_or_else(|| "invalid comment".to_string())?;
    expect_terminator(rest)?;
    Ok((address, text.to_string()))
}

/// `<address> <signal> "<text>";` (after the `CM_ SG_ ` keyword)
fn parse_signal_comment(rest: &str) -> Result<(u32, String, String), String> {
    let (address, rest) = take_token(rest).ok_or_else(|| "missing address".to_string())?;
    let address: u32 = address
        .parse()
        .map_err(|_| format!("invalid message address {address:?}"))?;
    let (name, rest) = take_token(rest).ok_or_else(|| "missing signal name".to_string())?;
    let (text, rest) = quoted(rest).ok_or_else(|| "invalid comment".to_string())?;
    expect_terminator(rest)?;
    Ok((address, name.to_string(), text.to_string()))
}

/// `<address> <signal> <value> "<label>" ... ;` (after the `VAL_ ` keyword)
fn parse_value_table(rest: &str) -> Result<(u32, String, Vec<(i64, String)>), String> {
    let rest = rest
        .trim_end()
        .strip_suffix(';')
        .ok_or_else(|| "missing ';' terminator".to_string())?;

    let (address, rest) = take_token(rest).ok_or_else(|| "missing address".to_string())?;
    let address: u32 = address
        .parse()
        .map_err(|_| format!("invalid message address {address:?}"))?;
    let (name, mut rest) = take_token(rest).ok_or_else(|| "missing signal name".to_string())?;

    let mut pairs = Vec::new();
    loop {
        let Some((value, after)) = take_token(rest) else {
            break;
        };
        let value: i64 = value
            .parse()
            .map_err(|_| format!("invalid raw value {value:?}"))?;
        let (label, after) =
            quoted(after).ok_or_else(|| format!("missing label for value {value}"))?;
        pairs.push((value, label.to_string()));
        rest = after;
    }

    Ok((address, name.to_string(), pairs))
}

/// Split off the next whitespace-delimited token
fn take_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], &s[end..])),
        None => Some((s, "")),
    }
}

/// Content between `open` and `close`, which must come next on the line
fn delimited(s: &str, open: char, close: char) -> Option<(&str, &str)> {
    let s = s.trim_start().strip_prefix(open)?;
    s.split_once(close)
}

/// Content of the next double-quoted string
fn quoted(s: &str) -> Option<(&str, &str)> {
    delimited(s, '"', '"')
}

fn expect_terminator(rest: &str) -> Result<(), String> {
    match rest.trim() {
        ";" => Ok(()),
        _ => Err("missing ';' terminator".to_string()),
    }
}
