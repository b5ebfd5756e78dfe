//! Message Model
//!
//! A frame address with a name, byte length, and an ordered collection of
//! signals. The collection guards three invariants: unique signal names,
//! at most one multiplexor, and no multiplexed signal without one.

use crate::error::DbcError;
use crate::signal::{MultiplexRole, Signal};
use serde::{Deserialize, Serialize};

/// A name usable as a bare DBC token: non-empty, no whitespace, and none
/// of the characters the line grammar treats as structure.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == ':' || c == ';')
}

/// Free text that survives a generate/parse cycle: quoted fields have no
/// escape syntax, and statements are line-oriented.
pub(crate) fn representable_text(text: &str) -> bool {
    !text.contains('"') && !text.contains('\n') && !text.contains('\r')
}

/// A CAN message definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Frame address, unique key within the document
    pub address: u32,
    /// Message name
    pub name: String,
    /// Frame length in bytes
    pub size: u32,
    /// Free-text comment (`CM_ BO_`)
    pub comment: String,
    signals: Vec<Signal>,
}

impl Message {
    /// Create an empty message
    pub fn new(address: u32, name: impl Into<String>, size: u32) -> Self {
        Self {
            address,
            name: name.into(),
            size,
            comment: String::new(),
            signals: Vec::new(),
        }
    }

    /// Signals in declaration order
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Look up a signal by name, mutably.
    ///
    /// Intended for field edits that do not rename the signal, change its
    /// multiplex role, or touch its layout or text fields; callers that do
    /// must go through [`Message::replace_signal`] so the invariants are
    /// rechecked.
    pub fn signal_mut(&mut self, name: &str) -> Option<&mut Signal> {
        self.signals.iter_mut().find(|s| s.name == name)
    }

    /// The multiplexor signal, if any
    pub fn multiplexor(&self) -> Option<&Signal> {
        self.signals
            .iter()
            .find(|s| s.multiplex == MultiplexRole::Multiplexor)
    }

    /// Append a signal, enforcing the collection invariants
    pub fn add_signal(&mut self, signal: Signal) -> Result<(), DbcError> {
        let at = self.signals.len();
        self.insert_signal(at, signal)
    }

    /// Check a signal against this message: a DBC-legal name and texts,
    /// a width in 1..=64, and a bit range inside the frame.
    fn check_signal(&self, signal: &Signal) -> Result<(), DbcError> {
        if !valid_name(&signal.name) {
            return Err(DbcError::InvalidName(signal.name.clone()));
        }
        if signal.size == 0 || signal.size > 64 {
            return Err(DbcError::InvalidSignalSize(signal.size));
        }
        let frame_bits = 8 * u64::from(self.size);
        if u64::from(signal.msb) >= frame_bits || u64::from(signal.lsb) >= frame_bits {
            return Err(DbcError::SignalOutOfBounds {
                signal: signal.name.clone(),
                size: self.size,
            });
        }
        for text in [&signal.unit, &signal.comment] {
            if !representable_text(text) {
                return Err(DbcError::UnrepresentableText(text.clone()));
            }
        }
        for (_, label) in &signal.value_descriptions {
            if !representable_text(label) {
                return Err(DbcError::UnrepresentableText(label.clone()));
            }
        }
        Ok(())
    }

    /// Insert a signal at a given position, enforcing the collection invariants
    pub fn insert_signal(&mut self, index: usize, signal: Signal) -> Result<(), DbcError> {
        let mut signal = signal;
        signal.update_layout();
        self.check_signal(&signal)?;
        if self.signal(&signal.name).is_some() {
            return Err(DbcError::DuplicateSignal(signal.name));
        }
        match signal.multiplex {
            MultiplexRole::Multiplexor if self.multiplexor().is_some() => {
                return Err(DbcError::MultipleMultiplexor);
            }
            MultiplexRole::Multiplexed(_) if self.multiplexor().is_none() => {
                return Err(DbcError::NoMultiplexor);
            }
            _ => {}
        }
        let index = index.min(self.signals.len());
        self.signals.insert(index, signal);
        Ok(())
    }

    /// Remove a signal by name, returning its position for later reinsertion.
    ///
    /// Removing the multiplexor while multiplexed signals remain is rejected;
    /// the document would no longer parse back from its own generated text.
    pub fn remove_signal(&mut self, name: &str) -> Result<(usize, Signal), DbcError> {
        let index = self
            .signals
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DbcError::UnknownSignal(name.to_string()))?;
        if self.signals[index].multiplex == MultiplexRole::Multiplexor
            && self
                .signals
                .iter()
                .any(|s| matches!(s.multiplex, MultiplexRole::Multiplexed(_)))
        {
            return Err(DbcError::NoMultiplexor);
        }
        Ok((index, self.signals.remove(index)))
    }

    /// Replace the signal named `name` in place, returning the old one.
    ///
    /// Allows renames; the new name must not collide with a sibling, and
    /// the multiplex invariants are rechecked against the rest of the
    /// collection.
    pub fn replace_signal(&mut self, name: &str, new: Signal) -> Result<Signal, DbcError> {
        let mut new = new;
        new.update_layout();
        self.check_signal(&new)?;
        let index = self
            .signals
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DbcError::UnknownSignal(name.to_string()))?;
        if new.name != name && self.signal(&new.name).is_some() {
            return Err(DbcError::DuplicateSignal(new.name));
        }
        let others = |i: usize| self.signals.iter().enumerate().filter(move |(j, _)| *j != i);
        match new.multiplex {
            MultiplexRole::Multiplexor
                if others(index).any(|(_, s)| s.multiplex == MultiplexRole::Multiplexor) =>
            {
                return Err(DbcError::MultipleMultiplexor);
            }
            MultiplexRole::Multiplexed(_)
                if !others(index).any(|(_, s)| s.multiplex == MultiplexRole::Multiplexor) =>
            {
                return Err(DbcError::NoMultiplexor);
            }
            _ => {}
        }
        // Demoting the multiplexor is rejected while multiplexed siblings remain.
        if self.signals[index].multiplex == MultiplexRole::Multiplexor
            && new.multiplex != MultiplexRole::Multiplexor
            && others(index).any(|(_, s)| matches!(s.multiplex, MultiplexRole::Multiplexed(_)))
        {
            return Err(DbcError::NoMultiplexor);
        }
        Ok(std::mem::replace(&mut self.signals[index], new))
    }
}
