//! Schema Document
//!
//! The editable aggregate: an address-ordered map of messages with
//! load/parse, generate/save, and structural mutation operations. Several
//! documents can coexist; nothing here is global state.

use crate::error::DbcError;
use crate::generate::generate_document;
use crate::message::Message;
use crate::parse::parse_document;
use crate::signal::Signal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the primary path for the auto-save sibling file
pub const AUTO_SAVE_SUFFIX: &str = ".tmp";

/// An in-memory DBC schema document
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    name: String,
    source_path: Option<PathBuf>,
    messages: BTreeMap<u32, Message>,
}

impl SchemaDocument {
    /// Create an empty, unnamed document with no source path
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from a file.
    ///
    /// If an auto-save sibling (`<path>.tmp`) exists its contents are
    /// preferred, recovering edits from an interrupted session; the primary
    /// path stays the save target either way.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, DbcError> {
        let path = path.as_ref();
        let auto_save = auto_save_path(path);
        let text = if auto_save.exists() {
            info!(path = %auto_save.display(), "recovering from auto-save file");
            std::fs::read_to_string(&auto_save)?
        } else {
            std::fs::read_to_string(path)?
        };

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut doc = Self {
            name,
            source_path: Some(path.to_path_buf()),
            messages: BTreeMap::new(),
        };
        doc.parse_text(&text)?;
        info!(path = %path.display(), messages = doc.messages.len(), "loaded schema");
        Ok(doc)
    }

    /// Load a document from in-memory text (e.g. pasted content).
    ///
    /// The document has no source path, so [`SchemaDocument::save`] reports
    /// [`DbcError::NoSourcePath`] until `save_as` assigns one.
    pub fn load_string(name: impl Into<String>, text: &str) -> Result<Self, DbcError> {
        let mut doc = Self {
            name: name.into(),
            source_path: None,
            messages: BTreeMap::new(),
        };
        doc.parse_text(text)?;
        Ok(doc)
    }

    /// Parse schema text, fully replacing the message map on success.
    ///
    /// On failure the document keeps its previous contents untouched.
    pub fn parse_text(&mut self, text: &str) -> Result<(), DbcError> {
        let messages = parse_document(text)?;
        self.messages = messages;
        Ok(())
    }

    /// Generate the document's DBC text
    pub fn generate(&self) -> String {
        generate_document(&self.messages)
    }

    /// Document name (file stem for file-backed documents)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Messages in address order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the document holds no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by frame address
    pub fn message(&self, address: u32) -> Option<&Message> {
        self.messages.get(&address)
    }

    /// Write generated text to the source path and drop the auto-save sibling
    pub fn save(&self) -> Result<(), DbcError> {
        let path = self.source_path.as_deref().ok_or(DbcError::NoSourcePath)?;
        std::fs::write(path, self.generate())?;
        let auto_save = auto_save_path(path);
        match std::fs::remove_file(&auto_save) {
            Ok(()) => debug!(path = %auto_save.display(), "removed auto-save file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(path = %path.display(), "saved schema");
        Ok(())
    }

    /// Adopt a new source path, then save
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), DbcError> {
        let path = path.into();
        self.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.source_path = Some(path);
        self.save()
    }

    /// Write generated text to the auto-save sibling, leaving the primary
    /// file alone
    pub fn auto_save(&self) -> Result<(), DbcError> {
        let path = self.source_path.as_deref().ok_or(DbcError::NoSourcePath)?;
        std::fs::write(auto_save_path(path), self.generate())?;
        Ok(())
    }

    // Structural mutation. These are the sanctioned write paths; the editor
    // command layer wraps them so every edit stays undoable.

    /// Insert a new message; the address must be unused
    pub fn add_message(&mut self, message: Message) -> Result<(), DbcError> {
        check_message(&message)?;
        if self.messages.contains_key(&message.address) {
            return Err(DbcError::DuplicateMessage(message.address));
        }
        self.messages.insert(message.address, message);
        Ok(())
    }

    /// Remove a message, returning it
    pub fn remove_message(&mut self, address: u32) -> Result<Message, DbcError> {
        self.messages
            .remove(&address)
            .ok_or(DbcError::UnknownMessage(address))
    }

    /// Replace the message at `address`, returning the old one.
    ///
    /// The replacement may carry a different address; the new address must
    /// then be unused so the map key always equals the message address.
    pub fn replace_message(&mut self, address: u32, new: Message) -> Result<Message, DbcError> {
        check_message(&new)?;
        if !self.messages.contains_key(&address) {
            return Err(DbcError::UnknownMessage(address));
        }
        if new.address != address && self.messages.contains_key(&new.address) {
            return Err(DbcError::DuplicateMessage(new.address));
        }
        let old = self
            .messages
            .remove(&address)
            .ok_or(DbcError::UnknownMessage(address))?;
        self.messages.insert(new.address, new);
        Ok(old)
    }

    /// Append a signal to the message at `address`
    pub fn add_signal(&mut self, address: u32, signal: Signal) -> Result<(), DbcError> {
        self.message_mut(address)?.add_signal(signal)
    }

    /// Insert a signal at a given position in the message at `address`
    pub fn insert_signal(
        &mut self,
        address: u32,
        index: usize,
        signal: Signal,
    ) -> Result<(), DbcError> {
        self.message_mut(address)?.insert_signal(index, signal)
    }

    /// Remove a signal by name, returning its position and definition
    pub fn remove_signal(
        &mut self,
        address: u32,
        name: &str,
    ) -> Result<(usize, Signal), DbcError> {
        self.message_mut(address)?.remove_signal(name)
    }

    /// Replace the signal named `name` in the message at `address`
    pub fn replace_signal(
        &mut self,
        address: u32,
        name: &str,
        new: Signal,
    ) -> Result<Signal, DbcError> {
        self.message_mut(address)?.replace_signal(name, new)
    }

    fn message_mut(&mut self, address: u32) -> Result<&mut Message, DbcError> {
        self.messages
            .get_mut(&address)
            .ok_or(DbcError::UnknownMessage(address))
    }
}

/// Message-level text checks; signal checks run inside [`Message`].
fn check_message(message: &Message) -> Result<(), DbcError> {
    if !crate::message::valid_name(&message.name) {
        return Err(DbcError::InvalidName(message.name.clone()));
    }
    if !crate::message::representable_text(&message.comment) {
        return Err(DbcError::UnrepresentableText(message.comment.clone()));
    }
    Ok(())
}

fn auto_save_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(AUTO_SAVE_SUFFIX);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "BO_ 228 ControlCommand: 8 XXX\n\
                          SG_ Torque : 0|16@1+ (0.1,0) [0|6553.5] \"Nm\" XXX\n";

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dbc-schema-{tag}-{}.dbc", std::process::id()))
    }

    #[test]
    fn test_load_string_has_no_path() {
        let doc = SchemaDocument::load_string("pasted", SAMPLE).unwrap();
        assert_eq!(doc.name(), "pasted");
        assert!(doc.source_path().is_none());
        assert!(matches!(doc.save(), Err(DbcError::NoSourcePath)));
        assert!(matches!(doc.auto_save(), Err(DbcError::NoSourcePath)));
    }

    #[test]
    fn test_failed_parse_keeps_previous_contents() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();
        assert_eq!(doc.len(), 1);
        let err = doc.parse_text("BO_ nonsense\n");
        assert!(err.is_err());
        assert_eq!(doc.len(), 1);
        assert!(doc.message(228).is_some());
    }

    #[test]
    fn test_reparse_replaces_not_merges() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();
        doc.parse_text("BO_ 512 Other: 8 XXX\n").unwrap();
        assert!(doc.message(228).is_none());
        assert!(doc.message(512).is_some());
    }

    #[test]
    fn test_mutation_ops() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();

        doc.add_message(Message::new(512, "New", 8)).unwrap();
        assert!(matches!(
            doc.add_message(Message::new(512, "Dup", 8)),
            Err(DbcError::DuplicateMessage(512))
        ));

        doc.add_signal(512, Signal::new("S", 0, 8)).unwrap();
        let (index, sig) = doc.remove_signal(512, "S").unwrap();
        assert_eq!(index, 0);
        doc.insert_signal(512, index, sig).unwrap();
        assert!(doc.message(512).unwrap().signal("S").is_some());

        let old = doc
            .replace_message(512, Message::new(513, "Renumbered", 8))
            .unwrap();
        assert_eq!(old.name, "New");
        assert!(doc.message(512).is_none());
        assert_eq!(doc.message(513).unwrap().name, "Renumbered");

        let removed = doc.remove_message(513).unwrap();
        assert_eq!(removed.name, "Renumbered");
        assert!(matches!(
            doc.remove_message(513),
            Err(DbcError::UnknownMessage(513))
        ));
    }

    #[test]
    fn test_mutation_validates_signal_layout() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();

        assert!(matches!(
            doc.add_signal(228, Signal::new("Z", 0, 0)),
            Err(DbcError::InvalidSignalSize(0))
        ));
        // ControlCommand is 8 bytes; a byte-wide field at bit 64 is outside it.
        assert!(matches!(
            doc.add_signal(228, Signal::new("W", 64, 8)),
            Err(DbcError::SignalOutOfBounds { .. })
        ));
        assert!(matches!(
            doc.add_signal(228, Signal::new("H", u32::MAX, 8)),
            Err(DbcError::SignalOutOfBounds { .. })
        ));
        // The rejected edits leave the message untouched.
        assert_eq!(doc.message(228).unwrap().signals().len(), 1);
    }

    #[test]
    fn test_mutation_rejects_unrepresentable_text() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();

        let mut sig = Signal::new("Torque", 0, 16);
        sig.comment = "peak \"absolute\" torque".to_string();
        assert!(matches!(
            doc.replace_signal(228, "Torque", sig),
            Err(DbcError::UnrepresentableText(_))
        ));

        let mut msg = Message::new(512, "New", 8);
        msg.comment = "two\nlines".to_string();
        assert!(matches!(
            doc.add_message(msg),
            Err(DbcError::UnrepresentableText(_))
        ));
        assert!(matches!(
            doc.add_message(Message::new(512, "no spaces", 8)),
            Err(DbcError::InvalidName(_))
        ));
    }

    #[test]
    fn test_generated_text_reparses_after_edits() {
        let mut doc = SchemaDocument::load_string("doc", SAMPLE).unwrap();
        let mut sig = Signal::new("Torque", 0, 16);
        sig.factor = 0.1;
        sig.max = 6553.5;
        sig.unit = "Nm".to_string();
        sig.comment = "requested torque".to_string();
        doc.replace_signal(228, "Torque", sig).unwrap();

        let reparsed = SchemaDocument::load_string("again", &doc.generate()).unwrap();
        let torque = reparsed.message(228).unwrap().signal("Torque").unwrap();
        assert_eq!(torque.comment, "requested torque");
        assert_eq!(torque.unit, "Nm");
    }

    #[test]
    fn test_replace_message_address_collision() {
        let mut doc = SchemaDocument::new();
        doc.add_message(Message::new(1, "A", 8)).unwrap();
        doc.add_message(Message::new(2, "B", 8)).unwrap();
        assert!(matches!(
            doc.replace_message(1, Message::new(2, "A2", 8)),
            Err(DbcError::DuplicateMessage(2))
        ));
        // Failed replace leaves both entries alone.
        assert_eq!(doc.message(1).unwrap().name, "A");
        assert_eq!(doc.message(2).unwrap().name, "B");
    }

    #[test]
    fn test_save_roundtrip_and_auto_save_cleanup() {
        let path = temp_path("save");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut doc = SchemaDocument::load_file(&path).unwrap();
        assert_eq!(doc.source_path(), Some(path.as_path()));
        doc.add_message(Message::new(512, "Added", 8)).unwrap();

        doc.auto_save().unwrap();
        let sibling = auto_save_path(&path);
        assert!(sibling.exists());

        doc.save().unwrap();
        assert!(!sibling.exists());

        let reloaded = SchemaDocument::load_file(&path).unwrap();
        assert!(reloaded.message(512).is_some());
        assert!(reloaded.message(228).is_some());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_prefers_auto_save_sibling() {
        let path = temp_path("recover");
        std::fs::write(&path, SAMPLE).unwrap();
        std::fs::write(auto_save_path(&path), "BO_ 999 Recovered: 8 XXX\n").unwrap();

        let doc = SchemaDocument::load_file(&path).unwrap();
        assert!(doc.message(999).is_some());
        assert!(doc.message(228).is_none());

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_file(auto_save_path(&path)).unwrap();
    }
}
