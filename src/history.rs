//! Audit trail of document mutations.
//!
//! [`History`] is a drop-oldest ring buffer persisted with the document.
//! [`AuditEditor`] is the operator-only mode that rewrites entries in place;
//! its edits are never logged themselves.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XleditError};
use crate::services::{Credentials, IdentityService};

/// Default number of retained entries.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A description of one mutation, before it is stamped into the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: String,
    pub details: String,
}

impl Change {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
        }
    }
}

/// One audit entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// ISO-8601 on the wire
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
    /// Display name of the acting user, when an identity service is attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl HistoryEntry {
    pub fn from_change(change: Change, timestamp: DateTime<Utc>, user: Option<String>) -> Self {
        Self {
            timestamp,
            action: change.action,
            details: change.details,
            user,
        }
    }
}

/// Bounded, append-only log of [`HistoryEntry`] values (oldest first).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Loaded logs keep every entry; the owner applies its own cap afterwards.
impl From<Vec<HistoryEntry>> for History {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        let capacity = entries.len().max(DEFAULT_HISTORY_CAPACITY);
        Self {
            entries: entries.into(),
            capacity,
        }
    }
}

impl From<History> for Vec<HistoryEntry> {
    fn from(history: History) -> Self {
        history.entries.into()
    }
}

impl History {
    /// An empty history keeping at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the cap, dropping the oldest entries if needed.
    /// Returns the number of dropped entries.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        let mut dropped = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Append an entry. Returns `true` if the oldest entry was dropped.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        let mut dropped = false;
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            dropped = true;
        }
        self.entries.push_back(entry);
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut HistoryEntry> {
        self.entries.get_mut(index)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

/// A keyboard chord, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: char,
}

impl KeyChord {
    pub fn matches(&self, other: &KeyChord) -> bool {
        self.ctrl == other.ctrl
            && self.shift == other.shift
            && self.alt == other.alt
            && self.key.eq_ignore_ascii_case(&other.key)
    }
}

/// Chord that toggles the audit edit mode.
pub const AUDIT_EDIT_GESTURE: KeyChord = KeyChord {
    ctrl: true,
    shift: true,
    alt: false,
    key: 'H',
};

/// Editable field of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryField {
    Action,
    Details,
    Timestamp,
}

/// An in-progress click-to-edit of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub index: usize,
    pub field: HistoryField,
    pub buffer: String,
}

/// Operator-only in-place editing of history entries.
#[derive(Debug, Default, Clone)]
pub struct AuditEditor {
    operator: Option<String>,
    selected: BTreeSet<usize>,
    field_edit: Option<FieldEdit>,
}

impl AuditEditor {
    /// Enter edit mode. Requires the audit chord and valid operator credentials.
    pub fn engage(
        &mut self,
        chord: &KeyChord,
        identity: &dyn IdentityService,
        credentials: &Credentials,
    ) -> Result<()> {
        if !chord.matches(&AUDIT_EDIT_GESTURE) {
            return Err(XleditError::Validation(
                "audit edit mode requires the operator gesture".into(),
            ));
        }
        if !identity.validate_credentials(&credentials.user, &credentials.password)? {
            tracing::warn!(user = %credentials.user, "audit edit mode denied");
            return Err(XleditError::Persistence("invalid operator credentials".into()));
        }
        tracing::info!(user = %credentials.user, "audit edit mode engaged");
        self.operator = Some(credentials.user.clone());
        self.selected.clear();
        self.field_edit = None;
        Ok(())
    }

    pub fn disengage(&mut self) {
        if self.operator.take().is_some() {
            tracing::debug!("audit edit mode disengaged");
        }
        self.selected.clear();
        self.field_edit = None;
    }

    pub fn is_engaged(&self) -> bool {
        self.operator.is_some()
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn field_edit(&self) -> Option<&FieldEdit> {
        self.field_edit.as_ref()
    }

    fn ensure_engaged(&self) -> Result<()> {
        if self.is_engaged() {
            Ok(())
        } else {
            Err(XleditError::Validation("audit edit mode is not engaged".into()))
        }
    }

    /// Start editing `field` of entry `index`, seeding the buffer with its current text.
    pub fn begin_field_edit(
        &mut self,
        history: &History,
        index: usize,
        field: HistoryField,
    ) -> Result<()> {
        self.ensure_engaged()?;
        let entry = history
            .get(index)
            .ok_or_else(|| XleditError::Validation(format!("no history entry {index}")))?;
        let buffer = match field {
            HistoryField::Action => entry.action.clone(),
            HistoryField::Details => entry.details.clone(),
            HistoryField::Timestamp => entry.timestamp.to_rfc3339(),
        };
        self.field_edit = Some(FieldEdit {
            index,
            field,
            buffer,
        });
        Ok(())
    }

    pub fn set_field_buffer(&mut self, text: &str) {
        if let Some(ref mut edit) = self.field_edit {
            edit.buffer = text.to_string();
        }
    }

    /// Write the buffer back into the entry (blur / Enter).
    ///
    /// An unparseable timestamp keeps the edit open and returns an error.
    pub fn commit_field_edit(&mut self, history: &mut History) -> Result<()> {
        self.ensure_engaged()?;
        let Some(edit) = self.field_edit.as_ref() else {
            return Ok(());
        };
        let timestamp = match edit.field {
            HistoryField::Timestamp => Some(parse_timestamp(&edit.buffer)?),
            HistoryField::Action | HistoryField::Details => None,
        };
        let entry = history
            .get_mut(edit.index)
            .ok_or_else(|| XleditError::Validation(format!("no history entry {}", edit.index)))?;
        match edit.field {
            HistoryField::Action => entry.action = edit.buffer.clone(),
            HistoryField::Details => entry.details = edit.buffer.clone(),
            HistoryField::Timestamp => {
                if let Some(ts) = timestamp {
                    entry.timestamp = ts;
                }
            }
        }
        self.field_edit = None;
        Ok(())
    }

    /// Drop the buffer without touching the entry (Escape).
    pub fn cancel_field_edit(&mut self) -> bool {
        self.field_edit.take().is_some()
    }

    /// Toggle the checkbox of entry `index`. Returns the new checked state.
    pub fn toggle_selected(&mut self, history: &History, index: usize) -> Result<bool> {
        self.ensure_engaged()?;
        if index >= history.len() {
            return Err(XleditError::Validation(format!("no history entry {index}")));
        }
        if self.selected.remove(&index) {
            Ok(false)
        } else {
            self.selected.insert(index);
            Ok(true)
        }
    }

    pub fn select_all(&mut self, history: &History) -> Result<()> {
        self.ensure_engaged()?;
        self.selected = (0..history.len()).collect();
        Ok(())
    }

    pub fn clear_selected(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Rewrite the timestamp of every checked entry. Returns how many changed.
    pub fn bulk_set_timestamp(
        &mut self,
        history: &mut History,
        timestamp: DateTime<Utc>,
    ) -> Result<usize> {
        self.ensure_engaged()?;
        if self.selected.is_empty() {
            return Err(XleditError::Validation("no history entries selected".into()));
        }
        let mut changed = 0;
        for &index in &self.selected {
            if let Some(entry) = history.get_mut(index) {
                entry.timestamp = timestamp;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Indices no longer point at the same entries once the oldest was dropped.
    pub(crate) fn on_entries_shifted(&mut self) {
        if !self.selected.is_empty() || self.field_edit.is_some() {
            tracing::debug!("history rotated; clearing audit selection");
        }
        self.selected.clear();
        self.field_edit = None;
    }
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM[:SS]` (UTC) timestamps.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(XleditError::Validation(format!("invalid timestamp: {text}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry::from_change(
            Change::new("Edit", format!("entry {n}")),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            None,
        )
    }

    #[test]
    fn test_push_drops_oldest_at_capacity() {
        let mut history = History::with_capacity(3);
        for n in 0..3 {
            assert!(!history.push(entry(n)));
        }
        assert!(history.push(entry(3)));
        assert_eq!(history.len(), 3);
        assert_eq!(history.get(0).unwrap().details, "entry 1");
        assert_eq!(history.last().unwrap().details, "entry 3");
    }

    #[test]
    fn test_deserialize_keeps_every_entry() {
        let entries: Vec<HistoryEntry> = (0..60).map(entry).collect();
        let json = serde_json::to_string(&entries).unwrap();
        let mut history: History = serde_json::from_str(&json).unwrap();
        assert_eq!(history.len(), 60);
        assert_eq!(history.get(0).unwrap().details, "entry 0");

        assert_eq!(history.set_capacity(DEFAULT_HISTORY_CAPACITY), 10);
        assert_eq!(history.get(0).unwrap().details, "entry 10");
    }

    #[test]
    fn test_timestamp_serializes_iso8601() {
        let json = serde_json::to_value(entry(0)).unwrap();
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
        assert!(json.get("user").is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T14:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05 14:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T16:30:00+02:00").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_chord_matching_ignores_case() {
        let chord = KeyChord {
            ctrl: true,
            shift: true,
            alt: false,
            key: 'h',
        };
        assert!(chord.matches(&AUDIT_EDIT_GESTURE));
        let plain = KeyChord { shift: false, ..chord };
        assert!(!plain.matches(&AUDIT_EDIT_GESTURE));
    }

    #[test]
    fn test_editor_requires_engagement() {
        let mut history = History::default();
        history.push(entry(0));
        let mut audit = AuditEditor::default();
        assert!(audit
            .begin_field_edit(&history, 0, HistoryField::Action)
            .is_err());
        assert!(audit.toggle_selected(&history, 0).is_err());
    }
}
