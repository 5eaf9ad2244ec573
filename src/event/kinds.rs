use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of events flowing through the hub
///
/// The set is open by convention: kinds the hub does not recognize are
/// carried as `Other` and forwarded untouched, so collaborators can add
/// new kinds without a hub change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Chat,
    Dm,
    Cursor,
    Typing,
    Reaction,
    Task,
    File,
    Meeting,
    Call,
    Presence,
    Mention,
    /// Unrecognized kind, forwarded as-is
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Chat => "chat",
            EventKind::Dm => "dm",
            EventKind::Cursor => "cursor",
            EventKind::Typing => "typing",
            EventKind::Reaction => "reaction",
            EventKind::Task => "task",
            EventKind::File => "file",
            EventKind::Meeting => "meeting",
            EventKind::Call => "call",
            EventKind::Presence => "presence",
            EventKind::Mention => "mention",
            EventKind::Other(kind) => kind,
        }
    }

    /// Whether the sender's own connections receive this kind back.
    ///
    /// Chat-like kinds echo so a sender's other open tabs stay in sync;
    /// cursor and typing are only meaningful to everyone else.
    pub fn echoes_to_sender(&self) -> bool {
        !matches!(self, EventKind::Cursor | EventKind::Typing)
    }

    /// Whether this kind is appended to a room's recent-history log.
    ///
    /// High-frequency ephemeral kinds never enter history; replaying a
    /// stale cursor position on reconnect would be worse than nothing.
    pub fn is_recorded(&self) -> bool {
        !matches!(
            self,
            EventKind::Cursor | EventKind::Typing | EventKind::Presence
        )
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "chat" => EventKind::Chat,
            "dm" => EventKind::Dm,
            "cursor" => EventKind::Cursor,
            "typing" => EventKind::Typing,
            "reaction" => EventKind::Reaction,
            "task" => EventKind::Task,
            "file" => EventKind::File,
            "meeting" => EventKind::Meeting,
            "call" => EventKind::Call,
            "presence" => EventKind::Presence,
            "mention" => EventKind::Mention,
            _ => EventKind::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
