//! Where the output of a streaming session is delivered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Consumer a streaming session's output is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationKind {
    /// The chat transcript.
    Chat,
    /// The active editor buffer (content is replaced).
    Editor,
    /// A new file, accumulated in memory and written once the stream succeeds.
    FileCreate,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Chat => "chat",
            DestinationKind::Editor => "editor",
            DestinationKind::FileCreate => "file_create",
        }
    }

    /// Whether chunks of this destination are echoed into the chat transcript.
    pub fn shows_in_transcript(&self) -> bool {
        matches!(self, DestinationKind::Chat | DestinationKind::FileCreate)
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_visibility() {
        assert!(DestinationKind::Chat.shows_in_transcript());
        assert!(DestinationKind::FileCreate.shows_in_transcript());
        assert!(!DestinationKind::Editor.shows_in_transcript());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(DestinationKind::FileCreate.to_string(), "file_create");
        assert_eq!(DestinationKind::Editor.as_str(), "editor");
    }
}
