use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of one stream session. Assigned from a monotonic counter so a
/// late event from a superseded session can never be mistaken for the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which editor content an `/edit_editor` instruction applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorTarget {
    Path(PathBuf),
    /// A tab with no backing file.
    CurrentTab,
}

impl EditorTarget {
    pub fn from_tab_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => EditorTarget::Path(p),
            None => EditorTarget::CurrentTab,
        }
    }

    pub fn label(&self) -> String {
        match self {
            EditorTarget::Path(p) => file_label(p),
            EditorTarget::CurrentTab => "current tab".to_string(),
        }
    }
}

/// What the next chat message means.
///
/// Replaced as a whole on every transition; nothing mutates a payload in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Context {
    #[default]
    None,
    /// `/edit` or the file pane's Edit: the next message holds instructions.
    /// The first path is the edit target, the rest are extra context.
    AwaitingEditTargetInstruction { target_paths: Vec<PathBuf> },
    /// `/edit_editor`: instructions for the open editor tab.
    AwaitingEditorInstruction { editor_target: EditorTarget },
    /// `/create`: the next message describes the file.
    AwaitingCreateDescription { filename: String },
    /// A `/create` stream is in flight.
    CreatingFile { filename: String },
}

impl Context {
    pub fn is_none(&self) -> bool {
        matches!(self, Context::None)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Context::None => "none",
            Context::AwaitingEditTargetInstruction { .. } => "awaiting_edit_target_instruction",
            Context::AwaitingEditorInstruction { .. } => "awaiting_editor_instruction",
            Context::AwaitingCreateDescription { .. } => "awaiting_create_description",
            Context::CreatingFile { .. } => "creating_file",
        }
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
