//! Slash-command parsing for the chat input line.

pub const CREATE_USAGE: &str = "Usage: /create <filename>\n(Provide description in the next message)";
pub const EXPLAIN_USAGE: &str = "Usage: /explain <filename>";
pub const EDIT_USAGE: &str = "Usage: /edit <filename>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Create(&'a str),
    Explain(&'a str),
    Edit(&'a str),
    ExplainEditor,
    EditEditor,
    /// A recognized command with a missing argument.
    Usage(&'static str),
    /// Anything else, including unknown `/words`.
    Chat(&'a str),
}

impl<'a> Command<'a> {
    /// The first whitespace-delimited token is the command (case-insensitive);
    /// the trimmed remainder is its argument.
    pub fn parse(text: &'a str) -> Command<'a> {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };
        if !head.starts_with('/') {
            return Command::Chat(text);
        }

        let with_arg = |make: fn(&'a str) -> Command<'a>, usage: &'static str| {
            if rest.is_empty() {
                Command::Usage(usage)
            } else {
                make(rest)
            }
        };
        match head.to_lowercase().as_str() {
            "/create" => with_arg(Command::Create, CREATE_USAGE),
            "/explain" => with_arg(Command::Explain, EXPLAIN_USAGE),
            "/edit" => with_arg(Command::Edit, EDIT_USAGE),
            "/explain_editor" => Command::ExplainEditor,
            "/edit_editor" => Command::EditEditor,
            _ => Command::Chat(text),
        }
    }
}
