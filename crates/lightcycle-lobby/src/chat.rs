//! Chat history and the display it is pushed to.

/// Sender name used for lines the client writes itself.
pub const SYSTEM_SENDER: &str = "Sys";

/// Ordered, append-only `sender: text` lines.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    lines: Vec<String>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sender: text`.
    pub fn push(&mut self, sender: &str, text: &str) {
        self.lines.push(format!("{sender}: {text}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

/// Receives the full history after every append.
///
/// Rendering and keyboard capture live behind this trait; the lobby never
/// draws anything itself.
pub trait ChatDisplay: Send {
    fn set_history(&mut self, lines: &[String]);
}

/// Discards everything. For tests and scripted runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessChat;

impl ChatDisplay for HeadlessChat {
    fn set_history(&mut self, _lines: &[String]) {}
}

/// Which display the lobby talks to.
pub enum DisplayKind {
    Headless,
    Custom(Box<dyn ChatDisplay>),
}

impl DisplayKind {
    pub(crate) fn into_display(self) -> Box<dyn ChatDisplay> {
        match self {
            Self::Headless => Box::new(HeadlessChat),
            Self::Custom(display) => display,
        }
    }
}

impl std::fmt::Debug for DisplayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headless => write!(f, "Headless"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}
