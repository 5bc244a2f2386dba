use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{input::LineRequest, InputField, MoireError, Result};

/// Default number of rows kept by a [`TextBuffer`].
pub const DEFAULT_ROW_CAP: usize = 256;

const BACKSPACE: char = '\u{8}';

/// How the text handed to [`DisplaySink::update`] relates to the previous
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayChange {
    /// The previous text was kept and this text was added after it. Rows may
    /// also have been trimmed from the top.
    Append(String),
    /// Previously shown characters were erased or replaced.
    Rewrite,
}

/// Output surface the buffer renders into.
///
/// The buffer reads the current text back before every write, so the sink is
/// the single source of truth for what is on screen.
pub trait DisplaySink: Send {
    /// Returns the text currently shown.
    fn text(&self) -> String;

    /// Replaces the shown text.
    fn set_text(&mut self, text: String);

    /// Replaces the shown text, describing what changed. Sinks that can only
    /// redraw keep the default, which forwards to [`DisplaySink::set_text`].
    fn update(&mut self, text: String, change: DisplayChange) {
        let _ = change;
        self.set_text(text);
    }

    /// Hint that the view should follow the newest line.
    fn scroll_to_end(&mut self) {}

    /// Marks the surface as not editable by the user.
    fn set_read_only(&mut self, _read_only: bool) {}
}

#[derive(Debug, Default)]
struct MemoryState {
    text: String,
    scroll_hints: usize,
    read_only: bool,
}

/// In-memory display. Clones share the same underlying text, so a caller can
/// keep one clone to inspect what the buffer wrote into another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDisplay {
    /// Creates an empty, editable display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scroll-to-end hints received so far.
    pub fn scroll_hints(&self) -> usize {
        self.state().scroll_hints
    }

    /// Returns whether a buffer has marked the display read-only.
    pub fn is_read_only(&self) -> bool {
        self.state().read_only
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplaySink for MemoryDisplay {
    fn text(&self) -> String {
        self.state().text.clone()
    }

    fn set_text(&mut self, text: String) {
        self.state().text = text;
    }

    fn scroll_to_end(&mut self) {
        self.state().scroll_hints += 1;
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.state().read_only = read_only;
    }
}

/// Terminal-style text buffer.
///
/// Writes are appended to whatever the display currently shows, backspaces
/// erase the preceding character, and the oldest lines are dropped once the
/// row cap is exceeded.
pub struct TextBuffer {
    display: Option<Box<dyn DisplaySink>>,
    input: Option<InputField>,
    row_cap: Option<usize>,
}

impl TextBuffer {
    /// Creates a buffer with no sinks attached.
    pub fn new(row_cap: Option<usize>) -> Self {
        Self {
            display: None,
            input: None,
            row_cap,
        }
    }

    /// Creates a buffer rendering into `display`, which is cleared.
    pub fn with_display(display: impl DisplaySink + 'static, row_cap: Option<usize>) -> Self {
        let mut buffer = Self::new(row_cap);
        buffer.attach_display(display);
        buffer
    }

    /// Renders into `display` from now on. The display is cleared and marked
    /// read-only.
    pub fn attach_display(&mut self, display: impl DisplaySink + 'static) {
        let mut display: Box<dyn DisplaySink> = Box::new(display);
        display.set_read_only(true);
        display.update(String::new(), DisplayChange::Rewrite);
        self.display = Some(display);
    }

    /// Attaches the field that [`TextBuffer::begin_line_request`] reads from.
    /// The field is locked until a request is made.
    pub fn attach_input(&mut self, input: InputField) -> Result<()> {
        input.set_locked(true)?;
        self.input = Some(input);
        Ok(())
    }

    /// Returns the attached input field, if any.
    pub fn input(&self) -> Option<&InputField> {
        self.input.as_ref()
    }

    /// Returns the maximum number of rows kept, `None` meaning unbounded.
    pub fn row_cap(&self) -> Option<usize> {
        self.row_cap
    }

    /// Returns whether a display sink is attached.
    pub fn has_display(&self) -> bool {
        self.display.is_some()
    }

    /// Appends `text` followed by a newline.
    pub fn write(&mut self, text: &str) -> Result<()> {
        self.emit("write", text, true)
    }

    /// Appends `text` without a trailing newline.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.emit("write_raw", text, false)
    }

    /// Concatenates `parts` and appends them. The newline is suppressed when
    /// more than one part is given and the last one is empty.
    pub fn print(&mut self, parts: &[&str]) -> Result<()> {
        let newline = !(parts.len() != 1 && parts.last() == Some(&""));
        self.emit("print", &parts.concat(), newline)
    }

    /// Empties the display.
    pub fn clear(&mut self) -> Result<()> {
        let display = self
            .display
            .as_mut()
            .ok_or_else(|| MoireError::missing_display("clear"))?;
        display.update(String::new(), DisplayChange::Rewrite);
        Ok(())
    }

    /// Returns the text currently shown on the display.
    pub fn content(&self) -> Result<String> {
        self.display
            .as_ref()
            .map(|display| display.text())
            .ok_or_else(|| MoireError::missing_display("content"))
    }

    /// Unlocks the input field and subscribes to its next submit. The caller
    /// awaits the returned request and echoes the line through
    /// [`TextBuffer::write`]; see `Terminal::request_line`.
    pub fn begin_line_request(&self) -> Result<LineRequest> {
        if self.display.is_none() {
            return Err(MoireError::missing_display("request_line"));
        }
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| MoireError::missing_input("request_line"))?;
        input.subscribe()
    }

    fn emit(&mut self, operation: &'static str, text: &str, newline: bool) -> Result<()> {
        let row_cap = self.row_cap;
        let display = self
            .display
            .as_mut()
            .ok_or_else(|| MoireError::missing_display(operation))?;

        let previous = display.text();
        let mut next = process_backspaces(&format!("{previous}{text}"));
        if newline {
            next.push('\n');
        }
        let change = match next.strip_prefix(previous.as_str()) {
            Some(appended) => DisplayChange::Append(appended.to_string()),
            None => DisplayChange::Rewrite,
        };

        let kept = truncate_rows(&next, row_cap);
        if kept.len() != next.len() {
            debug!(
                dropped_bytes = next.len() - kept.len(),
                row_cap, "trimmed oldest rows"
            );
            next = kept.to_string();
        }

        display.update(next, change);
        display.scroll_to_end();
        Ok(())
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("display", &self.display.is_some())
            .field("input", &self.input)
            .field("row_cap", &self.row_cap)
            .finish()
    }
}

/// Applies backspaces as a stack reduction: every character is pushed, every
/// backspace pops one if there is anything to pop.
pub fn process_backspaces(input: &str) -> String {
    let mut stack = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == BACKSPACE {
            stack.pop();
        } else {
            stack.push(ch);
        }
    }
    stack
}

/// Counts `'\n'` characters.
pub fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|byte| *byte == b'\n').count()
}

/// Returns the tail of `text` that holds at most `row_cap` newlines, cutting
/// just after the `(total - row_cap)`-th newline.
pub fn truncate_rows(text: &str, row_cap: Option<usize>) -> &str {
    let Some(row_cap) = row_cap else {
        return text;
    };

    let total = count_newlines(text);
    if total <= row_cap {
        return text;
    }

    let excess = total - row_cap;
    match text.match_indices('\n').nth(excess - 1) {
        Some((index, _)) => &text[index + 1..],
        None => text,
    }
}
