use std::io::{self, Write};

use moire_core::{DisplayChange, DisplaySink};
use tracing::warn;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Mirrors the buffer onto a byte stream.
///
/// Appends print only the new text; rows trimmed from the top scroll off on
/// their own. Rewrites (a backspace reaching into a printed row, a clear)
/// clear the screen and print everything again.
#[derive(Debug)]
pub struct WriterDisplay<W> {
    writer: W,
    shown: String,
}

impl<W: Write + Send> WriterDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            shown: String::new(),
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = self.writer.write_all(text.as_bytes()) {
            warn!(%err, "failed to write to terminal");
        }
    }
}

impl<W: Write + Send> DisplaySink for WriterDisplay<W> {
    fn text(&self) -> String {
        self.shown.clone()
    }

    fn set_text(&mut self, text: String) {
        self.update(text, DisplayChange::Rewrite);
    }

    fn update(&mut self, text: String, change: DisplayChange) {
        match change {
            DisplayChange::Append(appended) => self.emit(&appended),
            DisplayChange::Rewrite => {
                self.emit(CLEAR_SCREEN);
                self.emit(&text);
            }
        }
        self.shown = text;
    }

    fn scroll_to_end(&mut self) {
        if let Err(err) = self.writer.flush() {
            warn!(%err, "failed to flush terminal");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use moire_core::TextBuffer;

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn output(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn identical_rows_keep_printing_past_the_row_cap() {
        let out = Captured::default();
        let mut buffer = TextBuffer::with_display(WriterDisplay::new(out.clone()), Some(3));
        for _ in 0..6 {
            buffer.write("    ").unwrap();
        }

        let expected = format!("{CLEAR_SCREEN}{}", "    \n".repeat(6));
        assert_eq!(out.output(), expected);
        assert_eq!(buffer.content().unwrap(), "    \n".repeat(3));
    }

    #[test]
    fn trimmed_rows_print_only_the_new_line() {
        let out = Captured::default();
        let mut buffer = TextBuffer::with_display(WriterDisplay::new(out.clone()), Some(2));
        for line in ["a", "b", "c"] {
            buffer.write(line).unwrap();
        }

        assert_eq!(out.output(), format!("{CLEAR_SCREEN}a\nb\nc\n"));
    }

    #[test]
    fn backspace_into_printed_text_redraws() {
        let out = Captured::default();
        let mut buffer = TextBuffer::with_display(WriterDisplay::new(out.clone()), None);
        buffer.write_raw("abc").unwrap();
        buffer.write("\u{8}d").unwrap();

        assert_eq!(
            out.output(),
            format!("{CLEAR_SCREEN}abc{CLEAR_SCREEN}abd\n")
        );
    }
}
