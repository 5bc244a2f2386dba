use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tracing::debug;

use crate::{
    input::{InputField, InputHandle},
    text::{DisplaySink, TextBuffer},
    timeline::FrameClock,
    MoireError, Result,
};

/// Cloneable handle over a [`TextBuffer`] shared by the animation loop and
/// line input. The lock is only held for the duration of a single write.
#[derive(Debug, Clone)]
pub struct Terminal {
    buffer: Arc<Mutex<TextBuffer>>,
}

impl Terminal {
    /// Wraps `buffer` for shared use.
    pub fn new(buffer: TextBuffer) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(buffer)),
        }
    }

    /// Builds a terminal rendering into `display`, with an input field
    /// attached. Returns the handle used to type into that field.
    pub fn with_input(
        display: impl DisplaySink + 'static,
        row_cap: Option<usize>,
    ) -> Result<(Self, InputHandle)> {
        let field = InputField::new();
        let handle = field.handle();
        let mut buffer = TextBuffer::with_display(display, row_cap);
        buffer.attach_input(field)?;
        Ok((Self::new(buffer), handle))
    }

    /// See [`TextBuffer::write`].
    pub fn write(&self, text: &str) -> Result<()> {
        self.lock()?.write(text)
    }

    /// See [`TextBuffer::write_raw`].
    pub fn write_raw(&self, text: &str) -> Result<()> {
        self.lock()?.write_raw(text)
    }

    /// See [`TextBuffer::print`].
    pub fn print(&self, parts: &[&str]) -> Result<()> {
        self.lock()?.print(parts)
    }

    /// See [`TextBuffer::clear`].
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear()
    }

    /// See [`TextBuffer::content`].
    pub fn content(&self) -> Result<String> {
        self.lock()?.content()
    }

    /// Waits for the next submitted line, echoes it into the buffer and
    /// returns it.
    pub async fn request_line(&self) -> Result<String> {
        let request = {
            let buffer = self.lock()?;
            buffer.begin_line_request()?
        };
        let line = request.await?;
        debug!(len = line.len(), "line received");
        self.write(&line)?;
        Ok(line)
    }

    /// Suspends the caller on `clock`.
    pub async fn pause(&self, clock: &impl FrameClock, duration: Duration) {
        clock.sleep(duration).await;
    }

    fn lock(&self) -> Result<MutexGuard<'_, TextBuffer>> {
        self.buffer
            .lock()
            .map_err(|_| MoireError::Poisoned("text buffer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{text::MemoryDisplay, timeline::VirtualClock};

    #[tokio::test]
    async fn request_line_echoes_submitted_text() {
        let (terminal, keys) = Terminal::with_input(MemoryDisplay::new(), None).unwrap();
        terminal.write("prompt>").unwrap();

        let reader = terminal.clone();
        let pending = tokio::spawn(async move { reader.request_line().await });
        while keys.is_locked().unwrap() {
            tokio::task::yield_now().await;
        }

        keys.set_value("ls").unwrap();
        keys.submit().unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), "ls");
        assert_eq!(terminal.content().unwrap(), "prompt>\nls\n");
        assert!(keys.is_locked().unwrap());
    }

    #[tokio::test]
    async fn second_request_while_pending_is_rejected() {
        let (terminal, _keys) = Terminal::with_input(MemoryDisplay::new(), None).unwrap();

        let reader = terminal.clone();
        let first = tokio::spawn(async move { reader.request_line().await });
        while !terminal.lock().unwrap().input().unwrap().is_pending().unwrap() {
            tokio::task::yield_now().await;
        }

        let err = terminal.request_line().await.unwrap_err();
        assert!(matches!(err, MoireError::RequestPending));
        first.abort();
    }

    #[tokio::test]
    async fn request_line_without_input_is_a_configuration_error() {
        let terminal = Terminal::new(TextBuffer::with_display(MemoryDisplay::new(), None));
        let err = terminal.request_line().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn pause_uses_injected_clock() {
        let terminal = Terminal::new(TextBuffer::new(None));
        let clock = VirtualClock::new();

        terminal.pause(&clock, Duration::from_millis(5)).await;
        assert_eq!(clock.elapsed(), Duration::from_millis(5));
    }
}
