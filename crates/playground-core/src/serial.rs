//! Serial transmit stream accumulation for the console surface.

/// Text console fed by compile diagnostics and serial output.
pub trait Console {
    /// Replaces the whole console text.
    fn replace_text(&mut self, text: &str);
    /// Appends text after the current content.
    fn append_text(&mut self, text: &str);
    /// Switches the streaming presentation on or off.
    fn set_streaming(&mut self, streaming: bool);
}

/// Turns transmitted bytes into console text for one session.
///
/// Until the first byte arrives the console keeps whatever the compile step
/// left there. The first byte switches the console into streaming mode and
/// clears it; every byte, the first included, is then appended verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialAccumulator {
    streaming: bool,
}

impl SerialAccumulator {
    /// Creates an accumulator in the pre-stream state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one transmitted byte.
    ///
    /// Bytes must arrive exactly once and in transmission order.
    pub fn on_byte<C: Console + ?Sized>(&mut self, value: u8, console: &mut C) {
        if !self.streaming {
            self.streaming = true;
            console.set_streaming(true);
            console.replace_text("");
        }

        let mut buf = [0; 4];
        console.append_text(char::from(value).encode_utf8(&mut buf));
    }

    /// Returns `true` once the first byte has been observed.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }
}
