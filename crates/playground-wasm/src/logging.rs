//! `tracing` output routed to the browser console.

use std::io;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use wasm_bindgen::JsValue;

/// Installs the console subscriber and the panic hook.
///
/// Only the first call installs a subscriber; later calls keep it.
pub fn init(filter: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let filter = EnvFilter::try_new(filter)
        .map_err(|err| JsValue::from_str(&format!("invalid log filter {filter:?}: {err}")))?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ConsoleMakeWriter)
        .without_time()
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("console logger already installed");
    }
    Ok(())
}

struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::default()
    }
}

/// Buffers one formatted event and logs it when dropped.
#[derive(Default)]
struct ConsoleWriter {
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if let Some(line) = console_line(&self.buf) {
            web_sys::console::log_1(&JsValue::from_str(&line));
        }
    }
}

fn console_line(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let line = text.trim_end_matches(['\r', '\n']);
    (!line.is_empty()).then(|| line.to_string())
}
