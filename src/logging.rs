//! tracing subscriber setup.
//!
//! In the browser every formatted event goes to the devtools console, routed
//! to `console.error` / `console.warn` / `console.log` / `console.debug` by
//! level so the console's own level filter works. Natively (tests) output goes
//! through the libtest capture writer.

use std::io::{self, Write};

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const FALLBACK_FILTER: &str = "info";

/// Parse filter directives, falling back to `info` when they are invalid.
/// The second value is a warning to log once the subscriber is up.
pub fn parse_filter(directives: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(FALLBACK_FILTER),
            Some(format!(
                "invalid log filter {directives:?} ({e}); using \"{FALLBACK_FILTER}\""
            )),
        ),
    }
}

/// Install the global subscriber. Returns `false` when one was already
/// installed (a second plugin bundle on the page, or a second test).
pub fn init_logging(directives: &str) -> bool {
    let (filter, warning) = parse_filter(directives);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time();

    #[cfg(target_arch = "wasm32")]
    let installed = builder.with_writer(ConsoleMakeWriter).try_init().is_ok();
    #[cfg(not(target_arch = "wasm32"))]
    let installed = builder.with_test_writer().try_init().is_ok();

    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
    installed
}

// ---------------------------------------------------------------------------
// Browser console writer
// ---------------------------------------------------------------------------

/// Console method an event of a given level is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Error,
    Warn,
    Log,
    Debug,
}

impl ConsoleMethod {
    pub fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => ConsoleMethod::Error,
            Level::WARN => ConsoleMethod::Warn,
            Level::INFO => ConsoleMethod::Log,
            _ => ConsoleMethod::Debug,
        }
    }

    fn emit(self, line: &str) {
        #[cfg(target_arch = "wasm32")]
        {
            let line = wasm_bindgen::JsValue::from_str(line);
            match self {
                ConsoleMethod::Error => web_sys::console::error_1(&line),
                ConsoleMethod::Warn => web_sys::console::warn_1(&line),
                ConsoleMethod::Log => web_sys::console::log_1(&line),
                ConsoleMethod::Debug => web_sys::console::debug_1(&line),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!("{line}");
    }
}

/// Hands out one [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(ConsoleMethod::Log)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(ConsoleMethod::for_level(meta.level()))
    }
}

/// Buffers one formatted event and emits it as a single console call on drop.
pub struct ConsoleWriter {
    method: ConsoleMethod,
    buffer: Vec<u8>,
}

impl ConsoleWriter {
    fn new(method: ConsoleMethod) -> Self {
        Self {
            method,
            buffer: Vec::new(),
        }
    }

    /// The buffered line without its trailing newline.
    fn line(&self) -> String {
        let text = String::from_utf8_lossy(&self.buffer);
        text.trim_end_matches(['\r', '\n']).to_string()
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.method.emit(&self.line());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
