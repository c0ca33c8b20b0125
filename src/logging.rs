//! Tracing setup routed through the host output window.
//!
//! The subscriber is installed before the session manager has created the
//! output window, so [`ConsoleWriter`] buffers formatted records until
//! [`crate::loader::output::install`] attaches a stream, then forwards
//! everything (buffer first) to that stream.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use clap::ValueEnum;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::loader::output;
use crate::{AppError, Result};

/// Maximum number of bytes held while no output stream is attached.
const PENDING_LIMIT: usize = 64 * 1024;

static PENDING: Mutex<Vec<u8>> = Mutex::new(Vec::new());

/// Log output format.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// [`MakeWriter`] that targets the active output stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleWriter;

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleRecord;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleRecord
    }
}

/// Writer for a single formatted record.
#[derive(Debug)]
pub struct ConsoleRecord;

impl Write for ConsoleRecord {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(mut stream) = output::active() {
            return stream.write(buf);
        }

        let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
        let overflow = (pending.len() + buf.len()).saturating_sub(PENDING_LIMIT);
        if overflow > 0 {
            let drop_len = overflow.min(pending.len());
            pending.drain(..drop_len);
        }
        let keep_from = buf.len().saturating_sub(PENDING_LIMIT);
        pending.extend_from_slice(&buf[keep_from..]);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Take everything buffered while no output stream was attached.
pub(crate) fn drain_pending() -> Vec<u8> {
    let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::take(&mut *pending)
}

/// Write buffered records to stderr when no output stream was ever attached.
pub fn flush_pending_to_stderr() {
    if output::active().is_some() {
        return;
    }
    let pending = drain_pending();
    if !pending.is_empty() {
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(&pending);
        let _ = stderr.flush();
    }
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`.
///
/// # Errors
///
/// Returns `AppError::Config` if a global subscriber is already installed.
pub fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(ConsoleWriter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
